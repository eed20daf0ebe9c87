//! Time-ordered 64 bit identifiers.
//!
//! Layout, most significant bit first: 42 bits of milliseconds since the
//! epoch, 5 bits worker id, 5 bits process id and a 12 bit sequence number.
//! Sorting snowflakes sorts them by creation time.

use derive_where::derive_where;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    marker::PhantomData,
    sync::atomic::{AtomicU64, Ordering},
};
use thiserror::Error;
use time::OffsetDateTime;

pub const TIMESTAMP_OFFSET: u32 = 22;
pub const TIMESTAMP_LENGTH: u32 = 42;
pub const WORKER_ID_OFFSET: u32 = 17;
pub const PROCESS_ID_OFFSET: u32 = 12;
pub const NODE_PART_LENGTH: u32 = 5;
pub const SEQUENCE_LENGTH: u32 = 12;

const TIMESTAMP_MAX: u64 = (1 << TIMESTAMP_LENGTH) - 1;
const NODE_PART_MASK: u64 = (1 << NODE_PART_LENGTH) - 1;
const SEQUENCE_MASK: u16 = (1 << SEQUENCE_LENGTH) - 1;

pub trait Epoch {
    const EPOCH_TIME: OffsetDateTime;
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Snowflake node part was out of range: {0}")]
pub struct NodePartOutOfRangeError(u8);

macro_rules! node_part {
    ($name:ident, $offset:ident) => {
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
        pub struct $name(u8);

        impl $name {
            #[must_use]
            pub fn new(id: u8) -> Option<Self> {
                (u64::from(id) <= NODE_PART_MASK).then_some(Self(id))
            }

            #[must_use]
            pub fn get(self) -> u8 {
                self.0
            }

            #[allow(clippy::cast_possible_truncation)]
            fn extract(snowflake: u64) -> Self {
                Self(((snowflake >> $offset) & NODE_PART_MASK) as u8)
            }
        }

        impl TryFrom<u8> for $name {
            type Error = NodePartOutOfRangeError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                Self::new(value).ok_or(NodePartOutOfRangeError(value))
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let inner = u8::deserialize(deserializer)?;
                Self::new(inner).ok_or_else(|| {
                    serde::de::Error::invalid_value(
                        serde::de::Unexpected::Unsigned(inner.into()),
                        &concat!(stringify!($name), " in 0..32"),
                    )
                })
            }
        }
    };
}

node_part!(WorkerId, WORKER_ID_OFFSET);
node_part!(ProcessId, PROCESS_ID_OFFSET);

#[derive_where(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Debug,
    Default,
    Hash,
    Serialize,
    Deserialize
)]
#[serde(transparent)]
pub struct Snowflake<SnowflakeEpoch>(u64, #[serde(skip)] PhantomData<SnowflakeEpoch>);

impl<SnowflakeEpoch> Snowflake<SnowflakeEpoch> {
    #[must_use]
    pub fn new(inner: u64) -> Self {
        Self(inner, PhantomData)
    }

    #[must_use]
    pub fn from_parts(
        millis: u64,
        worker_id: WorkerId,
        process_id: ProcessId,
        sequence: u16,
    ) -> Self {
        Self::new(
            (millis.min(TIMESTAMP_MAX) << TIMESTAMP_OFFSET)
                | u64::from(worker_id.get()) << WORKER_ID_OFFSET
                | u64::from(process_id.get()) << PROCESS_ID_OFFSET
                | u64::from(sequence & SEQUENCE_MASK),
        )
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    /// Milliseconds since the epoch.
    #[must_use]
    pub fn millis(self) -> u64 {
        self.0 >> TIMESTAMP_OFFSET
    }

    #[must_use]
    pub fn worker_id(self) -> WorkerId {
        WorkerId::extract(self.0)
    }

    #[must_use]
    pub fn process_id(self) -> ProcessId {
        ProcessId::extract(self.0)
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn sequence(self) -> u16 {
        (self.0 as u16) & SEQUENCE_MASK
    }

    #[must_use]
    pub fn created_at(self) -> OffsetDateTime
    where
        SnowflakeEpoch: Epoch,
    {
        SnowflakeEpoch::EPOCH_TIME + time::Duration::milliseconds(self.millis().cast_signed())
    }
}

impl<SnowflakeEpoch> Display for Snowflake<SnowflakeEpoch> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<SnowflakeEpoch> From<u64> for Snowflake<SnowflakeEpoch> {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl<SnowflakeEpoch> From<Snowflake<SnowflakeEpoch>> for u64 {
    fn from(value: Snowflake<SnowflakeEpoch>) -> Self {
        value.get()
    }
}

/// Milliseconds between the epoch and `time`, clamped into the 42 bit range.
fn epoch_millis<SnowflakeEpoch: Epoch>(time: OffsetDateTime) -> u64 {
    let millis = (time - SnowflakeEpoch::EPOCH_TIME).whole_milliseconds();
    u64::try_from(millis).map_or(0, |millis| millis.min(TIMESTAMP_MAX))
}

/// Marks a generator that has not issued anything yet.
const UNISSUED: u64 = u64::MAX;

/// Packed `(millis << SEQUENCE_LENGTH) | sequence` of the id after `last`.
///
/// The sequence restarts every millisecond. A clock that goes backwards keeps
/// the last millisecond, and an exhausted sequence borrows the next one.
fn next_state(last: u64, now: u64) -> u64 {
    if last == UNISSUED {
        return now << SEQUENCE_LENGTH;
    }

    let last_millis = last >> SEQUENCE_LENGTH;
    if now > last_millis {
        now << SEQUENCE_LENGTH
    } else if last & u64::from(SEQUENCE_MASK) < u64::from(SEQUENCE_MASK) {
        last + 1
    } else {
        // Saturates at the end of the timestamp range.
        (last_millis + 1).min(TIMESTAMP_MAX) << SEQUENCE_LENGTH
    }
}

/// Hands out snowflakes for one worker/process pair. Shareable between tasks.
///
/// Ids from one generator strictly increase, even when more than 4096 are
/// requested within a millisecond.
#[derive_where(Debug)]
pub struct SnowflakeGenerator<SnowflakeEpoch> {
    worker_id: WorkerId,
    process_id: ProcessId,
    last: AtomicU64,
    phantom_data: PhantomData<SnowflakeEpoch>,
}

impl<SnowflakeEpoch> SnowflakeGenerator<SnowflakeEpoch> {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            worker_id,
            process_id,
            last: AtomicU64::new(UNISSUED),
            phantom_data: PhantomData,
        }
    }

    #[must_use]
    pub fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    #[must_use]
    pub fn process_id(&self) -> ProcessId {
        self.process_id
    }

    pub fn generate_at(&self, time: OffsetDateTime) -> Snowflake<SnowflakeEpoch>
    where
        SnowflakeEpoch: Epoch,
    {
        let now = epoch_millis::<SnowflakeEpoch>(time);
        let (Ok(last) | Err(last)) =
            self.last.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |state| {
                Some(next_state(state, now))
            });
        let state = next_state(last, now);
        #[allow(clippy::cast_possible_truncation)]
        let sequence = (state as u16) & SEQUENCE_MASK;

        Snowflake::from_parts(
            state >> SEQUENCE_LENGTH,
            self.worker_id,
            self.process_id,
            sequence,
        )
    }

    pub fn generate(&self) -> Snowflake<SnowflakeEpoch>
    where
        SnowflakeEpoch: Epoch,
    {
        self.generate_at(OffsetDateTime::now_utc())
    }
}
