pub mod auth;
pub mod forum;
pub mod like;
pub mod notification;
pub mod post;
pub mod thread;
pub mod user;

use crate::{
    model::{
        auth::InvalidAuthTokenHashError,
        notification::UnknownNotificationKindError,
        user::{InvalidUserHandleError, UnknownRoleError},
    },
    snowflake::{Epoch, Snowflake, SnowflakeGenerator},
    util::NonPositiveDurationError,
};
use derive_where::derive_where;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, marker::PhantomData};
use thiserror::Error;
use time::{OffsetDateTime, macros::datetime};

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    UserHandle(#[from] InvalidUserHandleError),
    #[error(transparent)]
    Role(#[from] UnknownRoleError),
    #[error(transparent)]
    NotificationKind(#[from] UnknownNotificationKindError),
    #[error(transparent)]
    NonPositiveDuration(#[from] NonPositiveDurationError),
    #[error(transparent)]
    TokenHash(#[from] InvalidAuthTokenHashError),
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct ForumwerkEpoch;
impl Epoch for ForumwerkEpoch {
    const EPOCH_TIME: OffsetDateTime = datetime!(2025-01-01 00:00 UTC);
}

pub type ForumwerkSnowflake = Snowflake<ForumwerkEpoch>;
pub type ForumwerkSnowflakeGenerator = SnowflakeGenerator<ForumwerkEpoch>;

/// Entity id, typed by a marker so a post id cannot be passed as a thread id.
///
/// The marker never needs any traits of its own.
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
pub struct Id<Marker>(ForumwerkSnowflake, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(snowflake: ForumwerkSnowflake) -> Self {
        Self(snowflake, PhantomData)
    }

    #[must_use]
    pub fn snowflake(self) -> ForumwerkSnowflake {
        self.0
    }

    /// The id as stored in a signed `BIGINT` column.
    #[must_use]
    pub fn as_i64(self) -> i64 {
        self.0.get().cast_signed()
    }

    #[must_use]
    pub fn from_i64(value: i64) -> Self {
        value.cast_unsigned().into()
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> From<ForumwerkSnowflake> for Id<Marker> {
    fn from(value: ForumwerkSnowflake) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Id::new(ForumwerkSnowflake::new(value))
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.snowflake().get()
    }
}

/// Author information embedded in views.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct AuthorRef {
    pub id: Id<user::UserMarker>,
    pub handle: user::UserHandle,
}

impl From<&user::User> for AuthorRef {
    fn from(user: &user::User) -> Self {
        Self {
            id: user.id,
            handle: user.handle.clone(),
        }
    }
}
