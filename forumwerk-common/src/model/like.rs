use crate::model::{Id, post::PostMarker, thread::ThreadMarker};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Something a user can like.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Deserialize, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum LikeTarget {
    Post(Id<PostMarker>),
    Thread(Id<ThreadMarker>),
}

impl Display for LikeTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LikeTarget::Post(id) => write!(f, "post {id}"),
            LikeTarget::Thread(id) => write!(f, "thread {id}"),
        }
    }
}

/// Outcome of a like toggle.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeToggle {
    Liked,
    Unliked,
}

/// Toggle outcome together with the freshly composed view of the target.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct LikeOutcome<View> {
    pub state: LikeToggle,
    pub target: View,
}
