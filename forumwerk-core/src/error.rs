use forumwerk_common::{
    model::{
        Id,
        forum::ForumMarker,
        notification::NotificationMarker,
        post::PostMarker,
        thread::ThreadMarker,
        user::{UserHandle, UserMarker},
    },
    store::StoreError,
};
use std::fmt::Display;
use thiserror::Error;

pub type Result<T, E = ServiceError> = std::result::Result<T, E>;

/// The entity a lookup failed to find.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Missing {
    User(Id<UserMarker>),
    Forum(Id<ForumMarker>),
    Thread(Id<ThreadMarker>),
    Post(Id<PostMarker>),
    Notification(Id<NotificationMarker>),
}

impl Display for Missing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Missing::User(id) => write!(f, "User with id {id}"),
            Missing::Forum(id) => write!(f, "Forum with id {id}"),
            Missing::Thread(id) => write!(f, "Thread with id {id}"),
            Missing::Post(id) => write!(f, "Post with id {id}"),
            Missing::Notification(id) => write!(f, "Notification with id {id}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} was not found.")]
    NotFound(Missing),
    #[error("The handle {0} is already taken.")]
    HandleTaken(UserHandle),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<Missing> for ServiceError {
    fn from(value: Missing) -> Self {
        ServiceError::NotFound(value)
    }
}
