//! The storage port. Implemented by the PostgreSQL client and by the
//! in-memory store used in tests.

use crate::model::{
    Id, ModelValidationError,
    auth::{AuthTokenHash, Authentication},
    forum::{CreateForum, Forum, ForumMarker, ForumPatch},
    like::LikeTarget,
    notification::{NewNotification, Notification, NotificationMarker},
    post::{CreatePost, Post, PostMarker},
    thread::{CreateThread, Thread, ThreadFilter, ThreadMarker, ThreadPatch},
    user::{CreateUser, Role, User, UserMarker},
};
use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("A stored record was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("The storage backend failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        StoreError::Backend(Box::new(error))
    }
}

/// Persistence operations the content service relies on.
///
/// Listings return rows in no particular order unless stated; view
/// composition does its own ordering. Like uniqueness per `(user, target)`
/// is the store's responsibility.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn fetch_user(&self, id: Id<UserMarker>) -> Result<Option<User>>;
    /// Exact, case-sensitive match.
    async fn fetch_user_by_handle(&self, handle: &str) -> Result<Option<User>>;
    async fn list_users(&self) -> Result<Vec<User>>;
    async fn create_user(&self, user: &CreateUser) -> Result<User>;
    async fn set_user_role(&self, id: Id<UserMarker>, role: Role) -> Result<Option<User>>;
    async fn set_user_ban(
        &self,
        id: Id<UserMarker>,
        banned_at: Option<OffsetDateTime>,
    ) -> Result<Option<User>>;

    async fn fetch_forum(&self, id: Id<ForumMarker>) -> Result<Option<Forum>>;
    async fn list_forums(&self) -> Result<Vec<Forum>>;
    async fn create_forum(&self, forum: &CreateForum) -> Result<Forum>;
    async fn update_forum(&self, id: Id<ForumMarker>, patch: &ForumPatch) -> Result<Option<Forum>>;
    /// Removes the forum with its threads, posts and likes.
    async fn delete_forum(&self, id: Id<ForumMarker>) -> Result<bool>;

    async fn fetch_thread(&self, id: Id<ThreadMarker>) -> Result<Option<Thread>>;
    async fn list_threads(&self, filter: ThreadFilter) -> Result<Vec<Thread>>;
    async fn create_thread(&self, author: Id<UserMarker>, thread: &CreateThread) -> Result<Thread>;
    async fn update_thread(
        &self,
        id: Id<ThreadMarker>,
        patch: &ThreadPatch,
    ) -> Result<Option<Thread>>;
    /// Removes the thread with its posts and likes.
    async fn delete_thread(&self, id: Id<ThreadMarker>) -> Result<bool>;

    async fn fetch_post(&self, id: Id<PostMarker>) -> Result<Option<Post>>;
    async fn list_posts(&self) -> Result<Vec<Post>>;
    async fn list_posts_by_threads(&self, threads: &[Id<ThreadMarker>]) -> Result<Vec<Post>>;
    async fn list_posts_by_author(&self, author: Id<UserMarker>) -> Result<Vec<Post>>;
    async fn create_post(&self, author: Id<UserMarker>, post: &CreatePost) -> Result<Post>;
    async fn update_post(&self, id: Id<PostMarker>, content: &str) -> Result<Option<Post>>;
    /// Removes the post, every reply below it and their likes.
    async fn delete_post(&self, id: Id<PostMarker>) -> Result<bool>;

    async fn has_like(&self, user: Id<UserMarker>, target: LikeTarget) -> Result<bool>;
    /// Returns `false` when the like already existed.
    async fn insert_like(&self, user: Id<UserMarker>, target: LikeTarget) -> Result<bool>;
    /// Returns `false` when there was nothing to remove.
    async fn delete_like(&self, user: Id<UserMarker>, target: LikeTarget) -> Result<bool>;
    /// `(post, count)` pairs; posts without likes may be omitted.
    async fn count_post_likes(
        &self,
        posts: &[Id<PostMarker>],
    ) -> Result<Vec<(Id<PostMarker>, u64)>>;
    /// `(thread, count)` pairs; threads without likes may be omitted.
    async fn count_thread_likes(
        &self,
        threads: &[Id<ThreadMarker>],
    ) -> Result<Vec<(Id<ThreadMarker>, u64)>>;
    async fn list_likers(&self, target: LikeTarget) -> Result<Vec<User>>;

    async fn insert_notification(&self, notification: &NewNotification) -> Result<Notification>;
    async fn list_notifications(&self, recipient: Id<UserMarker>) -> Result<Vec<Notification>>;
    async fn fetch_notification(
        &self,
        id: Id<NotificationMarker>,
    ) -> Result<Option<Notification>>;
    async fn mark_notification_read(&self, id: Id<NotificationMarker>) -> Result<bool>;
    async fn delete_notification(&self, id: Id<NotificationMarker>) -> Result<bool>;

    async fn insert_authentication(&self, authentication: &Authentication) -> Result<()>;
    async fn fetch_authentication(&self, hash: &AuthTokenHash) -> Result<Option<Authentication>>;
}

