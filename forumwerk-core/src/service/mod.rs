//! Create/read/update/delete/like orchestration.
//!
//! Every mutation runs in the same order: check the referenced entities,
//! write through the store, run mention and reply/like notifications, then
//! compose a fresh view from current counts. Notification failures never
//! fail the mutation that caused them.

mod forums;
mod moderation;
mod notifications;
mod posts;
mod threads;
mod users;

pub use moderation::ModerationNotice;
pub use users::UserActivity;

use crate::{
    error::{Missing, Result},
    notify::NotificationDispatcher,
};
use forumwerk_common::{
    aggregate::{ContentSnapshot, LikeCounts},
    model::{
        Id,
        forum::{Forum, ForumMarker},
        post::{Post, PostMarker},
        thread::{Thread, ThreadMarker},
        user::{User, UserMarker},
    },
    store::ContentStore,
};
use std::{collections::HashMap, sync::Arc};

/// Stateless apart from its store handle; cheap to clone and share.
#[derive(Clone)]
pub struct ContentService {
    store: Arc<dyn ContentStore>,
    notifications: NotificationDispatcher,
}

impl ContentService {
    #[must_use]
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        let notifications = NotificationDispatcher::new(Arc::clone(&store));
        Self {
            store,
            notifications,
        }
    }

    #[must_use]
    pub fn store(&self) -> &dyn ContentStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn notifications(&self) -> &NotificationDispatcher {
        &self.notifications
    }

    /// Loads posts and like counts for `threads` with three store calls.
    async fn snapshot(&self, threads: &[Id<ThreadMarker>]) -> Result<ContentSnapshot> {
        if threads.is_empty() {
            return Ok(ContentSnapshot::default());
        }

        let posts = self.store.list_posts_by_threads(threads).await?;
        let post_ids: Vec<Id<PostMarker>> = posts.iter().map(|post| post.id).collect();
        let post_likes = self.store.count_post_likes(&post_ids).await?;
        let thread_likes = self.store.count_thread_likes(threads).await?;

        Ok(ContentSnapshot::new(
            posts,
            post_likes.into_iter().collect::<LikeCounts<_>>(),
            thread_likes.into_iter().collect::<LikeCounts<_>>(),
        ))
    }

    async fn forums_by_id(&self) -> Result<HashMap<Id<ForumMarker>, Forum>> {
        Ok(self
            .store
            .list_forums()
            .await?
            .into_iter()
            .map(|forum| (forum.id, forum))
            .collect())
    }

    async fn require_user(&self, id: Id<UserMarker>) -> Result<User> {
        Ok(self
            .store
            .fetch_user(id)
            .await?
            .ok_or(Missing::User(id))?)
    }

    async fn require_forum(&self, id: Id<ForumMarker>) -> Result<Forum> {
        Ok(self
            .store
            .fetch_forum(id)
            .await?
            .ok_or(Missing::Forum(id))?)
    }

    async fn require_thread(&self, id: Id<ThreadMarker>) -> Result<Thread> {
        Ok(self
            .store
            .fetch_thread(id)
            .await?
            .ok_or(Missing::Thread(id))?)
    }

    async fn require_post(&self, id: Id<PostMarker>) -> Result<Post> {
        Ok(self
            .store
            .fetch_post(id)
            .await?
            .ok_or(Missing::Post(id))?)
    }
}

/// Thread ids in first-seen order without repeats.
fn distinct_threads(threads: impl IntoIterator<Item = Id<ThreadMarker>>) -> Vec<Id<ThreadMarker>> {
    let mut ids: Vec<Id<ThreadMarker>> = Vec::new();
    for id in threads {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::{ContentService, memory::MemoryStore};
    use async_trait::async_trait;
    use forumwerk_common::{
        model::{
            Id,
            auth::{AuthTokenHash, Authentication},
            forum::{CreateForum, Forum, ForumMarker, ForumPatch},
            like::LikeTarget,
            notification::{NewNotification, Notification, NotificationMarker},
            post::{CreatePost, Post, PostMarker},
            thread::{CreateThread, Thread, ThreadFilter, ThreadMarker, ThreadPatch},
            user::{CreateUser, Role, User, UserHandle, UserMarker},
        },
        store::{self, ContentStore, StoreError},
    };
    use std::{io, sync::Arc};
    use time::OffsetDateTime;

    pub fn service() -> (ContentService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        (ContentService::new(store.clone()), store)
    }

    pub async fn user(store: &MemoryStore, handle: &str) -> User {
        store
            .create_user(&CreateUser {
                handle: UserHandle::new(handle.to_owned()).unwrap(),
            })
            .await
            .unwrap()
    }

    pub async fn forum(service: &ContentService) -> Forum {
        service
            .create_forum(&CreateForum {
                title: "General".to_owned(),
                description: Some("Anything goes".to_owned()),
                image_url: None,
            })
            .await
            .unwrap()
    }

    pub async fn inbox(store: &MemoryStore, user: &User) -> Vec<Notification> {
        store.list_notifications(user.id).await.unwrap()
    }

    /// A [`MemoryStore`] that cannot persist notifications.
    #[derive(Default)]
    pub struct NotificationOutage(pub MemoryStore);

    pub fn outage_service() -> (ContentService, Arc<NotificationOutage>) {
        let store = Arc::new(NotificationOutage::default());
        (ContentService::new(store.clone()), store)
    }

    #[async_trait]
    impl ContentStore for NotificationOutage {
        async fn fetch_user(&self, id: Id<UserMarker>) -> store::Result<Option<User>> {
            self.0.fetch_user(id).await
        }

        async fn fetch_user_by_handle(&self, handle: &str) -> store::Result<Option<User>> {
            self.0.fetch_user_by_handle(handle).await
        }

        async fn list_users(&self) -> store::Result<Vec<User>> {
            self.0.list_users().await
        }

        async fn create_user(&self, user: &CreateUser) -> store::Result<User> {
            self.0.create_user(user).await
        }

        async fn set_user_role(
            &self,
            id: Id<UserMarker>,
            role: Role,
        ) -> store::Result<Option<User>> {
            self.0.set_user_role(id, role).await
        }

        async fn set_user_ban(
            &self,
            id: Id<UserMarker>,
            banned_at: Option<OffsetDateTime>,
        ) -> store::Result<Option<User>> {
            self.0.set_user_ban(id, banned_at).await
        }

        async fn fetch_forum(&self, id: Id<ForumMarker>) -> store::Result<Option<Forum>> {
            self.0.fetch_forum(id).await
        }

        async fn list_forums(&self) -> store::Result<Vec<Forum>> {
            self.0.list_forums().await
        }

        async fn create_forum(&self, forum: &CreateForum) -> store::Result<Forum> {
            self.0.create_forum(forum).await
        }

        async fn update_forum(
            &self,
            id: Id<ForumMarker>,
            patch: &ForumPatch,
        ) -> store::Result<Option<Forum>> {
            self.0.update_forum(id, patch).await
        }

        async fn delete_forum(&self, id: Id<ForumMarker>) -> store::Result<bool> {
            self.0.delete_forum(id).await
        }

        async fn fetch_thread(&self, id: Id<ThreadMarker>) -> store::Result<Option<Thread>> {
            self.0.fetch_thread(id).await
        }

        async fn list_threads(&self, filter: ThreadFilter) -> store::Result<Vec<Thread>> {
            self.0.list_threads(filter).await
        }

        async fn create_thread(
            &self,
            author: Id<UserMarker>,
            thread: &CreateThread,
        ) -> store::Result<Thread> {
            self.0.create_thread(author, thread).await
        }

        async fn update_thread(
            &self,
            id: Id<ThreadMarker>,
            patch: &ThreadPatch,
        ) -> store::Result<Option<Thread>> {
            self.0.update_thread(id, patch).await
        }

        async fn delete_thread(&self, id: Id<ThreadMarker>) -> store::Result<bool> {
            self.0.delete_thread(id).await
        }

        async fn fetch_post(&self, id: Id<PostMarker>) -> store::Result<Option<Post>> {
            self.0.fetch_post(id).await
        }

        async fn list_posts(&self) -> store::Result<Vec<Post>> {
            self.0.list_posts().await
        }

        async fn list_posts_by_threads(
            &self,
            threads: &[Id<ThreadMarker>],
        ) -> store::Result<Vec<Post>> {
            self.0.list_posts_by_threads(threads).await
        }

        async fn list_posts_by_author(&self, author: Id<UserMarker>) -> store::Result<Vec<Post>> {
            self.0.list_posts_by_author(author).await
        }

        async fn create_post(
            &self,
            author: Id<UserMarker>,
            post: &CreatePost,
        ) -> store::Result<Post> {
            self.0.create_post(author, post).await
        }

        async fn update_post(
            &self,
            id: Id<PostMarker>,
            content: &str,
        ) -> store::Result<Option<Post>> {
            self.0.update_post(id, content).await
        }

        async fn delete_post(&self, id: Id<PostMarker>) -> store::Result<bool> {
            self.0.delete_post(id).await
        }

        async fn has_like(&self, user: Id<UserMarker>, target: LikeTarget) -> store::Result<bool> {
            self.0.has_like(user, target).await
        }

        async fn insert_like(
            &self,
            user: Id<UserMarker>,
            target: LikeTarget,
        ) -> store::Result<bool> {
            self.0.insert_like(user, target).await
        }

        async fn delete_like(
            &self,
            user: Id<UserMarker>,
            target: LikeTarget,
        ) -> store::Result<bool> {
            self.0.delete_like(user, target).await
        }

        async fn count_post_likes(
            &self,
            posts: &[Id<PostMarker>],
        ) -> store::Result<Vec<(Id<PostMarker>, u64)>> {
            self.0.count_post_likes(posts).await
        }

        async fn count_thread_likes(
            &self,
            threads: &[Id<ThreadMarker>],
        ) -> store::Result<Vec<(Id<ThreadMarker>, u64)>> {
            self.0.count_thread_likes(threads).await
        }

        async fn list_likers(&self, target: LikeTarget) -> store::Result<Vec<User>> {
            self.0.list_likers(target).await
        }

        async fn insert_notification(
            &self,
            _notification: &NewNotification,
        ) -> store::Result<Notification> {
            Err(StoreError::backend(io::Error::other("notifications are down")))
        }

        async fn list_notifications(
            &self,
            recipient: Id<UserMarker>,
        ) -> store::Result<Vec<Notification>> {
            self.0.list_notifications(recipient).await
        }

        async fn fetch_notification(
            &self,
            id: Id<NotificationMarker>,
        ) -> store::Result<Option<Notification>> {
            self.0.fetch_notification(id).await
        }

        async fn mark_notification_read(&self, id: Id<NotificationMarker>) -> store::Result<bool> {
            self.0.mark_notification_read(id).await
        }

        async fn delete_notification(&self, id: Id<NotificationMarker>) -> store::Result<bool> {
            self.0.delete_notification(id).await
        }

        async fn insert_authentication(
            &self,
            authentication: &Authentication,
        ) -> store::Result<()> {
            self.0.insert_authentication(authentication).await
        }

        async fn fetch_authentication(
            &self,
            hash: &AuthTokenHash,
        ) -> store::Result<Option<Authentication>> {
            self.0.fetch_authentication(hash).await
        }
    }
}
