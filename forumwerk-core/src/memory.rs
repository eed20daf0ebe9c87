//! A [`ContentStore`] kept in process memory.
//!
//! Rows reference their author by id and are resolved on read, the same way
//! the database joins them. Cascades follow the database schema.

use async_trait::async_trait;
use forumwerk_common::{
    model::{
        ForumwerkSnowflakeGenerator, Id,
        auth::{AuthTokenHash, Authentication},
        forum::{CreateForum, Forum, ForumMarker, ForumPatch},
        like::LikeTarget,
        notification::{NewNotification, Notification, NotificationMarker},
        post::{CreatePost, Post, PostMarker},
        thread::{CreateThread, Thread, ThreadFilter, ThreadMarker, ThreadPatch},
        user::{CreateUser, Role, User, UserMarker},
    },
    snowflake::{ProcessId, WorkerId},
    store::{ContentStore, Result, StoreError},
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::Mutex;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum MemoryStoreError {
    #[error("The referenced {0} does not exist")]
    MissingReference(&'static str),
}

#[derive(Clone, Debug)]
struct ThreadRow {
    forum: Id<ForumMarker>,
    author: Id<UserMarker>,
    title: String,
    content: String,
    created_at: OffsetDateTime,
}

#[derive(Clone, Debug)]
struct PostRow {
    thread: Id<ThreadMarker>,
    parent: Option<Id<PostMarker>>,
    author: Id<UserMarker>,
    content: String,
    created_at: OffsetDateTime,
}

#[derive(Debug, Default)]
struct State {
    users: BTreeMap<Id<UserMarker>, User>,
    forums: BTreeMap<Id<ForumMarker>, Forum>,
    threads: BTreeMap<Id<ThreadMarker>, ThreadRow>,
    posts: BTreeMap<Id<PostMarker>, PostRow>,
    likes: BTreeSet<(Id<UserMarker>, LikeTarget)>,
    notifications: BTreeMap<Id<NotificationMarker>, Notification>,
    authentications: HashMap<AuthTokenHash, Authentication>,
}

impl State {
    fn user(&self, id: Id<UserMarker>) -> Result<User> {
        self.users
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::backend(MemoryStoreError::MissingReference("user")))
    }

    fn thread(&self, id: Id<ThreadMarker>, row: &ThreadRow) -> Result<Thread> {
        Ok(Thread {
            id,
            forum: row.forum,
            author: self.user(row.author)?,
            title: row.title.clone(),
            content: row.content.clone(),
            created_at: row.created_at,
        })
    }

    fn post(&self, id: Id<PostMarker>, row: &PostRow) -> Result<Post> {
        Ok(Post {
            id,
            thread: row.thread,
            parent: row.parent,
            author: self.user(row.author)?,
            content: row.content.clone(),
            created_at: row.created_at,
        })
    }

    fn threads_where(&self, keep: impl Fn(&ThreadRow) -> bool) -> Result<Vec<Thread>> {
        self.threads
            .iter()
            .filter(|(_, row)| keep(row))
            .map(|(id, row)| self.thread(*id, row))
            .collect()
    }

    fn posts_where(&self, keep: impl Fn(&PostRow) -> bool) -> Result<Vec<Post>> {
        self.posts
            .iter()
            .filter(|(_, row)| keep(row))
            .map(|(id, row)| self.post(*id, row))
            .collect()
    }

    fn remove_thread(&mut self, id: Id<ThreadMarker>) -> bool {
        if self.threads.remove(&id).is_none() {
            return false;
        }

        let posts: Vec<_> = self
            .posts
            .iter()
            .filter(|(_, row)| row.thread == id)
            .map(|(post, _)| *post)
            .collect();
        for post in posts {
            self.remove_post_row(post);
        }
        self.likes.retain(|(_, target)| *target != LikeTarget::Thread(id));
        true
    }

    /// Removes `id` and every post below it.
    fn remove_post(&mut self, id: Id<PostMarker>) -> bool {
        if !self.posts.contains_key(&id) {
            return false;
        }

        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            pending.extend(
                self.posts
                    .iter()
                    .filter(|(_, row)| row.parent == Some(current))
                    .map(|(child, _)| *child),
            );
            self.remove_post_row(current);
        }
        true
    }

    fn remove_post_row(&mut self, id: Id<PostMarker>) {
        self.posts.remove(&id);
        self.likes.retain(|(_, target)| *target != LikeTarget::Post(id));
    }

    fn target_exists(&self, target: LikeTarget) -> bool {
        match target {
            LikeTarget::Post(id) => self.posts.contains_key(&id),
            LikeTarget::Thread(id) => self.threads.contains_key(&id),
        }
    }
}

/// In-memory store behind a tokio mutex. Every operation holds the lock for
/// its whole duration, so each one is atomic.
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<State>,
    ids: ForumwerkSnowflakeGenerator,
}

impl MemoryStore {
    #[must_use]
    pub fn new(ids: ForumwerkSnowflakeGenerator) -> Self {
        Self {
            state: Mutex::default(),
            ids,
        }
    }

    /// A fresh id and the creation time it encodes.
    fn next_id<Marker>(&self) -> (Id<Marker>, OffsetDateTime) {
        let snowflake = self.ids.generate();
        (Id::new(snowflake), snowflake.created_at())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(ForumwerkSnowflakeGenerator::new(
            WorkerId::default(),
            ProcessId::default(),
        ))
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn fetch_user(&self, id: Id<UserMarker>) -> Result<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn fetch_user_by_handle(&self, handle: &str) -> Result<Option<User>> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .values()
            .find(|user| user.handle.get() == handle)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.state.lock().await.users.values().cloned().collect())
    }

    async fn create_user(&self, user: &CreateUser) -> Result<User> {
        let (id, _) = self.next_id();
        let user = User {
            id,
            handle: user.handle.clone(),
            role: Role::default(),
            banned_at: None,
        };

        self.state.lock().await.users.insert(id, user.clone());
        Ok(user)
    }

    async fn set_user_role(&self, id: Id<UserMarker>, role: Role) -> Result<Option<User>> {
        let mut state = self.state.lock().await;
        Ok(state.users.get_mut(&id).map(|user| {
            user.role = role;
            user.clone()
        }))
    }

    async fn set_user_ban(
        &self,
        id: Id<UserMarker>,
        banned_at: Option<OffsetDateTime>,
    ) -> Result<Option<User>> {
        let mut state = self.state.lock().await;
        Ok(state.users.get_mut(&id).map(|user| {
            user.banned_at = banned_at;
            user.clone()
        }))
    }

    async fn fetch_forum(&self, id: Id<ForumMarker>) -> Result<Option<Forum>> {
        Ok(self.state.lock().await.forums.get(&id).cloned())
    }

    async fn list_forums(&self) -> Result<Vec<Forum>> {
        Ok(self.state.lock().await.forums.values().cloned().collect())
    }

    async fn create_forum(&self, forum: &CreateForum) -> Result<Forum> {
        let (id, created_at) = self.next_id();
        let forum = Forum {
            id,
            title: forum.title.clone(),
            description: forum.description.clone(),
            image_url: forum.image_url.clone(),
            created_at,
        };

        self.state.lock().await.forums.insert(id, forum.clone());
        Ok(forum)
    }

    async fn update_forum(&self, id: Id<ForumMarker>, patch: &ForumPatch) -> Result<Option<Forum>> {
        let mut state = self.state.lock().await;
        Ok(state.forums.get_mut(&id).map(|forum| {
            patch.apply(forum);
            forum.clone()
        }))
    }

    async fn delete_forum(&self, id: Id<ForumMarker>) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state.forums.remove(&id).is_none() {
            return Ok(false);
        }

        let threads: Vec<_> = state
            .threads
            .iter()
            .filter(|(_, row)| row.forum == id)
            .map(|(thread, _)| *thread)
            .collect();
        for thread in threads {
            state.remove_thread(thread);
        }
        Ok(true)
    }

    async fn fetch_thread(&self, id: Id<ThreadMarker>) -> Result<Option<Thread>> {
        let state = self.state.lock().await;
        state
            .threads
            .get(&id)
            .map(|row| state.thread(id, row))
            .transpose()
    }

    async fn list_threads(&self, filter: ThreadFilter) -> Result<Vec<Thread>> {
        let state = self.state.lock().await;
        match filter {
            ThreadFilter::All => state.threads_where(|_| true),
            ThreadFilter::Forum(forum) => state.threads_where(|row| row.forum == forum),
            ThreadFilter::Author(author) => state.threads_where(|row| row.author == author),
        }
    }

    async fn create_thread(&self, author: Id<UserMarker>, thread: &CreateThread) -> Result<Thread> {
        let (id, created_at) = self.next_id();
        let mut state = self.state.lock().await;
        if !state.forums.contains_key(&thread.forum) {
            return Err(StoreError::backend(MemoryStoreError::MissingReference("forum")));
        }

        let row = ThreadRow {
            forum: thread.forum,
            author,
            title: thread.title.clone(),
            content: thread.content.clone(),
            created_at,
        };
        let created = state.thread(id, &row)?;
        state.threads.insert(id, row);
        Ok(created)
    }

    async fn update_thread(
        &self,
        id: Id<ThreadMarker>,
        patch: &ThreadPatch,
    ) -> Result<Option<Thread>> {
        let mut state = self.state.lock().await;
        let Some(row) = state.threads.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(title) = &patch.title {
            row.title.clone_from(title);
        }
        if let Some(content) = &patch.content {
            row.content.clone_from(content);
        }

        let row = row.clone();
        state.thread(id, &row).map(Some)
    }

    async fn delete_thread(&self, id: Id<ThreadMarker>) -> Result<bool> {
        Ok(self.state.lock().await.remove_thread(id))
    }

    async fn fetch_post(&self, id: Id<PostMarker>) -> Result<Option<Post>> {
        let state = self.state.lock().await;
        state.posts.get(&id).map(|row| state.post(id, row)).transpose()
    }

    async fn list_posts(&self) -> Result<Vec<Post>> {
        self.state.lock().await.posts_where(|_| true)
    }

    async fn list_posts_by_threads(&self, threads: &[Id<ThreadMarker>]) -> Result<Vec<Post>> {
        self.state
            .lock()
            .await
            .posts_where(|row| threads.contains(&row.thread))
    }

    async fn list_posts_by_author(&self, author: Id<UserMarker>) -> Result<Vec<Post>> {
        self.state
            .lock()
            .await
            .posts_where(|row| row.author == author)
    }

    async fn create_post(&self, author: Id<UserMarker>, post: &CreatePost) -> Result<Post> {
        let (id, created_at) = self.next_id();
        let mut state = self.state.lock().await;
        if !state.threads.contains_key(&post.thread) {
            return Err(StoreError::backend(MemoryStoreError::MissingReference("thread")));
        }
        if post
            .parent
            .is_some_and(|parent| !state.posts.contains_key(&parent))
        {
            return Err(StoreError::backend(MemoryStoreError::MissingReference("post")));
        }

        let row = PostRow {
            thread: post.thread,
            parent: post.parent,
            author,
            content: post.content.clone(),
            created_at,
        };
        let created = state.post(id, &row)?;
        state.posts.insert(id, row);
        Ok(created)
    }

    async fn update_post(&self, id: Id<PostMarker>, content: &str) -> Result<Option<Post>> {
        let mut state = self.state.lock().await;
        let Some(row) = state.posts.get_mut(&id) else {
            return Ok(None);
        };

        content.clone_into(&mut row.content);
        let row = row.clone();
        state.post(id, &row).map(Some)
    }

    async fn delete_post(&self, id: Id<PostMarker>) -> Result<bool> {
        Ok(self.state.lock().await.remove_post(id))
    }

    async fn has_like(&self, user: Id<UserMarker>, target: LikeTarget) -> Result<bool> {
        Ok(self.state.lock().await.likes.contains(&(user, target)))
    }

    async fn insert_like(&self, user: Id<UserMarker>, target: LikeTarget) -> Result<bool> {
        let mut state = self.state.lock().await;
        if !state.target_exists(target) {
            return Err(StoreError::backend(MemoryStoreError::MissingReference(
                "like target",
            )));
        }
        Ok(state.likes.insert((user, target)))
    }

    async fn delete_like(&self, user: Id<UserMarker>, target: LikeTarget) -> Result<bool> {
        Ok(self.state.lock().await.likes.remove(&(user, target)))
    }

    async fn count_post_likes(
        &self,
        posts: &[Id<PostMarker>],
    ) -> Result<Vec<(Id<PostMarker>, u64)>> {
        let state = self.state.lock().await;
        let mut counts: BTreeMap<Id<PostMarker>, u64> = BTreeMap::new();
        for (_, target) in &state.likes {
            if let LikeTarget::Post(id) = target
                && posts.contains(id)
            {
                *counts.entry(*id).or_insert(0) += 1;
            }
        }
        Ok(counts.into_iter().collect())
    }

    async fn count_thread_likes(
        &self,
        threads: &[Id<ThreadMarker>],
    ) -> Result<Vec<(Id<ThreadMarker>, u64)>> {
        let state = self.state.lock().await;
        let mut counts: BTreeMap<Id<ThreadMarker>, u64> = BTreeMap::new();
        for (_, target) in &state.likes {
            if let LikeTarget::Thread(id) = target
                && threads.contains(id)
            {
                *counts.entry(*id).or_insert(0) += 1;
            }
        }
        Ok(counts.into_iter().collect())
    }

    async fn list_likers(&self, target: LikeTarget) -> Result<Vec<User>> {
        let state = self.state.lock().await;
        state
            .likes
            .iter()
            .filter(|(_, liked)| *liked == target)
            .map(|(user, _)| state.user(*user))
            .collect()
    }

    async fn insert_notification(&self, notification: &NewNotification) -> Result<Notification> {
        let (id, created_at) = self.next_id();
        let notification = Notification {
            id,
            recipient: notification.recipient,
            sender: notification.sender,
            message: notification.message.clone(),
            url: notification.url.clone(),
            kind: notification.kind,
            is_read: false,
            created_at,
        };

        self.state
            .lock()
            .await
            .notifications
            .insert(id, notification.clone());
        Ok(notification)
    }

    async fn list_notifications(&self, recipient: Id<UserMarker>) -> Result<Vec<Notification>> {
        Ok(self
            .state
            .lock()
            .await
            .notifications
            .values()
            .filter(|notification| notification.recipient == recipient)
            .cloned()
            .collect())
    }

    async fn fetch_notification(
        &self,
        id: Id<NotificationMarker>,
    ) -> Result<Option<Notification>> {
        Ok(self.state.lock().await.notifications.get(&id).cloned())
    }

    async fn mark_notification_read(&self, id: Id<NotificationMarker>) -> Result<bool> {
        let mut state = self.state.lock().await;
        Ok(state
            .notifications
            .get_mut(&id)
            .map(|notification| notification.is_read = true)
            .is_some())
    }

    async fn delete_notification(&self, id: Id<NotificationMarker>) -> Result<bool> {
        Ok(self
            .state
            .lock()
            .await
            .notifications
            .remove(&id)
            .is_some())
    }

    async fn insert_authentication(&self, authentication: &Authentication) -> Result<()> {
        self.state
            .lock()
            .await
            .authentications
            .insert(authentication.token_hash.clone(), authentication.clone());
        Ok(())
    }

    async fn fetch_authentication(&self, hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        Ok(self.state.lock().await.authentications.get(hash).cloned())
    }
}

#[cfg(test)]
mod tests {
    use crate::memory::MemoryStore;
    use forumwerk_common::{
        model::{
            forum::CreateForum,
            like::LikeTarget,
            post::CreatePost,
            thread::{CreateThread, ThreadFilter},
            user::{CreateUser, Role, UserHandle},
        },
        store::ContentStore,
    };

    #[tokio::test]
    async fn likes_are_unique_and_cascade() {
        let store = MemoryStore::default();
        let user = store
            .create_user(&CreateUser {
                handle: UserHandle::new("alice".to_owned()).unwrap(),
            })
            .await
            .unwrap();
        let forum = store
            .create_forum(&CreateForum {
                title: "General".to_owned(),
                ..CreateForum::default()
            })
            .await
            .unwrap();
        let thread = store
            .create_thread(
                user.id,
                &CreateThread {
                    forum: forum.id,
                    title: "Topic".to_owned(),
                    content: String::new(),
                },
            )
            .await
            .unwrap();
        let top = store
            .create_post(
                user.id,
                &CreatePost {
                    thread: thread.id,
                    parent: None,
                    content: "top".to_owned(),
                },
            )
            .await
            .unwrap();
        let reply = store
            .create_post(
                user.id,
                &CreatePost {
                    thread: thread.id,
                    parent: Some(top.id),
                    content: "reply".to_owned(),
                },
            )
            .await
            .unwrap();

        let target = LikeTarget::Post(reply.id);
        assert!(store.insert_like(user.id, target).await.unwrap());
        assert!(!store.insert_like(user.id, target).await.unwrap());
        assert_eq!(
            store.count_post_likes(&[top.id, reply.id]).await.unwrap(),
            vec![(reply.id, 1)]
        );

        assert!(store.delete_post(top.id).await.unwrap());
        assert!(store.fetch_post(reply.id).await.unwrap().is_none());
        assert!(!store.has_like(user.id, target).await.unwrap());

        assert!(store.delete_forum(forum.id).await.unwrap());
        assert!(store.list_threads(ThreadFilter::All).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn authors_resolve_on_read() {
        let store = MemoryStore::default();
        let user = store
            .create_user(&CreateUser {
                handle: UserHandle::new("alice".to_owned()).unwrap(),
            })
            .await
            .unwrap();
        let forum = store
            .create_forum(&CreateForum::default())
            .await
            .unwrap();
        let thread = store
            .create_thread(
                user.id,
                &CreateThread {
                    forum: forum.id,
                    ..CreateThread::default()
                },
            )
            .await
            .unwrap();

        store
            .set_user_role(user.id, Role::Admin)
            .await
            .unwrap();

        let fetched = store.fetch_thread(thread.id).await.unwrap().unwrap();
        assert_eq!(fetched.author.role, Role::Admin);
    }
}
