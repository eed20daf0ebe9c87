use crate::{
    ContentService,
    error::{Result, ServiceError},
    service::{distinct_threads, forums, posts},
};
use forumwerk_common::model::{
    Id,
    post::PostView,
    thread::{ThreadFilter, ThreadView},
    user::{CreateUser, User, UserMarker},
};
use serde::Serialize;
use tracing::{info, instrument};

/// Everything a user wrote, composed from one snapshot.
#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct UserActivity {
    pub threads: Vec<ThreadView>,
    pub posts: Vec<PostView>,
}

impl ContentService {
    #[instrument(skip_all, fields(handle = %user.handle))]
    pub async fn register_user(&self, user: &CreateUser) -> Result<User> {
        if self
            .store
            .fetch_user_by_handle(user.handle.get())
            .await?
            .is_some()
        {
            return Err(ServiceError::HandleTaken(user.handle.clone()));
        }

        let user = self.store.create_user(user).await?;
        info!(user = %user.id, "Registered user");
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, id: Id<UserMarker>) -> Result<User> {
        self.require_user(id).await
    }

    /// Threads and posts of `id`, both newest first.
    #[instrument(skip(self))]
    pub async fn user_activity(&self, id: Id<UserMarker>) -> Result<UserActivity> {
        self.require_user(id).await?;

        let mut threads = self.store.list_threads(ThreadFilter::Author(id)).await?;
        forums::newest_first(&mut threads);
        let mut posts = self.store.list_posts_by_author(id).await?;
        posts::newest_first(&mut posts);

        let thread_ids = distinct_threads(
            threads
                .iter()
                .map(|thread| thread.id)
                .chain(posts.iter().map(|post| post.thread)),
        );
        let snapshot = self.snapshot(&thread_ids).await?;
        let forums_by_id = self.forums_by_id().await?;

        Ok(UserActivity {
            threads: threads
                .iter()
                .map(|thread| snapshot.thread_view(thread, forums_by_id.get(&thread.forum)))
                .collect(),
            posts: posts.iter().map(|post| snapshot.post_view(post)).collect(),
        })
    }
}
