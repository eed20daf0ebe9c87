use crate::{
    ContentService, MentionTarget,
    error::{Missing, Result},
    service::distinct_threads,
};
use forumwerk_common::model::{
    Id,
    like::{LikeOutcome, LikeTarget, LikeToggle},
    notification::NotificationKind,
    post::{CreatePost, Post, PostMarker, PostView},
    user::{User, UserMarker},
};
use tracing::{debug, info, instrument};

const THREAD_POSTED_IN: &str = "Someone posted in your thread.";
const POST_REPLIED_TO: &str = "Someone replied to your post.";
const POST_LIKED: &str = "Your post was liked!";

impl ContentService {
    /// Adds a post to a thread, as a reply when `post.parent` is set.
    ///
    /// The parent has to live in the same thread; otherwise it counts as
    /// missing.
    #[instrument(skip(self, post), fields(thread = %post.thread, parent = ?post.parent))]
    pub async fn create_post(&self, author: Id<UserMarker>, post: &CreatePost) -> Result<PostView> {
        let thread = self.require_thread(post.thread).await?;
        let parent = match post.parent {
            Some(parent_id) => {
                let parent = self.require_post(parent_id).await?;
                if parent.thread != thread.id {
                    return Err(Missing::Post(parent_id).into());
                }
                Some(parent)
            }
            None => None,
        };

        let created = self.store.create_post(author, post).await?;
        info!(post = %created.id, "Created post");

        self.notifications
            .scan_and_notify_mentions(&created.content, author, MentionTarget::Post(created.id))
            .await;

        let (recipient, message) = match &parent {
            Some(parent) => (parent.author.id, POST_REPLIED_TO),
            None => (thread.author.id, THREAD_POSTED_IN),
        };
        if recipient != author {
            self.notifications
                .dispatch(
                    recipient,
                    author,
                    message,
                    NotificationKind::Reply,
                    Some(format!("/threads/{}", thread.id)),
                )
                .await;
        }

        self.post_view(&created).await
    }

    /// Replies to `parent` in whichever thread it belongs to.
    #[instrument(skip(self, content))]
    pub async fn reply_to_post(
        &self,
        author: Id<UserMarker>,
        parent: Id<PostMarker>,
        content: String,
    ) -> Result<PostView> {
        let parent_post = self.require_post(parent).await?;
        self.create_post(
            author,
            &CreatePost {
                thread: parent_post.thread,
                parent: Some(parent),
                content,
            },
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn get_post(&self, id: Id<PostMarker>) -> Result<PostView> {
        let post = self.require_post(id).await?;
        self.post_view(&post).await
    }

    /// Every post of every depth, newest first, each with its replies.
    #[instrument(skip(self))]
    pub async fn list_posts(&self) -> Result<Vec<PostView>> {
        let mut posts = self.store.list_posts().await?;
        newest_first(&mut posts);
        self.post_views(&posts).await
    }

    /// Posts written by `author`, newest first.
    #[instrument(skip(self))]
    pub async fn posts_by_user(&self, author: Id<UserMarker>) -> Result<Vec<PostView>> {
        self.require_user(author).await?;
        let mut posts = self.store.list_posts_by_author(author).await?;
        newest_first(&mut posts);
        self.post_views(&posts).await
    }

    #[instrument(skip(self, content))]
    pub async fn update_post(&self, id: Id<PostMarker>, content: &str) -> Result<PostView> {
        let before = self.require_post(id).await?;
        let updated = self
            .store
            .update_post(id, content)
            .await?
            .ok_or(Missing::Post(id))?;

        if updated.content != before.content {
            self.notifications
                .scan_and_notify_mentions(
                    &updated.content,
                    updated.author.id,
                    MentionTarget::Post(id),
                )
                .await;
        }

        self.post_view(&updated).await
    }

    /// Deletes the post together with every reply below it.
    #[instrument(skip(self))]
    pub async fn delete_post(&self, id: Id<PostMarker>) -> Result<()> {
        if self.store.delete_post(id).await? {
            info!("Deleted post");
            Ok(())
        } else {
            Err(Missing::Post(id).into())
        }
    }

    /// Likes the post, or takes the like back if `user` already liked it.
    #[instrument(skip(self))]
    pub async fn toggle_post_like(
        &self,
        user: Id<UserMarker>,
        id: Id<PostMarker>,
    ) -> Result<LikeOutcome<PostView>> {
        let post = self.require_post(id).await?;
        let target = LikeTarget::Post(id);

        let state = if self.store.has_like(user, target).await? {
            self.store.delete_like(user, target).await?;
            LikeToggle::Unliked
        } else {
            if !self.store.insert_like(user, target).await? {
                debug!("Like was inserted concurrently");
            }
            LikeToggle::Liked
        };

        if state == LikeToggle::Liked && post.author.id != user {
            self.notifications
                .dispatch(
                    post.author.id,
                    user,
                    POST_LIKED,
                    NotificationKind::Like,
                    Some(format!("/posts/{id}")),
                )
                .await;
        }

        Ok(LikeOutcome {
            state,
            target: self.post_view(&post).await?,
        })
    }

    #[instrument(skip(self))]
    pub async fn post_likers(&self, id: Id<PostMarker>) -> Result<Vec<User>> {
        self.require_post(id).await?;
        Ok(self.store.list_likers(LikeTarget::Post(id)).await?)
    }

    #[instrument(skip(self))]
    pub async fn post_like_count(&self, id: Id<PostMarker>) -> Result<u64> {
        self.require_post(id).await?;
        let counts = self.store.count_post_likes(&[id]).await?;
        Ok(counts
            .into_iter()
            .filter(|(post, _)| *post == id)
            .map(|(_, count)| count)
            .sum())
    }

    async fn post_view(&self, post: &Post) -> Result<PostView> {
        let snapshot = self.snapshot(&[post.thread]).await?;
        Ok(snapshot.post_view(post))
    }

    async fn post_views(&self, posts: &[Post]) -> Result<Vec<PostView>> {
        let threads = distinct_threads(posts.iter().map(|post| post.thread));
        let snapshot = self.snapshot(&threads).await?;
        let posts: Vec<&Post> = posts.iter().collect();
        Ok(snapshot.post_views(&posts))
    }
}

pub(super) fn newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
}
