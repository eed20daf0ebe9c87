use crate::model::{
    AuthorRef, Id,
    thread::ThreadMarker,
    user::User,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

/// A stored post. `parent` is `None` for top-level posts.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub thread: Id<ThreadMarker>,
    pub parent: Option<Id<PostMarker>>,
    pub author: User,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct CreatePost {
    pub thread: Id<ThreadMarker>,
    pub parent: Option<Id<PostMarker>>,
    pub content: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct PostContent {
    pub content: String,
}

/// A post rendered as a reply-tree node. Computed on read, never stored.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct PostView {
    pub id: Id<PostMarker>,
    pub thread_id: Id<ThreadMarker>,
    pub parent_id: Option<Id<PostMarker>>,
    pub author: AuthorRef,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub like_count: u64,
    pub replies: Vec<PostView>,
}

impl PostView {
    #[must_use]
    pub fn new(post: &Post, like_count: u64, replies: Vec<PostView>) -> Self {
        Self {
            id: post.id,
            thread_id: post.thread,
            parent_id: post.parent,
            author: AuthorRef::from(&post.author),
            content: post.content.clone(),
            created_at: post.created_at,
            like_count,
            replies,
        }
    }

    /// Number of nodes in this subtree, the node itself included.
    #[must_use]
    pub fn subtree_len(&self) -> usize {
        1 + self.replies.iter().map(PostView::subtree_len).sum::<usize>()
    }
}
