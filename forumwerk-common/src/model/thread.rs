use crate::model::{
    AuthorRef, Id,
    forum::{Forum, ForumMarker},
    post::PostView,
    user::{User, UserHandle},
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct ThreadMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Thread {
    pub id: Id<ThreadMarker>,
    pub forum: Id<ForumMarker>,
    pub author: User,
    pub title: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct CreateThread {
    pub forum: Id<ForumMarker>,
    pub title: String,
    pub content: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct ThreadPatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl ThreadPatch {
    pub fn apply(&self, thread: &mut Thread) {
        if let Some(title) = &self.title {
            thread.title.clone_from(title);
        }
        if let Some(content) = &self.content {
            thread.content.clone_from(content);
        }
    }
}

/// Which threads a store listing returns.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum ThreadFilter {
    All,
    Forum(Id<ForumMarker>),
    Author(Id<crate::model::user::UserMarker>),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct ThreadSummary {
    pub id: Id<ThreadMarker>,
    pub title: String,
    pub author_handle: UserHandle,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&Thread> for ThreadSummary {
    fn from(thread: &Thread) -> Self {
        Self {
            id: thread.id,
            title: thread.title.clone(),
            author_handle: thread.author.handle.clone(),
            created_at: thread.created_at,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct ThreadView {
    pub id: Id<ThreadMarker>,
    pub title: String,
    pub content: String,
    pub forum_id: Id<ForumMarker>,
    pub forum_title: Option<String>,
    pub forum_image_url: Option<String>,
    pub author: AuthorRef,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub like_count: u64,
    /// Posts of every depth, not just the top-level ones in `posts`.
    pub post_count: u64,
    pub posts: Vec<PostView>,
}

impl ThreadView {
    pub(crate) fn compose(
        thread: &Thread,
        forum: Option<&Forum>,
        like_count: u64,
        post_count: u64,
        posts: Vec<PostView>,
    ) -> Self {
        Self {
            id: thread.id,
            title: thread.title.clone(),
            content: thread.content.clone(),
            forum_id: thread.forum,
            forum_title: forum.map(|forum| forum.title.clone()),
            forum_image_url: forum.and_then(|forum| forum.image_url.clone()),
            author: AuthorRef::from(&thread.author),
            created_at: thread.created_at,
            like_count,
            post_count,
            posts,
        }
    }
}

/// Ordering for thread listings.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadSort {
    /// Newest first.
    #[default]
    New,
    /// Most posts first.
    Best,
    /// Most likes first.
    Hot,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Error)]
#[error("Unknown thread sort: {0}")]
pub struct UnknownThreadSortError(String);

impl FromStr for ThreadSort {
    type Err = UnknownThreadSortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "new" => Ok(ThreadSort::New),
            "best" => Ok(ThreadSort::Best),
            "hot" => Ok(ThreadSort::Hot),
            _ => Err(UnknownThreadSortError(s.to_owned())),
        }
    }
}

impl ThreadSort {
    /// Sorts views in place; ties fall back to newest first, then id.
    pub fn sort(self, views: &mut [ThreadView]) {
        views.sort_by(|a, b| {
            let primary = match self {
                ThreadSort::New => std::cmp::Ordering::Equal,
                ThreadSort::Best => b.post_count.cmp(&a.post_count),
                ThreadSort::Hot => b.like_count.cmp(&a.like_count),
            };
            primary
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| b.id.cmp(&a.id))
        });
    }
}
