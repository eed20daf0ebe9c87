use crate::model::{Id, thread::ThreadSummary};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct ForumMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Forum {
    pub id: Id<ForumMarker>,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct CreateForum {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Partial update; `None` keeps the stored value.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct ForumPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl ForumPatch {
    pub fn apply(&self, forum: &mut Forum) {
        if let Some(title) = &self.title {
            forum.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            forum.description = Some(description.clone());
        }
        if let Some(image_url) = &self.image_url {
            forum.image_url = Some(image_url.clone());
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct ForumView {
    #[serde(flatten)]
    pub forum: Forum,
    pub threads: Vec<ThreadSummary>,
}
