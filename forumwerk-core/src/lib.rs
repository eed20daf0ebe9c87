//! Content orchestration for forumwerk: the create/read/update/delete/like
//! operations, their notification side effects and an in-memory store.

pub mod error;
pub mod memory;
pub mod notify;
pub mod service;

pub use error::{Missing, ServiceError};
pub use notify::{MentionTarget, NotificationDispatcher};
pub use service::ContentService;
