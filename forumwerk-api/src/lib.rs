//! HTTP surface of forumwerk.

pub mod server;
