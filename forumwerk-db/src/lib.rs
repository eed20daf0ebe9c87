//! PostgreSQL implementation of the forumwerk content store.

mod client;
mod record;

pub use client::{DbClient, DbError, Result};
