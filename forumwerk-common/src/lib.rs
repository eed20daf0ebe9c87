//! Shared models and the pure read-side engine of forumwerk: reply trees,
//! like/post aggregation and mention scanning.

pub mod aggregate;
pub mod mention;
pub mod model;
pub mod snowflake;
pub mod store;
pub mod tree;
pub mod util;
