//! Application services sitting between the HTTP layer and the repositories.

pub mod admin;
pub mod error;
pub mod feed;
pub mod follows;
pub mod forms;
pub mod pagination;
pub mod posts;
pub mod repos;
