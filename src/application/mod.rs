//! Application services layer.

pub mod admin;
pub mod content;
pub mod error;
pub mod jobs;
pub mod notify;
pub mod repos;
