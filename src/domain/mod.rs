//! Domain layer types and invariants.

pub mod entities;
pub mod journal;
pub mod posts;
pub mod practice;
pub mod slug;
pub mod types;
