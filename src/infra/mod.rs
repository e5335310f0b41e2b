//! Infrastructure adapters: persistence, HTTP surface, telemetry, and
//! the local tracker store.

pub mod db;
pub mod error;
pub mod http;
pub mod local;
pub mod telemetry;
