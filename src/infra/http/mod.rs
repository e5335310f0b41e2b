//! HTTP surface: public content routes and the admin gateway endpoint.

mod admin;
mod error;
mod public;

pub use admin::{AdminHttpState, build_admin_router};
pub use error::ApiError;
pub use public::{PublicState, build_public_router};
