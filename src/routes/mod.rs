//! Router assembly.

mod common;
mod resource;

pub use common::{common_routes, common_routes_with_ready};
pub use resource::{admin_routes, api_routes};
