//! Generic resource actions shared by every admin screen.

mod resource;
pub use resource::{create_resource, delete_resource, edit_resource, ActionResult};
