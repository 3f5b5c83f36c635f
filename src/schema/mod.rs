//! Static schema registry: the closed set of admin collections and their shapes.

pub mod records;
pub mod registry;

pub use records::*;
pub use registry::*;

/// Insert/update payload: field name to JSON value.
pub type ResourcePayload = serde_json::Map<String, serde_json::Value>;
