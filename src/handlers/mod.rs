//! HTTP handlers: REST CRUD per resource, plus the admin action surface.

pub mod admin;
pub mod resource;
