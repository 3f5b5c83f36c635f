//! Shared application state for all routes. The store and invalidator are
//! injected handles, never resolved from ambient context.

use crate::revalidate::PathInvalidator;
use crate::store::RowStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RowStore>,
    pub invalidator: Arc<dyn PathInvalidator>,
}

impl AppState {
    pub fn new(store: Arc<dyn RowStore>, invalidator: Arc<dyn PathInvalidator>) -> Self {
        AppState { store, invalidator }
    }
}
