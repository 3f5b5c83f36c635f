//! View invalidation: successful mutations mark a navigational path stale so
//! the rendering layer recomputes it on next access.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

/// Consumer of invalidation events. Paths are opaque; they are never checked
/// against a route table here.
pub trait PathInvalidator: Send + Sync {
    fn invalidate(&self, path: &str);
}

/// Default invalidator: a shared stale-path set the view layer polls and clears.
#[derive(Clone, Default)]
pub struct StalePaths {
    inner: Arc<RwLock<HashSet<String>>>,
}

impl StalePaths {
    pub fn new() -> Self {
        StalePaths::default()
    }

    pub fn is_stale(&self, path: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(path)
    }

    /// Clears the path's stale mark; returns whether it was set.
    pub fn take(&self, path: &str) -> bool {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path)
    }
}

impl PathInvalidator for StalePaths {
    fn invalidate(&self, path: &str) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string());
    }
}
