use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Tracks in-flight requests by id. "Loading" means the set is non-empty.
///
/// Every request holds a [`LoadGuard`]; dropping it (on success, failure or
/// when the future is discarded) removes its id, so completions may arrive
/// in any order.
#[derive(Debug, Clone, Default)]
pub struct LoadTracker {
    in_flight: Arc<Mutex<HashSet<Uuid>>>,
}

impl LoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new request and return the guard that ends it.
    #[must_use = "the request ends as soon as the guard is dropped"]
    pub fn begin(&self) -> LoadGuard {
        let id = Uuid::new_v4();
        self.lock().insert(id);
        LoadGuard {
            id,
            tracker: self.clone(),
        }
    }

    pub fn is_loading(&self) -> bool {
        !self.lock().is_empty()
    }

    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<Uuid>> {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Handle for one in-flight request.
#[derive(Debug)]
pub struct LoadGuard {
    id: Uuid,
    tracker: LoadTracker,
}

impl LoadGuard {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for LoadGuard {
    fn drop(&mut self) {
        self.tracker.lock().remove(&self.id);
    }
}
