use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Keyed per-user async locks.
///
/// The transport may deliver two messages from one user concurrently; the
/// gateway holds the user's lock across the whole read-modify-write of a
/// delivery so a stale session read can never overwrite a fresh answer.
/// Deliveries for different users proceed in parallel.
#[derive(Default)]
pub struct UserLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch (or create) the lock for `user_id`. The returned handle must be
    /// `.lock().await`ed by the caller for the duration of the delivery.
    pub fn lock_for(&self, user_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().expect("user lock registry poisoned");
        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}
