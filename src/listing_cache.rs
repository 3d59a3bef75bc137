//! A process-wide cache for rendered record listings.
//!
//! Listings change only when their owner submits a new record, so the cached
//! body stays valid until the submission handler invalidates it.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

/// Caches each user's rendered record listing, keyed by subject ID.
///
/// A cache failure is never an application failure: if the lock is
/// unavailable the cache behaves as if it were empty.
#[derive(Debug, Clone, Default)]
pub struct ListingCache {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl ListingCache {
    /// Create an empty listing cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cached listing body for `subject_id`, if one is stored.
    pub fn get(&self, subject_id: &str) -> Option<String> {
        let Ok(entries) = self.entries.lock() else {
            return None;
        };

        entries.get(subject_id).cloned()
    }

    /// Store the rendered listing body for `subject_id`.
    pub fn put(&self, subject_id: &str, body: String) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(subject_id.to_owned(), body);
        }
    }

    /// Drop the cached listing for `subject_id` so the next read is fresh.
    pub fn invalidate(&self, subject_id: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(subject_id);
        }
    }
}
