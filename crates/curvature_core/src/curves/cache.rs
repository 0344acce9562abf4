//! Version-stamped cache for interpolated curve values.

use crate::types::{AdOrder, Date, Number};
use std::collections::HashMap;

/// Cache of interpolated values keyed by `(date, ad_order)`.
///
/// Entries are valid only for the curve version they were computed under.
/// A lookup with a newer version discards the whole map before reporting a
/// miss, so stale values can never be returned after a node mutation.
#[derive(Debug, Clone, Default)]
pub struct ValueCache {
    version: u64,
    entries: HashMap<(Date, AdOrder), Number>,
}

impl ValueCache {
    /// Create an empty cache at version zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a cached value for the given curve version.
    ///
    /// A version newer than the cache's own evicts everything first.
    pub fn get(&mut self, version: u64, date: Date, order: AdOrder) -> Option<Number> {
        if version != self.version {
            self.entries.clear();
            self.version = version;
            return None;
        }
        self.entries.get(&(date, order)).cloned()
    }

    /// Store a value computed under the given curve version.
    ///
    /// Storing under a different version evicts prior entries first.
    pub fn insert(&mut self, version: u64, date: Date, order: AdOrder, value: Number) {
        if version != self.version {
            self.entries.clear();
            self.version = version;
        }
        self.entries.insert((date, order), value);
    }

    /// Evict all entries immediately.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
