//! # Key/Value Store
//!
//! The persistence seam for carts. A cart is one JSON blob under
//! `<key_prefix><instance>`; a separate well-known key remembers which
//! instance the caller last selected.
//!
//! ```text
//! ┌──────────────────────────────┬───────────────────────────────────────┐
//! │ key                          │ value                                 │
//! ├──────────────────────────────┼───────────────────────────────────────┤
//! │ cart.instance                │ "wishlist"                            │
//! │ cart_default                 │ {"items":[...],"coupons":[...],...}   │
//! │ cart_wishlist                │ {"items":[...],"coupons":[...],...}   │
//! └──────────────────────────────┴───────────────────────────────────────┘
//! ```
//!
//! Session stores, caches and databases implement [`KeyValueStore`];
//! [`MemoryStore`] ships for tests and single-process use.

use std::collections::HashMap;

use crate::error::StoreError;

/// Blob storage keyed by string.
pub trait KeyValueStore {
    /// Returns the blob stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `blob` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, blob: String) -> Result<(), StoreError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &mut T {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, blob: String) -> Result<(), StoreError> {
        (**self).set(key, blob)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, blob: String) -> Result<(), StoreError> {
        (**self).set(key, blob)
    }
}

// =============================================================================
// Memory Store
// =============================================================================

/// In-process store backed by a `HashMap`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops a key. Carts never delete; this is for callers expiring sessions.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, blob: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), blob);
        Ok(())
    }
}
