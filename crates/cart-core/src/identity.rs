//! # Item Identity
//!
//! Derives the identity hash that decides whether two adds are "the same
//! purchasable" (merge quantities) or different lines.
//!
//! ## What Goes Into The Hash
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  IDENTITY FIELDS                       NOT IDENTITY                     │
//! │  ───────────────                       ────────────                     │
//! │  id          "sku1" / 42               quantity   (merging bumps it)    │
//! │  name        "T-Shirt"                 taxable                          │
//! │  unit_price  1000 (cents)              attributes                       │
//! │  options     { size: L, color: red }   sub_items                        │
//! │                                        added_at                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Options are canonicalized (object keys sorted at every depth) so
//! `{size, color}` and `{color, size}` hash identically.
//!
//! ## Forced-Unique Mode
//! A line item that must not merge with an identical line gets a salted
//! hash. The salt grows by one random UUID per attempt until the hash is
//! not taken, giving up after [`MAX_HASH_ATTEMPTS`].

use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::attributes::AttributeMap;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::ItemId;

/// Upper bound on salted retries in forced-unique mode.
pub const MAX_HASH_ATTEMPTS: usize = 16;

/// Borrowed view of the fields that define an item's identity.
#[derive(Debug, Clone, Copy)]
pub struct IdentityFields<'a> {
    pub id: &'a ItemId,
    pub name: &'a str,
    pub unit_price: Money,
    pub options: &'a AttributeMap,
}

impl IdentityFields<'_> {
    /// Deterministic identity hash (64 hex chars).
    pub fn hash(&self) -> String {
        self.hash_with_salt(None)
    }

    /// Salted hash, used only by forced-unique mode.
    pub fn hash_with_salt(&self, salt: Option<&str>) -> String {
        let mut canonical = String::new();
        write_canonical(&self.to_value(), &mut canonical);

        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        if let Some(salt) = salt {
            hasher.update(b"|salt|");
            hasher.update(salt.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Generates a salted hash that `is_taken` does not claim, or fails
    /// with [`CoreError::HashGeneration`].
    ///
    /// ## Example
    /// ```rust
    /// use cart_core::attributes::AttributeMap;
    /// use cart_core::identity::IdentityFields;
    /// use cart_core::money::Money;
    /// use cart_core::types::ItemId;
    ///
    /// let id = ItemId::from("sku1");
    /// let options = AttributeMap::new();
    /// let fields = IdentityFields {
    ///     id: &id,
    ///     name: "Mug",
    ///     unit_price: Money::from_cents(500),
    ///     options: &options,
    /// };
    ///
    /// let plain = fields.hash();
    /// let unique = fields.unique_hash(|candidate| candidate == plain).unwrap();
    /// assert_ne!(plain, unique);
    /// ```
    pub fn unique_hash<F>(&self, is_taken: F) -> CoreResult<String>
    where
        F: Fn(&str) -> bool,
    {
        let mut salt = String::new();
        for _ in 0..MAX_HASH_ATTEMPTS {
            salt.push_str(&Uuid::new_v4().simple().to_string());
            let candidate = self.hash_with_salt(Some(&salt));
            if !is_taken(&candidate) {
                return Ok(candidate);
            }
        }

        Err(CoreError::HashGeneration {
            attempts: MAX_HASH_ATTEMPTS,
        })
    }

    fn to_value(&self) -> Value {
        json!([
            self.id,
            self.name,
            self.unit_price.cents(),
            self.options.to_value(),
        ])
    }
}

/// Writes `value` as compact JSON with object keys sorted at every depth.
///
/// Independent of serde_json's map ordering feature flags.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (index, (key, inner)) in entries.into_iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(inner, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (index, inner) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_canonical(inner, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
