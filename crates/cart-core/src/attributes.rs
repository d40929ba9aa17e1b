//! # Attribute Maps
//!
//! Nested key → value mappings addressed with dotted paths.
//!
//! Used for three things that look alike but behave differently:
//! - item `options` (participate in identity hashing)
//! - item `attributes` (free-form, never hashed)
//! - cart-level `attributes` (free-form cart metadata)
//!
//! ## Path Semantics
//! ```text
//! set("gift.wrap", "red")   →  { "gift": { "wrap": "red" } }
//! get("gift.wrap")          →  Some("red")
//! get("gift.card")          →  None            (reads never fail)
//! set("gift.wrap.style", 1) →  { "gift": { "wrap": { "style": 1 } } }
//!                              (a scalar in the way is replaced)
//! remove("gift")            →  Some({ "wrap": { "style": 1 } })
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, CoreResult};
use crate::validation::validate_path;

/// A nested JSON-object mapping with dotted-path accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeMap(Map<String, Value>);

impl AttributeMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored at `path`, if any.
    ///
    /// Malformed paths simply find nothing.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Returns the value at `path`, or `default` when nothing is stored there.
    pub fn get_or(&self, path: &str, default: Value) -> Value {
        self.get(path).cloned().unwrap_or(default)
    }

    /// Checks whether a value is stored at `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Stores `value` at `path`, creating intermediate objects as needed.
    ///
    /// ## Errors
    /// [`CoreError::InvalidPath`] for empty segments or whitespace.
    pub fn set(&mut self, path: &str, value: Value) -> CoreResult<()> {
        let segments = checked_segments(path)?;
        let Some((last, parents)) = segments.split_last() else {
            return Err(invalid_path(path, "no segments"));
        };

        let mut current = &mut self.0;
        for segment in parents {
            let slot = current
                .entry((*segment).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            current = slot
                .as_object_mut()
                .ok_or_else(|| invalid_path(path, "intermediate value is not an object"))?;
        }

        current.insert((*last).to_string(), value);
        Ok(())
    }

    /// Removes and returns the value at `path`.
    ///
    /// A path that leads nowhere is not an error: `Ok(None)`.
    pub fn remove(&mut self, path: &str) -> CoreResult<Option<Value>> {
        let segments = checked_segments(path)?;
        let Some((last, parents)) = segments.split_last() else {
            return Ok(None);
        };

        let mut current = &mut self.0;
        for segment in parents {
            match current.get_mut(*segment).and_then(Value::as_object_mut) {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }

        Ok(current.remove(*last))
    }

    /// Returns true when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Removes everything.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Iterates top-level entries.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Borrows the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Returns the whole map as a JSON value (used for identity hashing).
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl From<Map<String, Value>> for AttributeMap {
    fn from(map: Map<String, Value>) -> Self {
        AttributeMap(map)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for AttributeMap {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        AttributeMap(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

fn checked_segments(path: &str) -> CoreResult<Vec<&str>> {
    validate_path(path).map_err(|err| invalid_path(path, &err.to_string()))
}

fn invalid_path(path: &str, reason: &str) -> CoreError {
    CoreError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
