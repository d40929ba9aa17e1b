//! # Error Types
//!
//! Domain-specific error types for cart-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  cart-core errors (this file)                                          │
//! │  ├── CoreError        - Item, identity and path failures               │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  cart-store errors (separate crate)                                    │
//! │  ├── StoreError       - Key/value backend failures                     │
//! │  └── CartError        - What callers of the Cart aggregate see         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CartError → Caller                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (hash, field, quantity)
//! 3. Errors are enum variants, never String
//! 4. Lookup misses are only errors where silently succeeding would lie

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core cart logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An item is missing a required identity field or carries a bad price.
    ///
    /// ## When This Occurs
    /// - Empty textual item id
    /// - Price string that is not a decimal amount
    /// - Negative unit price
    #[error("Invalid item: {reason}")]
    InvalidItem { reason: String },

    /// Quantity is zero, negative, or would overflow on merge.
    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity { quantity: i64 },

    /// Forced-unique hashing exhausted its attempt budget.
    ///
    /// ## When This Occurs
    /// Never in practice. A salted SHA-256 digest colliding with an
    /// existing line `attempts` times in a row means the taken-set
    /// predicate is broken, so we stop instead of looping.
    #[error("Could not generate a unique item hash after {attempts} attempts")]
    HashGeneration { attempts: usize },

    /// No item with this identity hash exists in the cart.
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// A dotted attribute/option path is malformed.
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// A persisted coupon names a kind nobody registered a decoder for.
    #[error("Unknown coupon kind: {0}")]
    UnknownCouponKind(String),

    /// A coupon record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before any cart state is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., a price that isn't a decimal amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidQuantity { quantity: 0 };
        assert_eq!(err.to_string(), "Invalid quantity: 0");

        let err = CoreError::HashGeneration { attempts: 16 };
        assert_eq!(
            err.to_string(),
            "Could not generate a unique item hash after 16 attempts"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "id".to_string(),
        };
        assert_eq!(err.to_string(), "id is required");

        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
