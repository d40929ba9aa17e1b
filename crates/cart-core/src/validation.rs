//! # Validation Module
//!
//! Input validation for items, prices and attribute paths.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Type system                                                  │
//! │  ├── ItemId, Money, TaxRate cannot hold malformed values               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Business rules (positive quantity, non-blank id, sane paths)      │
//! │  └── Runs BEFORE any cart state is touched                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Cart aggregate                                               │
//! │  └── Merge overflow, hash uniqueness                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use cart_core::validation::{validate_path, validate_quantity};
//!
//! validate_quantity(5).unwrap();
//! validate_path("gift.message").unwrap();
//! assert!(validate_path("gift..message").is_err());
//! ```

use crate::error::ValidationError;
use crate::types::ItemId;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted item name.
pub const MAX_NAME_LENGTH: usize = 200;

/// Longest accepted segment of a dotted path.
pub const MAX_PATH_SEGMENT_LENGTH: usize = 64;

/// Largest quantity a single line (or sub-item) may hold.
pub const MAX_ITEM_QUANTITY: i64 = 100_000;

// =============================================================================
// Item Validators
// =============================================================================

/// Validates a caller-supplied item id.
///
/// ## Rules
/// - Numeric ids are always accepted
/// - Textual ids must not be blank
pub fn validate_item_id(id: &ItemId) -> ValidationResult<()> {
    if id.is_blank() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    Ok(())
}

/// Validates an item display name.
///
/// Empty names are allowed (the id is what identifies the product);
/// only absurdly long names are rejected.
pub fn validate_item_name(name: &str) -> ValidationResult<()> {
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(())
}

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0). Zero is not a valid add.
/// - Must not exceed [`MAX_ITEM_QUANTITY`], including after a merge
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit price in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items, gifts)
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points.
///
/// ## Rules
/// - Must be below 10000 (a rate of 100% or more is a config mistake)
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps >= 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 9_999,
        });
    }

    Ok(())
}

// =============================================================================
// Path Validators
// =============================================================================

/// Validates a dotted attribute/option path and splits it into segments.
///
/// ## Rules
/// - At least one segment
/// - No empty segments (`a..b`, `.a`, `a.`)
/// - No whitespace inside a segment
/// - Each segment at most [`MAX_PATH_SEGMENT_LENGTH`] characters
pub fn validate_path(path: &str) -> ValidationResult<Vec<&str>> {
    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "path".to_string(),
        reason: format!("'{}' {}", path, reason),
    };

    if path.is_empty() {
        return Err(ValidationError::Required {
            field: "path".to_string(),
        });
    }

    let segments: Vec<&str> = path.split('.').collect();
    for segment in &segments {
        if segment.is_empty() {
            return Err(invalid("contains an empty segment"));
        }
        if segment.chars().any(char::is_whitespace) {
            return Err(invalid("contains whitespace"));
        }
        if segment.chars().count() > MAX_PATH_SEGMENT_LENGTH {
            return Err(ValidationError::TooLong {
                field: "path segment".to_string(),
                max: MAX_PATH_SEGMENT_LENGTH,
            });
        }
    }

    Ok(segments)
}

// =============================================================================
// Unit Tests
// =============================================================================
