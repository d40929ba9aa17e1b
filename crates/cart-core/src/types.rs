//! # Domain Types
//!
//! Small value types shared by items, pricing and the cart aggregate.
//!
//! ## Dual-Key Identity Pattern
//! Every line item has:
//! - `id`: caller-supplied [`ItemId`] (SKU, database key...) - not unique
//! - `hash`: derived identity (see [`crate::identity`]) - unique per cart

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 825 bps = 8.25% = a fraction of 0.0825
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (8.25 → 825 bps).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Creates a tax rate from a decimal fraction (0.0825 → 825 bps).
    ///
    /// This is the shape tax rates take in configuration files.
    pub fn from_fraction(fraction: f64) -> Self {
        TaxRate((fraction * 10_000.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Item Id
// =============================================================================

/// Caller-supplied item identifier: a SKU string or a numeric key.
///
/// `Int(1)` and `Text("1")` are different ids and hash differently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    /// Numeric identifier (database primary key).
    Int(i64),
    /// Textual identifier (SKU, slug).
    Text(String),
}

impl ItemId {
    /// Returns true for an empty textual id.
    pub fn is_blank(&self) -> bool {
        matches!(self, ItemId::Text(text) if text.trim().is_empty())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Int(id) => write!(f, "{}", id),
            ItemId::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        ItemId::Int(id)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        ItemId::Text(id.to_string())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        ItemId::Text(id)
    }
}

// =============================================================================
// Discount Policy
// =============================================================================

/// What `total()` does when discounts exceed the tax-inclusive subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountPolicy {
    /// Totals never go below zero.
    #[default]
    ClampAtZero,
    /// Totals may go negative (store credit style).
    AllowNegative,
}

impl fmt::Display for DiscountPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscountPolicy::ClampAtZero => write!(f, "clamp_at_zero"),
            DiscountPolicy::AllowNegative => write!(f, "allow_negative"),
        }
    }
}

impl std::str::FromStr for DiscountPolicy {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "clamp_at_zero" | "clamp" => Ok(DiscountPolicy::ClampAtZero),
            "allow_negative" | "negative" => Ok(DiscountPolicy::AllowNegative),
            _ => Err(crate::error::ValidationError::NotAllowed {
                field: "discount_policy".to_string(),
                allowed: vec!["clamp_at_zero".to_string(), "allow_negative".to_string()],
            }),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(825);
        assert_eq!(rate.bps(), 825);
        assert!((rate.percentage() - 8.25).abs() < 0.001);
    }

    #[test]
    fn test_tax_rate_from_fraction() {
        assert_eq!(TaxRate::from_fraction(0.0825).bps(), 825);
        assert_eq!(TaxRate::from_fraction(0.10).bps(), 1000);
        assert!(TaxRate::from_fraction(0.0).is_zero());
    }

    #[test]
    fn test_tax_rate_from_percentage() {
        assert_eq!(TaxRate::from_percentage(8.25).bps(), 825);
    }

    #[test]
    fn test_item_id_serde_is_untagged() {
        let int: ItemId = serde_json::from_str("42").unwrap();
        assert_eq!(int, ItemId::Int(42));

        let text: ItemId = serde_json::from_str("\"sku1\"").unwrap();
        assert_eq!(text, ItemId::from("sku1"));

        assert_eq!(serde_json::to_string(&ItemId::Int(7)).unwrap(), "7");
    }

    #[test]
    fn test_item_id_blank() {
        assert!(ItemId::from("  ").is_blank());
        assert!(!ItemId::from("sku1").is_blank());
        assert!(!ItemId::Int(0).is_blank());
    }

    #[test]
    fn test_discount_policy_parsing() {
        assert_eq!(
            "clamp_at_zero".parse::<DiscountPolicy>().unwrap(),
            DiscountPolicy::ClampAtZero
        );
        assert_eq!(
            "ALLOW_NEGATIVE".parse::<DiscountPolicy>().unwrap(),
            DiscountPolicy::AllowNegative
        );
        assert!("sometimes".parse::<DiscountPolicy>().is_err());
        assert_eq!(DiscountPolicy::default(), DiscountPolicy::ClampAtZero);
    }
}
