//! # Coupons
//!
//! A coupon is a capability: given a read-only [`CartView`] it returns a
//! discount amount. The pricing engine only sums what coupons return; it
//! never looks inside them.
//!
//! ## Persistence
//! ```text
//! Box<dyn Coupon> ──to_record()──► CouponRecord { kind, code, data }
//!                                        │  (stored in the cart blob)
//!                                        ▼
//! Box<dyn Coupon> ◄──CouponRegistry::decode()── by `kind`
//! ```
//!
//! Two stock kinds ship with the crate: [`FixedCoupon`] and
//! [`PercentageCoupon`]. Other kinds register a decoder.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::pricing::CartView;
use crate::validation::validate_tax_rate_bps;

/// A discount capability applied to a whole cart.
pub trait Coupon: fmt::Debug {
    /// Code the shopper entered.
    fn code(&self) -> &str;

    /// Registry key used to rehydrate this coupon.
    fn kind(&self) -> &'static str;

    /// Discount granted on `cart`.
    fn discount(&self, cart: &CartView<'_>) -> Money;

    /// Serializable form stored in the cart blob.
    fn to_record(&self) -> CoreResult<CouponRecord>;
}

/// Persisted form of a coupon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouponRecord {
    pub kind: String,
    pub code: String,
    #[serde(default)]
    pub data: Value,
}

/// Rebuilds a coupon from its record.
pub type CouponDecoder = fn(&CouponRecord) -> CoreResult<Box<dyn Coupon>>;

// =============================================================================
// Registry
// =============================================================================

/// Maps coupon kinds to decoders.
#[derive(Clone)]
pub struct CouponRegistry {
    decoders: HashMap<String, CouponDecoder>,
}

impl fmt::Debug for CouponRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&String> = self.decoders.keys().collect();
        kinds.sort();
        f.debug_struct("CouponRegistry").field("kinds", &kinds).finish()
    }
}

impl CouponRegistry {
    /// A registry that knows no kinds at all.
    pub fn empty() -> Self {
        CouponRegistry {
            decoders: HashMap::new(),
        }
    }

    /// Registers (or replaces) the decoder for `kind`.
    pub fn register(&mut self, kind: impl Into<String>, decoder: CouponDecoder) {
        self.decoders.insert(kind.into(), decoder);
    }

    pub fn knows(&self, kind: &str) -> bool {
        self.decoders.contains_key(kind)
    }

    /// Rebuilds a coupon.
    ///
    /// ## Errors
    /// [`CoreError::UnknownCouponKind`] if no decoder is registered.
    pub fn decode(&self, record: &CouponRecord) -> CoreResult<Box<dyn Coupon>> {
        let decoder = self
            .decoders
            .get(&record.kind)
            .ok_or_else(|| CoreError::UnknownCouponKind(record.kind.clone()))?;
        decoder(record)
    }
}

impl Default for CouponRegistry {
    /// Registry with the stock `fixed` and `percentage` kinds.
    fn default() -> Self {
        let mut registry = CouponRegistry::empty();
        registry.register(FixedCoupon::KIND, FixedCoupon::decode);
        registry.register(PercentageCoupon::KIND, PercentageCoupon::decode);
        registry
    }
}

fn validate_code(code: &str) -> CoreResult<()> {
    if code.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "coupon code".to_string(),
        }
        .into());
    }
    Ok(())
}

// =============================================================================
// Fixed Coupon
// =============================================================================

/// Takes a fixed amount off the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedCoupon {
    code: String,
    amount: Money,
}

impl FixedCoupon {
    pub const KIND: &'static str = "fixed";

    pub fn new(code: impl Into<String>, amount: Money) -> CoreResult<Self> {
        let code = code.into();
        validate_code(&code)?;
        if amount.is_negative() {
            return Err(ValidationError::OutOfRange {
                field: "coupon amount".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }
        Ok(FixedCoupon { code, amount })
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    fn decode(record: &CouponRecord) -> CoreResult<Box<dyn Coupon>> {
        let amount: Money = serde_json::from_value(record.data.clone())?;
        Ok(Box::new(FixedCoupon::new(record.code.clone(), amount)?))
    }
}

impl Coupon for FixedCoupon {
    fn code(&self) -> &str {
        &self.code
    }

    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn discount(&self, _cart: &CartView<'_>) -> Money {
        self.amount
    }

    fn to_record(&self) -> CoreResult<CouponRecord> {
        Ok(CouponRecord {
            kind: Self::KIND.to_string(),
            code: self.code.clone(),
            data: serde_json::to_value(self.amount)?,
        })
    }
}

// =============================================================================
// Percentage Coupon
// =============================================================================

/// Takes a percentage (in basis points) of the pre-tax subtotal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentageCoupon {
    code: String,
    bps: u32,
}

impl PercentageCoupon {
    pub const KIND: &'static str = "percentage";

    /// `bps` of 1000 is 10% off.
    pub fn new(code: impl Into<String>, bps: u32) -> CoreResult<Self> {
        let code = code.into();
        validate_code(&code)?;
        validate_tax_rate_bps(bps).map_err(|_| ValidationError::OutOfRange {
            field: "coupon percentage".to_string(),
            min: 0,
            max: 9_999,
        })?;
        Ok(PercentageCoupon { code, bps })
    }

    pub fn bps(&self) -> u32 {
        self.bps
    }

    fn decode(record: &CouponRecord) -> CoreResult<Box<dyn Coupon>> {
        let bps: u32 = serde_json::from_value(record.data.clone())?;
        Ok(Box::new(PercentageCoupon::new(record.code.clone(), bps)?))
    }
}

impl Coupon for PercentageCoupon {
    fn code(&self) -> &str {
        &self.code
    }

    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn discount(&self, cart: &CartView<'_>) -> Money {
        cart.sub_total(false).percentage_of(self.bps)
    }

    fn to_record(&self) -> CoreResult<CouponRecord> {
        Ok(CouponRecord {
            kind: Self::KIND.to_string(),
            code: self.code.clone(),
            data: Value::from(self.bps),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
