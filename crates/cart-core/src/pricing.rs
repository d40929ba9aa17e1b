//! # Pricing Engine
//!
//! Pure functions computing subtotal, discount, total and counts over a
//! set of items and coupons.
//!
//! ## Computation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  items ──► Σ (item.subtotal(tax) + item.sub_items_total(tax))          │
//! │                     │                                                   │
//! │                     ▼                                                   │
//! │               sub_total(tax=true)                                       │
//! │                     │                                                   │
//! │  coupons ──► Σ coupon.discount(view)  (in application order)           │
//! │                     │                                                   │
//! │                     ▼                                                   │
//! │        total = sub_total(true) - discount                               │
//! │                     │                                                   │
//! │                     ▼                                                   │
//! │        DiscountPolicy: clamp at zero, or allow negative                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here returns raw [`Money`]. Formatting is a separate,
//! later step so totals can always be composed from unformatted values.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::attributes::AttributeMap;
use crate::coupon::Coupon;
use crate::item::CartItem;
use crate::money::Money;
use crate::types::{DiscountPolicy, TaxRate};

// =============================================================================
// Pricing Engine
// =============================================================================

/// Tax rate and discount policy applied to a cart's items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PricingEngine {
    pub tax_rate: TaxRate,
    pub discount_policy: DiscountPolicy,
}

impl PricingEngine {
    pub const fn new(tax_rate: TaxRate, discount_policy: DiscountPolicy) -> Self {
        PricingEngine {
            tax_rate,
            discount_policy,
        }
    }

    /// Σ over items of `subtotal + sub_items_total`. Zero items → zero.
    pub fn sub_total(&self, items: &[CartItem], include_tax: bool) -> Money {
        items
            .iter()
            .map(|item| item.total(include_tax, self.tax_rate))
            .sum()
    }

    /// Tax portion of the subtotal.
    pub fn tax(&self, items: &[CartItem]) -> Money {
        self.sub_total(items, true) - self.sub_total(items, false)
    }

    /// Total units (`with_quantity`) or number of distinct lines.
    pub fn count(&self, items: &[CartItem], with_quantity: bool) -> i64 {
        if with_quantity {
            items.iter().map(CartItem::quantity).sum()
        } else {
            items.len() as i64
        }
    }

    /// Σ of every coupon's discount, in application order.
    pub fn total_discount(&self, cart: &CartView<'_>) -> Money {
        cart.coupons()
            .iter()
            .map(|coupon| coupon.discount(cart))
            .sum()
    }

    /// Tax-inclusive subtotal minus discounts (if asked), under the
    /// configured [`DiscountPolicy`].
    pub fn total(&self, cart: &CartView<'_>, with_discount: bool) -> Money {
        let gross = self.sub_total(cart.items(), true);
        let net = if with_discount {
            gross - self.total_discount(cart)
        } else {
            gross
        };

        match self.discount_policy {
            DiscountPolicy::ClampAtZero => net.clamp_non_negative(),
            DiscountPolicy::AllowNegative => net,
        }
    }
}

// =============================================================================
// Cart View
// =============================================================================

/// Read-only view of a cart's contents, handed to coupons and renderers.
#[derive(Debug, Clone, Copy)]
pub struct CartView<'a> {
    items: &'a [CartItem],
    coupons: &'a [Box<dyn Coupon>],
    attributes: &'a AttributeMap,
    engine: PricingEngine,
}

impl<'a> CartView<'a> {
    pub fn new(
        items: &'a [CartItem],
        coupons: &'a [Box<dyn Coupon>],
        attributes: &'a AttributeMap,
        engine: PricingEngine,
    ) -> Self {
        CartView {
            items,
            coupons,
            attributes,
            engine,
        }
    }

    pub fn items(&self) -> &'a [CartItem] {
        self.items
    }

    pub fn coupons(&self) -> &'a [Box<dyn Coupon>] {
        self.coupons
    }

    pub fn attributes(&self) -> &'a AttributeMap {
        self.attributes
    }

    pub fn tax_rate(&self) -> TaxRate {
        self.engine.tax_rate
    }

    pub fn sub_total(&self, include_tax: bool) -> Money {
        self.engine.sub_total(self.items, include_tax)
    }

    pub fn count(&self, with_quantity: bool) -> i64 {
        self.engine.count(self.items, with_quantity)
    }

    pub fn total_discount(&self) -> Money {
        self.engine.total_discount(self)
    }

    pub fn total(&self, with_discount: bool) -> Money {
        self.engine.total(self, with_discount)
    }

    /// Snapshot of every headline figure at once.
    pub fn totals(&self) -> CartTotals {
        CartTotals {
            item_count: self.items.len(),
            total_quantity: self.count(true),
            subtotal: self.sub_total(false),
            tax: self.engine.tax(self.items),
            discount: self.total_discount(),
            total: self.total(true),
        }
    }
}

// =============================================================================
// Cart Totals
// =============================================================================

/// Cart totals summary for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
}

// =============================================================================
// Unit Tests
// =============================================================================
