//! # cart-core: Pure Business Logic for the Cart Engine
//!
//! This crate is the **heart** of the cart engine. It contains the item
//! identity model and the pricing math as pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cart Engine Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Caller (web handler, POS UI, job)            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            cart-store: Cart<S: KeyValueStore>                   │   │
//! │  │   add / merge / remove / update, persistence, observers         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ cart-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   money   │  │ identity  │  │   item    │  │  pricing  │  │   │
//! │  │   │   Money   │  │  SHA-256  │  │ CartItem  │  │  totals   │  │   │
//! │  │   │  TaxRate  │  │  hashing  │  │  SubItem  │  │  coupons  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO STORAGE • NO EVENTS • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`types`] - `TaxRate`, `ItemId`, `DiscountPolicy`
//! - [`attributes`] - Nested maps with dotted-path access
//! - [`identity`] - Item identity hashing
//! - [`item`] - `CartItem` and `SubItem`
//! - [`pricing`] - Subtotal / discount / total computation
//! - [`coupon`] - The coupon capability and stock coupon kinds
//! - [`validation`] - Business rule validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use cart_core::{CartItem, Money, TaxRate};
//!
//! let item = CartItem::new("sku1", "Mug", 2, Money::parse("10.00").unwrap()).unwrap();
//! let rate = TaxRate::from_fraction(0.10);
//!
//! assert_eq!(item.subtotal(false, rate).cents(), 2000);
//! assert_eq!(item.subtotal(true, rate).cents(), 2200);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod attributes;
pub mod coupon;
pub mod error;
pub mod identity;
pub mod item;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use attributes::AttributeMap;
pub use coupon::{Coupon, CouponRecord, CouponRegistry, FixedCoupon, PercentageCoupon};
pub use error::{CoreError, CoreResult, ValidationError};
pub use identity::MAX_HASH_ATTEMPTS;
pub use item::{CartItem, SubItem};
pub use money::Money;
pub use pricing::{CartTotals, CartView, PricingEngine};
pub use types::*;
pub use validation::MAX_ITEM_QUANTITY;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Name of the cart instance used when a caller never picked one.
pub const DEFAULT_INSTANCE: &str = "default";
