//! # cart-store: The Cart Aggregate
//!
//! This crate turns the pure pieces in `cart-core` into a working cart:
//! a named instance persisted through a key/value store, with observers
//! notified after every change.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cart Engine Data Flow                            │
//! │                                                                         │
//! │  Caller (web handler, POS UI, job)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   cart-store (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │     Cart      │    │   EventBus    │    │  CartConfig  │  │   │
//! │  │   │   (cart.rs)   │───►│  (events.rs)  │    │ (config.rs)  │  │   │
//! │  │   │               │    └───────────────┘    └──────────────┘  │   │
//! │  │   │ add / remove  │    ┌───────────────┐                      │   │
//! │  │   │ update / sum  │───►│ MoneyFormatter│                      │   │
//! │  │   └───────┬───────┘    │  (format.rs)  │                      │   │
//! │  │           │            └───────────────┘                      │   │
//! │  └───────────┼─────────────────────────────────────────────────────┘   │
//! │              ▼                                                          │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │   KeyValueStore (store.rs): session, cache, database, memory    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`cart`] - The `Cart` aggregate
//! - [`store`] - Key/value persistence seam and `MemoryStore`
//! - [`events`] - Cart events and observers
//! - [`format`] - Money formatting
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Store and cart error types
//!
//! ## Usage
//!
//! ```rust
//! use cart_core::AttributeMap;
//! use cart_store::{Cart, CartConfig, MemoryStore};
//!
//! let mut cart = Cart::open(MemoryStore::new(), CartConfig::default()).unwrap();
//! let item = cart.add("sku1", "Mug", 2, "10.00", AttributeMap::new()).unwrap();
//! cart.add("sku1", "Mug", 3, "10.00", AttributeMap::new()).unwrap();
//!
//! assert_eq!(cart.get_item(item.hash()).unwrap().quantity(), 5);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod config;
pub mod error;
pub mod events;
pub mod format;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use cart::Cart;
pub use config::{CartConfig, FormatSettings, PricingSettings, StorageSettings};
pub use error::{CartError, CartResult, StoreError};
pub use events::{CartEvent, CartObserver, EventBus, ObserverError};
pub use format::{CurrencyFormatter, MoneyFormatter};
pub use store::{KeyValueStore, MemoryStore};
