//! # Cart Events
//!
//! Notifications emitted by the Cart aggregate after state changes.
//! Delivery is fire-and-forget: observers are called in subscription
//! order, and a failing observer is logged and skipped.
//!
//! ```text
//! Cart::add_item ──► EventBus::emit(ItemAdded)
//!                        ├──► observer 1   Ok
//!                        ├──► observer 2   Err ─► warn!, continue
//!                        └──► observer 3   Ok
//! ```

use std::fmt;

use cart_core::CartItem;
use thiserror::Error;
use tracing::warn;

/// Something that happened to a cart.
#[derive(Debug, Clone, PartialEq)]
pub enum CartEvent {
    /// A cart instance was opened or selected.
    InstanceSwitched { instance: String },

    /// The instance blob was written to the store.
    Persisted { instance: String },

    /// A line was added or merged. Carries the stored line.
    ItemAdded { item: CartItem },

    /// A removal was requested. Emitted even when nothing matched.
    ItemRemoved { hash: String },

    /// A field changed. `item` is the line as it is now, still keyed
    /// under its old hash; `new_hash` is its recomputed identity.
    ItemUpdated { item: CartItem, new_hash: String },

    /// A line is about to be re-keyed.
    UpdatingHash { hash: String },

    CouponApplied { code: String },

    CouponRemoved { code: String },

    /// Items were cleared; coupons and attributes remain.
    Emptied { instance: String },

    /// Everything was cleared.
    Destroyed { instance: String },
}

impl CartEvent {
    /// Stable dotted name for routing and logs.
    pub fn name(&self) -> &'static str {
        match self {
            CartEvent::InstanceSwitched { .. } => "cart.instance_switched",
            CartEvent::Persisted { .. } => "cart.persisted",
            CartEvent::ItemAdded { .. } => "cart.item_added",
            CartEvent::ItemRemoved { .. } => "cart.item_removed",
            CartEvent::ItemUpdated { .. } => "cart.item_updated",
            CartEvent::UpdatingHash { .. } => "cart.updating_hash",
            CartEvent::CouponApplied { .. } => "cart.coupon_applied",
            CartEvent::CouponRemoved { .. } => "cart.coupon_removed",
            CartEvent::Emptied { .. } => "cart.emptied",
            CartEvent::Destroyed { .. } => "cart.destroyed",
        }
    }
}

impl fmt::Display for CartEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Observers
// =============================================================================

/// Error returned by an observer. Never surfaces to cart callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ObserverError(pub String);

/// Receives cart events.
pub trait CartObserver {
    fn notify(&self, event: &CartEvent) -> Result<(), ObserverError>;
}

impl<F> CartObserver for F
where
    F: Fn(&CartEvent) -> Result<(), ObserverError>,
{
    fn notify(&self, event: &CartEvent) -> Result<(), ObserverError> {
        self(event)
    }
}

/// Ordered list of observers attached to one cart.
#[derive(Default)]
pub struct EventBus {
    observers: Vec<Box<dyn CartObserver>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: impl CartObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Delivers `event` to every observer.
    pub fn emit(&self, event: &CartEvent) {
        for (index, observer) in self.observers.iter().enumerate() {
            if let Err(err) = observer.notify(event) {
                warn!(event = event.name(), observer = index, error = %err, "Cart observer failed");
            }
        }
    }
}
