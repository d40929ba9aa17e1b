//! # Cart Aggregate
//!
//! One named cart instance: its items, coupons and cart-level attributes,
//! backed by a [`KeyValueStore`] and observed through an [`EventBus`].
//!
//! ## Operation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Every mutating operation                             │
//! │                                                                         │
//! │  1. validate input          (nothing touched on failure)               │
//! │  2. mutate in-memory state                                             │
//! │  3. persist the whole blob  (CartError::Store on failure, state kept)  │
//! │  4. notify observers        (failures logged, never returned)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Add / Merge
//! ```text
//! add_item(item)
//!     │  hash = identity(id, name, price, options)
//!     ▼
//! hash already in cart? ── no ──► append
//!     │ yes
//!     ▼
//! line item? ── no ──► existing.quantity += item.quantity
//!     │ yes
//!     ▼
//! salted unique hash ──► append
//! ```
//!
//! ## Example
//! ```rust
//! use cart_core::{AttributeMap, FixedCoupon, Money};
//! use cart_store::{Cart, CartConfig, MemoryStore};
//!
//! let mut config = CartConfig::default();
//! config.pricing.tax_rate = 0.10;
//!
//! let mut cart = Cart::open(MemoryStore::new(), config).unwrap();
//! cart.add("sku1", "Mug", 2, "10.00", AttributeMap::new()).unwrap();
//! cart.apply_coupon(Box::new(FixedCoupon::new("FIVE", Money::from_cents(500)).unwrap()))
//!     .unwrap();
//!
//! assert_eq!(cart.sub_total(true).cents(), 2200);
//! assert_eq!(cart.total(true).cents(), 1700);
//! assert_eq!(cart.total_formatted(true), "$17.00");
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info};

use cart_core::{
    AttributeMap, CartItem, CartTotals, CartView, CoreError, CoreResult, Coupon, CouponRecord,
    CouponRegistry, ItemId, Money, PricingEngine, ValidationError,
};

use crate::config::CartConfig;
use crate::error::CartResult;
use crate::events::{CartEvent, CartObserver, EventBus};
use crate::format::{CurrencyFormatter, MoneyFormatter};
use crate::store::KeyValueStore;

// =============================================================================
// Persisted Blob
// =============================================================================

#[derive(Serialize)]
struct StoredCartRef<'a> {
    items: &'a [CartItem],
    coupons: Vec<CouponRecord>,
    attributes: &'a AttributeMap,
}

#[derive(Default, Deserialize)]
struct StoredCart {
    #[serde(default)]
    items: Vec<CartItem>,
    #[serde(default)]
    coupons: Vec<CouponRecord>,
    #[serde(default)]
    attributes: AttributeMap,
}

// =============================================================================
// Cart
// =============================================================================

/// A shopping cart instance bound to a store.
pub struct Cart<S: KeyValueStore> {
    store: S,
    config: CartConfig,
    engine: PricingEngine,
    instance: String,
    items: Vec<CartItem>,
    coupons: Vec<Box<dyn Coupon>>,
    attributes: AttributeMap,
    events: EventBus,
    formatter: Box<dyn MoneyFormatter>,
    registry: CouponRegistry,
}

impl<S: KeyValueStore> fmt::Debug for Cart<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cart")
            .field("instance", &self.instance)
            .field("items", &self.items)
            .field("coupons", &self.coupons)
            .field("attributes", &self.attributes)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

impl<S: KeyValueStore> Cart<S> {
    // =========================================================================
    // Construction & Instances
    // =========================================================================

    /// Opens the instance the store says was last selected, or the
    /// configured default instance.
    pub fn open(store: S, config: CartConfig) -> CartResult<Self> {
        Self::open_with_registry(store, config, CouponRegistry::default())
    }

    /// Like [`Cart::open`], rehydrating coupons through `registry`.
    pub fn open_with_registry(
        store: S,
        config: CartConfig,
        registry: CouponRegistry,
    ) -> CartResult<Self> {
        let selected = store
            .get(&config.storage.instance_key)?
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| config.storage.default_instance.clone());

        let mut cart = Self::detached(store, config, registry)?;
        cart.set_instance(&selected)?;
        Ok(cart)
    }

    /// Opens a specific instance and records it as selected.
    pub fn open_instance(store: S, config: CartConfig, instance: &str) -> CartResult<Self> {
        let mut cart = Self::detached(store, config, CouponRegistry::default())?;
        cart.set_instance(instance)?;
        Ok(cart)
    }

    fn detached(store: S, config: CartConfig, registry: CouponRegistry) -> CartResult<Self> {
        config.validate()?;
        let engine = config.engine();
        let instance = config.storage.default_instance.clone();

        Ok(Cart {
            store,
            config,
            engine,
            instance,
            items: Vec::new(),
            coupons: Vec::new(),
            attributes: AttributeMap::new(),
            events: EventBus::new(),
            formatter: Box::new(CurrencyFormatter::new()),
            registry,
        })
    }

    /// Replaces the formatter used by the `*_formatted` accessors.
    pub fn with_formatter(mut self, formatter: impl MoneyFormatter + 'static) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    /// Attaches an observer. Observers see events from this point on.
    pub fn subscribe(&mut self, observer: impl CartObserver + 'static) {
        self.events.subscribe(observer);
    }

    /// Switches to `name`: loads its blob (or starts empty), records the
    /// selection in the store, and notifies observers.
    ///
    /// ## Errors
    /// A corrupt blob or an unknown coupon kind leaves the current
    /// instance untouched.
    pub fn set_instance(&mut self, name: &str) -> CartResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::from(ValidationError::Required {
                field: "instance".to_string(),
            })
            .into());
        }

        let key = self.config.storage.cart_key(name);
        let stored = match self.store.get(&key)? {
            Some(blob) if !blob.trim().is_empty() => serde_json::from_str(&blob)?,
            _ => StoredCart::default(),
        };

        let coupons = stored
            .coupons
            .iter()
            .map(|record| self.registry.decode(record))
            .collect::<CoreResult<Vec<_>>>()?;
        let items = rekey_loaded(stored.items)?;

        self.instance = name.to_string();
        self.items = items;
        self.coupons = coupons;
        self.attributes = stored.attributes;

        self.store
            .set(&self.config.storage.instance_key, self.instance.clone())?;

        info!(
            instance = %self.instance,
            items = self.items.len(),
            coupons = self.coupons.len(),
            "Cart instance selected"
        );
        self.events.emit(&CartEvent::InstanceSwitched {
            instance: self.instance.clone(),
        });
        Ok(())
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn config(&self) -> &CartConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    // =========================================================================
    // Items
    // =========================================================================

    /// Builds a mergeable item and adds it.
    pub fn add(
        &mut self,
        id: impl Into<ItemId>,
        name: impl Into<String>,
        quantity: i64,
        price: &str,
        options: AttributeMap,
    ) -> CartResult<CartItem> {
        let item = CartItem::from_parts(id, name, quantity, price, options, false)?;
        self.add_item(item)
    }

    /// Builds a line item (never merged) and adds it.
    pub fn add_line(
        &mut self,
        id: impl Into<ItemId>,
        name: impl Into<String>,
        quantity: i64,
        price: &str,
        options: AttributeMap,
    ) -> CartResult<CartItem> {
        let item = CartItem::from_parts(id, name, quantity, price, options, true)?;
        self.add_item(item)
    }

    /// Adds `item`, merging into an identical line unless it is a line item.
    ///
    /// Only the incoming item's flag decides: a mergeable add whose hash
    /// matches an earlier `add_line` entry merges into that entry, which
    /// keeps `line_item = true`.
    ///
    /// Returns the stored line: the merged existing line, or `item` under
    /// its final hash.
    pub fn add_item(&mut self, item: CartItem) -> CartResult<CartItem> {
        let stored = self.insert_item(item)?;
        self.persist()?;
        self.events.emit(&CartEvent::ItemAdded {
            item: stored.clone(),
        });
        Ok(stored)
    }

    /// Merge-or-append without persisting. See [`Cart::add_item`] for how
    /// line items and mergeable adds interact.
    fn insert_item(&mut self, mut item: CartItem) -> CartResult<CartItem> {
        let hash = item.generate_hash();

        if let Some(index) = self.position(&hash) {
            if !item.is_line_item() {
                let existing = &mut self.items[index];
                existing.add_quantity(item.quantity())?;
                debug!(
                    hash = %hash,
                    quantity = existing.quantity(),
                    "Merged item into existing line"
                );
                return Ok(existing.clone());
            }

            let items = &self.items;
            let unique = item.generate_unique_hash(|candidate| {
                items.iter().any(|existing| existing.hash() == candidate)
            })?;
            debug!(hash = %hash, unique = %unique, "Line item given a distinct hash");
        }

        debug!(hash = %item.hash(), quantity = item.quantity(), "Appended item");
        self.items.push(item.clone());
        Ok(item)
    }

    /// First line stored under `hash`.
    pub fn get_item(&self, hash: &str) -> Option<&CartItem> {
        self.items.iter().find(|item| item.hash() == hash)
    }

    /// Lines in insertion order.
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    fn position(&self, hash: &str) -> Option<usize> {
        self.items.iter().position(|item| item.hash() == hash)
    }

    /// Removes the first line stored under `hash`.
    ///
    /// A missing hash is not an error: the cart is still persisted and
    /// observers still hear about the request.
    pub fn remove_item(&mut self, hash: &str) -> CartResult<Option<CartItem>> {
        let removed = self.position(hash).map(|index| self.items.remove(index));
        if removed.is_none() {
            debug!(hash = %hash, "Remove requested for missing item");
        }

        self.persist()?;
        self.events.emit(&CartEvent::ItemRemoved {
            hash: hash.to_string(),
        });
        Ok(removed)
    }

    /// Mutates one field of the line under `hash` and returns the line's
    /// recomputed identity hash.
    ///
    /// The line stays stored under `hash`; call
    /// [`Cart::update_item_hash`] to re-key it.
    ///
    /// ## Errors
    /// - [`CoreError::ItemNotFound`] if no line has `hash`
    /// - whatever [`CartItem::update`] rejects (the line is unchanged)
    pub fn update_item(&mut self, hash: &str, field: &str, value: Value) -> CartResult<String> {
        let index = self
            .position(hash)
            .ok_or_else(|| CoreError::ItemNotFound(hash.to_string()))?;

        let item = &mut self.items[index];
        item.update(field, value)?;
        let new_hash = item.identity_hash();
        let snapshot = item.clone();

        self.persist()?;
        self.events.emit(&CartEvent::ItemUpdated {
            item: snapshot,
            new_hash: new_hash.clone(),
        });
        Ok(new_hash)
    }

    /// Re-keys the line under `hash` by removing it and adding it back,
    /// which may merge it into another line.
    ///
    /// ## Errors
    /// [`CoreError::ItemNotFound`] if no line has `hash`. If re-adding
    /// fails the line is put back where it was.
    pub fn update_item_hash(&mut self, hash: &str) -> CartResult<CartItem> {
        let index = self
            .position(hash)
            .ok_or_else(|| CoreError::ItemNotFound(hash.to_string()))?;

        self.events.emit(&CartEvent::UpdatingHash {
            hash: hash.to_string(),
        });

        let item = self.items.remove(index);
        let stored = match self.insert_item(item.clone()) {
            Ok(stored) => stored,
            Err(err) => {
                self.items.insert(index, item);
                return Err(err);
            }
        };

        self.persist()?;
        self.events.emit(&CartEvent::ItemAdded {
            item: stored.clone(),
        });
        Ok(stored)
    }

    /// Re-keys every line. Lines merged away along the way are skipped.
    pub fn update_item_hashes(&mut self) -> CartResult<()> {
        let hashes: Vec<String> = self
            .items
            .iter()
            .map(|item| item.hash().to_string())
            .collect();

        for hash in hashes {
            if self.position(&hash).is_some() {
                self.update_item_hash(&hash)?;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Coupons
    // =========================================================================

    /// Appends a coupon. Coupons are not de-duplicated.
    pub fn apply_coupon(&mut self, coupon: Box<dyn Coupon>) -> CartResult<()> {
        // Reject coupons that could not be persisted before touching state.
        coupon.to_record()?;
        let code = coupon.code().to_string();
        self.coupons.push(coupon);

        self.persist()?;
        self.events.emit(&CartEvent::CouponApplied { code });
        Ok(())
    }

    /// Removes the first coupon with `code`. A missing code is a no-op.
    pub fn remove_coupon(&mut self, code: &str) -> CartResult<Option<Box<dyn Coupon>>> {
        let Some(index) = self.coupons.iter().position(|c| c.code() == code) else {
            return Ok(None);
        };
        let removed = self.coupons.remove(index);

        self.persist()?;
        self.events.emit(&CartEvent::CouponRemoved {
            code: code.to_string(),
        });
        Ok(Some(removed))
    }

    pub fn coupons(&self) -> &[Box<dyn Coupon>] {
        &self.coupons
    }

    // =========================================================================
    // Clearing
    // =========================================================================

    /// Clears items; coupons and attributes stay.
    pub fn empty_cart(&mut self) -> CartResult<()> {
        self.items.clear();
        self.persist()?;
        self.events.emit(&CartEvent::Emptied {
            instance: self.instance.clone(),
        });
        Ok(())
    }

    /// Clears items, coupons and attributes.
    pub fn destroy_cart(&mut self) -> CartResult<()> {
        self.items.clear();
        self.coupons.clear();
        self.attributes.clear();
        self.persist()?;
        self.events.emit(&CartEvent::Destroyed {
            instance: self.instance.clone(),
        });
        Ok(())
    }

    // =========================================================================
    // Pricing
    // =========================================================================

    /// Read-only view handed to coupons and renderers.
    pub fn view(&self) -> CartView<'_> {
        CartView::new(&self.items, &self.coupons, &self.attributes, self.engine)
    }

    /// Units across all lines, or the number of lines.
    pub fn count(&self, with_quantity: bool) -> i64 {
        self.view().count(with_quantity)
    }

    pub fn sub_total(&self, include_tax: bool) -> Money {
        self.view().sub_total(include_tax)
    }

    pub fn total(&self, with_discount: bool) -> Money {
        self.view().total(with_discount)
    }

    pub fn total_discount(&self) -> Money {
        self.view().total_discount()
    }

    pub fn totals(&self) -> CartTotals {
        self.view().totals()
    }

    pub fn sub_total_formatted(&self, include_tax: bool) -> String {
        self.format_money(self.sub_total(include_tax))
    }

    pub fn total_formatted(&self, with_discount: bool) -> String {
        self.format_money(self.total(with_discount))
    }

    pub fn total_discount_formatted(&self) -> String {
        self.format_money(self.total_discount())
    }

    /// Formats `amount` with the configured locale.
    pub fn format_money(&self, amount: Money) -> String {
        self.formatter.format(
            amount,
            &self.config.format.locale,
            self.config.format.international,
        )
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// Sets a cart-level attribute at a dotted path.
    pub fn set_attribute(&mut self, path: &str, value: Value) -> CartResult<()> {
        self.attributes.set(path, value)?;
        self.persist()
    }

    /// Reads a cart-level attribute, or `default` when absent.
    pub fn get_attribute(&self, path: &str, default: Value) -> Value {
        self.attributes.get_or(path, default)
    }

    /// Removes a cart-level attribute, returning what was there.
    pub fn remove_attribute(&mut self, path: &str) -> CartResult<Option<Value>> {
        let removed = self.attributes.remove(path)?;
        self.persist()?;
        Ok(removed)
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Writes the whole instance blob to the store.
    pub fn persist(&mut self) -> CartResult<()> {
        let coupons = self
            .coupons
            .iter()
            .map(|coupon| coupon.to_record())
            .collect::<CoreResult<Vec<_>>>()?;

        let blob = serde_json::to_string(&StoredCartRef {
            items: &self.items,
            coupons,
            attributes: &self.attributes,
        })?;

        let key = self.config.storage.cart_key(&self.instance);
        self.store.set(&key, blob)?;

        debug!(
            instance = %self.instance,
            items = self.items.len(),
            coupons = self.coupons.len(),
            "Cart persisted"
        );
        self.events.emit(&CartEvent::Persisted {
            instance: self.instance.clone(),
        });
        Ok(())
    }
}

/// Rejects loaded items that break the constructor invariants, then
/// restores hashes missing from older blobs, keeping line items distinct.
fn rekey_loaded(mut items: Vec<CartItem>) -> CoreResult<Vec<CartItem>> {
    items.iter().try_for_each(CartItem::validate)?;

    let mut taken: HashSet<String> = items
        .iter()
        .filter(|item| !item.hash().is_empty())
        .map(|item| item.hash().to_string())
        .collect();

    for item in items.iter_mut().filter(|item| item.hash().is_empty()) {
        let plain = item.identity_hash();
        let hash = if taken.contains(&plain) {
            item.generate_unique_hash(|candidate| taken.contains(candidate))?
        } else {
            item.generate_hash()
        };
        taken.insert(hash);
    }
    Ok(items)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CartError, StoreError};
    use crate::events::ObserverError;
    use crate::store::MemoryStore;
    use cart_core::{FixedCoupon, PercentageCoupon, SubItem, MAX_ITEM_QUANTITY};
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Recorded = Rc<RefCell<Vec<CartEvent>>>;

    fn config(tax_rate: f64) -> CartConfig {
        let mut config = CartConfig::default();
        config.pricing.tax_rate = tax_rate;
        config
    }

    fn cart(tax_rate: f64) -> Cart<MemoryStore> {
        Cart::open(MemoryStore::new(), config(tax_rate)).unwrap()
    }

    fn record<S: KeyValueStore>(cart: &mut Cart<S>) -> Recorded {
        let events: Recorded = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        cart.subscribe(move |event: &CartEvent| -> Result<(), ObserverError> {
            sink.borrow_mut().push(event.clone());
            Ok(())
        });
        events
    }

    fn names(events: &Recorded) -> Vec<&'static str> {
        events.borrow().iter().map(CartEvent::name).collect()
    }

    fn five_off() -> Box<dyn Coupon> {
        Box::new(FixedCoupon::new("FIVE", Money::from_cents(500)).unwrap())
    }

    /// Store whose writes can be switched off.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_writes: bool,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, blob: String) -> Result<(), StoreError> {
            if self.fail_writes {
                return Err(StoreError::write(key, "disk full"));
            }
            self.inner.set(key, blob)
        }
    }

    // ----- Scenarios -------------------------------------------------------

    #[test]
    fn test_empty_cart_totals() {
        let cart = cart(0.10);
        assert_eq!(cart.count(true), 0);
        assert_eq!(cart.count(false), 0);
        assert!(cart.sub_total(false).is_zero());
        assert!(cart.total(true).is_zero());
        assert_eq!(cart.sub_total_formatted(false), "$0.00");
    }

    #[test]
    fn test_taxed_subtotal() {
        let mut cart = cart(0.10);
        cart.add("sku1", "Mug", 2, "10.00", AttributeMap::new()).unwrap();

        assert_eq!(cart.sub_total(false).cents(), 2000);
        assert_eq!(cart.sub_total(true).cents(), 2200);
    }

    #[test]
    fn test_same_item_merges() {
        let mut cart = cart(0.0);
        let options: AttributeMap = [("size", json!("L"))].into_iter().collect();

        cart.add("sku1", "Shirt", 2, "10.00", options.clone()).unwrap();
        let merged = cart.add("sku1", "Shirt", 3, "10.00", options).unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(merged.quantity(), 5);
        assert_eq!(cart.count(true), 5);
        assert_eq!(cart.count(false), 1);
    }

    #[test]
    fn test_line_items_stay_distinct() {
        let mut cart = cart(0.0);
        let first = cart.add_line("sku1", "Mug", 1, "4.00", AttributeMap::new()).unwrap();
        let second = cart.add_line("sku1", "Mug", 1, "4.00", AttributeMap::new()).unwrap();

        assert_eq!(cart.items().len(), 2);
        assert_ne!(first.hash(), second.hash());
        assert!(cart.items().iter().all(|item| item.quantity() == 1));
        assert!(cart.get_item(second.hash()).is_some());
    }

    #[test]
    fn test_plain_add_merges_into_existing_line_item() {
        let mut cart = cart(0.0);
        let line = cart.add_line("sku1", "Mug", 1, "4.00", AttributeMap::new()).unwrap();
        let merged = cart.add("sku1", "Mug", 2, "4.00", AttributeMap::new()).unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(merged.hash(), line.hash());
        assert_eq!(merged.quantity(), 3);
        assert!(merged.is_line_item());

        let another = cart.add_line("sku1", "Mug", 1, "4.00", AttributeMap::new()).unwrap();
        assert_eq!(cart.items().len(), 2);
        assert_ne!(another.hash(), line.hash());
    }

    #[test]
    fn test_quantity_cap_guards_adds_and_merges() {
        let mut cart = cart(0.10);
        let events = record(&mut cart);

        let err = cart
            .add("sku1", "Mug", 200_000_000_000_000_000, "1.00", AttributeMap::new())
            .unwrap_err();
        assert!(matches!(err, CartError::Core(CoreError::InvalidQuantity { .. })));
        assert!(cart.items().is_empty());

        let full = cart
            .add("sku1", "Mug", MAX_ITEM_QUANTITY, "1.00", AttributeMap::new())
            .unwrap();
        let err = cart.add("sku1", "Mug", 1, "1.00", AttributeMap::new()).unwrap_err();
        assert!(matches!(err, CartError::Core(CoreError::InvalidQuantity { .. })));
        assert_eq!(cart.get_item(full.hash()).unwrap().quantity(), MAX_ITEM_QUANTITY);

        assert_eq!(cart.sub_total(false).cents(), MAX_ITEM_QUANTITY * 100);
        assert_eq!(cart.sub_total(true).cents(), MAX_ITEM_QUANTITY * 110);
        assert_eq!(events.borrow().len(), 2);
    }

    #[test]
    fn test_fixed_coupon_total() {
        let mut cart = cart(0.10);
        cart.add("sku1", "Mug", 2, "10.00", AttributeMap::new()).unwrap();
        cart.apply_coupon(five_off()).unwrap();

        assert_eq!(cart.total(false).cents(), 2200);
        assert_eq!(cart.total_discount().cents(), 500);
        assert_eq!(cart.total(true).cents(), 1700);
        assert_eq!(cart.total_formatted(true), "$17.00");
        assert_eq!(cart.total_discount_formatted(), "$5.00");
    }

    #[test]
    fn test_empty_cart_keeps_coupons_and_attributes() {
        let mut cart = cart(0.0);
        cart.add("sku1", "Mug", 1, "3.00", AttributeMap::new()).unwrap();
        cart.apply_coupon(five_off()).unwrap();
        cart.set_attribute("customer.email", json!("a@b.c")).unwrap();

        cart.empty_cart().unwrap();

        assert!(cart.items().is_empty());
        assert_eq!(cart.coupons().len(), 1);
        assert_eq!(
            cart.get_attribute("customer.email", Value::Null),
            json!("a@b.c")
        );
    }

    #[test]
    fn test_destroy_clears_everything() {
        let mut cart = cart(0.0);
        cart.add("sku1", "Mug", 1, "3.00", AttributeMap::new()).unwrap();
        cart.apply_coupon(five_off()).unwrap();
        cart.set_attribute("note", json!("gift")).unwrap();
        let events = record(&mut cart);

        cart.destroy_cart().unwrap();

        assert!(cart.items().is_empty());
        assert!(cart.coupons().is_empty());
        assert!(cart.attributes().is_empty());
        assert_eq!(names(&events), vec!["cart.persisted", "cart.destroyed"]);

        let reopened = Cart::open(cart.into_store(), config(0.0)).unwrap();
        assert!(reopened.items().is_empty());
        assert!(reopened.coupons().is_empty());
    }

    // ----- Items -----------------------------------------------------------

    #[test]
    fn test_add_emits_persist_then_added() {
        let mut cart = cart(0.0);
        let events = record(&mut cart);

        let item = cart.add("sku1", "Mug", 1, "3.00", AttributeMap::new()).unwrap();

        assert_eq!(names(&events), vec!["cart.persisted", "cart.item_added"]);
        assert_eq!(
            events.borrow()[1],
            CartEvent::ItemAdded { item: item.clone() }
        );
    }

    #[test]
    fn test_invalid_add_leaves_cart_untouched() {
        let mut cart = cart(0.0);
        let events = record(&mut cart);

        assert!(cart.add("sku1", "Mug", 0, "3.00", AttributeMap::new()).is_err());
        assert!(cart.add("", "Mug", 1, "3.00", AttributeMap::new()).is_err());
        assert!(cart.add("sku1", "Mug", 1, "three", AttributeMap::new()).is_err());

        assert!(cart.items().is_empty());
        assert!(events.borrow().is_empty());
        assert!(cart.store().get("cart_default").unwrap().is_none());
    }

    #[test]
    fn test_remove_missing_hash_is_forgiving() {
        let mut cart = cart(0.0);
        cart.add("sku1", "Mug", 1, "3.00", AttributeMap::new()).unwrap();
        let events = record(&mut cart);

        assert!(cart.remove_item("nope").unwrap().is_none());
        assert!(cart.remove_item("nope").unwrap().is_none());

        assert_eq!(cart.items().len(), 1);
        assert_eq!(
            names(&events),
            vec![
                "cart.persisted",
                "cart.item_removed",
                "cart.persisted",
                "cart.item_removed"
            ]
        );
    }

    #[test]
    fn test_remove_item() {
        let mut cart = cart(0.0);
        let item = cart.add("sku1", "Mug", 1, "3.00", AttributeMap::new()).unwrap();
        cart.add("sku2", "Cup", 1, "2.00", AttributeMap::new()).unwrap();

        let removed = cart.remove_item(item.hash()).unwrap().unwrap();
        assert_eq!(removed.id, ItemId::from("sku1"));
        assert_eq!(cart.items().len(), 1);
        assert!(cart.get_item(item.hash()).is_none());
    }

    #[test]
    fn test_update_item_returns_new_hash_without_rekeying() {
        let mut cart = cart(0.0);
        let item = cart.add("sku1", "Shirt", 1, "10.00", AttributeMap::new()).unwrap();
        let events = record(&mut cart);

        let new_hash = cart
            .update_item(item.hash(), "options.size", json!("XL"))
            .unwrap();

        assert_ne!(new_hash, item.hash());
        let stored = cart.get_item(item.hash()).unwrap();
        assert_eq!(stored.options.get("size"), Some(&json!("XL")));
        assert!(cart.get_item(&new_hash).is_none());

        let last = events.borrow().last().cloned().unwrap();
        assert!(matches!(
            last,
            CartEvent::ItemUpdated { new_hash: ref h, .. } if *h == new_hash
        ));
    }

    #[test]
    fn test_update_item_quantity_keeps_hash() {
        let mut cart = cart(0.0);
        let item = cart.add("sku1", "Mug", 1, "3.00", AttributeMap::new()).unwrap();

        let new_hash = cart.update_item(item.hash(), "quantity", json!(4)).unwrap();

        assert_eq!(new_hash, item.hash());
        assert_eq!(cart.count(true), 4);
    }

    #[test]
    fn test_update_missing_item_is_not_found() {
        let mut cart = cart(0.0);
        let events = record(&mut cart);

        let err = cart.update_item("nope", "name", json!("x")).unwrap_err();
        assert!(err.is_not_found());

        let err = cart.update_item_hash("nope").unwrap_err();
        assert!(err.is_not_found());

        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_rejected_update_leaves_item() {
        let mut cart = cart(0.0);
        let item = cart.add("sku1", "Mug", 2, "3.00", AttributeMap::new()).unwrap();

        assert!(cart.update_item(item.hash(), "quantity", json!(0)).is_err());
        assert!(cart.update_item(item.hash(), "colour", json!("red")).is_err());

        assert_eq!(cart.get_item(item.hash()).unwrap().quantity(), 2);
    }

    #[test]
    fn test_update_item_hash_rekeys() {
        let mut cart = cart(0.0);
        let item = cart.add("sku1", "Shirt", 1, "10.00", AttributeMap::new()).unwrap();
        let new_hash = cart
            .update_item(item.hash(), "options.size", json!("XL"))
            .unwrap();
        let events = record(&mut cart);

        let rekeyed = cart.update_item_hash(item.hash()).unwrap();

        assert_eq!(rekeyed.hash(), new_hash);
        assert!(cart.get_item(item.hash()).is_none());
        assert!(cart.get_item(&new_hash).is_some());
        assert_eq!(names(&events)[0], "cart.updating_hash");
    }

    #[test]
    fn test_update_item_hash_merges_into_twin() {
        let mut cart = cart(0.0);
        let large: AttributeMap = [("size", json!("L"))].into_iter().collect();
        let small: AttributeMap = [("size", json!("S"))].into_iter().collect();

        cart.add("sku1", "Shirt", 2, "10.00", large).unwrap();
        let item = cart.add("sku1", "Shirt", 3, "10.00", small).unwrap();

        cart.update_item(item.hash(), "options.size", json!("L")).unwrap();
        let merged = cart.update_item_hash(item.hash()).unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(merged.quantity(), 5);
    }

    #[test]
    fn test_update_item_hashes_snapshots() {
        let mut cart = cart(0.0);
        let a = cart.add("a", "A", 1, "1.00", AttributeMap::new()).unwrap();
        let b = cart.add("b", "B", 2, "1.00", AttributeMap::new()).unwrap();
        cart.add("c", "C", 1, "1.00", AttributeMap::new()).unwrap();

        // `a` becomes a twin of `b`; `c` is untouched.
        cart.update_item(a.hash(), "id", json!("b")).unwrap();
        cart.update_item(a.hash(), "name", json!("B")).unwrap();

        cart.update_item_hashes().unwrap();

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.get_item(b.hash()).unwrap().quantity(), 3);
        assert_eq!(cart.count(true), 4);
    }

    #[test]
    fn test_sub_items_count_toward_subtotal_not_lines() {
        let mut cart = cart(0.0);
        let item = CartItem::new("combo", "Burger", 1, Money::from_cents(800))
            .unwrap()
            .with_sub_item(SubItem::new("Fries", 1, Money::from_cents(250)).unwrap());
        cart.add_item(item).unwrap();

        assert_eq!(cart.count(false), 1);
        assert_eq!(cart.sub_total(false).cents(), 1050);
    }

    // ----- Coupons ---------------------------------------------------------

    #[test]
    fn test_coupons_are_not_deduplicated() {
        let mut cart = cart(0.0);
        cart.add("sku1", "Mug", 1, "20.00", AttributeMap::new()).unwrap();
        cart.apply_coupon(five_off()).unwrap();
        cart.apply_coupon(five_off()).unwrap();

        assert_eq!(cart.coupons().len(), 2);
        assert_eq!(cart.total(true).cents(), 1000);
    }

    #[test]
    fn test_remove_coupon() {
        let mut cart = cart(0.0);
        cart.apply_coupon(five_off()).unwrap();
        let events = record(&mut cart);

        assert!(cart.remove_coupon("NOPE").unwrap().is_none());
        assert!(events.borrow().is_empty());

        let removed = cart.remove_coupon("FIVE").unwrap().unwrap();
        assert_eq!(removed.code(), "FIVE");
        assert!(cart.coupons().is_empty());
        assert_eq!(names(&events), vec!["cart.persisted", "cart.coupon_removed"]);
    }

    #[test]
    fn test_discount_clamps_at_zero_by_default() {
        let mut cart = cart(0.0);
        cart.add("sku1", "Mug", 1, "3.00", AttributeMap::new()).unwrap();
        cart.apply_coupon(five_off()).unwrap();
        assert!(cart.total(true).is_zero());

        let mut negative = config(0.0);
        negative.pricing.discount_policy = cart_core::DiscountPolicy::AllowNegative;
        let mut cart = Cart::open(MemoryStore::new(), negative).unwrap();
        cart.add("sku1", "Mug", 1, "3.00", AttributeMap::new()).unwrap();
        cart.apply_coupon(five_off()).unwrap();
        assert_eq!(cart.total(true).cents(), -200);
    }

    // ----- Attributes ------------------------------------------------------

    #[test]
    fn test_attribute_paths() {
        let mut cart = cart(0.0);
        cart.set_attribute("shipping.method", json!("express")).unwrap();
        cart.set_attribute("shipping.cost", json!(5)).unwrap();

        assert_eq!(
            cart.get_attribute("shipping.method", Value::Null),
            json!("express")
        );
        assert_eq!(cart.get_attribute("missing.path", json!(0)), json!(0));

        let removed = cart.remove_attribute("shipping.cost").unwrap();
        assert_eq!(removed, Some(json!(5)));
        assert!(cart.remove_attribute("shipping.cost").unwrap().is_none());
        assert!(cart.set_attribute("bad..path", json!(1)).is_err());
    }

    // ----- Instances & Persistence ----------------------------------------

    #[test]
    fn test_round_trip_through_store() {
        let mut cart = cart(0.10);
        let options: AttributeMap = [("color", json!({"primary": "red", "trim": "white"}))]
            .into_iter()
            .collect();
        let item = CartItem::new("sku1", "Mug", 2, Money::from_cents(1000))
            .unwrap()
            .with_options(options)
            .with_attribute("gift", json!(true))
            .unwrap()
            .with_sub_item(SubItem::new("Box", 1, Money::from_cents(150)).unwrap());
        cart.add_item(item).unwrap();
        cart.add_line("sku2", "Pen", 1, "1.00", AttributeMap::new()).unwrap();
        cart.apply_coupon(Box::new(PercentageCoupon::new("TEN", 1000).unwrap()))
            .unwrap();
        cart.set_attribute("customer.id", json!(42)).unwrap();
        let before = cart.items().to_vec();
        let totals = cart.totals();

        let reopened = Cart::open(cart.into_store(), config(0.10)).unwrap();

        assert_eq!(reopened.items(), before.as_slice());
        assert_eq!(reopened.coupons()[0].code(), "TEN");
        assert_eq!(reopened.get_attribute("customer.id", Value::Null), json!(42));
        assert_eq!(reopened.totals(), totals);
        assert!(reopened.items()[1].is_line_item());
    }

    #[test]
    fn test_instances_are_isolated() {
        let mut cart = cart(0.0);
        cart.add("sku1", "Mug", 1, "3.00", AttributeMap::new()).unwrap();
        let events = record(&mut cart);

        cart.set_instance("wishlist").unwrap();
        assert_eq!(cart.instance(), "wishlist");
        assert!(cart.items().is_empty());
        cart.add("sku9", "Lamp", 1, "30.00", AttributeMap::new()).unwrap();

        cart.set_instance("default").unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].id, ItemId::from("sku1"));
        assert_eq!(names(&events)[0], "cart.instance_switched");

        assert!(cart.set_instance("  ").is_err());
        assert_eq!(cart.instance(), "default");
    }

    #[test]
    fn test_open_resumes_selected_instance() {
        let mut cart = cart(0.0);
        cart.set_instance("wishlist").unwrap();
        cart.add("sku9", "Lamp", 1, "30.00", AttributeMap::new()).unwrap();

        let store = cart.into_store();
        assert_eq!(store.get("cart.instance").unwrap().as_deref(), Some("wishlist"));

        let reopened = Cart::open(store, config(0.0)).unwrap();
        assert_eq!(reopened.instance(), "wishlist");
        assert_eq!(reopened.items().len(), 1);

        let default = Cart::open_instance(reopened.into_store(), config(0.0), "default").unwrap();
        assert!(default.items().is_empty());
    }

    #[test]
    fn test_partial_blob_loads() {
        let mut store = MemoryStore::new();
        store
            .set("cart_default", r#"{"attributes":{"note":"hi"}}"#.to_string())
            .unwrap();

        let cart = Cart::open(store, config(0.0)).unwrap();
        assert!(cart.items().is_empty());
        assert_eq!(cart.get_attribute("note", Value::Null), json!("hi"));
    }

    #[test]
    fn test_unknown_coupon_kind_fails_load() {
        let mut store = MemoryStore::new();
        store
            .set(
                "cart_default",
                r#"{"coupons":[{"kind":"bogo","code":"B1G1","data":null}]}"#.to_string(),
            )
            .unwrap();

        let err = Cart::open(store, config(0.0)).unwrap_err();
        assert!(err.is_persistence_error());
        assert!(matches!(
            err,
            CartError::Core(CoreError::UnknownCouponKind(ref kind)) if kind == "bogo"
        ));
    }

    #[test]
    fn test_corrupt_blob_is_serialization_error() {
        let mut store = MemoryStore::new();
        store.set("cart_default", "{not json".to_string()).unwrap();

        let err = Cart::open(store, config(0.0)).unwrap_err();
        assert!(matches!(err, CartError::Serialization(_)));
    }

    #[test]
    fn test_invalid_blob_item_fails_load() {
        let mut cart = cart(0.0);
        let mug = cart.add("sku1", "Mug", 1, "10.00", AttributeMap::new()).unwrap();
        let item = |quantity: i64, unit_price: i64| {
            json!({
                "items": [{
                    "id": "sku1",
                    "name": "Mug",
                    "quantity": quantity,
                    "unit_price": unit_price,
                    "added_at": "2024-01-01T00:00:00Z"
                }]
            })
            .to_string()
        };
        cart.store_mut().set("cart_negative", item(-4, -1000)).unwrap();
        cart.store_mut().set("cart_refund", item(1, -1000)).unwrap();

        let err = cart.set_instance("negative").unwrap_err();
        assert!(matches!(
            err,
            CartError::Core(CoreError::InvalidQuantity { quantity: -4 })
        ));
        let err = cart.set_instance("refund").unwrap_err();
        assert!(matches!(err, CartError::Core(CoreError::InvalidItem { .. })));

        assert_eq!(cart.instance(), "default");
        assert_eq!(cart.items().len(), 1);
        assert!(cart.get_item(mug.hash()).is_some());
        assert_eq!(cart.sub_total(false).cents(), 1000);
    }

    #[test]
    fn test_store_failure_propagates_and_keeps_state() {
        let mut cart = Cart::open(FlakyStore::default(), config(0.0)).unwrap();
        let events = record(&mut cart);
        cart.store_mut().fail_writes = true;

        let err = cart
            .add("sku1", "Mug", 1, "3.00", AttributeMap::new())
            .unwrap_err();

        assert!(matches!(err, CartError::Store(_)));
        assert_eq!(cart.items().len(), 1);
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_failing_observer_does_not_block() {
        let mut cart = cart(0.0);
        cart.subscribe(|_: &CartEvent| -> Result<(), ObserverError> {
            Err(ObserverError("down".to_string()))
        });
        let events = record(&mut cart);

        cart.add("sku1", "Mug", 1, "3.00", AttributeMap::new()).unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(names(&events), vec!["cart.persisted", "cart.item_added"]);
    }

    #[test]
    fn test_custom_formatter() {
        let cart = cart(0.0).with_formatter(|amount: Money, locale: &str, _: bool| {
            format!("{} {}", locale, amount.cents())
        });
        assert_eq!(cart.total_formatted(true), "USD 0");
    }

    #[test]
    fn test_missing_hashes_are_restored_on_load() {
        let item = CartItem::new("sku1", "Mug", 1, Money::from_cents(300)).unwrap();
        let mut raw = serde_json::to_value(&item).unwrap();
        raw.as_object_mut().unwrap().remove("hash");
        let line = item.clone().as_line_item();
        let mut raw_line = serde_json::to_value(&line).unwrap();
        raw_line.as_object_mut().unwrap().remove("hash");

        let mut store = MemoryStore::new();
        store
            .set(
                "cart_default",
                json!({ "items": [raw, raw_line] }).to_string(),
            )
            .unwrap();

        let cart = Cart::open(store, config(0.0)).unwrap();
        assert_eq!(cart.items()[0].hash(), item.hash());
        assert_ne!(cart.items()[1].hash(), item.hash());
        assert_eq!(cart.items()[1].hash().len(), 64);
    }
}
