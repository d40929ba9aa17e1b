//! # Cart Items
//!
//! A [`CartItem`] is one line in a cart: a purchasable with a quantity,
//! a unit price, identity-bearing options, free-form attributes and
//! optional nested [`SubItem`]s (add-ons, bundle parts) that contribute
//! to its subtotal without being counted as separate lines.
//!
//! ## Line Math
//! ```text
//! subtotal(tax)        = unit_price × quantity  (+ tax on that, if taxable)
//! sub_items_total(tax) = Σ sub.subtotal(tax) + sub.sub_items_total(tax)
//! line total           = subtotal + sub_items_total
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attributes::AttributeMap;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::identity::IdentityFields;
use crate::money::Money;
use crate::types::{ItemId, TaxRate};
use crate::validation::{
    validate_item_id, validate_item_name, validate_price_cents, validate_quantity,
};

/// Fields accepted by [`CartItem::update`].
pub const UPDATABLE_FIELDS: &[&str] = &[
    "id",
    "name",
    "quantity",
    "price",
    "unit_price",
    "taxable",
    "line_item",
    "options",
    "options.<path>",
    "attributes",
    "attributes.<path>",
];

fn default_taxable() -> bool {
    true
}

// =============================================================================
// Cart Item
// =============================================================================

/// One line item in a cart.
///
/// ## Design Notes
/// - `hash` is derived, never supplied: see [`crate::identity`]
/// - `quantity` is always ≥ 1; merges go through [`CartItem::add_quantity`]
/// - `unit_price` is frozen at add time, like a receipt snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Caller-supplied identifier (not unique).
    pub id: ItemId,

    /// Identity hash, unique among the lines of one cart.
    #[serde(default)]
    hash: String,

    /// Display name.
    #[serde(default)]
    pub name: String,

    quantity: i64,

    unit_price: Money,

    /// Identity-bearing options (size, color, engraving...).
    #[serde(default)]
    pub options: AttributeMap,

    /// Nested add-ons summed into this line.
    #[serde(default)]
    pub sub_items: Vec<SubItem>,

    /// Whether the cart tax rate applies to this line.
    #[serde(default = "default_taxable")]
    pub taxable: bool,

    /// Never merge with an identical line.
    #[serde(default)]
    line_item: bool,

    /// Free-form data that does not affect identity.
    #[serde(default)]
    pub attributes: AttributeMap,

    /// When this item was created.
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// Creates a validated item and derives its identity hash.
    ///
    /// ## Errors
    /// - [`CoreError::InvalidItem`] for a blank id or negative price
    /// - [`CoreError::InvalidQuantity`] for quantity ≤ 0
    ///
    /// ## Example
    /// ```rust
    /// use cart_core::item::CartItem;
    /// use cart_core::money::Money;
    ///
    /// let item = CartItem::new("sku1", "Mug", 2, Money::from_cents(1000)).unwrap();
    /// assert_eq!(item.quantity(), 2);
    /// assert_eq!(item.hash().len(), 64);
    ///
    /// assert!(CartItem::new("sku1", "Mug", 0, Money::from_cents(1000)).is_err());
    /// ```
    pub fn new(
        id: impl Into<ItemId>,
        name: impl Into<String>,
        quantity: i64,
        unit_price: Money,
    ) -> CoreResult<Self> {
        let id = id.into();
        let name = name.into();

        validate_item_id(&id).map_err(|err| CoreError::InvalidItem {
            reason: err.to_string(),
        })?;
        check_quantity(quantity)?;
        check_price(unit_price)?;
        validate_item_name(&name)?;

        let mut item = CartItem {
            id,
            hash: String::new(),
            name,
            quantity,
            unit_price,
            options: AttributeMap::new(),
            sub_items: Vec::new(),
            taxable: true,
            line_item: false,
            attributes: AttributeMap::new(),
            added_at: Utc::now(),
        };
        item.generate_hash();
        Ok(item)
    }

    /// Creates an item from loosely-typed input, parsing `price` as a
    /// decimal string such as `"10.00"`.
    pub fn from_parts(
        id: impl Into<ItemId>,
        name: impl Into<String>,
        quantity: i64,
        price: &str,
        options: AttributeMap,
        line_item: bool,
    ) -> CoreResult<Self> {
        let unit_price = Money::parse(price).map_err(|err| CoreError::InvalidItem {
            reason: err.to_string(),
        })?;

        let mut item = CartItem::new(id, name, quantity, unit_price)?.with_options(options);
        item.line_item = line_item;
        Ok(item)
    }

    // =========================================================================
    // Builders
    // =========================================================================

    /// Replaces all options.
    pub fn with_options(mut self, options: AttributeMap) -> Self {
        self.options = options;
        self.generate_hash();
        self
    }

    /// Sets one option at a dotted path.
    pub fn with_option(mut self, path: &str, value: Value) -> CoreResult<Self> {
        self.options.set(path, value)?;
        self.generate_hash();
        Ok(self)
    }

    /// Sets one attribute at a dotted path.
    pub fn with_attribute(mut self, path: &str, value: Value) -> CoreResult<Self> {
        self.attributes.set(path, value)?;
        Ok(self)
    }

    /// Appends a sub-item.
    pub fn with_sub_item(mut self, sub_item: SubItem) -> Self {
        self.sub_items.push(sub_item);
        self
    }

    /// Sets whether tax applies.
    pub fn taxable(mut self, taxable: bool) -> Self {
        self.taxable = taxable;
        self
    }

    /// Marks the item as a distinct line that never merges.
    pub fn as_line_item(mut self) -> Self {
        self.line_item = true;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The identity hash this item is currently stored under.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Units of this line.
    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    /// Price of a single unit.
    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    /// Whether this item refuses to merge with identical lines.
    pub fn is_line_item(&self) -> bool {
        self.line_item
    }

    /// Borrowed identity fields.
    pub fn identity(&self) -> IdentityFields<'_> {
        IdentityFields {
            id: &self.id,
            name: &self.name,
            unit_price: self.unit_price,
            options: &self.options,
        }
    }

    // =========================================================================
    // Identity
    // =========================================================================

    /// Computes the identity hash from the current fields without storing it.
    pub fn identity_hash(&self) -> String {
        self.identity().hash()
    }

    /// Computes and stores the plain identity hash.
    pub fn generate_hash(&mut self) -> String {
        self.hash = self.identity_hash();
        self.hash.clone()
    }

    /// Computes and stores a salted hash that `is_taken` does not claim.
    ///
    /// ## Errors
    /// [`CoreError::HashGeneration`] when the bounded retries run out.
    pub fn generate_unique_hash<F>(&mut self, is_taken: F) -> CoreResult<String>
    where
        F: Fn(&str) -> bool,
    {
        self.hash = self.identity().unique_hash(is_taken)?;
        Ok(self.hash.clone())
    }

    /// Re-checks the field invariants enforced by [`CartItem::new`],
    /// sub-items included. Used on items that were deserialized rather
    /// than constructed.
    pub fn validate(&self) -> CoreResult<()> {
        validate_item_id(&self.id).map_err(|err| CoreError::InvalidItem {
            reason: err.to_string(),
        })?;
        check_quantity(self.quantity)?;
        check_price(self.unit_price)?;
        validate_item_name(&self.name)?;
        self.sub_items.iter().try_for_each(SubItem::validate)
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Adds units to this line (used when merging duplicates).
    pub fn add_quantity(&mut self, quantity: i64) -> CoreResult<()> {
        check_quantity(quantity)?;
        let merged = self
            .quantity
            .checked_add(quantity)
            .ok_or(CoreError::InvalidQuantity { quantity })?;
        check_quantity(merged)?;
        self.quantity = merged;
        Ok(())
    }

    /// Mutates one field. The hash is NOT recomputed; callers re-key.
    ///
    /// ## Accepted Fields
    /// See [`UPDATABLE_FIELDS`]. `options.<path>` and `attributes.<path>`
    /// write into the nested maps.
    ///
    /// ## Errors
    /// A failed update leaves the item untouched.
    pub fn update(&mut self, field: &str, value: Value) -> CoreResult<()> {
        match field {
            "id" => self.id = parse_item_id(&value)?,
            "name" => {
                let name = expect_str(field, &value)?;
                validate_item_name(name)?;
                self.name = name.to_string();
            }
            "quantity" | "qty" => {
                let quantity = expect_i64(field, &value)?;
                check_quantity(quantity)?;
                self.quantity = quantity;
            }
            "price" | "unit_price" => self.unit_price = parse_price(&value)?,
            "taxable" => self.taxable = expect_bool(field, &value)?,
            "line_item" => self.line_item = expect_bool(field, &value)?,
            "options" => self.options = expect_map(field, value)?,
            "attributes" => self.attributes = expect_map(field, value)?,
            other => {
                if let Some(path) = other.strip_prefix("options.") {
                    self.options.set(path, value)?;
                } else if let Some(path) = other.strip_prefix("attributes.") {
                    self.attributes.set(path, value)?;
                } else {
                    return Err(ValidationError::NotAllowed {
                        field: other.to_string(),
                        allowed: UPDATABLE_FIELDS.iter().map(|f| f.to_string()).collect(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Pricing
    // =========================================================================

    /// `unit_price × quantity`, plus tax at `rate` when asked and taxable.
    pub fn subtotal(&self, include_tax: bool, rate: TaxRate) -> Money {
        line_subtotal(self.unit_price, self.quantity, self.taxable, include_tax, rate)
    }

    /// Sum of every sub-item's contribution, recursively.
    pub fn sub_items_total(&self, include_tax: bool, rate: TaxRate) -> Money {
        self.sub_items
            .iter()
            .map(|sub| sub.total(include_tax, rate))
            .sum()
    }

    /// `subtotal + sub_items_total`.
    pub fn total(&self, include_tax: bool, rate: TaxRate) -> Money {
        self.subtotal(include_tax, rate) + self.sub_items_total(include_tax, rate)
    }
}

// =============================================================================
// Sub Item
// =============================================================================

/// A nested add-on that is summed into its parent line.
///
/// Sub-items are never hashed, merged or counted as lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubItem {
    #[serde(default)]
    pub id: Option<ItemId>,
    #[serde(default)]
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    #[serde(default = "default_taxable")]
    pub taxable: bool,
    #[serde(default)]
    pub options: AttributeMap,
    #[serde(default)]
    pub sub_items: Vec<SubItem>,
}

impl SubItem {
    /// Creates a validated sub-item.
    pub fn new(name: impl Into<String>, quantity: i64, unit_price: Money) -> CoreResult<Self> {
        let name = name.into();
        check_quantity(quantity)?;
        check_price(unit_price)?;
        validate_item_name(&name)?;

        Ok(SubItem {
            id: None,
            name,
            quantity,
            unit_price,
            taxable: true,
            options: AttributeMap::new(),
            sub_items: Vec::new(),
        })
    }

    pub fn validate(&self) -> CoreResult<()> {
        if let Some(id) = &self.id {
            validate_item_id(id).map_err(|err| CoreError::InvalidItem {
                reason: err.to_string(),
            })?;
        }
        check_quantity(self.quantity)?;
        check_price(self.unit_price)?;
        validate_item_name(&self.name)?;
        self.sub_items.iter().try_for_each(SubItem::validate)
    }

    pub fn with_id(mut self, id: impl Into<ItemId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_option(mut self, path: &str, value: Value) -> CoreResult<Self> {
        self.options.set(path, value)?;
        Ok(self)
    }

    pub fn with_sub_item(mut self, sub_item: SubItem) -> Self {
        self.sub_items.push(sub_item);
        self
    }

    pub fn taxable(mut self, taxable: bool) -> Self {
        self.taxable = taxable;
        self
    }

    pub fn subtotal(&self, include_tax: bool, rate: TaxRate) -> Money {
        line_subtotal(self.unit_price, self.quantity, self.taxable, include_tax, rate)
    }

    pub fn sub_items_total(&self, include_tax: bool, rate: TaxRate) -> Money {
        self.sub_items
            .iter()
            .map(|sub| sub.total(include_tax, rate))
            .sum()
    }

    pub fn total(&self, include_tax: bool, rate: TaxRate) -> Money {
        self.subtotal(include_tax, rate) + self.sub_items_total(include_tax, rate)
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn line_subtotal(
    unit_price: Money,
    quantity: i64,
    taxable: bool,
    include_tax: bool,
    rate: TaxRate,
) -> Money {
    let line = unit_price.multiply_quantity(quantity);
    if include_tax && taxable {
        line + line.calculate_tax(rate)
    } else {
        line
    }
}

fn check_quantity(quantity: i64) -> CoreResult<()> {
    validate_quantity(quantity).map_err(|_| CoreError::InvalidQuantity { quantity })
}

fn check_price(price: Money) -> CoreResult<()> {
    validate_price_cents(price.cents()).map_err(|err| CoreError::InvalidItem {
        reason: err.to_string(),
    })
}

fn invalid_format(field: &str, reason: &str) -> CoreError {
    ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

fn expect_str<'a>(field: &str, value: &'a Value) -> CoreResult<&'a str> {
    value
        .as_str()
        .ok_or_else(|| invalid_format(field, "expected a string"))
}

fn expect_i64(field: &str, value: &Value) -> CoreResult<i64> {
    value
        .as_i64()
        .ok_or_else(|| invalid_format(field, "expected an integer"))
}

fn expect_bool(field: &str, value: &Value) -> CoreResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| invalid_format(field, "expected a boolean"))
}

fn expect_map(field: &str, value: Value) -> CoreResult<AttributeMap> {
    match value {
        Value::Object(map) => Ok(AttributeMap::from(map)),
        _ => Err(invalid_format(field, "expected an object")),
    }
}

fn parse_item_id(value: &Value) -> CoreResult<ItemId> {
    let id = match value {
        Value::Number(n) => n
            .as_i64()
            .map(ItemId::Int)
            .ok_or_else(|| invalid_format("id", "expected an integer or string"))?,
        Value::String(s) => ItemId::Text(s.clone()),
        _ => return Err(invalid_format("id", "expected an integer or string")),
    };
    validate_item_id(&id).map_err(|err| CoreError::InvalidItem {
        reason: err.to_string(),
    })?;
    Ok(id)
}

/// Accepts `"12.50"` strings or JSON numbers (`12`, `12.5`).
fn parse_price(value: &Value) -> CoreResult<Money> {
    let price = match value {
        Value::String(s) => Money::parse(s)?,
        Value::Number(n) => Money::parse(&n.to_string())?,
        _ => return Err(invalid_format("price", "expected a decimal amount")),
    };
    check_price(price)?;
    Ok(price)
}

// =============================================================================
// Unit Tests
// =============================================================================
