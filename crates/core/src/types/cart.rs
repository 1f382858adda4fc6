//! Cart line items and the pure cart operations.
//!
//! Persistence lives in the storefront crate; everything here works on
//! in-memory values and upholds two invariants:
//!
//! - at most one line per product id
//! - every quantity is at least one

use serde::{Deserialize, Serialize};

use super::{Price, ProductId, Quantity};

/// Name given to line items persisted without a usable name.
pub const DEFAULT_ITEM_NAME: &str = "Producto";

/// A single product line in a cart.
///
/// Field names match the persisted JSON layout (`price`, `qty`, `image`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    /// Product identifier, unique within a cart.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price in whole pesos.
    #[serde(rename = "price")]
    pub unit_price: Price,
    /// Number of units.
    #[serde(rename = "qty")]
    pub quantity: Quantity,
    /// Optional image reference.
    #[serde(rename = "image", default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}

impl CartLineItem {
    /// Create a line item.
    #[must_use]
    pub fn new(id: ProductId, name: impl Into<String>, unit_price: Price, quantity: Quantity) -> Self {
        Self {
            id,
            name: name.into(),
            unit_price,
            quantity,
            image_ref: None,
        }
    }

    /// Attach an image reference.
    #[must_use]
    pub fn with_image(mut self, image_ref: impl Into<String>) -> Self {
        let image_ref = image_ref.into();
        self.image_ref = (!image_ref.trim().is_empty()).then_some(image_ref);
        self
    }

    /// Unit price times quantity.
    #[must_use]
    pub const fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity.get())
    }
}

/// Loosely typed line item as found in persisted storage.
///
/// Older pages and other tabs have written carts with string ids, fractional
/// prices and missing fields; this shape accepts all of them so that a single
/// bad field never discards a whole cart. Every field is untyped JSON, so any
/// object deserializes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLineItem {
    #[serde(default)]
    pub id: serde_json::Value,
    #[serde(default)]
    pub name: Option<serde_json::Value>,
    #[serde(default)]
    pub price: Option<serde_json::Value>,
    #[serde(default, rename = "unitPrice")]
    pub unit_price: Option<serde_json::Value>,
    #[serde(default)]
    pub qty: Option<serde_json::Value>,
    #[serde(default)]
    pub quantity: Option<serde_json::Value>,
    #[serde(default)]
    pub image: Option<serde_json::Value>,
}

impl RawLineItem {
    /// Read a persisted cart value line by line.
    ///
    /// Anything that is not an array yields no lines; array elements that
    /// are not objects are skipped without affecting their neighbours.
    #[must_use]
    pub fn parse_list(value: serde_json::Value) -> Vec<Self> {
        let serde_json::Value::Array(entries) = value else {
            return Vec::new();
        };
        entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect()
    }

    /// Normalize into a [`CartLineItem`].
    ///
    /// The name defaults to [`DEFAULT_ITEM_NAME`], the price is rounded and
    /// clamped to be non-negative, and the quantity is at least one. Returns
    /// `None` when the id is missing or not numeric.
    #[must_use]
    pub fn normalize(&self) -> Option<CartLineItem> {
        let id = ProductId::from_json(&self.id)?;

        let name = match &self.name {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => DEFAULT_ITEM_NAME.to_string(),
        };

        let unit_price = self
            .price
            .as_ref()
            .or(self.unit_price.as_ref())
            .and_then(loose_number)
            .map_or(Price::ZERO, Price::from_amount);

        #[allow(clippy::cast_possible_truncation)] // finite and floored, `as` saturates
        let quantity = self
            .qty
            .as_ref()
            .or(self.quantity.as_ref())
            .and_then(loose_number)
            .filter(|q| q.is_finite())
            .map_or(Quantity::ONE, |q| Quantity::clamped(q.floor() as i64));

        Some(CartLineItem {
            id,
            name,
            unit_price,
            quantity,
            image_ref: match &self.image {
                Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
                _ => None,
            },
        })
    }
}

fn loose_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// An ordered collection of line items.
///
/// Serializes as a plain JSON array. There is no `Deserialize`:
/// persisted carts are read through [`Cart::from_raw`] so that duplicates and
/// bad quantities are repaired on the way in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartLineItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a cart from raw persisted items.
    ///
    /// Items without a usable id are dropped and duplicate ids are merged by
    /// summing quantities, so the result always satisfies the cart invariants.
    #[must_use]
    pub fn from_raw(raw: &[RawLineItem]) -> Self {
        let mut cart = Self::new();
        for item in raw.iter().filter_map(RawLineItem::normalize) {
            cart.upsert(item);
        }
        cart
    }

    /// Line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    /// Consume the cart, returning its items.
    #[must_use]
    pub fn into_items(self) -> Vec<CartLineItem> {
        self.items
    }

    /// Find the line for a product.
    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&CartLineItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Add an item.
    ///
    /// If a line with the same id exists its quantity grows by the item's
    /// quantity; otherwise the item is appended.
    pub fn upsert(&mut self, item: CartLineItem) {
        match self.items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(item.quantity);
            }
            None => self.items.push(item),
        }
    }

    /// Shift the quantity of a line by `delta`, clamped to at least one.
    ///
    /// Returns `false` if no line has that id.
    pub fn set_quantity(&mut self, id: ProductId, delta: i64) -> bool {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.quantity = item.quantity.offset(delta);
                true
            }
            None => false,
        }
    }

    /// Remove the line for a product. Returns `false` if absent.
    pub fn remove(&mut self, id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }

    /// Sum of `unit_price * quantity` over all lines.
    #[must_use]
    pub fn total(&self) -> Price {
        self.items.iter().map(CartLineItem::line_total).sum()
    }

    /// Sum of quantities over all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items
            .iter()
            .map(|item| u64::from(item.quantity.get()))
            .sum()
    }

    /// Merge another cart into this one, line by line, via [`Self::upsert`].
    pub fn merge(&mut self, other: Self) {
        for item in other.items {
            self.upsert(item);
        }
    }
}

impl FromIterator<CartLineItem> for Cart {
    fn from_iter<I: IntoIterator<Item = CartLineItem>>(iter: I) -> Self {
        let mut cart = Self::new();
        for item in iter {
            cart.upsert(item);
        }
        cart
    }
}
