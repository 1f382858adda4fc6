//! Wishlist entries as returned by the remote API.

use std::collections::BTreeSet;
use std::fmt;

use serde_json::Value;
use vivero_core::{Price, ProductId};

/// Image shown when a product has none.
pub const DEFAULT_IMAGE: &str = "images/monstera.jpg";

/// Stock level above which a product counts as well stocked.
const LOW_STOCK_THRESHOLD: i64 = 10;

/// Product data carried by one wishlist entry.
///
/// The remote API nests the product under `product` on some deployments and
/// flattens it on others; [`WishlistProduct::from_json`] accepts both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WishlistProduct {
    pub id: ProductId,
    pub name: String,
    pub category: Option<String>,
    pub price: Price,
    pub stock: i64,
    pub image: String,
}

/// Coarse stock state shown next to a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockLevel {
    InStock,
    Low,
    Out,
}

impl fmt::Display for StockLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InStock => "En stock",
            Self::Low => "Pocas unidades",
            Self::Out => "Sin stock",
        })
    }
}

impl WishlistProduct {
    /// Normalize one entry of the remote `items` array.
    ///
    /// Returns `None` when no numeric product id can be found.
    #[must_use]
    pub fn from_json(entry: &Value) -> Option<Self> {
        let product = entry.get("product").filter(|p| p.is_object()).unwrap_or(entry);
        let id = ["id", "product_id"]
            .iter()
            .filter_map(|field| product.get(field))
            .chain(entry.get("product_id"))
            .find_map(ProductId::from_json)?;

        let name = product
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(vivero_core::DEFAULT_ITEM_NAME)
            .to_string();

        let category = product
            .get("category_name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);

        let price = ["price_cents", "price"]
            .iter()
            .filter_map(|field| product.get(field))
            .find_map(loose_f64)
            .map_or(Price::ZERO, Price::from_amount);

        #[allow(clippy::cast_possible_truncation)]
        let stock = product
            .get("stock")
            .and_then(loose_f64)
            .filter(|s| s.is_finite())
            .map_or(0, |s| s.floor() as i64);

        Some(Self {
            id,
            name,
            category,
            price,
            stock,
            image: first_image(product.get("images")),
        })
    }

    /// Whether the product can be added to a cart.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Stock state for display.
    #[must_use]
    pub const fn stock_level(&self) -> StockLevel {
        if self.stock > LOW_STOCK_THRESHOLD {
            StockLevel::InStock
        } else if self.stock > 0 {
            StockLevel::Low
        } else {
            StockLevel::Out
        }
    }
}

fn loose_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// First image of a product. `images` may be an array or a JSON-encoded array.
fn first_image(images: Option<&Value>) -> String {
    let first = match images {
        Some(Value::Array(list)) => list.first().and_then(Value::as_str).map(String::from),
        Some(Value::String(encoded)) => serde_json::from_str::<Vec<String>>(encoded)
            .ok()
            .and_then(|list| list.into_iter().next()),
        _ => None,
    };
    first
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_IMAGE.to_string())
}

/// The set of favorited product ids, as last read from the remote API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoriteSet(BTreeSet<ProductId>);

impl FavoriteSet {
    /// Whether a product is a favorite.
    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.0.contains(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = ProductId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<ProductId> for FavoriteSet {
    fn from_iter<I: IntoIterator<Item = ProductId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a WishlistProduct> for FavoriteSet {
    fn from_iter<I: IntoIterator<Item = &'a WishlistProduct>>(iter: I) -> Self {
        iter.into_iter().map(|p| p.id).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_entry() {
        let p = WishlistProduct::from_json(&json!({
            "id": 3,
            "name": "Monstera deliciosa",
            "category_name": "Interior",
            "price": 45000,
            "stock": 4,
            "images": ["a.jpg", "b.jpg"]
        }))
        .unwrap();
        assert_eq!(p.id, ProductId::new(3));
        assert_eq!(p.category.as_deref(), Some("Interior"));
        assert_eq!(p.price, Price::new(45_000));
        assert_eq!(p.image, "a.jpg");
        assert_eq!(p.stock_level(), StockLevel::Low);
    }

    #[test]
    fn test_nested_entry() {
        let p = WishlistProduct::from_json(&json!({
            "product_id": 9,
            "product": {"id": 9, "name": "Pothos", "price_cents": "12000", "stock": 50,
                        "images": "[\"p.jpg\"]"}
        }))
        .unwrap();
        assert_eq!(p.id, ProductId::new(9));
        assert_eq!(p.price, Price::new(12_000));
        assert_eq!(p.image, "p.jpg");
        assert!(p.in_stock());
        assert_eq!(p.stock_level().to_string(), "En stock");
    }

    #[test]
    fn test_product_id_only() {
        let p = WishlistProduct::from_json(&json!({"product_id": "12"})).unwrap();
        assert_eq!(p.id, ProductId::new(12));
        assert_eq!(p.name, vivero_core::DEFAULT_ITEM_NAME);
        assert_eq!(p.image, DEFAULT_IMAGE);
        assert!(!p.in_stock());
    }

    #[test]
    fn test_entry_without_id() {
        assert!(WishlistProduct::from_json(&json!({"name": "x"})).is_none());
        assert!(WishlistProduct::from_json(&json!("7")).is_none());
    }

    #[test]
    fn test_favorite_set() {
        let set: FavoriteSet = [ProductId::new(2), ProductId::new(1), ProductId::new(2)]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(ProductId::new(1)));
        assert_eq!(set.iter().map(|id| id.as_i64()).collect::<Vec<_>>(), vec![1, 2]);
    }
}
