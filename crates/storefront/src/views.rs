//! UI-facing state derived from the session, the cart and the favorites.
//!
//! Views hold no state of their own. They are recomputed from storage on
//! every change and published as a [`SessionSnapshot`].

use vivero_core::{Cart, Price, ProductId, Quantity};

use crate::session::SessionClaims;
use crate::session::claims::DEFAULT_DISPLAY_NAME;
use crate::wishlist::FavoriteSet;

/// Avatar letter used when the display name has none.
pub const DEFAULT_INITIAL: char = 'U';

/// Everything a page renders from session state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub navbar: NavbarView,
    pub badges: Badges,
    pub cart: CartView,
}

impl SessionSnapshot {
    /// Derive a snapshot.
    ///
    /// `claims` must come from the same token the cart was read under.
    #[must_use]
    pub fn derive(claims: Option<&SessionClaims>, cart: &Cart, favorites: &FavoriteSet) -> Self {
        let signed_in = claims.is_some_and(|c| c.subject_id.is_some());
        Self {
            navbar: NavbarView::from_claims(claims),
            badges: Badges::new(signed_in, cart, favorites),
            cart: if signed_in {
                CartView::from_cart(cart)
            } else {
                CartView::LoginRequired
            },
        }
    }
}

/// Navbar user area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavbarView {
    pub signed_in: bool,
    pub display_name: String,
    pub initial: char,
    /// Whether to show the admin link. A UX hint only; the API authorizes.
    pub show_admin_link: bool,
}

impl Default for NavbarView {
    fn default() -> Self {
        Self::from_claims(None)
    }
}

impl NavbarView {
    #[must_use]
    pub fn from_claims(claims: Option<&SessionClaims>) -> Self {
        let display_name = claims.map_or(DEFAULT_DISPLAY_NAME, SessionClaims::display_name);
        Self {
            signed_in: claims.is_some_and(|c| c.subject_id.is_some()),
            display_name: display_name.to_string(),
            initial: avatar_initial(display_name),
            show_admin_link: claims.is_some_and(|c| c.is_admin),
        }
    }
}

/// First letter of the first word, uppercased.
#[must_use]
pub fn avatar_initial(name: &str) -> char {
    name.split_whitespace()
        .next()
        .and_then(|word| word.chars().next())
        .and_then(|c| c.to_uppercase().next())
        .unwrap_or(DEFAULT_INITIAL)
}

/// Counters shown on the navbar icons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Badges {
    /// Sum of quantities; zero when signed out.
    pub cart: u64,
    /// Size of the last authoritative favorite set.
    pub wishlist: usize,
}

impl Badges {
    #[must_use]
    pub fn new(signed_in: bool, cart: &Cart, favorites: &FavoriteSet) -> Self {
        Self {
            cart: if signed_in { cart.item_count() } else { 0 },
            wishlist: favorites.len(),
        }
    }
}

/// Cart panel contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CartView {
    /// No session: prompt for login instead of showing lines.
    #[default]
    LoginRequired,
    Empty,
    Lines {
        lines: Vec<CartLineView>,
        total: Price,
    },
}

impl CartView {
    #[must_use]
    pub fn from_cart(cart: &Cart) -> Self {
        if cart.is_empty() {
            return Self::Empty;
        }
        Self::Lines {
            lines: cart
                .items()
                .iter()
                .map(|item| CartLineView {
                    id: item.id,
                    name: item.name.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    line_total: item.line_total(),
                    image: item.image_ref.clone(),
                })
                .collect(),
            total: cart.total(),
        }
    }

    /// Grand total, zero unless there are lines.
    #[must_use]
    pub const fn total(&self) -> Price {
        match self {
            Self::Lines { total, .. } => *total,
            _ => Price::ZERO,
        }
    }
}

/// One rendered cart line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLineView {
    pub id: ProductId,
    pub name: String,
    pub quantity: Quantity,
    pub unit_price: Price,
    pub line_total: Price,
    pub image: Option<String>,
}

impl std::fmt::Display for CartLineView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} x{} — {} c/u — {}",
            self.name, self.quantity, self.unit_price, self.line_total
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use vivero_core::{CartLineItem, SubjectId};

    fn claims(username: Option<&str>, admin: bool) -> SessionClaims {
        SessionClaims {
            subject_id: SubjectId::new("7"),
            username: username.map(String::from),
            email: None,
            full_name: None,
            is_admin: admin,
        }
    }

    fn cart() -> Cart {
        [
            CartLineItem::new(ProductId::new(1), "Ficus", Price::new(25_000), Quantity::new(2)),
            CartLineItem::new(ProductId::new(2), "Cactus", Price::new(8_000), Quantity::ONE),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_avatar_initial() {
        assert_eq!(avatar_initial("maría gómez"), 'M');
        assert_eq!(avatar_initial("  ñu"), 'Ñ');
        assert_eq!(avatar_initial(""), DEFAULT_INITIAL);
        assert_eq!(avatar_initial("   "), DEFAULT_INITIAL);
    }

    #[test]
    fn test_signed_out_snapshot() {
        let snapshot = SessionSnapshot::derive(None, &cart(), &FavoriteSet::default());
        assert!(!snapshot.navbar.signed_in);
        assert_eq!(snapshot.navbar.display_name, DEFAULT_DISPLAY_NAME);
        assert_eq!(snapshot.navbar.initial, 'M');
        assert_eq!(snapshot.badges.cart, 0);
        assert_eq!(snapshot.cart, CartView::LoginRequired);
        assert_eq!(snapshot, SessionSnapshot::default());
    }

    #[test]
    fn test_signed_in_snapshot() {
        let claims = claims(Some("ana"), true);
        let favorites: FavoriteSet = [ProductId::new(9)].into_iter().collect();
        let snapshot = SessionSnapshot::derive(Some(&claims), &cart(), &favorites);
        assert!(snapshot.navbar.signed_in);
        assert!(snapshot.navbar.show_admin_link);
        assert_eq!(snapshot.navbar.initial, 'A');
        assert_eq!(snapshot.badges, Badges { cart: 3, wishlist: 1 });
        assert_eq!(snapshot.cart.total(), Price::new(58_000));

        let CartView::Lines { lines, .. } = &snapshot.cart else {
            panic!("expected cart lines");
        };
        assert_eq!(lines[0].to_string(), "Ficus x2 — $ 25.000 c/u — $ 50.000");
    }

    #[test]
    fn test_empty_cart_view() {
        let claims = claims(None, false);
        let snapshot = SessionSnapshot::derive(Some(&claims), &Cart::new(), &FavoriteSet::default());
        assert_eq!(snapshot.cart, CartView::Empty);
        assert!(!snapshot.navbar.show_admin_link);
    }
}
