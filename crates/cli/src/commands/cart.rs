//! Cart commands.
//!
//! The signed-in cart needs a session; `--guest` writes the pre-login cart,
//! which is merged into the user's cart on the next sign-in.

use vivero_core::{CartLineItem, Price, ProductId, Quantity};
use vivero_storefront::StorefrontContext;

use super::{CliError, badges_line, print_cart, print_line};

/// Arguments of `cart add`.
pub struct NewLine {
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub qty: u32,
    pub image: Option<String>,
    pub guest: bool,
}

impl NewLine {
    fn into_item(self) -> CartLineItem {
        let item = CartLineItem::new(
            ProductId::new(self.id),
            self.name,
            Price::new(self.price),
            Quantity::clamped(i64::from(self.qty)),
        );
        match self.image {
            Some(image) => item.with_image(image),
            None => item,
        }
    }
}

/// Print the cart panel.
pub fn show(ctx: &StorefrontContext) {
    print_cart(&ctx.snapshot().cart);
}

/// Add a line, or add to the quantity of an existing one.
pub fn add(ctx: &StorefrontContext, line: NewLine) -> Result<(), CliError> {
    let guest = line.guest;
    let item = line.into_item();
    let snapshot = if guest {
        ctx.add_to_guest_cart(item)?
    } else {
        ctx.add_to_cart(item)?
    };
    print_line(&badges_line(&snapshot));
    Ok(())
}

/// Shift a line's quantity by `delta`.
pub fn change(ctx: &StorefrontContext, id: i64, delta: i64) -> Result<(), CliError> {
    let snapshot = ctx.change_quantity(ProductId::new(id), delta)?;
    print_cart(&snapshot.cart);
    Ok(())
}

pub fn remove(ctx: &StorefrontContext, id: i64) -> Result<(), CliError> {
    let snapshot = ctx.remove_from_cart(ProductId::new(id))?;
    print_cart(&snapshot.cart);
    Ok(())
}

/// Print the grand total of the signed-in cart.
pub fn total(ctx: &StorefrontContext) -> Result<(), CliError> {
    ctx.require_login()?;
    print_line(&ctx.cart().total().to_string());
    Ok(())
}
