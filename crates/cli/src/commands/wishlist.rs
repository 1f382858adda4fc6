//! Wishlist commands.
//!
//! Every command needs a session and ends with a fetch of the authoritative
//! favorite set; the badge printed afterwards reflects that fetch.

use vivero_core::ProductId;
use vivero_storefront::StorefrontContext;
use vivero_storefront::wishlist::{AddToCartOutcome, Mutation};

use super::{CliError, badges_line, print_line};

/// Print favorites with price and stock.
pub async fn list(ctx: &StorefrontContext) -> Result<(), CliError> {
    let products = ctx.wishlist().items().await?;
    if products.is_empty() {
        print_line("No tienes favoritos");
        return Ok(());
    }
    for product in &products {
        print_line(&format!(
            "{:>6}  {}  {}  {}",
            product.id.as_i64(),
            product.name,
            product.price,
            product.stock_level()
        ));
    }
    Ok(())
}

pub async fn toggle(ctx: &StorefrontContext, id: i64) -> Result<(), CliError> {
    let outcome = ctx.wishlist().toggle(ProductId::new(id)).await?;

    match (outcome.mutation, outcome.mutation_failed) {
        (Some(Mutation::Add), false) => print_line("Agregado a favoritos"),
        (Some(Mutation::Remove), false) => print_line("Quitado de favoritos"),
        (Some(_), true) => print_line("No se pudo actualizar favoritos"),
        (None, _) => {}
    }
    if outcome.stale {
        tracing::warn!("Favorites could not be refetched; indicators may be stale");
    }
    print_line(&badges_line(&ctx.rehydrate()));
    Ok(())
}

pub async fn remove(ctx: &StorefrontContext, id: i64) -> Result<(), CliError> {
    ctx.wishlist().remove(ProductId::new(id)).await?;
    print_line(&badges_line(&ctx.rehydrate()));
    Ok(())
}

pub async fn clear(ctx: &StorefrontContext) -> Result<(), CliError> {
    ctx.wishlist().clear().await?;
    print_line(&badges_line(&ctx.rehydrate()));
    Ok(())
}

/// Add one unit of a favorite to the cart.
pub async fn add_to_cart(ctx: &StorefrontContext, id: i64) -> Result<(), CliError> {
    match ctx.wishlist().add_to_cart(ProductId::new(id)).await? {
        AddToCartOutcome::Added(line) => print_line(&format!("{} agregado al carrito", line.name)),
        AddToCartOutcome::Placeholder(_) => {
            print_line("Favoritos no disponibles; se agregó el producto sin precio");
        }
        AddToCartOutcome::OutOfStock => print_line("Producto sin stock"),
        AddToCartOutcome::NotInWishlist => print_line("El producto no está en tus favoritos"),
    }
    print_line(&badges_line(&ctx.rehydrate()));
    Ok(())
}
