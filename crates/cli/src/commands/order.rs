//! Order hand-off command.

use chrono::Local;

use vivero_storefront::StorefrontContext;
use vivero_storefront::order::EMPTY_CART_MESSAGE;

use super::{CliError, print_line};

/// Print the order message, or the WhatsApp link that carries it.
pub fn render(ctx: &StorefrontContext, link: bool) -> Result<(), CliError> {
    let now = Local::now().naive_local();
    if link {
        match ctx.order_url(now)? {
            Some(url) => print_line(&url),
            None => print_line(EMPTY_CART_MESSAGE),
        }
    } else {
        print_line(&ctx.order_message(now)?);
    }
    Ok(())
}
