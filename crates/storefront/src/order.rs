//! Plain-text order summaries sent over WhatsApp.
//!
//! Nothing is placed or paid here; the message is handed to the shop by hand.

use std::fmt::Write as _;

use chrono::NaiveDateTime;

use vivero_core::{Cart, DEFAULT_ITEM_NAME};

/// Message sent when the cart has no lines.
pub const EMPTY_CART_MESSAGE: &str = "Hola, quiero hacer un pedido, pero mi carrito está vacío.";

const GREETING: &str = "Hola, quiero hacer este pedido desde la página del vivero.";

/// An order summary for one cart.
#[derive(Debug, Clone, Copy)]
pub struct OrderMessage<'a> {
    cart: &'a Cart,
    customer: Option<&'a str>,
}

impl<'a> OrderMessage<'a> {
    #[must_use]
    pub const fn new(cart: &'a Cart) -> Self {
        Self {
            cart,
            customer: None,
        }
    }

    /// Sign the message with a customer name.
    #[must_use]
    pub const fn with_customer(mut self, customer: Option<&'a str>) -> Self {
        self.customer = customer;
        self
    }

    /// Render the message, stamped with `at`.
    #[must_use]
    pub fn render(&self, at: NaiveDateTime) -> String {
        if self.cart.is_empty() {
            return EMPTY_CART_MESSAGE.to_string();
        }

        let mut out = String::new();
        let _ = writeln!(out, "{GREETING}");
        let _ = writeln!(out);
        let _ = writeln!(out, "Detalle de mi carrito:");
        for item in self.cart.items() {
            let name = match item.name.trim() {
                "" => DEFAULT_ITEM_NAME,
                name => name,
            };
            let _ = writeln!(
                out,
                "• {name} — cant: {} — {} c/u — total: {}",
                item.quantity,
                item.unit_price,
                item.line_total()
            );
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Total aproximado: {}", self.cart.total());

        if let Some(customer) = self.customer.map(str::trim).filter(|c| !c.is_empty()) {
            let _ = writeln!(out);
            let _ = writeln!(out, "Cliente: {customer}");
        }

        let _ = writeln!(out);
        let _ = write!(out, "Fecha: {}", at.format("%-d/%-m/%Y %H:%M"));
        out
    }
}

/// WhatsApp link that opens a chat with `phone` prefilled with `message`.
///
/// Everything but digits is stripped from the phone number.
#[must_use]
pub fn order_url(phone: &str, message: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    format!("https://wa.me/{digits}?text={}", urlencoding::encode(message))
}
