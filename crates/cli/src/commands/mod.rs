//! Command implementations and shared terminal output.

pub mod cart;
pub mod order;
pub mod session;
pub mod watch;
pub mod wishlist;

use thiserror::Error;

use vivero_storefront::AppError;
use vivero_storefront::views::{CartView, SessionSnapshot};

/// Errors a command can end with.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    App(#[from] AppError),

    /// Neither a token nor credentials were given to `session login`.
    #[error("Pass --token, or --id with --password")]
    MissingCredentials,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Message to show the user. Unexpected errors are reported first.
    pub fn report(&self) -> String {
        match self {
            Self::App(e) => e.report(),
            other => other.to_string(),
        }
    }
}

#[allow(clippy::print_stderr)]
pub fn print_error(message: &str) {
    eprintln!("{message}");
}

#[allow(clippy::print_stdout)]
pub fn print_line(line: &str) {
    println!("{line}");
}

/// One-line summary of the navbar and badges.
pub fn badges_line(snapshot: &SessionSnapshot) -> String {
    let user = if snapshot.navbar.signed_in {
        format!("[{}] {}", snapshot.navbar.initial, snapshot.navbar.display_name)
    } else {
        "sin sesión".to_string()
    };
    format!(
        "{user} | carrito: {} | favoritos: {}",
        snapshot.badges.cart, snapshot.badges.wishlist
    )
}

/// Print the cart panel.
pub fn print_cart(view: &CartView) {
    match view {
        CartView::LoginRequired => print_line(vivero_storefront::error::LOGIN_REQUIRED_MESSAGE),
        CartView::Empty => print_line("Tu carrito está vacío"),
        CartView::Lines { lines, total } => {
            for line in lines {
                print_line(&format!("{:>6}  {line}", line.id.as_i64()));
            }
            print_line(&format!("Total: {total}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vivero_storefront::views::{Badges, NavbarView};

    #[test]
    fn test_badges_line_signed_out() {
        assert_eq!(
            badges_line(&SessionSnapshot::default()),
            "sin sesión | carrito: 0 | favoritos: 0"
        );
    }

    #[test]
    fn test_badges_line_signed_in() {
        let snapshot = SessionSnapshot {
            navbar: NavbarView {
                signed_in: true,
                display_name: "ana".to_string(),
                initial: 'A',
                show_admin_link: false,
            },
            badges: Badges { cart: 3, wishlist: 2 },
            cart: CartView::Empty,
        };
        assert_eq!(badges_line(&snapshot), "[A] ana | carrito: 3 | favoritos: 2");
    }

    #[test]
    fn test_login_required_is_user_facing() {
        let err = CliError::from(AppError::LoginRequired);
        assert_eq!(err.report(), vivero_storefront::error::LOGIN_REQUIRED_MESSAGE);
    }
}
