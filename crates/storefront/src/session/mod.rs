//! Session token handling.
//!
//! - [`claims`] - decode (never verify) bearer token claims
//! - [`namespace`] - derive the storage namespace from the current token

pub mod claims;
pub mod namespace;

pub use claims::{ClaimsError, ClaimsReader, SessionClaims};
pub use namespace::{Namespace, SessionNamespace, SessionProvider, StaticSessionProvider};

/// Storage keys owned by the session and cart layers.
pub mod keys {
    use vivero_core::SubjectId;

    /// Key holding the bearer token.
    pub const TOKEN: &str = "token";

    /// Key of the pre-login cart. Global, not namespaced.
    pub const LEGACY_CART: &str = "lc_cart";

    /// Prefix of per-subject cart keys.
    pub const CART_PREFIX: &str = "lc_cart_";

    /// Cart key for a subject.
    #[must_use]
    pub fn cart_key(subject: &SubjectId) -> String {
        format!("{CART_PREFIX}{subject}")
    }

    /// Whether a key is a per-subject cart key.
    #[must_use]
    pub fn is_cart_key(key: &str) -> bool {
        key.starts_with(CART_PREFIX)
    }

    /// Whether a change to `key` affects session or cart state.
    #[must_use]
    pub fn is_session_relevant(key: &str) -> bool {
        key == TOKEN || key == LEGACY_CART || is_cart_key(key)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_relevant_keys() {
            assert!(is_session_relevant(TOKEN));
            assert!(is_session_relevant(LEGACY_CART));
            assert!(is_session_relevant("lc_cart_42"));
            assert!(!is_session_relevant("theme"));
            assert!(!is_cart_key(LEGACY_CART));
        }
    }
}
