//! Session namespace resolution.
//!
//! The namespace decides whose cart is read and written. It is derived from
//! whatever token is current *at call time* and is never cached: another tab
//! may log out between the start and the end of an action.

use std::fmt;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use vivero_core::SubjectId;

use super::claims::{ClaimsReader, SessionClaims};
use super::keys;
use crate::storage::{Storage, StorageError};

/// Storage scope for cart data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// No usable session. Nothing is persisted and reads are always empty.
    NoSession,
    /// Cart data for one subject.
    Subject(SubjectId),
}

impl Namespace {
    /// Storage key of this namespace's cart, `None` without a session.
    #[must_use]
    pub fn cart_key(&self) -> Option<String> {
        match self {
            Self::NoSession => None,
            Self::Subject(subject) => Some(keys::cart_key(subject)),
        }
    }

    /// The subject, if any.
    #[must_use]
    pub const fn subject(&self) -> Option<&SubjectId> {
        match self {
            Self::NoSession => None,
            Self::Subject(subject) => Some(subject),
        }
    }

    /// Whether a subject is resolved.
    #[must_use]
    pub const fn is_session(&self) -> bool {
        matches!(self, Self::Subject(_))
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSession => f.write_str("no session"),
            Self::Subject(subject) => write!(f, "cart for subject {subject}"),
        }
    }
}

/// A source of bearer tokens that takes precedence over stored ones.
///
/// Embedders that manage the session themselves (a native shell, a test
/// harness, an environment variable) implement this.
pub trait SessionProvider: Send + Sync {
    /// The current token, if the provider has one.
    fn token(&self) -> Option<SecretString>;
}

/// A provider holding one fixed token.
pub struct StaticSessionProvider(SecretString);

impl StaticSessionProvider {
    /// Wrap a token.
    #[must_use]
    pub const fn new(token: SecretString) -> Self {
        Self(token)
    }
}

impl SessionProvider for StaticSessionProvider {
    fn token(&self) -> Option<SecretString> {
        Some(self.0.clone())
    }
}

/// Resolves the current token, claims and [`Namespace`].
///
/// Token precedence: injected session provider, then persistent storage,
/// then tab-scoped storage.
#[derive(Clone)]
pub struct SessionNamespace {
    provider: Option<Arc<dyn SessionProvider>>,
    persistent: Arc<dyn Storage>,
    tab: Arc<dyn Storage>,
}

impl fmt::Debug for SessionNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionNamespace")
            .field("provider", &self.provider.is_some())
            .finish_non_exhaustive()
    }
}

impl SessionNamespace {
    /// Create a resolver over the given storages.
    #[must_use]
    pub fn new(persistent: Arc<dyn Storage>, tab: Arc<dyn Storage>) -> Self {
        Self {
            provider: None,
            persistent,
            tab,
        }
    }

    /// Put a session provider in front of the stored tokens.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn SessionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Storage shared by every tab; carts live here.
    #[must_use]
    pub const fn persistent(&self) -> &Arc<dyn Storage> {
        &self.persistent
    }

    /// The current bearer token, if any.
    #[must_use]
    pub fn token(&self) -> Option<SecretString> {
        let non_blank = |t: &SecretString| !t.expose_secret().trim().is_empty();
        self.provider
            .as_ref()
            .and_then(|p| p.token())
            .filter(non_blank)
            .or_else(|| {
                self.persistent
                    .get(keys::TOKEN)
                    .map(SecretString::from)
                    .filter(non_blank)
            })
            .or_else(|| self.tab.get(keys::TOKEN).map(SecretString::from).filter(non_blank))
    }

    /// Whether any token is present, usable or not.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }

    /// Claims of the current token. `None` when there is no token or it is malformed.
    #[must_use]
    pub fn claims(&self) -> Option<SessionClaims> {
        self.token()
            .and_then(|token| ClaimsReader::decode(token.expose_secret()))
    }

    /// Resolve the namespace from the current token.
    #[must_use]
    pub fn resolve(&self) -> Namespace {
        let namespace = self
            .claims()
            .and_then(|claims| claims.subject_id)
            .map_or(Namespace::NoSession, Namespace::Subject);
        tracing::debug!(%namespace, "Resolved session namespace");
        namespace
    }

    /// Store a token in both persistent and tab-scoped storage.
    ///
    /// # Errors
    ///
    /// Returns an error if either storage rejects the write.
    pub fn sign_in(&self, token: &SecretString) -> Result<(), StorageError> {
        let token = token.expose_secret().trim();
        self.persistent.set(keys::TOKEN, token)?;
        self.tab.set(keys::TOKEN, token)?;
        tracing::info!("Session token stored");
        Ok(())
    }

    /// Remove the token from both persistent and tab-scoped storage.
    ///
    /// A token supplied by a session provider is not affected.
    ///
    /// # Errors
    ///
    /// Returns an error if either storage rejects the removal.
    pub fn sign_out(&self) -> Result<(), StorageError> {
        self.persistent.remove(keys::TOKEN)?;
        self.tab.remove(keys::TOKEN)?;
        tracing::info!("Session token cleared");
        Ok(())
    }
}
