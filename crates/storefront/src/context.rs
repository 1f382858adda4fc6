//! The storefront context shared by every page of one tab.
//!
//! Constructed once per tab and passed to whatever needs session or cart
//! access. Nothing in it caches the session: every operation resolves the
//! namespace from the token current at call time.

use std::sync::Arc;

use chrono::NaiveDateTime;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;

use vivero_core::{CartLineItem, ProductId};

use crate::cart::{CartStore, LegacyCartMigrator, MigrationOutcome};
use crate::config::StorefrontConfig;
use crate::error::{AppError, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::order::{OrderMessage, order_url};
use crate::session::{ClaimsReader, Namespace, SessionNamespace, StaticSessionProvider};
use crate::storage::{FileStorage, Storage};
use crate::views::SessionSnapshot;
use crate::wishlist::{ApiClient, WishlistApi, WishlistReconciler};

/// Session and cart access for one tab.
///
/// This struct is cheaply cloneable via `Arc`.
pub struct StorefrontContext<A = ApiClient> {
    inner: Arc<ContextInner<A>>,
}

impl<A> Clone for StorefrontContext<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> std::fmt::Debug for StorefrontContext<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontContext")
            .field("config", &self.inner.config)
            .field("session", &self.inner.session)
            .finish_non_exhaustive()
    }
}

struct ContextInner<A> {
    config: StorefrontConfig,
    persistent: Arc<dyn Storage>,
    session: SessionNamespace,
    migrator: LegacyCartMigrator,
    wishlist: WishlistReconciler<A>,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl StorefrontContext<ApiClient> {
    /// Create a context over file-backed storage, as the tab named `tab`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn open(config: StorefrontConfig, tab: &str) -> Result<Self, AppError> {
        let persistent = Arc::new(FileStorage::new(config.persistent_storage_path()));
        let tab_storage = Arc::new(FileStorage::new(config.tab_storage_path(tab)));
        let api = ApiClient::new(&config.api_base_url)?;
        Ok(Self::new(config, persistent, tab_storage, api))
    }

    /// Exchange credentials for a token and sign in with it.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the credentials or storing the
    /// token fails.
    pub async fn login(&self, id: &str, password: &SecretString) -> Result<SessionSnapshot, AppError> {
        let token = self.wishlist().api().login(id, password).await?;
        self.sign_in(&token).await
    }
}

impl<A: WishlistApi> StorefrontContext<A> {
    /// Create a context.
    ///
    /// A session token in `config` becomes the session provider and takes
    /// precedence over stored tokens.
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        persistent: Arc<dyn Storage>,
        tab: Arc<dyn Storage>,
        api: A,
    ) -> Self {
        let mut session = SessionNamespace::new(persistent.clone(), tab);
        if let Some(token) = &config.session_token {
            session = session.with_provider(Arc::new(StaticSessionProvider::new(token.clone())));
        }
        let migrator = LegacyCartMigrator::new(session.clone(), persistent.clone());
        let wishlist = WishlistReconciler::new(api, session.clone());
        let (snapshots, _) = watch::channel(SessionSnapshot::default());

        Self {
            inner: Arc::new(ContextInner {
                config,
                persistent,
                session,
                migrator,
                wishlist,
                snapshots,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the session resolver.
    #[must_use]
    pub fn session(&self) -> &SessionNamespace {
        &self.inner.session
    }

    /// Get a reference to the wishlist reconciler.
    #[must_use]
    pub fn wishlist(&self) -> &WishlistReconciler<A> {
        &self.inner.wishlist
    }

    /// Resolve the current namespace.
    #[must_use]
    pub fn namespace(&self) -> Namespace {
        self.inner.session.resolve()
    }

    /// The current namespace, or `LoginRequired`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::LoginRequired`] when there is no session.
    pub fn require_login(&self) -> Result<Namespace, AppError> {
        match self.namespace() {
            Namespace::NoSession => Err(AppError::LoginRequired),
            namespace => Ok(namespace),
        }
    }

    /// Cart store for the namespace current right now.
    ///
    /// Do not hold on to it across an await: the session may change.
    #[must_use]
    pub fn cart(&self) -> CartStore {
        CartStore::new(self.inner.persistent.clone(), self.namespace())
    }

    /// Cart store for the pre-login cart.
    #[must_use]
    pub fn guest_cart(&self) -> CartStore {
        CartStore::legacy(self.inner.persistent.clone())
    }

    // =========================================================================
    // Cart actions
    // =========================================================================

    /// Add an item to the signed-in user's cart.
    ///
    /// # Errors
    ///
    /// Returns `LoginRequired` without a session, or a storage error.
    pub fn add_to_cart(&self, item: CartLineItem) -> Result<SessionSnapshot, AppError> {
        let namespace = self.require_login()?;
        add_breadcrumb(
            "cart",
            "Added to cart",
            &[("product_id", item.id.to_string()), ("qty", item.quantity.to_string())],
        );
        CartStore::new(self.inner.persistent.clone(), namespace).upsert(item)?;
        Ok(self.rehydrate())
    }

    /// Add an item to the pre-login cart, merged into the user's cart on
    /// the next sign-in.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    pub fn add_to_guest_cart(&self, item: CartLineItem) -> Result<SessionSnapshot, AppError> {
        self.guest_cart().upsert(item)?;
        Ok(self.rehydrate())
    }

    /// Shift a line's quantity by `delta`, never below one.
    ///
    /// # Errors
    ///
    /// Returns `LoginRequired` without a session, or a storage error.
    pub fn change_quantity(&self, id: ProductId, delta: i64) -> Result<SessionSnapshot, AppError> {
        let namespace = self.require_login()?;
        CartStore::new(self.inner.persistent.clone(), namespace).set_quantity(id, delta)?;
        Ok(self.rehydrate())
    }

    /// Remove a line from the cart.
    ///
    /// # Errors
    ///
    /// Returns `LoginRequired` without a session, or a storage error.
    pub fn remove_from_cart(&self, id: ProductId) -> Result<SessionSnapshot, AppError> {
        let namespace = self.require_login()?;
        CartStore::new(self.inner.persistent.clone(), namespace).remove(id)?;
        Ok(self.rehydrate())
    }

    /// Order summary for the current cart, stamped with `at`.
    ///
    /// # Errors
    ///
    /// Returns `LoginRequired` without a session.
    pub fn order_message(&self, at: NaiveDateTime) -> Result<String, AppError> {
        let namespace = self.require_login()?;
        let cart = CartStore::new(self.inner.persistent.clone(), namespace).read();
        let claims = self.inner.session.claims();
        Ok(OrderMessage::new(&cart)
            .with_customer(claims.as_ref().and_then(|c| c.customer_name()))
            .render(at))
    }

    /// WhatsApp link for the current cart, `None` if the cart is empty.
    ///
    /// # Errors
    ///
    /// Returns `LoginRequired` without a session.
    pub fn order_url(&self, at: NaiveDateTime) -> Result<Option<String>, AppError> {
        let namespace = self.require_login()?;
        if CartStore::new(self.inner.persistent.clone(), namespace).read().is_empty() {
            return Ok(None);
        }
        let message = self.order_message(at)?;
        Ok(Some(order_url(&self.inner.config.order_phone, &message)))
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Store a token, merge the pre-login cart and refresh everything.
    ///
    /// # Errors
    ///
    /// Returns an error if storing the token fails.
    pub async fn sign_in(&self, token: &SecretString) -> Result<SessionSnapshot, AppError> {
        self.inner.session.sign_in(token)?;
        if let Some(claims) = ClaimsReader::decode(token.expose_secret())
            && let Some(subject) = &claims.subject_id
        {
            set_sentry_user(subject, claims.email.as_deref());
        }
        Ok(self.reload().await)
    }

    /// Remove the stored token and refresh everything.
    ///
    /// # Errors
    ///
    /// Returns an error if removing the token fails.
    pub async fn sign_out(&self) -> Result<SessionSnapshot, AppError> {
        self.inner.session.sign_out()?;
        clear_sentry_user();
        Ok(self.reload().await)
    }

    /// Run the legacy cart migration.
    ///
    /// # Errors
    ///
    /// Returns an error if the merged cart cannot be written.
    pub fn migrate(&self) -> Result<MigrationOutcome, AppError> {
        Ok(self.inner.migrator.migrate()?)
    }

    // =========================================================================
    // Derived state
    // =========================================================================

    /// Compute the current snapshot without publishing it.
    ///
    /// Claims and cart are both derived from one read of the token.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let claims = self.inner.session.claims();
        let namespace = claims
            .as_ref()
            .and_then(|c| c.subject_id.clone())
            .map_or(Namespace::NoSession, Namespace::Subject);
        let cart = CartStore::new(self.inner.persistent.clone(), namespace).read();
        SessionSnapshot::derive(claims.as_ref(), &cart, &self.inner.wishlist.favorites())
    }

    /// Run the migration, recompute the snapshot and publish it.
    ///
    /// Safe to call redundantly; a failed migration is reported and the
    /// snapshot is still published.
    pub fn rehydrate(&self) -> SessionSnapshot {
        if let Err(e) = self.migrate() {
            let _ = e.report();
        }
        let snapshot = self.snapshot();
        self.inner.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot.clone();
                true
            }
        });
        snapshot
    }

    /// [`Self::rehydrate`] after refreshing the favorites from the remote API.
    pub async fn reload(&self) -> SessionSnapshot {
        if let Err(e) = self.inner.wishlist.refresh().await {
            tracing::warn!(error = %e, "Wishlist unavailable, badge may be stale");
        }
        self.rehydrate()
    }

    /// Subscribe to published snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshots.subscribe()
    }
}
