//! Unified error handling with Sentry integration.
//!
//! Every storefront action returns `Result<T, AppError>`. Only
//! [`AppError::LoginRequired`] is meant to be shown to the user as-is; the
//! rest are degraded paths that [`AppError::report`] captures to Sentry
//! before the front end falls back to its last good state.

use thiserror::Error;

use crate::config::ConfigError;
use crate::storage::StorageError;
use crate::wishlist::RemoteError;

/// Prompt shown when an action needs a signed-in user.
pub const LOGIN_REQUIRED_MESSAGE: &str = "Inicia sesión para continuar";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// The action needs a resolved session namespace.
    #[error("Login required")]
    LoginRequired,

    /// Storage write failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The remote API is unavailable.
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Configuration is invalid.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl AppError {
    /// Whether this error is surfaced to the user rather than degraded silently.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        matches!(self, Self::LoginRequired)
    }

    /// Capture non-user-facing errors to Sentry and return the message to show.
    #[must_use]
    pub fn report(&self) -> String {
        if self.is_user_facing() {
            return LOGIN_REQUIRED_MESSAGE.to_string();
        }

        let event_id = sentry::capture_error(self);
        tracing::error!(
            error = %self,
            sentry_event_id = %event_id,
            "Storefront error"
        );

        // Don't expose internal error details to users
        match self {
            Self::Remote(_) => "Servicio no disponible, intenta de nuevo".to_string(),
            Self::Config(e) => e.to_string(),
            _ => "Error interno".to_string(),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a subject id.
///
/// Call this after sign-in to associate errors with users.
pub fn set_sentry_user(subject_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(subject_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on sign-out to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a user action.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, String)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb
            .data
            .insert((*key).to_string(), serde_json::Value::String(value.clone()));
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        assert_eq!(AppError::LoginRequired.to_string(), "Login required");

        let err = AppError::from(StorageError::Poisoned);
        assert_eq!(err.to_string(), "Storage error: storage lock poisoned");
    }

    #[test]
    fn test_only_login_required_is_user_facing() {
        assert!(AppError::LoginRequired.is_user_facing());
        assert!(!AppError::from(StorageError::Poisoned).is_user_facing());
        assert!(
            !AppError::from(RemoteError::Parse("bad".into())).is_user_facing()
        );
    }

    #[test]
    fn test_report_messages() {
        assert_eq!(AppError::LoginRequired.report(), LOGIN_REQUIRED_MESSAGE);
        assert_eq!(
            AppError::from(RemoteError::Parse("bad".into())).report(),
            "Servicio no disponible, intenta de nuevo"
        );
        assert_eq!(AppError::from(StorageError::Poisoned).report(), "Error interno");
    }
}
