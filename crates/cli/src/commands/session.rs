//! Session commands.
//!
//! # Usage
//!
//! ```bash
//! vivero session login --id u42 --password secret
//! vivero session login --token eyJhbGciOi...
//! vivero session whoami
//! vivero session logout
//! ```

use secrecy::SecretString;

use vivero_storefront::StorefrontContext;

use super::{CliError, badges_line, print_line};

/// Sign in with a token, or exchange credentials for one.
///
/// Signing in merges any pre-login cart into the user's cart.
pub async fn login(
    ctx: &StorefrontContext,
    token: Option<String>,
    id: Option<String>,
    password: Option<String>,
) -> Result<(), CliError> {
    let snapshot = match (token, id, password) {
        (Some(token), _, _) => ctx.sign_in(&SecretString::from(token)).await?,
        (None, Some(id), Some(password)) => ctx.login(&id, &SecretString::from(password)).await?,
        _ => return Err(CliError::MissingCredentials),
    };

    if !snapshot.navbar.signed_in {
        tracing::warn!("Token stored but carries no subject; the session stays signed out");
    }
    tracing::info!("Signed in");
    print_line(&badges_line(&snapshot));
    Ok(())
}

/// Remove the stored token from both storages.
pub async fn logout(ctx: &StorefrontContext) -> Result<(), CliError> {
    let snapshot = ctx.sign_out().await?;
    tracing::info!("Signed out");
    print_line(&badges_line(&snapshot));
    Ok(())
}

/// Show who the token says is signed in.
pub async fn whoami(ctx: &StorefrontContext) {
    let snapshot = ctx.reload().await;
    print_line(&badges_line(&snapshot));

    if let Some(claims) = ctx.session().claims() {
        if let Some(subject) = &claims.subject_id {
            print_line(&format!("id: {subject}"));
        }
        if let Some(email) = &claims.email {
            print_line(&format!("email: {email}"));
        }
        if snapshot.navbar.show_admin_link {
            print_line(&format!("admin: {}", claims.admin_display_name()));
        }
    }
}
