//! Remote catalog API client.
//!
//! Only the endpoints the storefront core consumes are covered: login and the
//! per-user wishlist. Every call authenticates with the bearer token current at
//! call time; the server verifies it.

use std::future::Future;
use std::sync::Arc;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use vivero_core::ProductId;

use super::WishlistProduct;

/// Errors from the remote API.
///
/// Callers treat every variant the same way: the remote is unavailable.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status.
    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// The per-user wishlist endpoints.
pub trait WishlistApi: Send + Sync {
    /// `GET /api/wishlist`.
    fn list(
        &self,
        token: &SecretString,
    ) -> impl Future<Output = Result<Vec<WishlistProduct>, RemoteError>> + Send;

    /// `POST /api/wishlist/{id}`.
    fn add(
        &self,
        token: &SecretString,
        id: ProductId,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// `DELETE /api/wishlist/{id}`.
    fn remove(
        &self,
        token: &SecretString,
        id: ProductId,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;
}

impl<T: WishlistApi> WishlistApi for Arc<T> {
    async fn list(&self, token: &SecretString) -> Result<Vec<WishlistProduct>, RemoteError> {
        self.as_ref().list(token).await
    }

    async fn add(&self, token: &SecretString, id: ProductId) -> Result<(), RemoteError> {
        self.as_ref().add(token, id).await
    }

    async fn remove(&self, token: &SecretString, id: ProductId) -> Result<(), RemoteError> {
        self.as_ref().remove(token, id).await
    }
}

#[derive(Debug, Default, Deserialize)]
struct WishlistResponse {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    id: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

// =============================================================================
// ApiClient
// =============================================================================

/// HTTP client for the catalog API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(base_url: &Url) -> Result<Self, RemoteError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Exchange credentials for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, the credentials are rejected, or
    /// the response carries no token.
    #[instrument(skip(self, password))]
    pub async fn login(&self, id: &str, password: &SecretString) -> Result<SecretString, RemoteError> {
        let body = LoginRequest {
            id,
            password: password.expose_secret(),
        };
        let response = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()))?;
        if login.token.trim().is_empty() {
            return Err(RemoteError::Parse("login response carried an empty token".into()));
        }
        debug!("Login accepted");
        Ok(SecretString::from(login.token))
    }
}

impl WishlistApi for ApiClient {
    #[instrument(skip_all)]
    async fn list(&self, token: &SecretString) -> Result<Vec<WishlistProduct>, RemoteError> {
        let response = self
            .client
            .get(self.url("/api/wishlist"))
            .bearer_auth(token.expose_secret())
            .send()
            .await?;
        let response = check_status(response).await?;

        let body: WishlistResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()))?;
        let products: Vec<_> = body
            .items
            .iter()
            .filter_map(WishlistProduct::from_json)
            .collect();
        debug!(count = products.len(), "Fetched wishlist");
        Ok(products)
    }

    #[instrument(skip(self, token), fields(product_id = %id))]
    async fn add(&self, token: &SecretString, id: ProductId) -> Result<(), RemoteError> {
        let response = self
            .client
            .post(self.url(&format!("/api/wishlist/{id}")))
            .bearer_auth(token.expose_secret())
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    #[instrument(skip(self, token), fields(product_id = %id))]
    async fn remove(&self, token: &SecretString, id: ProductId) -> Result<(), RemoteError> {
        let response = self
            .client
            .delete(self.url(&format!("/api/wishlist/{id}")))
            .bearer_auth(token.expose_secret())
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

/// Turn a non-success response into [`RemoteError::Status`].
///
/// The message is the body's `error` field when it has one, else the raw body.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|e| e.error)
        .unwrap_or(body);
    Err(RemoteError::Status {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = ApiClient::new(&Url::parse("https://api.example.com/").unwrap()).unwrap();
        assert_eq!(client.url("/api/wishlist"), "https://api.example.com/api/wishlist");

        let client = ApiClient::new(&Url::parse("https://example.com/vivero/").unwrap()).unwrap();
        assert_eq!(client.url("/api/wishlist/4"), "https://example.com/vivero/api/wishlist/4");
    }

    #[test]
    fn test_wishlist_response_tolerates_missing_items() {
        let body: WishlistResponse = serde_json::from_str("{}").unwrap();
        assert!(body.items.is_empty());
    }

    #[test]
    fn test_remote_error_display() {
        let err = RemoteError::Status {
            status: 401,
            message: "Token inválido".into(),
        };
        assert_eq!(err.to_string(), "API error: 401 - Token inválido");
    }
}
