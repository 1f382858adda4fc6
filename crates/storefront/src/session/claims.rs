//! Bearer token claims decoding.
//!
//! Claims are read from the token payload **without verifying the
//! signature**. They are a UX hint only (which name to show, whether to
//! render the admin link, whose cart to load) and must never be used to
//! authorize anything; the remote API verifies the token on every call.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::Deserialize;
use thiserror::Error;

use vivero_core::SubjectId;

/// Display name used when the claims carry no username or email.
pub const DEFAULT_DISPLAY_NAME: &str = "Mi perfil";

/// Display name used on admin screens when nothing better is available.
pub const DEFAULT_ADMIN_DISPLAY_NAME: &str = "Administrador";

/// Role values that mark a subject as admin (compared case-insensitively).
const ADMIN_ROLES: &[&str] = &["admin", "administrator", "administrador"];

/// base64url, padding optional.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Why a token could not be decoded.
#[derive(Debug, Error)]
pub enum ClaimsError {
    /// The token does not have exactly three dot-separated segments.
    #[error("token has {0} segments, expected 3")]
    WrongSegmentCount(usize),

    /// The payload segment is not valid base64url.
    #[error("token payload is not base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The payload is not a JSON object.
    #[error("token payload is not a JSON object: {0}")]
    Json(#[from] serde_json::Error),
}

/// Claims as they appear in the payload. Every field is optional and loosely typed.
#[derive(Debug, Default, Deserialize)]
struct RawClaims {
    id: Option<serde_json::Value>,
    sub: Option<serde_json::Value>,
    user_id: Option<serde_json::Value>,
    username: Option<serde_json::Value>,
    email: Option<serde_json::Value>,
    full_name: Option<serde_json::Value>,
    is_admin: Option<serde_json::Value>,
    #[serde(rename = "isAdmin")]
    is_admin_camel: Option<serde_json::Value>,
    admin: Option<serde_json::Value>,
    role: Option<serde_json::Value>,
    rol: Option<serde_json::Value>,
}

impl RawClaims {
    fn subject_id(&self) -> Option<SubjectId> {
        [&self.id, &self.sub, &self.user_id]
            .into_iter()
            .flatten()
            .find_map(|value| match value {
                serde_json::Value::String(s) => SubjectId::new(s.as_str()),
                serde_json::Value::Number(n) => SubjectId::new(n.to_string()),
                _ => None,
            })
    }
}

/// A claim's text, if it is a string. Other JSON types are ignored.
fn text(value: Option<serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    }
}

/// Session claims decoded from a bearer token.
///
/// Decoded fresh on every read; never persisted apart from the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    /// Subject the session belongs to, if the token names one.
    pub subject_id: Option<SubjectId>,
    /// Login name.
    pub username: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Full name, shown on admin screens.
    pub full_name: Option<String>,
    /// Whether the claims mark the subject as admin. UX only.
    pub is_admin: bool,
}

impl SessionClaims {
    /// Name to show in the navbar: username, else email, else a default.
    #[must_use]
    pub fn display_name(&self) -> &str {
        non_blank(self.username.as_deref())
            .or_else(|| non_blank(self.email.as_deref()))
            .unwrap_or(DEFAULT_DISPLAY_NAME)
    }

    /// Name to show on admin screens: full name, else username, else the
    /// local part of the email, else a default.
    #[must_use]
    pub fn admin_display_name(&self) -> &str {
        non_blank(self.full_name.as_deref())
            .or_else(|| non_blank(self.username.as_deref()))
            .or_else(|| {
                non_blank(self.email.as_deref())
                    .and_then(|email| email.split('@').next())
                    .and_then(|local| non_blank(Some(local)))
            })
            .unwrap_or(DEFAULT_ADMIN_DISPLAY_NAME)
    }

    /// Customer name for order messages, if the claims carry one.
    #[must_use]
    pub fn customer_name(&self) -> Option<&str> {
        non_blank(self.username.as_deref()).or_else(|| non_blank(self.email.as_deref()))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Decodes bearer tokens into [`SessionClaims`]. Never validates them.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimsReader;

impl ClaimsReader {
    /// Decode a token, returning `None` for anything malformed.
    #[must_use]
    pub fn decode(token: &str) -> Option<SessionClaims> {
        match Self::try_decode(token) {
            Ok(claims) => Some(claims),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed session token");
                None
            }
        }
    }

    /// Decode a token, reporting why it is malformed.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimsError`] if the token is not three segments or the
    /// payload is not base64url-encoded JSON.
    pub fn try_decode(token: &str) -> Result<SessionClaims, ClaimsError> {
        let segments: Vec<&str> = token.trim().split('.').collect();
        let [_, payload, _] = segments.as_slice() else {
            return Err(ClaimsError::WrongSegmentCount(segments.len()));
        };

        // Some issuers emit the standard alphabet; fold it onto base64url.
        let normalized: String = payload
            .chars()
            .map(|c| match c {
                '+' => '-',
                '/' => '_',
                other => other,
            })
            .collect();
        let bytes = PAYLOAD_ENGINE.decode(normalized.as_bytes())?;
        let raw: RawClaims = serde_json::from_slice(&bytes)?;

        Ok(SessionClaims {
            subject_id: raw.subject_id(),
            is_admin: is_admin_claim(&raw),
            username: text(raw.username),
            email: text(raw.email),
            full_name: text(raw.full_name),
        })
    }
}

/// Whether the raw claims mark the subject as admin.
///
/// True if any admin flag is boolean `true`, or a role field names an admin
/// role case-insensitively.
fn is_admin_claim(raw: &RawClaims) -> bool {
    let flagged = [&raw.is_admin, &raw.is_admin_camel, &raw.admin]
        .into_iter()
        .flatten()
        .any(|v| v.as_bool() == Some(true));

    let by_role = [&raw.role, &raw.rol]
        .into_iter()
        .flatten()
        .filter_map(serde_json::Value::as_str)
        .any(|role| {
            let role = role.trim();
            ADMIN_ROLES.iter().any(|admin| admin.eq_ignore_ascii_case(role))
        });

    flagged || by_role
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::token_for;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    #[test]
    fn test_decode_rejects_short_tokens() {
        assert!(ClaimsReader::decode("").is_none());
        assert!(ClaimsReader::decode("abc").is_none());
        assert!(ClaimsReader::decode("abc.def").is_none());
        assert!(matches!(
            ClaimsReader::try_decode("abc.def"),
            Err(ClaimsError::WrongSegmentCount(2))
        ));
    }

    #[test]
    fn test_decode_rejects_non_json_payload() {
        let body = URL_SAFE_NO_PAD.encode("not json");
        assert!(ClaimsReader::decode(&format!("h.{body}.s")).is_none());
        assert!(matches!(
            ClaimsReader::try_decode(&format!("h.{body}.s")),
            Err(ClaimsError::Json(_))
        ));
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        assert!(matches!(
            ClaimsReader::try_decode("h.!!!.s"),
            Err(ClaimsError::Base64(_))
        ));
    }

    #[test]
    fn test_decode_numeric_subject() {
        let token = token_for(&serde_json::json!({"id": 42, "username": "ana"}));
        let claims = ClaimsReader::decode(&token).unwrap();
        assert_eq!(claims.subject_id.as_ref().unwrap().as_str(), "42");
        assert_eq!(claims.display_name(), "ana");
        assert!(!claims.is_admin);
    }

    #[test]
    fn test_decode_falls_back_to_sub() {
        let token = token_for(&serde_json::json!({"sub": "u42"}));
        let claims = ClaimsReader::decode(&token).unwrap();
        assert_eq!(claims.subject_id.as_ref().unwrap().as_str(), "u42");
        assert_eq!(claims.display_name(), DEFAULT_DISPLAY_NAME);
    }

    #[test]
    fn test_decode_ignores_non_string_names() {
        let token = token_for(&serde_json::json!({
            "id": 42,
            "username": 7,
            "email": ["a@b.co"],
            "full_name": {"first": "Ana"},
        }));
        let claims = ClaimsReader::try_decode(&token).unwrap();
        assert_eq!(claims.subject_id.as_ref().unwrap().as_str(), "42");
        assert!(claims.username.is_none());
        assert!(claims.email.is_none());
        assert!(claims.full_name.is_none());
        assert_eq!(claims.display_name(), DEFAULT_DISPLAY_NAME);
    }

    #[test]
    fn test_decode_without_subject() {
        let token = token_for(&serde_json::json!({"email": "a@b.co"}));
        let claims = ClaimsReader::decode(&token).unwrap();
        assert!(claims.subject_id.is_none());
        assert_eq!(claims.display_name(), "a@b.co");
    }

    #[test]
    fn test_decode_accepts_padded_standard_alphabet() {
        let payload = serde_json::json!({"id": 1, "username": "ñandú?>"});
        let body = base64::engine::general_purpose::STANDARD.encode(payload.to_string());
        let claims = ClaimsReader::decode(&format!("h.{body}.s")).unwrap();
        assert_eq!(claims.username.as_deref(), Some("ñandú?>"));
    }

    #[test]
    fn test_admin_flag_and_roles() {
        for payload in [
            serde_json::json!({"is_admin": true}),
            serde_json::json!({"isAdmin": true}),
            serde_json::json!({"role": "ADMIN"}),
            serde_json::json!({"role": " Administrador "}),
            serde_json::json!({"rol": "admin"}),
        ] {
            let claims = ClaimsReader::decode(&token_for(&payload)).unwrap();
            assert!(claims.is_admin, "expected admin for {payload}");
        }

        for payload in [
            serde_json::json!({"is_admin": "true"}),
            serde_json::json!({"is_admin": false, "role": "customer"}),
            serde_json::json!({}),
        ] {
            let claims = ClaimsReader::decode(&token_for(&payload)).unwrap();
            assert!(!claims.is_admin, "expected non-admin for {payload}");
        }
    }

    #[test]
    fn test_admin_display_name() {
        let claims = SessionClaims {
            subject_id: None,
            username: None,
            email: Some("maria@vivero.co".to_string()),
            full_name: None,
            is_admin: true,
        };
        assert_eq!(claims.admin_display_name(), "maria");

        let claims = SessionClaims {
            full_name: Some("María Gómez".to_string()),
            ..claims
        };
        assert_eq!(claims.admin_display_name(), "María Gómez");
    }
}
