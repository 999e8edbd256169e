//! Token validation abstraction
//!
//! Provides the claims model, the resolved caller identity and the
//! [`TokenValidator`] seam the auth interceptor validates credentials through.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Principal name used when no identity is bound to a call
pub const ANONYMOUS: &str = "Anonymous";

/// Claims extracted from a validated bearer token
///
/// `iss`, `aud` and `exp` are enforced by the validator itself; only the
/// fields the service reads are modelled here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID or client ID)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Legacy display name claim emitted by some identity providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_name: Option<String>,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Caller identity resolved by the auth interceptor, valid for one call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedIdentity {
    /// Principal name, if the token carried one
    pub name: Option<String>,
    /// Token subject
    pub subject: Option<String>,
}

impl AuthenticatedIdentity {
    /// Principal name, or `"Anonymous"` when the token carried none
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(ANONYMOUS)
    }
}

impl From<Claims> for AuthenticatedIdentity {
    fn from(claims: Claims) -> Self {
        Self {
            name: claims.name.or(claims.unique_name),
            subject: claims.sub,
        }
    }
}

/// Token validator trait
///
/// Implementations check signature, expiry, issuer and audience and return the
/// token's claims only when every check passes.
pub trait TokenValidator: Send + Sync {
    /// Validate a token and extract claims
    fn validate_token(&self, token: &str) -> Result<Claims, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(name: Option<&str>, unique_name: Option<&str>) -> Claims {
        Claims {
            sub: Some("user:123".to_string()),
            name: name.map(String::from),
            unique_name: unique_name.map(String::from),
            exp: 0,
            iat: None,
            iss: None,
        }
    }

    #[test]
    fn test_identity_prefers_name_claim() {
        let identity = AuthenticatedIdentity::from(claims(Some("alice"), Some("a.smith")));
        assert_eq!(identity.display_name(), "alice");
        assert_eq!(identity.subject.as_deref(), Some("user:123"));
    }

    #[test]
    fn test_identity_falls_back_to_unique_name() {
        let identity = AuthenticatedIdentity::from(claims(None, Some("a.smith")));
        assert_eq!(identity.display_name(), "a.smith");
    }

    #[test]
    fn test_identity_without_name_is_anonymous() {
        let identity = AuthenticatedIdentity::from(claims(None, None));
        assert_eq!(identity.display_name(), ANONYMOUS);
    }

    #[test]
    fn test_claims_deserialize_with_missing_optional_fields() {
        let claims: Claims = serde_json::from_str(r#"{"exp": 1700000000}"#).unwrap();
        assert_eq!(claims.exp, 1_700_000_000);
        assert!(claims.sub.is_none());
        assert!(claims.name.is_none());
    }
}
