/// JWT Claims structure
///
/// Represents the payload of an issued token: the identity it is bound
/// to plus the standard RFC 7519 claims and a `kind` discriminator.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The authenticated principal handed to route handlers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
        }
    }
}

/// Which secret and lifetime a token was minted with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "access" => Some(TokenKind::Access),
            "refresh" => Some(TokenKind::Refresh),
            _ => None,
        }
    }
}

/// Claims written into every token we sign
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// User email
    pub email: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
    /// Unique token ID
    pub jti: String,
    /// Access or refresh
    pub kind: TokenKind,
}

impl Claims {
    /// Create claims for `identity`, valid for `lifetime_seconds` from `issued_at`
    pub fn new(
        identity: &Identity,
        kind: TokenKind,
        issued_at: i64,
        lifetime_seconds: i64,
        issuer: &str,
    ) -> Self {
        Self {
            sub: identity.user_id.clone(),
            email: identity.email.clone(),
            exp: issued_at + lifetime_seconds,
            iat: issued_at,
            iss: issuer.to_string(),
            jti: Uuid::new_v4().to_string(),
            kind,
        }
    }
}

/// Claims as read back from an untrusted token.
///
/// Every field is optional so a token missing a claim surfaces as a
/// missing-claims rejection rather than a parse failure.
#[derive(Debug, Deserialize)]
pub(crate) struct UntrustedClaims {
    pub sub: Option<String>,
    pub email: Option<String>,
    pub exp: Option<i64>,
    #[allow(dead_code)]
    pub iat: Option<i64>,
    pub kind: Option<String>,
}
