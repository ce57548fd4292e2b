/// Bearer header authentication
///
/// The only place an `Authorization` header is parsed. Resolution is
/// purely cryptographic: no storage access, so already-issued tokens keep
/// working while the database is down.

use crate::auth::claims::{Identity, TokenKind};
use crate::auth::jwt::{verify_token, JwtKeys};
use crate::error::AuthError;

pub const BEARER_PREFIX: &str = "Bearer ";

/// Resolve the identity behind a raw `Authorization` header value
///
/// # Errors
/// - `MissingToken` when the header is absent, lacks the bearer prefix,
///   or carries an empty token
/// - `InvalidToken` when the access token fails verification
pub fn authenticate(header: Option<&str>, keys: &JwtKeys) -> Result<Identity, AuthError> {
    let token = header
        .and_then(|h| h.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)?;

    verify_token(token, TokenKind::Access, keys).map_err(AuthError::InvalidToken)
}
