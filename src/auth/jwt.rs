/// JWT Token Issuance and Verification
///
/// Access and refresh tokens are both HS256 JWTs. They differ in the
/// signing secret (which may be shared), their lifetime, and the `kind`
/// claim, which the verifier enforces.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::auth::claims::{Claims, Identity, TokenKind, UntrustedClaims};
use crate::configuration::JwtSettings;
use crate::error::{AppError, ConfigError};

/// Secrets shorter than this are accepted but logged at startup
const MIN_SECRET_LENGTH: usize = 32;

/// Why a presented token was rejected
///
/// Clients only ever see a generic 401; the variant is for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Not a decodable JWT
    #[error("malformed token")]
    Malformed,
    /// Decodes, but the signature does not match the expected secret
    #[error("bad signature")]
    BadSignature,
    /// Valid signature, past its expiry
    #[error("token expired")]
    Expired,
    /// A required claim is absent or carries an unexpected value
    #[error("missing claims")]
    MissingClaims,
    /// An access token where a refresh token was expected, or vice versa
    #[error("wrong token kind")]
    WrongKind,
}

impl TokenError {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenError::Malformed => "malformed",
            TokenError::BadSignature => "bad_signature",
            TokenError::Expired => "expired",
            TokenError::MissingClaims => "missing_claims",
            TokenError::WrongKind => "wrong_kind",
        }
    }
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Signing material and lifetimes, built once at startup and shared
/// read-only between workers.
pub struct JwtKeys {
    access: KeyPair,
    refresh: KeyPair,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
    issuer: String,
    validation: Validation,
}

impl JwtKeys {
    /// Build keys from settings
    ///
    /// # Errors
    /// - `MissingRequired` when no access secret is configured
    /// - `InvalidValue` when a lifetime is not positive
    pub fn from_settings(settings: &JwtSettings) -> Result<Self, ConfigError> {
        let access_secret = non_blank(settings.access_secret.as_deref()).ok_or_else(|| {
            ConfigError::MissingRequired("jwt.access_secret (JWT_SECRET)".to_string())
        })?;

        let refresh_secret = match non_blank(settings.refresh_secret.as_deref()) {
            Some(secret) => secret,
            None => {
                tracing::warn!("No refresh token secret configured, signing refresh tokens with the access secret");
                access_secret
            }
        };

        if access_secret.len() < MIN_SECRET_LENGTH || refresh_secret.len() < MIN_SECRET_LENGTH {
            tracing::warn!(
                min_length = MIN_SECRET_LENGTH,
                "JWT signing secret is shorter than recommended"
            );
        }

        if settings.access_token_expiry <= 0 {
            return Err(ConfigError::InvalidValue(
                "jwt.access_token_expiry must be positive".to_string(),
            ));
        }
        if settings.refresh_token_expiry <= 0 {
            return Err(ConfigError::InvalidValue(
                "jwt.refresh_token_expiry must be positive".to_string(),
            ));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        // Expiry is checked against an explicit clock in `verify_token_at`.
        validation.validate_exp = false;
        validation.set_issuer(&[&settings.issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        Ok(Self {
            access: KeyPair::from_secret(access_secret),
            refresh: KeyPair::from_secret(refresh_secret),
            access_token_expiry: settings.access_token_expiry,
            refresh_token_expiry: settings.refresh_token_expiry,
            issuer: settings.issuer.clone(),
            validation,
        })
    }

    /// Access token lifetime in seconds
    pub fn access_token_expiry(&self) -> i64 {
        self.access_token_expiry
    }

    /// Refresh token lifetime in seconds
    pub fn refresh_token_expiry(&self) -> i64 {
        self.refresh_token_expiry
    }

    fn keys_for(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    fn lifetime_for(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.access_token_expiry,
            TokenKind::Refresh => self.refresh_token_expiry,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

/// Generate a new access token for `identity`
///
/// # Errors
/// Returns error if token encoding fails
pub fn issue_access_token(identity: &Identity, keys: &JwtKeys) -> Result<String, AppError> {
    issue_token_at(identity, TokenKind::Access, chrono::Utc::now().timestamp(), keys)
}

/// Generate a new refresh token for `identity`
pub fn issue_refresh_token(identity: &Identity, keys: &JwtKeys) -> Result<String, AppError> {
    issue_token_at(identity, TokenKind::Refresh, chrono::Utc::now().timestamp(), keys)
}

/// Sign a token of `kind` as if issued at `issued_at` (Unix seconds)
pub fn issue_token_at(
    identity: &Identity,
    kind: TokenKind,
    issued_at: i64,
    keys: &JwtKeys,
) -> Result<String, AppError> {
    let claims = Claims::new(identity, kind, issued_at, keys.lifetime_for(kind), &keys.issuer);

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &keys.keys_for(kind).encoding,
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Verify `token` as a `kind` token and return the identity it carries
///
/// Stateless: trusts the signature, never looks the user up.
pub fn verify_token(token: &str, kind: TokenKind, keys: &JwtKeys) -> Result<Identity, TokenError> {
    verify_token_at(token, kind, chrono::Utc::now().timestamp(), keys)
}

/// Verify `token` against an explicit clock reading `now` (Unix seconds)
pub fn verify_token_at(
    token: &str,
    kind: TokenKind,
    now: i64,
    keys: &JwtKeys,
) -> Result<Identity, TokenError> {
    let claims = decode::<UntrustedClaims>(token, &keys.keys_for(kind).decoding, &keys.validation)
        .map(|data| data.claims)
        .map_err(|e| classify(e.kind()))?;

    let exp = claims.exp.ok_or(TokenError::MissingClaims)?;
    if exp <= now {
        return Err(TokenError::Expired);
    }

    let user_id = claims
        .sub
        .filter(|s| !s.is_empty())
        .ok_or(TokenError::MissingClaims)?;
    let email = claims
        .email
        .filter(|s| !s.is_empty())
        .ok_or(TokenError::MissingClaims)?;
    let token_kind = claims
        .kind
        .as_deref()
        .and_then(TokenKind::parse)
        .ok_or(TokenError::MissingClaims)?;

    if token_kind != kind {
        return Err(TokenError::WrongKind);
    }

    Ok(Identity { user_id, email })
}

fn classify(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::BadSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::MissingRequiredClaim(_)
        | ErrorKind::InvalidIssuer
        | ErrorKind::InvalidSubject
        | ErrorKind::InvalidAudience
        | ErrorKind::ImmatureSignature => TokenError::MissingClaims,
        _ => TokenError::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-characters-long";

    fn test_keys() -> JwtKeys {
        JwtKeys::from_settings(&JwtSettings::with_secret(SECRET)).expect("Failed to build keys")
    }

    fn identity() -> Identity {
        Identity::new("4b2f1c8e-user", "test@example.com")
    }

    fn sign_raw(payload: serde_json::Value, secret: &str) -> String {
        encode(
            &Header::default(),
            &payload,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("Failed to sign payload")
    }

    #[test]
    fn test_issue_and_verify_access_token() {
        let keys = test_keys();
        let token = issue_access_token(&identity(), &keys).expect("Failed to issue token");

        let verified = verify_token(&token, TokenKind::Access, &keys).expect("Failed to verify");
        assert_eq!(verified, identity());
    }

    #[test]
    fn test_issue_and_verify_refresh_token() {
        let keys = test_keys();
        let token = issue_refresh_token(&identity(), &keys).expect("Failed to issue token");

        let verified = verify_token(&token, TokenKind::Refresh, &keys).expect("Failed to verify");
        assert_eq!(verified, identity());
    }

    #[test]
    fn test_token_is_url_safe() {
        let token = issue_access_token(&identity(), &test_keys()).unwrap();
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'));
    }

    #[test]
    fn test_expired_token() {
        let keys = test_keys();
        let two_hours_ago = chrono::Utc::now().timestamp() - 7200;
        let token = issue_token_at(&identity(), TokenKind::Access, two_hours_ago, &keys).unwrap();

        assert_eq!(
            verify_token(&token, TokenKind::Access, &keys),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_expiry_boundary() {
        let keys = test_keys();
        let token = issue_token_at(&identity(), TokenKind::Access, 1_000, &keys).unwrap();
        let exp = 1_000 + keys.access_token_expiry();

        assert!(verify_token_at(&token, TokenKind::Access, exp - 1, &keys).is_ok());
        assert_eq!(
            verify_token_at(&token, TokenKind::Access, exp, &keys),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_refresh_lifetime_is_longer() {
        let keys = test_keys();
        let token = issue_token_at(&identity(), TokenKind::Refresh, 1_000, &keys).unwrap();

        // Past the access lifetime, inside the refresh lifetime
        let later = 1_000 + keys.access_token_expiry() + 60;
        assert!(verify_token_at(&token, TokenKind::Refresh, later, &keys).is_ok());
    }

    #[test]
    fn test_foreign_secret_is_bad_signature() {
        let keys = test_keys();
        let foreign = sign_raw(
            serde_json::json!({
                "sub": "someone",
                "email": "a@x.com",
                "iat": 0,
                "exp": 9_999_999_999i64,
                "iss": "dashboard",
                "kind": "access",
            }),
            "some-other-secret-that-is-also-long-enough",
        );

        assert_eq!(
            verify_token(&foreign, TokenKind::Access, &keys),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_expired_token_with_foreign_secret_is_bad_signature() {
        let keys = test_keys();
        let other = JwtKeys::from_settings(&JwtSettings::with_secret("another-secret-another-secret-xx"))
            .unwrap();
        let token = issue_token_at(&identity(), TokenKind::Access, 0, &other).unwrap();

        assert_eq!(
            verify_token(&token, TokenKind::Access, &keys),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_malformed_tokens() {
        let keys = test_keys();
        for garbage in ["", "invalid.token.here", "not-a-jwt", "a.b"] {
            assert_eq!(
                verify_token(garbage, TokenKind::Access, &keys),
                Err(TokenError::Malformed),
                "expected Malformed for {:?}",
                garbage
            );
        }
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let keys = test_keys();
        let token = issue_access_token(&identity(), &keys).unwrap();

        let tampered = format!("{}X", token);
        assert!(verify_token(&tampered, TokenKind::Access, &keys).is_err());
    }

    #[test]
    fn test_missing_email_claim() {
        let keys = test_keys();
        let token = sign_raw(
            serde_json::json!({
                "sub": "user-1",
                "iat": 0,
                "exp": 9_999_999_999i64,
                "iss": "dashboard",
                "kind": "access",
            }),
            SECRET,
        );

        assert_eq!(
            verify_token(&token, TokenKind::Access, &keys),
            Err(TokenError::MissingClaims)
        );
    }

    #[test]
    fn test_missing_subject_claim() {
        let keys = test_keys();
        let token = sign_raw(
            serde_json::json!({
                "email": "a@x.com",
                "iat": 0,
                "exp": 9_999_999_999i64,
                "iss": "dashboard",
                "kind": "access",
            }),
            SECRET,
        );

        assert_eq!(
            verify_token(&token, TokenKind::Access, &keys),
            Err(TokenError::MissingClaims)
        );
    }

    #[test]
    fn test_missing_kind_claim() {
        let keys = test_keys();
        let token = sign_raw(
            serde_json::json!({
                "sub": "user-1",
                "email": "a@x.com",
                "iat": 0,
                "exp": 9_999_999_999i64,
                "iss": "dashboard",
            }),
            SECRET,
        );

        assert_eq!(
            verify_token(&token, TokenKind::Access, &keys),
            Err(TokenError::MissingClaims)
        );
    }

    #[test]
    fn test_wrong_issuer() {
        let keys = test_keys();
        let mut settings = JwtSettings::with_secret(SECRET);
        settings.issuer = "someone-else".to_string();
        let other = JwtKeys::from_settings(&settings).unwrap();

        let token = issue_access_token(&identity(), &other).unwrap();
        assert_eq!(
            verify_token(&token, TokenKind::Access, &keys),
            Err(TokenError::MissingClaims)
        );
    }

    #[test]
    fn test_refresh_token_rejected_as_access_with_shared_secret() {
        let keys = test_keys();
        let refresh = issue_refresh_token(&identity(), &keys).unwrap();
        let access = issue_access_token(&identity(), &keys).unwrap();

        assert_eq!(
            verify_token(&refresh, TokenKind::Access, &keys),
            Err(TokenError::WrongKind)
        );
        assert_eq!(
            verify_token(&access, TokenKind::Refresh, &keys),
            Err(TokenError::WrongKind)
        );
    }

    #[test]
    fn test_refresh_token_rejected_as_access_with_distinct_secrets() {
        let mut settings = JwtSettings::with_secret(SECRET);
        settings.refresh_secret = Some("refresh-only-secret-refresh-only-secret".to_string());
        let keys = JwtKeys::from_settings(&settings).unwrap();

        let refresh = issue_refresh_token(&identity(), &keys).unwrap();
        assert_eq!(
            verify_token(&refresh, TokenKind::Access, &keys),
            Err(TokenError::BadSignature)
        );
        assert!(verify_token(&refresh, TokenKind::Refresh, &keys).is_ok());
    }

    #[test]
    fn test_missing_access_secret_is_config_error() {
        for secret in [None, Some(""), Some("   ")] {
            let settings = JwtSettings {
                access_secret: secret.map(str::to_string),
                ..JwtSettings::default()
            };
            match JwtKeys::from_settings(&settings) {
                Err(ConfigError::MissingRequired(_)) => (),
                _ => panic!("Expected MissingRequired for {:?}", secret),
            }
        }
    }

    #[test]
    fn test_refresh_secret_falls_back_to_access_secret() {
        let keys = test_keys();
        let token = issue_refresh_token(&identity(), &keys).unwrap();

        // A verifier configured with the same secret for both kinds accepts it
        let explicit = JwtKeys::from_settings(&JwtSettings {
            refresh_secret: Some(SECRET.to_string()),
            ..JwtSettings::with_secret(SECRET)
        })
        .unwrap();
        assert!(verify_token(&token, TokenKind::Refresh, &explicit).is_ok());
    }

    #[test]
    fn test_non_positive_lifetime_is_rejected() {
        let settings = JwtSettings {
            access_token_expiry: 0,
            ..JwtSettings::with_secret(SECRET)
        };
        assert!(matches!(
            JwtKeys::from_settings(&settings),
            Err(ConfigError::InvalidValue(_))
        ));
    }
}
