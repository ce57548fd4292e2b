/// Login and refresh-token rotation
///
/// Each user has one refresh token slot. Starting a session overwrites
/// it, so a refresh token stays usable only while it is the latest one
/// issued. A session is not handed out until that write has succeeded.

use serde::{Deserialize, Serialize};

use crate::auth::claims::{Identity, TokenKind};
use crate::auth::jwt::{issue_access_token, issue_refresh_token, verify_token, JwtKeys};
use crate::auth::password::{verify_against_dummy, verify_password};
use crate::error::{AppError, AuthError, ValidationError};
use crate::store::{UserProfile, UserRecord, UserStore};
use crate::validators::normalize_email;

/// Tokens and profile returned by login and refresh
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub user: UserProfile,
}

/// Check an email/password pair and open a session
///
/// Unknown email and wrong password fail identically with
/// `InvalidCredentials`, and neither touches the refresh token slot.
pub async fn login<S>(
    store: &S,
    keys: &JwtKeys,
    email: &str,
    password: &str,
) -> Result<SessionTokens, AppError>
where
    S: UserStore + ?Sized,
{
    let email = normalize_email(email)?;
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password".to_string()).into());
    }

    let user = match store.get_user_by_email(&email).await? {
        Some(user) => user,
        None => {
            verify_against_dummy(password);
            return Err(AuthError::InvalidCredentials.into());
        }
    };

    if !verify_password(password, &user.password_hash) {
        return Err(AuthError::InvalidCredentials.into());
    }

    let tokens = start_session(store, keys, &user).await?;
    tracing::info!(user_id = %user.id, "User logged in");
    Ok(tokens)
}

/// Exchange the current refresh token for a new token pair
///
/// The presented token must verify as a refresh token and still be the
/// one stored for its user; a superseded token is rejected even while
/// its signature is valid.
pub async fn refresh_session<S>(
    store: &S,
    keys: &JwtKeys,
    presented: &str,
) -> Result<SessionTokens, AppError>
where
    S: UserStore + ?Sized,
{
    let identity = verify_token(presented, TokenKind::Refresh, keys)?;

    let user = store
        .get_user_by_id(&identity.user_id)
        .await?
        .ok_or(AuthError::StaleRefreshToken)?;

    if user.refresh_token.as_deref() != Some(presented) {
        tracing::warn!(user_id = %user.id, "Superseded refresh token presented");
        return Err(AuthError::StaleRefreshToken.into());
    }

    let tokens = start_session(store, keys, &user).await?;
    tracing::info!(user_id = %user.id, "Session refreshed");
    Ok(tokens)
}

/// Issue an access/refresh pair for `user` and persist the refresh token
pub async fn start_session<S>(
    store: &S,
    keys: &JwtKeys,
    user: &UserRecord,
) -> Result<SessionTokens, AppError>
where
    S: UserStore + ?Sized,
{
    let identity = Identity::new(user.id.clone(), user.email.clone());
    let access_token = issue_access_token(&identity, keys)?;
    let refresh_token = rotate_refresh_token(store, keys, &identity).await?;

    Ok(SessionTokens {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: keys.access_token_expiry(),
        user: UserProfile::from(user),
    })
}

/// Mint a refresh token and make it the user's current one
pub async fn rotate_refresh_token<S>(
    store: &S,
    keys: &JwtKeys,
    identity: &Identity,
) -> Result<String, AppError>
where
    S: UserStore + ?Sized,
{
    let refresh_token = issue_refresh_token(identity, keys)?;
    store
        .update_user_refresh_token(&identity.user_id, &refresh_token)
        .await?;
    Ok(refresh_token)
}
