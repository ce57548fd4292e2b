/// Authentication Routes
///
/// Login, token refresh, and the current user's profile.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::auth::{self, hash_password, verify_password, Identity, JwtKeys};
use crate::error::{AppError, AuthError, ErrorContext, ValidationError};
use crate::store::{Store, UserProfile, UserStore, UserUpdate};
use crate::validators::validate_name;

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token refresh request
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Profile update request; omitted fields are left unchanged
#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// POST /auth/login
///
/// Authenticate with email and password. Returns an access token, a
/// refresh token, and the user's profile.
///
/// # Errors
/// - 400: Validation error (empty or malformed email, empty password)
/// - 401: Invalid credentials (email not found or wrong password)
/// - 503: Storage unavailable; no tokens are returned
pub async fn login(
    form: web::Json<LoginRequest>,
    store: web::Data<dyn Store>,
    keys: web::Data<JwtKeys>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    let session = auth::login(store.get_ref(), keys.get_ref(), &form.email, &form.password)
        .await
        .map_err(|e| {
            context.log_error(&e);
            e
        })?;

    Ok(HttpResponse::Ok().json(session))
}

/// POST /auth/refresh
///
/// Exchange the current refresh token for a new pair. The presented
/// token is superseded by the new one.
///
/// # Errors
/// - 401: Invalid, expired, or superseded refresh token
/// - 503: Storage unavailable
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    store: web::Data<dyn Store>,
    keys: web::Data<JwtKeys>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");

    let session = auth::refresh_session(store.get_ref(), keys.get_ref(), &form.refresh_token)
        .await
        .map_err(|e| {
            context.log_error(&e);
            e
        })?;

    Ok(HttpResponse::Ok().json(session))
}

/// GET /api/me
///
/// Current user's profile. **Requires** `Authorization: Bearer <access_token>`.
pub async fn get_current_user(
    identity: Identity,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, AppError> {
    let user = store
        .get_user_by_id(&identity.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

    Ok(HttpResponse::Ok().json(UserProfile::from(&user)))
}

/// PATCH /api/me
///
/// Change the display name and/or password. A password change requires
/// the current password.
///
/// # Errors
/// - 400: Validation error (bad name, weak new password, missing current password)
/// - 401: Current password is wrong
pub async fn update_current_user(
    identity: Identity,
    form: web::Json<UpdateUserRequest>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("update_user").with_user_id(identity.user_id.clone());
    let form = form.into_inner();

    let name = form
        .name
        .as_deref()
        .map(|n| validate_name("name", n))
        .transpose()?;

    let password_hash = match form.new_password {
        None => None,
        Some(new_password) => {
            let current = form
                .current_password
                .filter(|p| !p.is_empty())
                .ok_or_else(|| ValidationError::EmptyField("current_password".to_string()))?;

            let user = store
                .get_user_by_id(&identity.user_id)
                .await?
                .ok_or_else(|| AppError::NotFound("User".to_string()))?;

            if !verify_password(&current, &user.password_hash) {
                let err = AppError::Auth(AuthError::InvalidCredentials);
                context.log_error(&err);
                return Err(err);
            }

            Some(hash_password(&new_password)?)
        }
    };

    let updated = store
        .update_user(&identity.user_id, UserUpdate { name, password_hash })
        .await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %identity.user_id,
        "User profile updated"
    );

    Ok(HttpResponse::Ok().json(UserProfile::from(&updated)))
}
