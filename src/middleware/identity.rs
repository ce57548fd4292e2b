use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::auth::Identity;
use crate::error::{AppError, AuthError};

/// Handlers take `Identity` as an argument to require authentication.
///
/// The identity is placed in request extensions by `JwtMiddleware`; a
/// handler mounted outside the protected scope fails closed.
impl FromRequest for Identity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let identity = req.extensions().get::<Identity>().cloned();
        ready(identity.ok_or(AppError::Auth(AuthError::MissingToken)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[actix_web::test]
    async fn test_identity_from_extensions() {
        let req = TestRequest::default().to_http_request();
        req.extensions_mut().insert(Identity::new("u-1", "a@x.com"));

        let identity = Identity::extract(&req).await.unwrap();
        assert_eq!(identity.user_id, "u-1");
    }

    #[actix_web::test]
    async fn test_missing_identity_is_unauthorized() {
        let req = TestRequest::default().to_http_request();

        let result = Identity::extract(&req).await;
        assert!(matches!(result, Err(AppError::Auth(AuthError::MissingToken))));
    }
}
