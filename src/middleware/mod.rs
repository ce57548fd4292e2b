/// Middleware module
///
/// Bearer authentication for the protected scope and the `Identity`
/// extractor handlers use to receive the caller.

mod identity;
mod jwt_middleware;

pub use jwt_middleware::JwtMiddleware;
