/// Authentication module
///
/// Password verification, JWT issuance/verification, bearer header
/// authentication, and the login/refresh session flow.

mod bearer;
mod claims;
mod jwt;
mod password;
mod session;

pub use bearer::{authenticate, BEARER_PREFIX};
pub use claims::{Claims, Identity, TokenKind};
pub use jwt::{
    issue_access_token, issue_refresh_token, issue_token_at, verify_token, verify_token_at,
    JwtKeys, TokenError,
};
pub use password::{hash_password, validate_password_strength, verify_password};
pub use session::{login, refresh_session, rotate_refresh_token, start_session, SessionTokens};
