/// HTTP middleware
pub mod jwt_auth;

pub use jwt_auth::{authorization_header, AuthenticatedUser, JwtAuthMiddleware};
