//! Authentication for CDR ingest
//!
//! HS256 access tokens, Argon2id password hashes, and actix-web extractors
//! that gate routes on a valid token or the admin role.
//!
//! ```no_run
//! use actix_web::HttpResponse;
//! use cdr_auth::{AdminUser, AuthenticatedUser};
//!
//! async fn list_records(user: AuthenticatedUser) -> HttpResponse {
//!     HttpResponse::Ok().body(user.username)
//! }
//!
//! async fn delete_record(_admin: AdminUser) -> HttpResponse {
//!     HttpResponse::NoContent().finish()
//! }
//! ```

pub mod claims;
pub mod jwt;
pub mod middleware;
pub mod password;

pub use claims::Claims;
pub use jwt::JwtService;
pub use middleware::{AdminUser, AuthenticatedUser, TOKEN_COOKIE};
pub use password::PasswordService;
