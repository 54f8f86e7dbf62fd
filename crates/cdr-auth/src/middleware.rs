//! Actix-web extractors for authenticated callers
//!
//! Rejections go through [`AppError`], so clients get the same JSON error
//! body as for every other failure.

use crate::jwt::JwtService;
use crate::Claims;
use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use cdr_core::error::AppError;
use cdr_core::models::UserRole;
use futures::future::{ready, Ready};
use std::ops::Deref;
use std::sync::Arc;
use tracing::{debug, warn};

/// Cookie the token endpoint sets and the extractors fall back to
pub const TOKEN_COOKIE: &str = "token";

/// Bearer token from `Authorization`, falling back to the `token` cookie
fn bearer_token(req: &HttpRequest) -> Option<String> {
    let from_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_owned());

    from_header.or_else(|| req.cookie(TOKEN_COOKIE).map(|c| c.value().to_owned()))
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
    let jwt = req.app_data::<web::Data<Arc<JwtService>>>().ok_or_else(|| {
        warn!("JwtService missing from app data");
        AppError::Internal("Authentication service not configured".to_owned())
    })?;

    let token = bearer_token(req)
        .ok_or_else(|| AppError::InvalidToken("No authentication token provided".to_owned()))?;

    let claims = jwt.validate_token(&token)?;
    Ok(AuthenticatedUser {
        username: claims.sub.clone(),
        claims,
    })
}

/// Any caller holding a valid access token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub username: String,
    pub claims: Claims,
}

impl AuthenticatedUser {
    pub fn role(&self) -> UserRole {
        self.claims.role
    }

    pub fn is_admin(&self) -> bool {
        self.claims.is_admin()
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = authenticate(req).inspect(|user| {
            debug!(username = %user.username, role = %user.role(), "Caller authenticated");
        });
        ready(result.map_err(Into::into))
    }
}

/// Caller with the admin role; everyone else gets 403
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

impl Deref for AdminUser {
    type Target = AuthenticatedUser;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for AdminUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = authenticate(req).and_then(|user| {
            if user.is_admin() {
                Ok(AdminUser(user))
            } else {
                warn!(username = %user.username, role = %user.role(), "Admin route refused");
                Err(AppError::Forbidden)
            }
        });
        ready(result.map_err(Into::into))
    }
}
