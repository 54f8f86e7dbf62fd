//! Token endpoint

use crate::dto::auth::{LoginRequest, LoginResponse};
use crate::dto::ApiResponse;
use actix_web::{
    cookie::{time::Duration, Cookie, SameSite},
    web, HttpResponse,
};
use cdr_auth::{JwtService, TOKEN_COOKIE};
use cdr_core::{models::UserInfo, AppError};
use cdr_services::UserService;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

/// POST /api/token
///
/// Exchanges credentials for a JWT. The token is returned in the body and also
/// set as an HTTP-only cookie for browser clients.
#[instrument(skip_all, fields(username = %body.username.trim()))]
pub async fn login(
    users: web::Data<UserService>,
    jwt: web::Data<Arc<JwtService>>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;

    let user = users
        .authenticate(body.username.trim(), &body.password)
        .await?;

    let ttl = jwt.expiration_secs();
    let token = jwt.create_token_for_user(&user.username, user.role)?;
    info!(role = %user.role, "Issued access token");

    let cookie = Cookie::build(TOKEN_COOKIE, token.clone())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(ttl))
        .finish();

    let payload = LoginResponse::bearer(token, ttl, UserInfo::from(&user));
    Ok(HttpResponse::Ok()
        .cookie(cookie)
        .json(ApiResponse::success(payload)))
}
