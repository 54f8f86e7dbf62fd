//! HS256 access tokens

use crate::claims::Claims;
use cdr_core::error::AppError;
use cdr_core::models::UserRole;
use chrono::TimeDelta;
use jsonwebtoken::{errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use std::fmt;
use tracing::{debug, error, warn};

/// Signs and verifies access tokens with a shared secret
#[derive(Clone)]
pub struct JwtService {
    ttl: TimeDelta,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtService {
    /// ```
    /// use cdr_auth::JwtService;
    ///
    /// let jwt = JwtService::new("my-secret-key", 3600);
    /// assert_eq!(jwt.expiration_secs(), 3600);
    /// ```
    pub fn new(secret: &str, expiration_secs: i64) -> Self {
        let mut validation = Validation::default();
        // expiry is exact; a stale token is never accepted
        validation.leeway = 0;

        Self {
            ttl: TimeDelta::seconds(expiration_secs),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Token lifetime in seconds
    pub fn expiration_secs(&self) -> i64 {
        self.ttl.num_seconds()
    }

    /// Sign `claims`; an unset `exp` gets the configured lifetime
    pub fn create_token(&self, claims: &Claims) -> Result<String, AppError> {
        let mut claims = claims.clone();
        if claims.exp == 0 {
            claims.expire_in(self.ttl);
        }

        debug!(username = %claims.sub, exp = claims.exp, "Signing access token");

        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            error!(error = %e, "Failed to sign access token");
            AppError::Internal(format!("Token creation failed: {}", e))
        })
    }

    pub fn create_token_for_user(&self, username: &str, role: UserRole) -> Result<String, AppError> {
        self.create_token(&Claims::new(username, role))
    }

    /// Verify signature and expiry
    ///
    /// Expired tokens yield [`AppError::TokenExpired`]; anything else that
    /// fails to verify is [`AppError::InvalidToken`].
    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AppError::TokenExpired,
                _ => AppError::InvalidToken(e.to_string()),
            })
            .inspect_err(|e| warn!(error = %e, "Rejected access token"))?;

        debug!(username = %claims.sub, role = %claims.role, "Access token accepted");
        Ok(claims)
    }
}

impl fmt::Debug for JwtService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtService")
            .field("ttl_secs", &self.ttl.num_seconds())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-for-jwt-testing-12345";

    #[test]
    fn test_round_trip_keeps_identity() {
        let jwt = JwtService::new(SECRET, 3600);
        let token = jwt.create_token_for_user("ops", UserRole::Admin).unwrap();

        let claims = jwt.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "ops");
        assert_eq!(claims.role, UserRole::Admin);

        let now = chrono::Utc::now().timestamp();
        assert!(claims.exp > now && claims.exp <= now + 3600);
    }

    #[test]
    fn test_expired_token_is_distinguished() {
        let jwt = JwtService::new(SECRET, 3600);
        let token = jwt
            .create_token(&Claims::with_expiration("ops", UserRole::Operator, -10))
            .unwrap();

        assert!(matches!(jwt.validate_token(&token), Err(AppError::TokenExpired)));
    }

    #[test]
    fn test_foreign_or_garbage_tokens() {
        let ours = JwtService::new("secret-a", 3600);
        let theirs = JwtService::new("secret-b", 3600);
        let token = theirs
            .create_token_for_user("ops", UserRole::Operator)
            .unwrap();

        assert!(matches!(ours.validate_token(&token), Err(AppError::InvalidToken(_))));
        assert!(matches!(ours.validate_token("not-a-jwt"), Err(AppError::InvalidToken(_))));
    }

    #[test]
    fn test_debug_hides_keys() {
        let rendered = format!("{:?}", JwtService::new(SECRET, 60));
        assert!(rendered.contains("ttl_secs: 60"));
        assert!(!rendered.contains(SECRET));
    }
}
