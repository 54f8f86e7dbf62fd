//! Access token claims

use cdr_core::models::UserRole;
use chrono::{TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Payload of an access token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Username
    pub sub: String,
    pub role: UserRole,
    /// Issued at, Unix seconds
    pub iat: i64,
    /// Expiry, Unix seconds; 0 means "let the signer decide"
    pub exp: i64,
}

impl Claims {
    /// Claims without an expiry; [`crate::JwtService`] applies its own TTL
    ///
    /// ```
    /// use cdr_auth::Claims;
    /// use cdr_core::models::UserRole;
    ///
    /// let claims = Claims::new("admin", UserRole::Admin);
    /// assert_eq!(claims.username(), "admin");
    /// assert!(claims.is_admin());
    /// assert_eq!(claims.exp, 0);
    /// ```
    pub fn new(username: &str, role: UserRole) -> Self {
        Self {
            sub: username.to_owned(),
            role,
            iat: Utc::now().timestamp(),
            exp: 0,
        }
    }

    /// Claims that expire `ttl_secs` after now (negative values are already expired)
    pub fn with_expiration(username: &str, role: UserRole, ttl_secs: i64) -> Self {
        let mut claims = Self::new(username, role);
        claims.exp = claims.iat + ttl_secs;
        claims
    }

    pub(crate) fn expire_in(&mut self, ttl: TimeDelta) {
        self.exp = (Utc::now() + ttl).timestamp();
    }

    pub fn is_expired(&self) -> bool {
        self.exp <= Utc::now().timestamp()
    }

    pub fn username(&self) -> &str {
        &self.sub
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_claims() {
        let claims = Claims::new("op", UserRole::Operator);
        assert_eq!(claims.username(), "op");
        assert!(claims.iat > 0);
        assert!(!claims.is_admin());
        // unsigned claims have no expiry yet
        assert!(claims.is_expired());
    }

    #[test]
    fn test_ttl() {
        let live = Claims::with_expiration("admin", UserRole::Admin, 60);
        assert_eq!(live.exp - live.iat, 60);
        assert!(!live.is_expired());

        let stale = Claims::with_expiration("admin", UserRole::Admin, -1);
        assert!(stale.is_expired());
    }
}
