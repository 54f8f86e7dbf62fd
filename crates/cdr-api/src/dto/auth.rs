//! Token endpoint payloads

use cdr_core::models::UserInfo;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const TOKEN_TYPE: &str = "Bearer";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 150, message = "username must not be empty"))]
    pub username: String,

    #[validate(length(min = 1, message = "password must not be empty"))]
    pub password: String,
}

/// Issued token plus the account it belongs to
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Seconds until `access_token` stops validating
    pub expires_in: i64,
    pub user: UserInfo,
}

impl LoginResponse {
    pub fn bearer(access_token: String, expires_in: i64, user: UserInfo) -> Self {
        Self {
            access_token,
            token_type: TOKEN_TYPE,
            expires_in,
            user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdr_core::models::UserRole;

    #[test]
    fn test_blank_credentials_rejected() {
        let blank = LoginRequest {
            username: String::new(),
            password: String::new(),
        };
        let errors = blank.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("password"));

        let filled = LoginRequest {
            username: "ops".into(),
            password: "s3cret".into(),
        };
        assert!(filled.validate().is_ok());
    }

    #[test]
    fn test_bearer_response_shape() {
        let user = UserInfo {
            id: 2,
            username: "ops".into(),
            role: UserRole::Admin,
            last_login: None,
        };

        let json = serde_json::to_value(LoginResponse::bearer("abc".into(), 900, user)).unwrap();
        assert_eq!(json["token_type"], "Bearer");
        assert_eq!(json["expires_in"], 900);
        assert_eq!(json["user"]["role"], "admin");
    }
}
