//! Accounts that may call the API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What an account is allowed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Read, create, update and import records
    #[default]
    Operator,
    /// Operator rights plus deletion
    Admin,
}

impl UserRole {
    pub const ALL: [UserRole; 2] = [UserRole::Operator, UserRole::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Operator => "operator",
            UserRole::Admin => "admin",
        }
    }

    /// Roles stored by hand may carry any casing
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
    }

    pub fn is_admin(&self) -> bool {
        *self == UserRole::Admin
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored account
///
/// `password_hash` is a PHC string and is skipped when serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    /// Disabled accounts keep their rows but cannot obtain tokens
    pub active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn can_login(&self) -> bool {
        self.active
    }

    pub fn can_admin(&self) -> bool {
        self.can_login() && self.role.is_admin()
    }
}

impl Default for User {
    fn default() -> Self {
        let created_at = Utc::now();
        Self {
            id: 0,
            username: String::new(),
            password_hash: String::new(),
            role: UserRole::default(),
            active: true,
            last_login: None,
            created_at,
            updated_at: created_at,
        }
    }
}

/// The public face of a [`User`], returned after login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i32,
    pub username: String,
    pub role: UserRole,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
            last_login: user.last_login,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_ignores_case() {
        assert_eq!(UserRole::parse("Admin"), Some(UserRole::Admin));
        assert_eq!(UserRole::parse(" operator "), Some(UserRole::Operator));
        assert_eq!(UserRole::parse("root"), None);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_value(UserRole::Admin).unwrap(), "admin");
        assert_eq!(UserRole::Operator.to_string(), "operator");
    }

    #[test]
    fn test_disabled_admin_cannot_act() {
        let admin = User {
            role: UserRole::Admin,
            ..Default::default()
        };
        assert!(admin.can_admin());

        let disabled = User {
            active: false,
            ..admin
        };
        assert!(!disabled.can_login());
        assert!(!disabled.can_admin());
    }

    #[test]
    fn test_user_info_omits_hash() {
        let user = User {
            id: 7,
            username: "ops".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            ..Default::default()
        };

        let json = serde_json::to_value(UserInfo::from(&user)).unwrap();
        assert_eq!(json["username"], "ops");
        assert_eq!(json["role"], "operator");
        assert!(json.get("password_hash").is_none());
    }
}
