//! Password hashing and verification using Argon2id

use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use cdr_core::error::AppError;
use rand_core::OsRng;
use tracing::{debug, error};

/// Argon2id hasher for user passwords
#[derive(Debug, Clone, Default)]
pub struct PasswordService {
    argon2: Argon2<'static>,
}

impl PasswordService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash a password into a PHC string with a fresh random salt
    pub fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                error!(error = %e, "Failed to hash password");
                AppError::PasswordHash(format!("Password hashing failed: {}", e))
            })
    }

    /// Check `password` against a stored PHC hash
    ///
    /// A wrong password is `Ok(false)`; only a malformed hash is an error.
    ///
    /// ```
    /// use cdr_auth::PasswordService;
    ///
    /// let passwords = PasswordService::new();
    /// let hash = passwords.hash_password("my_password")?;
    /// assert!(passwords.verify_password("my_password", &hash)?);
    /// assert!(!passwords.verify_password("wrong_password", &hash)?);
    /// # Ok::<(), cdr_core::error::AppError>(())
    /// ```
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "Failed to parse password hash");
            AppError::PasswordHash(format!("Invalid password hash format: {}", e))
        })?;

        match self.argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => {
                debug!("Password mismatch");
                Ok(false)
            }
            Err(e) => {
                error!(error = %e, "Password verification error");
                Err(AppError::PasswordHash(format!(
                    "Password verification failed: {}",
                    e
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_phc_argon2() {
        let hash = PasswordService::new().hash_password("test_password").unwrap();
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_verify_roundtrip() {
        let service = PasswordService::new();
        let hash = service.hash_password("change-me").unwrap();

        assert!(service.verify_password("change-me", &hash).unwrap());
        assert!(!service.verify_password("Change-me", &hash).unwrap());
        assert!(!service.verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let service = PasswordService::new();
        let first = service.hash_password("same").unwrap();
        let second = service.hash_password("same").unwrap();

        assert_ne!(first, second);
        assert!(service.verify_password("same", &second).unwrap());
    }

    #[test]
    fn test_invalid_hash_format() {
        let result = PasswordService::new().verify_password("password", "not_a_valid_hash");
        assert!(matches!(result, Err(AppError::PasswordHash(_))));
    }
}
