//! User service
//!
//! Credential checks for the token endpoint and start-up provisioning of the
//! bootstrap admin.

use cdr_auth::PasswordService;
use cdr_core::{
    models::{User, UserRole},
    traits::{NewUser, UserRepository},
    AppError, AppResult,
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    passwords: PasswordService,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, passwords: PasswordService) -> Self {
        Self { users, passwords }
    }

    /// Check a username/password pair
    ///
    /// Unknown users, inactive users and wrong passwords all yield
    /// [`AppError::InvalidCredentials`].
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<User> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| {
                info!("Login failed: user not found");
                AppError::InvalidCredentials
            })?;

        if !user.can_login() {
            warn!("Login failed: user is inactive");
            return Err(AppError::InvalidCredentials);
        }

        let valid = self
            .passwords
            .verify_password(password, &user.password_hash)
            .map_err(|e| {
                error!("Password verification error: {}", e);
                AppError::Internal("Password verification failed".to_string())
            })?;

        if !valid {
            info!("Login failed: invalid password");
            return Err(AppError::InvalidCredentials);
        }

        if let Err(e) = self.users.update_last_login(user.id).await {
            warn!("Failed to update last login for user {}: {}", user.id, e);
        }

        Ok(user)
    }

    /// Create an admin account unless `username` already exists
    ///
    /// Returns `true` when a user was created.
    #[instrument(skip(self, password))]
    pub async fn ensure_admin(&self, username: &str, password: &str) -> AppResult<bool> {
        if self.users.find_by_username(username).await?.is_some() {
            return Ok(false);
        }

        let password_hash = self.passwords.hash_password(password)?;
        match self
            .users
            .create(&NewUser {
                username: username.to_string(),
                password_hash,
                role: UserRole::Admin,
            })
            .await
        {
            Ok(_) => {
                info!("Bootstrap admin created");
                Ok(true)
            }
            // another instance won the race
            Err(AppError::AlreadyExists(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdr_db::InMemoryUserRepository;

    fn service() -> UserService {
        UserService::new(
            Arc::new(InMemoryUserRepository::new()),
            PasswordService::new(),
        )
    }

    #[tokio::test]
    async fn test_bootstrap_then_login() {
        let service = service();
        assert!(service.ensure_admin("admin", "s3cret").await.unwrap());
        assert!(!service.ensure_admin("admin", "other").await.unwrap());

        let user = service.authenticate("admin", "s3cret").await.unwrap();
        assert_eq!(user.role, UserRole::Admin);
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let service = service();
        service.ensure_admin("admin", "s3cret").await.unwrap();

        assert!(matches!(
            service.authenticate("admin", "wrong").await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            service.authenticate("nobody", "s3cret").await,
            Err(AppError::InvalidCredentials)
        ));
    }
}
