//! PostgreSQL user accounts

use super::is_unique_violation;
use async_trait::async_trait;
use cdr_core::{
    models::{User, UserRole},
    traits::{NewUser, UserRepository},
    AppError, AppResult,
};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};
use tracing::{debug, error, instrument, warn};

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_by<T>(&self, column: &str, value: T) -> AppResult<Option<User>>
    where
        T: for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Send,
    {
        let query = format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, column);

        sqlx::query_as::<Postgres, UserRow>(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.map(User::from))
            .map_err(|e| {
                error!("Database error looking up user by {}: {}", column, e);
                AppError::Database(format!("Failed to find user: {}", e))
            })
    }
}

const USER_COLUMNS: &str =
    "id, username, password_hash, role, active, last_login, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    username: String,
    password_hash: String,
    role: String,
    active: bool,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Unknown roles are downgraded rather than locking the account out
fn parse_role(raw: &str) -> UserRole {
    UserRole::parse(raw).unwrap_or_else(|| {
        warn!(role = raw, "Unknown role, treating as operator");
        UserRole::Operator
    })
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            role: parse_role(&row.role),
            username: row.username,
            password_hash: row.password_hash,
            active: row.active,
            last_login: row.last_login,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i32) -> AppResult<Option<User>> {
        self.fetch_one_by("id", id).await
    }

    #[instrument(skip(self))]
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        self.fetch_one_by("username", username).await
    }

    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn create(&self, user: &NewUser) -> AppResult<User> {
        debug!("Creating user");

        let query = format!(
            "INSERT INTO users (username, password_hash, role) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<Postgres, UserRow>(&query)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(user.role.to_string())
            .fetch_one(&self.pool)
            .await
            .map(User::from)
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::AlreadyExists(format!("User {} already exists", user.username))
                } else {
                    error!("Database error creating user: {}", e);
                    AppError::Database(format!("Failed to create user: {}", e))
                }
            })
    }

    #[instrument(skip(self))]
    async fn update_last_login(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("UPDATE users SET last_login = NOW(), updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error updating last login for user {}: {}", id, e);
                AppError::Database(format!("Failed to update last login: {}", e))
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::UserNotFound(id.to_string()));
        }
        Ok(())
    }
}
