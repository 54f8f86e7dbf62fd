//! Repository implementations
//!
//! Concrete implementations of the repository traits defined in cdr-core,
//! using sqlx for PostgreSQL access.

pub mod call_record_repo;
pub mod user_repo;

pub use call_record_repo::PgCallRecordRepository;
pub use user_repo::PgUserRepository;

/// PostgreSQL SQLSTATE for unique constraint violations
const UNIQUE_VIOLATION: &str = "23505";

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION)
}
