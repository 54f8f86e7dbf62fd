//! CDR Ingest Database Layer
//!
//! This crate provides the storage adapters behind the `cdr-core` traits:
//!
//! - Connection pool management and migrations with sqlx
//! - PostgreSQL repositories for call records and users
//! - In-memory stores for tests and database-less deployments

pub mod memory;
pub mod pool;
pub mod repositories;

pub use memory::{InMemoryCallRecordStore, InMemoryUserRepository};
pub use pool::{create_pool, run_migrations};
pub use repositories::*;

// Re-export commonly used types
pub use cdr_core::{AppError, AppResult};
pub use sqlx::PgPool;
