//! CDR Ingest Core Library
//!
//! This crate provides the foundational types, validation rules, traits, and
//! error handling for the CDR ingest system. It includes:
//!
//! - Domain models (CallRecord, CallStatus, CallType, User)
//! - Pure validation of candidate call detail records
//! - Storage traits implemented by the database layer
//! - Unified error handling with HTTP response mapping
//! - Application configuration

pub mod config;
pub mod error;
pub mod models;
pub mod traits;
pub mod validation;

pub use config::AppConfig;
pub use error::AppError;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
