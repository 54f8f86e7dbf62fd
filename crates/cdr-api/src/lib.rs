//! API layer for CDR ingest
//!
//! HTTP handlers for call record CRUD, bulk CSV upload, and token issuance.

#![forbid(unsafe_code)]

pub mod dto;
pub mod handlers;

pub use dto::{ApiResponse, PaginationParams};
pub use handlers::{configure, json_config, query_config, AppState};
