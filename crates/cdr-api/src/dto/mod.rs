//! Data Transfer Objects (DTOs) for API requests and responses

pub mod auth;
pub mod call_record;
pub mod common;

pub use auth::*;
pub use call_record::*;
pub use common::*;
