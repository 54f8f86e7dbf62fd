//! Domain models for CDR ingest

pub mod call_record;
pub mod user;

pub use call_record::{CallRecord, CallStatus, CallType, PhoneNumber, StoredCallRecord};
pub use user::{User, UserInfo, UserRole};
