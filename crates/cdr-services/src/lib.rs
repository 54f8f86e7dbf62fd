//! Business logic services for CDR ingest
//!
//! Services sit between the HTTP handlers and the storage traits:
//!
//! - `CdrImporter` - bulk CSV import with per-line failure reporting
//! - `CallRecordService` - validated create/replace/patch/delete
//! - `UserService` - credential checks and bootstrap admin provisioning
//!
//! Services hold their stores behind `Arc<dyn Trait>` so the same code runs
//! against PostgreSQL and the in-memory stores.

pub mod call_records;
pub mod importer;
pub mod users;

pub use call_records::CallRecordService;
pub use importer::{import_csv, CdrImporter, ImportFailureKind, ImportSummary, LineFailure};
pub use users::UserService;
