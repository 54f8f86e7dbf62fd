//! Common traits for repositories
//!
//! Defines the storage abstractions the importer and HTTP layer depend on.

use crate::error::AppError;
use crate::models::{CallRecord, CallStatus, StoredCallRecord, User, UserRole};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Filters for listing call records; every field is optional and they combine with AND
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallRecordFilter {
    /// Records starting at or after this instant
    pub start_time: Option<DateTime<Utc>>,
    /// Records ending at or before this instant
    pub end_time: Option<DateTime<Utc>>,
    pub calling_number: Option<String>,
    pub called_number: Option<String>,
    pub call_status: Option<CallStatus>,
}

impl CallRecordFilter {
    /// Check a record against the filter
    pub fn matches(&self, record: &CallRecord) -> bool {
        self.start_time.map_or(true, |t| record.start_time >= t)
            && self.end_time.map_or(true, |t| record.end_time <= t)
            && self
                .calling_number
                .as_deref()
                .map_or(true, |n| record.calling_number.as_str() == n)
            && self
                .called_number
                .as_deref()
                .map_or(true, |n| record.called_number.as_str() == n)
            && self.call_status.map_or(true, |s| record.call_status == s)
    }
}

/// Storage adapter for call records
///
/// Implementations enforce `call_id` uniqueness and return
/// [`AppError::AlreadyExists`] on a clash.
#[async_trait]
pub trait CallRecordStore: Send + Sync {
    /// Persist a validated record
    async fn create(&self, record: &CallRecord) -> Result<StoredCallRecord, AppError>;

    /// Find record by store-assigned ID
    async fn find_by_id(&self, id: i64) -> Result<Option<StoredCallRecord>, AppError>;

    /// Find record by its call identifier
    async fn find_by_call_id(&self, call_id: &str) -> Result<Option<StoredCallRecord>, AppError>;

    /// List matching records, newest start first, with the total match count
    async fn query(
        &self,
        filter: &CallRecordFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<StoredCallRecord>, i64), AppError>;

    /// Replace every field of an existing record
    async fn update(&self, id: i64, record: &CallRecord) -> Result<StoredCallRecord, AppError>;

    /// Delete a record; [`AppError::RecordNotFound`] if it does not exist
    async fn delete(&self, id: i64) -> Result<(), AppError>;
}

/// User account data for creation
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: UserRole,
}

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by ID
    async fn find_by_id(&self, id: i32) -> Result<Option<User>, AppError>;

    /// Find user by username
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Create a new user
    async fn create(&self, user: &NewUser) -> Result<User, AppError>;

    /// Update last login timestamp
    async fn update_last_login(&self, id: i32) -> Result<(), AppError>;
}

/// Pagination parameters
#[derive(Debug, Clone, Default)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 1000),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize)]
pub struct PaginationMeta {
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl PaginationMeta {
    pub fn new(total: i64, page: i64, per_page: i64) -> Self {
        let total_pages = if per_page > 0 {
            (total + per_page - 1) / per_page
        } else {
            0
        };

        Self {
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CallType, PhoneNumber};
    use chrono::TimeZone;

    fn record() -> CallRecord {
        CallRecord {
            call_id: "A1".to_string(),
            calling_number: PhoneNumber::new_unchecked("+11234567890"),
            called_number: PhoneNumber::new_unchecked("+10987654321"),
            start_time: Utc.with_ymd_and_hms(2023, 11, 20, 22, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2023, 11, 20, 22, 10, 0).unwrap(),
            duration: 600,
            call_status: CallStatus::Success,
            call_type: CallType::Outgoing,
        }
    }

    #[test]
    fn test_pagination() {
        let p = Pagination::new(1, 10);
        assert_eq!(p.offset(), 0);
        assert_eq!(p.limit(), 10);

        let p = Pagination::new(3, 20);
        assert_eq!(p.offset(), 40);
        assert_eq!(p.limit(), 20);
    }

    #[test]
    fn test_pagination_bounds() {
        let p = Pagination::new(0, 10); // page 0 becomes 1
        assert_eq!(p.page, 1);

        let p = Pagination::new(1, 2000); // per_page capped at 1000
        assert_eq!(p.per_page, 1000);

        let p = Pagination::new(i64::MAX, 50);
        assert_eq!(p.offset(), i64::MAX);
    }

    #[test]
    fn test_pagination_meta() {
        let meta = PaginationMeta::new(95, 1, 10);
        assert_eq!(meta.total_pages, 10);

        let meta = PaginationMeta::new(101, 1, 10);
        assert_eq!(meta.total_pages, 11);
    }

    #[test]
    fn test_filter_bounds_apply_independently() {
        let r = record();

        let only_start = CallRecordFilter {
            start_time: Some(Utc.with_ymd_and_hms(2023, 11, 20, 21, 0, 0).unwrap()),
            ..Default::default()
        };
        assert!(only_start.matches(&r));

        let only_end = CallRecordFilter {
            end_time: Some(Utc.with_ymd_and_hms(2023, 11, 20, 22, 5, 0).unwrap()),
            ..Default::default()
        };
        assert!(!only_end.matches(&r));

        assert!(CallRecordFilter::default().matches(&r));
    }

    #[test]
    fn test_filter_exact_matches() {
        let r = record();

        let by_number = CallRecordFilter {
            calling_number: Some("+11234567890".to_string()),
            call_status: Some(CallStatus::Success),
            ..Default::default()
        };
        assert!(by_number.matches(&r));

        let wrong_status = CallRecordFilter {
            call_status: Some(CallStatus::Rejected),
            ..Default::default()
        };
        assert!(!wrong_status.matches(&r));

        let prefix_only = CallRecordFilter {
            called_number: Some("+1098".to_string()),
            ..Default::default()
        };
        assert!(!prefix_only.matches(&r));
    }
}
