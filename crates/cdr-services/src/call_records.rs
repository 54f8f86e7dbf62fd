//! Call record service
//!
//! Runs every write through the validator before it reaches the store, so no
//! partially valid record is ever persisted.

use cdr_core::{
    models::StoredCallRecord,
    traits::{CallRecordFilter, CallRecordStore, Pagination},
    validation::{self, CandidateRecord},
    AppError, AppResult,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Validated CRUD over a [`CallRecordStore`]
#[derive(Clone)]
pub struct CallRecordService {
    store: Arc<dyn CallRecordStore>,
}

impl CallRecordService {
    pub fn new(store: Arc<dyn CallRecordStore>) -> Self {
        Self { store }
    }

    /// Underlying store, shared with the importer
    pub fn store(&self) -> Arc<dyn CallRecordStore> {
        Arc::clone(&self.store)
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &CallRecordFilter,
        pagination: &Pagination,
    ) -> AppResult<(Vec<StoredCallRecord>, i64)> {
        self.store
            .query(filter, pagination.limit(), pagination.offset())
            .await
    }

    pub async fn get(&self, id: i64) -> AppResult<StoredCallRecord> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::RecordNotFound(id.to_string()))
    }

    /// Validate and store a new record
    #[instrument(skip(self, candidate))]
    pub async fn create(&self, candidate: &CandidateRecord) -> AppResult<StoredCallRecord> {
        let record = validation::validate(candidate)?;
        let stored = self.store.create(&record).await?;

        info!(id = stored.id, call_id = %stored.record.call_id, "Call record created");
        Ok(stored)
    }

    /// Replace a record with a fully specified candidate
    #[instrument(skip(self, candidate))]
    pub async fn replace(&self, id: i64, candidate: &CandidateRecord) -> AppResult<StoredCallRecord> {
        let record = validation::validate(candidate)?;
        self.store.update(id, &record).await
    }

    /// Merge `patch` onto the stored record and re-validate the result
    #[instrument(skip(self, patch))]
    pub async fn patch(&self, id: i64, patch: CandidateRecord) -> AppResult<StoredCallRecord> {
        let current = self.get(id).await?;
        let merged = CandidateRecord::from(&current.record).overlay(patch);

        debug!(id, "Re-validating patched call record");
        let record = validation::validate(&merged)?;
        self.store.update(id, &record).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        self.store.delete(id).await?;
        info!(id, "Call record deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdr_core::models::CallStatus;
    use cdr_core::validation::{FieldErrorKind, FieldValue};
    use cdr_db::InMemoryCallRecordStore;

    fn candidate(call_id: &str) -> CandidateRecord {
        CandidateRecord {
            call_id: Some(call_id.into()),
            calling_number: Some("+11234567890".into()),
            called_number: Some("+10987654321".into()),
            start_time: Some("2023-11-20T22:00:00Z".into()),
            end_time: Some("2023-11-20T22:10:00Z".into()),
            duration: Some(FieldValue::Integer(600)),
            call_status: Some("SUCCESS".into()),
            call_type: Some("OUTGOING".into()),
        }
    }

    fn service() -> CallRecordService {
        CallRecordService::new(Arc::new(InMemoryCallRecordStore::new()))
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_without_storing() {
        let service = service();
        let bad = CandidateRecord {
            duration: Some(FieldValue::Integer(601)),
            ..candidate("A1")
        };

        let err = service.create(&bad).await.unwrap_err();
        match err {
            AppError::InvalidRecord(v) => {
                assert!(v.has_kind(FieldErrorKind::CrossFieldConsistency))
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let (records, total) = service
            .list(&CallRecordFilter::default(), &Pagination::new(1, 10))
            .await
            .unwrap();
        assert_eq!(total, 0);
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_create_conflicts() {
        let service = service();
        service.create(&candidate("A1")).await.unwrap();

        let err = service.create(&candidate("A1")).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_patch_revalidates_merged_record() {
        let service = service();
        let stored = service.create(&candidate("A1")).await.unwrap();

        let status_only = CandidateRecord {
            call_status: Some("REJECTED".into()),
            ..Default::default()
        };
        let patched = service.patch(stored.id, status_only).await.unwrap();
        assert_eq!(patched.record.call_status, CallStatus::Rejected);
        assert_eq!(patched.record.duration, 600);

        let breaks_timing = CandidateRecord {
            end_time: Some("2023-11-20T22:05:00Z".into()),
            ..Default::default()
        };
        let err = service.patch(stored.id, breaks_timing).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRecord(_)));

        let unchanged = service.get(stored.id).await.unwrap();
        assert_eq!(unchanged.record.call_status, CallStatus::Rejected);
        assert_eq!(unchanged.record.end_time, stored.record.end_time);
    }

    #[tokio::test]
    async fn test_replace_requires_every_field() {
        let service = service();
        let stored = service.create(&candidate("A1")).await.unwrap();

        let partial = CandidateRecord {
            call_id: Some("A1".into()),
            ..Default::default()
        };
        let err = service.replace(stored.id, &partial).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRecord(_)));

        let replaced = service.replace(stored.id, &candidate("A1-renamed")).await.unwrap();
        assert_eq!(replaced.record.call_id, "A1-renamed");
    }

    #[tokio::test]
    async fn test_missing_records() {
        let service = service();
        assert!(matches!(
            service.get(7).await,
            Err(AppError::RecordNotFound(_))
        ));
        assert!(matches!(
            service.patch(7, CandidateRecord::default()).await,
            Err(AppError::RecordNotFound(_))
        ));
        assert!(matches!(
            service.delete(7).await,
            Err(AppError::RecordNotFound(_))
        ));
    }
}
