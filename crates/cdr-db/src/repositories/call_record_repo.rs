//! Call record repository implementation
//!
//! Provides PostgreSQL-backed storage for call detail records with
//! date range and number filtering. Uses runtime queries (not compile-time
//! macros) to avoid requiring a database connection at build time.

use super::is_unique_violation;
use cdr_core::{
    models::{CallRecord, CallStatus, CallType, PhoneNumber, StoredCallRecord},
    traits::{CallRecordFilter, CallRecordStore},
    AppError, AppResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, error, instrument};

/// PostgreSQL implementation of CallRecordStore
pub struct PgCallRecordRepository {
    pool: PgPool,
}

impl PgCallRecordRepository {
    /// Create a new call record repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_write_error(e: sqlx::Error, call_id: &str, action: &str) -> AppError {
        if is_unique_violation(&e) {
            AppError::AlreadyExists(format!("Call record {} already exists", call_id))
        } else {
            error!("Database error on {} of call record {}: {}", action, call_id, e);
            AppError::Database(format!("Failed to {} call record: {}", action, e))
        }
    }
}

const CALL_RECORD_COLUMNS: &str = r#"
    id, call_id, calling_number, called_number,
    start_time, end_time, duration,
    call_status, call_type,
    created_at, updated_at
"#;

/// Append `WHERE ...` for every set filter, with bound parameters
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &CallRecordFilter) {
    let mut separator = " WHERE ";

    if let Some(start) = filter.start_time {
        builder.push(separator).push("start_time >= ").push_bind(start);
        separator = " AND ";
    }
    if let Some(end) = filter.end_time {
        builder.push(separator).push("end_time <= ").push_bind(end);
        separator = " AND ";
    }
    if let Some(number) = &filter.calling_number {
        builder
            .push(separator)
            .push("calling_number = ")
            .push_bind(number.clone());
        separator = " AND ";
    }
    if let Some(number) = &filter.called_number {
        builder
            .push(separator)
            .push("called_number = ")
            .push_bind(number.clone());
        separator = " AND ";
    }
    if let Some(status) = filter.call_status {
        builder
            .push(separator)
            .push("call_status = ")
            .push_bind(status.as_str());
    }
}

#[async_trait]
impl CallRecordStore for PgCallRecordRepository {
    #[instrument(skip(self, record), fields(call_id = %record.call_id))]
    async fn create(&self, record: &CallRecord) -> AppResult<StoredCallRecord> {
        debug!("Creating call record");

        let query = format!(
            r#"
            INSERT INTO call_records (
                call_id, calling_number, called_number,
                start_time, end_time, duration,
                call_status, call_type
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            CALL_RECORD_COLUMNS
        );

        let row = sqlx::query_as::<Postgres, CallRecordRow>(&query)
            .bind(&record.call_id)
            .bind(record.calling_number.as_str())
            .bind(record.called_number.as_str())
            .bind(record.start_time)
            .bind(record.end_time)
            .bind(record.duration)
            .bind(record.call_status.as_str())
            .bind(record.call_type.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Self::map_write_error(e, &record.call_id, "create"))?;

        row.try_into()
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> AppResult<Option<StoredCallRecord>> {
        debug!("Finding call record by id: {}", id);

        let query = format!(
            "SELECT {} FROM call_records WHERE id = $1",
            CALL_RECORD_COLUMNS
        );

        let result = sqlx::query_as::<Postgres, CallRecordRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error finding call record {}: {}", id, e);
                AppError::Database(format!("Failed to find call record: {}", e))
            })?;

        result.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_call_id(&self, call_id: &str) -> AppResult<Option<StoredCallRecord>> {
        debug!("Finding call record by call_id: {}", call_id);

        let query = format!(
            "SELECT {} FROM call_records WHERE call_id = $1",
            CALL_RECORD_COLUMNS
        );

        let result = sqlx::query_as::<Postgres, CallRecordRow>(&query)
            .bind(call_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error finding call record by call_id: {}", e);
                AppError::Database(format!("Failed to find call record: {}", e))
            })?;

        result.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self))]
    async fn query(
        &self,
        filter: &CallRecordFilter,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<StoredCallRecord>, i64)> {
        debug!(
            "Listing call records with filter {:?}, limit={}, offset={}",
            filter, limit, offset
        );

        let mut count_builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM call_records");
        push_filters(&mut count_builder, filter);

        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting call records: {}", e);
                AppError::Database(format!("Failed to count call records: {}", e))
            })?;

        let mut data_builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM call_records",
            CALL_RECORD_COLUMNS
        ));
        push_filters(&mut data_builder, filter);
        data_builder
            .push(" ORDER BY start_time DESC, id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = data_builder
            .build_query_as::<CallRecordRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error fetching call records: {}", e);
                AppError::Database(format!("Failed to fetch call records: {}", e))
            })?;

        let records = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<AppResult<Vec<_>>>()?;

        Ok((records, total))
    }

    #[instrument(skip(self, record), fields(call_id = %record.call_id))]
    async fn update(&self, id: i64, record: &CallRecord) -> AppResult<StoredCallRecord> {
        debug!("Updating call record: {}", id);

        let query = format!(
            r#"
            UPDATE call_records
            SET call_id = $2,
                calling_number = $3,
                called_number = $4,
                start_time = $5,
                end_time = $6,
                duration = $7,
                call_status = $8,
                call_type = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CALL_RECORD_COLUMNS
        );

        let row = sqlx::query_as::<Postgres, CallRecordRow>(&query)
            .bind(id)
            .bind(&record.call_id)
            .bind(record.calling_number.as_str())
            .bind(record.called_number.as_str())
            .bind(record.start_time)
            .bind(record.end_time)
            .bind(record.duration)
            .bind(record.call_status.as_str())
            .bind(record.call_type.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Self::map_write_error(e, &record.call_id, "update"))?
            .ok_or_else(|| AppError::RecordNotFound(id.to_string()))?;

        row.try_into()
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> AppResult<()> {
        debug!("Deleting call record: {}", id);

        let result = sqlx::query("DELETE FROM call_records WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error deleting call record {}: {}", id, e);
                AppError::Database(format!("Failed to delete call record: {}", e))
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::RecordNotFound(id.to_string()));
        }

        Ok(())
    }
}

/// Helper struct for mapping database rows to domain model
#[derive(Debug, sqlx::FromRow)]
struct CallRecordRow {
    id: i64,
    call_id: String,
    calling_number: String,
    called_number: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    duration: i64,
    call_status: String,
    call_type: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CallRecordRow> for StoredCallRecord {
    type Error = AppError;

    fn try_from(row: CallRecordRow) -> Result<Self, Self::Error> {
        let call_status = CallStatus::parse(&row.call_status).ok_or_else(|| {
            AppError::Database(format!(
                "Unknown call_status '{}' in row {}",
                row.call_status, row.id
            ))
        })?;
        let call_type = CallType::parse(&row.call_type).ok_or_else(|| {
            AppError::Database(format!(
                "Unknown call_type '{}' in row {}",
                row.call_type, row.id
            ))
        })?;

        Ok(Self {
            id: row.id,
            record: CallRecord {
                call_id: row.call_id,
                calling_number: PhoneNumber::new_unchecked(row.calling_number),
                called_number: PhoneNumber::new_unchecked(row.called_number),
                start_time: row.start_time,
                end_time: row.end_time,
                duration: row.duration,
                call_status,
                call_type,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row() -> CallRecordRow {
        let start = Utc.with_ymd_and_hms(2023, 11, 20, 22, 0, 0).unwrap();
        CallRecordRow {
            id: 1,
            call_id: "A1".to_string(),
            calling_number: "+11234567890".to_string(),
            called_number: "+10987654321".to_string(),
            start_time: start,
            end_time: start + chrono::TimeDelta::seconds(600),
            duration: 600,
            call_status: "SUCCESS".to_string(),
            call_type: "OUTGOING".to_string(),
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn test_call_record_row_conversion() {
        let stored: StoredCallRecord = row().try_into().unwrap();
        assert_eq!(stored.id, 1);
        assert_eq!(stored.record.call_id, "A1");
        assert_eq!(stored.record.duration, 600);
        assert_eq!(stored.record.call_status, CallStatus::Success);
        assert_eq!(stored.record.call_type, CallType::Outgoing);
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let bad = CallRecordRow {
            call_status: "DROPPED".to_string(),
            ..row()
        };
        let result: AppResult<StoredCallRecord> = bad.try_into();
        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[test]
    fn test_filters_use_bound_parameters() {
        let filter = CallRecordFilter {
            start_time: Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()),
            calling_number: Some("'; DROP TABLE call_records; --".to_string()),
            call_status: Some(CallStatus::Rejected),
            ..Default::default()
        };

        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM call_records");
        push_filters(&mut builder, &filter);

        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM call_records WHERE start_time >= $1 AND calling_number = $2 AND call_status = $3"
        );
    }

    #[test]
    fn test_no_filters_no_where_clause() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM call_records");
        push_filters(&mut builder, &CallRecordFilter::default());
        assert_eq!(builder.sql(), "SELECT COUNT(*) FROM call_records");
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_duplicate_call_id_is_rejected() {
        let url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/cdr_ingest".to_string());
        let pool = PgPool::connect(&url).await.unwrap();
        crate::run_migrations(&pool).await.unwrap();
        let repo = PgCallRecordRepository::new(pool);

        let mut record: StoredCallRecord = row().try_into().unwrap();
        record.record.call_id = format!("dup-{}", Utc::now().timestamp_nanos_opt().unwrap_or(0));

        let created = repo.create(&record.record).await.unwrap();
        let err = repo.create(&record.record).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists(_)));

        repo.delete(created.id).await.unwrap();
        assert!(repo.find_by_id(created.id).await.unwrap().is_none());
    }
}
