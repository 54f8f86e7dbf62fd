//! Call record DTOs

use super::common::PaginationParams;
use cdr_core::{
    models::{CallStatus, CallType, StoredCallRecord},
    traits::CallRecordFilter,
    validation::{self, FieldValue, END_TIME, START_TIME},
    AppError,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Filters accepted by `GET /cdr`
///
/// Blank values are ignored, the same as leaving the parameter out.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CallRecordListQuery {
    #[serde(flatten)]
    #[validate(nested)]
    pub pagination: PaginationParams,

    /// Only calls starting at or after this instant (ISO 8601)
    pub start_time: Option<String>,

    /// Only calls ending at or before this instant (ISO 8601)
    pub end_time: Option<String>,

    pub calling_number: Option<String>,

    pub called_number: Option<String>,

    pub call_status: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl CallRecordListQuery {
    /// Parse the raw query values into a store filter
    pub fn to_filter(&self) -> Result<CallRecordFilter, AppError> {
        let timestamp = |field, raw: Option<&str>| {
            raw.map(|raw| {
                validation::parse_timestamp(field, Some(&FieldValue::from(raw)))
                    .map_err(|e| AppError::Validation(e.to_string()))
            })
            .transpose()
        };

        let call_status = non_blank(&self.call_status)
            .map(|raw| {
                validation::validate_status(raw).map_err(|e| AppError::Validation(e.to_string()))
            })
            .transpose()?;

        Ok(CallRecordFilter {
            start_time: timestamp(START_TIME, non_blank(&self.start_time))?,
            end_time: timestamp(END_TIME, non_blank(&self.end_time))?,
            calling_number: non_blank(&self.calling_number).map(str::to_string),
            called_number: non_blank(&self.called_number).map(str::to_string),
            call_status,
        })
    }
}

/// Call record as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct CallRecordResponse {
    pub id: i64,
    pub call_id: String,
    pub calling_number: String,
    pub called_number: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration: i64,
    /// Duration as `MM:SS`
    pub formatted_duration: String,
    pub call_status: CallStatus,
    pub call_type: CallType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StoredCallRecord> for CallRecordResponse {
    fn from(stored: StoredCallRecord) -> Self {
        let formatted_duration = stored.record.formatted_duration();
        let record = stored.record;
        Self {
            id: stored.id,
            call_id: record.call_id,
            calling_number: record.calling_number.into_inner(),
            called_number: record.called_number.into_inner(),
            start_time: record.start_time,
            end_time: record.end_time,
            duration: record.duration,
            formatted_duration,
            call_status: record.call_status,
            call_type: record.call_type,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        }
    }
}
