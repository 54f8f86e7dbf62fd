//! Call record validation
//!
//! Pure functions that turn an untrusted [`CandidateRecord`] into a
//! [`CallRecord`] or a [`ValidationError`] listing every problem found.
//! Per-field checks run independently so several errors can be reported
//! together; the start/end/duration consistency check only runs once all
//! three of those fields parsed.

mod phone;
mod timing;

pub use phone::validate_phone_number;
pub use timing::{
    coerce_duration_seconds, ensure_consistent, parse_timestamp, validate_time_consistency,
    CallTiming,
};

use crate::models::{CallRecord, CallStatus, CallType, PhoneNumber};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

pub const CALL_ID: &str = "call_id";
pub const CALLING_NUMBER: &str = "calling_number";
pub const CALLED_NUMBER: &str = "called_number";
pub const START_TIME: &str = "start_time";
pub const END_TIME: &str = "end_time";
pub const DURATION: &str = "duration";
pub const CALL_STATUS: &str = "call_status";
pub const CALL_TYPE: &str = "call_type";

/// Longest accepted call identifier, in characters
pub const MAX_CALL_ID_LEN: usize = 100;

// ==================== Input ====================

/// Raw value of one candidate field
///
/// JSON bodies produce `Text`, `Integer` or `Float`; the CSV importer hands
/// over already-parsed `Timestamp` and `Integer` values.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Timestamp(DateTime<Utc>),
    Duration(TimeDelta),
}

impl FieldValue {
    /// Short description used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "string",
            FieldValue::Integer(_) => "integer",
            FieldValue::Float(_) => "number",
            FieldValue::Timestamp(_) => "timestamp",
            FieldValue::Duration(_) => "duration",
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(value)
    }
}

impl From<TimeDelta> for FieldValue {
    fn from(value: TimeDelta) -> Self {
        FieldValue::Duration(value)
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum JsonScalar {
            Text(String),
            Integer(i64),
            Float(f64),
        }

        Ok(match JsonScalar::deserialize(deserializer)? {
            JsonScalar::Text(s) => FieldValue::Text(s),
            JsonScalar::Integer(n) => FieldValue::Integer(n),
            JsonScalar::Float(f) => FieldValue::Float(f),
        })
    }
}

/// Untrusted call record, every field optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CandidateRecord {
    pub call_id: Option<FieldValue>,
    pub calling_number: Option<FieldValue>,
    pub called_number: Option<FieldValue>,
    pub start_time: Option<FieldValue>,
    pub end_time: Option<FieldValue>,
    pub duration: Option<FieldValue>,
    pub call_status: Option<FieldValue>,
    pub call_type: Option<FieldValue>,
}

impl CandidateRecord {
    /// Fields present in `patch` replace those of `self`
    pub fn overlay(self, patch: CandidateRecord) -> CandidateRecord {
        CandidateRecord {
            call_id: patch.call_id.or(self.call_id),
            calling_number: patch.calling_number.or(self.calling_number),
            called_number: patch.called_number.or(self.called_number),
            start_time: patch.start_time.or(self.start_time),
            end_time: patch.end_time.or(self.end_time),
            duration: patch.duration.or(self.duration),
            call_status: patch.call_status.or(self.call_status),
            call_type: patch.call_type.or(self.call_type),
        }
    }
}

impl From<&CallRecord> for CandidateRecord {
    fn from(record: &CallRecord) -> Self {
        Self {
            call_id: Some(record.call_id.as_str().into()),
            calling_number: Some(record.calling_number.as_str().into()),
            called_number: Some(record.called_number.as_str().into()),
            start_time: Some(record.start_time.into()),
            end_time: Some(record.end_time.into()),
            duration: Some(record.duration.into()),
            call_status: Some(record.call_status.as_str().into()),
            call_type: Some(record.call_type.as_str().into()),
        }
    }
}

// ==================== Errors ====================

/// Category of a field-level validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorKind {
    /// Value has the wrong shape (pattern, enum membership, representation)
    FieldFormat,
    /// Required field absent or blank
    MissingField,
    /// Value could not be converted to the expected type
    TypeCoercion,
    /// Value conflicts with another field
    CrossFieldConsistency,
}

/// One problem with one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: &'static str,
    pub kind: FieldErrorKind,
    pub message: String,
}

impl FieldError {
    pub fn missing(field: &'static str) -> Self {
        Self {
            field,
            kind: FieldErrorKind::MissingField,
            message: "This field is required".to_string(),
        }
    }

    pub fn format(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            kind: FieldErrorKind::FieldFormat,
            message: message.into(),
        }
    }

    pub fn coercion(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            kind: FieldErrorKind::TypeCoercion,
            message: message.into(),
        }
    }

    pub fn inconsistent(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            kind: FieldErrorKind::CrossFieldConsistency,
            message: message.into(),
        }
    }

    /// Attribute this error to another field
    pub fn for_field(mut self, field: &'static str) -> Self {
        self.field = field;
        self
    }
}

/// Every field error found in one candidate record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    /// Check whether any error has the given kind
    pub fn has_kind(&self, kind: FieldErrorKind) -> bool {
        self.errors.iter().any(|e| e.kind == kind)
    }

    /// Errors for a single field
    pub fn field(&self, field: &str) -> impl Iterator<Item = &FieldError> + '_ {
        let field = field.to_string();
        self.errors.iter().filter(move |e| e.field == field)
    }

    /// Messages grouped by field name, for API responses
    pub fn by_field(&self) -> BTreeMap<&'static str, Vec<String>> {
        let mut grouped: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
        for error in &self.errors {
            grouped
                .entry(error.field)
                .or_default()
                .push(error.message.clone());
        }
        grouped
    }
}

impl From<FieldError> for ValidationError {
    fn from(error: FieldError) -> Self {
        Self::new(vec![error])
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationError {}

// ==================== Rules ====================

/// Call identifier must be present, non-blank, and at most 100 characters
pub fn validate_call_id(value: Option<&FieldValue>) -> Result<String, FieldError> {
    let raw = text_value(CALL_ID, value)?;
    let call_id = raw.trim();

    if call_id.is_empty() {
        return Err(FieldError {
            field: CALL_ID,
            kind: FieldErrorKind::MissingField,
            message: "This field may not be blank".to_string(),
        });
    }

    if call_id.chars().count() > MAX_CALL_ID_LEN {
        return Err(FieldError::format(
            CALL_ID,
            format!(
                "Ensure this field has no more than {} characters",
                MAX_CALL_ID_LEN
            ),
        ));
    }

    Ok(call_id.to_string())
}

/// Status must be one of [`CallStatus::ALL`], compared case-sensitively
pub fn validate_status(value: &str) -> Result<CallStatus, FieldError> {
    CallStatus::parse(value).ok_or_else(|| {
        FieldError::format(
            CALL_STATUS,
            format!(
                "Invalid call status '{}'. Allowed values: {}",
                value,
                join_allowed(CallStatus::ALL.iter().map(CallStatus::as_str))
            ),
        )
    })
}

/// Call type must be one of [`CallType::ALL`], compared case-sensitively
pub fn validate_call_type(value: &str) -> Result<CallType, FieldError> {
    CallType::parse(value).ok_or_else(|| {
        FieldError::format(
            CALL_TYPE,
            format!(
                "Invalid call type '{}'. Allowed values: {}",
                value,
                join_allowed(CallType::ALL.iter().map(CallType::as_str))
            ),
        )
    })
}

/// Validate a whole candidate record
///
/// # Errors
///
/// Returns every field error found. The cross-field duration check is only
/// attempted when `start_time`, `end_time` and `duration` are individually
/// valid.
pub fn validate(candidate: &CandidateRecord) -> Result<CallRecord, ValidationError> {
    let mut errors = Vec::new();

    let call_id = keep(validate_call_id(candidate.call_id.as_ref()), &mut errors);
    let calling_number = keep(
        phone_field(CALLING_NUMBER, candidate.calling_number.as_ref()),
        &mut errors,
    );
    let called_number = keep(
        phone_field(CALLED_NUMBER, candidate.called_number.as_ref()),
        &mut errors,
    );
    let start_time = keep(
        parse_timestamp(START_TIME, candidate.start_time.as_ref()),
        &mut errors,
    );
    let end_time = keep(
        parse_timestamp(END_TIME, candidate.end_time.as_ref()),
        &mut errors,
    );
    let duration = keep(
        coerce_duration_seconds(candidate.duration.as_ref()),
        &mut errors,
    );
    let call_status = keep(
        text_value(CALL_STATUS, candidate.call_status.as_ref())
            .and_then(|s| validate_status(&s)),
        &mut errors,
    );
    let call_type = keep(
        text_value(CALL_TYPE, candidate.call_type.as_ref()).and_then(|s| validate_call_type(&s)),
        &mut errors,
    );

    let timing = match (start_time, end_time, duration) {
        (Some(start), Some(end), Some(seconds)) => {
            keep(ensure_consistent(start, end, seconds), &mut errors)
        }
        _ => None,
    };

    match (call_id, calling_number, called_number, timing, call_status, call_type) {
        (
            Some(call_id),
            Some(calling_number),
            Some(called_number),
            Some(timing),
            Some(call_status),
            Some(call_type),
        ) if errors.is_empty() => Ok(CallRecord {
            call_id,
            calling_number,
            called_number,
            start_time: timing.start_time,
            end_time: timing.end_time,
            duration: timing.duration_seconds,
            call_status,
            call_type,
        }),
        _ => Err(ValidationError::new(errors)),
    }
}

fn phone_field(field: &'static str, value: Option<&FieldValue>) -> Result<PhoneNumber, FieldError> {
    let raw = text_value(field, value)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FieldError::missing(field));
    }
    validate_phone_number(field, trimmed)
}

/// Accept strings, and integers rendered as strings
fn text_value<'a>(
    field: &'static str,
    value: Option<&'a FieldValue>,
) -> Result<Cow<'a, str>, FieldError> {
    match value {
        None => Err(FieldError::missing(field)),
        Some(FieldValue::Text(s)) => Ok(Cow::Borrowed(s.as_str())),
        Some(FieldValue::Integer(n)) => Ok(Cow::Owned(n.to_string())),
        Some(other) => Err(FieldError::format(
            field,
            format!("Not a valid string ({})", other.type_name()),
        )),
    }
}

fn keep<T>(result: Result<T, FieldError>, errors: &mut Vec<FieldError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            errors.push(error);
            None
        }
    }
}

fn join_allowed<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values.collect::<Vec<_>>().join(", ")
}
