//! Call Detail Record model
//!
//! Plain data types for a validated call record. Construction from untrusted
//! input goes through [`crate::validation::validate`]; nothing in this module
//! checks invariants on its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallStatus {
    /// Call was connected
    Success,
    /// Nobody picked up
    Unanswered,
    /// Callee or network refused the call
    Rejected,
}

impl CallStatus {
    /// Every allowed status, in declaration order
    pub const ALL: [CallStatus; 3] = [
        CallStatus::Success,
        CallStatus::Unanswered,
        CallStatus::Rejected,
    ];

    /// Wire and storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Success => "SUCCESS",
            CallStatus::Unanswered => "UNANSWERED",
            CallStatus::Rejected => "REJECTED",
        }
    }

    /// Parse from the exact wire representation (case-sensitive)
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a call relative to the subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallType {
    /// Placed by the subscriber
    Outgoing,
    /// Received by the subscriber
    Incoming,
    /// Received but not taken
    Missed,
}

impl CallType {
    /// Every allowed call type, in declaration order
    pub const ALL: [CallType; 3] = [CallType::Outgoing, CallType::Incoming, CallType::Missed];

    /// Wire and storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            CallType::Outgoing => "OUTGOING",
            CallType::Incoming => "INCOMING",
            CallType::Missed => "MISSED",
        }
    }

    /// Parse from the exact wire representation (case-sensitive)
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|call_type| call_type.as_str() == s)
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phone number that matched the E.164-like pattern
///
/// Only [`crate::validation::validate_phone_number`] produces values of this
/// type from user input; the inner string is kept exactly as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Wrap a number that was already validated, e.g. when reading it back
    /// from a store
    pub fn new_unchecked(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the number as submitted
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number without the optional leading `+`
    pub fn digits(&self) -> &str {
        self.0.trim_start_matches('+')
    }

    /// Consume into the inner string
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validated call detail record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    /// Call identifier assigned by the switch
    pub call_id: String,

    /// Caller number (A-number)
    pub calling_number: PhoneNumber,

    /// Callee number (B-number)
    pub called_number: PhoneNumber,

    /// Call start timestamp
    pub start_time: DateTime<Utc>,

    /// Call end timestamp
    pub end_time: DateTime<Utc>,

    /// Duration in whole seconds
    pub duration: i64,

    /// Call outcome
    pub call_status: CallStatus,

    /// Call direction
    pub call_type: CallType,
}

impl CallRecord {
    /// Duration formatted as `MM:SS` (minutes are not wrapped at 60)
    pub fn formatted_duration(&self) -> String {
        format!("{:02}:{:02}", self.duration / 60, self.duration % 60)
    }

    /// Check if the call was connected
    #[inline]
    pub fn was_successful(&self) -> bool {
        self.call_status == CallStatus::Success
    }
}

impl fmt::Display for CallRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CDR record for {} to {} at {}",
            self.calling_number, self.called_number, self.start_time
        )
    }
}

/// Call record as persisted by a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredCallRecord {
    /// Store-assigned identifier
    pub id: i64,

    /// The record itself
    #[serde(flatten)]
    pub record: CallRecord,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_record() -> CallRecord {
        CallRecord {
            call_id: "12345678".to_string(),
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
    fn test_status_parse_is_case_sensitive() {
        assert_eq!(CallStatus::parse("SUCCESS"), Some(CallStatus::Success));
        assert_eq!(CallStatus::parse("REJECTED"), Some(CallStatus::Rejected));
        assert_eq!(CallStatus::parse("success"), None);
        assert_eq!(CallStatus::parse(""), None);
    }

    #[test]
    fn test_call_type_round_trip() {
        for call_type in CallType::ALL {
            assert_eq!(CallType::parse(call_type.as_str()), Some(call_type));
        }
        assert_eq!(CallType::parse("Missed"), None);
    }

    #[test]
    fn test_enum_serde_uses_wire_names() {
        let json = serde_json::to_string(&CallStatus::Unanswered).unwrap();
        assert_eq!(json, "\"UNANSWERED\"");

        let parsed: CallType = serde_json::from_str("\"INCOMING\"").unwrap();
        assert_eq!(parsed, CallType::Incoming);
    }

    #[test]
    fn test_phone_number_digits() {
        let number = PhoneNumber::new_unchecked("+11234567890");
        assert_eq!(number.digits(), "11234567890");
        assert_eq!(number.as_str(), "+11234567890");
    }

    #[test]
    fn test_formatted_duration() {
        let record = CallRecord {
            duration: 125,
            ..sample_record()
        };
        assert_eq!(record.formatted_duration(), "02:05");
    }

    #[test]
    fn test_stored_record_serializes_flat() {
        let now = Utc::now();
        let stored = StoredCallRecord {
            id: 7,
            record: sample_record(),
            created_at: now,
            updated_at: now,
        };

        let value = serde_json::to_value(&stored).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["call_id"], "12345678");
        assert_eq!(value["calling_number"], "+11234567890");
        assert_eq!(value["call_status"], "SUCCESS");
    }
}
