//! Start/end/duration parsing and the cross-field consistency rule

use super::{FieldError, FieldValue, DURATION, END_TIME, START_TIME};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};

/// Parsed and mutually consistent call timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallTiming {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: i64,
}

/// Parse `start`/`end`/`duration` and check that they agree
///
/// Returns the first problem found. [`super::validate`] uses the individual
/// parsers instead so it can report every malformed field at once.
pub fn validate_time_consistency(
    start: Option<&FieldValue>,
    end: Option<&FieldValue>,
    duration: Option<&FieldValue>,
) -> Result<CallTiming, FieldError> {
    let start_time = parse_timestamp(START_TIME, start)?;
    let end_time = parse_timestamp(END_TIME, end)?;
    let duration_seconds = coerce_duration_seconds(duration)?;
    ensure_consistent(start_time, end_time, duration_seconds)
}

/// Require `end >= start` and `duration == round(end - start)` exactly
pub fn ensure_consistent(
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    duration_seconds: i64,
) -> Result<CallTiming, FieldError> {
    if end_time < start_time {
        return Err(FieldError::inconsistent(
            END_TIME,
            format!(
                "end_time {} is earlier than start_time {}",
                end_time.to_rfc3339(),
                start_time.to_rfc3339()
            ),
        ));
    }

    let expected = round_half_even_secs(end_time - start_time);
    if duration_seconds != expected {
        return Err(FieldError::inconsistent(
            DURATION,
            format!(
                "Call duration {}s does not match the {}s between start_time and end_time",
                duration_seconds, expected
            ),
        ));
    }

    Ok(CallTiming {
        start_time,
        end_time,
        duration_seconds,
    })
}

/// Accept a typed timestamp or an ISO-8601 string
pub fn parse_timestamp(
    field: &'static str,
    value: Option<&FieldValue>,
) -> Result<DateTime<Utc>, FieldError> {
    match value {
        None => Err(FieldError::missing(field)),
        Some(FieldValue::Timestamp(ts)) => Ok(*ts),
        Some(FieldValue::Text(raw)) => parse_iso8601(raw.trim()).ok_or_else(|| {
            FieldError::format(
                field,
                format!("Invalid datetime '{}': expected ISO-8601", raw),
            )
        }),
        Some(other) => Err(FieldError::format(
            field,
            format!(
                "Invalid datetime representation ({}): expected an ISO-8601 string",
                other.type_name()
            ),
        )),
    }
}

/// Coerce a duration given as seconds (integer, string, integral float) or
/// as a typed duration into whole seconds
pub fn coerce_duration_seconds(value: Option<&FieldValue>) -> Result<i64, FieldError> {
    match value {
        None => Err(FieldError::missing(DURATION)),
        Some(FieldValue::Integer(seconds)) => Ok(*seconds),
        Some(FieldValue::Text(raw)) => raw.trim().parse::<i64>().map_err(|e| {
            FieldError::coercion(
                DURATION,
                format!("A valid integer is required, got '{}' ({})", raw, e),
            )
        }),
        Some(FieldValue::Float(seconds)) => {
            if seconds.is_finite()
                && seconds.fract() == 0.0
                && *seconds >= i64::MIN as f64
                && *seconds <= i64::MAX as f64
            {
                Ok(*seconds as i64)
            } else {
                Err(FieldError::coercion(
                    DURATION,
                    format!("A whole number of seconds is required, got {}", seconds),
                ))
            }
        }
        Some(FieldValue::Duration(delta)) => {
            if delta.subsec_nanos() == 0 {
                Ok(delta.num_seconds())
            } else {
                Err(FieldError::coercion(
                    DURATION,
                    format!(
                        "A whole number of seconds is required, got {}ms",
                        delta.num_milliseconds()
                    ),
                ))
            }
        }
        Some(FieldValue::Timestamp(_)) => Err(FieldError::coercion(
            DURATION,
            "A valid integer is required, got a timestamp",
        )),
    }
}

/// Parse RFC 3339, or a naive ISO-8601 date-time/date read as UTC
pub(crate) fn parse_iso8601(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Whole seconds of a non-negative span, ties rounded to even
fn round_half_even_secs(delta: TimeDelta) -> i64 {
    const HALF: i32 = 500_000_000;

    let secs = delta.num_seconds();
    let nanos = delta.subsec_nanos();

    if nanos > HALF || (nanos == HALF && secs % 2 != 0) {
        secs + 1
    } else {
        secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::FieldErrorKind;
    use chrono::TimeZone;

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    #[test]
    fn test_exact_duration_is_accepted() {
        let timing = validate_time_consistency(
            Some(&text("2023-11-20T22:00:00Z")),
            Some(&text("2023-11-20T22:10:00Z")),
            Some(&text("600")),
        )
        .unwrap();

        assert_eq!(timing.duration_seconds, 600);
        assert_eq!(
            timing.start_time,
            Utc.with_ymd_and_hms(2023, 11, 20, 22, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_off_by_one_second_is_rejected() {
        for duration in ["599", "601"] {
            let err = validate_time_consistency(
                Some(&text("2023-11-20T22:00:00Z")),
                Some(&text("2023-11-20T22:10:00Z")),
                Some(&text(duration)),
            )
            .unwrap_err();
            assert_eq!(err.kind, FieldErrorKind::CrossFieldConsistency);
            assert_eq!(err.field, DURATION);
        }
    }

    #[test]
    fn test_typed_values_are_accepted() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let end = start + TimeDelta::seconds(95);

        let timing = validate_time_consistency(
            Some(&FieldValue::Timestamp(start)),
            Some(&FieldValue::Timestamp(end)),
            Some(&FieldValue::Duration(TimeDelta::seconds(95))),
        )
        .unwrap();
        assert_eq!(timing.end_time, end);

        let timing = validate_time_consistency(
            Some(&FieldValue::Timestamp(start)),
            Some(&FieldValue::Timestamp(end)),
            Some(&FieldValue::Integer(95)),
        )
        .unwrap();
        assert_eq!(timing.duration_seconds, 95);
    }

    #[test]
    fn test_offsets_are_normalized() {
        let timing = validate_time_consistency(
            Some(&text("2023-11-21T01:00:00+03:00")),
            Some(&text("2023-11-20T22:00:30Z")),
            Some(&FieldValue::Integer(30)),
        )
        .unwrap();
        assert_eq!(timing.duration_seconds, 30);
    }

    #[test]
    fn test_missing_is_distinct_from_malformed() {
        let missing = parse_timestamp(START_TIME, None).unwrap_err();
        assert_eq!(missing.kind, FieldErrorKind::MissingField);

        let malformed = parse_timestamp(START_TIME, Some(&text("20/11/2023 22:00"))).unwrap_err();
        assert_eq!(malformed.kind, FieldErrorKind::FieldFormat);

        let wrong_type = parse_timestamp(END_TIME, Some(&FieldValue::Integer(1_700_000_000)))
            .unwrap_err();
        assert_eq!(wrong_type.kind, FieldErrorKind::FieldFormat);
        assert_eq!(wrong_type.field, END_TIME);
    }

    #[test]
    fn test_non_numeric_duration_is_a_coercion_error() {
        for raw in ["ten", "", "60s", "1e3"] {
            let err = coerce_duration_seconds(Some(&text(raw))).unwrap_err();
            assert_eq!(err.kind, FieldErrorKind::TypeCoercion, "for {raw:?}");
        }

        let err = coerce_duration_seconds(Some(&FieldValue::Float(12.5))).unwrap_err();
        assert_eq!(err.kind, FieldErrorKind::TypeCoercion);

        assert_eq!(
            coerce_duration_seconds(Some(&FieldValue::Float(12.0))).unwrap(),
            12
        );
        assert_eq!(coerce_duration_seconds(Some(&text(" 42 "))).unwrap(), 42);
    }

    #[test]
    fn test_end_before_start_is_rejected() {
        let err = validate_time_consistency(
            Some(&text("2023-11-20T22:10:00Z")),
            Some(&text("2023-11-20T22:00:00Z")),
            Some(&FieldValue::Integer(-600)),
        )
        .unwrap_err();
        assert_eq!(err.kind, FieldErrorKind::CrossFieldConsistency);
        assert_eq!(err.field, END_TIME);
    }

    #[test]
    fn test_fractional_spans_round_half_to_even() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        assert_eq!(round_half_even_secs(TimeDelta::milliseconds(2_500)), 2);
        assert_eq!(round_half_even_secs(TimeDelta::milliseconds(3_500)), 4);
        assert_eq!(round_half_even_secs(TimeDelta::milliseconds(3_499)), 3);
        assert_eq!(round_half_even_secs(TimeDelta::milliseconds(3_501)), 4);

        let end = start + TimeDelta::milliseconds(60_700);
        assert!(ensure_consistent(start, end, 61).is_ok());
        assert!(ensure_consistent(start, end, 60).is_err());
    }

    #[test]
    fn test_parse_iso8601_variants() {
        let expected = Utc.with_ymd_and_hms(2023, 11, 20, 22, 0, 0).unwrap();

        for raw in [
            "2023-11-20T22:00:00Z",
            "2023-11-20T22:00:00+00:00",
            "2023-11-20 22:00:00",
            "2023-11-20T22:00:00",
            "2023-11-20T22:00:00.000",
        ] {
            assert_eq!(parse_iso8601(raw), Some(expected), "for {raw:?}");
        }

        assert_eq!(
            parse_iso8601("2023-11-20"),
            Some(Utc.with_ymd_and_hms(2023, 11, 20, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_iso8601("yesterday"), None);
        assert_eq!(parse_iso8601("1700000000"), None);
    }
}
