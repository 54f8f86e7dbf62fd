//! Phone number format rule

use super::FieldError;
use crate::models::PhoneNumber;
use regex::Regex;
use std::sync::LazyLock;

/// Optional `+`, first digit 1-9, 2 to 15 ASCII digits in total
static E164_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[1-9][0-9]{1,14}$").expect("valid phone number regex"));

/// Check a phone number against the E.164-like pattern
///
/// `field` names the column the error is attributed to.
pub fn validate_phone_number(field: &'static str, value: &str) -> Result<PhoneNumber, FieldError> {
    if E164_LIKE.is_match(value) {
        Ok(PhoneNumber::new_unchecked(value))
    } else {
        Err(FieldError::format(
            field,
            format!(
                "Invalid phone number format '{}': expected optional '+', a leading digit 1-9 and 2 to 15 digits",
                value
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{FieldErrorKind, CALLING_NUMBER};

    #[test]
    fn test_accepts_international_numbers() {
        for number in ["+11234567890", "10987654321", "+44", "12", "+123456789012345"] {
            let parsed = validate_phone_number(CALLING_NUMBER, number).unwrap();
            assert_eq!(parsed.as_str(), number);
        }
    }

    #[test]
    fn test_rejects_leading_zero() {
        let err = validate_phone_number(CALLING_NUMBER, "0123456789").unwrap_err();
        assert_eq!(err.kind, FieldErrorKind::FieldFormat);
        assert_eq!(err.field, CALLING_NUMBER);

        assert!(validate_phone_number(CALLING_NUMBER, "+0123456789").is_err());
    }

    #[test]
    fn test_rejects_letters_and_symbols() {
        for number in ["+1123ABC7890", "1-800-555-0199", "+1 123 456", "", "+", "++11234"] {
            assert!(validate_phone_number(CALLING_NUMBER, number).is_err(), "accepted {number:?}");
        }
    }

    #[test]
    fn test_rejects_too_long_or_too_short() {
        // 16 digits
        assert!(validate_phone_number(CALLING_NUMBER, "1234567890123456").is_err());
        assert!(validate_phone_number(CALLING_NUMBER, "+1234567890123456").is_err());
        // single digit
        assert!(validate_phone_number(CALLING_NUMBER, "7").is_err());
    }

    #[test]
    fn test_rejects_non_ascii_digits() {
        // Arabic-Indic digits are not phone digits here
        assert!(validate_phone_number(CALLING_NUMBER, "+1٢٣٤٥٦٧").is_err());
    }
}
