/// Input validation helpers
///
/// Custom rules for `validator` derives plus normalizers shared by the
/// registries.
use chrono::NaiveTime;
use std::borrow::Cow;
use validator::ValidationError;

/// Maximum length of a phone number after trimming
pub const MAX_PHONE_LEN: usize = 20;

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// Rejects empty or whitespace-only strings
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(error("blank", "must not be empty"));
    }
    Ok(())
}

/// Digits with optional leading `+` and spaces, dashes or parentheses
pub fn phone(value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_PHONE_LEN {
        return Err(error("phone", "must be a phone number of at most 20 characters"));
    }

    let digits = trimmed.chars().filter(|c| c.is_ascii_digit()).count();
    let allowed = trimmed.chars().enumerate().all(|(i, c)| {
        c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')') || (c == '+' && i == 0)
    });

    if !allowed || digits < 7 {
        return Err(error("phone", "must be a valid phone number"));
    }
    Ok(())
}

/// `HH:MM` 24-hour clock time
pub fn clock_time(value: &str) -> Result<(), ValidationError> {
    parse_clock_time(value)
        .map(|_| ())
        .ok_or_else(|| error("clock_time", "must be a time formatted HH:MM"))
}

pub fn parse_clock_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

/// Canonical form for email lookups
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trim and drop empty optional text
pub fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_blank() {
        assert!(not_blank("Jane").is_ok());
        assert!(not_blank("   ").is_err());
        assert!(not_blank("").is_err());
    }

    #[test]
    fn test_phone_rules() {
        assert!(phone("+1 (555) 123-4567").is_ok());
        assert!(phone("9876543210").is_ok());
        assert!(phone("12-34").is_err());
        assert!(phone("555-CALL-NOW").is_err());
        assert!(phone("1+5551234567").is_err());
        assert!(phone("123456789012345678901").is_err());
    }

    #[test]
    fn test_clock_time() {
        assert!(clock_time("09:00").is_ok());
        assert!(clock_time("23:59").is_ok());
        assert!(clock_time("24:00").is_err());
        assert!(clock_time("9am").is_err());
    }

    #[test]
    fn test_normalizers() {
        assert_eq!(normalize_email("  Jane.Doe@Example.COM "), "jane.doe@example.com");
        assert_eq!(clean_optional(Some("  ".into())), None);
        assert_eq!(clean_optional(Some(" Pune ".into())), Some("Pune".to_string()));
    }
}
