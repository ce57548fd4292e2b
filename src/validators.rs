/// Input validators
///
/// Length limits bound the work done on attacker-supplied input; the
/// format checks keep obviously bad values away from storage.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 3;
const MAX_NAME_LENGTH: usize = 256;
const MAX_DESCRIPTION_LENGTH: usize = 2000;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).expect("email regex is valid");
}

/// Trim and lowercase an email address after checking its shape
pub fn normalize_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }
    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }
    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }
    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    Ok(trimmed.to_lowercase())
}

/// Validate a display or project name
pub fn validate_name(field: &str, name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field.to_string()));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong(field.to_string(), MAX_NAME_LENGTH));
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidFormat(field.to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validate an optional free-text description; blank becomes `None`
pub fn validate_description(description: Option<&str>) -> Result<Option<String>, ValidationError> {
    match description.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) if text.chars().count() > MAX_DESCRIPTION_LENGTH => Err(
            ValidationError::TooLong("description".to_string(), MAX_DESCRIPTION_LENGTH),
        ),
        Some(text) => Ok(Some(text.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert_eq!(normalize_email("a@x.com").unwrap(), "a@x.com");
        assert_eq!(normalize_email("  User.Name+tag@Example.COM ").unwrap(), "user.name+tag@example.com");
    }

    #[test]
    fn test_invalid_emails() {
        for email in ["", "   ", "notanemail", "user@", "@example.com", "user@@example.com"] {
            assert!(normalize_email(email).is_err(), "accepted {:?}", email);
        }
    }

    #[test]
    fn test_email_too_long() {
        let email = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(normalize_email(&email), Err(ValidationError::TooLong(_, _))));
    }

    #[test]
    fn test_name_validation() {
        assert_eq!(validate_name("name", "  Ada  ").unwrap(), "Ada");
        assert!(validate_name("name", "").is_err());
        assert!(validate_name("name", "bad\u{0007}name").is_err());
        assert!(validate_name("name", &"n".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_description_validation() {
        assert_eq!(validate_description(None).unwrap(), None);
        assert_eq!(validate_description(Some("  ")).unwrap(), None);
        assert_eq!(validate_description(Some(" notes ")).unwrap().as_deref(), Some("notes"));
        assert!(validate_description(Some(&"d".repeat(MAX_DESCRIPTION_LENGTH + 1))).is_err());
    }
}
