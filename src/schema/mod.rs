//! Declarative request validation.
//!
//! One schema per resource type, with a create/update mode switch instead of
//! runtime schema mutation: update mode makes every field optional and always
//! excludes `password` from acceptance. Validators emit the validated (never
//! the raw) document, applying create-mode defaults and dropping unknown
//! fields.

use mongodb::bson::{Bson, Document};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::store::Collection;

pub mod event;
pub mod notification;
pub mod user;

/// Whether a body is validated as a full document or a partial patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Update,
}

/// One field-level validation failure, serialized as
/// `{"message", "path", "type"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub message: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: path.into(),
            kind: kind.into(),
        }
    }

    pub fn required(path: &str) -> Self {
        Self::new(path, "invalid_type", "Required")
    }

    pub fn invalid_type(path: &str, expected: &str) -> Self {
        Self::new(path, "invalid_type", format!("Expected {}", expected))
    }
}

/// Ties a validator to its collection so the generic CRUD dispatcher can be
/// parameterized by a single type.
pub trait DocumentSchema {
    const COLLECTION: Collection;

    fn validate(body: &Value, mode: Mode) -> Result<Document, Vec<FieldError>>;
}

pub(crate) fn body_object(body: &Value) -> Result<&Map<String, Value>, Vec<FieldError>> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(vec![FieldError::invalid_type("", "object")]),
    }
}

pub(crate) fn string_array(
    path: &str,
    value: &Value,
    errors: &mut Vec<FieldError>,
) -> Option<Vec<String>> {
    let items = match value {
        Value::Array(items) => items,
        _ => {
            errors.push(FieldError::invalid_type(path, "array"));
            return None;
        }
    };

    let mut out = Vec::with_capacity(items.len());
    let mut ok = true;
    for (i, item) in items.iter().enumerate() {
        match item {
            Value::String(s) => out.push(s.clone()),
            _ => {
                errors.push(FieldError::invalid_type(&format!("{}.{}", path, i), "string"));
                ok = false;
            }
        }
    }
    ok.then_some(out)
}

/// Accepts RFC 3339 timestamps and the common date-only / naive datetime
/// forms clients actually send.
pub(crate) fn is_valid_date(s: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(s).is_ok()
        || chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
        || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").is_ok()
}

pub(crate) fn is_valid_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = s.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

const PASSWORD_SPECIALS: &str = "@$!%.*?&-_=+#^";

pub(crate) fn password_error(value: &str) -> Option<FieldError> {
    if value.len() < 8 {
        return Some(FieldError::new(
            "password",
            "too_small",
            "Password must be at least 8 characters long",
        ));
    }

    let has_upper = value.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = value.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = value.chars().any(|c| c.is_ascii_digit());
    let has_special = value.chars().any(|c| PASSWORD_SPECIALS.contains(c));

    if has_upper && has_lower && has_digit && has_special {
        None
    } else {
        Some(FieldError::new(
            "password",
            "custom",
            "Password must contain at least one uppercase letter, one lowercase letter, one number, and one special character",
        ))
    }
}

pub(crate) fn number_to_bson(n: &serde_json::Number) -> Bson {
    if let Some(i) = n.as_i64() {
        Bson::Int64(i)
    } else {
        Bson::Double(n.as_f64().unwrap_or(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_validation() {
        assert!(is_valid_date("2024-03-01"));
        assert!(is_valid_date("2024-03-01T10:30:00"));
        assert!(is_valid_date("2024-03-01T10:30:00Z"));
        assert!(is_valid_date("2024-03-01T10:30:00+02:00"));
        assert!(!is_valid_date("not a date"));
        assert!(!is_valid_date("2024-13-45"));
        assert!(!is_valid_date(""));
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("first.last@sub.example.org"));
        assert!(!is_valid_email("missing-at.com"));
        assert!(!is_valid_email("@no-local.com"));
        assert!(!is_valid_email("no-domain@"));
        assert!(!is_valid_email("no-dot@domain"));
        assert!(!is_valid_email("spa ce@b.com"));
    }

    #[test]
    fn password_policy() {
        assert!(password_error("Abcdef1!").is_none());
        assert!(password_error("short").is_some());
        assert!(password_error("alllowercase1!").is_some());
        assert!(password_error("ALLUPPERCASE1!").is_some());
        assert!(password_error("NoDigits!!").is_some());
        assert!(password_error("NoSpecials1").is_some());
    }

    #[test]
    fn string_array_reports_indexed_paths() {
        let mut errors = Vec::new();
        let value = serde_json::json!(["ok", 3, "fine"]);
        assert!(string_array("tags", &value, &mut errors).is_none());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "tags.1");
    }
}
