//! Notification entries, embedded as an array field on user and admin
//! documents rather than stored as their own collection.

use mongodb::bson::Document;
use serde_json::Value;

use super::{is_valid_date, FieldError};

/// Validate one notification object. `path` locates the entry for error
/// reporting ("notifications.2", or "1" when the array itself is the body).
pub fn validate_one(path: &str, value: &Value, errors: &mut Vec<FieldError>) -> Option<Document> {
    let map = match value {
        Value::Object(map) => map,
        _ => {
            errors.push(FieldError::invalid_type(path, "object"));
            return None;
        }
    };

    let mut doc = Document::new();
    let mut ok = true;

    for key in ["title", "desc"] {
        let field_path = join(path, key);
        match map.get(key) {
            Some(Value::String(s)) if !s.is_empty() => {
                doc.insert(key, s.as_str());
            }
            Some(Value::String(_)) => {
                errors.push(FieldError::new(
                    field_path,
                    "too_small",
                    "String must contain at least 1 character(s)",
                ));
                ok = false;
            }
            Some(_) => {
                errors.push(FieldError::invalid_type(&field_path, "string"));
                ok = false;
            }
            None => {
                errors.push(FieldError::required(&field_path));
                ok = false;
            }
        }
    }

    let date_path = join(path, "date");
    match map.get("date") {
        Some(Value::String(s)) if is_valid_date(s) => {
            doc.insert("date", s.as_str());
        }
        Some(Value::String(_)) => {
            errors.push(FieldError::new(date_path, "custom", "Invalid date format"));
            ok = false;
        }
        Some(_) => {
            errors.push(FieldError::invalid_type(&date_path, "string"));
            ok = false;
        }
        None => {
            errors.push(FieldError::required(&date_path));
            ok = false;
        }
    }

    ok.then_some(doc)
}

pub fn validate_array(
    path: &str,
    value: &Value,
    errors: &mut Vec<FieldError>,
) -> Option<Vec<Document>> {
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
        let item_path = join(path, &i.to_string());
        match validate_one(&item_path, item, errors) {
            Some(doc) => out.push(doc),
            None => ok = false,
        }
    }
    ok.then_some(out)
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}
