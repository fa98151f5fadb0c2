//! User account schema.
//!
//! Accounts register as volunteers or organizers; admin accounts live in the
//! separate `admin` collection and are never created through this schema.
//! `password` is only accepted in create mode - the update derivation
//! excludes it entirely, and profile-update handlers reject it explicitly
//! before validation even runs.

use mongodb::bson::{doc, Bson, Document};
use serde_json::Value;

use super::{
    body_object, is_valid_date, is_valid_email, notification, number_to_bson, password_error,
    string_array, DocumentSchema, FieldError, Mode,
};
use crate::store::Collection;

pub struct UserSchema;

impl DocumentSchema for UserSchema {
    const COLLECTION: Collection = Collection::Users;

    fn validate(body: &Value, mode: Mode) -> Result<Document, Vec<FieldError>> {
        validate(body, mode)
    }
}

pub fn validate(body: &Value, mode: Mode) -> Result<Document, Vec<FieldError>> {
    let map = body_object(body)?;
    let mut errors = Vec::new();
    let mut doc = Document::new();
    let create = mode == Mode::Create;

    match map.get("name") {
        Some(Value::String(s)) => {
            doc.insert("name", s.as_str());
        }
        Some(_) => errors.push(FieldError::invalid_type("name", "string")),
        None if create => {
            doc.insert("name", "");
        }
        None => {}
    }

    match map.get("email") {
        Some(Value::String(s)) if is_valid_email(s) => {
            doc.insert("email", s.as_str());
        }
        Some(Value::String(_)) => {
            errors.push(FieldError::new("email", "invalid_string", "Invalid email"))
        }
        Some(_) => errors.push(FieldError::invalid_type("email", "string")),
        None if create => errors.push(FieldError::required("email")),
        None => {}
    }

    if create {
        match map.get("password") {
            Some(Value::String(s)) => match password_error(s) {
                None => {
                    doc.insert("password", s.as_str());
                }
                Some(err) => errors.push(err),
            },
            Some(_) => errors.push(FieldError::invalid_type("password", "string")),
            None => errors.push(FieldError::required("password")),
        }
    }

    match map.get("desc") {
        Some(Value::String(s)) => {
            doc.insert("desc", s.as_str());
        }
        Some(_) => errors.push(FieldError::invalid_type("desc", "string")),
        None if create => {
            doc.insert("desc", "");
        }
        None => {}
    }

    match map.get("tags") {
        Some(v) => {
            if let Some(items) = string_array("tags", v, &mut errors) {
                doc.insert("tags", items);
            }
        }
        None if create => {
            doc.insert("tags", Vec::<String>::new());
        }
        None => {}
    }

    match map.get("notifications") {
        Some(v) => {
            if let Some(items) = notification::validate_array("notifications", v, &mut errors) {
                doc.insert("notifications", items);
            }
        }
        None if create => {
            doc.insert("notifications", Bson::Array(Vec::new()));
        }
        None => {}
    }

    match map.get("type") {
        Some(Value::String(s)) if s == "organizer" || s == "volunteer" => {
            doc.insert("type", s.as_str());
        }
        Some(Value::String(_)) => errors.push(FieldError::new(
            "type",
            "invalid_enum_value",
            "Invalid enum value. Expected 'organizer' | 'volunteer'",
        )),
        Some(_) => errors.push(FieldError::invalid_type("type", "string")),
        None if create => {
            doc.insert("type", "volunteer");
        }
        None => {}
    }

    match map.get("media") {
        Some(v) => {
            if let Some(items) = string_array("media", v, &mut errors) {
                doc.insert("media", items);
            }
        }
        None if create => {
            doc.insert("media", Vec::<String>::new());
        }
        None => {}
    }

    match map.get("rating") {
        Some(Value::Object(o)) => {
            let mut rating = Document::new();
            let mut ok = true;
            match o.get("value") {
                Some(Value::Number(n)) => {
                    rating.insert("value", number_to_bson(n));
                }
                _ => {
                    errors.push(FieldError::invalid_type("rating.value", "number"));
                    ok = false;
                }
            }
            match o.get("count") {
                Some(Value::Number(n)) => {
                    rating.insert("count", number_to_bson(n));
                }
                _ => {
                    errors.push(FieldError::invalid_type("rating.count", "number"));
                    ok = false;
                }
            }
            if ok {
                doc.insert("rating", rating);
            }
        }
        Some(_) => errors.push(FieldError::invalid_type("rating", "object")),
        None if create => {
            doc.insert("rating", doc! { "value": 0_i64, "count": 0_i64 });
        }
        None => {}
    }

    match map.get("joined") {
        Some(Value::String(s)) if is_valid_date(s) => {
            doc.insert("joined", s.as_str());
        }
        Some(Value::String(_)) => {
            errors.push(FieldError::new("joined", "custom", "Invalid date format"))
        }
        Some(_) => errors.push(FieldError::invalid_type("joined", "string")),
        None if create => errors.push(FieldError::required("joined")),
        None => {}
    }

    match map.get("approved") {
        Some(Value::Bool(b)) => {
            doc.insert("approved", *b);
        }
        Some(_) => errors.push(FieldError::invalid_type("approved", "boolean")),
        None if create => {
            doc.insert("approved", true);
        }
        None => {}
    }

    if errors.is_empty() {
        Ok(doc)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_body() -> Value {
        json!({
            "email": "a@b.com",
            "password": "Abcdef1!",
            "joined": "2024-03-01",
        })
    }

    #[test]
    fn create_applies_defaults() {
        let doc = validate(&full_body(), Mode::Create).unwrap();
        assert_eq!(doc.get_str("name").unwrap(), "");
        assert_eq!(doc.get_str("type").unwrap(), "volunteer");
        assert_eq!(doc.get_bool("approved").unwrap(), true);
        assert!(doc.get_array("tags").unwrap().is_empty());
        assert!(doc.get_array("media").unwrap().is_empty());
        assert!(doc.get_array("notifications").unwrap().is_empty());
        let rating = doc.get_document("rating").unwrap();
        assert_eq!(rating.get_i64("value").unwrap(), 0);
        assert_eq!(rating.get_i64("count").unwrap(), 0);
    }

    #[test]
    fn create_requires_email_password_joined() {
        let errors = validate(&json!({}), Mode::Create).unwrap_err();
        let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"email"));
        assert!(paths.contains(&"password"));
        assert!(paths.contains(&"joined"));
    }

    #[test]
    fn create_rejects_weak_password() {
        let mut body = full_body();
        body["password"] = json!("weakpass");
        let errors = validate(&body, Mode::Create).unwrap_err();
        assert_eq!(errors[0].path, "password");
    }

    #[test]
    fn create_rejects_invalid_joined_date() {
        let mut body = full_body();
        body["joined"] = json!("soon");
        let errors = validate(&body, Mode::Create).unwrap_err();
        assert_eq!(errors[0].path, "joined");
        assert_eq!(errors[0].message, "Invalid date format");
    }

    #[test]
    fn update_accepts_partial_payloads() {
        let doc = validate(&json!({ "desc": "hello" }), Mode::Update).unwrap();
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.get_str("desc").unwrap(), "hello");
    }

    #[test]
    fn update_never_emits_password() {
        let doc = validate(&json!({ "password": "Abcdef1!", "name": "x" }), Mode::Update).unwrap();
        assert!(doc.get("password").is_none());
        assert_eq!(doc.get_str("name").unwrap(), "x");
    }

    #[test]
    fn unknown_fields_are_dropped() {
        let mut body = full_body();
        body["role_override"] = json!("admin");
        let doc = validate(&body, Mode::Create).unwrap();
        assert!(doc.get("role_override").is_none());
    }

    #[test]
    fn type_enum_is_closed() {
        let errors = validate(&json!({ "type": "admin" }), Mode::Update).unwrap_err();
        assert_eq!(errors[0].kind, "invalid_enum_value");
    }

    #[test]
    fn invalid_notification_entries_are_rejected() {
        let body = json!({
            "notifications": [{ "title": "", "date": "2024-03-01", "desc": "d" }]
        });
        let errors = validate(&body, Mode::Update).unwrap_err();
        assert_eq!(errors[0].path, "notifications.0.title");
    }
}
