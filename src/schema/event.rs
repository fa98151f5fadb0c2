//! Event schema. `approved` here is the list of volunteer ids the organizer
//! has accepted, unlike the boolean approval flag on user accounts.

use mongodb::bson::Document;
use serde_json::Value;

use super::{body_object, is_valid_date, string_array, DocumentSchema, FieldError, Mode};
use crate::store::Collection;

pub struct EventSchema;

impl DocumentSchema for EventSchema {
    const COLLECTION: Collection = Collection::Events;

    fn validate(body: &Value, mode: Mode) -> Result<Document, Vec<FieldError>> {
        validate(body, mode)
    }
}

pub fn validate(body: &Value, mode: Mode) -> Result<Document, Vec<FieldError>> {
    let map = body_object(body)?;
    let mut errors = Vec::new();
    let mut doc = Document::new();
    let create = mode == Mode::Create;

    for key in ["title", "desc", "location", "organizer_id"] {
        match map.get(key) {
            Some(Value::String(s)) => {
                doc.insert(key, s.as_str());
            }
            Some(_) => errors.push(FieldError::invalid_type(key, "string")),
            None if create => errors.push(FieldError::required(key)),
            None => {}
        }
    }

    match map.get("date") {
        Some(Value::String(s)) if is_valid_date(s) => {
            doc.insert("date", s.as_str());
        }
        Some(Value::String(_)) => {
            errors.push(FieldError::new("date", "custom", "Invalid date format"))
        }
        Some(_) => errors.push(FieldError::invalid_type("date", "string")),
        None if create => errors.push(FieldError::required("date")),
        None => {}
    }

    match map.get("pricing") {
        Some(Value::String(s)) => {
            doc.insert("pricing", s.as_str());
        }
        Some(_) => errors.push(FieldError::invalid_type("pricing", "string")),
        None if create => {
            doc.insert("pricing", "Free");
        }
        None => {}
    }

    for key in ["tags", "media", "volunteers", "approved"] {
        match map.get(key) {
            Some(v) => {
                if let Some(items) = string_array(key, v, &mut errors) {
                    doc.insert(key, items);
                }
            }
            None if create => {
                doc.insert(key, Vec::<String>::new());
            }
            None => {}
        }
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
            "title": "Beach cleanup",
            "desc": "Bring gloves",
            "date": "2024-06-15",
            "location": "North pier",
            "organizer_id": "65f0123456789abcdef01234",
        })
    }

    #[test]
    fn create_applies_defaults() {
        let doc = validate(&full_body(), Mode::Create).unwrap();
        assert_eq!(doc.get_str("pricing").unwrap(), "Free");
        assert!(doc.get_array("tags").unwrap().is_empty());
        assert!(doc.get_array("volunteers").unwrap().is_empty());
        assert!(doc.get_array("approved").unwrap().is_empty());
    }

    #[test]
    fn create_requires_core_fields() {
        let errors = validate(&json!({}), Mode::Create).unwrap_err();
        let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
        for required in ["title", "desc", "date", "location", "organizer_id"] {
            assert!(paths.contains(&required), "missing error for {}", required);
        }
    }

    #[test]
    fn invalid_date_is_never_accepted() {
        let mut body = full_body();
        body["date"] = json!("next tuesday");
        let errors = validate(&body, Mode::Create).unwrap_err();
        assert_eq!(errors[0].path, "date");

        let errors = validate(&json!({ "date": "next tuesday" }), Mode::Update).unwrap_err();
        assert_eq!(errors[0].path, "date");
    }

    #[test]
    fn update_accepts_partial_payloads() {
        let doc = validate(&json!({ "location": "South pier" }), Mode::Update).unwrap();
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.get_str("location").unwrap(), "South pier");
    }

    #[test]
    fn approved_is_a_volunteer_id_list() {
        let doc = validate(
            &json!({ "approved": ["65f0123456789abcdef01234"] }),
            Mode::Update,
        )
        .unwrap();
        assert_eq!(doc.get_array("approved").unwrap().len(), 1);
    }
}
