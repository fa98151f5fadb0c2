//! Conversion from stored BSON documents to the public wire format.
//!
//! ObjectIds flatten to their hex form so clients see `"_id": "65f0..."`
//! rather than extended-JSON `{"$oid": ...}`.

use mongodb::bson::{Bson, Document};
use serde_json::{Map, Number, Value};

pub fn document_to_json(doc: &Document) -> Value {
    let mut map = Map::with_capacity(doc.len());
    for (key, value) in doc {
        map.insert(key.clone(), bson_to_json(value));
    }
    Value::Object(map)
}

pub fn array_to_json(items: &[Bson]) -> Value {
    Value::Array(items.iter().map(bson_to_json).collect())
}

fn bson_to_json(value: &Bson) -> Value {
    match value {
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::String(s) => Value::String(s.clone()),
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::Int32(i) => Value::Number((*i).into()),
        Bson::Int64(i) => Value::Number((*i).into()),
        Bson::Double(d) => Number::from_f64(*d).map(Value::Number).unwrap_or(Value::Null),
        Bson::Array(items) => Value::Array(items.iter().map(bson_to_json).collect()),
        Bson::Document(doc) => document_to_json(doc),
        Bson::DateTime(dt) => dt
            .try_to_rfc3339_string()
            .map(Value::String)
            .unwrap_or(Value::Null),
        Bson::Null => Value::Null,
        other => serde_json::to_value(other).unwrap_or(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, oid::ObjectId};

    #[test]
    fn object_ids_flatten_to_hex_strings() {
        let oid = ObjectId::parse_str("65f0123456789abcdef01234").unwrap();
        let json = document_to_json(&doc! { "_id": oid, "name": "Alice" });
        assert_eq!(json["_id"], "65f0123456789abcdef01234");
        assert_eq!(json["name"], "Alice");
    }

    #[test]
    fn nested_arrays_and_documents_convert() {
        let oid = ObjectId::parse_str("65f0123456789abcdef01234").unwrap();
        let json = document_to_json(&doc! {
            "volunteers": [oid],
            "rating": { "value": 4.5, "count": 12_i64 },
            "approved": true,
        });
        assert_eq!(json["volunteers"][0], "65f0123456789abcdef01234");
        assert_eq!(json["rating"]["value"], 4.5);
        assert_eq!(json["rating"]["count"], 12);
        assert_eq!(json["approved"], true);
    }
}
