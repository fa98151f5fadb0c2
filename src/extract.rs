//! Request-body extractors.
//!
//! Bodies arrive either as JSON or as multipart form data, and list-valued
//! fields may arrive JSON-encoded inside a form field. Everything is
//! normalized into one structured `serde_json::Value` here, at the boundary,
//! before validation ever sees it.

use axum::async_trait;
use axum::extract::{FromRef, FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::Json;
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::media::{self, MediaStore};

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("multipart/form-data"))
        .unwrap_or(false)
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::bad_request(format!("Malformed multipart body: {}", err))
}

/// A JSON object or text-only multipart form. File parts are rejected; use
/// [`MediaForm`] on routes that accept uploads.
pub struct FormBody(pub Value);

#[async_trait]
impl<S> FromRequest<S> for FormBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_multipart(&req) {
            let mut multipart = Multipart::from_request(req, state)
                .await
                .map_err(|_| ApiError::bad_request("Malformed multipart body"))?;

            let mut map = Map::new();
            while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
                if field.file_name().is_some() {
                    return Err(ApiError::bad_request("Unexpected file upload"));
                }
                let name = field.name().unwrap_or_default().to_string();
                let text = field.text().await.map_err(multipart_error)?;
                map.insert(name, Value::String(text));
            }
            Ok(FormBody(Value::Object(map)))
        } else {
            let Json(value) = Json::<Value>::from_request(req, state)
                .await
                .map_err(|_| ApiError::bad_request("Invalid JSON body"))?;
            Ok(FormBody(value))
        }
    }
}

/// Multipart body with image uploads, or a plain JSON body.
///
/// Each file part (field name `media`) is checked against the image
/// allow-list and persisted under a generated name; the stored names are
/// appended to the body's `media` list, which is decoded from a JSON string
/// first when it arrived serialized.
pub struct MediaForm(pub Value);

#[async_trait]
impl<S> FromRequest<S> for MediaForm
where
    MediaStore: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let store = MediaStore::from_ref(state);

        let (mut body, stored) = if is_multipart(&req) {
            let mut multipart = Multipart::from_request(req, state)
                .await
                .map_err(|_| ApiError::bad_request("Malformed multipart body"))?;

            let mut map = Map::new();
            let mut stored = Vec::new();
            while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
                let name = field.name().unwrap_or_default().to_string();
                if let Some(original) = field.file_name().map(str::to_string) {
                    if name != "media" {
                        return Err(ApiError::bad_request("Unexpected file field"));
                    }
                    let content_type = field.content_type().unwrap_or_default().to_string();
                    // One bad file rejects the whole request, before anything
                    // else from it is persisted.
                    if !media::is_allowed_type(&content_type) {
                        return Err(ApiError::bad_request(
                            "File must be an image (JPEG, PNG, or GIF)",
                        ));
                    }
                    let bytes = field.bytes().await.map_err(multipart_error)?;
                    stored.push(store.store(&original, &bytes).await?);
                } else {
                    let text = field.text().await.map_err(multipart_error)?;
                    map.insert(name, Value::String(text));
                }
            }
            (Value::Object(map), stored)
        } else {
            let Json(value) = Json::<Value>::from_request(req, state)
                .await
                .map_err(|_| ApiError::bad_request("Invalid JSON body"))?;
            (value, Vec::new())
        };

        merge_media_list(&mut body, stored)?;
        Ok(MediaForm(body))
    }
}

/// Decode a JSON-encoded `media` field if present, default it to an empty
/// list, and append the filenames stored during this request.
fn merge_media_list(body: &mut Value, stored: Vec<String>) -> Result<(), ApiError> {
    let Some(map) = body.as_object_mut() else {
        return Ok(());
    };

    let mut list = match map.remove("media") {
        Some(Value::String(s)) => match serde_json::from_str::<Value>(&s) {
            Ok(Value::Array(items)) => items,
            _ => return Err(ApiError::bad_request("Invalid format for media")),
        },
        Some(Value::Array(items)) => items,
        Some(_) => return Err(ApiError::bad_request("Invalid format for media")),
        None => Vec::new(),
    };
    list.extend(stored.into_iter().map(Value::String));
    map.insert("media".to_string(), Value::Array(list));
    Ok(())
}

/// Decode list/object fields that arrived as JSON-encoded strings (form
/// fields can only carry text). Malformed JSON in any named field is a 400.
pub fn coerce_json_fields(body: &mut Value, fields: &[&str]) -> Result<(), ApiError> {
    let Some(map) = body.as_object_mut() else {
        return Ok(());
    };

    for &field in fields {
        let parsed = match map.get(field) {
            Some(Value::String(s)) => serde_json::from_str::<Value>(s)
                .map_err(|_| ApiError::bad_request(format!("Invalid format for {}", field)))?,
            _ => continue,
        };
        map.insert(field.to_string(), parsed);
    }
    Ok(())
}
