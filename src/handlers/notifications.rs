//! Notifications live as an embedded array on user and admin documents; the
//! `collection` query parameter selects which account collection to address.

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Json};
use mongodb::bson::doc;
use serde::Deserialize;
use serde_json::Value;

use crate::api::format::{array_to_json, document_to_json};
use crate::app::AppState;
use crate::error::ApiError;
use crate::extract::{coerce_json_fields, FormBody};
use crate::schema::notification;
use crate::store::{parse_object_id, Collection, StoreError};

#[derive(Debug, Deserialize)]
pub struct CollectionQuery {
    pub collection: Option<String>,
}

fn target_collection(query: &CollectionQuery) -> Result<Collection, ApiError> {
    let name = query
        .collection
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("Collection is required"))?;
    Collection::parse(name)
        .ok_or_else(|| ApiError::bad_request(format!("Unknown collection '{}'", name)))
}

fn store_failure(context: &'static str) -> impl FnOnce(StoreError) -> ApiError {
    move |e| {
        tracing::error!("store error: {}", e);
        ApiError::internal(context)
    }
}

/// GET /api/v1/notifications/:id - the account's notification list.
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<CollectionQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let collection = target_collection(&query)?;
    let oid = parse_object_id(&id).ok_or_else(ApiError::invalid_id)?;

    let document = state
        .store
        .find_one(collection, doc! { "_id": oid })
        .await
        .map_err(store_failure("Error reading notifications"))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let notifications = document
        .get_array("notifications")
        .map(|items| array_to_json(items))
        .unwrap_or_else(|_| Value::Array(Vec::new()));
    Ok(Json(notifications))
}

/// PATCH /api/v1/notifications/:id - replace the account's notification
/// array with a validated one. No email is sent on this path; the user
/// profile update is the flow that mails notifications out.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<CollectionQuery>,
    FormBody(mut body): FormBody,
) -> Result<impl IntoResponse, ApiError> {
    let collection = target_collection(&query)?;
    let oid = parse_object_id(&id).ok_or_else(ApiError::invalid_id)?;

    coerce_json_fields(&mut body, &["notifications"])?;
    let value = body
        .get("notifications")
        .ok_or_else(|| ApiError::bad_request("No notifications provided"))?;

    let mut errors = Vec::new();
    let Some(validated) = notification::validate_array("", value, &mut errors) else {
        return Err(ApiError::validation(errors));
    };

    let outcome = state
        .store
        .update_one(
            collection,
            doc! { "_id": oid },
            doc! { "notifications": validated.clone() },
        )
        .await
        .map_err(store_failure("Error updating document"))?;
    if outcome.matched == 0 {
        return Err(ApiError::not_found("Document not found"));
    }

    Ok(Json(Value::Array(
        validated.iter().map(document_to_json).collect(),
    )))
}
