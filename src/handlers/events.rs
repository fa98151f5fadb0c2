//! Events: public browsing, organizer-gated creation and deletion,
//! member-wide updates (volunteers join by patching themselves in).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use mongodb::bson::{doc, Document};
use serde::Deserialize;
use serde_json::json;

use crate::app::AppState;
use crate::crud;
use crate::error::ApiError;
use crate::extract::{coerce_json_fields, FormBody, MediaForm};
use crate::schema::event::EventSchema;
use crate::store::{parse_object_id, Collection};

use super::page_params;

const COERCED_FIELDS: &[&str] = &["tags", "media", "volunteers", "approved"];

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    page: Option<String>,
    limit: Option<String>,
    /// Comma-separated tag filter; an event matches when it carries any of
    /// the named tags.
    tags: Option<String>,
}

/// GET /api/v1/events
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, limit) = page_params(query.page.as_deref(), query.limit.as_deref(), &state.config.api);

    let filter = match query.tags.as_deref() {
        Some(tags) if !tags.is_empty() => {
            let tags: Vec<&str> = tags.split(',').map(str::trim).filter(|t| !t.is_empty()).collect();
            doc! { "tags": { "$in": tags } }
        }
        _ => Document::new(),
    };

    let result = crud::read_page(&state.store, Collection::Events, filter, None, page, limit).await?;
    Ok(Json(result))
}

/// POST /api/v1/events - admin/organizer only.
pub async fn create(
    State(state): State<AppState>,
    MediaForm(mut body): MediaForm,
) -> Result<impl IntoResponse, ApiError> {
    coerce_json_fields(&mut body, COERCED_FIELDS)?;

    let created = crud::create::<EventSchema>(&state.store, &body, None).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Event created successfully",
            "id": created.id.to_hex(),
        })),
    ))
}

/// GET /api/v1/events/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let oid = parse_object_id(&id).ok_or_else(ApiError::invalid_id)?;
    let result = crud::read_page(
        &state.store,
        Collection::Events,
        doc! { "_id": oid },
        None,
        1,
        state.config.api.default_page_limit,
    )
    .await?;
    Ok(Json(result))
}

/// PATCH /api/v1/events/:id - text-only form or JSON, no file uploads.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    FormBody(mut body): FormBody,
) -> Result<impl IntoResponse, ApiError> {
    coerce_json_fields(&mut body, COERCED_FIELDS)?;

    crud::update::<EventSchema>(&state.store, &id, &body).await?;
    Ok(Json(json!({ "message": "Event updated", "id": id })))
}

/// DELETE /api/v1/events/:id - admin/organizer only.
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    crud::delete(&state.store, Collection::Events, &id).await?;
    Ok(Json(json!({ "message": "Event deleted" })))
}
