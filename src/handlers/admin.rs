//! Admin account lookup, gated to the admin role.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json};
use mongodb::bson::doc;

use crate::app::AppState;
use crate::crud;
use crate::error::ApiError;
use crate::store::{parse_object_id, Collection};

/// GET /api/v1/admin/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let oid = parse_object_id(&id).ok_or_else(ApiError::invalid_id)?;
    let result = crud::read_page(
        &state.store,
        Collection::Admin,
        doc! { "_id": oid },
        Some(doc! { "password": 0 }),
        1,
        state.config.api.default_page_limit,
    )
    .await?;
    Ok(Json(result))
}
