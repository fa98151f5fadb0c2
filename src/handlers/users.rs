//! User accounts: public listing and registration, guarded profile updates
//! and admin-only deletion. The password field never leaves the store: every
//! read projection excludes it, and updates refuse to touch it.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use mongodb::bson::{doc, Bson, Document};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::Role;
use crate::crud;
use crate::error::ApiError;
use crate::extract::{coerce_json_fields, MediaForm};
use crate::schema::user::UserSchema;
use crate::schema::{DocumentSchema, Mode};
use crate::store::{parse_object_id, Collection, StoreError};

use super::page_params;

/// Fields that may arrive JSON-encoded from multipart clients.
const COERCED_FIELDS: &[&str] = &[
    "tags",
    "media",
    "notifications",
    "volunteers",
    "approved",
    "rating",
    "events",
];

fn store_failure(context: &'static str) -> impl FnOnce(StoreError) -> ApiError {
    move |e| {
        tracing::error!("store error: {}", e);
        ApiError::internal(context)
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    page: Option<String>,
    limit: Option<String>,
    #[serde(rename = "type")]
    user_type: Option<String>,
    approved: Option<String>,
}

/// GET /api/v1/users - paginated listing with optional equality filters.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, limit) = page_params(query.page.as_deref(), query.limit.as_deref(), &state.config.api);

    let mut filter = Document::new();
    if let Some(user_type) = &query.user_type {
        filter.insert("type", user_type.as_str());
    }
    if let Some(approved) = &query.approved {
        filter.insert("approved", approved == "true");
    }

    let result = crud::read_page(
        &state.store,
        Collection::Users,
        filter,
        Some(doc! { "password": 0 }),
        page,
        limit,
    )
    .await?;
    Ok(Json(result))
}

/// POST /api/v1/users - registration.
///
/// The plaintext password is validated against the policy, then hashed;
/// organizers are created unapproved and wait for admin review. The
/// duplicate-email check and the insert are not transactionally guarded -
/// a racing registration with the same email can slip through (documented
/// limitation).
pub async fn register(
    State(state): State<AppState>,
    MediaForm(mut body): MediaForm,
) -> Result<impl IntoResponse, ApiError> {
    coerce_json_fields(&mut body, COERCED_FIELDS)?;

    let mut document = UserSchema::validate(&body, Mode::Create).map_err(ApiError::validation)?;

    let email = document.get_str("email").unwrap_or_default().to_string();
    if state
        .store
        .find_one(Collection::Users, doc! { "email": &email })
        .await
        .map_err(store_failure("Internal server error"))?
        .is_some()
    {
        return Err(ApiError::bad_request(
            "User with the same email already exists",
        ));
    }

    let plaintext = document.get_str("password").unwrap_or_default().to_string();
    let hashed = bcrypt::hash(plaintext, state.config.security.bcrypt_cost)?;
    document.insert("password", hashed);

    let approved = document.get_str("type").map(|t| t != "organizer").unwrap_or(true);
    document.insert("approved", approved);

    let created = crud::create_validated(
        &state.store,
        Collection::Users,
        document,
        Some((&state.tokens, Role::Volunteer)),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User created successfully",
            "id": created.id.to_hex(),
            "token": created.token,
        })),
    ))
}

/// GET /api/v1/users/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let oid = parse_object_id(&id).ok_or_else(ApiError::invalid_id)?;
    let result = crud::read_page(
        &state.store,
        Collection::Users,
        doc! { "_id": oid },
        Some(doc! { "password": 0 }),
        1,
        state.config.api.default_page_limit,
    )
    .await?;
    Ok(Json(result))
}

/// PATCH /api/v1/users/:id - merge-patch profile update with side effects.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    MediaForm(mut body): MediaForm,
) -> Result<impl IntoResponse, ApiError> {
    coerce_json_fields(&mut body, COERCED_FIELDS)?;

    if body.get("password").is_some() {
        return Err(ApiError::bad_request(
            "Passwords can't be modified through this route",
        ));
    }

    // Assigning a type re-derives approval: organizers re-enter admin review.
    let mut assigned_type = None;
    if let Some(map) = body.as_object_mut() {
        if let Some(t) = map.get("type").and_then(Value::as_str).map(str::to_string) {
            map.insert("approved".to_string(), Value::Bool(t != "organizer"));
            assigned_type = Some(t);
        }
    }

    let oid = parse_object_id(&id).ok_or_else(ApiError::invalid_id)?;

    let mut patch = UserSchema::validate(&body, Mode::Update).map_err(ApiError::validation)?;
    patch.remove("password");

    let prior = state
        .store
        .find_one(Collection::Users, doc! { "_id": oid })
        .await
        .map_err(store_failure("Error updating users"))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    crud::apply_patch(&state.store, Collection::Users, oid, patch.clone()).await?;

    // Side effects run after a successful write; mail is fire-and-forget and
    // never fails the response.
    let email = patch
        .get_str("email")
        .ok()
        .or_else(|| prior.get_str("email").ok())
        .unwrap_or_default()
        .to_string();

    if let Ok(notifications) = patch.get_array("notifications") {
        // Only the last entry of the new array is mailed - this is not a
        // diff against the stored array. Preserved as-is; see DESIGN.md.
        if let Some(Bson::Document(last)) = notifications.last() {
            if !email.is_empty() {
                state.notifier.send_notification(
                    &email,
                    last.get_str("title").unwrap_or(""),
                    last.get_str("desc").unwrap_or(""),
                );
            }
        }
    }

    let was_approved = prior.get_bool("approved").unwrap_or(false);
    let now_approved = patch.get_bool("approved").unwrap_or(was_approved);
    if now_approved && !was_approved && !email.is_empty() {
        state.notifier.send_approval(&email);
    }

    let mut response = json!({ "message": "User updated", "id": id });
    if assigned_type.as_deref() == Some("organizer") {
        response["token"] = Value::String(state.tokens.issue(&id, Role::Organizer)?);
    }
    Ok(Json(response))
}

/// DELETE /api/v1/users/:id - admin only.
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    crud::delete(&state.store, Collection::Users, &id).await?;
    Ok(Json(json!({ "message": "User deleted" })))
}
