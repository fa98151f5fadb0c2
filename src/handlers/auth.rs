//! Login and OTP flows.
//!
//! All three endpoints address an account by email or by path id, in a
//! caller-chosen account collection (`users` or `admin`).

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Json};
use mongodb::bson::{doc, Bson, Document};
use rand::Rng;
use serde::Deserialize;
use serde_json::json;

use crate::app::AppState;
use crate::auth::Role;
use crate::error::ApiError;
use crate::store::{parse_object_id, Collection, StoreError};

#[derive(Debug, Deserialize)]
pub struct AccountQuery {
    pub email: Option<String>,
    pub password: Option<String>,
    pub otp: Option<String>,
    pub delete: Option<String>,
    pub collection: Option<String>,
}

fn target_collection(query: &AccountQuery) -> Result<Collection, ApiError> {
    let name = query
        .collection
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("Collection is required"))?;
    Collection::parse(name)
        .ok_or_else(|| ApiError::bad_request(format!("Unknown collection '{}'", name)))
}

/// Email wins over the path id when both are present, matching how clients
/// have always called these endpoints.
fn account_filter(email: Option<&str>, id: Option<&str>) -> Result<Document, ApiError> {
    match (email, id) {
        (Some(email), _) => Ok(doc! { "email": email }),
        (None, Some(id)) => parse_object_id(id)
            .map(|oid| doc! { "_id": oid })
            .ok_or_else(ApiError::invalid_id),
        (None, None) => Err(ApiError::bad_request("Email or ID is required")),
    }
}

fn store_failure(context: &'static str) -> impl FnOnce(StoreError) -> ApiError {
    move |e| {
        tracing::error!("store error: {}", e);
        ApiError::internal(context)
    }
}

/// GET /api/v1/auth/login[/:id] - verify credentials and issue a token.
pub async fn login(
    State(state): State<AppState>,
    id: Option<Path<String>>,
    Query(query): Query<AccountQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let collection = target_collection(&query)?;
    let id = id.map(|Path(id)| id);
    let filter = account_filter(query.email.as_deref(), id.as_deref())?;

    let account = state
        .store
        .find_one(collection, filter)
        .await
        .map_err(store_failure("Error logging in"))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    // Accounts created through incomplete paths can lack a hash entirely.
    let Ok(hash) = account.get_str("password") else {
        return Err(ApiError::not_found("User password is missing"));
    };

    let account_type = account.get_str("type").unwrap_or("volunteer");
    let approved = account.get_bool("approved").unwrap_or(false);
    if account_type != "admin" && !approved {
        return Err(ApiError::not_found(
            "Please wait until you are approved before attempting to access the system",
        ));
    }

    let password = query
        .password
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("Password is required"))?;
    if !bcrypt::verify(password, hash)? {
        return Err(ApiError::unauthorized("Invalid password"));
    }

    let role = Role::parse(account_type).ok_or_else(|| {
        tracing::error!("account has unrecognized type '{}'", account_type);
        ApiError::internal("Error logging in")
    })?;
    let user_id = account
        .get_object_id("_id")
        .map(|oid| oid.to_hex())
        .map_err(|_| ApiError::internal("Error logging in"))?;
    let token = state.tokens.issue(&user_id, role)?;

    Ok(Json(json!({
        "message": "Login successful",
        "user_id": user_id,
        "token": token,
        "role": role,
    })))
}

/// GET /api/v1/auth/generate_otp[/:id] - store a fresh 4-digit code on the
/// account and email it. Each generation overwrites (and thereby invalidates)
/// the previous code; no expiry timestamp is stored.
pub async fn generate_otp(
    State(state): State<AppState>,
    id: Option<Path<String>>,
    Query(query): Query<AccountQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let collection = target_collection(&query)?;
    let id = id.map(|Path(id)| id);
    let filter = account_filter(query.email.as_deref(), id.as_deref())?;

    let account = state
        .store
        .find_one(collection, filter.clone())
        .await
        .map_err(store_failure("Error generating otp"))?
        .ok_or_else(|| ApiError::not_found("Document not found"))?;

    let otp: i32 = rand::thread_rng().gen_range(1000..10000);
    state
        .store
        .update_one(collection, filter, doc! { "otp": otp })
        .await
        .map_err(store_failure("Error generating otp"))?;

    // The code goes to the address on the document, which also covers the
    // lookup-by-id form.
    match account.get_str("email") {
        Ok(email) => state.notifier.send_otp(email, otp),
        Err(_) => tracing::warn!("account in {} has no email address, otp not sent", collection),
    }

    Ok(Json(json!({ "message": "Otp generated and sent successfully" })))
}

/// GET /api/v1/auth/verify_otp[/:id] - compare the supplied code against the
/// stored one. Verification is repeatable until the caller asks for the code
/// to be cleared with `delete`.
pub async fn verify_otp(
    State(state): State<AppState>,
    id: Option<Path<String>>,
    Query(query): Query<AccountQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let collection = target_collection(&query)?;
    let id = id.map(|Path(id)| id);
    let filter = account_filter(query.email.as_deref(), id.as_deref())?;

    let account = state
        .store
        .find_one(collection, filter.clone())
        .await
        .map_err(store_failure("Error verifying otp"))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let supplied = query.otp.as_deref().and_then(|s| s.parse::<i64>().ok());
    match (stored_otp(&account), supplied) {
        (Some(stored), Some(supplied)) if stored == supplied => {}
        _ => return Err(ApiError::bad_request("Invalid OTP")),
    }

    if wants_delete(query.delete.as_deref()) {
        state
            .store
            .unset_field(collection, filter, "otp")
            .await
            .map_err(store_failure("Error verifying otp"))?;
    }

    Ok(Json(json!({ "message": "OTP verified successfully" })))
}

fn stored_otp(account: &Document) -> Option<i64> {
    match account.get("otp") {
        Some(Bson::Int32(v)) => Some(i64::from(*v)),
        Some(Bson::Int64(v)) => Some(*v),
        Some(Bson::Double(v)) => Some(*v as i64),
        _ => None,
    }
}

fn wants_delete(value: Option<&str>) -> bool {
    matches!(value, Some(v) if !v.is_empty() && v != "false" && v != "0")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_filter_prefers_email() {
        let filter = account_filter(Some("a@b.com"), Some("65f0123456789abcdef01234")).unwrap();
        assert_eq!(filter.get_str("email").unwrap(), "a@b.com");
    }

    #[test]
    fn account_filter_falls_back_to_id() {
        let filter = account_filter(None, Some("65f0123456789abcdef01234")).unwrap();
        assert!(filter.get_object_id("_id").is_ok());
    }

    #[test]
    fn account_filter_rejects_missing_and_malformed() {
        assert!(account_filter(None, None).is_err());
        assert!(account_filter(None, Some("nope")).is_err());
    }

    #[test]
    fn stored_otp_reads_any_numeric_width() {
        assert_eq!(stored_otp(&doc! { "otp": 1234_i32 }), Some(1234));
        assert_eq!(stored_otp(&doc! { "otp": 1234_i64 }), Some(1234));
        assert_eq!(stored_otp(&doc! { "otp": 1234.0 }), Some(1234));
        assert_eq!(stored_otp(&doc! {}), None);
        assert_eq!(stored_otp(&doc! { "otp": "1234" }), None);
    }

    #[test]
    fn delete_flag_parsing() {
        assert!(wants_delete(Some("true")));
        assert!(wants_delete(Some("1")));
        assert!(!wants_delete(Some("false")));
        assert!(!wants_delete(Some("0")));
        assert!(!wants_delete(Some("")));
        assert!(!wants_delete(None));
    }
}
