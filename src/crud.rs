//! Generic CRUD dispatcher.
//!
//! Four resource-agnostic operations parameterized by a [`DocumentSchema`]
//! (collection + validator). Resource controllers layer their side effects on
//! top of these; everything store-shaped funnels through here.

use mongodb::bson::{doc, oid::ObjectId, Document};
use serde::Serialize;
use serde_json::Value;

use crate::api::format::document_to_json;
use crate::auth::{Role, TokenService};
use crate::error::ApiError;
use crate::schema::{DocumentSchema, Mode};
use crate::store::{parse_object_id, Collection, Store};

/// Result of a create: the generated id, plus a token when the caller asked
/// for post-create role issuance (registration bundles a volunteer token).
#[derive(Debug)]
pub struct Created {
    pub id: ObjectId,
    pub token: Option<String>,
}

pub async fn create<S: DocumentSchema>(
    store: &Store,
    body: &Value,
    issue: Option<(&TokenService, Role)>,
) -> Result<Created, ApiError> {
    let document = S::validate(body, Mode::Create).map_err(ApiError::validation)?;
    create_validated(store, S::COLLECTION, document, issue).await
}

/// Insert an already-validated document. Split out so controllers that adjust
/// the validated document (hashed password, forced approval) reuse the same
/// insertion and token-issuance path.
pub async fn create_validated(
    store: &Store,
    collection: Collection,
    document: Document,
    issue: Option<(&TokenService, Role)>,
) -> Result<Created, ApiError> {
    let id = store
        .insert_one(collection, document)
        .await
        .map_err(|e| creating(collection, e))?;

    let token = match issue {
        Some((tokens, role)) => Some(tokens.issue(&id.to_hex(), role)?),
        None => None,
    };

    Ok(Created { id, token })
}

/// One page of a filtered, projected, newest-first query.
#[derive(Debug, Serialize)]
pub struct Page {
    pub documents: Vec<Value>,
    pub total: u64,
    pub page: i64,
    #[serde(rename = "totalPages")]
    pub total_pages: u64,
}

pub async fn read_page(
    store: &Store,
    collection: Collection,
    filter: Document,
    projection: Option<Document>,
    page: i64,
    limit: i64,
) -> Result<Page, ApiError> {
    let page = page.max(1);
    let limit = limit.max(1);

    let documents = store
        .find_page(collection, filter.clone(), projection, page, limit)
        .await
        .map_err(|e| reading(collection, e))?;
    // Total is counted against the same filter, independently of the page
    // window; the two can race under concurrent writes.
    let total = store
        .count(collection, filter)
        .await
        .map_err(|e| reading(collection, e))?;

    Ok(Page {
        documents: documents.iter().map(document_to_json).collect(),
        total,
        page,
        total_pages: total_pages(total, limit),
    })
}

pub fn total_pages(total: u64, limit: i64) -> u64 {
    let limit = limit.max(1) as u64;
    (total + limit - 1) / limit
}

/// Merge-patch update of the fields that survive partial validation. The
/// `password` key is stripped no matter what the schema accepted. A match
/// that modifies nothing is still a success.
pub async fn update<S: DocumentSchema>(
    store: &Store,
    id: &str,
    body: &Value,
) -> Result<ObjectId, ApiError> {
    let oid = parse_object_id(id).ok_or_else(ApiError::invalid_id)?;

    let mut patch = S::validate(body, Mode::Update).map_err(ApiError::validation)?;
    patch.remove("password");

    apply_patch(store, S::COLLECTION, oid, patch).await?;
    Ok(oid)
}

pub async fn apply_patch(
    store: &Store,
    collection: Collection,
    oid: ObjectId,
    patch: Document,
) -> Result<(), ApiError> {
    // The store rejects an empty $set, and a no-op patch should not 500:
    // fall back to a bare existence check.
    if patch.is_empty() {
        return match store
            .find_one(collection, doc! { "_id": oid })
            .await
            .map_err(|e| updating(collection, e))?
        {
            Some(_) => Ok(()),
            None => Err(not_found(collection)),
        };
    }

    let outcome = store
        .update_one(collection, doc! { "_id": oid }, patch)
        .await
        .map_err(|e| updating(collection, e))?;

    if outcome.matched == 0 {
        return Err(not_found(collection));
    }
    if outcome.modified == 0 {
        tracing::debug!("update matched {} {} but changed nothing", collection, oid);
    }
    Ok(())
}

pub async fn delete(store: &Store, collection: Collection, id: &str) -> Result<(), ApiError> {
    let oid = parse_object_id(id).ok_or_else(ApiError::invalid_id)?;

    let deleted = store
        .delete_one(collection, doc! { "_id": oid })
        .await
        .map_err(|e| {
            tracing::error!("store error: {}", e);
            ApiError::internal(format!("Error deleting from {}", collection))
        })?;

    if deleted == 0 {
        return Err(not_found(collection));
    }
    Ok(())
}

fn not_found(collection: Collection) -> ApiError {
    ApiError::not_found(format!("{} not found", collection.singular()))
}

fn creating(collection: Collection, err: crate::store::StoreError) -> ApiError {
    tracing::error!("store error: {}", err);
    ApiError::internal(format!("Error creating {}", collection))
}

fn reading(collection: Collection, err: crate::store::StoreError) -> ApiError {
    tracing::error!("store error: {}", err);
    ApiError::internal(format!("Error reading from {}", collection))
}

fn updating(collection: Collection, err: crate::store::StoreError) -> ApiError {
    tracing::error!("store error: {}", err);
    ApiError::internal(format!("Error updating {}", collection))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_is_ceiling_division() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(95, 10), 10);
        assert_eq!(total_pages(7, 3), 3);
    }

    #[test]
    fn page_serializes_with_camel_case_total_pages() {
        let page = Page {
            documents: vec![],
            total: 21,
            page: 3,
            total_pages: 3,
        };
        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value["totalPages"], 3);
        assert_eq!(value["total"], 21);
        assert!(value.get("total_pages").is_none());
    }
}
