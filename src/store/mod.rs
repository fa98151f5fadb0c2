use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::options::FindOptions;
use mongodb::{Client, Database};
use thiserror::Error;
use tracing::info;

use crate::config::StoreConfig;

/// Errors from the document store client. Callers surface these as 500-class
/// responses; no retry logic exists anywhere in the service.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Driver(#[from] mongodb::error::Error),
}

/// The closed set of collections this service touches. Request parameters
/// that select a collection dynamically are parsed into this enum, never
/// passed through as raw strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Users,
    Events,
    Admin,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Events => "events",
            Collection::Admin => "admin",
        }
    }

    /// Capitalized singular used in response messages ("User created", ...).
    pub fn singular(&self) -> &'static str {
        match self {
            Collection::Users => "User",
            Collection::Events => "Event",
            Collection::Admin => "Admin",
        }
    }

    pub fn parse(s: &str) -> Option<Collection> {
        match s {
            "users" => Some(Collection::Users),
            "events" => Some(Collection::Events),
            "admin" => Some(Collection::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of an update, mirroring the driver's matched/modified split so
/// callers can distinguish "not found" from "matched but unchanged".
#[derive(Debug, Clone, Copy)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

pub fn parse_object_id(s: &str) -> Option<ObjectId> {
    ObjectId::parse_str(s).ok()
}

/// Wraps a single database handle. All durable state lives behind this
/// client; per-document writes are atomic at the store and no multi-document
/// transactions are used.
#[derive(Clone)]
pub struct Store {
    db: Database,
}

impl Store {
    /// Connect and ping. A failed ping aborts startup; there is no implicit
    /// reconnect logic beyond what the driver itself provides.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(&config.uri).await?;
        let db = client.database(&config.database);
        db.run_command(doc! { "ping": 1 }, None).await?;
        info!("connected to document store, database '{}'", config.database);
        Ok(Self { db })
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }

    fn collection(&self, collection: Collection) -> mongodb::Collection<Document> {
        self.db.collection::<Document>(collection.as_str())
    }

    pub async fn find_one(
        &self,
        collection: Collection,
        filter: Document,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self.collection(collection).find_one(filter, None).await?)
    }

    /// One page of a filtered, projected query, sorted by insertion recency
    /// (newest first). `skip = (page - 1) * limit`; both are >= 1 by the time
    /// they reach here.
    pub async fn find_page(
        &self,
        collection: Collection,
        filter: Document,
        projection: Option<Document>,
        page: i64,
        limit: i64,
    ) -> Result<Vec<Document>, StoreError> {
        let options = FindOptions::builder()
            .projection(projection)
            .sort(doc! { "_id": -1 })
            .skip(compute_skip(page, limit))
            .limit(limit)
            .build();

        let cursor = self.collection(collection).find(filter, options).await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn insert_one(
        &self,
        collection: Collection,
        document: Document,
    ) -> Result<ObjectId, StoreError> {
        let result = self.collection(collection).insert_one(document, None).await?;
        // Inserted ids are always ObjectIds here: we never supply _id ourselves.
        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| mongodb::error::Error::custom("inserted _id is not an ObjectId".to_string()).into())
    }

    /// Merge-patch: `$set`s exactly the fields in `patch`, leaving the rest
    /// of the document untouched. `patch` must be non-empty.
    pub async fn update_one(
        &self,
        collection: Collection,
        filter: Document,
        patch: Document,
    ) -> Result<UpdateOutcome, StoreError> {
        let result = self
            .collection(collection)
            .update_one(filter, doc! { "$set": patch }, None)
            .await?;
        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    pub async fn unset_field(
        &self,
        collection: Collection,
        filter: Document,
        field: &str,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut unset = Document::new();
        unset.insert(field, "");
        let result = self
            .collection(collection)
            .update_one(filter, doc! { "$unset": unset }, None)
            .await?;
        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    pub async fn delete_one(
        &self,
        collection: Collection,
        filter: Document,
    ) -> Result<u64, StoreError> {
        let result = self.collection(collection).delete_one(filter, None).await?;
        Ok(result.deleted_count)
    }

    /// Counted independently of any page window, against the same filter.
    /// Count and page can race under concurrent writes; accepted.
    pub async fn count(&self, collection: Collection, filter: Document) -> Result<u64, StoreError> {
        Ok(self.collection(collection).count_documents(filter, None).await?)
    }
}

pub fn compute_skip(page: i64, limit: i64) -> u64 {
    ((page - 1) * limit).max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_parse_is_closed() {
        assert_eq!(Collection::parse("users"), Some(Collection::Users));
        assert_eq!(Collection::parse("events"), Some(Collection::Events));
        assert_eq!(Collection::parse("admin"), Some(Collection::Admin));
        assert_eq!(Collection::parse("accounts"), None);
        assert_eq!(Collection::parse(""), None);
    }

    #[test]
    fn collection_singular_names() {
        assert_eq!(Collection::Users.singular(), "User");
        assert_eq!(Collection::Events.singular(), "Event");
    }

    #[test]
    fn skip_is_zero_based_on_page_one() {
        assert_eq!(compute_skip(1, 10), 0);
        assert_eq!(compute_skip(2, 10), 10);
        assert_eq!(compute_skip(5, 25), 100);
    }

    #[test]
    fn object_id_parsing() {
        assert!(parse_object_id("65f0123456789abcdef01234").is_some());
        assert!(parse_object_id("not-an-id").is_none());
        assert!(parse_object_id("").is_none());
    }
}
