use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    Collection,
    bson::{doc, oid::ObjectId},
    options::ReturnDocument,
};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::{
    db::ConnectionManager,
    models::{NewWebsite, UserDocument, Website, WebsiteChanges, WebsiteDocument},
};

pub const WEBSITES_COLLECTION: &str = "websites";
pub const USERS_COLLECTION: &str = "users";

/// RepositoryError
///
/// Failures surfaced by a `Repository`. Handlers map `MalformedId` to 404 and
/// everything else to a generic 500.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("malformed identifier `{0}`")]
    MalformedId(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Database(#[from] mongodb::error::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// The persistence contract for the `websites` collection. Handlers only see
/// this trait, so the MongoDB store and the in-memory store are interchangeable.
///
/// Identifiers arrive as the raw path segment; an id that is not a valid
/// ObjectId yields `RepositoryError::MalformedId`.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Every website, with `createdBy` resolved to the owner's username.
    async fn list_websites(&self) -> RepositoryResult<Vec<Website>>;
    /// One website with `createdBy` resolved, or `None` if absent.
    async fn get_website(&self, id: &str) -> RepositoryResult<Option<Website>>;
    /// Inserts a website owned by `owner_id`. The owner must be a valid ObjectId.
    async fn create_website(&self, website: NewWebsite, owner_id: &str) -> RepositoryResult<Website>;
    /// Sets only the supplied fields and returns the document after the update.
    async fn update_website(&self, id: &str, changes: WebsiteChanges) -> RepositoryResult<Option<Website>>;
    /// Removes a website. Returns `false` if nothing matched.
    async fn delete_website(&self, id: &str) -> RepositoryResult<bool>;
}

/// RepositoryState
///
/// The shared handle to the persistence layer held in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

pub fn parse_id(id: &str) -> RepositoryResult<ObjectId> {
    ObjectId::parse_str(id).map_err(|_| RepositoryError::MalformedId(id.to_string()))
}

fn parse_owner(owner_id: &str) -> RepositoryResult<ObjectId> {
    ObjectId::parse_str(owner_id)
        .map_err(|_| RepositoryError::Validation(format!("createdBy `{}` is not a valid user reference", owner_id)))
}

/// OwnerDocument
///
/// Projection of the `users` collection used to resolve `createdBy`.
#[derive(Debug, Deserialize)]
struct OwnerDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    username: String,
}

/// MongoRepository
///
/// `Repository` backed by MongoDB. The connection is opened lazily by the
/// `ConnectionManager` on the first repository call.
pub struct MongoRepository {
    connection: ConnectionManager,
}

impl MongoRepository {
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }

    async fn websites(&self) -> RepositoryResult<Collection<WebsiteDocument>> {
        Ok(self.connection.database().await?.collection(WEBSITES_COLLECTION))
    }

    async fn owners(&self) -> RepositoryResult<Collection<OwnerDocument>> {
        Ok(self.connection.database().await?.collection(USERS_COLLECTION))
    }

    /// populate
    ///
    /// Resolves the owners of `documents` with one `$in` query on `users`,
    /// projected to `username`.
    async fn populate(&self, documents: Vec<WebsiteDocument>) -> RepositoryResult<Vec<Website>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let owner_ids: Vec<ObjectId> = documents
            .iter()
            .map(|d| d.created_by)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let owners: HashMap<ObjectId, String> = self
            .owners()
            .await?
            .find(doc! { "_id": { "$in": owner_ids } })
            .projection(doc! { "username": 1 })
            .await?
            .try_collect::<Vec<_>>()
            .await?
            .into_iter()
            .map(|owner| (owner.id, owner.username))
            .collect();

        Ok(documents
            .into_iter()
            .map(|document| document.into_populated(&owners))
            .collect())
    }
}

#[async_trait]
impl Repository for MongoRepository {
    async fn list_websites(&self) -> RepositoryResult<Vec<Website>> {
        let documents: Vec<WebsiteDocument> = self
            .websites()
            .await?
            .find(doc! {})
            .await?
            .try_collect()
            .await?;

        self.populate(documents).await
    }

    async fn get_website(&self, id: &str) -> RepositoryResult<Option<Website>> {
        let oid = parse_id(id)?;

        match self.websites().await?.find_one(doc! { "_id": oid }).await? {
            Some(document) => Ok(self.populate(vec![document]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn create_website(&self, website: NewWebsite, owner_id: &str) -> RepositoryResult<Website> {
        let owner = parse_owner(owner_id)?;
        let document = WebsiteDocument::new(website, owner);

        self.websites().await?.insert_one(&document).await?;
        tracing::debug!(id = %document.id, "website created");

        Ok(document.into_website())
    }

    async fn update_website(&self, id: &str, changes: WebsiteChanges) -> RepositoryResult<Option<Website>> {
        let oid = parse_id(id)?;
        let websites = self.websites().await?;

        // MongoDB rejects an empty `$set`.
        let updated = if changes.is_empty() {
            websites.find_one(doc! { "_id": oid }).await?
        } else {
            websites
                .find_one_and_update(doc! { "_id": oid }, doc! { "$set": changes.to_set_document() })
                .return_document(ReturnDocument::After)
                .await?
        };

        Ok(updated.map(WebsiteDocument::into_website))
    }

    async fn delete_website(&self, id: &str) -> RepositoryResult<bool> {
        let oid = parse_id(id)?;
        let result = self.websites().await?.delete_one(doc! { "_id": oid }).await?;
        Ok(result.deleted_count > 0)
    }
}

/// InMemoryRepository
///
/// A `Repository` holding documents in process memory with the same id and
/// owner-resolution semantics as `MongoRepository`. Used by the test suites
/// to exercise handlers and the full router without a database.
#[derive(Default)]
pub struct InMemoryRepository {
    websites: RwLock<Vec<WebsiteDocument>>,
    users: RwLock<HashMap<ObjectId, UserDocument>>,
    /// When true, every operation fails with `RepositoryError::Unavailable`.
    pub should_fail: bool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Adds a user that websites can reference through `createdBy`.
    pub async fn seed_user(&self, user: UserDocument) {
        self.users.write().await.insert(user.id, user);
    }

    fn check_available(&self) -> RepositoryResult<()> {
        if self.should_fail {
            return Err(RepositoryError::Unavailable("in-memory store configured to fail".to_string()));
        }
        Ok(())
    }

    async fn owners(&self) -> HashMap<ObjectId, String> {
        self.users
            .read()
            .await
            .values()
            .map(|user| (user.id, user.username.clone()))
            .collect()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn list_websites(&self) -> RepositoryResult<Vec<Website>> {
        self.check_available()?;
        let owners = self.owners().await;

        Ok(self
            .websites
            .read()
            .await
            .iter()
            .cloned()
            .map(|document| document.into_populated(&owners))
            .collect())
    }

    async fn get_website(&self, id: &str) -> RepositoryResult<Option<Website>> {
        self.check_available()?;
        let oid = parse_id(id)?;
        let owners = self.owners().await;

        Ok(self
            .websites
            .read()
            .await
            .iter()
            .find(|document| document.id == oid)
            .cloned()
            .map(|document| document.into_populated(&owners)))
    }

    async fn create_website(&self, website: NewWebsite, owner_id: &str) -> RepositoryResult<Website> {
        self.check_available()?;
        let owner = parse_owner(owner_id)?;
        let document = WebsiteDocument::new(website, owner);

        self.websites.write().await.push(document.clone());
        Ok(document.into_website())
    }

    async fn update_website(&self, id: &str, changes: WebsiteChanges) -> RepositoryResult<Option<Website>> {
        self.check_available()?;
        let oid = parse_id(id)?;

        let mut websites = self.websites.write().await;
        Ok(websites
            .iter_mut()
            .find(|document| document.id == oid)
            .map(|document| {
                changes.apply_to(document);
                document.clone().into_website()
            }))
    }

    async fn delete_website(&self, id: &str) -> RepositoryResult<bool> {
        self.check_available()?;
        let oid = parse_id(id)?;

        let mut websites = self.websites.write().await;
        let before = websites.len();
        websites.retain(|document| document.id != oid);
        Ok(websites.len() < before)
    }
}
