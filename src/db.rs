use mongodb::{Client, Database, error::Error};
use tokio::sync::OnceCell;

use crate::config::AppConfig;

/// Database selected when neither `MONGODB_DB` nor the URI names one.
pub const DEFAULT_DATABASE: &str = "test";

/// ConnectionManager
///
/// Owns the single MongoDB handle of the process. The client is created on the
/// first call to `database()` and memoized; later calls return the same handle
/// without reconnecting. A failed first attempt leaves the cell empty.
pub struct ConnectionManager {
    uri: String,
    database_name: Option<String>,
    database: OnceCell<Database>,
}

impl ConnectionManager {
    pub fn new(uri: impl Into<String>, database_name: Option<String>) -> Self {
        Self {
            uri: uri.into(),
            database_name,
            database: OnceCell::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.mongodb_uri.clone(), config.mongodb_db.clone())
    }

    /// Returns the cached database handle, connecting on first use.
    pub async fn database(&self) -> Result<&Database, Error> {
        self.database.get_or_try_init(|| self.connect()).await
    }

    pub fn is_initialized(&self) -> bool {
        self.database.initialized()
    }

    async fn connect(&self) -> Result<Database, Error> {
        let client = Client::with_uri_str(&self.uri).await?;

        let database = match &self.database_name {
            Some(name) => client.database(name),
            None => client
                .default_database()
                .unwrap_or_else(|| client.database(DEFAULT_DATABASE)),
        };

        tracing::info!(database = %database.name(), "MongoDB client initialised");
        Ok(database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Client construction only parses the URI; no server is contacted here.

    #[tokio::test]
    async fn second_call_returns_the_cached_handle() {
        let manager = ConnectionManager::new("mongodb://localhost:27017", None);
        assert!(!manager.is_initialized());

        let first = manager.database().await.unwrap() as *const Database;
        let second = manager.database().await.unwrap() as *const Database;

        assert!(manager.is_initialized());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn database_name_resolution_order() {
        let explicit = ConnectionManager::new("mongodb://localhost:27017/from_uri", Some("explicit".into()));
        assert_eq!(explicit.database().await.unwrap().name(), "explicit");

        let from_uri = ConnectionManager::new("mongodb://localhost:27017/from_uri", None);
        assert_eq!(from_uri.database().await.unwrap().name(), "from_uri");

        let fallback = ConnectionManager::new("mongodb://localhost:27017", None);
        assert_eq!(fallback.database().await.unwrap().name(), DEFAULT_DATABASE);
    }

    #[tokio::test]
    async fn invalid_uri_leaves_the_cell_empty() {
        let manager = ConnectionManager::new("not-a-mongodb-uri", None);

        assert!(manager.database().await.is_err());
        assert!(!manager.is_initialized());
    }
}
