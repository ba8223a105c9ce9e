use std::ops::Deref;

use surrealdb::{
    engine::any::{connect, Any},
    opt::auth::Root,
    Error, Surreal,
};
use tracing::debug;

use super::vector_index::surreal::VECTOR_CHUNK_SCHEMA;

#[derive(Clone)]
pub struct SurrealDbClient {
    pub client: Surreal<Any>,
}

impl SurrealDbClient {
    /// # Initialize a new database client
    ///
    /// `address` selects the engine (`surrealkv://path`, `ws://host:port`, `mem://`).
    /// Root credentials are only used when both are supplied.
    pub async fn new(
        address: &str,
        username: Option<&str>,
        password: Option<&str>,
        namespace: &str,
        database: &str,
    ) -> Result<Self, Error> {
        let db = connect(address).await?;

        if let (Some(username), Some(password)) = (username, password) {
            db.signin(Root { username, password }).await?;
        }

        db.use_ns(namespace).use_db(database).await?;
        debug!(%address, %namespace, %database, "connected to surrealdb");

        Ok(SurrealDbClient { client: db })
    }

    /// Defines the tables and indexes the vector index relies on. Idempotent.
    pub async fn ensure_initialized(&self) -> Result<(), Error> {
        self.client.query(VECTOR_CHUNK_SCHEMA).await?.check()?;
        Ok(())
    }
}

impl Deref for SurrealDbClient {
    type Target = Surreal<Any>;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl SurrealDbClient {
    /// Create an in-memory SurrealDB client for testing.
    pub async fn memory(namespace: &str, database: &str) -> Result<Self, Error> {
        let db = connect("mem://").await?;

        db.use_ns(namespace).use_db(database).await?;

        Ok(SurrealDbClient { client: db })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_initialization_is_idempotent() {
        let namespace = "test_ns";
        let database = &Uuid::new_v4().to_string();
        let db = SurrealDbClient::memory(namespace, database)
            .await
            .expect("Failed to start in-memory surrealdb");

        db.ensure_initialized()
            .await
            .expect("Failed to initialize schema");
        db.ensure_initialized()
            .await
            .expect("Second initialization should be a no-op");
    }

    #[tokio::test]
    async fn test_connect_through_address() {
        let db = SurrealDbClient::new("mem://", None, None, "test_ns", "addr")
            .await
            .expect("Failed to connect through engine address");

        let mut response = db.query("RETURN 1 + 1").await.expect("query runs");
        let value: Option<i64> = response.take(0).expect("take result");
        assert_eq!(value, Some(2));
    }
}
