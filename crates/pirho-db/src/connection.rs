//! SurrealDB connection management.

use surrealdb::Surreal;
use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;
use crate::repository::SurrealStore;
use crate::schema::run_migrations;

/// Configuration for connecting to SurrealDB.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Endpoint with scheme: `ws://host:port` for a server, `mem://` for
    /// an embedded in-memory store.
    pub url: String,
    pub namespace: String,
    pub database: String,
    /// Root username for authentication.
    pub username: String,
    /// Root password for authentication.
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8000".into(),
            namespace: "pirho".into(),
            database: "games".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

/// Owns the SurrealDB client. Cloning is cheap; every clone shares the
/// same underlying connection.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Any>,
}

impl DbManager {
    /// Connect, authenticate as root, select the configured namespace and
    /// database, and bring the schema up to date.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to SurrealDB"
        );

        let db = any::connect(config.url.as_str()).await?;

        // Embedded engines have no users to sign in as.
        if !config.url.starts_with("mem://") {
            db.signin(Root {
                username: config.username.clone(),
                password: config.password.clone(),
            })
            .await?;
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        run_migrations(&db).await?;

        info!("Connected to SurrealDB and schema is current");

        Ok(Self { db })
    }

    pub fn client(&self) -> &Surreal<Any> {
        &self.db
    }

    /// Repository bundle backed by this connection.
    pub fn store(&self) -> SurrealStore<Any> {
        SurrealStore::new(self.db.clone())
    }
}
