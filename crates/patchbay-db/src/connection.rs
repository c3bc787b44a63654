//! Store connection handling.
//!
//! The control plane opens one SurrealDB connection at startup and
//! hands clones of it to every repository; the lookup path never
//! opens connections of its own.

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::{debug, info};

use crate::error::DbError;

/// Connection settings for the tenant store.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Endpoint as `host:port`; the websocket scheme is implied.
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        DbConfig {
            url: "127.0.0.1:8000".into(),
            namespace: "patchbay".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

/// Owns the shared SurrealDB client.
///
/// Cheap to clone; clones reuse the same underlying connection.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Open the websocket connection, sign in as root, and select the
    /// configured namespace and database.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        debug!(endpoint = %config.url, "opening store connection");

        let db = Surreal::new::<Ws>(&config.url).await?;
        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;
        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        info!(
            endpoint = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "tenant store ready"
        );

        Ok(Self { db })
    }

    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}
