use crate::common::error::{NotifierError, Result};
use libsql::{Builder, Connection, Database};
use std::env;
use std::path::Path;
use tracing::info;

pub struct DatabaseManager {
    db: Database,
}

impl DatabaseManager {
    /// Create a new database manager with a remote Turso connection.
    pub async fn new() -> Result<Self> {
        let url = env::var("SPAWNWATCH_DB_URL").map_err(|_| NotifierError::Store {
            message: "SPAWNWATCH_DB_URL environment variable not set".to_string(),
        })?;

        let auth_token =
            env::var("SPAWNWATCH_DB_AUTH_TOKEN").map_err(|_| NotifierError::Store {
                message: "SPAWNWATCH_DB_AUTH_TOKEN environment variable not set".to_string(),
            })?;

        info!("Connecting to Turso database at {}", url);

        let db = Builder::new_remote(url, auth_token)
            .build()
            .await
            .map_err(|e| NotifierError::Store {
                message: format!("Failed to connect to database: {e}"),
            })?;

        Ok(Self { db })
    }

    /// Create a database manager backed by a local file.
    pub async fn new_local<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = Builder::new_local(path.as_ref())
            .build()
            .await
            .map_err(|e| NotifierError::Store {
                message: format!("Failed to open local database: {e}"),
            })?;

        Ok(Self { db })
    }

    /// Get a connection to the database
    pub async fn get_connection(&self) -> Result<Connection> {
        self.db.connect().map_err(|e| NotifierError::Store {
            message: format!("Failed to get database connection: {e}"),
        })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");

        let conn = self.get_connection().await?;

        let migration_sql = include_str!("../migrations/001_create_subscriptions.sql");
        conn.execute_batch(migration_sql)
            .await
            .map_err(|e| NotifierError::Store {
                message: format!("Failed to run migration: {e}"),
            })?;

        info!("Database migrations completed successfully");
        Ok(())
    }
}
