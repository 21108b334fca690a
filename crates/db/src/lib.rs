use std::str::FromStr;

use sqlx::{
    Pool, Sqlite, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use utils::assets::database_path;

pub mod models;

pub use models::document::{DocumentError, ManagedDocument, StoredDocument};

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("could not resolve database location: {0}")]
    Location(#[from] std::io::Error),
}

#[derive(Clone)]
pub struct DBService {
    pub pool: Pool<Sqlite>,
}

impl DBService {
    /// Open `DATABASE_URL`, or `notebook.db` in the data directory.
    pub async fn new() -> Result<DBService, DbError> {
        let database_url = match std::env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => format!("sqlite://{}", database_path()?.to_string_lossy()),
        };
        Self::connect(&database_url).await
    }

    pub async fn connect(database_url: &str) -> Result<DBService, DbError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::debug!("[DB] Connected to {}", database_url);
        Ok(DBService { pool })
    }

    /// Private in-memory database, used by tests and dry runs.
    pub async fn in_memory() -> Result<DBService, DbError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(DBService { pool })
    }

    pub async fn disconnect(self) {
        self.pool.close().await;
    }
}
