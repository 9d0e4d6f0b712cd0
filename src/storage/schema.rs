use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use super::types::DatabaseError;

// ============================================================================
// Central Database
// ============================================================================

/// The central datastore holding extracted articles and the retry queue.
#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
    path: Option<PathBuf>,
}

impl Database {
    /// Open (creating if necessary) the central database and run migrations.
    ///
    /// Pass `":memory:"` for a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Locked` if another process holds the database lock,
    /// `DatabaseError::Open` if the file cannot be opened, and
    /// `DatabaseError::Migration` if the schema cannot be created.
    pub async fn open(path: &str) -> Result<Self, DatabaseError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        // busy_timeout=5000: wait up to 5 seconds for locks before returning SQLITE_BUSY.
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DatabaseError::from_open(path, e))?
            .pragma("busy_timeout", "5000");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::from_open(path, e))?;

        let path = (path != ":memory:").then(|| PathBuf::from(path));
        let db = Self { pool, path };
        db.migrate().await?;
        tracing::debug!(path = ?db.path, "Central database ready");
        Ok(db)
    }

    /// Filesystem location of the database, `None` when in memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Create the articles and retry queue tables in one transaction.
    ///
    /// All statements use `IF NOT EXISTS`, so re-running on an existing
    /// database is a no-op.
    async fn migrate(&self) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await.map_err(migration_error)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY,
                article_url TEXT NOT NULL UNIQUE,
                authors TEXT NOT NULL,
                publish_date TEXT NOT NULL,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                image_url TEXT
            )
        "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(migration_error)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_articles_publish_date ON articles(publish_date DESC)",
        )
        .execute(&mut *tx)
        .await
        .map_err(migration_error)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS retry_queue (
                id INTEGER PRIMARY KEY,
                article_url TEXT NOT NULL UNIQUE,
                last_attempt TEXT NOT NULL,
                attempt_count INTEGER NOT NULL DEFAULT 0
            )
        "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(migration_error)?;

        tx.commit().await.map_err(migration_error)?;
        Ok(())
    }
}

fn migration_error(e: sqlx::Error) -> DatabaseError {
    DatabaseError::Migration(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory_has_no_path() {
        let db = Database::open(":memory:").await.unwrap();
        assert!(db.path().is_none());
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let db = Database::open(":memory:").await.unwrap();
        db.migrate().await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&db.pool)
        .await
        .unwrap();
        let names: Vec<_> = tables.into_iter().map(|(n,)| n).collect();
        assert_eq!(names, vec!["articles", "retry_queue"]);
    }
}
