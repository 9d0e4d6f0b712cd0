//! Per-run index stores.
//!
//! Each ingestion run appends discovered candidates to its own SQLite file
//! holding a single `rss_items` table. Ids are unique within a store and
//! re-inserting an id already present is a no-op, so re-running a day's
//! ingestion never duplicates rows.

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    QueryBuilder, SqlitePool,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use super::types::{CandidateItem, DatabaseError, MergedCandidate};

/// Rows per multi-row INSERT: 4 binds each keeps us under SQLite's 999 parameter limit.
const INSERT_CHUNK: usize = 200;

/// File extension of index store files.
pub const INDEX_EXTENSION: &str = "db";

pub struct IndexStore {
    pool: SqlitePool,
    path: PathBuf,
}

impl IndexStore {
    /// Open an index store for writing, creating the file and table if missing.
    ///
    /// Table creation is committed on its own before any insert.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let store = Self::connect(path.as_ref(), "rwc").await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS rss_items (
                id TEXT NOT NULL UNIQUE,
                link TEXT,
                title TEXT,
                publish_date TEXT
            )
        "#,
        )
        .execute(&store.pool)
        .await
        .map_err(|e| DatabaseError::Migration(e.to_string()))?;

        Ok(store)
    }

    /// Open an existing index store read-only. Fails if the file does not exist.
    pub async fn open_existing(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        Self::connect(path.as_ref(), "ro").await
    }

    async fn connect(path: &Path, mode: &str) -> Result<Self, DatabaseError> {
        let display = path.display().to_string();
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode={}", display, mode))
            .map_err(|e| DatabaseError::from_open(&display, e))?
            .pragma("busy_timeout", "5000");
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::from_open(&display, e))?;
        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append candidates whose id is not yet stored, returns the number inserted.
    ///
    /// Ids already in the store are skipped, as are repeated ids within
    /// `items` (the first occurrence wins). The remaining rows are written in
    /// one transaction.
    pub async fn insert_all(&self, items: &[CandidateItem]) -> Result<usize, DatabaseError> {
        let mut seen: HashSet<String> = self.ids().await?.into_iter().collect();

        let fresh: Vec<&CandidateItem> = items
            .iter()
            .filter(|item| seen.insert(item.id.clone()))
            .collect();

        let skipped = items.len() - fresh.len();
        if fresh.is_empty() {
            tracing::debug!(store = %self.path.display(), skipped = skipped, "No new index items");
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for chunk in fresh.chunks(INSERT_CHUNK) {
            let mut builder: QueryBuilder<sqlx::Sqlite> =
                QueryBuilder::new("INSERT INTO rss_items (id, link, title, publish_date) ");
            builder.push_values(chunk, |mut b, item| {
                b.push_bind(&item.id)
                    .push_bind(&item.link)
                    .push_bind(&item.title)
                    .push_bind(&item.published_raw);
            });
            builder.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;

        tracing::info!(
            store = %self.path.display(),
            inserted = fresh.len(),
            skipped = skipped,
            "Index store updated"
        );
        Ok(fresh.len())
    }

    /// All stored ids.
    pub async fn ids(&self) -> Result<Vec<String>, DatabaseError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT id FROM rss_items")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Stored `(link, publish_date)` pairs in insertion order.
    ///
    /// Rows with a NULL link are skipped; a NULL publish date reads as empty.
    pub async fn links(&self) -> Result<Vec<MergedCandidate>, DatabaseError> {
        let rows: Vec<(Option<String>, Option<String>)> =
            sqlx::query_as("SELECT link, publish_date FROM rss_items ORDER BY rowid")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .filter_map(|(link, published)| {
                link.map(|link| MergedCandidate {
                    link,
                    published_raw: published.unwrap_or_default(),
                })
            })
            .collect())
    }

    pub async fn count(&self) -> Result<i64, DatabaseError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM rss_items")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Close the underlying connection.
    pub async fn close(self) {
        self.pool.close().await;
    }
}
