use chrono::NaiveDate;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds a lock on the database file
    #[error("Database '{0}' is locked by another process")]
    Locked(String),

    /// The database file could not be opened or created
    #[error("Failed to open database '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: sqlx::Error,
    },

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Classify a connection error, separating lock contention from other failures.
    pub(crate) fn from_open(path: &str, err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5): database is locked
        // SQLITE_LOCKED (6): database table is locked
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
        {
            return DatabaseError::Locked(path.to_string());
        }

        DatabaseError::Open {
            path: path.to_string(),
            source: err,
        }
    }
}

// ============================================================================
// Pipeline Records
// ============================================================================

/// An article reference discovered by a feed or a site crawl, not yet downloaded.
///
/// For crawl sources `id` equals `link`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateItem {
    pub id: String,
    pub link: String,
    pub title: String,
    /// Free-form timestamp as surfaced by the source (may be empty)
    pub published_raw: String,
}

/// A candidate after merging all index stores of a directory, unique by link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedCandidate {
    pub link: String,
    pub published_raw: String,
}

/// Structured article content ready to be committed to the central store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedArticle {
    pub url: String,
    pub authors: Vec<String>,
    pub publish_date: NaiveDate,
    pub title: String,
    pub text: String,
    pub top_image: Option<String>,
}

impl ExtractedArticle {
    /// Authors as stored in the `authors` column.
    pub fn joined_authors(&self) -> String {
        self.authors.join(",")
    }
}

/// A URL whose extraction failed, queued for a later attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryRecord {
    pub article_url: String,
    pub last_attempt: NaiveDate,
    pub attempt_count: i64,
}

/// Internal row type for retry queue queries (dates are stored as TEXT)
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct RetryDbRow {
    pub article_url: String,
    pub last_attempt: String,
    pub attempt_count: i64,
}

impl RetryDbRow {
    pub(crate) fn into_record(self) -> Option<RetryRecord> {
        let last_attempt = NaiveDate::parse_from_str(&self.last_attempt, "%Y-%m-%d").ok()?;
        Some(RetryRecord {
            article_url: self.article_url,
            last_attempt,
            attempt_count: self.attempt_count,
        })
    }
}

/// Row counts from one batch commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Rows written
    pub inserted: usize,
    /// Rows rejected by the database (e.g. duplicate `article_url`)
    pub rejected: usize,
}

/// Row counts from one retry queue write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryReport {
    /// URLs queued for the first time
    pub queued: usize,
    /// URLs already queued whose attempt count was incremented
    pub requeued: usize,
    /// Inserts that failed and were skipped
    pub failed: usize,
}
