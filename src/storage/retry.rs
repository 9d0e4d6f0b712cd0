use chrono::NaiveDate;

use super::schema::Database;
use super::types::{DatabaseError, RetryDbRow, RetryRecord, RetryReport};

impl Database {
    // ========================================================================
    // Retry Queue
    // ========================================================================

    /// Queue failed URLs for a later attempt.
    ///
    /// A URL seen for the first time is stored with `attempt_count = 0`. A URL
    /// already in the queue keeps a single row: its `attempt_count` is
    /// incremented and `last_attempt` refreshed.
    ///
    /// Each insert is isolated: a failing statement is logged and counted in
    /// [`RetryReport::failed`] without rolling back the others.
    pub async fn enqueue_retries(
        &self,
        urls: &[String],
        today: NaiveDate,
    ) -> Result<RetryReport, DatabaseError> {
        let mut report = RetryReport::default();
        if urls.is_empty() {
            return Ok(report);
        }

        let today = today.format("%Y-%m-%d").to_string();
        let mut tx = self.pool.begin().await?;

        for url in urls {
            let result: Result<(i64,), _> = sqlx::query_as(
                r#"
                INSERT INTO retry_queue (article_url, last_attempt, attempt_count)
                VALUES (?, ?, 0)
                ON CONFLICT(article_url) DO UPDATE SET
                    attempt_count = attempt_count + 1,
                    last_attempt = excluded.last_attempt
                RETURNING attempt_count
            "#,
            )
            .bind(url)
            .bind(&today)
            .fetch_one(&mut *tx)
            .await;

            match result {
                Ok((0,)) => report.queued += 1,
                Ok((attempts,)) => {
                    tracing::debug!(url = %url, attempts = attempts, "Retry already queued, attempt count bumped");
                    report.requeued += 1;
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Failed to queue retry, skipping");
                    report.failed += 1;
                }
            }
        }

        tx.commit().await?;
        Ok(report)
    }

    /// Retry records with fewer than `max_attempts` attempts, oldest first.
    pub async fn pending_retries(
        &self,
        max_attempts: i64,
    ) -> Result<Vec<RetryRecord>, DatabaseError> {
        let rows = sqlx::query_as::<_, RetryDbRow>(
            r#"
            SELECT article_url, last_attempt, attempt_count
            FROM retry_queue
            WHERE attempt_count < ?
            ORDER BY id
        "#,
        )
        .bind(max_attempts)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let url = row.article_url.clone();
                let record = row.into_record();
                if record.is_none() {
                    tracing::warn!(url = %url, "Retry record has malformed last_attempt, ignoring");
                }
                record
            })
            .collect())
    }

    /// Remove resolved URLs from the retry queue, returns the number removed.
    pub async fn resolve_retries(&self, urls: &[String]) -> Result<u64, DatabaseError> {
        if urls.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut removed = 0;
        for url in urls {
            removed += sqlx::query("DELETE FROM retry_queue WHERE article_url = ?")
                .bind(url)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        tx.commit().await?;
        Ok(removed)
    }
}
