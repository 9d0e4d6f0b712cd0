use chrono::NaiveDate;

use super::schema::Database;
use super::types::{CommitReport, DatabaseError, ExtractedArticle};

impl Database {
    // ========================================================================
    // Article Operations
    // ========================================================================

    /// Commit one batch of extracted articles in a single transaction.
    ///
    /// Each row is inserted on its own statement: a row the database rejects
    /// (e.g. an `article_url` already stored) is logged and counted in
    /// [`CommitReport::rejected`] while the rest of the batch still commits.
    ///
    /// # Errors
    ///
    /// Only failures to begin or commit the transaction are returned.
    pub async fn commit_articles(
        &self,
        articles: &[ExtractedArticle],
    ) -> Result<CommitReport, DatabaseError> {
        let mut report = CommitReport::default();
        if articles.is_empty() {
            return Ok(report);
        }

        let mut tx = self.pool.begin().await?;

        for article in articles {
            let result = sqlx::query(
                r#"
                INSERT INTO articles (article_url, authors, publish_date, title, content, image_url)
                VALUES (?, ?, ?, ?, ?, ?)
            "#,
            )
            .bind(&article.url)
            .bind(article.joined_authors())
            .bind(article.publish_date.format("%Y-%m-%d").to_string())
            .bind(&article.title)
            .bind(&article.text)
            .bind(&article.top_image)
            .execute(&mut *tx)
            .await;

            match result {
                Ok(_) => report.inserted += 1,
                Err(e) => {
                    tracing::warn!(url = %article.url, error = %e, "Failed to insert article, skipping");
                    report.rejected += 1;
                }
            }
        }

        tx.commit().await?;

        tracing::debug!(
            inserted = report.inserted,
            rejected = report.rejected,
            "Committed article batch"
        );
        Ok(report)
    }

    /// Number of stored articles.
    pub async fn article_count(&self) -> Result<i64, DatabaseError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Stored article URLs in insertion order.
    pub async fn article_urls(&self) -> Result<Vec<String>, DatabaseError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT article_url FROM articles ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(url,)| url).collect())
    }

    /// Look up a stored article by URL.
    ///
    /// Rows whose `publish_date` is not `YYYY-MM-DD` are reported as absent.
    pub async fn get_article(&self, url: &str) -> Result<Option<ExtractedArticle>, DatabaseError> {
        let row: Option<(String, String, String, String, String, Option<String>)> = sqlx::query_as(
            r#"
            SELECT article_url, authors, publish_date, title, content, image_url
            FROM articles
            WHERE article_url = ?
        "#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        let Some((url, authors, publish_date, title, text, top_image)) = row else {
            return Ok(None);
        };
        let Ok(publish_date) = NaiveDate::parse_from_str(&publish_date, "%Y-%m-%d") else {
            tracing::warn!(url = %url, publish_date = %publish_date, "Stored article has malformed publish date");
            return Ok(None);
        };

        Ok(Some(ExtractedArticle {
            authors: authors
                .split(',')
                .filter(|a| !a.is_empty())
                .map(str::to_string)
                .collect(),
            url,
            publish_date,
            title,
            text,
            top_image,
        }))
    }
}
