use super::worker::ExtractFailure;
use crate::storage::{CommitReport, Database, DatabaseError, ExtractedArticle};

/// Counters accumulated over one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub succeeded: usize,
    pub failed: usize,
    /// Rows written to the central store
    pub committed: usize,
    /// Rows the central store rejected (e.g. already stored)
    pub rejected: usize,
    /// Batch transactions committed
    pub commits: usize,
}

/// Success buffer and failure list of one pass over the candidates.
///
/// Results are recorded in position order. Whenever the 1-based position is a
/// multiple of the batch size and the buffer holds articles, the buffer is
/// committed in one transaction. [`flush`](Self::flush) commits whatever is
/// left at the end of the pass.
pub struct BatchAccumulator<'a> {
    db: &'a Database,
    batch_size: usize,
    buffer: Vec<ExtractedArticle>,
    failed: Vec<String>,
    failed_positions: Vec<usize>,
    flushed: Vec<String>,
    stats: BatchStats,
    resume_from: usize,
}

impl<'a> BatchAccumulator<'a> {
    /// `first_position` is where a pass restarting after a commit failure must begin.
    pub fn new(db: &'a Database, batch_size: usize, first_position: usize) -> Self {
        Self {
            db,
            batch_size: batch_size.max(1),
            buffer: Vec::with_capacity(batch_size.min(1024)),
            failed: Vec::new(),
            failed_positions: Vec::new(),
            flushed: Vec::new(),
            stats: BatchStats::default(),
            resume_from: first_position,
        }
    }

    /// Record the result for `position`, committing the buffer on a batch boundary.
    ///
    /// # Errors
    ///
    /// Returns the error of a batch transaction that could not begin or commit.
    pub async fn record(
        &mut self,
        position: usize,
        outcome: Result<ExtractedArticle, ExtractFailure>,
    ) -> Result<(), DatabaseError> {
        match outcome {
            Ok(article) => {
                self.stats.succeeded += 1;
                self.buffer.push(article);
            }
            Err(failure) => {
                tracing::warn!(
                    url = %failure.url,
                    position = position,
                    error = %failure.error,
                    "Failed to extract article"
                );
                self.stats.failed += 1;
                self.failed.push(failure.url);
                self.failed_positions.push(position);
            }
        }

        if position % self.batch_size == 0 {
            if !self.buffer.is_empty() {
                self.flush().await?;
                self.resume_from = position + 1;
            }
            tracing::info!(
                position = position,
                committed = self.stats.committed,
                failed = self.stats.failed,
                "Articles processed"
            );
        }
        Ok(())
    }

    /// Commit the buffered articles, if any.
    pub async fn flush(&mut self) -> Result<CommitReport, DatabaseError> {
        if self.buffer.is_empty() {
            return Ok(CommitReport::default());
        }

        let report = self.db.commit_articles(&self.buffer).await?;
        self.stats.commits += 1;
        self.stats.committed += report.inserted;
        self.stats.rejected += report.rejected;
        self.flushed.extend(self.buffer.drain(..).map(|article| article.url));
        Ok(report)
    }

    /// First position not covered by a successful commit.
    pub fn resume_from(&self) -> usize {
        self.resume_from
    }

    pub fn stats(&self) -> BatchStats {
        self.stats
    }

    pub fn failed_urls(&self) -> &[String] {
        &self.failed
    }

    /// Failures at positions before [`resume_from`](Self::resume_from).
    ///
    /// A pass restarted at `resume_from` never revisits these, so they must
    /// reach the retry queue even when the pass aborts.
    pub fn settled_failures(&self) -> &[String] {
        let settled = self
            .failed_positions
            .partition_point(|&position| position < self.resume_from);
        &self.failed[..settled]
    }

    /// URLs of every article handed to the central store, including rejected rows.
    pub fn flushed_urls(&self) -> &[String] {
        &self.flushed
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}
