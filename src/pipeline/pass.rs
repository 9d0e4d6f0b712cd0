use chrono::NaiveDate;
use futures::{stream, StreamExt};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::batch::{BatchAccumulator, BatchStats};
use super::worker::extract_candidate;
use super::PipelineError;
use crate::content::ArticleExtractor;
use crate::storage::{merge_directory, Database, MergedCandidate, RetryReport};

/// Parameters of one processing pass.
#[derive(Debug, Clone)]
pub struct PassOptions {
    pub batch_size: usize,
    /// 1-based position of the first candidate to process
    pub begin_index: usize,
    /// Extractions in flight; results are still consumed in order
    pub concurrency: usize,
    /// Stop taking new results once this much time has passed
    pub deadline: Option<Duration>,
    /// Date written to `last_attempt` of queued retries
    pub today: NaiveDate,
}

impl PassOptions {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            begin_index: 1,
            concurrency: 1,
            deadline: None,
            today: chrono::Local::now().date_naive(),
        }
    }

    pub fn begin_index(mut self, begin_index: usize) -> Self {
        self.begin_index = begin_index;
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }
}

/// Outcome of a processing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Candidates in the pass
    pub total: usize,
    /// Candidates extracted (successfully or not)
    pub processed: usize,
    /// Candidates before `begin_index`
    pub skipped: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Rows written to the central store
    pub committed: usize,
    /// Batch transactions committed
    pub commits: usize,
    /// Rows the central store rejected
    pub rejected: usize,
    pub retries: RetryReport,
    /// Retry rows removed because their article is now stored
    pub resolved: u64,
    /// Position to resume from when the deadline ended the pass early
    pub stopped_at: Option<usize>,
}

impl PassReport {
    fn new(total: usize, skipped: usize, processed: usize, stats: BatchStats) -> Self {
        Self {
            total,
            processed,
            skipped,
            succeeded: stats.succeeded,
            failed: stats.failed,
            committed: stats.committed,
            commits: stats.commits,
            rejected: stats.rejected,
            ..Self::default()
        }
    }
}

/// Extract and store every candidate of the index stores in `dir`.
///
/// Stores are merged (see [`merge_directory`]); the central database file is
/// excluded when it lives in the same directory. Candidates before
/// `options.begin_index` are skipped but still count toward batch
/// boundaries, so a resumed pass commits at the same positions as the
/// original one. Failed URLs are queued for retry at the end of the pass.
///
/// # Errors
///
/// Merge failures, batch transactions that cannot commit (the error names
/// the position to resume from) and retry queue transactions that cannot
/// commit. Individual extraction failures are never errors.
pub async fn process_index<E: ArticleExtractor>(
    db: &Database,
    extractor: &E,
    dir: &Path,
    options: &PassOptions,
) -> Result<PassReport, PipelineError> {
    let exclude: Vec<PathBuf> = db.path().map(Path::to_path_buf).into_iter().collect();
    let candidates = merge_directory(dir, &exclude).await?;

    tracing::info!(
        dir = %dir.display(),
        candidates = candidates.len(),
        begin_index = options.begin_index,
        batch_size = options.batch_size,
        "Processing index"
    );

    let (report, _) = run_pass(db, extractor, &candidates, options).await?;
    Ok(report)
}

/// Re-attempt queued retries with fewer than `max_attempts` attempts.
///
/// Runs the same pass as [`process_index`] over the queued URLs, in queue
/// order and without an index date to fall back on. URLs that reach the
/// central store leave the queue; URLs that fail again have their attempt
/// count incremented.
pub async fn process_retries<E: ArticleExtractor>(
    db: &Database,
    extractor: &E,
    options: &PassOptions,
    max_attempts: i64,
) -> Result<PassReport, PipelineError> {
    let candidates: Vec<MergedCandidate> = db
        .pending_retries(max_attempts)
        .await?
        .into_iter()
        .map(|record| MergedCandidate {
            link: record.article_url,
            published_raw: String::new(),
        })
        .collect();

    tracing::info!(
        pending = candidates.len(),
        max_attempts = max_attempts,
        "Processing retry queue"
    );

    let options = options.clone().begin_index(1);
    let (mut report, flushed) = run_pass(db, extractor, &candidates, &options).await?;
    report.resolved = db.resolve_retries(&flushed).await?;

    tracing::info!(resolved = report.resolved, "Retry queue updated");
    Ok(report)
}

/// Ordered extraction over `candidates`, batching successes and queueing failures.
///
/// Returns the report and the URLs handed to the central store.
async fn run_pass<E: ArticleExtractor>(
    db: &Database,
    extractor: &E,
    candidates: &[MergedCandidate],
    options: &PassOptions,
) -> Result<(PassReport, Vec<String>), PipelineError> {
    let total = candidates.len();
    let begin = options.begin_index.max(1);
    let skipped = (begin - 1).min(total);

    let mut acc = BatchAccumulator::new(db, options.batch_size, begin);
    let deadline = options
        .deadline
        .map(|limit| tokio::time::Instant::now() + limit);

    let mut results = std::pin::pin!(stream::iter(
        candidates.iter().enumerate().skip(skipped)
    )
    .map(|(index, candidate)| async move {
        (index + 1, extract_candidate(extractor, candidate).await)
    })
    .buffered(options.concurrency.max(1)));

    let mut processed = 0;
    let mut stopped_at = None;

    loop {
        let next = match deadline {
            Some(at) => match tokio::time::timeout_at(at, results.next()).await {
                Ok(next) => next,
                Err(_) => {
                    stopped_at = Some(begin + processed);
                    break;
                }
            },
            None => results.next().await,
        };
        let Some((position, outcome)) = next else {
            break;
        };

        processed += 1;
        if let Err(source) = acc.record(position, outcome).await {
            return Err(commit_failed(db, &acc, options, position, source).await);
        }
    }

    if let Err(source) = acc.flush().await {
        let position = begin + processed;
        return Err(commit_failed(db, &acc, options, position, source).await);
    }

    if let Some(resume_from) = stopped_at {
        tracing::warn!(
            processed = processed,
            resume_from = resume_from,
            "Run deadline reached, stopping early"
        );
    }

    let retries = db.enqueue_retries(acc.failed_urls(), options.today).await?;

    let mut report = PassReport::new(total, skipped, processed, acc.stats());
    report.retries = retries;
    report.stopped_at = stopped_at;

    tracing::info!(
        processed = report.processed,
        skipped = report.skipped,
        succeeded = report.succeeded,
        failed = report.failed,
        committed = report.committed,
        commits = report.commits,
        "Pass finished"
    );

    Ok((report, acc.flushed_urls().to_vec()))
}

/// Queue the failures a rerun from `resume_from` would skip, then build the error.
async fn commit_failed(
    db: &Database,
    acc: &BatchAccumulator<'_>,
    options: &PassOptions,
    position: usize,
    source: crate::storage::DatabaseError,
) -> PipelineError {
    let resume_from = acc.resume_from();
    let settled = acc.settled_failures();
    if !settled.is_empty() {
        match db.enqueue_retries(settled, options.today).await {
            Ok(retries) => tracing::info!(
                queued = retries.queued,
                requeued = retries.requeued,
                "Queued failures before resume position"
            ),
            Err(e) => tracing::error!(
                count = settled.len(),
                error = %e,
                "Failed to queue failures before resume position"
            ),
        }
    }

    tracing::error!(
        position = position,
        resume_from = resume_from,
        error = %source,
        "Batch commit failed, aborting pass"
    );
    PipelineError::Commit {
        position,
        resume_from,
        source,
    }
}
