use chrono::NaiveDate;
use std::path::{Path, PathBuf};

use super::PipelineError;
use crate::feed::{Fetcher, SourceDescriptor, SourceKind, SourceRegistry};
use crate::storage::{IndexStore, INDEX_EXTENSION};

/// Outcome of one index-building run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexBuildReport {
    pub path: PathBuf,
    /// Sources read
    pub sources: usize,
    pub failed_sources: usize,
    /// Candidates that passed the source filters
    pub fetched: usize,
    /// Candidates new to the store
    pub inserted: usize,
}

/// `<dir>/<DDMMYYYY>.db`, the store written by the feed run.
pub fn feed_index_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("{}.{}", date.format("%d%m%Y"), INDEX_EXTENSION))
}

/// `<dir>/situs-<DDMMYYYY>.db`, the store written by the site run.
pub fn site_index_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("situs-{}.{}", date.format("%d%m%Y"), INDEX_EXTENSION))
}

/// Read every feed (and the sites crawled with them) into today's feed store.
pub async fn build_index_from_feeds(
    fetcher: &Fetcher,
    registry: &SourceRegistry,
    index_dir: &Path,
    today: NaiveDate,
) -> Result<IndexBuildReport, PipelineError> {
    let path = feed_index_path(index_dir, today);
    build_index(fetcher, &registry.feed_run(), path).await
}

/// Crawl every site into today's site store.
pub async fn build_index_from_sites(
    fetcher: &Fetcher,
    registry: &SourceRegistry,
    index_dir: &Path,
    today: NaiveDate,
) -> Result<IndexBuildReport, PipelineError> {
    let path = site_index_path(index_dir, today);
    build_index(fetcher, &registry.site_run(), path).await
}

async fn build_index(
    fetcher: &Fetcher,
    sources: &[(SourceKind, &SourceDescriptor)],
    path: PathBuf,
) -> Result<IndexBuildReport, PipelineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| PipelineError::IndexDir {
            path: parent.display().to_string(),
            source,
        })?;
    }

    let store = IndexStore::open(&path).await?;
    let summary = fetcher.fetch_all(sources).await;
    let inserted = store.insert_all(&summary.items).await?;
    store.close().await;

    let report = IndexBuildReport {
        path,
        sources: summary.outcomes.len(),
        failed_sources: summary.failed_sources(),
        fetched: summary.items.len(),
        inserted,
    };

    tracing::info!(
        store = %report.path.display(),
        fetched = report.fetched,
        inserted = report.inserted,
        failed_sources = report.failed_sources,
        "Index run finished"
    );
    Ok(report)
}
