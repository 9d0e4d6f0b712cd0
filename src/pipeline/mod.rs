//! The two ingestion stages.
//!
//! - [`build`] - Fetch every registered source into a dated index store
//! - [`pass`] - Replay merged index stores through extraction into the central store
//! - [`batch`] - Batch boundaries and the failure list of one pass
//! - [`worker`] - Extraction of a single candidate with date fallback

mod batch;
mod build;
mod pass;
mod worker;

use thiserror::Error;

use crate::storage::{DatabaseError, MergeError};

pub use batch::{BatchAccumulator, BatchStats};
pub use build::{
    build_index_from_feeds, build_index_from_sites, feed_index_path, site_index_path,
    IndexBuildReport,
};
pub use pass::{process_index, process_retries, PassOptions, PassReport};
pub use worker::{extract_candidate, ExtractFailure};

/// Errors that end a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A store could not be opened, queried or written
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// The index directory could not be merged
    #[error(transparent)]
    Merge(#[from] MergeError),

    /// The index directory could not be created
    #[error("Failed to create index directory '{path}': {source}")]
    IndexDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A batch transaction failed; nothing from `resume_from` on was stored
    #[error("Batch commit failed at position {position} (resume with begin index {resume_from}): {source}")]
    Commit {
        position: usize,
        resume_from: usize,
        #[source]
        source: DatabaseError,
    },
}
