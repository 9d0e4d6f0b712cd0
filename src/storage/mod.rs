mod articles;
mod index;
mod merge;
mod retry;
mod schema;
mod types;

pub use index::{IndexStore, INDEX_EXTENSION};
pub use merge::{list_index_stores, merge_directory, MergeError};
pub use schema::Database;
pub use types::{
    CandidateItem, CommitReport, DatabaseError, ExtractedArticle, MergedCandidate, RetryRecord,
    RetryReport,
};
