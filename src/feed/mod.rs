//! Source discovery: turning feeds and news sites into candidate items.
//!
//! - [`registry`] - The configured feed and site endpoints with their link filters
//! - [`parser`] - RSS/Atom parsing using the `feed-rs` crate
//! - [`crawl`] - Article link discovery on a site's front page
//! - [`filter`] - Substring filtering of candidate links
//! - [`fetcher`] - Per-source retrieval with failure isolation across a run

mod crawl;
mod fetcher;
mod filter;
mod parser;
mod registry;

pub use crawl::discover_articles;
pub use fetcher::{FetchSummary, Fetcher, SourceError, SourceOutcome};
pub use filter::accept;
pub use parser::{parse_feed, ParseResult};
pub use registry::{SourceDescriptor, SourceKind, SourceRegistry};
