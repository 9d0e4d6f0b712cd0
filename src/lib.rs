//! News-article ingestion: builds deduplicated indexes of article links from
//! RSS feeds and site crawls, then downloads, extracts and stores the
//! articles in a central SQLite database.

pub mod config;
pub mod content;
pub mod feed;
pub mod http;
pub mod pipeline;
pub mod storage;
