//! Article content extraction.
//!
//! - [`extractor`] - The [`ArticleExtractor`] seam and its HTML implementation
//! - [`date`] - Lenient parsing of publish timestamps found in feeds and pages
//! - [`language`] - Stopword and boilerplate profiles (Indonesian by default)

mod date;
mod extractor;
mod language;

pub use date::parse_lenient_date;
pub use extractor::{parse_document, ArticleExtractor, ExtractError, HtmlExtractor, RawArticle};
pub use language::Language;
