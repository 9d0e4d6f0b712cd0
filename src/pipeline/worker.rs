use crate::content::{parse_lenient_date, ArticleExtractor, ExtractError};
use crate::storage::{ExtractedArticle, MergedCandidate};

/// A candidate whose extraction failed, destined for the retry queue.
#[derive(Debug)]
pub struct ExtractFailure {
    pub url: String,
    pub error: ExtractError,
}

/// Download and extract one candidate.
///
/// The publish date comes from the page when it has one, otherwise from the
/// candidate's `published_raw`. An empty body or an undatable article is a
/// failure. Errors are returned as values so the caller's batch continues.
pub async fn extract_candidate<E: ArticleExtractor>(
    extractor: &E,
    candidate: &MergedCandidate,
) -> Result<ExtractedArticle, ExtractFailure> {
    let fail = |error| ExtractFailure {
        url: candidate.link.clone(),
        error,
    };

    let raw = extractor.extract(&candidate.link).await.map_err(fail)?;

    if raw.text.trim().is_empty() {
        return Err(fail(ExtractError::EmptyContent));
    }

    let publish_date = raw
        .publish_date
        .or_else(|| parse_lenient_date(&candidate.published_raw))
        .ok_or_else(|| fail(ExtractError::MissingPublishDate(candidate.published_raw.clone())))?;

    Ok(ExtractedArticle {
        url: candidate.link.clone(),
        authors: raw.authors,
        publish_date,
        title: raw.title,
        text: raw.text,
        top_image: raw.top_image,
    })
}
