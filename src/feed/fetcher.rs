use thiserror::Error;
use url::Url;

use super::crawl::discover_articles;
use super::filter::accept;
use super::parser::{parse_feed, ParseResult};
use super::registry::{SourceDescriptor, SourceKind};
use crate::http::{FetchError, HttpFetcher};
use crate::storage::CandidateItem;

/// Errors that can occur while reading one source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The endpoint is not a valid absolute URL
    #[error("Invalid endpoint '{0}'")]
    InvalidEndpoint(String),
    /// The endpoint could not be retrieved
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// Feed XML could not be parsed as RSS or Atom
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result of reading a single source during a multi-source run.
#[derive(Debug)]
pub struct SourceOutcome {
    pub kind: SourceKind,
    pub endpoint: String,
    /// Number of items accepted by the source's filters, or the error that occurred
    pub result: Result<usize, SourceError>,
}

/// Items gathered from every source of a run, with per-source outcomes.
#[derive(Debug, Default)]
pub struct FetchSummary {
    pub items: Vec<CandidateItem>,
    pub outcomes: Vec<SourceOutcome>,
}

impl FetchSummary {
    pub fn failed_sources(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }
}

/// Turns feed and site sources into filtered candidate items.
#[derive(Debug, Clone)]
pub struct Fetcher {
    http: HttpFetcher,
}

impl Fetcher {
    pub fn new(http: HttpFetcher) -> Self {
        Self { http }
    }

    /// Read one source and apply its link filters.
    pub async fn fetch_source(
        &self,
        kind: SourceKind,
        source: &SourceDescriptor,
    ) -> Result<Vec<CandidateItem>, SourceError> {
        let items = match kind {
            SourceKind::Feed => self.fetch_feed(&source.endpoint).await?,
            SourceKind::Site => self.crawl_site(&source.endpoint).await?,
        };

        let total = items.len();
        let accepted: Vec<CandidateItem> = items
            .into_iter()
            .filter(|item| accept(&source.filters, &item.link))
            .collect();

        tracing::debug!(
            endpoint = %source.endpoint,
            total = total,
            accepted = accepted.len(),
            "Applied source filters"
        );
        Ok(accepted)
    }

    /// Read every source in order, isolating failures.
    ///
    /// A source that cannot be fetched or parsed is logged and recorded in
    /// [`FetchSummary::outcomes`]; the remaining sources are still read.
    pub async fn fetch_all(&self, sources: &[(SourceKind, &SourceDescriptor)]) -> FetchSummary {
        let mut summary = FetchSummary::default();

        for &(kind, source) in sources {
            tracing::info!(kind = %kind, endpoint = %source.endpoint, "Fetching source");

            let result = match self.fetch_source(kind, source).await {
                Ok(items) => {
                    let count = items.len();
                    summary.items.extend(items);
                    Ok(count)
                }
                Err(e) => {
                    tracing::warn!(
                        kind = %kind,
                        endpoint = %source.endpoint,
                        error = %e,
                        "Source failed, continuing with remaining sources"
                    );
                    Err(e)
                }
            };

            summary.outcomes.push(SourceOutcome {
                kind,
                endpoint: source.endpoint.clone(),
                result,
            });
        }

        tracing::info!(
            sources = summary.outcomes.len(),
            failed = summary.failed_sources(),
            items = summary.items.len(),
            "Finished fetching sources"
        );
        summary
    }

    async fn fetch_feed(&self, endpoint: &str) -> Result<Vec<CandidateItem>, SourceError> {
        let bytes = self.http.fetch(endpoint).await?;
        let ParseResult { items, skipped } =
            parse_feed(&bytes).map_err(|e| SourceError::Parse(e.to_string()))?;

        if skipped > 0 {
            tracing::debug!(
                feed = %endpoint,
                skipped = skipped,
                "Feed entries without id or link skipped"
            );
        }
        Ok(items)
    }

    async fn crawl_site(&self, endpoint: &str) -> Result<Vec<CandidateItem>, SourceError> {
        let base =
            Url::parse(endpoint).map_err(|_| SourceError::InvalidEndpoint(endpoint.to_string()))?;
        let bytes = self.http.fetch(base.as_str()).await?;
        let html = String::from_utf8_lossy(&bytes);
        Ok(discover_articles(&html, &base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <item><guid>a</guid><title>A</title><link>https://x.id/nasional/a</link></item>
    <item><guid>b</guid><title>B</title><link>https://x.id/olahraga/b</link></item>
</channel></rss>"#;

    fn fetcher() -> Fetcher {
        Fetcher::new(HttpFetcher::new(reqwest::Client::new()).backoff_base(Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn test_feed_source_filtered() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rss"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .mount(&mock_server)
            .await;

        let source = SourceDescriptor::new(&format!("{}/rss", mock_server.uri()), &["/nasional/"]);
        let items = fetcher()
            .fetch_source(SourceKind::Feed, &source)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "a");
    }

    #[tokio::test]
    async fn test_failing_source_does_not_abort_run() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rss"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .mount(&mock_server)
            .await;

        let broken = SourceDescriptor::new(&format!("{}/broken", mock_server.uri()), &[]);
        let garbage = SourceDescriptor::new("not a url", &[]);
        let good = SourceDescriptor::new(&format!("{}/rss", mock_server.uri()), &[]);

        let summary = fetcher()
            .fetch_all(&[
                (SourceKind::Feed, &broken),
                (SourceKind::Site, &garbage),
                (SourceKind::Feed, &good),
            ])
            .await;

        assert_eq!(summary.items.len(), 2);
        assert_eq!(summary.failed_sources(), 2);
        assert!(matches!(
            summary.outcomes[0].result,
            Err(SourceError::Fetch(FetchError::HttpStatus(404)))
        ));
        assert!(matches!(
            summary.outcomes[1].result,
            Err(SourceError::InvalidEndpoint(_))
        ));
        assert!(matches!(summary.outcomes[2].result, Ok(2)));
    }

    #[tokio::test]
    async fn test_site_source_crawled() {
        let mock_server = MockServer::start().await;
        let html = r#"<html><body>
            <a href="/berita/2024/05/01/pemerintah-umumkan-kebijakan-baru">Kebijakan</a>
            <a href="/olahraga/2024/05/01/timnas-menang-besar-lagi">Timnas</a>
            <a href="/kontak">Kontak</a>
        </body></html>"#;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(html))
            .mount(&mock_server)
            .await;

        let source = SourceDescriptor::new(&mock_server.uri(), &["/berita/"]);
        let items = fetcher()
            .fetch_source(SourceKind::Site, &source)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].link.ends_with("/berita/2024/05/01/pemerintah-umumkan-kebijakan-baru"));
        assert_eq!(items[0].published_raw, "2024-05-01");
    }

    #[tokio::test]
    async fn test_malformed_feed_parse_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<not valid xml"))
            .mount(&mock_server)
            .await;

        let source = SourceDescriptor::new(&mock_server.uri(), &[]);
        match fetcher().fetch_source(SourceKind::Feed, &source).await {
            Err(SourceError::Parse(_)) => {}
            other => panic!("Expected Parse error, got {:?}", other),
        }
    }
}
