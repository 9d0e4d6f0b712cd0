//! Integration tests for the index stage: fetch sources into dated stores,
//! re-run idempotently, and merge stores across a directory.
//!
//! Each test works in its own directory under the system temp dir and serves
//! its feeds and sites from a wiremock server.

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use berita::feed::{Fetcher, SourceDescriptor, SourceRegistry};
use berita::http::HttpFetcher;
use berita::pipeline::{build_index_from_feeds, build_index_from_sites, feed_index_path};
use berita::storage::{merge_directory, CandidateItem, IndexStore};

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("berita_index_it_{}", name));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn fetcher() -> Fetcher {
    Fetcher::new(HttpFetcher::new(reqwest::Client::new()).backoff_base(Duration::from_millis(1)))
}

fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
}

fn item(id: &str, link: &str) -> CandidateItem {
    CandidateItem {
        id: id.to_string(),
        link: link.to_string(),
        title: format!("Judul {id}"),
        published_raw: "Mon, 02 Jan 2023 10:00:00 +0700".to_string(),
    }
}

const NASIONAL_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Nasional</title>
    <item>
        <guid>https://x.id/nasional/1</guid>
        <title>Satu</title>
        <link>https://x.id/nasional/1</link>
        <pubDate>Mon, 02 Jan 2023 10:00:00 +0700</pubDate>
    </item>
    <item>
        <guid>https://x.id/olahraga/2</guid>
        <title>Dua</title>
        <link>https://x.id/olahraga/2</link>
        <pubDate>Mon, 02 Jan 2023 11:00:00 +0700</pubDate>
    </item>
    <item>
        <guid>https://x.id/nasional/3</guid>
        <title>Tiga</title>
        <link>https://x.id/nasional/3</link>
        <pubDate>Mon, 02 Jan 2023 12:00:00 +0700</pubDate>
    </item>
</channel></rss>"#;

// ============================================================================
// Feed Run
// ============================================================================

#[tokio::test]
async fn test_feed_run_filters_and_is_idempotent() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss/nasional"))
        .respond_with(ResponseTemplate::new(200).set_body_string(NASIONAL_FEED))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rss/mati"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let registry = SourceRegistry {
        feeds: vec![
            SourceDescriptor::new(&format!("{}/rss/mati", mock_server.uri()), &[]),
            SourceDescriptor::new(&format!("{}/rss/nasional", mock_server.uri()), &["/nasional/"]),
        ],
        feed_run_sites: vec![],
        sites: vec![],
    };
    let dir = temp_dir("feed_run");

    let first = build_index_from_feeds(&fetcher(), &registry, &dir, run_date())
        .await
        .unwrap();
    assert_eq!(first.path, feed_index_path(&dir, run_date()));
    assert!(first.path.ends_with("02012023.db"));
    assert_eq!(first.failed_sources, 1);
    assert_eq!(first.fetched, 2);
    assert_eq!(first.inserted, 2);

    let second = build_index_from_feeds(&fetcher(), &registry, &dir, run_date())
        .await
        .unwrap();
    assert_eq!(second.fetched, 2);
    assert_eq!(second.inserted, 0);

    let store = IndexStore::open_existing(&first.path).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 2);
    let rows = store.links().await.unwrap();
    assert_eq!(rows[0].link, "https://x.id/nasional/1");
    assert_eq!(rows[0].published_raw, "Mon, 02 Jan 2023 10:00:00 +0700");
    assert_eq!(rows[1].link, "https://x.id/nasional/3");
}

#[tokio::test]
async fn test_site_run_writes_site_store() {
    let mock_server = MockServer::start().await;
    let html = r#"<html><body>
        <a href="/news/2023/01/02/100000/banjir-melanda-kawasan-utara">Banjir</a>
        <a href="/lifestyle/2023/01/02/100500/resep-kue-lebaran-sederhana">Resep</a>
        <a href="/tag/banjir">Tag</a>
    </body></html>"#;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(&mock_server)
        .await;

    let registry = SourceRegistry {
        feeds: vec![],
        feed_run_sites: vec![],
        sites: vec![SourceDescriptor::new(&mock_server.uri(), &["/news/"])],
    };
    let dir = temp_dir("site_run");

    let report = build_index_from_sites(&fetcher(), &registry, &dir, run_date())
        .await
        .unwrap();
    assert!(report.path.ends_with("situs-02012023.db"));
    assert_eq!(report.inserted, 1);

    let store = IndexStore::open_existing(&report.path).await.unwrap();
    let ids = store.ids().await.unwrap();
    let rows = store.links().await.unwrap();
    assert_eq!(ids[0], rows[0].link);
    assert_eq!(rows[0].published_raw, "2023-01-02");
}

// ============================================================================
// Merge
// ============================================================================

#[tokio::test]
async fn test_merge_first_store_wins_across_runs() {
    let dir = temp_dir("merge");

    let older = IndexStore::open(dir.join("01012023.db")).await.unwrap();
    older
        .insert_all(&[item("a", "https://x/1"), item("b", "https://x/2")])
        .await
        .unwrap();
    older.close().await;

    let newer = IndexStore::open(dir.join("02012023.db")).await.unwrap();
    let mut duplicate = item("c", "https://x/1");
    duplicate.published_raw = "2023-01-02".to_string();
    newer
        .insert_all(&[duplicate, item("d", "https://x/3")])
        .await
        .unwrap();
    newer.close().await;

    let merged = merge_directory(&dir, &[]).await.unwrap();
    let links: Vec<_> = merged.iter().map(|m| m.link.as_str()).collect();
    assert_eq!(links, vec!["https://x/1", "https://x/2", "https://x/3"]);
    assert_eq!(merged[0].published_raw, "Mon, 02 Jan 2023 10:00:00 +0700");
}

#[tokio::test]
async fn test_merge_empty_directory() {
    let dir = temp_dir("merge_empty");
    std::fs::write(dir.join("catatan.txt"), "bukan store").unwrap();
    let merged = merge_directory(&dir, &[]).await.unwrap();
    assert!(merged.is_empty());
}
