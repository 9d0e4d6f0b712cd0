//! Article extraction from news pages.
//!
//! [`HtmlExtractor`] downloads a page and reads its metadata (Open Graph,
//! `<meta>` names, JSON-LD `NewsArticle` blocks) and its body. The body is the
//! group of sibling paragraphs with the most stopwords of the configured
//! [`Language`], which picks the article text over navigation, captions and
//! related-link lists.

use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use std::future::Future;
use std::sync::OnceLock;
use thiserror::Error;
use url::Url;

use super::date::parse_lenient_date;
use super::language::Language;
use crate::http::{FetchError, HttpFetcher};

/// Paragraphs with fewer stopwords than this do not count toward a block's score.
const MIN_PARAGRAPH_STOPWORDS: usize = 2;

/// Elements whose paragraphs are never article text.
const EXCLUDED_ANCESTORS: &[&str] = &["nav", "header", "footer", "aside", "form"];

const TITLE_KEYS: &[&str] = &["og:title", "twitter:title"];
const AUTHOR_KEYS: &[&str] = &["author", "article:author", "dc.creator", "byl", "content_author"];
const DATE_KEYS: &[&str] = &[
    "article:published_time",
    "og:published_time",
    "datepublished",
    "pubdate",
    "publishdate",
    "publish-date",
    "content_publisheddate",
    "dc.date.issued",
    "dc.date",
    "date",
];
const TITLE_SEPARATORS: &[&str] = &[" | ", " - ", " – "];
const IMAGE_KEYS: &[&str] = &["og:image", "og:image:url", "twitter:image", "twitter:image:src"];

/// Prefixes in front of author names ("Oleh Budi", "Penulis: Siti").
const AUTHOR_PREFIXES: &[&str] = &["oleh", "penulis", "reporter", "editor", "by"];

/// Errors that can occur while extracting one article.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The candidate link is not an absolute URL
    #[error("Invalid article URL '{0}'")]
    InvalidUrl(String),
    /// The article page could not be downloaded
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The page has no recognizable article text
    #[error("No article text found")]
    EmptyContent,
    /// Neither the page nor the index entry carries a usable publish date
    #[error("No publish date (index value '{0}' not recognized)")]
    MissingPublishDate(String),
}

/// Fields read from an article page before fallbacks are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawArticle {
    pub title: String,
    pub authors: Vec<String>,
    pub publish_date: Option<NaiveDate>,
    pub text: String,
    pub top_image: Option<String>,
}

/// Downloads and parses one article.
///
/// Implemented by [`HtmlExtractor`]; tests substitute deterministic stubs.
pub trait ArticleExtractor: Send + Sync {
    fn extract(&self, url: &str) -> impl Future<Output = Result<RawArticle, ExtractError>> + Send;
}

/// Extracts articles from HTML pages fetched over HTTP.
#[derive(Debug, Clone)]
pub struct HtmlExtractor {
    http: HttpFetcher,
    language: Language,
}

impl HtmlExtractor {
    pub fn new(http: HttpFetcher, language: Language) -> Self {
        Self { http, language }
    }
}

impl ArticleExtractor for HtmlExtractor {
    async fn extract(&self, url: &str) -> Result<RawArticle, ExtractError> {
        let page_url = Url::parse(url).map_err(|_| ExtractError::InvalidUrl(url.to_string()))?;
        let bytes = self.http.fetch(page_url.as_str()).await?;
        let html = String::from_utf8_lossy(&bytes);
        Ok(parse_document(&html, &page_url, self.language))
    }
}

// ============================================================================
// Document Parsing
// ============================================================================

struct Selectors {
    meta: Selector,
    title: Selector,
    h1: Selector,
    json_ld: Selector,
    time: Selector,
    author_elements: Selector,
    image_link: Selector,
    paragraph: Selector,
}

fn selectors() -> &'static Selectors {
    static SELECTORS: OnceLock<Selectors> = OnceLock::new();
    SELECTORS.get_or_init(|| {
        let parse = |css: &str| Selector::parse(css).expect("static selector");
        Selectors {
            meta: parse("meta[content]"),
            title: parse("title"),
            h1: parse("h1"),
            json_ld: parse(r#"script[type="application/ld+json"]"#),
            time: parse("time[datetime]"),
            author_elements: parse(r#"[rel="author"], [itemprop="author"]"#),
            image_link: parse(r#"link[rel="image_src"][href]"#),
            paragraph: parse("p"),
        }
    })
}

/// Read every field the page offers. Never fails: missing fields stay empty.
pub fn parse_document(html: &str, page_url: &Url, language: Language) -> RawArticle {
    let document = Html::parse_document(html);
    let metas = collect_metas(&document);
    let json_ld = collect_json_ld(&document);

    RawArticle {
        title: extract_title(&document, &metas),
        authors: extract_authors(&document, &metas, &json_ld),
        publish_date: extract_publish_date(&document, &metas, &json_ld, page_url),
        text: extract_text(&document, language),
        top_image: extract_top_image(&document, &metas, page_url),
    }
}

/// `(key, content)` for every `<meta>`, keyed by `property`, `name` or `itemprop` (lowercased).
fn collect_metas(document: &Html) -> Vec<(String, String)> {
    document
        .select(&selectors().meta)
        .filter_map(|el| {
            let attrs = el.value();
            let key = attrs
                .attr("property")
                .or_else(|| attrs.attr("name"))
                .or_else(|| attrs.attr("itemprop"))?;
            let content = attrs.attr("content")?.trim();
            (!content.is_empty()).then(|| (key.trim().to_ascii_lowercase(), content.to_string()))
        })
        .collect()
}

fn first_meta<'a>(metas: &'a [(String, String)], keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| {
        metas
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, content)| content.as_str())
    })
}

fn all_metas<'a>(metas: &'a [(String, String)], keys: &[&str]) -> Vec<&'a str> {
    metas
        .iter()
        .filter(|(name, _)| keys.contains(&name.as_str()))
        .map(|(_, content)| content.as_str())
        .collect()
}

fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// JSON-LD
// ============================================================================

#[derive(Debug, Default)]
struct JsonLdArticle {
    date_published: Option<String>,
    authors: Vec<String>,
}

fn collect_json_ld(document: &Html) -> JsonLdArticle {
    let mut article = JsonLdArticle::default();

    for script in document.select(&selectors().json_ld) {
        let raw: String = script.text().collect();
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&raw) else {
            tracing::debug!("Skipping malformed JSON-LD block");
            continue;
        };

        let mut objects = Vec::new();
        flatten_json_ld(&value, &mut objects);

        for object in objects.into_iter().filter(|o| is_article_type(o)) {
            if article.date_published.is_none() {
                article.date_published = object
                    .get("datePublished")
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
            }
            if let Some(author) = object.get("author") {
                collect_json_ld_names(author, &mut article.authors);
            }
        }
    }

    article
}

fn flatten_json_ld<'a>(value: &'a serde_json::Value, out: &mut Vec<&'a serde_json::Value>) {
    match value {
        serde_json::Value::Array(items) => items.iter().for_each(|v| flatten_json_ld(v, out)),
        serde_json::Value::Object(map) => {
            out.push(value);
            if let Some(graph) = map.get("@graph") {
                flatten_json_ld(graph, out);
            }
        }
        _ => {}
    }
}

fn is_article_type(object: &serde_json::Value) -> bool {
    let is_article = |t: &str| t.ends_with("Article") || t == "BlogPosting";
    match object.get("@type") {
        Some(serde_json::Value::String(t)) => is_article(t),
        Some(serde_json::Value::Array(types)) => {
            types.iter().filter_map(|t| t.as_str()).any(is_article)
        }
        _ => false,
    }
}

fn collect_json_ld_names(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::String(name) => out.push(name.clone()),
        serde_json::Value::Object(map) => {
            if let Some(name) = map.get("name").and_then(|n| n.as_str()) {
                out.push(name.to_string());
            }
        }
        serde_json::Value::Array(items) => {
            items.iter().for_each(|v| collect_json_ld_names(v, out))
        }
        _ => {}
    }
}

// ============================================================================
// Fields
// ============================================================================

fn extract_title(document: &Html, metas: &[(String, String)]) -> String {
    if let Some(title) = first_meta(metas, TITLE_KEYS) {
        return title.split_whitespace().collect::<Vec<_>>().join(" ");
    }

    if let Some(title) = document.select(&selectors().title).next().map(text_of) {
        if !title.is_empty() {
            return longest_title_segment(&title);
        }
    }

    document
        .select(&selectors().h1)
        .next()
        .map(text_of)
        .unwrap_or_default()
}

/// `<title>` usually carries the site name: "Headline - Kompas.com".
fn longest_title_segment(title: &str) -> String {
    let mut segments = vec![title];
    for separator in TITLE_SEPARATORS {
        segments = segments
            .into_iter()
            .flat_map(|segment| segment.split(separator))
            .collect();
    }
    segments
        .into_iter()
        .map(str::trim)
        .max_by_key(|segment| segment.chars().count())
        .unwrap_or(title)
        .to_string()
}

fn extract_authors(
    document: &Html,
    metas: &[(String, String)],
    json_ld: &JsonLdArticle,
) -> Vec<String> {
    let mut raw: Vec<String> = all_metas(metas, AUTHOR_KEYS)
        .into_iter()
        .map(str::to_string)
        .collect();
    raw.extend(json_ld.authors.iter().cloned());
    raw.extend(document.select(&selectors().author_elements).map(|el| {
        el.value()
            .attr("content")
            .map(str::to_string)
            .unwrap_or_else(|| text_of(el))
    }));

    let mut authors: Vec<String> = Vec::new();
    for name in raw.iter().flat_map(|value| split_authors(value)) {
        if !authors.iter().any(|a| a.eq_ignore_ascii_case(&name)) {
            authors.push(name);
        }
    }
    authors
}

fn split_authors(value: &str) -> Vec<String> {
    let value = value.trim();
    if value.starts_with("http://") || value.starts_with("https://") {
        return Vec::new();
    }

    strip_author_prefix(value)
        .replace(" dan ", ",")
        .replace(" and ", ",")
        .split([',', '&', '/', '|'])
        .map(|name| name.trim().trim_matches(|c: char| c == ':' || c == '-').trim())
        .filter(|name| {
            (2..=80).contains(&name.chars().count())
                && name.chars().any(char::is_alphabetic)
                && !name.contains("http")
        })
        .map(str::to_string)
        .collect()
}

fn strip_author_prefix(value: &str) -> &str {
    for prefix in AUTHOR_PREFIXES {
        let Some(head) = value.get(..prefix.len()) else {
            continue;
        };
        let rest = &value[prefix.len()..];
        if head.eq_ignore_ascii_case(prefix) && !rest.starts_with(char::is_alphabetic) {
            return rest.trim_start_matches([':', ' ']);
        }
    }
    value
}

fn extract_publish_date(
    document: &Html,
    metas: &[(String, String)],
    json_ld: &JsonLdArticle,
    page_url: &Url,
) -> Option<NaiveDate> {
    let meta_dates = DATE_KEYS
        .iter()
        .flat_map(|key| all_metas(metas, &[*key]))
        .map(str::to_string);
    let json_ld_date = json_ld.date_published.clone();
    let time_dates = document
        .select(&selectors().time)
        .filter_map(|el| el.value().attr("datetime").map(str::to_string));

    meta_dates
        .chain(json_ld_date)
        .chain(time_dates)
        .find_map(|raw| parse_lenient_date(&raw))
        .or_else(|| date_from_url(page_url))
}

/// A `/YYYY/MM/DD/` run of path segments.
fn date_from_url(url: &Url) -> Option<NaiveDate> {
    let segments: Vec<&str> = url.path_segments()?.collect();
    segments.windows(3).find_map(|w| {
        if w[0].len() != 4 || w[1].len() != 2 || w[2].len() != 2 {
            return None;
        }
        NaiveDate::from_ymd_opt(w[0].parse().ok()?, w[1].parse().ok()?, w[2].parse().ok()?)
    })
}

fn extract_top_image(document: &Html, metas: &[(String, String)], page_url: &Url) -> Option<String> {
    let candidate = first_meta(metas, IMAGE_KEYS).map(str::to_string).or_else(|| {
        document
            .select(&selectors().image_link)
            .next()
            .and_then(|el| el.value().attr("href"))
            .map(str::to_string)
    })?;

    let resolved = page_url.join(candidate.trim()).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

/// Body text: the paragraphs of the highest-scoring parent element, joined by blank lines.
fn extract_text(document: &Html, language: Language) -> String {
    struct Block {
        score: usize,
        paragraphs: Vec<String>,
    }

    let mut blocks: Vec<(_, Block)> = Vec::new();

    for paragraph in document.select(&selectors().paragraph) {
        if in_excluded_section(paragraph) {
            continue;
        }
        let Some(parent_id) = paragraph.parent().map(|p| p.id()) else {
            continue;
        };
        let text = text_of(paragraph);
        if text.is_empty() || language.is_boilerplate(&text) {
            continue;
        }

        let stopwords = language.stopword_count(&text);
        let score = if stopwords >= MIN_PARAGRAPH_STOPWORDS {
            stopwords
        } else {
            0
        };

        match blocks.iter_mut().find(|(id, _)| *id == parent_id) {
            Some((_, block)) => {
                block.score += score;
                block.paragraphs.push(text);
            }
            None => blocks.push((
                parent_id,
                Block {
                    score,
                    paragraphs: vec![text],
                },
            )),
        }
    }

    let mut best: Option<&Block> = None;
    for (_, block) in &blocks {
        if block.score > best.map_or(0, |b| b.score) {
            best = Some(block);
        }
    }

    best.map(|block| block.paragraphs.join("\n\n"))
        .unwrap_or_default()
}

fn in_excluded_section(element: ElementRef<'_>) -> bool {
    element.ancestors().any(|node| {
        node.value()
            .as_element()
            .is_some_and(|el| EXCLUDED_ANCESTORS.contains(&el.name()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KOMPAS_PAGE: &str = r#"<!DOCTYPE html>
<html><head>
    <title>Presiden Resmikan Bendungan Baru - Kompas.com</title>
    <meta property="og:title" content="Presiden Resmikan Bendungan Baru di Jawa Tengah">
    <meta name="author" content="Oleh Budi Santoso dan Siti Aminah">
    <meta property="article:published_time" content="2023-01-02T10:00:00+07:00">
    <meta property="og:image" content="/data/photo/2023/01/02/bendungan.jpg">
</head><body>
    <nav><p>Beranda yang ada di sini dan itu untuk menu</p></nav>
    <div class="read__content">
        <p>JAKARTA, KOMPAS.com - Presiden meresmikan bendungan yang dibangun sejak tahun 2019 di Jawa Tengah.</p>
        <p>Baca juga: Harga beras naik di pasar tradisional</p>
        <p>Bendungan tersebut akan mengairi sawah warga dan juga menjadi sumber air baku bagi kota.</p>
        <p>Menurut dia, proyek itu selesai lebih cepat dari jadwal karena cuaca yang mendukung.</p>
    </div>
    <div class="related"><p>Berita terkait</p></div>
</body></html>"#;

    fn page_url() -> Url {
        Url::parse("https://nasional.kompas.com/read/2023/01/02/10000011/presiden-resmikan-bendungan")
            .unwrap()
    }

    #[test]
    fn test_parse_metadata_and_body() {
        let article = parse_document(KOMPAS_PAGE, &page_url(), Language::Indonesian);

        assert_eq!(article.title, "Presiden Resmikan Bendungan Baru di Jawa Tengah");
        assert_eq!(article.authors, vec!["Budi Santoso", "Siti Aminah"]);
        assert_eq!(article.publish_date, NaiveDate::from_ymd_opt(2023, 1, 2));
        assert_eq!(
            article.top_image.as_deref(),
            Some("https://nasional.kompas.com/data/photo/2023/01/02/bendungan.jpg")
        );
        assert_eq!(
            article.text,
            "JAKARTA, KOMPAS.com - Presiden meresmikan bendungan yang dibangun sejak tahun 2019 di Jawa Tengah.\n\n\
             Bendungan tersebut akan mengairi sawah warga dan juga menjadi sumber air baku bagi kota.\n\n\
             Menurut dia, proyek itu selesai lebih cepat dari jadwal karena cuaca yang mendukung."
        );
    }

    #[test]
    fn test_json_ld_graph_and_title_fallback() {
        let html = r#"<html><head>
            <title>Warga Padati Lapangan Banteng | Suara.com</title>
            <script type="application/ld+json">
            {"@context": "https://schema.org", "@graph": [
                {"@type": "WebPage", "name": "Suara"},
                {"@type": "NewsArticle", "datePublished": "2024-03-05T18:15:00+07:00",
                 "author": [{"@type": "Person", "name": "Andi Wijaya"}, "Rina"]}
            ]}
            </script>
        </head><body><article><p>Warga datang dari berbagai daerah untuk melihat acara yang digelar di lapangan.</p></article></body></html>"#;
        let url = Url::parse("https://www.suara.com/news/warga-padati-lapangan").unwrap();
        let article = parse_document(html, &url, Language::Indonesian);

        assert_eq!(article.title, "Warga Padati Lapangan Banteng");
        assert_eq!(article.authors, vec!["Andi Wijaya", "Rina"]);
        assert_eq!(article.publish_date, NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(article.top_image, None);
    }

    #[test]
    fn test_date_from_url_when_page_has_none() {
        let html = "<html><body><h1>Judul</h1></body></html>";
        let article = parse_document(html, &page_url(), Language::Indonesian);
        assert_eq!(article.title, "Judul");
        assert_eq!(article.publish_date, NaiveDate::from_ymd_opt(2023, 1, 2));
        assert_eq!(article.text, "");

        let undated = Url::parse("https://x.id/berita/judul-tanpa-tanggal").unwrap();
        assert_eq!(parse_document(html, &undated, Language::Indonesian).publish_date, None);
    }

    #[test]
    fn test_author_prefixes_and_dedup() {
        assert_eq!(split_authors("Penulis: Rahmat"), vec!["Rahmat"]);
        assert_eq!(split_authors("By Jane Doe and John Roe"), vec!["Jane Doe", "John Roe"]);
        assert_eq!(split_authors("Bambang"), vec!["Bambang"]);
        assert!(split_authors("https://www.facebook.com/kompas").is_empty());

        let html = r#"<html><head>
            <meta name="author" content="Rina">
        </head><body><a rel="author" href="/penulis/rina">rina</a></body></html>"#;
        let article = parse_document(html, &page_url(), Language::Indonesian);
        assert_eq!(article.authors, vec!["Rina"]);
    }

    #[test]
    fn test_english_profile_scores_english_text() {
        let html = r#"<html><body>
            <div><p>Kata kata tanpa arti sama sekali</p></div>
            <div><p>The minister said that the dam will be finished by the end of the year.</p></div>
        </body></html>"#;
        let url = Url::parse("https://example.com/news/1").unwrap();
        let article = parse_document(html, &url, Language::English);
        assert_eq!(
            article.text,
            "The minister said that the dam will be finished by the end of the year."
        );
    }

    #[tokio::test]
    async fn test_extract_over_http() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/read/artikel"))
            .respond_with(ResponseTemplate::new(200).set_body_string(KOMPAS_PAGE))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/hilang"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let http = HttpFetcher::new(reqwest::Client::new()).backoff_base(Duration::from_millis(1));
        let extractor = HtmlExtractor::new(http, Language::Indonesian);

        let article = extractor
            .extract(&format!("{}/read/artikel", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(article.authors.len(), 2);
        assert!(article.top_image.unwrap().starts_with(&mock_server.uri()));

        let missing = extractor
            .extract(&format!("{}/hilang", mock_server.uri()))
            .await;
        assert!(matches!(
            missing,
            Err(ExtractError::Fetch(FetchError::HttpStatus(404)))
        ));

        let invalid = extractor.extract("bukan url").await;
        assert!(matches!(invalid, Err(ExtractError::InvalidUrl(_))));
    }
}
