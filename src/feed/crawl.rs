//! Article discovery on a news site's front page.
//!
//! The crawler reads one HTML page, collects its links and keeps those that
//! point at articles of the same site. Whether a link is an article is
//! decided from the shape of its path: news sites put a slug, a numeric id
//! or a publication date in article URLs, while section, tag and search
//! pages have short fixed paths.

use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::OnceLock;
use url::Url;

use crate::storage::CandidateItem;

/// File extensions that never point to an article page.
const RESOURCE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "svg", "ico", "css", "js", "json", "xml", "rss", "pdf",
    "zip", "mp3", "mp4",
];

/// Path segments of navigation pages.
const NAVIGATION_SEGMENTS: &[&str] = &[
    "tag", "tags", "topik", "search", "cari", "login", "register", "author", "penulis", "indeks",
    "index", "feed", "rss", "about", "contact", "kontak", "privacy", "redaksi", "pedoman",
];

/// Minimum length of a slug segment such as `presiden-resmikan-bendungan`.
const MIN_SLUG_LEN: usize = 12;

fn anchor_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("a[href]").expect("static selector"))
}

/// Discover article links in `html`, resolved against `base`.
///
/// Returns one candidate per distinct article URL in document order, with
/// `id == link`, the anchor text as title, and a publication date when the
/// URL path carries one.
pub fn discover_articles(html: &str, base: &Url) -> Vec<CandidateItem> {
    let document = Html::parse_document(html);
    let site_host = base.host_str().map(strip_www).unwrap_or_default();

    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for element in document.select(anchor_selector()) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Ok(mut url) = base.join(href.trim()) else {
            continue;
        };
        url.set_fragment(None);

        if !is_same_site(&url, site_host) || !looks_like_article(&url) {
            continue;
        }

        let link = url.to_string();
        if !seen.insert(link.clone()) {
            continue;
        }

        let title = element
            .text()
            .collect::<Vec<_>>()
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let published_raw = date_from_path(&url).unwrap_or_default();

        items.push(CandidateItem {
            id: link.clone(),
            link,
            title,
            published_raw,
        });
    }

    items
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// http(s) URL on the site's host or one of its subdomains.
fn is_same_site(url: &Url, site_host: &str) -> bool {
    if !matches!(url.scheme(), "http" | "https") || site_host.is_empty() {
        return false;
    }
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = strip_www(host);
    host == site_host || host.ends_with(&format!(".{site_host}"))
}

fn looks_like_article(url: &Url) -> bool {
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();
    let Some(last) = segments.last() else {
        return false;
    };

    if let Some((_, ext)) = last.rsplit_once('.') {
        if RESOURCE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
            return false;
        }
    }

    if segments
        .iter()
        .any(|seg| NAVIGATION_SEGMENTS.contains(&seg.to_ascii_lowercase().as_str()))
    {
        return false;
    }

    if date_from_path(url).is_some() {
        return true;
    }

    segments.iter().any(|seg| {
        let stem = seg.split('.').next().unwrap_or(seg);
        let is_slug = stem.len() >= MIN_SLUG_LEN && stem.matches('-').count() >= 2;
        let is_numeric_id = stem.len() >= 5 && stem.chars().all(|c| c.is_ascii_digit());
        is_slug || is_numeric_id
    })
}

/// A `YYYY/MM/DD` sequence in the path, rendered as `YYYY-MM-DD`.
fn date_from_path(url: &Url) -> Option<String> {
    let segments: Vec<&str> = url.path_segments()?.collect();
    segments.windows(3).find_map(|w| {
        let year: i32 = (w[0].len() == 4).then(|| w[0].parse().ok()).flatten()?;
        let month: u32 = (w[1].len() == 2).then(|| w[1].parse().ok()).flatten()?;
        let day: u32 = (w[2].len() == 2).then(|| w[2].parse().ok()).flatten()?;
        chrono::NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format("%Y-%m-%d").to_string())
    })
}
