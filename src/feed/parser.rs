use feed_rs::parser;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::storage::CandidateItem;

/// Outcome of parsing one feed document.
#[derive(Debug)]
pub struct ParseResult {
    pub items: Vec<CandidateItem>,
    /// Entries dropped for lacking an id or a link
    pub skipped: usize,
}

/// Parse RSS/Atom bytes into candidate items.
///
/// Entries without an identity or without a link are dropped.
///
/// `published_raw` is the entry's timestamp exactly as written in the
/// document (`pubDate`, `published`, `dc:date`, falling back to `updated`).
/// feed-rs normalizes timestamps to UTC, which can move an article published
/// early in the morning in UTC+7 to the previous day, so the raw text is
/// recovered with a separate scan. When the scan cannot be matched to the
/// parsed entries the normalized timestamp is rendered as RFC 2822 instead.
pub fn parse_feed(bytes: &[u8]) -> Result<ParseResult, parser::ParseFeedError> {
    // feed-rs hashes a substitute id for entries without `<guid>`/`<id>`;
    // leave it empty so those entries are dropped below.
    let feed = parser::Builder::new()
        .id_generator(|_, _, _| String::new())
        .build()
        .parse(bytes)?;
    let total = feed.entries.len();

    let raw_timestamps = raw_entry_timestamps(bytes).filter(|raw| raw.len() == total);
    if raw_timestamps.is_none() && total > 0 {
        tracing::debug!("Raw entry timestamps unavailable, using normalized dates");
    }

    let items: Vec<CandidateItem> = feed
        .entries
        .into_iter()
        .enumerate()
        .filter_map(|(position, entry)| {
            let id = entry.id.trim().to_string();
            if id.is_empty() {
                return None;
            }
            let link = entry.links.first().map(|l| l.href.trim().to_string())?;
            if link.is_empty() {
                return None;
            }
            let title = entry
                .title
                .map(|t| t.content.trim().to_string())
                .unwrap_or_default();

            let raw = raw_timestamps
                .as_ref()
                .map(|raw| raw[position].clone())
                .filter(|raw| !raw.is_empty());
            let published_raw = raw
                .or_else(|| entry.published.or(entry.updated).map(|dt| dt.to_rfc2822()))
                .unwrap_or_default();

            Some(CandidateItem {
                id,
                link,
                title,
                published_raw,
            })
        })
        .collect();

    Ok(ParseResult {
        skipped: total - items.len(),
        items,
    })
}

/// Timestamp text of every `<item>`/`<entry>` in document order.
///
/// Publication fields win over `updated`; entries without either yield an
/// empty string. Returns `None` if the document cannot be scanned.
fn raw_entry_timestamps(bytes: &[u8]) -> Option<Vec<String>> {
    #[derive(Clone, Copy)]
    enum Field {
        Published,
        Updated,
    }

    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut timestamps = Vec::new();

    let mut in_entry = false;
    let mut capturing: Option<Field> = None;
    let mut published: Option<String> = None;
    let mut updated: Option<String> = None;

    loop {
        let event = reader.read_event_into(&mut buf).ok()?;
        match event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"item" | b"entry" => {
                    in_entry = true;
                    published = None;
                    updated = None;
                }
                b"pubDate" | b"published" | b"date" | b"issued" if in_entry => {
                    capturing = Some(Field::Published);
                }
                b"updated" | b"modified" if in_entry => capturing = Some(Field::Updated),
                _ => capturing = None,
            },
            Event::Text(t) => {
                if let Some(field) = capturing {
                    let text = t.unescape().ok()?.trim().to_string();
                    store_first(field_slot(field, &mut published, &mut updated), text);
                }
            }
            Event::CData(c) => {
                if let Some(field) = capturing {
                    let text = String::from_utf8_lossy(&c.into_inner()).trim().to_string();
                    store_first(field_slot(field, &mut published, &mut updated), text);
                }
            }
            Event::End(e) => {
                capturing = None;
                if matches!(e.local_name().as_ref(), b"item" | b"entry") && in_entry {
                    in_entry = false;
                    timestamps.push(
                        published
                            .take()
                            .or_else(|| updated.take())
                            .unwrap_or_default(),
                    );
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    fn field_slot<'a>(
        field: Field,
        published: &'a mut Option<String>,
        updated: &'a mut Option<String>,
    ) -> &'a mut Option<String> {
        match field {
            Field::Published => published,
            Field::Updated => updated,
        }
    }

    fn store_first(slot: &mut Option<String>, text: String) {
        if slot.is_none() && !text.is_empty() {
            *slot = Some(text);
        }
    }

    Some(timestamps)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Berita Nasional</title>
    <item>
        <guid>https://example.com/nasional/1</guid>
        <title>Satu</title>
        <link>https://example.com/nasional/1</link>
        <pubDate>Tue, 03 Jan 2023 05:00:00 +0700</pubDate>
    </item>
    <item>
        <guid>no-link</guid>
        <title>Tanpa tautan</title>
    </item>
    <item>
        <guid>https://example.com/nasional/2</guid>
        <title>Dua</title>
        <link>https://example.com/nasional/2</link>
    </item>
</channel></rss>"#;

    #[test]
    fn test_parse_rss_items() {
        let result = parse_feed(RSS.as_bytes()).unwrap();
        assert_eq!(result.items.len(), 2);
        assert_eq!(result.skipped, 1);

        let first = &result.items[0];
        assert_eq!(first.id, "https://example.com/nasional/1");
        assert_eq!(first.link, "https://example.com/nasional/1");
        assert_eq!(first.title, "Satu");
        // Kept as written, not shifted to the UTC date (2 Jan)
        assert_eq!(first.published_raw, "Tue, 03 Jan 2023 05:00:00 +0700");

        assert_eq!(result.items[1].published_raw, "");
    }

    #[test]
    fn test_items_without_guid_are_dropped() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Berita</title>
    <item>
        <title>Tanpa guid</title>
        <link>https://example.com/nasional/9</link>
        <pubDate>Tue, 03 Jan 2023 05:00:00 +0700</pubDate>
    </item>
    <item>
        <guid>g1</guid>
        <title>Dengan guid</title>
        <link>https://example.com/nasional/10</link>
        <pubDate>Tue, 03 Jan 2023 06:00:00 +0700</pubDate>
    </item>
</channel></rss>"#;
        let result = parse_feed(rss.as_bytes()).unwrap();
        assert_eq!(result.skipped, 1);
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].id, "g1");
        assert_eq!(result.items[0].link, "https://example.com/nasional/10");
        assert_eq!(result.items[0].published_raw, "Tue, 03 Jan 2023 06:00:00 +0700");
    }

    #[test]
    fn test_parse_atom_prefers_published_over_updated() {
        let atom = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example</title>
  <entry>
    <id>urn:1</id>
    <title>First</title>
    <link href="https://example.com/post/1"/>
    <updated>2024-01-05T00:00:00Z</updated>
    <published>2024-01-01T08:00:00+07:00</published>
  </entry>
  <entry>
    <id>urn:2</id>
    <title>Second</title>
    <link href="https://example.com/post/2"/>
    <updated>2024-01-06T00:00:00Z</updated>
  </entry>
</feed>"#;
        let result = parse_feed(atom.as_bytes()).unwrap();
        assert_eq!(result.items.len(), 2);
        assert_eq!(result.items[0].id, "urn:1");
        assert_eq!(result.items[0].published_raw, "2024-01-01T08:00:00+07:00");
        assert_eq!(result.items[1].published_raw, "2024-01-06T00:00:00Z");
    }

    #[test]
    fn test_raw_timestamps_in_document_order() {
        let raw = raw_entry_timestamps(RSS.as_bytes()).unwrap();
        assert_eq!(raw, vec!["Tue, 03 Jan 2023 05:00:00 +0700", "", ""]);
    }

    #[test]
    fn test_parse_invalid_xml() {
        assert!(parse_feed(b"<not valid xml").is_err());
    }
}
