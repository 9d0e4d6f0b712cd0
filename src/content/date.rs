use chrono::{DateTime, NaiveDate};

/// Indonesian and English month names (full and abbreviated), mapped to the
/// English abbreviation chrono understands.
const MONTHS: &[(&str, &str)] = &[
    ("januari", "Jan"),
    ("january", "Jan"),
    ("jan", "Jan"),
    ("februari", "Feb"),
    ("february", "Feb"),
    ("peb", "Feb"),
    ("feb", "Feb"),
    ("maret", "Mar"),
    ("march", "Mar"),
    ("mar", "Mar"),
    ("april", "Apr"),
    ("apr", "Apr"),
    ("mei", "May"),
    ("may", "May"),
    ("juni", "Jun"),
    ("june", "Jun"),
    ("jun", "Jun"),
    ("juli", "Jul"),
    ("july", "Jul"),
    ("jul", "Jul"),
    ("agustus", "Aug"),
    ("august", "Aug"),
    ("agu", "Aug"),
    ("agt", "Aug"),
    ("ags", "Aug"),
    ("aug", "Aug"),
    ("september", "Sep"),
    ("sept", "Sep"),
    ("sep", "Sep"),
    ("oktober", "Oct"),
    ("october", "Oct"),
    ("okt", "Oct"),
    ("oct", "Oct"),
    ("november", "Nov"),
    ("nopember", "Nov"),
    ("nov", "Nov"),
    ("desember", "Dec"),
    ("december", "Dec"),
    ("des", "Dec"),
    ("dec", "Dec"),
];

/// Tokens dropped before format matching: weekdays, time zone labels, filler.
const NOISE: &[&str] = &[
    "senin", "selasa", "rabu", "kamis", "jumat", "jum'at", "sabtu", "minggu", "monday", "tuesday",
    "wednesday", "thursday", "friday", "saturday", "sunday", "mon", "tue", "wed", "thu", "fri",
    "sat", "sun", "wib", "wita", "wit", "pukul", "|", "-",
];

/// Formats tried when the text starts with a four-digit year.
const YEAR_FIRST: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

/// Formats tried otherwise (day before month, as written in Indonesia).
const DAY_FIRST: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%d %b %Y", "%b %d %Y"];

/// Parse a free-form timestamp into the calendar date it names.
///
/// Accepts RFC 3339, RFC 2822 and common news-site layouts such as
/// `2023-01-02 10:00:00`, `02/01/2023`, `Senin, 02 Januari 2023 10:00 WIB` or
/// `January 2, 2023`. Anything after the date (a time, an offset) is
/// ignored. The date is taken as written: `Mon, 02 Jan 2023 01:00:00 +0700`
/// is 2 January even though it is still 1 January in UTC.
///
/// Returns `None` when no date can be recognized.
pub fn parse_lenient_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.date_naive());
    }

    let normalized = normalize(raw);
    let formats = if starts_with_year(&normalized) {
        YEAR_FIRST
    } else {
        DAY_FIRST
    };

    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_and_remainder(&normalized, fmt).ok())
        .map(|(date, _rest)| date)
}

/// Token cleanup ahead of format matching. Month names become chrono's English abbreviations.
fn normalize(raw: &str) -> String {
    raw.split_whitespace()
        .filter_map(|token| {
            let token = token.trim_matches(',');
            let lower = token.to_lowercase();
            if token.is_empty() || NOISE.contains(&lower.as_str()) {
                return None;
            }
            let translated = MONTHS
                .iter()
                .find(|(name, _)| *name == lower.trim_end_matches('.'))
                .map(|(_, english)| english.to_string());
            Some(translated.unwrap_or_else(|| token.to_string()))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn starts_with_year(s: &str) -> bool {
    let digits = s.chars().take_while(|c| c.is_ascii_digit()).count();
    digits == 4
}
