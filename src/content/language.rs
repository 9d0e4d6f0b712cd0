use std::fmt;
use std::str::FromStr;

/// Language profile used to score paragraphs and strip boilerplate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    Indonesian,
    English,
}

const STOPWORDS_ID: &[&str] = &[
    "ada", "adalah", "agar", "akan", "antara", "atau", "bagi", "bahwa", "banyak", "belum",
    "bisa", "dalam", "dan", "dari", "dengan", "di", "dia", "hanya", "harus", "hingga", "ia",
    "ini", "itu", "jika", "juga", "kami", "karena", "ke", "kepada", "kita", "lebih", "masih",
    "menjadi", "mereka", "namun", "oleh", "pada", "para", "saat", "sebagai", "secara", "sejak",
    "sudah", "telah", "tersebut", "tidak", "untuk", "yang",
];

const STOPWORDS_EN: &[&str] = &[
    "a", "about", "after", "also", "an", "and", "are", "as", "at", "be", "been", "but", "by",
    "for", "from", "had", "has", "have", "he", "her", "his", "in", "is", "it", "its", "not", "of",
    "on", "or", "said", "she", "that", "the", "their", "they", "this", "to", "was", "were",
    "which", "who", "will", "with",
];

/// Paragraph openings that mark related-article links and ad slots.
const BOILERPLATE_ID: &[&str] = &[
    "baca juga",
    "baca:",
    "simak juga",
    "lihat juga",
    "advertisement",
    "scroll to continue",
];

const BOILERPLATE_EN: &[&str] = &["read more", "read also", "advertisement", "related:"];

impl Language {
    /// ISO 639-1 code.
    pub fn code(self) -> &'static str {
        match self {
            Language::Indonesian => "id",
            Language::English => "en",
        }
    }

    fn stopwords(self) -> &'static [&'static str] {
        match self {
            Language::Indonesian => STOPWORDS_ID,
            Language::English => STOPWORDS_EN,
        }
    }

    /// Number of stopwords in `text`.
    pub fn stopword_count(self, text: &str) -> usize {
        let stopwords = self.stopwords();
        text.split_whitespace()
            .map(|w| {
                w.trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase()
            })
            .filter(|w| stopwords.contains(&w.as_str()))
            .count()
    }

    /// True when the paragraph is a "read also" link, ad label or similar.
    pub fn is_boilerplate(self, paragraph: &str) -> bool {
        let prefixes = match self {
            Language::Indonesian => BOILERPLATE_ID,
            Language::English => BOILERPLATE_EN,
        };
        let lower = paragraph.trim_start().to_lowercase();
        prefixes.iter().any(|p| lower.starts_with(p))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" | "indonesian" => Ok(Language::Indonesian),
            "en" | "english" => Ok(Language::English),
            other => Err(format!("unsupported language '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_codes() {
        assert_eq!("id".parse::<Language>(), Ok(Language::Indonesian));
        assert_eq!(" EN ".parse::<Language>(), Ok(Language::English));
        assert!("fr".parse::<Language>().is_err());
    }

    #[test]
    fn test_stopword_count() {
        let text = "Presiden mengatakan bahwa pembangunan itu akan selesai.";
        assert_eq!(Language::Indonesian.stopword_count(text), 3);
        assert_eq!(Language::English.stopword_count(text), 0);
    }

    #[test]
    fn test_boilerplate() {
        assert!(Language::Indonesian.is_boilerplate("Baca juga: Harga cabai naik"));
        assert!(!Language::Indonesian.is_boilerplate("Harga cabai naik lagi."));
    }
}
