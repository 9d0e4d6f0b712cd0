use serde::Deserialize;

/// A feed or site endpoint together with the link filters applied to its items.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceDescriptor {
    pub endpoint: String,
    #[serde(default)]
    pub filters: Vec<String>,
}

impl SourceDescriptor {
    pub fn new(endpoint: &str, filters: &[&str]) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            filters: filters.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// How a source is turned into candidate items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// RSS/Atom feed endpoint
    Feed,
    /// Website root crawled for article links
    Site,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Feed => f.write_str("feed"),
            SourceKind::Site => f.write_str("site"),
        }
    }
}

/// Every source the pipeline knows about, grouped by run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRegistry {
    /// Feeds read by the feed run
    pub feeds: Vec<SourceDescriptor>,
    /// Sites without a usable feed, crawled as part of the feed run
    pub feed_run_sites: Vec<SourceDescriptor>,
    /// Sites crawled by the site run
    pub sites: Vec<SourceDescriptor>,
}

impl SourceRegistry {
    /// Sources of the feed run, tagged with their kind.
    pub fn feed_run(&self) -> Vec<(SourceKind, &SourceDescriptor)> {
        self.feeds
            .iter()
            .map(|s| (SourceKind::Feed, s))
            .chain(self.feed_run_sites.iter().map(|s| (SourceKind::Site, s)))
            .collect()
    }

    /// Sources of the site run.
    pub fn site_run(&self) -> Vec<(SourceKind, &SourceDescriptor)> {
        self.sites.iter().map(|s| (SourceKind::Site, s)).collect()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        let feeds = vec![
            SourceDescriptor::new("http://www.republika.co.id/rss", &["/nasional/"]),
            SourceDescriptor::new(
                "http://feed.liputan6.com/rss2",
                &["news.liputan6", "pilkada.liputan6", "regional.liputan6"],
            ),
            SourceDescriptor::new("http://rss.detik.com/index.php/detikcom_nasional", &[]),
            SourceDescriptor::new("http://sindikasi.okezone.com/index.php/rss/1/RSS2.0", &[]),
            SourceDescriptor::new("https://www.merdeka.com/feed/", &[]),
            SourceDescriptor::new("http://rss.viva.co.id/get/nasional", &[]),
            SourceDescriptor::new("http://www.suara.com/rss/news", &[]),
            SourceDescriptor::new(
                "http://www.tribunnews.com/rss",
                &["/nasional/", "/regional/", "/metropolitan/"],
            ),
            SourceDescriptor::new(
                "https://rss.tempo.co/index.php/teco/news/feed/start/0/limit/50/kanal/6",
                &[],
            ),
            SourceDescriptor::new(
                "https://www.sindonews.com/feed",
                &["nasional.sindo", "daerah.sindo", "metro.sindo"],
            ),
            SourceDescriptor::new("http://feed.metrotvnews.com/news", &[]),
            SourceDescriptor::new("http://www.beritasatu.com/rss/nasional.xml", &[]),
            SourceDescriptor::new("http://rimanews.com/rss.xml", &["/nasional/", "/budaya/"]),
            SourceDescriptor::new("http://www.jpnn.com/index.php?mib=rss&id=215", &[]),
            SourceDescriptor::new("http://www.antaranews.com/rss/nasional", &[]),
        ];

        let kompas = SourceDescriptor::new(
            "http://nasional.kompas.com",
            &["/nasional.kompas", "megapolitan.kompas", "regional.kompas"],
        );

        let sites = vec![
            SourceDescriptor::new("http://www.republika.co.id", &["/nasional/"]),
            SourceDescriptor::new(
                "http://www.liputan6.com",
                &["news.liputan6", "pilkada.liputan6", "regional.liputan6"],
            ),
            SourceDescriptor::new("http://news.detik.com", &["/berita"]),
            SourceDescriptor::new("http://news.okezone.com", &["news.okezone"]),
            SourceDescriptor::new(
                "https://www.merdeka.com",
                &["/peristiwa", "/politik", "/uang", "/jakarta"],
            ),
            SourceDescriptor::new("http://www.viva.co.id", &[".news.viva"]),
            SourceDescriptor::new("http://www.suara.com", &["/news/"]),
            SourceDescriptor::new(
                "http://www.tribunnews.com",
                &["/nasional/", "/regional/", "/metropolitan/"],
            ),
            SourceDescriptor::new(
                "http://www.tempo.co",
                &["nasional.tempo", "pilkada.tempo", "metro.tempo"],
            ),
            SourceDescriptor::new(
                "http://www.sindonews.com",
                &["nasional.sindo", "daerah.sindo", "metro.sindo", "ekbis.sindo"],
            ),
            SourceDescriptor::new("http://www.metrotvnews.com", &["news.metro"]),
            SourceDescriptor::new(
                "http://www.beritasatu.com",
                &[
                    "/nasional/",
                    "/hukum/",
                    "/nusantara/",
                    "/megapolitan/",
                    "/bisnis/",
                    "/aktualitas/",
                ],
            ),
            SourceDescriptor::new("http://www.rimanews.com", &["/nasional/", "/budaya/"]),
            SourceDescriptor::new("http://www.jpnn.com", &["/news/"]),
            SourceDescriptor::new("http://www.antaranews.com", &["/berita/"]),
            kompas.clone(),
        ];

        Self {
            feeds,
            feed_run_sites: vec![kompas],
            sites,
        }
    }
}
