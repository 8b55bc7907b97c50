use serde::{Deserialize, Serialize};

/// Domain and path rules used by [`UrlClassifier`](crate::domains::url_filters::UrlClassifier).
///
/// Domain patterns are matched case-insensitively with `www.` stripped.
/// `*.base` matches `base` and any subdomain of it; a plain pattern matches
/// itself and any subdomain of itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlFilterConfig {
    pub domain_blocklist: Vec<String>,
    /// Substrings matched against the lowercased URL path.
    pub path_blocklist: Vec<String>,
    pub aggregator_domains: Vec<String>,
    pub domain_allowlist: Vec<String>,
    /// When false, GitHub URLs classify as blocked.
    pub github_valid: bool,
}

impl Default for UrlFilterConfig {
    fn default() -> Self {
        Self {
            domain_blocklist: to_strings(DEFAULT_DOMAIN_BLOCKLIST),
            path_blocklist: to_strings(DEFAULT_PATH_BLOCKLIST),
            aggregator_domains: to_strings(DEFAULT_AGGREGATOR_DOMAINS),
            domain_allowlist: to_strings(DEFAULT_DOMAIN_ALLOWLIST),
            github_valid: true,
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Social networks, app stores, encyclopedias and news outlets.
const DEFAULT_DOMAIN_BLOCKLIST: &[&str] = &[
    "facebook.com",
    "instagram.com",
    "twitter.com",
    "x.com",
    "linkedin.com",
    "youtube.com",
    "tiktok.com",
    "reddit.com",
    "pinterest.com",
    "quora.com",
    "medium.com",
    "substack.com",
    "*.wikipedia.org",
    "apps.apple.com",
    "play.google.com",
    "techcrunch.com",
    "forbes.com",
    "venturebeat.com",
    "theverge.com",
    "wired.com",
    "bloomberg.com",
    "reuters.com",
    "businessinsider.com",
    "zdnet.com",
    "nytimes.com",
];

/// Paths that point at content about a product rather than the product itself.
const DEFAULT_PATH_BLOCKLIST: &[&str] = &[
    "/blog/",
    "/news/",
    "/article",
    "/press/",
    "/careers",
    "/jobs/",
    "/tag/",
    "/category/",
    "/author/",
    "/podcast",
    "/webinar",
    "/case-studies",
    "/changelog",
    "/privacy",
    "/terms",
];

/// Directories and launch sites whose listing pages link out to products.
const DEFAULT_AGGREGATOR_DOMAINS: &[&str] = &[
    "producthunt.com",
    "ycombinator.com",
    "theresanaiforthat.com",
    "futuretools.io",
    "futurepedia.io",
    "topai.tools",
    "aiagentstore.ai",
    "aiagentslist.com",
    "alternativeto.net",
    "g2.com",
    "capterra.com",
    "crunchbase.com",
];

/// Hosts where a deep link is the product's canonical home.
const DEFAULT_DOMAIN_ALLOWLIST: &[&str] = &[
    "huggingface.co",
    "chromewebstore.google.com",
    "marketplace.visualstudio.com",
];
