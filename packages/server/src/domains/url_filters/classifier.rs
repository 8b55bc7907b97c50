//! Candidate URL classification.
//!
//! Tags are evaluated in strict precedence order and the first match wins:
//! blocked, aggregator, github, allowlist, non_root, normal.

use super::models::{UrlClassification, UrlFilterConfig};
use super::normalize::{domain_of, parse_lenient};

/// Paths that count as a site root even though they are non-empty.
const ROOT_PATHS: &[&str] = &["", "/en", "/en-us", "/en-gb"];

#[derive(Debug, Clone)]
pub struct UrlClassifier {
    config: UrlFilterConfig,
}

impl UrlClassifier {
    pub fn new(config: UrlFilterConfig) -> Self {
        let normalize = |patterns: Vec<String>| -> Vec<String> {
            patterns
                .into_iter()
                .map(|p| normalize_pattern(&p))
                .filter(|p| !p.is_empty())
                .collect()
        };

        Self {
            config: UrlFilterConfig {
                domain_blocklist: normalize(config.domain_blocklist),
                path_blocklist: config
                    .path_blocklist
                    .into_iter()
                    .map(|p| p.trim().to_lowercase())
                    .filter(|p| !p.is_empty())
                    .collect(),
                aggregator_domains: normalize(config.aggregator_domains),
                domain_allowlist: normalize(config.domain_allowlist),
                github_valid: config.github_valid,
            },
        }
    }

    pub fn config(&self) -> &UrlFilterConfig {
        &self.config
    }

    pub fn classify(&self, url: &str) -> UrlClassification {
        let domain = domain_of(url);
        let path = path_of(url);

        if self.blocked_domain(&domain).is_some() {
            return UrlClassification::Blocked;
        }

        let aggregator = self.is_aggregator_domain(&domain);
        if !aggregator && self.blocked_path(&path).is_some() {
            return UrlClassification::Blocked;
        }

        if aggregator {
            return UrlClassification::Aggregator;
        }

        if is_github_domain(&domain) {
            return if self.config.github_valid {
                UrlClassification::Github
            } else {
                UrlClassification::Blocked
            };
        }

        if matches_any(&domain, &self.config.domain_allowlist) {
            return UrlClassification::Allowlist;
        }

        if is_non_root(&path) {
            return UrlClassification::NonRoot;
        }

        UrlClassification::Normal
    }

    /// Human-readable explanation for a blocked URL, `None` when it is not blocked.
    pub fn block_reason(&self, url: &str) -> Option<String> {
        let domain = domain_of(url);

        if let Some(pattern) = self.blocked_domain(&domain) {
            return Some(format!("Domain '{}' is in blocklist", pattern));
        }

        if !self.is_aggregator_domain(&domain) {
            if let Some(pattern) = self.blocked_path(&path_of(url)) {
                return Some(format!("Path contains blocked pattern '{}'", pattern));
            }
        }

        if !self.config.github_valid && is_github_domain(&domain) {
            return Some("GitHub URLs are not accepted".to_string());
        }

        None
    }

    pub fn is_aggregator_domain(&self, domain: &str) -> bool {
        matches_any(domain, &self.config.aggregator_domains)
    }

    fn blocked_domain(&self, domain: &str) -> Option<&str> {
        self.config
            .domain_blocklist
            .iter()
            .find(|pattern| domain_matches(domain, pattern))
            .map(String::as_str)
    }

    fn blocked_path(&self, path: &str) -> Option<&str> {
        self.config
            .path_blocklist
            .iter()
            .find(|pattern| path.contains(pattern.as_str()))
            .map(String::as_str)
    }
}

fn normalize_pattern(pattern: &str) -> String {
    let lowered = pattern.trim().to_lowercase();
    lowered.strip_prefix("www.").unwrap_or(&lowered).to_string()
}

/// `*.base` matches `base` and its subdomains; `base` matches itself and its subdomains.
fn domain_matches(domain: &str, pattern: &str) -> bool {
    if domain.is_empty() {
        return false;
    }
    let base = pattern.strip_prefix("*.").unwrap_or(pattern);
    domain == base || domain.ends_with(&format!(".{}", base))
}

fn matches_any(domain: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|pattern| domain_matches(domain, pattern))
}

fn is_github_domain(domain: &str) -> bool {
    domain == "github.com" || domain == "github.io" || domain.ends_with(".github.io")
}

fn path_of(url: &str) -> String {
    parse_lenient(url)
        .map(|u| u.path().to_lowercase())
        .unwrap_or_default()
}

fn is_non_root(path: &str) -> bool {
    let trimmed = path.trim_end_matches('/');
    if ROOT_PATHS.contains(&trimmed) {
        return false;
    }
    trimmed.split('/').any(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> UrlClassifier {
        UrlClassifier::new(UrlFilterConfig {
            domain_blocklist: vec!["facebook.com".into(), "*.wikipedia.org".into(), "WWW.Medium.com".into()],
            path_blocklist: vec!["/blog/".into(), "/news/".into()],
            aggregator_domains: vec!["producthunt.com".into(), "*.example.com".into()],
            domain_allowlist: vec!["huggingface.co".into()],
            github_valid: true,
        })
    }

    #[test]
    fn precedence_order() {
        let c = classifier();

        assert_eq!(c.classify("https://facebook.com/fooai"), UrlClassification::Blocked);
        assert_eq!(c.classify("https://foo.ai/blog/launch"), UrlClassification::Blocked);
        assert_eq!(c.classify("https://www.producthunt.com/posts/foo"), UrlClassification::Aggregator);
        assert_eq!(c.classify("https://github.com/acme/agent"), UrlClassification::Github);
        assert_eq!(c.classify("https://huggingface.co/spaces/acme/agent"), UrlClassification::Allowlist);
        assert_eq!(c.classify("https://foo.ai/features/agents"), UrlClassification::NonRoot);
        assert_eq!(c.classify("https://foo.ai"), UrlClassification::Normal);
    }

    #[test]
    fn aggregators_are_exempt_from_path_blocklist() {
        let c = classifier();
        assert_eq!(
            c.classify("https://producthunt.com/blog/foo"),
            UrlClassification::Aggregator
        );
        assert_eq!(c.block_reason("https://producthunt.com/blog/foo"), None);
    }

    #[test]
    fn wildcard_matches_base_and_subdomains() {
        let c = classifier();
        assert_eq!(c.classify("https://en.wikipedia.org/wiki/Agent"), UrlClassification::Blocked);
        assert_eq!(c.classify("https://wikipedia.org"), UrlClassification::Blocked);
        assert_eq!(
            c.classify("https://yc.example.com/companies/foo"),
            UrlClassification::Aggregator
        );
        assert_eq!(c.classify("https://notexample.com"), UrlClassification::Normal);
    }

    #[test]
    fn plain_patterns_match_subdomains_case_insensitively() {
        let c = classifier();
        assert_eq!(c.classify("https://M.Facebook.com/x"), UrlClassification::Blocked);
        assert_eq!(c.classify("https://www.medium.com/@foo"), UrlClassification::Blocked);
    }

    #[test]
    fn github_variants() {
        let c = classifier();
        assert_eq!(c.classify("https://acme.github.io"), UrlClassification::Github);
        assert_eq!(c.classify("https://github.io"), UrlClassification::Github);

        let strict = UrlClassifier::new(UrlFilterConfig {
            github_valid: false,
            ..c.config().clone()
        });
        assert_eq!(strict.classify("https://github.com/acme/agent"), UrlClassification::Blocked);
        assert_eq!(
            strict.block_reason("https://github.com/acme/agent").as_deref(),
            Some("GitHub URLs are not accepted")
        );
    }

    #[test]
    fn locale_roots_are_not_deep_links() {
        let c = classifier();
        for url in [
            "https://foo.ai/",
            "https://foo.ai/en",
            "https://foo.ai/en-US/",
            "https://foo.ai/en-gb",
            "foo.ai",
        ] {
            assert_eq!(c.classify(url), UrlClassification::Normal, "{url}");
        }
        assert_eq!(c.classify("https://foo.ai/fr"), UrlClassification::NonRoot);
    }

    #[test]
    fn block_reasons_name_the_rule() {
        let c = classifier();
        assert_eq!(
            c.block_reason("https://facebook.com/foo").as_deref(),
            Some("Domain 'facebook.com' is in blocklist")
        );
        assert_eq!(
            c.block_reason("https://foo.ai/news/today").as_deref(),
            Some("Path contains blocked pattern '/news/'")
        );
        assert_eq!(c.block_reason("https://foo.ai"), None);
    }

    #[test]
    fn classification_is_total() {
        let c = classifier();
        for url in ["", "not a url", "://", "https://", "ftp://files.foo.ai/a"] {
            let _ = c.classify(url);
        }
        assert_eq!(c.classify(""), UrlClassification::Normal);
    }
}
