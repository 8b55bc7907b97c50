use url::Url;

/// Parse a URL, adding `https://` when the scheme is missing.
pub(crate) fn parse_lenient(raw: &str) -> Option<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    Url::parse(&with_scheme).ok().filter(|u| u.host_str().is_some())
}

/// Lowercased host (with port, without `www.`). Empty when the URL has no host.
pub fn domain_of(raw: &str) -> String {
    let Some(url) = parse_lenient(raw) else {
        return String::new();
    };

    let host = url.host_str().unwrap_or_default().to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();

    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    }
}

/// Canonical form used for duplicate detection: lowercase, no scheme,
/// no `www.`, host plus path without trailing slash. Query and fragment
/// are dropped.
///
/// `https://www.Example.com/Path/` and `http://example.com/path` both
/// normalize to `example.com/path`.
pub fn normalize_url(raw: &str) -> String {
    match parse_lenient(raw) {
        Some(url) => {
            let domain = domain_of(url.as_str());
            let path = url.path().to_lowercase();
            format!("{}{}", domain, path.trim_end_matches('/'))
        }
        None => fallback_normalize(raw),
    }
}

fn fallback_normalize(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let without_scheme = match lowered.split_once("://") {
        Some((_, rest)) => rest,
        None => lowered.as_str(),
    };
    let without_www = without_scheme.strip_prefix("www.").unwrap_or(without_scheme);
    without_www.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_case_www_and_trailing_slash_are_ignored() {
        assert_eq!(normalize_url("https://www.Example.com/Path/"), "example.com/path");
        assert_eq!(normalize_url("http://example.com/path"), "example.com/path");
        assert_eq!(
            normalize_url("https://www.Example.com/Path/"),
            normalize_url("http://example.com/path")
        );
    }

    #[test]
    fn scheme_less_input_is_supported() {
        assert_eq!(normalize_url("www.foo.ai"), "foo.ai");
        assert_eq!(normalize_url("foo.ai/"), "foo.ai");
        assert_eq!(normalize_url("https://foo.ai"), "foo.ai");
    }

    #[test]
    fn query_and_fragment_are_dropped() {
        assert_eq!(normalize_url("https://foo.ai/?ref=producthunt#top"), "foo.ai");
    }

    #[test]
    fn empty_input_normalizes_to_empty() {
        assert_eq!(normalize_url(""), "");
        assert_eq!(normalize_url("   "), "");
    }

    #[test]
    fn domain_strips_www_and_keeps_port() {
        assert_eq!(domain_of("https://WWW.Foo.AI/about"), "foo.ai");
        assert_eq!(domain_of("localhost:8080/x"), "localhost:8080");
        assert_eq!(domain_of(""), "");
    }
}
