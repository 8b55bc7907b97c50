//! Small string helpers shared by the domains.

use unicode_normalization::UnicodeNormalization;

/// Truncate to at most `max` characters (not bytes).
pub fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((byte_index, _)) => value[..byte_index].to_string(),
        None => value.to_string(),
    }
}

/// URL slug: accents transliterated via NFKD, then lowercase ASCII
/// alphanumerics and underscores with runs of whitespace or hyphens
/// collapsed to a single `-`. Characters with no ASCII form are dropped, so
/// the result can be empty.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;

    for c in value.trim().nfkd().filter(char::is_ascii) {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' {
            pending_dash = true;
        }
    }

    slug.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// `None` for missing or whitespace-only strings, trimmed otherwise.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo");
        assert_eq!(truncate_chars("short", 250), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn slugify_matches_directory_urls() {
        assert_eq!(slugify("Foo AI"), "foo-ai");
        assert_eq!(slugify("  Agent.ai -- Pro  "), "agentai-pro");
        assert_eq!(slugify("C++ Copilot!"), "c-copilot");
        assert_eq!(slugify("Ünïcode Agent"), "unicode-agent");
        assert_eq!(slugify("Café Crème Bot"), "cafe-creme-bot");
        assert_eq!(slugify("ﬁle ﬂow"), "file-flow");
        assert_eq!(slugify("snake_case agent"), "snake_case-agent");
        assert_eq!(slugify("___"), "");
        assert_eq!(slugify("日本語"), "");
    }

    #[test]
    fn non_blank_trims() {
        assert_eq!(non_blank(Some("  x ")), Some("x"));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }
}
