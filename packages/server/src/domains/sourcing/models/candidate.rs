use serde::{Deserialize, Serialize};

/// A product found by a source plugin, before classification and dedup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredCandidate {
    pub name: String,
    /// Always carries a scheme; `https://` is added when the source omitted it.
    pub website: String,
    pub description: String,
    pub source_id: String,
    /// Page or query that surfaced the candidate.
    pub source_url: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl DiscoveredCandidate {
    pub fn new(
        name: impl AsRef<str>,
        website: impl AsRef<str>,
        description: impl AsRef<str>,
        source_id: impl Into<String>,
    ) -> Self {
        let website = website.as_ref().trim();
        let website = if website.is_empty()
            || website.starts_with("http://")
            || website.starts_with("https://")
        {
            website.to_string()
        } else {
            format!("https://{}", website)
        };

        Self {
            name: name.as_ref().trim().to_string(),
            website,
            description: description.as_ref().trim().to_string(),
            source_id: source_id.into(),
            source_url: String::new(),
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_source_url(mut self, source_url: impl Into<String>) -> Self {
        self.source_url = source_url.into();
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn website_gets_a_scheme() {
        let candidate = DiscoveredCandidate::new(" Foo ", " foo.ai/ ", "", "serp");
        assert_eq!(candidate.name, "Foo");
        assert_eq!(candidate.website, "https://foo.ai/");

        let kept = DiscoveredCandidate::new("Bar", "http://bar.ai", " desc ", "url");
        assert_eq!(kept.website, "http://bar.ai");
        assert_eq!(kept.description, "desc");
    }
}
