use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use super::SourcePlugin;
use crate::domains::sourcing::models::DiscoveredCandidate;
use crate::domains::url_filters::domain_of;

pub const URL_LIST_SOURCE_ID: &str = "url";

/// Explicit list of product URLs, e.g. pasted by an operator.
pub struct UrlListSource {
    urls: Vec<String>,
}

impl UrlListSource {
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls
                .into_iter()
                .map(Into::into)
                .map(|u: String| u.trim().to_string())
                .filter(|u| !u.is_empty())
                .collect(),
        }
    }
}

/// `foo-labs.ai` becomes `Foo Labs`.
fn name_from_url(website: &str) -> String {
    let domain = domain_of(website);
    let label = domain.split('.').next().unwrap_or_default();

    label
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl SourcePlugin for UrlListSource {
    fn source_id(&self) -> &str {
        URL_LIST_SOURCE_ID
    }

    async fn discover(&self, limit: usize) -> Result<Vec<DiscoveredCandidate>> {
        Ok(self
            .urls
            .iter()
            .take(limit)
            .map(|url| {
                let candidate = DiscoveredCandidate::new("", url, "", URL_LIST_SOURCE_ID);
                let name = name_from_url(&candidate.website);
                DiscoveredCandidate {
                    name: if name.is_empty() { url.clone() } else { name },
                    ..candidate
                }
                .with_source_url("manual")
            })
            .collect())
    }

    fn is_available(&self) -> bool {
        !self.urls.is_empty()
    }

    fn config(&self) -> serde_json::Value {
        json!({ "urls": self.urls })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn names_come_from_the_domain() {
        let source = UrlListSource::new(["https://www.foo-labs.ai/", " bar.dev ", ""]);
        let found = source.discover(10).await.unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "Foo Labs");
        assert_eq!(found[1].name, "Bar");
        assert_eq!(found[1].website, "https://bar.dev");
        assert_eq!(found[1].source_id, "url");
    }

    #[tokio::test]
    async fn respects_limit() {
        let source = UrlListSource::new(["https://a.ai", "https://b.ai", "https://c.ai"]);
        assert_eq!(source.discover(2).await.unwrap().len(), 2);
        assert!(!UrlListSource::new(Vec::<String>::new()).is_available());
    }
}
