//! Firecrawl v2 request and response types.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// One output format requested from `/scrape`.
#[derive(Debug, Clone, PartialEq)]
pub enum Format {
    Markdown,
    Screenshot,
    Branding,
    /// LLM extraction constrained by a JSON schema and guided by a prompt.
    Json {
        schema: serde_json::Value,
        prompt: Option<String>,
    },
}

impl Serialize for Format {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Markdown => serializer.serialize_str("markdown"),
            Self::Screenshot => serializer.serialize_str("screenshot"),
            Self::Branding => serializer.serialize_str("branding"),
            Self::Json { schema, prompt } => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", "json")?;
                map.serialize_entry("schema", schema)?;
                if let Some(prompt) = prompt {
                    map.serialize_entry("prompt", prompt)?;
                }
                map.end()
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRequest {
    pub url: String,
    pub formats: Vec<Format>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub only_main_content: Option<bool>,

    /// Server-side timeout in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl ScrapeRequest {
    pub fn new(url: impl Into<String>, formats: Vec<Format>) -> Self {
        Self {
            url: url.into(),
            formats,
            only_main_content: None,
            timeout: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScrapeResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<ScrapeData>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Everything `/scrape` returned for one page. Only requested formats are present.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScrapeData {
    #[serde(default)]
    pub markdown: Option<String>,

    /// Hosted screenshot URL. Firecrawl expires these after roughly a day.
    #[serde(default)]
    pub screenshot: Option<String>,

    #[serde(default)]
    pub branding: Option<Branding>,

    #[serde(default)]
    pub json: Option<serde_json::Value>,

    #[serde(default)]
    pub metadata: Option<PageMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Branding {
    #[serde(default)]
    pub logo: Option<String>,

    #[serde(default)]
    pub images: Option<BrandingImages>,

    /// Colors, fonts and whatever else Firecrawl detected.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BrandingImages {
    #[serde(default)]
    pub logo: Option<String>,

    #[serde(default)]
    pub favicon: Option<String>,

    #[serde(default, rename = "ogImage")]
    pub og_image: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PageMetadata {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default, rename = "sourceURL")]
    pub source_url: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default, rename = "ogUrl", alias = "og:url")]
    pub og_url: Option<String>,

    #[serde(default, rename = "statusCode")]
    pub status_code: Option<u16>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub query: String,
    pub limit: u32,

    /// Google time filter, e.g. `qdr:w` for the past week.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tbs: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrape_options: Option<SearchScrapeOptions>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, limit: u32) -> Self {
        Self {
            query: query.into(),
            limit,
            tbs: None,
            location: None,
            scrape_options: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchScrapeOptions {
    pub formats: Vec<Format>,
    pub only_main_content: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<SearchData>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchData {
    #[serde(default)]
    pub web: Vec<SearchResult>,
}

/// One web result. `markdown`/`json` are only present when scrape options were sent.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchResult {
    pub url: String,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub position: Option<u32>,

    #[serde(default)]
    pub markdown: Option<String>,

    #[serde(default)]
    pub json: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn formats_serialize_as_strings_and_objects() {
        let request = ScrapeRequest::new(
            "https://foo.ai",
            vec![
                Format::Markdown,
                Format::Screenshot,
                Format::Branding,
                Format::Json {
                    schema: json!({"type": "object"}),
                    prompt: Some("Extract the product".into()),
                },
            ],
        );

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["formats"][0], "markdown");
        assert_eq!(body["formats"][1], "screenshot");
        assert_eq!(body["formats"][2], "branding");
        assert_eq!(body["formats"][3]["type"], "json");
        assert_eq!(body["formats"][3]["prompt"], "Extract the product");
        assert!(body.get("onlyMainContent").is_none());
    }

    #[test]
    fn scrape_data_reads_branding_and_metadata() {
        let data: ScrapeData = serde_json::from_value(json!({
            "markdown": "# Foo",
            "screenshot": "https://cdn.firecrawl.dev/shot.png",
            "branding": {
                "logo": "https://foo.ai/logo.svg",
                "colors": {"primary": "#000"},
                "images": {"logo": "https://foo.ai/logo.png", "ogImage": "https://foo.ai/og.png"}
            },
            "metadata": {"title": "Foo", "sourceURL": "https://foo.ai", "ogUrl": "https://foo.ai/"}
        }))
        .unwrap();

        let branding = data.branding.unwrap();
        assert_eq!(branding.logo.as_deref(), Some("https://foo.ai/logo.svg"));
        assert_eq!(
            branding.images.unwrap().og_image.as_deref(),
            Some("https://foo.ai/og.png")
        );
        assert!(branding.extra.contains_key("colors"));
        assert_eq!(data.metadata.unwrap().og_url.as_deref(), Some("https://foo.ai/"));
    }

    #[test]
    fn search_request_uses_camel_case() {
        let mut request = SearchRequest::new("best ai agents", 10);
        request.tbs = Some("qdr:w".into());
        request.scrape_options = Some(SearchScrapeOptions {
            formats: vec![Format::Markdown],
            only_main_content: true,
        });

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["scrapeOptions"]["onlyMainContent"], true);
        assert_eq!(body["tbs"], "qdr:w");
        assert!(body.get("location").is_none());
    }
}
