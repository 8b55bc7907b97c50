use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// Structured product content extracted from a product's website.
///
/// Every field is optional: extraction augments curated data and an empty
/// value never overwrites an existing one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedContent {
    /// A brief one-line description of the AI agent (max 250 chars)
    #[serde(default)]
    pub short_description: Option<String>,

    /// Full description of the AI agent and its capabilities
    #[serde(default)]
    pub description: Option<String>,

    /// Key features and capabilities of the agent
    #[serde(default, deserialize_with = "null_as_default")]
    pub features: Vec<String>,

    /// Primary use cases the agent is designed for
    #[serde(default, deserialize_with = "null_as_default")]
    pub use_cases: Vec<String>,

    /// One of: UNKNOWN, FREE, FREEMIUM, PAID, ENTERPRISE, CONTACT
    #[serde(default)]
    pub pricing_model: Option<String>,

    /// The single most appropriate directory category
    #[serde(default)]
    pub category: Option<String>,

    /// Whether the agent's source code is publicly available
    #[serde(default)]
    pub is_open_source: Option<bool>,

    /// One of: UNKNOWN, GENERAL, HEALTHCARE, FINANCE, EDUCATION, ECOMMERCE,
    /// MARKETING, LEGAL, HR, TECH, CUSTOMER_SERVICE, RESEARCH, CONTENT
    #[serde(default)]
    pub industry: Option<String>,

    /// Twitter/X profile of the agent or company
    #[serde(default)]
    pub twitter_url: Option<String>,

    /// LinkedIn profile of the agent or company
    #[serde(default)]
    pub linkedin_url: Option<String>,

    /// Demo video on YouTube, Vimeo or Loom
    #[serde(default)]
    pub demo_video_url: Option<String>,
}

impl ExtractedContent {
    /// Drops blank strings and list items so downstream code can rely on
    /// `Some` meaning "has a value".
    pub fn cleaned(self) -> Self {
        let text = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let list = |values: Vec<String>| -> Vec<String> {
            values
                .into_iter()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect()
        };

        Self {
            short_description: text(self.short_description),
            description: text(self.description),
            features: list(self.features),
            use_cases: list(self.use_cases),
            pricing_model: text(self.pricing_model),
            category: text(self.category),
            is_open_source: self.is_open_source,
            industry: text(self.industry),
            twitter_url: text(self.twitter_url),
            linkedin_url: text(self.linkedin_url),
            demo_video_url: text(self.demo_video_url),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Narrow schema used to resolve an aggregator listing to the product's own site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AggregatorProduct {
    /// The product's own website URL, not a social or directory link
    #[serde(default)]
    pub product_website: Option<String>,

    /// Product name as shown on the listing
    #[serde(default)]
    pub product_name: Option<String>,

    /// Confidence between 0.0 and 1.0 that the URL is the official product site
    #[serde(default)]
    pub confidence: Option<f64>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
