//! Firecrawl implementation of the extraction and web search gateways.

use async_trait::async_trait;
use firecrawl_client::{
    FirecrawlClient, FirecrawlError, Format, ScrapeData, SearchRequest, SearchScrapeOptions,
};

use super::traits::{
    BaseExtractionGateway, BaseWebSearcher, BrandingData, ExtractionFormat, GatewayError,
    PageMetadata, ScrapeRequest, ScrapedPage, WebSearchHit, WebSearchRequest,
};

pub struct FirecrawlGateway {
    client: FirecrawlClient,
}

impl FirecrawlGateway {
    pub fn new(client: FirecrawlClient) -> Self {
        Self { client }
    }
}

fn to_format(format: &ExtractionFormat) -> Format {
    match format {
        ExtractionFormat::Markdown => Format::Markdown,
        ExtractionFormat::Screenshot => Format::Screenshot,
        ExtractionFormat::Branding => Format::Branding,
        ExtractionFormat::Structured { schema, prompt } => Format::Json {
            schema: schema.clone(),
            prompt: Some(prompt.clone()),
        },
    }
}

fn map_error(error: FirecrawlError) -> GatewayError {
    let transient = error.is_transient();
    match error {
        FirecrawlError::Timeout(secs) => GatewayError::Timeout(secs),
        FirecrawlError::Network(message) => GatewayError::Network(message),
        FirecrawlError::Parse(message) => GatewayError::InvalidResponse(message),
        other => GatewayError::Service {
            message: other.to_string(),
            transient,
        },
    }
}

fn to_page(url: &str, data: ScrapeData) -> ScrapedPage {
    let branding = data.branding.map(|branding| {
        let images = branding.images.clone().unwrap_or_default();
        BrandingData {
            logo: branding.logo.clone(),
            logo_image: images.logo,
            og_image: images.og_image,
            raw: serde_json::to_value(&branding).unwrap_or_default(),
        }
    });

    let metadata = data
        .metadata
        .map(|m| PageMetadata {
            title: m.title,
            og_url: m.og_url,
            source_url: m.source_url.or(m.url),
        })
        .unwrap_or_default();

    ScrapedPage {
        url: url.to_string(),
        markdown: data.markdown,
        structured: data.json,
        branding,
        screenshot_url: data.screenshot,
        metadata,
    }
}

#[async_trait]
impl BaseExtractionGateway for FirecrawlGateway {
    async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapedPage, GatewayError> {
        let formats = request.formats.iter().map(to_format).collect();
        let data = self
            .client
            .scrape(&firecrawl_client::ScrapeRequest::new(&request.url, formats))
            .await
            .map_err(map_error)?;

        Ok(to_page(&request.url, data))
    }
}

#[async_trait]
impl BaseWebSearcher for FirecrawlGateway {
    async fn search(&self, request: &WebSearchRequest) -> Result<Vec<WebSearchHit>, GatewayError> {
        let mut search = SearchRequest::new(&request.query, request.limit);
        search.tbs = request.tbs.clone();
        search.location = request.location.clone();
        search.scrape_options = request.structured.as_ref().map(|(schema, prompt)| {
            SearchScrapeOptions {
                formats: vec![Format::Json {
                    schema: schema.clone(),
                    prompt: Some(prompt.clone()),
                }],
                only_main_content: true,
            }
        });

        let results = self.client.search(&search).await.map_err(map_error)?;

        Ok(results
            .into_iter()
            .map(|r| WebSearchHit {
                url: r.url,
                title: r.title,
                description: r.description,
                position: r.position,
                structured: r.json,
            })
            .collect())
    }
}
