//! Product page scraping - one extraction call per product, plus the
//! narrow aggregator lookup.

use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::domains::enrichment::models::{
    AggregatorProduct, EnrichmentSnapshot, ExtractedContent, NameVerification,
};
use crate::kernel::{
    call_with_retry, BrandingData, ExtractionFormat, ScrapeRequest, ServerDeps, StructuredOutput,
};

/// Guidance sent alongside the content schema.
pub const EXTRACTION_PROMPT: &str = "Extract accurate and factual information about this AI agent product. \
Focus on verifiable information from the page content. \
For pricing_model: UNKNOWN (if unclear), FREE (completely free), \
FREEMIUM (free with paid upgrades), PAID (requires payment), \
ENTERPRISE (custom pricing for businesses), CONTACT (pricing by request only). \
For category, choose the MOST appropriate: Commerce, Developer Tools, \
Digital Workers, General Assistant, Hardware + Software, Open Source, \
Research Labs, Task Automation, Voice Agents, Agent Platform, Blockchain, \
Business Automation, Customer Support, Marketing, AI Agent Framework, \
Social Media, AI Agency, Risk Management. \
For industry: UNKNOWN, GENERAL, HEALTHCARE, FINANCE, EDUCATION, ECOMMERCE, \
MARKETING, LEGAL, HR, TECH, CUSTOMER_SERVICE, RESEARCH, CONTENT. \
For demo_video_url: ONLY include actual video URLs from YouTube, Vimeo, or Loom. \
Do NOT include image URLs, screenshots, or non-video links. Leave null if no video found.";

pub const AGGREGATOR_EXTRACTION_PROMPT: &str = "Extract the actual product/company website URL from this directory or aggregator page.

Look for:
- Official website links (usually labeled \"Website\", \"Homepage\", \"Visit\")
- Company domain links in the content
- Links that go to the actual product, not social media or other directories

Return ONLY the main product website URL, not:
- Social media links (twitter, linkedin, etc.)
- Other directory links
- Blog or news article links

If no clear product website is found, return null.";

/// Minimum confidence for trusting an extracted aggregator URL.
const AGGREGATOR_MIN_CONFIDENCE: f64 = 0.5;

/// Confidence recorded when the submitted name does not appear in the
/// extracted short description.
const NAME_MISMATCH_CONFIDENCE: f64 = 0.5;

lazy_static! {
    static ref CANONICAL_REL_FIRST: Regex =
        Regex::new(r#"(?i)<link[^>]*rel=["']canonical["'][^>]*href=["']([^"']+)["']"#)
            .expect("valid regex");
    static ref CANONICAL_HREF_FIRST: Regex =
        Regex::new(r#"(?i)<link[^>]*href=["']([^"']+)["'][^>]*rel=["']canonical["']"#)
            .expect("valid regex");
    static ref CANONICAL_INLINE: Regex =
        Regex::new(r#"(?i)canonical["\s:]+["']?(https?://[^\s"'<>]+)"#).expect("valid regex");
}

/// Scrapes a product page and turns the response into a snapshot.
///
/// Never fails: an extraction error becomes a snapshot with
/// `success = false` and the error message.
pub async fn scrape_product(url: &str, deps: &ServerDeps) -> EnrichmentSnapshot {
    info!(url, "Starting enrichment scrape");

    let request = ScrapeRequest::new(
        url,
        vec![
            ExtractionFormat::Markdown,
            ExtractionFormat::Screenshot,
            ExtractionFormat::Branding,
            ExtractionFormat::Structured {
                schema: ExtractedContent::openai_schema(),
                prompt: EXTRACTION_PROMPT.to_string(),
            },
        ],
    );

    let page = match call_with_retry(
        deps.settings.retry,
        deps.settings.scrape_timeout,
        "scrape",
        || deps.extractor.scrape(&request),
    )
    .await
    {
        Ok(page) => page,
        Err(e) => {
            warn!(url, error = %e, "Scrape failed");
            return EnrichmentSnapshot::failed(url, format!("Scrape failed: {}", e), Utc::now());
        }
    };

    let content = match page.structured.clone() {
        Some(value) => serde_json::from_value::<ExtractedContent>(value)
            .map(ExtractedContent::cleaned)
            .unwrap_or_else(|e| {
                warn!(url, error = %e, "Structured content did not match schema");
                ExtractedContent::default()
            }),
        None => ExtractedContent::default(),
    };

    let mut snapshot = EnrichmentSnapshot::succeeded(url, Utc::now());
    snapshot.content = content;
    snapshot.logo_url = page.branding.as_ref().and_then(best_logo_url);
    snapshot.branding = page.branding.as_ref().map(|b| b.raw.clone());
    snapshot.screenshot_url = page.screenshot_url.clone();
    snapshot.page_title = page.metadata.title.clone();
    snapshot.canonical_url = page
        .metadata
        .og_url
        .clone()
        .filter(|u| !u.trim().is_empty())
        .or_else(|| page.markdown.as_deref().and_then(canonical_from_markdown));
    snapshot.markdown = page.markdown;

    info!(url, "Scrape succeeded");
    snapshot
}

/// Resolves an aggregator listing to the product's own website.
///
/// `None` when the lookup fails, finds nothing, or is not confident enough.
pub async fn extract_product_url(aggregator_url: &str, deps: &ServerDeps) -> Option<String> {
    info!(url = aggregator_url, "Extracting product URL from aggregator");

    let request = ScrapeRequest::new(
        aggregator_url,
        vec![ExtractionFormat::Structured {
            schema: AggregatorProduct::openai_schema(),
            prompt: AGGREGATOR_EXTRACTION_PROMPT.to_string(),
        }],
    );

    let page = call_with_retry(
        deps.settings.retry,
        deps.settings.scrape_timeout,
        "aggregator_scrape",
        || deps.extractor.scrape(&request),
    )
    .await
    .map_err(|e| warn!(url = aggregator_url, error = %e, "Aggregator lookup failed"))
    .ok()?;

    let product: AggregatorProduct = serde_json::from_value(page.structured?).ok()?;
    accept_product_url(&product)
}

fn accept_product_url(product: &AggregatorProduct) -> Option<String> {
    let url = product.product_website.as_deref()?.trim();
    let confident = product.confidence.unwrap_or(0.0) >= AGGREGATOR_MIN_CONFIDENCE;
    let http = url.starts_with("http://") || url.starts_with("https://");
    (confident && http).then(|| url.to_string())
}

/// Flags a likely wrong name. Never proposes a replacement.
pub fn verify_name(submitted_name: &str, content: &ExtractedContent) -> NameVerification {
    let mut verification = NameVerification {
        submitted_name: submitted_name.to_string(),
        matches: true,
        extracted_name: None,
        confidence: 0.0,
        should_update: false,
    };

    if let Some(short) = content.short_description.as_deref() {
        let name = submitted_name.trim().to_lowercase();
        if !short.to_lowercase().contains(&name) {
            verification.matches = false;
            verification.confidence = NAME_MISMATCH_CONFIDENCE;
        }
    }

    verification
}

pub fn canonical_from_markdown(markdown: &str) -> Option<String> {
    [&*CANONICAL_REL_FIRST, &*CANONICAL_HREF_FIRST, &*CANONICAL_INLINE]
        .iter()
        .find_map(|re| re.captures(markdown))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn is_svg_url(url: &str) -> bool {
    let path = url::Url::parse(url)
        .map(|u| u.path().to_lowercase())
        .unwrap_or_else(|_| url.to_lowercase());
    path.ends_with(".svg")
}

/// Picks the logo most likely to be a raster image: primary logo, image
/// logo, then og image, and only then an SVG.
pub fn best_logo_url(branding: &BrandingData) -> Option<String> {
    let present = |candidate: &Option<String>| {
        candidate
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
    };

    let raster = [&branding.logo, &branding.logo_image, &branding.og_image]
        .into_iter()
        .filter_map(present)
        .find(|u| !is_svg_url(u));

    raster.or_else(|| present(&branding.logo).or_else(|| present(&branding.logo_image)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::branding;

    #[test]
    fn canonical_link_patterns() {
        assert_eq!(
            canonical_from_markdown(r#"<link rel="canonical" href="https://foo.ai/">"#).as_deref(),
            Some("https://foo.ai/")
        );
        assert_eq!(
            canonical_from_markdown(r#"<LINK href='https://foo.ai/home' rel='canonical'>"#)
                .as_deref(),
            Some("https://foo.ai/home")
        );
        assert_eq!(
            canonical_from_markdown("canonical: https://foo.ai/x more").as_deref(),
            Some("https://foo.ai/x")
        );
        assert_eq!(canonical_from_markdown("# Foo\n\nNo links here."), None);
    }

    #[test]
    fn raster_logos_win_over_svg() {
        let svg_primary = branding(Some("https://foo.ai/logo.svg"), Some("https://foo.ai/og.png"));
        assert_eq!(best_logo_url(&svg_primary).as_deref(), Some("https://foo.ai/og.png"));

        let only_svg = branding(Some("https://foo.ai/logo.SVG?v=2"), None);
        assert_eq!(best_logo_url(&only_svg).as_deref(), Some("https://foo.ai/logo.SVG?v=2"));

        let png = branding(Some("https://foo.ai/logo.png"), Some("https://foo.ai/og.png"));
        assert_eq!(best_logo_url(&png).as_deref(), Some("https://foo.ai/logo.png"));

        assert_eq!(best_logo_url(&branding(None, None)), None);
    }

    #[test]
    fn svg_detection_ignores_query() {
        assert!(is_svg_url("https://cdn.foo.ai/logo.svg?v=3"));
        assert!(!is_svg_url("https://cdn.foo.ai/logo.png"));
        assert!(!is_svg_url("https://cdn.foo.ai/svg/logo.png"));
    }

    #[test]
    fn name_mismatch_is_flagged_only() {
        let content = ExtractedContent {
            short_description: Some("Acme builds autonomous support agents".into()),
            ..Default::default()
        };

        let verified = verify_name("acme", &content);
        assert!(verified.matches);

        let mismatch = verify_name("Zenflow", &content);
        assert!(!mismatch.matches);
        assert_eq!(mismatch.confidence, 0.5);
        assert!(!mismatch.should_update);
        assert_eq!(mismatch.extracted_name, None);
    }

    #[test]
    fn aggregator_urls_need_confidence_and_scheme() {
        let product = |url: &str, confidence: f64| AggregatorProduct {
            product_website: Some(url.into()),
            product_name: None,
            confidence: Some(confidence),
        };

        assert_eq!(
            accept_product_url(&product("https://foo.ai", 0.9)).as_deref(),
            Some("https://foo.ai")
        );
        assert_eq!(accept_product_url(&product("https://foo.ai", 0.4)), None);
        assert_eq!(accept_product_url(&product("foo.ai", 0.9)), None);
        assert_eq!(accept_product_url(&AggregatorProduct::default()), None);
    }
}
