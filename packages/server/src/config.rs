use anyhow::{Context, Result};
use dotenvy::dotenv;
use secrecy::SecretString;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::domains::review::models::ConfidenceGate;
use crate::domains::url_filters::UrlFilterConfig;
use crate::kernel::RetryPolicy;

/// Default model for the review gateway.
pub const DEFAULT_REVIEW_MODEL: &str = "gpt-5-mini";

/// Application configuration loaded from environment variables
#[derive(Debug)]
pub struct Config {
    pub database_url: String,
    pub openai_api_key: SecretString,
    pub firecrawl_api_key: SecretString,
    pub review_model: String,
    pub media_root: PathBuf,
    pub pipeline: PipelineSettings,
    pub url_filters: UrlFilterConfig,
}

/// Knobs the orchestrators read at run time.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub gate: ConfidenceGate,
    /// Bound on one extraction or search call.
    pub scrape_timeout: Duration,
    /// Bound on one review call.
    pub review_timeout: Duration,
    /// Bound on one media download.
    pub media_timeout: Duration,
    /// Pause between items of a batch.
    pub batch_delay: Duration,
    pub retry: RetryPolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            gate: ConfidenceGate::default(),
            scrape_timeout: Duration::from_secs(120),
            review_timeout: Duration::from_secs(120),
            media_timeout: Duration::from_secs(30),
            batch_delay: Duration::from_millis(1000),
            retry: RetryPolicy::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let external_timeout = Duration::from_secs(
            parse_var("EXTERNAL_TIMEOUT_SECS")?.unwrap_or(120),
        );

        let gate = ConfidenceGate {
            threshold: parse_var("REVIEW_CONFIDENCE_THRESHOLD")?.unwrap_or(0.7),
            approve_threshold: parse_var("REVIEW_APPROVE_THRESHOLD")?,
            reject_threshold: parse_var("REVIEW_REJECT_THRESHOLD")?,
        };
        for threshold in [Some(gate.threshold), gate.approve_threshold, gate.reject_threshold]
            .into_iter()
            .flatten()
        {
            anyhow::ensure!(
                (0.0..=1.0).contains(&threshold),
                "Review thresholds must be between 0.0 and 1.0, got {}",
                threshold
            );
        }

        let pipeline = PipelineSettings {
            gate,
            scrape_timeout: external_timeout,
            review_timeout: external_timeout,
            media_timeout: Duration::from_secs(30),
            batch_delay: Duration::from_millis(parse_var("BATCH_DELAY_MS")?.unwrap_or(1000)),
            retry: RetryPolicy {
                max_retries: parse_var("TASK_MAX_RETRIES")?.unwrap_or(2),
                base_delay: Duration::from_millis(
                    parse_var("TASK_RETRY_BASE_MS")?.unwrap_or(1000),
                ),
            },
        };

        let mut url_filters = UrlFilterConfig::default();
        if let Some(list) = list_var("DIRECTORY_DOMAIN_BLOCKLIST") {
            url_filters.domain_blocklist = list;
        }
        if let Some(list) = list_var("DIRECTORY_PATH_BLOCKLIST") {
            url_filters.path_blocklist = list;
        }
        if let Some(list) = list_var("DIRECTORY_AGGREGATOR_DOMAINS") {
            url_filters.aggregator_domains = list;
        }
        if let Some(list) = list_var("DIRECTORY_DOMAIN_ALLOWLIST") {
            url_filters.domain_allowlist = list;
        }
        if let Some(valid) = parse_var("DIRECTORY_GITHUB_VALID")? {
            url_filters.github_valid = valid;
        }

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            openai_api_key: env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY must be set")?
                .into(),
            firecrawl_api_key: env::var("FIRECRAWL_API_KEY")
                .context("FIRECRAWL_API_KEY must be set")?
                .into(),
            review_model: env::var("OPENAI_REVIEW_MODEL")
                .unwrap_or_else(|_| DEFAULT_REVIEW_MODEL.to_string()),
            media_root: env::var("MEDIA_ROOT")
                .unwrap_or_else(|_| "./media".to_string())
                .into(),
            pipeline,
            url_filters,
        })
    }
}

fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{} must be a valid value", name)),
        _ => Ok(None),
    }
}

/// Comma separated list. Unset means "keep the defaults".
fn list_var(name: &str) -> Option<Vec<String>> {
    let value = env::var(name).ok()?;
    Some(
        value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    )
}
