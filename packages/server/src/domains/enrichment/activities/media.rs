//! Logo and screenshot downloads.
//!
//! Extraction-service media URLs expire within about a day, so media is
//! copied into the media store as soon as it is known.

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use super::scrape::is_svg_url;
use crate::kernel::ServerDeps;

const CONTENT_TYPE_EXTENSIONS: &[(&str, &str)] = &[
    ("image/png", ".png"),
    ("image/jpeg", ".jpg"),
    ("image/gif", ".gif"),
    ("image/webp", ".webp"),
    ("image/svg+xml", ".svg"),
];

const URL_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg"];

/// File extension from the content type, then the URL path, else `.png`.
pub fn image_extension(url: &str, content_type: Option<&str>) -> &'static str {
    if let Some(content_type) = content_type {
        let content_type = content_type.to_lowercase();
        if let Some((_, ext)) = CONTENT_TYPE_EXTENSIONS
            .iter()
            .find(|(mime, _)| content_type.contains(mime))
        {
            return *ext;
        }
    }

    let path = url::Url::parse(url)
        .map(|u| u.path().to_lowercase())
        .unwrap_or_else(|_| url.to_lowercase());
    match URL_EXTENSIONS.iter().find(|ext| path.ends_with(**ext)) {
        Some(&".jpeg") => ".jpg",
        Some(ext) => *ext,
        None => ".png",
    }
}

/// Downloads a logo and stores it at `<key_stem><ext>`.
///
/// SVG logos are refused, by URL suffix before the download and by content
/// type after it.
pub async fn download_logo(url: &str, key_stem: &str, deps: &ServerDeps) -> Result<String> {
    if is_svg_url(url) {
        warn!(url, "Skipping SVG logo");
        bail!("SVG logos are not supported: {}", url);
    }

    let media = deps
        .media_fetcher
        .fetch(url)
        .await
        .with_context(|| format!("Failed to download logo {}", url))?;

    let content_type = media.content_type.as_deref();
    if content_type.is_some_and(|t| t.to_lowercase().contains("svg")) {
        warn!(url, "Skipping SVG logo (by content type)");
        bail!("SVG logos are not supported: {} is {}", url, content_type.unwrap_or_default());
    }

    let key = format!("{}{}", key_stem, image_extension(url, content_type));
    let path = deps.media_store.put(&key, &media.bytes).await?;
    info!(url, path = %path, "Logo saved");
    Ok(path)
}

/// Downloads a screenshot as-is and stores it at `<key_stem><ext>`.
pub async fn download_screenshot(url: &str, key_stem: &str, deps: &ServerDeps) -> Result<String> {
    let media = deps
        .media_fetcher
        .fetch(url)
        .await
        .with_context(|| format!("Failed to download screenshot {}", url))?;

    let key = format!(
        "{}{}",
        key_stem,
        image_extension(url, media.content_type.as_deref())
    );
    let path = deps.media_store.put(&key, &media.bytes).await?;
    info!(url, path = %path, "Screenshot saved");
    Ok(path)
}

/// Extension of an already stored media path, `.png` when it has none.
pub fn stored_extension(path: &str) -> String {
    std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_else(|| ".png".to_string())
}
