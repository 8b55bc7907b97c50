//! Media download over HTTP and storage on the local filesystem.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use super::traits::{BaseMediaFetcher, BaseMediaStore, FetchedMedia};

pub struct HttpMediaFetcher {
    client: reqwest::Client,
}

impl HttpMediaFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("Failed to build media HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl BaseMediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedMedia> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to download {}", url))?
            .error_for_status()
            .with_context(|| format!("Download of {} returned an error status", url))?;

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?
            .to_vec();

        debug!(url, bytes = bytes.len(), content_type = ?content_type, "Media downloaded");

        Ok(FetchedMedia {
            bytes,
            content_type,
            final_url,
        })
    }
}

/// Stores media under a root directory. Returned paths are relative keys.
pub struct LocalMediaStore {
    root: PathBuf,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        anyhow::ensure!(safe && !key.is_empty(), "Invalid media key: {}", key);
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BaseMediaStore for LocalMediaStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(key.to_string())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(path)?;
        tokio::fs::read(&full)
            .await
            .with_context(|| format!("Failed to read {}", full.display()))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full = self.resolve(path)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", full.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_store_round_trip() {
        let root = std::env::temp_dir().join(format!("media-{}", uuid::Uuid::now_v7()));
        let store = LocalMediaStore::new(&root);

        let path = store.put("submissions/logos/abc.png", b"png").await.unwrap();
        assert_eq!(path, "submissions/logos/abc.png");
        assert_eq!(store.read(&path).await.unwrap(), b"png");

        store.delete(&path).await.unwrap();
        assert!(store.read(&path).await.is_err());
        // Already gone
        store.delete(&path).await.unwrap();

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn rejects_escaping_keys() {
        let store = LocalMediaStore::new(std::env::temp_dir());
        assert!(store.put("../etc/passwd", b"x").await.is_err());
        assert!(store.put("/abs/path.png", b"x").await.is_err());
    }
}
