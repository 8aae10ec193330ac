//! HTTP image fetcher

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::FetchConfig;
use crate::credentials::TokenSource;
use crate::error::{FetchError, Result};
use crate::fetch::{ImageFetcher, ImageMimeType, Locator, ScratchDir};

/// Fetches locators over HTTP(S) with a per-request timeout
///
/// Drive share links go to the Drive API and carry a bearer token when one
/// is configured with [`with_drive_auth`](Self::with_drive_auth). Plain URLs
/// are fetched anonymously.
pub struct HttpImageFetcher {
    client: Client,
    timeout: Duration,
    drive_api_base: String,
    drive_auth: Option<Arc<dyn TokenSource>>,
}

impl HttpImageFetcher {
    pub fn new(client: Client, config: &FetchConfig) -> Self {
        Self {
            client,
            timeout: config.timeout(),
            drive_api_base: config.drive_api_base.clone(),
            drive_auth: None,
        }
    }

    /// Authenticate Drive downloads with tokens from `source`
    pub fn with_drive_auth(mut self, source: Arc<dyn TokenSource>) -> Self {
        self.drive_auth = Some(source);
        self
    }

    async fn fetch_one(&self, locator: &str, scratch: &ScratchDir) -> Result<PathBuf> {
        let parsed = Locator::parse(locator);
        let url = parsed.download_url(&self.drive_api_base);
        debug!("Downloading image {} from {}", locator, url);

        let network = |e: reqwest::Error| FetchError::Network {
            locator: locator.to_string(),
            message: e.to_string(),
        };

        let mut request = self.client.get(&url).timeout(self.timeout);
        if let (Locator::DriveFile { .. }, Some(auth)) = (&parsed, &self.drive_auth) {
            request = request.bearer_auth(auth.bearer_token().await?);
        }
        let response = request.send().await.map_err(network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                locator: locator.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let mime = ImageMimeType::from_mime_str(&content_type).ok_or_else(|| {
            FetchError::NotAnImage {
                locator: locator.to_string(),
                content_type: if content_type.is_empty() {
                    "none".to_string()
                } else {
                    content_type.clone()
                },
            }
        })?;

        let bytes = response.bytes().await.map_err(network)?;
        let path = scratch.next_path(mime.extension());
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| FetchError::Io(format!("{}: {}", path.display(), e)))?;

        debug!("Stored {} bytes at {}", bytes.len(), path.display());
        Ok(path)
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, locators: &[String], scratch: &ScratchDir) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(locators.len());
        for locator in locators {
            paths.push(self.fetch_one(locator, scratch).await?);
        }
        Ok(paths)
    }
}
