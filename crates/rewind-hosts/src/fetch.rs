//! HTTP download of source media with a size cap.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use rewind_core::constants::USER_AGENT;
use rewind_core::{AppError, MediaReference};

use crate::traits::MediaFetcher;

/// Direct-download URL for a reference. Reddit video pages are not media files, so
/// those go to their progressive MP4 rendition.
pub fn download_url(reference: &MediaReference) -> String {
    match reference.host.as_str() {
        "vreddit" => format!("https://v.redd.it/{}/DASH_720.mp4", reference.id),
        _ => reference.url.clone(),
    }
}

pub struct HttpMediaFetcher {
    http_client: reqwest::Client,
    max_bytes: u64,
}

impl HttpMediaFetcher {
    pub fn new(max_bytes: u64) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client for media fetch")?;

        Ok(Self {
            http_client,
            max_bytes,
        })
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    #[tracing::instrument(skip(self, reference), fields(media.host = %reference.host, media.id = %reference.id))]
    async fn fetch(&self, reference: &MediaReference) -> Result<Bytes, AppError> {
        let url = download_url(reference);
        let mut response = self.http_client.get(&url).send().await.map_err(|e| {
            tracing::warn!(error = %e, url = %url, "Failed to download media");
            AppError::Fetch(format!("Failed to download {}: {}", url, e))
        })?;

        if !response.status().is_success() {
            return Err(AppError::Fetch(format!(
                "{} returned status code: {}",
                url,
                response.status()
            )));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_bytes {
                return Err(AppError::InvalidInput(format!(
                    "Media is {} bytes, limit is {}",
                    length, self.max_bytes
                )));
            }
        }

        let mut buffer = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AppError::Fetch(format!("Failed to read response body: {}", e)))?
        {
            if (buffer.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(AppError::InvalidInput(format!(
                    "Media exceeds the {} byte limit",
                    self.max_bytes
                )));
            }
            buffer.extend_from_slice(&chunk);
        }

        tracing::debug!(bytes = buffer.len(), "Media downloaded");
        Ok(buffer.freeze())
    }
}
