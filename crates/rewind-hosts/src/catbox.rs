//! Catbox upload host
//!
//! Uploads go through the user API as multipart forms. An account hash is optional for
//! uploads and required for deletes.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use rewind_core::constants::USER_AGENT;
use rewind_core::{
    AppError, Encoding, EncodingLimits, HostCapability, SensitivityPolicy, UploadOutcome,
    UploadedRef,
};

use crate::traits::UploadHost;

pub const CATBOX_HOST: &str = "catbox";
const API_URL: &str = "https://catbox.moe/user/api.php";
const FILES_URL: &str = "https://files.catbox.moe/";
const MAX_UPLOAD_BYTES: u64 = 200 * 1024 * 1024;

pub struct CatboxHost {
    http_client: reqwest::Client,
    userhash: Option<String>,
    api_url: String,
}

impl CatboxHost {
    pub fn new(userhash: Option<String>) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client for Catbox")?;

        Ok(Self {
            http_client,
            userhash,
            api_url: API_URL.to_string(),
        })
    }

    /// Point the client at a different API endpoint.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    fn base_form(&self, reqtype: &'static str) -> Form {
        let form = Form::new().text("reqtype", reqtype);
        match &self.userhash {
            Some(hash) => form.text("userhash", hash.clone()),
            None => form,
        }
    }
}

/// Classify a Catbox upload response.
pub fn parse_upload_response(status: StatusCode, body: &str) -> UploadOutcome {
    let body = body.trim();

    if status == StatusCode::PAYLOAD_TOO_LARGE || status == StatusCode::PRECONDITION_FAILED {
        return UploadOutcome::Rejected(format!("catbox refused upload ({}): {}", status, body));
    }
    if !status.is_success() {
        return UploadOutcome::Failed(format!("catbox returned {}: {}", status, body));
    }

    match body.strip_prefix(FILES_URL) {
        Some(id) if !id.is_empty() && !id.contains('/') => UploadOutcome::Uploaded(UploadedRef {
            host: CATBOX_HOST.to_string(),
            id: id.to_string(),
            url: body.to_string(),
        }),
        _ => UploadOutcome::Failed(format!("unexpected catbox response: {}", body)),
    }
}

#[async_trait]
impl UploadHost for CatboxHost {
    fn name(&self) -> &str {
        CATBOX_HOST
    }

    fn capability(&self) -> HostCapability {
        let limits = [Encoding::Mp4, Encoding::Webm, Encoding::Gif]
            .into_iter()
            .map(|encoding| EncodingLimits {
                encoding,
                max_duration: None,
                max_size_bytes: Some(MAX_UPLOAD_BYTES),
                max_frames: None,
            })
            .collect();

        HostCapability {
            name: CATBOX_HOST.to_string(),
            limits,
            audio: true,
            sensitivity: SensitivityPolicy::AllowSensitive,
            priority: 1,
        }
    }

    fn url_for(&self, id: &str) -> String {
        format!("{}{}", FILES_URL, id)
    }

    #[tracing::instrument(skip(self, data), fields(host = CATBOX_HOST, bytes = data.len(), encoding = %encoding))]
    async fn upload(
        &self,
        data: Bytes,
        encoding: Encoding,
        _sensitive: bool,
        _has_audio: bool,
    ) -> UploadOutcome {
        let part = match Part::stream(data)
            .file_name(format!("reversed.{}", encoding.extension()))
            .mime_str(encoding.content_type())
        {
            Ok(part) => part,
            Err(e) => return UploadOutcome::Failed(format!("invalid upload part: {}", e)),
        };
        let form = self.base_form("fileupload").part("fileToUpload", part);

        let response = match self.http_client.post(&self.api_url).multipart(form).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Catbox upload request failed");
                return UploadOutcome::Failed(format!("catbox request failed: {}", e));
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return UploadOutcome::Failed(format!("unreadable catbox response: {}", e)),
        };

        let outcome = parse_upload_response(status, &body);
        if let UploadOutcome::Failed(reason) = &outcome {
            tracing::warn!(reason = %reason, "Catbox upload failed");
        }
        outcome
    }

    #[tracing::instrument(skip(self), fields(host = CATBOX_HOST))]
    async fn delete(&self, id: &str) -> Result<(), AppError> {
        if self.userhash.is_none() {
            return Err(AppError::Config(
                "CATBOX_USERHASH is required to delete uploads".to_string(),
            ));
        }

        let form = self.base_form("deletefiles").text("files", id.to_string());
        let response = self
            .http_client
            .post(&self.api_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::UploadHost(format!("catbox delete failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::UploadHost(format!(
                "catbox delete returned {}: {}",
                status,
                body.trim()
            )));
        }

        tracing::info!(id = %id, "Deleted catbox upload");
        Ok(())
    }
}
