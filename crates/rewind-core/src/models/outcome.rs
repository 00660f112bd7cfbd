use serde::{Deserialize, Serialize};

use super::media::UploadedRef;

/// Result of a single upload attempt against one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded(UploadedRef),
    /// The host refuses this artifact outright. Retrying anywhere is pointless.
    Rejected(String),
    /// Transient failure. Worth retrying.
    Failed(String),
}

/// Terminal classification of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum RequestOutcome {
    Success,
    /// Something about the request can never work. Never retried.
    UserFailure(String),
    /// Safe to re-queue and try again later.
    UploadFailure(String),
}

impl RequestOutcome {
    pub fn user_failure(reason: impl Into<String>) -> Self {
        RequestOutcome::UserFailure(reason.into())
    }

    pub fn upload_failure(reason: impl Into<String>) -> Self {
        RequestOutcome::UploadFailure(reason.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, RequestOutcome::UploadFailure(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestOutcome::Success => "success",
            RequestOutcome::UserFailure(_) => "user_failure",
            RequestOutcome::UploadFailure(_) => "upload_failure",
        }
    }
}
