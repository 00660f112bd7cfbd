use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Output encoding of a candidate artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Mp4,
    Webm,
    Gif,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Mp4 => "mp4",
            Encoding::Webm => "webm",
            Encoding::Gif => "gif",
        }
    }

    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Encoding::Mp4 => "video/mp4",
            Encoding::Webm => "video/webm",
            Encoding::Gif => "image/gif",
        }
    }

    pub fn is_video(&self) -> bool {
        !matches!(self, Encoding::Gif)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mp4" | "mov" | "m4v" => Ok(Encoding::Mp4),
            "webm" => Ok(Encoding::Webm),
            "gif" => Ok(Encoding::Gif),
            other => Err(format!("Unknown encoding: {}", other)),
        }
    }
}

/// Host tag plus host-native id. Keys both sides of a dedup record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostedId {
    pub host: String,
    pub id: String,
}

impl HostedId {
    pub fn new(host: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for HostedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.id)
    }
}

/// Media located by the context resolver. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaReference {
    pub host: String,
    pub id: String,
    pub url: String,
    /// Sensitivity as known when the reference was discovered.
    pub sensitive: bool,
    /// Number of ancestry layers walked before the reference was found.
    pub depth: u32,
}

impl MediaReference {
    pub fn key(&self) -> HostedId {
        HostedId::new(&self.host, &self.id)
    }
}

/// One way of representing the artifact, as measured by the probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingCandidate {
    pub encoding: Encoding,
    /// Seconds, never negative.
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub frames: Option<u64>,
    /// Estimated size of the encoded output in bytes.
    pub size_bytes: u64,
    pub has_audio: bool,
    /// Source bytes the transform works from.
    #[serde(skip)]
    pub data: Bytes,
}

impl EncodingCandidate {
    pub fn with_data(mut self, data: Bytes) -> Self {
        self.data = data;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaDescriptor {
    pub reference: MediaReference,
    /// Preferred order; the router never reorders candidates.
    pub candidates: Vec<EncodingCandidate>,
}

impl MediaDescriptor {
    pub fn is_analyzable(&self) -> bool {
        !self.candidates.is_empty()
    }
}

/// Where a reversed copy ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedRef {
    pub host: String,
    pub id: String,
    pub url: String,
}

impl UploadedRef {
    pub fn key(&self) -> HostedId {
        HostedId::new(&self.host, &self.id)
    }
}
