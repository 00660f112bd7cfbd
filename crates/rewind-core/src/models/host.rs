use serde::{Deserialize, Serialize};

use super::media::Encoding;

/// Whether a host takes sensitive (NSFW) media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityPolicy {
    RejectSensitive,
    AllowSensitive,
    SensitiveOnly,
}

impl SensitivityPolicy {
    pub fn accepts(&self, sensitive: bool) -> bool {
        match self {
            SensitivityPolicy::RejectSensitive => !sensitive,
            SensitivityPolicy::AllowSensitive => true,
            SensitivityPolicy::SensitiveOnly => sensitive,
        }
    }
}

/// Hard ceilings for one encoding. `None` means unbounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingLimits {
    pub encoding: Encoding,
    pub max_duration: Option<f64>,
    pub max_size_bytes: Option<u64>,
    pub max_frames: Option<u64>,
}

impl EncodingLimits {
    pub fn unbounded(encoding: Encoding) -> Self {
        Self {
            encoding,
            max_duration: None,
            max_size_bytes: None,
            max_frames: None,
        }
    }
}

/// What an upload host accepts. Lower `priority` is preferred.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostCapability {
    pub name: String,
    pub limits: Vec<EncodingLimits>,
    pub audio: bool,
    pub sensitivity: SensitivityPolicy,
    pub priority: u32,
}

impl HostCapability {
    pub fn limits_for(&self, encoding: Encoding) -> Option<&EncodingLimits> {
        self.limits.iter().find(|l| l.encoding == encoding)
    }

    pub fn supports(&self, encoding: Encoding) -> bool {
        self.limits_for(encoding).is_some()
    }
}
