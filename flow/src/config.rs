//! Flow configuration with TOML file support.

use std::path::Path;
use std::time::Duration;

use idgate_types::{DocumentMode, FlowVariant};
use idgate_utils::LogFormat;
use serde::{Deserialize, Serialize};

use crate::error::FlowError;

/// Configuration for a verification run.
///
/// Can be loaded from a TOML file via [`GateConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every field has a default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Base URL of the face comparison service.
    #[serde(default = "default_comparator_url")]
    pub comparator_url: String,

    #[serde(default = "default_comparator_timeout_secs")]
    pub comparator_timeout_secs: u64,

    /// Endpoint that receives completed submissions.
    #[serde(default = "default_delivery_url")]
    pub delivery_url: String,

    #[serde(default = "default_delivery_timeout_secs")]
    pub delivery_timeout_secs: u64,

    /// Largest serialized submission sent; bigger payloads are refused locally.
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,

    /// Still photo with face matching, or duration-gated video.
    #[serde(default)]
    pub variant: FlowVariant,

    /// Document mode a new session starts in.
    #[serde(default)]
    pub document_mode: DocumentMode,

    /// Edge length of the enhanced comparison image.
    #[serde(default = "default_enhance_size")]
    pub enhance_size: u32,

    /// Byte budget for each document image in a submission.
    #[serde(default = "default_transport_target_bytes")]
    pub transport_target_bytes: usize,

    #[serde(default = "default_transport_max_dimension")]
    pub transport_max_dimension: u32,

    /// Shortest acceptable video, in seconds.
    #[serde(default = "default_video_min_secs")]
    pub video_min_secs: u64,

    /// Longest acceptable video; recording stops on its own at this mark.
    #[serde(default = "default_video_max_secs")]
    pub video_max_secs: u64,

    /// Query camera permission before opening a stream.
    #[serde(default = "default_true")]
    pub permission_probe: bool,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter (e.g. "info", "idgate_flow=debug").
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_comparator_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_comparator_timeout_secs() -> u64 {
    30
}

fn default_delivery_url() -> String {
    "http://127.0.0.1:3000/api/stepper-form".to_string()
}

fn default_delivery_timeout_secs() -> u64 {
    60
}

fn default_max_payload_bytes() -> usize {
    4 * 1024 * 1024
}

fn default_enhance_size() -> u32 {
    400
}

fn default_transport_target_bytes() -> usize {
    1024 * 1024
}

fn default_transport_max_dimension() -> u32 {
    1280
}

fn default_video_min_secs() -> u64 {
    5
}

fn default_video_max_secs() -> u64 {
    7
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl GateConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, FlowError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| FlowError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, FlowError> {
        let config: Self = toml::from_str(s).map_err(|e| FlowError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, FlowError> {
        toml::to_string_pretty(self).map_err(|e| FlowError::Config(e.to_string()))
    }

    /// Reject settings no flow could satisfy.
    pub fn validate(&self) -> Result<(), FlowError> {
        if self.video_min_secs > self.video_max_secs {
            return Err(FlowError::Config(format!(
                "video_min_secs ({}) exceeds video_max_secs ({})",
                self.video_min_secs, self.video_max_secs
            )));
        }
        if self.video_max_secs == 0 {
            return Err(FlowError::Config("video_max_secs must be positive".into()));
        }
        if self.enhance_size == 0 || self.transport_max_dimension == 0 {
            return Err(FlowError::Config("image dimensions must be positive".into()));
        }
        Ok(())
    }

    pub fn comparator_timeout(&self) -> Duration {
        Duration::from_secs(self.comparator_timeout_secs)
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }

    pub fn video_min(&self) -> Duration {
        Duration::from_secs(self.video_min_secs)
    }

    pub fn video_max(&self) -> Duration {
        Duration::from_secs(self.video_max_secs)
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            comparator_url: default_comparator_url(),
            comparator_timeout_secs: default_comparator_timeout_secs(),
            delivery_url: default_delivery_url(),
            delivery_timeout_secs: default_delivery_timeout_secs(),
            max_payload_bytes: default_max_payload_bytes(),
            variant: FlowVariant::default(),
            document_mode: DocumentMode::default(),
            enhance_size: default_enhance_size(),
            transport_target_bytes: default_transport_target_bytes(),
            transport_max_dimension: default_transport_max_dimension(),
            video_min_secs: default_video_min_secs(),
            video_max_secs: default_video_max_secs(),
            permission_probe: true,
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}
