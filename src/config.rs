//! Configuration file loading with environment variable overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::job::PollPolicy;
use crate::model::DEFAULT_MODEL;
use crate::upload::UploadCandidate;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "FAL_KEY";

/// Query selecting the v3 CDN on initiate endpoints.
const CDN_V3: &str = "?storage_type=fal-cdn-v3";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// API key configuration.
    #[serde(default)]
    pub keys: KeysConfig,

    /// Default parameter values, used when the matching CLI flag is absent.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Queue service location.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Polling cadence.
    #[serde(default)]
    pub polling: PollingConfig,

    /// Upload endpoint chain.
    #[serde(default)]
    pub upload: UploadConfig,
}

/// API key configuration.
#[derive(Debug, Default, Deserialize)]
pub struct KeysConfig {
    /// fal API key.
    pub fal: Option<String>,
}

/// Default parameter values from config file.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Default model name or alias.
    pub model: String,
    /// Default number of images.
    pub num_images: u32,
    /// Default aspect ratio.
    pub aspect_ratio: String,
    /// Default resolution.
    pub resolution: String,
    /// Default output format.
    pub output_format: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            num_images: 1,
            aspect_ratio: "1:1".to_string(),
            resolution: "1K".to_string(),
            output_format: "png".to_string(),
        }
    }
}

/// Queue service location.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Base URL; the model id is appended to it.
    pub base_url: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            base_url: "https://queue.fal.run".to_string(),
        }
    }
}

/// Polling cadence.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Wait before each status check, in milliseconds.
    pub interval_ms: u64,
    /// Status checks before giving up.
    pub max_attempts: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        let policy = PollPolicy::default();
        Self {
            interval_ms: u64::try_from(policy.interval.as_millis()).unwrap_or(5000),
            max_attempts: policy.max_attempts,
        }
    }
}

impl PollingConfig {
    /// The policy handed to the job client.
    #[must_use]
    pub fn policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.interval_ms),
            max_attempts: self.max_attempts,
        }
    }
}

/// Upload endpoint chain, tried in order: every `initiate` URL (two-stage
/// protocol), then every `legacy` URL (multipart form).
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Two-stage initiate endpoints.
    pub initiate: Vec<String>,
    /// Legacy multipart form endpoints.
    pub legacy: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            initiate: vec![
                format!("https://rest.alpha.fal.ai/storage/upload/initiate{CDN_V3}"),
                "https://rest.alpha.fal.ai/storage/upload/initiate".to_string(),
                format!("https://rest.fal.ai/storage/upload/initiate{CDN_V3}"),
            ],
            legacy: vec![
                "https://rest.alpha.fal.ai/storage/upload".to_string(),
                "https://rest.fal.ai/storage/upload".to_string(),
                "https://fal.run/storage/upload".to_string(),
                "https://api.fal.ai/v1/storage/upload".to_string(),
            ],
        }
    }
}

impl UploadConfig {
    /// The candidate chain in priority order.
    #[must_use]
    pub fn candidates(&self) -> Vec<UploadCandidate> {
        self.initiate
            .iter()
            .map(UploadCandidate::two_stage)
            .chain(self.legacy.iter().map(UploadCandidate::form_data))
            .collect()
    }
}

impl Config {
    /// Load configuration from the given path, or return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
        toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
    }

    /// Get the API key, preferring the environment variable.
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .or_else(|| self.keys.fal.clone())
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

/// Discover the config file path using the resolution order:
/// 1. Explicit path (from `--config` flag)
/// 2. `BANANAGEN_CONFIG` environment variable
/// 3. `~/.config/bananagen/config.toml`
#[must_use]
pub fn discover_config_path(explicit: Option<&str>) -> PathBuf {
    if let Some(p) = explicit {
        return PathBuf::from(p);
    }

    if let Ok(p) = std::env::var("BANANAGEN_CONFIG") {
        return PathBuf::from(p);
    }

    default_config_path()
}

/// Default config path: `~/.config/bananagen/config.toml`.
fn default_config_path() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".config/bananagen/config.toml")
    } else {
        PathBuf::from("bananagen.toml")
    }
}
