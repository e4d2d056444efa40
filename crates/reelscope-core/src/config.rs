//! Configuration module
//!
//! Configuration is loaded once per process (environment plus an optional
//! `.env` file), validated, and then shared read-only through [`Config`].
//! Nothing in the pipeline mutates it after construction.

use std::env;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::constants::*;

/// Settings for the analysis pipeline.
#[derive(Clone)]
pub struct AnalysisConfig {
    // Remote service
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub http_timeout_secs: u64,
    // Submission retry
    pub submit_max_attempts: u32,
    pub submit_backoff_base_ms: u64,
    // Readiness polling
    pub poll_interval_secs: u64,
    pub poll_timeout_secs: u64,
    // Result parsing
    pub timestamp_min_secs: u32,
    pub timestamp_max_secs: u32,
    pub thumbnail_fallback_secs: u32,
    pub risk_keywords: Vec<String>,
    // Local media
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub max_video_size_bytes: usize,
    pub video_allowed_extensions: Vec<String>,
    pub video_allowed_content_types: Vec<String>,
    pub temp_dir: PathBuf,
}

impl Debug for AnalysisConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AnalysisConfig")
            .field("gemini_api_key", &"[REDACTED]")
            .field("gemini_model", &self.gemini_model)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("submit_max_attempts", &self.submit_max_attempts)
            .field("submit_backoff_base_ms", &self.submit_backoff_base_ms)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("timestamp_min_secs", &self.timestamp_min_secs)
            .field("timestamp_max_secs", &self.timestamp_max_secs)
            .field("thumbnail_fallback_secs", &self.thumbnail_fallback_secs)
            .field("risk_keywords", &self.risk_keywords)
            .field("ffmpeg_path", &self.ffmpeg_path)
            .field("ffprobe_path", &self.ffprobe_path)
            .field("max_video_size_bytes", &self.max_video_size_bytes)
            .field("video_allowed_extensions", &self.video_allowed_extensions)
            .field("video_allowed_content_types", &self.video_allowed_content_types)
            .field("temp_dir", &self.temp_dir)
            .finish()
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

impl AnalysisConfig {
    /// Defaults for everything except the API key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            gemini_api_key: api_key.into(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            submit_max_attempts: DEFAULT_SUBMIT_MAX_ATTEMPTS,
            submit_backoff_base_ms: DEFAULT_SUBMIT_BACKOFF_BASE_MS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            poll_timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
            timestamp_min_secs: DEFAULT_TIMESTAMP_MIN_SECS,
            timestamp_max_secs: DEFAULT_TIMESTAMP_MAX_SECS,
            thumbnail_fallback_secs: DEFAULT_THUMBNAIL_FALLBACK_SECS,
            risk_keywords: to_strings(DEFAULT_RISK_KEYWORDS),
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            max_video_size_bytes: DEFAULT_MAX_VIDEO_SIZE_MB * 1024 * 1024,
            video_allowed_extensions: to_strings(DEFAULT_VIDEO_EXTENSIONS),
            video_allowed_content_types: to_strings(DEFAULT_VIDEO_CONTENT_TYPES),
            temp_dir: env::temp_dir(),
        }
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GEMINI_API_KEY")
            .ok_or_else(|| anyhow::anyhow!("GEMINI_API_KEY must be set"))?;
        Self::with_api_key(api_key).apply_lookup(&lookup)
    }

    /// Load only what offline parsing needs; `GEMINI_API_KEY` is not
    /// required. The result is checked with [`AnalysisConfig::validate_parsing`].
    pub fn parsing_from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::parsing_from_lookup(|key| env::var(key).ok())
    }

    pub fn parsing_from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config =
            Self::with_api_key(lookup("GEMINI_API_KEY").unwrap_or_default()).apply_lookup(&lookup)?;
        config.validate_parsing()?;
        Ok(config)
    }

    fn apply_lookup<F>(self, lookup: &F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = self;
        let parse_u64 = |key: &str, default: u64| -> Result<u64, anyhow::Error> {
            match lookup(key) {
                Some(v) => v
                    .trim()
                    .parse()
                    .map_err(|_| anyhow::anyhow!("{} must be a valid number", key)),
                None => Ok(default),
            }
        };

        if let Some(model) = lookup("GEMINI_MODEL") {
            config.gemini_model = model.trim().to_string();
        }
        if let Some(base_url) = lookup("GEMINI_BASE_URL") {
            config.gemini_base_url = base_url.trim().trim_end_matches('/').to_string();
        }
        config.http_timeout_secs = parse_u64("GEMINI_HTTP_TIMEOUT_SECS", config.http_timeout_secs)?;
        config.submit_max_attempts =
            parse_u64("SUBMIT_MAX_ATTEMPTS", config.submit_max_attempts as u64)? as u32;
        config.submit_backoff_base_ms =
            parse_u64("SUBMIT_BACKOFF_BASE_MS", config.submit_backoff_base_ms)?;
        config.poll_interval_secs = parse_u64("POLL_INTERVAL_SECS", config.poll_interval_secs)?;
        config.poll_timeout_secs = parse_u64("POLL_TIMEOUT_SECS", config.poll_timeout_secs)?;
        config.timestamp_min_secs =
            parse_u64("TIMESTAMP_MIN_SECS", config.timestamp_min_secs as u64)? as u32;
        config.timestamp_max_secs =
            parse_u64("TIMESTAMP_MAX_SECS", config.timestamp_max_secs as u64)? as u32;
        config.thumbnail_fallback_secs =
            parse_u64("THUMBNAIL_FALLBACK_SECS", config.thumbnail_fallback_secs as u64)? as u32;
        if let Some(keywords) = lookup("RISK_KEYWORDS") {
            config.risk_keywords = split_list(&keywords);
        }
        if let Some(path) = lookup("FFMPEG_PATH") {
            config.ffmpeg_path = path;
        }
        if let Some(path) = lookup("FFPROBE_PATH") {
            config.ffprobe_path = path;
        }
        let max_video_size_mb = parse_u64("MAX_VIDEO_SIZE_MB", DEFAULT_MAX_VIDEO_SIZE_MB as u64)?;
        config.max_video_size_bytes = (max_video_size_mb as usize) * 1024 * 1024;
        if let Some(extensions) = lookup("VIDEO_ALLOWED_EXTENSIONS") {
            config.video_allowed_extensions = split_list(&extensions);
        }
        if let Some(content_types) = lookup("VIDEO_ALLOWED_CONTENT_TYPES") {
            config.video_allowed_content_types = split_list(&content_types);
        }
        if let Some(dir) = lookup("TEMP_DIR") {
            config.temp_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.gemini_api_key.trim().is_empty() {
            return Err(anyhow::anyhow!("GEMINI_API_KEY must not be empty"));
        }

        if self.gemini_api_key == "your-api-key" || self.gemini_api_key.len() < 10 {
            return Err(anyhow::anyhow!(
                "GEMINI_API_KEY appears to be invalid or a placeholder"
            ));
        }

        if self.gemini_model.is_empty() {
            return Err(anyhow::anyhow!("GEMINI_MODEL must not be empty"));
        }

        if self.submit_max_attempts == 0 {
            return Err(anyhow::anyhow!("SUBMIT_MAX_ATTEMPTS must be at least 1"));
        }

        if self.poll_interval_secs == 0 {
            return Err(anyhow::anyhow!("POLL_INTERVAL_SECS must be at least 1"));
        }

        if self.poll_interval_secs > self.poll_timeout_secs {
            return Err(anyhow::anyhow!(
                "POLL_INTERVAL_SECS ({}) must not exceed POLL_TIMEOUT_SECS ({})",
                self.poll_interval_secs,
                self.poll_timeout_secs
            ));
        }

        self.validate_parsing()?;

        if self.video_allowed_extensions.is_empty() {
            return Err(anyhow::anyhow!(
                "VIDEO_ALLOWED_EXTENSIONS must list at least one extension"
            ));
        }

        Ok(())
    }

    /// Checks for the settings the result parser uses.
    pub fn validate_parsing(&self) -> Result<(), anyhow::Error> {
        if self.timestamp_min_secs > self.timestamp_max_secs {
            return Err(anyhow::anyhow!(
                "TIMESTAMP_MIN_SECS ({}) must not exceed TIMESTAMP_MAX_SECS ({})",
                self.timestamp_min_secs,
                self.timestamp_max_secs
            ));
        }

        if self.risk_keywords.is_empty() {
            return Err(anyhow::anyhow!("RISK_KEYWORDS must list at least one keyword"));
        }

        Ok(())
    }
}

/// Immutable, cheaply cloneable application configuration.
#[derive(Clone, Debug)]
pub struct Config(Arc<AnalysisConfig>);

impl Config {
    pub fn new(config: AnalysisConfig) -> Self {
        Config(Arc::new(config))
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = AnalysisConfig::from_env()?;
        config.validate()?;
        Ok(Config::new(config))
    }

    pub fn as_analysis(&self) -> &AnalysisConfig {
        &self.0
    }

    pub fn gemini_api_key(&self) -> &str {
        &self.0.gemini_api_key
    }

    pub fn gemini_model(&self) -> &str {
        &self.0.gemini_model
    }

    pub fn gemini_base_url(&self) -> &str {
        &self.0.gemini_base_url
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.0.http_timeout_secs)
    }

    pub fn submit_max_attempts(&self) -> u32 {
        self.0.submit_max_attempts
    }

    pub fn submit_backoff_base(&self) -> Duration {
        Duration::from_millis(self.0.submit_backoff_base_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.0.poll_interval_secs)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.0.poll_timeout_secs)
    }

    pub fn timestamp_range(&self) -> (u32, u32) {
        (self.0.timestamp_min_secs, self.0.timestamp_max_secs)
    }

    pub fn thumbnail_fallback_secs(&self) -> u32 {
        self.0.thumbnail_fallback_secs
    }

    pub fn risk_keywords(&self) -> &[String] {
        &self.0.risk_keywords
    }

    pub fn ffmpeg_path(&self) -> &str {
        &self.0.ffmpeg_path
    }

    pub fn ffprobe_path(&self) -> &str {
        &self.0.ffprobe_path
    }

    pub fn max_video_size_bytes(&self) -> usize {
        self.0.max_video_size_bytes
    }

    pub fn video_allowed_extensions(&self) -> &[String] {
        &self.0.video_allowed_extensions
    }

    pub fn video_allowed_content_types(&self) -> &[String] {
        &self.0.video_allowed_content_types
    }

    pub fn temp_dir(&self) -> &std::path::Path {
        &self.0.temp_dir
    }
}
