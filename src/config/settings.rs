//! Application settings and configuration management

use crate::error::{AppError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub upload: UploadConfig,
    pub analysis: AnalysisConfig,
    pub inference: InferenceConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// "development" exposes internal error detail in responses
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_environment() -> String {
    "production".to_string()
}

impl ServerConfig {
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }
}

/// Upload intake configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    #[serde(default = "default_upload_dir")]
    pub directory: String,
    /// Per-file ceiling enforced while streaming the upload
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    #[serde(default = "default_mime_types")]
    pub allowed_mime_types: Vec<String>,
    #[serde(default = "default_extensions")]
    pub allowed_extensions: Vec<String>,
}

fn default_upload_dir() -> String {
    "./uploads".to_string()
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_max_files() -> usize {
    10
}

fn default_mime_types() -> Vec<String> {
    ["image/jpeg", "image/jpg", "image/png", "image/webp", "image/gif"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_extensions() -> Vec<String> {
    [".jpg", ".jpeg", ".png", ".webp", ".gif"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl UploadConfig {
    pub fn max_file_size_mb(&self) -> u64 {
        self.max_file_size / (1024 * 1024)
    }

    /// Upper bound for a whole multipart body: every file at its ceiling plus form overhead
    pub fn max_body_bytes(&self) -> usize {
        let files = self.max_file_size.saturating_mul(self.max_files as u64 + 1);
        usize::try_from(files.saturating_add(1024 * 1024)).unwrap_or(usize::MAX)
    }

    pub fn is_allowed_mime_type(&self, mime_type: &str) -> bool {
        self.allowed_mime_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(mime_type))
    }

    pub fn is_allowed_extension(&self, extension: &str) -> bool {
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(extension))
    }
}

/// Analysis pipeline limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_max_prompt_length")]
    pub max_prompt_length: usize,
    #[serde(default = "default_min_analysis_length")]
    pub min_analysis_length: usize,
    /// Number of leading characters scanned for refusal phrasing
    #[serde(default = "default_scan_window")]
    pub scan_window: usize,
    /// Second ceiling applied when a file is read back into memory
    #[serde(default = "default_max_file_size")]
    pub max_materialize_bytes: u64,
}

fn default_max_prompt_length() -> usize {
    1000
}

fn default_min_analysis_length() -> usize {
    50
}

fn default_scan_window() -> usize {
    200
}

/// Inference service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InferenceConfig {
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_max_output_tokens() -> u32 {
    8192
}

fn default_temperature() -> f32 {
    0.1
}

fn default_top_p() -> f32 {
    0.8
}

fn default_top_k() -> u32 {
    40
}

fn default_timeout() -> u64 {
    60000
}

fn default_probe_timeout() -> u64 {
    10000
}

fn default_true() -> bool {
    true
}

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,
    #[serde(default = "default_burst")]
    pub burst_size: u32,
}

fn default_rps() -> u32 {
    5
}

fn default_burst() -> u32 {
    20
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

/// Flat variable names the service has historically been deployed with
const LEGACY_ENV_OVERRIDES: &[(&str, &str)] = &[
    ("GEMINI_API_KEY", "inference.api_key"),
    ("AI_MODEL", "inference.model"),
    ("AI_MAX_TOKENS", "inference.max_output_tokens"),
    ("AI_TEMPERATURE", "inference.temperature"),
    ("MAX_FILE_SIZE", "upload.max_file_size"),
    ("UPLOAD_DIR", "upload.directory"),
    ("NODE_ENV", "server.environment"),
    ("APP_ENV", "server.environment"),
];

impl Settings {
    /// Load settings from configuration files and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/default.toml")
    }

    /// Load settings from a specific configuration file path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .set_default("server.environment", default_environment())?
            .set_default("upload.directory", default_upload_dir())?
            .set_default("upload.max_file_size", default_max_file_size())?
            .set_default("upload.max_files", default_max_files() as u64)?
            .set_default("analysis.max_prompt_length", default_max_prompt_length() as u64)?
            .set_default("inference.model", default_model())?
            .set_default("rate_limit.enabled", true)?
            .set_default("logging.level", default_log_level())?
            .add_source(
                File::with_name(path.as_ref().to_str().unwrap_or("config/default"))
                    .required(false),
            )
            // Override with environment variables (prefixed with PROMPT_SHERLOCK__)
            .add_source(
                Environment::with_prefix("PROMPT_SHERLOCK")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("upload.allowed_mime_types")
                    .with_list_parse_key("upload.allowed_extensions")
                    .try_parsing(true),
            );

        for (var, key) in LEGACY_ENV_OVERRIDES {
            builder = builder.set_override_option(*key, std::env::var(var).ok())?;
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(invalid("Server port cannot be 0"));
        }
        if self.upload.max_files == 0 {
            return Err(invalid("upload.max_files must be at least 1"));
        }
        if self.upload.max_file_size == 0 || self.analysis.max_materialize_bytes == 0 {
            return Err(invalid("File size limits must be greater than 0"));
        }
        if self.upload.allowed_mime_types.is_empty() || self.upload.allowed_extensions.is_empty() {
            return Err(invalid("At least one image type must be allowed"));
        }
        if !(0.0..=2.0).contains(&self.inference.temperature) {
            return Err(invalid(format!(
                "inference.temperature must be within 0.0..=2.0, got {}",
                self.inference.temperature
            )));
        }
        if self.inference.max_output_tokens == 0 {
            return Err(invalid("inference.max_output_tokens must be greater than 0"));
        }
        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err(invalid(format!(
                "logging.format '{}' is invalid. Must be 'json' or 'pretty'",
                self.logging.format
            )));
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> AppError {
    AppError::Config(config::ConfigError::Message(message.into()))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                environment: default_environment(),
            },
            upload: UploadConfig {
                directory: default_upload_dir(),
                max_file_size: default_max_file_size(),
                max_files: default_max_files(),
                allowed_mime_types: default_mime_types(),
                allowed_extensions: default_extensions(),
            },
            analysis: AnalysisConfig {
                max_prompt_length: default_max_prompt_length(),
                min_analysis_length: default_min_analysis_length(),
                scan_window: default_scan_window(),
                max_materialize_bytes: default_max_file_size(),
            },
            inference: InferenceConfig {
                api_key: String::new(),
                base_url: default_base_url(),
                model: default_model(),
                max_output_tokens: default_max_output_tokens(),
                temperature: default_temperature(),
                top_p: default_top_p(),
                top_k: default_top_k(),
                timeout_ms: default_timeout(),
                probe_timeout_ms: default_probe_timeout(),
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                requests_per_second: default_rps(),
                burst_size: default_burst(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            },
        }
    }
}
