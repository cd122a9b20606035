// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{
    DEFAULT_CACHE_CONTROL, DEFAULT_LOG_LEVEL, DEFAULT_QUALITY, ENV_AWS_REGION, ENV_CACHE_CONTROL,
    ENV_DEFAULT_QUALITY, ENV_LOG_FORMAT, ENV_LOG_LEVEL, ENV_MAX_IMAGE_HEIGHT,
    ENV_MAX_IMAGE_WIDTH, ENV_S3_ENDPOINT, ENV_SOURCE_BUCKET,
};
use crate::optimizer::MaxDimensions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings passed into the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Bucket holding the originals
    pub source_bucket: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default = "default_quality")]
    pub default_quality: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_image_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_image_height: Option<u32>,
    #[serde(default = "default_cache_control")]
    pub cache_control: String,
}

impl ServiceConfig {
    pub fn new(source_bucket: impl Into<String>) -> Self {
        Self {
            source_bucket: source_bucket.into(),
            region: None,
            endpoint: None,
            default_quality: DEFAULT_QUALITY,
            max_image_width: None,
            max_image_height: None,
            cache_control: DEFAULT_CACHE_CONTROL.to_string(),
        }
    }

    pub fn max_dimensions(&self) -> MaxDimensions {
        MaxDimensions::new(self.max_image_width, self.max_image_height)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(format!("Unknown log format '{}': expected json or pretty", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_quality() -> u8 {
    DEFAULT_QUALITY
}

fn default_cache_control() -> String {
    DEFAULT_CACHE_CONTROL.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>, String>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => value
            .parse()
            .map(Some)
            .map_err(|e| format!("Invalid value for {}: {}", name, e)),
        _ => Ok(None),
    }
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    /// Build the configuration from environment variables alone
    pub fn from_env() -> Result<Self, String> {
        let source_bucket = std::env::var(ENV_SOURCE_BUCKET)
            .map_err(|_| format!("Environment variable '{}' is not set", ENV_SOURCE_BUCKET))?;

        let mut service = ServiceConfig::new(source_bucket);
        service.region = env_parse(ENV_AWS_REGION)?;
        service.endpoint = env_parse(ENV_S3_ENDPOINT)?;
        if let Some(quality) = env_parse(ENV_DEFAULT_QUALITY)? {
            service.default_quality = quality;
        }
        service.max_image_width = env_parse(ENV_MAX_IMAGE_WIDTH)?;
        service.max_image_height = env_parse(ENV_MAX_IMAGE_HEIGHT)?;
        if let Some(cache_control) = env_parse(ENV_CACHE_CONTROL)? {
            service.cache_control = cache_control;
        }

        let mut logging = LoggingConfig::default();
        if let Some(level) = env_parse(ENV_LOG_LEVEL)? {
            logging.level = level;
        }
        if let Some(format) = env_parse(ENV_LOG_FORMAT)? {
            logging.format = format;
        }

        Ok(Config { service, logging })
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.service.source_bucket.trim().is_empty() {
            return Err("service.source_bucket cannot be empty".to_string());
        }
        if !(1..=100).contains(&self.service.default_quality) {
            return Err(format!(
                "service.default_quality must be 1-100, got {}",
                self.service.default_quality
            ));
        }
        if self.service.max_image_width == Some(0) {
            return Err("service.max_image_width must be greater than 0".to_string());
        }
        if self.service.max_image_height == Some(0) {
            return Err("service.max_image_height must be greater than 0".to_string());
        }
        if self.logging.level.trim().is_empty() {
            return Err("logging.level cannot be empty".to_string());
        }
        Ok(())
    }
}
