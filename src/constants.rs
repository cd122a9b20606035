// Constants module - centralized default values for configuration
//
// Default values used by configuration loading, the pipeline and the
// executor live here instead of as magic numbers at the call sites.

// =============================================================================
// Image defaults
// =============================================================================

/// Quality for lossy encoders when the request carries no `q`
pub const DEFAULT_QUALITY: u8 = 75;

/// Cache-Control header sent with every transformed image
pub const DEFAULT_CACHE_CONTROL: &str = "public, max-age=31536000";

/// Content type used when the store does not report one
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

// =============================================================================
// Logging defaults
// =============================================================================

/// Default log level filter
pub const DEFAULT_LOG_LEVEL: &str = "info";

// =============================================================================
// Environment variables
// =============================================================================

pub const ENV_SOURCE_BUCKET: &str = "SOURCE_BUCKET";
pub const ENV_AWS_REGION: &str = "AWS_REGION";
pub const ENV_S3_ENDPOINT: &str = "S3_ENDPOINT";
pub const ENV_DEFAULT_QUALITY: &str = "DEFAULT_QUALITY";
pub const ENV_MAX_IMAGE_WIDTH: &str = "MAX_IMAGE_WIDTH";
pub const ENV_MAX_IMAGE_HEIGHT: &str = "MAX_IMAGE_HEIGHT";
pub const ENV_CACHE_CONTROL: &str = "DEFAULT_CACHE_CONTROL";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";
