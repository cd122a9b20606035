//! Edit error types
//!
//! Provides structured error handling with HTTP status mapping for parameter
//! resolution, geometry planning and pixel execution.

use std::fmt;

use super::schema::RuleType;

/// Errors that can occur while resolving or applying an edit plan
#[derive(Debug, Clone, PartialEq)]
pub enum EditError {
    // === Resolution Errors ===
    /// A supplied value satisfied none of its parameter's rules
    ValidationFailure {
        param: String,
        value: String,
        expected: Vec<RuleType>,
        reasons: Vec<String>,
    },

    // === Geometry Errors ===
    /// The requested mode is known but not supported
    NotImplemented { feature: String },
    /// Source metadata needed for the computation is missing
    Configuration { message: String },
    /// Requested or derived dimensions are unusable
    InvalidDimensions {
        width: u32,
        height: u32,
        reason: String,
    },

    // === Pixel Errors ===
    /// Output format cannot be produced
    UnsupportedFormat { format: String },
    /// Failed to decode image data
    DecodeFailed { message: String },
    /// Resize operation failed
    ResizeFailed { message: String },
    /// Encoding to output format failed
    EncodeFailed { format: String, message: String },
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditError::ValidationFailure {
                param,
                value,
                expected,
                reasons,
            } => {
                let expected: Vec<&str> = expected.iter().map(RuleType::as_str).collect();
                write!(
                    f,
                    "Invalid value '{}' for parameter '{}': expected {}",
                    value,
                    param,
                    expected.join(" or ")
                )?;
                if !reasons.is_empty() {
                    write!(f, " ({})", reasons.join("; "))?;
                }
                Ok(())
            }
            EditError::NotImplemented { feature } => {
                write!(f, "Not implemented: {}", feature)
            }
            EditError::Configuration { message } => {
                write!(f, "Configuration error: {}", message)
            }
            EditError::InvalidDimensions {
                width,
                height,
                reason,
            } => {
                write!(f, "Invalid dimensions {}x{}: {}", width, height, reason)
            }
            EditError::UnsupportedFormat { format } => {
                write!(f, "Unsupported image format: {}", format)
            }
            EditError::DecodeFailed { message } => {
                write!(f, "Failed to decode image: {}", message)
            }
            EditError::ResizeFailed { message } => {
                write!(f, "Resize failed: {}", message)
            }
            EditError::EncodeFailed { format, message } => {
                write!(f, "Failed to encode to {}: {}", format, message)
            }
        }
    }
}

impl std::error::Error for EditError {}

impl EditError {
    /// Maps edit errors to HTTP status codes
    ///
    /// Status mapping:
    /// - ValidationFailure, InvalidDimensions, DecodeFailed → 400 (Bad Request)
    /// - UnsupportedFormat → 415 (Unsupported Media Type)
    /// - Configuration, ResizeFailed, EncodeFailed → 500 (Internal Server Error)
    /// - NotImplemented → 501 (Not Implemented)
    pub fn to_http_status(&self) -> u16 {
        match self {
            EditError::ValidationFailure { .. }
            | EditError::InvalidDimensions { .. }
            | EditError::DecodeFailed { .. } => 400,

            EditError::UnsupportedFormat { .. } => 415,

            EditError::Configuration { .. }
            | EditError::ResizeFailed { .. }
            | EditError::EncodeFailed { .. } => 500,

            EditError::NotImplemented { .. } => 501,
        }
    }

    /// Client-caused failures that abort a request instead of falling back
    pub fn is_client_error(&self) -> bool {
        self.to_http_status() < 500
    }

    pub fn validation(
        param: impl Into<String>,
        value: impl Into<String>,
        expected: Vec<RuleType>,
        reasons: Vec<String>,
    ) -> Self {
        EditError::ValidationFailure {
            param: param.into(),
            value: value.into(),
            expected,
            reasons,
        }
    }

    pub fn not_implemented(feature: impl Into<String>) -> Self {
        EditError::NotImplemented {
            feature: feature.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        EditError::Configuration {
            message: message.into(),
        }
    }

    pub fn invalid_dimensions(width: u32, height: u32, reason: impl Into<String>) -> Self {
        EditError::InvalidDimensions {
            width,
            height,
            reason: reason.into(),
        }
    }

    pub fn unsupported_format(format: impl Into<String>) -> Self {
        EditError::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn decode_failed(message: impl Into<String>) -> Self {
        EditError::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn resize_failed(message: impl Into<String>) -> Self {
        EditError::ResizeFailed {
            message: message.into(),
        }
    }

    pub fn encode_failed(format: impl Into<String>, message: impl Into<String>) -> Self {
        EditError::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }
}
