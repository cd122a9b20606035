//! Output formats and auto-format negotiation
//!
//! The negotiator only overrides the output format when `auto=format` is
//! requested and the source is a coercible raster format:
//! - AVIF when the client accepts it
//! - otherwise WebP when the client accepts it
//! - otherwise JPEG for opaque PNG/TIFF sources

use std::fmt;
use std::str::FromStr;

use crate::params::EditError;

/// Source formats the negotiator may replace
const COERCIBLE_FORMATS: [&str; 6] = ["jpeg", "jpg", "png", "webp", "avif", "tiff"];

/// Encodable output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Avif,
    Gif,
    Tiff,
}

impl OutputFormat {
    /// Value as written to the `fm` parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Avif => "avif",
            Self::Gif => "gif",
            Self::Tiff => "tiff",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Avif => "image/avif",
            Self::Gif => "image/gif",
            Self::Tiff => "image/tiff",
        }
    }

    pub fn supports_transparency(&self) -> bool {
        matches!(self, Self::Png | Self::WebP | Self::Avif | Self::Gif | Self::Tiff)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" | "pjpg" => Ok(OutputFormat::Jpeg),
            "png" | "png8" | "png32" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            "avif" => Ok(OutputFormat::Avif),
            "gif" => Ok(OutputFormat::Gif),
            "tiff" | "tif" => Ok(OutputFormat::Tiff),
            other => Err(EditError::unsupported_format(other)),
        }
    }
}

/// Decide the negotiated output format, if any.
///
/// `accepted` lists the modern formats the client declared support for.
pub fn decide(
    original_format: &str,
    has_alpha: bool,
    auto_modes: &[String],
    accepted: &[OutputFormat],
) -> Option<OutputFormat> {
    let original = original_format.to_lowercase();

    if !auto_modes.iter().any(|mode| mode == "format")
        || !COERCIBLE_FORMATS.contains(&original.as_str())
    {
        return None;
    }

    if accepted.contains(&OutputFormat::Avif) {
        return Some(OutputFormat::Avif);
    }
    if accepted.contains(&OutputFormat::WebP) {
        return Some(OutputFormat::WebP);
    }
    if !has_alpha && (original == "png" || original == "tiff") {
        return Some(OutputFormat::Jpeg);
    }

    None
}

/// The `fm` value to resolve with: negotiated, then explicit, then original.
///
/// The original format is used only when it is itself a valid `fm` value.
pub fn winning_fm(
    negotiated: Option<OutputFormat>,
    explicit: Option<&str>,
    original_format: &str,
) -> Option<String> {
    if let Some(format) = negotiated {
        return Some(format.as_str().to_string());
    }
    if let Some(fm) = explicit.filter(|fm| !fm.is_empty()) {
        return Some(fm.to_string());
    }
    original_format
        .parse::<OutputFormat>()
        .ok()
        .map(|format| format.as_str().to_string())
}

/// Parsed Accept header preference
#[derive(Debug, Clone, PartialEq)]
struct FormatPreference {
    media_type: String,
    quality: f32,
}

/// Parse Accept header into media types with quality values, in header order.
/// Only presence matters to format negotiation, so entries are not ranked.
fn parse_accept_header(accept: &str) -> Vec<FormatPreference> {
    let mut preferences = Vec::new();

    for part in accept.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let (media_type, quality) = if let Some((mt, params)) = part.split_once(';') {
            (mt.trim(), parse_quality(params))
        } else {
            (part, 1.0)
        };

        preferences.push(FormatPreference {
            media_type: media_type.to_lowercase(),
            quality,
        });
    }

    preferences
}

/// Parse quality value from parameters (e.g., "q=0.8")
fn parse_quality(params: &str) -> f32 {
    for param in params.split(';') {
        let param = param.trim();
        if let Some(q) = param.strip_prefix("q=") {
            if let Ok(quality) = q.parse::<f32>() {
                return quality.clamp(0.0, 1.0);
            }
        }
    }
    1.0
}

/// Modern formats explicitly accepted by the client.
///
/// Wildcards (`image/*`, `*/*`) do not count: browsers send them even when
/// they cannot decode AVIF or WebP.
pub fn accepted_formats(accept_header: Option<&str>) -> Vec<OutputFormat> {
    let Some(accept) = accept_header else {
        return Vec::new();
    };

    let mut formats = Vec::new();
    for preference in parse_accept_header(accept) {
        if preference.quality <= 0.0 {
            continue;
        }
        let format = match preference.media_type.as_str() {
            "image/avif" => OutputFormat::Avif,
            "image/webp" => OutputFormat::WebP,
            _ => continue,
        };
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    formats
}

/// Get the Vary header value for auto-format
pub fn vary_header() -> &'static str {
    "Accept"
}
