//! Pre-sizing
//!
//! Derives the final target width/height from `w`, `h`, `ar` and `dpr`
//! before any fit or crop geometry runs, and computes the one-off pre-scale
//! applied to originals larger than the configured maximum dimensions.

use serde::Serialize;
use tracing::debug;

use super::metadata::SourceMetadata;
use crate::params::{EditError, EditPlan, ParamValue};

/// Target dimensions handed to the fit/crop stage; `None` means unconstrained
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TargetSize {
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl TargetSize {
    pub fn is_unconstrained(&self) -> bool {
        self.width.is_none() && self.height.is_none()
    }

    /// Whole-pixel dimensions, rounded
    pub fn pixels(&self) -> (Option<u32>, Option<u32>) {
        let px = |v: Option<f64>| v.map(|v| v.round().max(1.0) as u32);
        (px(self.width), px(self.height))
    }
}

/// Configured ceiling on original dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaxDimensions {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl MaxDimensions {
    pub fn new(width: Option<u32>, height: Option<u32>) -> Self {
        Self { width, height }
    }

    pub fn is_set(&self) -> bool {
        self.width.is_some() || self.height.is_some()
    }
}

/// Pixel value of a `w`/`h` item: integers are pixels, unit scalars are a
/// fraction of the matching original dimension.
fn dimension(
    value: Option<&ParamValue>,
    original: Option<u32>,
    axis: &str,
) -> Result<Option<f64>, EditError> {
    match value {
        Some(ParamValue::UnitScalar(fraction)) => {
            let original = original.ok_or_else(|| {
                EditError::configuration(format!(
                    "original image {} is required for a fractional size",
                    axis
                ))
            })?;
            Ok(Some(fraction * original as f64))
        }
        Some(other) => Ok(other.as_f64()),
        None => Ok(None),
    }
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Compute the target size for `plan` against the original's metadata.
///
/// 1. `ar` with exactly one of width/height derives the other
///    (`h = w × ar`, `w = h / ar`)
/// 2. `ar` with neither derives both from the original (`dim × ar`)
/// 3. `dpr` multiplies every dimension that is set
pub fn presize(plan: &EditPlan, metadata: &SourceMetadata) -> Result<TargetSize, EditError> {
    let mut width = dimension(plan.value("w"), metadata.width, "width")?;
    let mut height = dimension(plan.value("h"), metadata.height, "height")?;

    if let Some(ratio) = plan.f64("ar") {
        match (width, height) {
            (Some(w), None) => height = Some(w * ratio),
            (None, Some(h)) => width = Some(h / ratio),
            (None, None) => {
                let (orig_w, orig_h) = metadata.dimensions()?;
                width = Some(orig_w as f64 * ratio);
                height = Some(orig_h as f64 * ratio);
            }
            (Some(_), Some(_)) => {}
        }
    }

    if let Some(dpr) = plan.f64("dpr") {
        if width.is_some() || height.is_some() {
            width = width.map(|w| w * dpr);
            height = height.map(|h| h * dpr);
        }
    }

    let size = TargetSize {
        width: positive(width),
        height: positive(height),
    };
    debug!(width = ?size.width, height = ?size.height, "Pre-sized target");
    Ok(size)
}

/// Dimensions to pre-scale the original to, when it exceeds `max`.
///
/// The axis that overflows most is pinned to its maximum and the other
/// follows the original aspect ratio. Returns `None` when no clamp applies.
pub fn prescale_dimensions(
    metadata: &SourceMetadata,
    max: MaxDimensions,
) -> Result<Option<(u32, u32)>, EditError> {
    if !max.is_set() {
        return Ok(None);
    }

    let (orig_w, orig_h) = metadata.dimensions()?;
    if orig_w == 0 || orig_h == 0 {
        return Err(EditError::invalid_dimensions(
            orig_w,
            orig_h,
            "original image is empty",
        ));
    }

    let scale_w = max.width.map_or(1.0, |m| m as f64 / orig_w as f64);
    let scale_h = max.height.map_or(1.0, |m| m as f64 / orig_h as f64);
    let scale = scale_w.min(scale_h);

    if scale >= 1.0 {
        return Ok(None);
    }

    let (width, height) = if scale_w <= scale_h {
        let width = max.width.unwrap_or(orig_w);
        (width, ((orig_h as f64 * scale).round() as u32).max(1))
    } else {
        let height = max.height.unwrap_or(orig_h);
        (((orig_w as f64 * scale).round() as u32).max(1), height)
    };

    debug!(
        original_width = orig_w,
        original_height = orig_h,
        width,
        height,
        "Pre-scaling original above maximum dimensions"
    );
    Ok(Some((width, height)))
}
