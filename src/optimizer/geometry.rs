//! Crop/fit geometry
//!
//! Pure arithmetic deciding the extraction rectangle for `fit=crop`:
//! the original is scaled uniformly so it covers the target, then a
//! target-sized window is positioned around the focal point and clamped to
//! the scaled image.

use serde::Serialize;
use tracing::debug;

use crate::params::EditError;

/// Rectangle to extract from the intermediate (scaled) image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExtractRegion {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
    /// Size the original is scaled to before extraction
    pub resize_width: u32,
    pub resize_height: u32,
}

/// Outcome of crop planning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CropPlan {
    /// Scale then extract a fixed rectangle
    Extract(ExtractRegion),
    /// Scale to cover and position by image entropy
    Entropy { width: u32, height: u32 },
}

/// Inputs to [`plan_crop`]
#[derive(Debug, Clone, Copy)]
pub struct CropRequest<'a> {
    pub fit: &'a str,
    pub crop: &'a [String],
    pub focal_x: Option<f64>,
    pub focal_y: Option<f64>,
    pub target_width: Option<u32>,
    pub target_height: Option<u32>,
    pub original_width: u32,
    pub original_height: u32,
}

/// Round up, ignoring float noise just above a whole number
fn ceil_dimension(value: f64) -> u32 {
    (value - 1e-9).ceil().max(1.0) as u32
}

/// Target dimensions, deriving a missing one from the original aspect ratio
fn complete_target(request: &CropRequest<'_>) -> Result<(u32, u32), EditError> {
    let (ow, oh) = (
        request.original_width as f64,
        request.original_height as f64,
    );
    match (request.target_width, request.target_height) {
        (Some(w), Some(h)) => Ok((w, h)),
        (Some(w), None) => Ok((w, ((w as f64 * oh / ow).round() as u32).max(1))),
        (None, Some(h)) => Ok((((h as f64 * ow / oh).round() as u32).max(1), h)),
        (None, None) => Err(EditError::invalid_dimensions(
            request.original_width,
            request.original_height,
            "crop requires a target width or height",
        )),
    }
}

/// Focal point as fractions of the intermediate image
fn focal_point(request: &CropRequest<'_>) -> (f64, f64) {
    if request.crop.iter().any(|mode| mode == "focalpoint") {
        return (
            request.focal_x.unwrap_or(0.5).clamp(0.0, 1.0),
            request.focal_y.unwrap_or(0.5).clamp(0.0, 1.0),
        );
    }

    let (mut x, mut y) = (0.5, 0.5);
    for mode in request.crop {
        match mode.as_str() {
            "left" => x = 0.0,
            "right" => x = 1.0,
            "top" => y = 0.0,
            "bottom" => y = 1.0,
            _ => {}
        }
    }
    (x, y)
}

/// Origin of a `target`-sized window centred on `focal` and kept inside `extent`
fn window_origin(extent: u32, target: u32, focal: f64) -> u32 {
    let raw = (extent as f64 * focal - 0.5 * target as f64).floor();
    let far = extent.saturating_sub(target);
    if raw < 0.0 {
        0
    } else if raw as u32 > far {
        far
    } else {
        raw as u32
    }
}

/// Plan the crop for one request.
///
/// Fails with `NotImplemented` for `fit=clamp` and with `InvalidDimensions`
/// when neither target dimension is known or the original is empty.
pub fn plan_crop(request: &CropRequest<'_>) -> Result<CropPlan, EditError> {
    if request.fit == "clamp" {
        return Err(EditError::not_implemented("fit=clamp"));
    }
    if request.original_width == 0 || request.original_height == 0 {
        return Err(EditError::invalid_dimensions(
            request.original_width,
            request.original_height,
            "original image is empty",
        ));
    }

    if request.crop.iter().any(|mode| mode == "entropy") {
        let (width, height) = if request.target_width.is_none() && request.target_height.is_none() {
            (request.original_width, request.original_height)
        } else {
            complete_target(request)?
        };
        return Ok(CropPlan::Entropy { width, height });
    }

    let (target_w, target_h) = complete_target(request)?;

    let factor = (target_w as f64 / request.original_width as f64)
        .max(target_h as f64 / request.original_height as f64);
    let resize_width = ceil_dimension(request.original_width as f64 * factor);
    let resize_height = ceil_dimension(request.original_height as f64 * factor);

    let (focal_x, focal_y) = focal_point(request);
    let region = ExtractRegion {
        left: window_origin(resize_width, target_w, focal_x),
        top: window_origin(resize_height, target_h, focal_y),
        width: target_w.min(resize_width),
        height: target_h.min(resize_height),
        resize_width,
        resize_height,
    };

    debug!(
        factor,
        focal_x,
        focal_y,
        region = ?region,
        "Planned crop"
    );
    Ok(CropPlan::Extract(region))
}
