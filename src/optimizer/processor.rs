//! Pixel executor
//!
//! Applies a resolved, pre-sized edit plan to a decoded source:
//! pre-scale → rotation → size (fit modes) → adjustment → stylize → encode.
//! Primitives come from the `image` and `fast_image_resize` crates.

use fast_image_resize::{FilterType, Image, PixelType, ResizeAlg, Resizer};
use image::{DynamicImage, Rgba, RgbaImage};
use std::num::NonZeroU32;
use tracing::debug;

use super::encoder::{EncoderFactory, EncoderQuality};
use super::format::OutputFormat;
use super::geometry::{plan_crop, CropPlan, CropRequest};
use super::metadata::{SourceImage, SourceMetadata};
use super::sizing::{prescale_dimensions, MaxDimensions, TargetSize};
use crate::constants::DEFAULT_QUALITY;
use crate::params::{EditError, EditPlan, Schema};

/// Sigma of the background blur used by `fill=blur`
const FILL_BLUR_SIGMA: f32 = 20.0;

/// Service-level settings the executor needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionOptions {
    /// Quality used when the plan has no `q`
    pub default_quality: u8,
    pub max_dimensions: MaxDimensions,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            default_quality: DEFAULT_QUALITY,
            max_dimensions: MaxDimensions::default(),
        }
    }
}

/// Result of image processing
#[derive(Debug)]
pub struct ProcessedImage {
    pub data: Vec<u8>,
    pub format: OutputFormat,
    pub content_type: &'static str,
    /// Original dimensions (width, height)
    pub original_size: (u32, u32),
    /// Output dimensions (width, height)
    pub output_size: (u32, u32),
}

/// Apply `plan` to `source` and encode the result
pub fn execute(
    source: &SourceImage,
    plan: &EditPlan,
    target: TargetSize,
    options: &ExecutionOptions,
    schema: &Schema,
) -> Result<ProcessedImage, EditError> {
    let original_size = (source.image.width(), source.image.height());
    let mut img = source.image.clone();

    if let Some((w, h)) = prescale_dimensions(&source.metadata, options.max_dimensions)? {
        img = resize_image(&img, w, h, ResizeAlg::Convolution(FilterType::Lanczos3))?;
    }

    img = apply_rotation(img, plan);
    img = apply_size(img, plan, target, schema)?;
    img = apply_adjustments(img, plan);
    img = apply_stylize(img, plan)?;

    let format = output_format(plan, &source.metadata);
    if !format.supports_transparency() && img.color().has_alpha() {
        let background = plan
            .str("bg")
            .and_then(|color| parse_color(color, schema))
            .unwrap_or(Rgba([255, 255, 255, 255]));
        img = flatten(&img, background);
    }

    let quality = EncoderQuality::with_quality(quality(plan, options.default_quality))
        .with_lossless(plan.bool("lossless").unwrap_or(false));

    let (width, height) = (img.width(), img.height());
    let rgba = img.to_rgba8().into_raw();
    let encoded = EncoderFactory::create(format).encode(&rgba, width, height, quality)?;

    Ok(ProcessedImage {
        data: encoded.data,
        format,
        content_type: encoded.content_type,
        original_size,
        output_size: (width, height),
    })
}

/// `fm` when it names an encodable format, else the source format, else
/// PNG/JPEG depending on transparency
pub fn output_format(plan: &EditPlan, metadata: &SourceMetadata) -> OutputFormat {
    plan.str("fm")
        .and_then(|fm| fm.parse().ok())
        .or_else(|| metadata.format.parse().ok())
        .unwrap_or(if metadata.has_alpha {
            OutputFormat::Png
        } else {
            OutputFormat::Jpeg
        })
}

/// Explicit `q`, otherwise the configured default
fn quality(plan: &EditPlan, default_quality: u8) -> u8 {
    if !plan.is_explicit("q") {
        return default_quality;
    }
    plan.f64("q")
        .map(|q| q.round().clamp(1.0, 100.0) as u8)
        .unwrap_or(default_quality)
}

// =============================================================================
// Rotation
// =============================================================================

fn apply_rotation(img: DynamicImage, plan: &EditPlan) -> DynamicImage {
    let img = match plan.f64("orient").map(|o| o as i64) {
        Some(2) => img.fliph(),
        Some(3) | Some(180) => img.rotate180(),
        Some(4) => img.flipv(),
        Some(5) => img.rotate90().fliph(),
        Some(6) | Some(90) => img.rotate90(),
        Some(7) => img.rotate270().fliph(),
        Some(8) | Some(270) => img.rotate270(),
        _ => img,
    };

    match plan.str("flip") {
        Some("h") => img.fliph(),
        Some("v") => img.flipv(),
        Some("hv") => img.fliph().flipv(),
        _ => img,
    }
}

// =============================================================================
// Size
// =============================================================================

/// Fill in a missing dimension from the image's aspect ratio
fn complete_dimensions(img: &DynamicImage, width: Option<u32>, height: Option<u32>) -> Option<(u32, u32)> {
    let (iw, ih) = (img.width() as f64, img.height() as f64);
    match (width, height) {
        (Some(w), Some(h)) => Some((w, h)),
        (Some(w), None) => Some((w, ((w as f64 * ih / iw).round() as u32).max(1))),
        (None, Some(h)) => Some((((h as f64 * iw / ih).round() as u32).max(1), h)),
        (None, None) => None,
    }
}

/// Largest size with the image's aspect ratio inside `bounds`
fn fit_inside(img: &DynamicImage, bounds: (u32, u32), allow_enlarge: bool) -> (u32, u32) {
    let (iw, ih) = (img.width() as f64, img.height() as f64);
    let mut scale = (bounds.0 as f64 / iw).min(bounds.1 as f64 / ih);
    if !allow_enlarge {
        scale = scale.min(1.0);
    }
    (
        ((iw * scale).round() as u32).max(1),
        ((ih * scale).round() as u32).max(1),
    )
}

fn apply_size(
    img: DynamicImage,
    plan: &EditPlan,
    target: TargetSize,
    schema: &Schema,
) -> Result<DynamicImage, EditError> {
    let fit = plan.str("fit").unwrap_or("clip");
    let (target_w, target_h) = target.pixels();

    if fit == "clamp" {
        return Err(EditError::not_implemented("fit=clamp"));
    }
    let Some((w, h)) = complete_dimensions(&img, target_w, target_h) else {
        return Ok(img);
    };

    debug!(fit, width = w, height = h, "Applying size");
    let lanczos = ResizeAlg::Convolution(FilterType::Lanczos3);

    match fit {
        "clip" | "max" => {
            let (fw, fh) = fit_inside(&img, (w, h), fit == "clip");
            resize_image(&img, fw, fh, lanczos)
        }
        "scale" => resize_image(&img, w, h, lanczos),
        "min" => {
            // Shrink the requested box until it fits the source, then cover-crop
            let scale = (img.width() as f64 / w as f64)
                .min(img.height() as f64 / h as f64)
                .min(1.0);
            let bw = ((w as f64 * scale).round() as u32).max(1);
            let bh = ((h as f64 * scale).round() as u32).max(1);
            crop(img, plan, Some(bw), Some(bh), "crop")
        }
        "fill" | "fillmax" => {
            let (fw, fh) = fit_inside(&img, (w, h), fit == "fill");
            let fitted = resize_image(&img, fw, fh, lanczos)?;
            fill(&img, &fitted, (w, h), plan, schema)
        }
        "crop" | "facearea" => crop(img, plan, Some(w), Some(h), fit),
        other => Err(EditError::not_implemented(format!("fit={}", other))),
    }
}

fn crop(
    img: DynamicImage,
    plan: &EditPlan,
    width: Option<u32>,
    height: Option<u32>,
    fit: &str,
) -> Result<DynamicImage, EditError> {
    let request = CropRequest {
        fit,
        crop: plan.list("crop"),
        focal_x: plan.f64("fp-x"),
        focal_y: plan.f64("fp-y"),
        target_width: width,
        target_height: height,
        original_width: img.width(),
        original_height: img.height(),
    };

    match plan_crop(&request)? {
        CropPlan::Extract(region) => {
            let scaled = resize_image(
                &img,
                region.resize_width,
                region.resize_height,
                ResizeAlg::Convolution(FilterType::Lanczos3),
            )?;
            Ok(scaled.crop_imm(region.left, region.top, region.width, region.height))
        }
        CropPlan::Entropy { width, height } => entropy_crop(&img, width, height),
    }
}

/// Scale to cover `width`×`height`, then keep the window with the most
/// luminance entropy along the overflowing axis
fn entropy_crop(img: &DynamicImage, width: u32, height: u32) -> Result<DynamicImage, EditError> {
    let factor = (width as f64 / img.width() as f64).max(height as f64 / img.height() as f64);
    let cw = ((img.width() as f64 * factor).round() as u32).max(width);
    let ch = ((img.height() as f64 * factor).round() as u32).max(height);
    let cover = resize_image(img, cw, ch, ResizeAlg::Convolution(FilterType::Lanczos3))?;
    let luma = cover.to_luma8();

    let horizontal = cw > width;
    let overflow = if horizontal { cw - width } else { ch - height };
    let step = (overflow / 24).max(1);

    let mut best = (0u32, f64::MIN);
    let mut offset = 0;
    loop {
        let (x, y) = if horizontal { (offset, 0) } else { (0, offset) };
        let window = image::imageops::crop_imm(&luma, x, y, width, height).to_image();
        let score = entropy(&window);
        if score > best.1 {
            best = (offset, score);
        }
        if offset >= overflow {
            break;
        }
        offset = (offset + step).min(overflow);
    }

    debug!(offset = best.0, entropy = best.1, horizontal, "Entropy crop");
    let (x, y) = if horizontal { (best.0, 0) } else { (0, best.0) };
    Ok(cover.crop_imm(x, y, width, height))
}

/// Shannon entropy of an 8-bit luminance histogram
fn entropy(luma: &image::GrayImage) -> f64 {
    let mut histogram = [0u64; 256];
    for pixel in luma.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }
    let total = luma.width() as f64 * luma.height() as f64;
    if total == 0.0 {
        return 0.0;
    }
    histogram
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Pad `fitted` to `canvas` with a solid colour or a blurred cover copy of `original`
fn fill(
    original: &DynamicImage,
    fitted: &DynamicImage,
    canvas: (u32, u32),
    plan: &EditPlan,
    schema: &Schema,
) -> Result<DynamicImage, EditError> {
    let (cw, ch) = canvas;
    let mut background: RgbaImage = if plan.str("fill") == Some("blur") {
        let factor = (cw as f64 / original.width() as f64).max(ch as f64 / original.height() as f64);
        let bw = ((original.width() as f64 * factor).ceil() as u32).max(cw);
        let bh = ((original.height() as f64 * factor).ceil() as u32).max(ch);
        let cover = resize_image(original, bw, bh, ResizeAlg::Convolution(FilterType::Bilinear))?;
        cover
            .crop_imm((bw - cw) / 2, (bh - ch) / 2, cw, ch)
            .blur(FILL_BLUR_SIGMA)
            .to_rgba8()
    } else {
        let color = plan
            .str("fill-color")
            .and_then(|c| parse_color(c, schema))
            .unwrap_or(Rgba([255, 255, 255, 255]));
        RgbaImage::from_pixel(cw, ch, color)
    };

    let x = (cw as i64 - fitted.width() as i64) / 2;
    let y = (ch as i64 - fitted.height() as i64) / 2;
    image::imageops::overlay(&mut background, &fitted.to_rgba8(), x, y);
    Ok(DynamicImage::ImageRgba8(background))
}

fn flatten(img: &DynamicImage, background: Rgba<u8>) -> DynamicImage {
    let mut canvas = RgbaImage::from_pixel(img.width(), img.height(), Rgba([
        background.0[0],
        background.0[1],
        background.0[2],
        255,
    ]));
    image::imageops::overlay(&mut canvas, &img.to_rgba8(), 0, 0);
    DynamicImage::ImageRgba8(canvas)
}

/// `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa` or a CSS keyword
pub fn parse_color(value: &str, schema: &Schema) -> Option<Rgba<u8>> {
    let hex = match value.strip_prefix('#') {
        Some(hex) => hex,
        None => schema.color_hex(value)?,
    };
    let digits: Vec<u8> = hex
        .chars()
        .map(|c| c.to_digit(16).map(|d| d as u8))
        .collect::<Option<_>>()?;

    let channels: Vec<u8> = match digits.len() {
        3 | 4 => digits.iter().map(|d| d * 17).collect(),
        6 | 8 => digits.chunks(2).map(|pair| pair[0] * 16 + pair[1]).collect(),
        _ => return None,
    };
    let alpha = channels.get(3).copied().unwrap_or(255);
    Some(Rgba([channels[0], channels[1], channels[2], alpha]))
}

// =============================================================================
// Adjustment & stylize
// =============================================================================

fn apply_adjustments(mut img: DynamicImage, plan: &EditPlan) -> DynamicImage {
    if let Some(bri) = plan.f64("bri").filter(|v| *v != 0.0) {
        img = img.brighten((bri * 255.0 / 100.0).round() as i32);
    }
    if let Some(con) = plan.f64("con").filter(|v| *v != 0.0) {
        img = img.adjust_contrast(con as f32);
    }
    if plan.bool("invert") == Some(true) {
        img.invert();
    }
    img
}

fn apply_stylize(mut img: DynamicImage, plan: &EditPlan) -> Result<DynamicImage, EditError> {
    if let Some(blur) = plan.f64("blur").filter(|v| *v > 0.0) {
        img = img.blur((blur / 2.0) as f32);
    }
    if let Some(px) = plan.f64("px").map(|v| v as u32).filter(|v| *v > 1) {
        img = pixelate(&img, px)?;
    }
    if let Some(sharp) = plan.f64("sharp").filter(|v| *v > 0.0) {
        let threshold = (20.0 * (1.0 - sharp / 100.0)).round() as i32;
        img = img.unsharpen(1.0, threshold);
    }
    Ok(img)
}

fn pixelate(img: &DynamicImage, block: u32) -> Result<DynamicImage, EditError> {
    let (w, h) = (img.width(), img.height());
    let small = resize_image(
        img,
        (w / block).max(1),
        (h / block).max(1),
        ResizeAlg::Nearest,
    )?;
    resize_image(&small, w, h, ResizeAlg::Nearest)
}

// =============================================================================
// Resize
// =============================================================================

/// Resize using fast-image-resize
fn resize_image(
    img: &DynamicImage,
    target_w: u32,
    target_h: u32,
    algorithm: ResizeAlg,
) -> Result<DynamicImage, EditError> {
    if img.width() == target_w && img.height() == target_h {
        return Ok(img.clone());
    }

    let src_width =
        NonZeroU32::new(img.width()).ok_or_else(|| EditError::resize_failed("Source width is 0"))?;
    let src_height =
        NonZeroU32::new(img.height()).ok_or_else(|| EditError::resize_failed("Source height is 0"))?;
    let dst_width =
        NonZeroU32::new(target_w).ok_or_else(|| EditError::resize_failed("Target width is 0"))?;
    let dst_height =
        NonZeroU32::new(target_h).ok_or_else(|| EditError::resize_failed("Target height is 0"))?;

    let src_image = Image::from_vec_u8(
        src_width,
        src_height,
        img.to_rgba8().into_raw(),
        PixelType::U8x4,
    )
    .map_err(|e| EditError::resize_failed(format!("Failed to create source image: {:?}", e)))?;

    let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x4);
    let mut resizer = Resizer::new(algorithm);

    resizer
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| EditError::resize_failed(format!("Resize operation failed: {:?}", e)))?;

    let rgba_image = RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| EditError::resize_failed("Failed to create output image buffer"))?;

    Ok(DynamicImage::ImageRgba8(rgba_image))
}
