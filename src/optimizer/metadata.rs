//! Source decoding and metadata inspection

use image::io::Reader as ImageReader;
use image::{DynamicImage, ImageFormat};
use serde::Serialize;
use std::io::Cursor;

use crate::params::EditError;

/// Facts about the stored original, read but never changed by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceMetadata {
    /// Lowercase format name (`jpeg`, `png`, `webp`, ...)
    pub format: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub has_alpha: bool,
}

impl SourceMetadata {
    /// Both dimensions, or a configuration error naming the missing one
    pub fn dimensions(&self) -> Result<(u32, u32), EditError> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Ok((w, h)),
            (None, _) => Err(EditError::configuration(
                "original image width could not be determined",
            )),
            (_, None) => Err(EditError::configuration(
                "original image height could not be determined",
            )),
        }
    }
}

/// A decoded original together with its metadata
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub image: DynamicImage,
    pub metadata: SourceMetadata,
}

/// Decode `data` and describe it
pub fn inspect(data: &[u8]) -> Result<SourceImage, EditError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| EditError::decode_failed(e.to_string()))?;

    let format = reader
        .format()
        .ok_or_else(|| EditError::unsupported_format("unknown"))?;

    let image = reader
        .decode()
        .map_err(|e| EditError::decode_failed(e.to_string()))?;

    let metadata = SourceMetadata {
        format: format_name(format).to_string(),
        width: Some(image.width()),
        height: Some(image.height()),
        has_alpha: image.color().has_alpha(),
    };

    Ok(SourceImage { image, metadata })
}

fn format_name(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "jpeg",
        ImageFormat::Png => "png",
        ImageFormat::WebP => "webp",
        ImageFormat::Avif => "avif",
        ImageFormat::Gif => "gif",
        ImageFormat::Tiff => "tiff",
        ImageFormat::Bmp => "bmp",
        ImageFormat::Ico => "ico",
        _ => "unknown",
    }
}
