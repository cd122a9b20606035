//! Image optimization
//!
//! Everything between a resolved [`EditPlan`](crate::params::EditPlan) and
//! encoded bytes:
//! - Auto-format negotiation against the client's Accept header
//! - Pre-sizing from `w`, `h`, `ar` and `dpr`, plus the max-dimension pre-scale
//! - Crop/fit geometry
//! - The pixel executor and per-format encoders (JPEG, PNG, WebP, AVIF, GIF, TIFF)

pub mod encoder;
pub mod format;
pub mod geometry;
pub mod metadata;
pub mod processor;
pub mod sizing;

// Re-export commonly used types
pub use encoder::{EncodedImage, EncoderFactory, EncoderQuality, ImageEncoder};
pub use format::{accepted_formats, decide, vary_header, winning_fm, OutputFormat};
pub use geometry::{plan_crop, CropPlan, CropRequest, ExtractRegion};
pub use metadata::{inspect, SourceImage, SourceMetadata};
pub use processor::{execute, output_format, parse_color, ExecutionOptions, ProcessedImage};
pub use sizing::{prescale_dimensions, presize, MaxDimensions, TargetSize};
