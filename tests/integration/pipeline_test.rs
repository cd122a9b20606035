//! Pipeline end-to-end tests against the in-memory object store
//!
//! Tests the complete request flow:
//!   ImageRequest → fetch → negotiate → resolve → pre-size → execute → ImageResponse

use image::{DynamicImage, GenericImageView, ImageFormat, RgbImage, RgbaImage};
use rstest::{fixture, rstest};
use shutterline::config::ServiceConfig;
use shutterline::pipeline::{ImageRequest, Pipeline};
use shutterline::storage::MemoryObjectStore;
use std::io::Cursor;
use std::sync::Arc;

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, format).unwrap();
    buffer.into_inner()
}

/// Create a test JPEG image (300x200 gradient)
fn create_test_jpeg_300x200() -> Vec<u8> {
    let img = RgbImage::from_fn(300, 200, |x, y| image::Rgb([(x % 255) as u8, (y % 255) as u8, 90]));
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
}

/// Create a test PNG image (200x150 with alpha)
fn create_test_png_200x150() -> Vec<u8> {
    let img = RgbaImage::from_fn(200, 150, |x, y| {
        let alpha = if (x + y) % 2 == 0 { 255 } else { 128 };
        image::Rgba([0, 128, 255, alpha])
    });
    encode(DynamicImage::ImageRgba8(img), ImageFormat::Png)
}

#[fixture]
async fn pipeline() -> Pipeline {
    let store = MemoryObjectStore::new("originals");
    store
        .insert("photos/landscape.jpg", create_test_jpeg_300x200(), Some("image/jpeg"))
        .await;
    store
        .insert("icons/logo.png", create_test_png_200x150(), Some("image/png"))
        .await;
    Pipeline::new(Arc::new(store), ServiceConfig::new("originals"))
}

fn decoded_size(body: &[u8]) -> (u32, u32) {
    image::load_from_memory(body).unwrap().dimensions()
}

#[rstest]
#[case("w=150", (150, 100))]
#[case("h=50", (75, 50))]
#[case("w=100&h=100&fit=crop", (100, 100))]
#[case("w=100&h=100&fit=scale", (100, 100))]
#[case("w=100&h=100&fit=clip", (100, 67))]
#[case("w=600&fit=max", (300, 200))]
#[case("w=120&h=120&fit=fill&fill=solid&fill-color=black", (120, 120))]
#[case("w=120&h=120&fit=fill&fill=blur", (120, 120))]
#[case("w=0.5", (150, 100))]
#[case("w=100&dpr=2", (200, 133))]
#[case("w=90&ar=2:1&fit=crop", (90, 180))]
#[case("or=90", (200, 300))]
#[tokio::test]
async fn test_jpeg_resize_modes(
    #[future] pipeline: Pipeline,
    #[case] query: &str,
    #[case] expected: (u32, u32),
) {
    let pipeline = pipeline.await;
    let response = pipeline
        .handle(&ImageRequest::new("/photos/landscape.jpg", query))
        .await;

    assert_eq!(response.status, 200, "query {query}");
    assert_eq!(response.content_type, "image/jpeg");
    assert_eq!(decoded_size(&response.body), expected, "query {query}");
}

#[rstest]
#[case("blur=20")]
#[case("px=10")]
#[case("sharp=50")]
#[case("bri=30&con=-20")]
#[case("invert=true")]
#[case("flip=hv")]
#[tokio::test]
async fn test_adjustments_and_stylize_keep_dimensions(
    #[future] pipeline: Pipeline,
    #[case] query: &str,
) {
    let pipeline = pipeline.await;
    let response = pipeline
        .handle(&ImageRequest::new("photos/landscape.jpg", query))
        .await;

    assert_eq!(response.status, 200, "query {query}");
    assert_eq!(decoded_size(&response.body), (300, 200), "query {query}");
}

#[rstest]
#[tokio::test]
async fn test_transparent_png_flattened_for_jpeg(#[future] pipeline: Pipeline) {
    let pipeline = pipeline.await;
    let response = pipeline
        .handle(&ImageRequest::new("icons/logo.png", "fm=jpg&bg=ff0000&q=90"))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.content_type, "image/jpeg");
    let output = image::load_from_memory(&response.body).unwrap();
    assert!(!output.color().has_alpha());
}

#[rstest]
#[tokio::test]
async fn test_auto_format_negotiation(#[future] pipeline: Pipeline) {
    let pipeline = pipeline.await;

    let avif = pipeline
        .handle(
            &ImageRequest::new("photos/landscape.jpg", "auto=format&w=60")
                .with_accept("image/avif,image/webp,*/*;q=0.8"),
        )
        .await;
    assert_eq!(avif.status, 200);
    assert_eq!(avif.content_type, "image/avif");
    assert_eq!(avif.header("Vary"), Some("Accept"));

    let untouched = pipeline
        .handle(
            &ImageRequest::new("photos/landscape.jpg", "w=60")
                .with_accept("image/avif,image/webp"),
        )
        .await;
    assert_eq!(untouched.content_type, "image/jpeg");
    assert_eq!(untouched.header("Vary"), None);
}

#[rstest]
#[case("fm=png", "image/png")]
#[case("fm=webp&lossless=1", "image/webp")]
#[case("fm=gif", "image/gif")]
#[case("fm=tiff", "image/tiff")]
#[tokio::test]
async fn test_explicit_output_formats(
    #[future] pipeline: Pipeline,
    #[case] query: &str,
    #[case] content_type: &str,
) {
    let pipeline = pipeline.await;
    let response = pipeline
        .handle(&ImageRequest::new("icons/logo.png", query))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.content_type, content_type);
    assert_eq!(
        response.header("Content-Length"),
        Some(response.body.len().to_string().as_str())
    );
}

#[rstest]
#[case("w=-5", 400)]
#[case("fit=crop&crop=middle", 400)]
#[case("ar=16x9&fit=crop", 400)]
#[tokio::test]
async fn test_invalid_parameters_rejected(
    #[future] pipeline: Pipeline,
    #[case] query: &str,
    #[case] status: u16,
) {
    let pipeline = pipeline.await;
    let response = pipeline
        .handle(&ImageRequest::new("photos/landscape.jpg", query))
        .await;
    assert_eq!(response.status, status, "query {query}");
    assert_eq!(response.content_type, "text/plain; charset=utf-8");
}

#[rstest]
#[tokio::test]
async fn test_clamp_falls_back_to_original(#[future] pipeline: Pipeline) {
    let pipeline = pipeline.await;
    let original = create_test_jpeg_300x200();
    let response = pipeline
        .handle(&ImageRequest::new("photos/landscape.jpg", "w=50&h=50&fit=clamp"))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body.as_ref(), original.as_slice());
}

#[rstest]
#[tokio::test]
async fn test_missing_object(#[future] pipeline: Pipeline) {
    let pipeline = pipeline.await;
    let response = pipeline
        .handle(&ImageRequest::new("photos/missing.jpg", "w=10"))
        .await;
    assert_eq!(response.status, 404);
}
