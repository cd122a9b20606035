// Optimizer unit tests: format negotiation, pre-sizing and crop geometry

use rstest::rstest;
use shutterline::optimizer::*;
use shutterline::params::{parse_query, resolve, Schema};

fn metadata(format: &str, width: u32, height: u32, has_alpha: bool) -> SourceMetadata {
    SourceMetadata {
        format: format.to_string(),
        width: Some(width),
        height: Some(height),
        has_alpha,
    }
}

fn modes(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

// =============================================================================
// Auto-format
// =============================================================================

#[rstest]
#[case("png", false, &[], Some(OutputFormat::Jpeg))]
#[case("png", false, &[OutputFormat::WebP, OutputFormat::Avif], Some(OutputFormat::Avif))]
#[case("jpeg", false, &[OutputFormat::WebP], Some(OutputFormat::WebP))]
#[case("png", true, &[], None)]
#[case("jpeg", false, &[], None)]
#[case("gif", false, &[OutputFormat::Avif], None)]
fn test_decide(
    #[case] original: &str,
    #[case] has_alpha: bool,
    #[case] accepted: &[OutputFormat],
    #[case] expected: Option<OutputFormat>,
) {
    assert_eq!(decide(original, has_alpha, &modes(&["format"]), accepted), expected);
}

#[test]
fn test_decide_requires_format_mode() {
    assert_eq!(
        decide("png", false, &modes(&["compress"]), &[OutputFormat::Avif]),
        None
    );
}

#[test]
fn test_accepted_formats_ignore_wildcards_and_zero_quality() {
    assert_eq!(
        accepted_formats(Some("image/avif,image/webp;q=0,image/*,*/*;q=0.8")),
        vec![OutputFormat::Avif]
    );
    assert!(accepted_formats(None).is_empty());
}

#[test]
fn test_winning_fm_precedence() {
    assert_eq!(
        winning_fm(Some(OutputFormat::WebP), Some("png"), "jpeg").as_deref(),
        Some("webp")
    );
    assert_eq!(winning_fm(None, Some("png"), "jpeg").as_deref(), Some("png"));
    assert_eq!(winning_fm(None, None, "jpeg").as_deref(), Some("jpeg"));
    assert_eq!(winning_fm(None, None, "bmp"), None);
}

#[rstest]
#[case("jpg", OutputFormat::Jpeg)]
#[case("pjpg", OutputFormat::Jpeg)]
#[case("png32", OutputFormat::Png)]
#[case("tif", OutputFormat::Tiff)]
#[case("AVIF", OutputFormat::Avif)]
fn test_output_format_names(#[case] name: &str, #[case] expected: OutputFormat) {
    assert_eq!(name.parse::<OutputFormat>().unwrap(), expected);
}

// =============================================================================
// Pre-sizing
// =============================================================================

#[rstest]
#[case("w=300&h=200", Some(300.0), Some(200.0))]
#[case("w=0.5", Some(400.0), None)]
#[case("w=100&dpr=2", Some(200.0), None)]
#[case("w=100&ar=2:1&fit=crop", Some(100.0), Some(200.0))]
#[case("", None, None)]
fn test_presize(#[case] query: &str, #[case] width: Option<f64>, #[case] height: Option<f64>) {
    let plan = resolve(&parse_query(query), Schema::builtin()).unwrap();
    let target = presize(&plan, &metadata("jpeg", 800, 600, false)).unwrap();
    assert_eq!(target, TargetSize { width, height });
}

#[test]
fn test_prescale_pins_overflowing_axis() {
    let max = MaxDimensions::new(Some(1000), Some(1000));
    assert_eq!(
        prescale_dimensions(&metadata("png", 4000, 2000, false), max).unwrap(),
        Some((1000, 500))
    );
    assert_eq!(
        prescale_dimensions(&metadata("png", 800, 600, false), max).unwrap(),
        None
    );
}

// =============================================================================
// Geometry
// =============================================================================

fn crop_request<'a>(crop: &'a [String], width: u32, height: u32) -> CropRequest<'a> {
    CropRequest {
        fit: "crop",
        crop,
        focal_x: None,
        focal_y: None,
        target_width: Some(width),
        target_height: Some(height),
        original_width: 1792,
        original_height: 1792,
    }
}

#[rstest]
#[case(&[], 125)]
#[case(&["left"], 0)]
#[case(&["right"], 250)]
fn test_crop_window_position(#[case] crop: &[&str], #[case] left: u32) {
    let crop = modes(crop);
    let plan = plan_crop(&crop_request(&crop, 250, 500)).unwrap();
    let CropPlan::Extract(region) = plan else {
        panic!("expected an extraction, got {plan:?}");
    };

    assert_eq!((region.width, region.height), (250, 500));
    assert_eq!((region.resize_width, region.resize_height), (500, 500));
    assert_eq!((region.left, region.top), (left, 0));
    assert!(region.left + region.width <= region.resize_width);
    assert!(region.top + region.height <= region.resize_height);
}

#[test]
fn test_entropy_crop_is_deferred() {
    let crop = modes(&["entropy"]);
    assert_eq!(
        plan_crop(&crop_request(&crop, 250, 500)).unwrap(),
        CropPlan::Entropy {
            width: 250,
            height: 500
        }
    );
}

#[test]
fn test_clamp_is_not_implemented() {
    let crop = modes(&[]);
    let mut request = crop_request(&crop, 100, 100);
    request.fit = "clamp";
    assert_eq!(plan_crop(&request).unwrap_err().to_http_status(), 501);
}
