// Unit tests for business rules

use std::time::Duration;

use super::*;

fn clip(start: f64, end: f64) -> ClipSpec {
    ClipSpec::new(1, "t", TimeSpec::from_seconds(start), TimeSpec::from_seconds(end)).unwrap()
}

#[test]
fn test_center_crop_landscape_source_crops_sides() {
    let rect = FrameGeometry::center_crop(1920, 1080, AspectRatio::VERTICAL);
    assert_eq!(rect.height, 1080.0);
    assert!((rect.width - 607.5).abs() < 1e-9);
    assert!((rect.x - (1920.0 - 607.5) / 2.0).abs() < 1e-9);
    assert_eq!(rect.y, 0.0);
}

#[test]
fn test_center_crop_narrow_source_crops_top_and_bottom() {
    // 1:4 is narrower than 9:16
    let rect = FrameGeometry::center_crop(400, 1600, AspectRatio::VERTICAL);
    assert_eq!(rect.width, 400.0);
    assert!((rect.height - 400.0 / 0.5625).abs() < 1e-9);
    assert!((rect.y - (1600.0 - rect.height) / 2.0).abs() < 1e-9);
    assert_eq!(rect.x, 0.0);
}

#[test]
fn test_center_crop_matching_aspect_is_identity() {
    let rect = FrameGeometry::center_crop(720, 1280, AspectRatio::VERTICAL);
    assert_eq!(rect, CropRect { x: 0.0, y: 0.0, width: 720.0, height: 1280.0 });
}

#[test]
fn test_output_dimensions_follow_tier_and_aspect() {
    assert_eq!(
        FrameGeometry::output_dimensions(AspectRatio::VERTICAL, QualityTier::P720),
        (720, 1280)
    );
    assert_eq!(
        FrameGeometry::output_dimensions(AspectRatio::VERTICAL, QualityTier::P1080),
        (1080, 1920)
    );
    let wide = AspectRatio::parse("16:9").unwrap();
    assert_eq!(FrameGeometry::output_dimensions(wide, QualityTier::P720), (1280, 720));
}

#[test]
fn test_output_dimensions_stay_bounded_for_extreme_aspects() {
    let tall = AspectRatio { width: 1, height: 4_000_000_000 };
    assert_eq!(FrameGeometry::output_dimensions(tall, QualityTier::P1080), (1080, 4320));

    let wide = AspectRatio { width: u32::MAX, height: 1 };
    assert_eq!(FrameGeometry::output_dimensions(wide, QualityTier::P720), (2880, 720));
}

#[test]
fn test_encoder_candidates_order_mp4() {
    let mimes: Vec<&str> = EncoderNegotiation::candidates(OutputFormat::Mp4)
        .iter()
        .map(|p| p.mime_type)
        .collect();
    assert_eq!(
        mimes,
        vec![
            "video/mp4;codecs=h264,aac",
            "video/mp4",
            "video/webm;codecs=h264,opus",
            "video/webm"
        ]
    );
}

#[test]
fn test_encoder_candidates_webm_prefers_webm() {
    let first = EncoderNegotiation::candidates(OutputFormat::Webm)[0];
    assert_eq!(first.container, Container::WebM);
    assert_eq!(first.extension(), "webm");
}

#[test]
fn test_encoder_select_falls_through_to_supported() {
    let selected = EncoderNegotiation::select(OutputFormat::Mp4, |p| p.mime_type == "video/webm");
    assert_eq!(selected.map(|p| p.mime_type), Some("video/webm"));

    let none = EncoderNegotiation::select(OutputFormat::Webm, |_| false);
    assert!(none.is_none());
}

#[test]
fn test_sanitize_filename() {
    assert_eq!(FileNaming::sanitize("My Video: part 1!.mp4"), "My_Video__part_1_.mp4");
    assert_eq!(FileNaming::with_extension("clip", Container::WebM), "clip.webm");
    assert_eq!(FileNaming::with_extension("a b.mov", Container::Mp4), "a_b.mov");
}

#[test]
fn test_dot_only_names_fall_back_to_video() {
    assert_eq!(FileNaming::with_extension(".", Container::Mp4), "video.mp4");
    assert_eq!(FileNaming::with_extension("..", Container::WebM), "video.webm");
    assert_eq!(FileNaming::with_extension("", Container::Mp4), "video.mp4");
}

#[test]
fn test_clip_filename_embeds_number_and_title() {
    let mut spec = clip(0.0, 5.0);
    spec.number = 4;
    spec.title = "Why it works?".to_string();
    assert_eq!(FileNaming::clip_filename(&spec, "mp4"), "clip_4_Why_it_works_.mp4");

    spec.title = "  ".to_string();
    assert_eq!(FileNaming::clip_filename(&spec, "webm"), "clip_4_video.webm");
}

#[test]
fn test_capture_percent_is_clamped_below_100() {
    let spec = clip(10.0, 40.0);
    assert_eq!(ProgressRules::capture_percent(5.0, &spec), 0.0);
    assert_eq!(ProgressRules::capture_percent(10.0, &spec), 0.0);
    assert!((ProgressRules::capture_percent(25.0, &spec) - 50.0).abs() < 1e-9);
    assert_eq!(ProgressRules::capture_percent(40.0, &spec), 99.0);
    assert_eq!(ProgressRules::capture_percent(400.0, &spec), 99.0);
}

#[test]
fn test_eta_estimates() {
    assert_eq!(
        ProgressRules::estimate_remaining(0.0, Duration::from_secs(5)),
        EtaEstimate::Calculating
    );
    assert_eq!(
        ProgressRules::estimate_remaining(50.0, Duration::from_millis(500)),
        EtaEstimate::Calculating
    );

    let eta = ProgressRules::estimate_remaining(50.0, Duration::from_secs(10));
    assert_eq!(eta.to_string(), "~10s left");

    let long = ProgressRules::estimate_remaining(20.0, Duration::from_secs(40));
    assert_eq!(long.to_string(), "~3 mins left");

    assert_eq!(
        ProgressRules::estimate_remaining(120.0, Duration::from_secs(10)),
        EtaEstimate::Finishing
    );
}
