//! VideoFile integration tests.
//!
//! Tests that decode require `tests/fixtures/sample_video.mp4` and return
//! early when it is missing.

use std::path::Path;

use keyframe_detector::{DetectionConfig, KeyframeDetector, KeyframeError, KeyframeReason, VideoFile};

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

// ── open ───────────────────────────────────────────────────────────

#[test]
fn open_missing_file() {
    let result = VideoFile::open("tests/fixtures/does_not_exist.mp4");
    match result {
        Err(KeyframeError::FileOpen { path, .. }) => {
            assert!(path.ends_with("does_not_exist.mp4"));
        }
        other => panic!("expected FileOpen, got {other:?}"),
    }
}

#[test]
fn open_reads_metadata() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let video = VideoFile::open(path).expect("Failed to open fixture");
    let metadata = video.metadata();
    assert!(metadata.width > 0 && metadata.height > 0);
    assert!(metadata.frames_per_second > 0.0);
    assert!(metadata.frame_count > 0);
    assert_eq!(video.path(), Path::new(path));
}

// ── frames ─────────────────────────────────────────────────────────

#[test]
fn frames_are_grayscale_and_ordered() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut video = VideoFile::open(path).expect("Failed to open fixture");
    let (width, height) = (video.metadata().width, video.metadata().height);

    let frames: Vec<_> = video
        .frames()
        .expect("Failed to create iterator")
        .take(10)
        .collect::<Result<_, _>>()
        .expect("Frames should decode");

    assert!(!frames.is_empty());
    for (expected_index, frame) in frames.iter().enumerate() {
        assert_eq!(frame.index, expected_index as u64);
        assert_eq!(frame.dimensions(), (width, height));
        assert_eq!(frame.pixels().len(), (width * height) as usize);
    }
    for pair in frames.windows(2) {
        assert!(pair[1].time >= pair[0].time);
    }
    for frame in &frames {
        let color = frame.color_image().expect("color image attached");
        assert_eq!(color.dimensions(), (width, height));
    }
}

#[test]
fn luma_frames_match_color_frames() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut video = VideoFile::open(path).expect("Failed to open fixture");
    let with_color: Vec<_> = video
        .frames()
        .expect("Failed to create iterator")
        .take(5)
        .collect::<Result<_, _>>()
        .expect("Frames should decode");

    let mut video = VideoFile::open(path).expect("Failed to open fixture");
    let luma_only: Vec<_> = video
        .luma_frames()
        .expect("Failed to create iterator")
        .take(5)
        .collect::<Result<_, _>>()
        .expect("Frames should decode");

    assert_eq!(with_color.len(), luma_only.len());
    for (colored, luma) in with_color.iter().zip(&luma_only) {
        assert!(luma.color_image().is_none());
        assert_eq!(colored.pixels(), luma.pixels());
    }
}

// ── detection ──────────────────────────────────────────────────────

#[test]
fn detect_on_fixture() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut video = VideoFile::open(path).expect("Failed to open fixture");
    let fps = video.metadata().frames_per_second;
    let config = DetectionConfig::new().with_max_time_constraint(1.0);
    let detector = KeyframeDetector::new(&config, fps).expect("Valid configuration");

    let report = detector
        .detect(video.luma_frames().expect("Failed to create iterator"))
        .expect("Detection should succeed");

    assert!(report.termination.is_success());
    assert!(report.frames_processed > 0);
    assert_eq!(report.events[0].reason, KeyframeReason::FirstFrame);
    for pair in report.events.windows(2) {
        assert!(pair[1].time > pair[0].time);
    }
}
