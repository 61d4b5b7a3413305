//! Metadata export and image sink tests.

use std::fs;

use keyframe_detector::{
    GrayFrame, ImageDirectorySink, KeyframeDebug, KeyframeError, KeyframeEvent, KeyframeReason,
    KeyframeSink, events_to_json, write_events, write_metadata,
};
use image::{ColorType, Rgb, RgbImage};
use serde_json::Value;

fn sample_events() -> Vec<KeyframeEvent> {
    vec![
        KeyframeEvent::new(0.0, 0, KeyframeReason::FirstFrame),
        KeyframeEvent::new(4.123456789, 103, KeyframeReason::LocalMaximum),
        KeyframeEvent::new(9.0, 225, KeyframeReason::MaxTimeConstraint),
    ]
}

// ── JSON export ──────────────────────────────────────────────────

#[test]
fn events_serialize_to_array() {
    let json = events_to_json(&sample_events());
    let array = json.as_array().expect("array");
    assert_eq!(array.len(), 3);

    assert_eq!(array[0]["time"], 0.0);
    assert_eq!(array[0]["frame"], 0);
    assert_eq!(array[0]["reason"], "first frame");
    assert_eq!(array[1]["reason"], "local maximum");
    assert_eq!(array[2]["reason"], "max time constraint");
    assert!(array[1].get("magnitude").is_none());
}

#[test]
fn times_keep_full_precision() {
    let json = events_to_json(&sample_events());
    assert_eq!(json[1]["time"].as_f64(), Some(4.123456789));
}

#[test]
fn debug_fields_are_included() {
    let event = KeyframeEvent::new(2.5, 60, KeyframeReason::BaselinePeak).with_debug(KeyframeDebug {
        magnitude: 12.5,
        adjusted_threshold: 6.0,
        time_since_last_keyframe: 2.5,
    });
    let json = event.to_json();
    assert_eq!(json["reason"], "baseline peak");
    assert_eq!(json["magnitude"], 12.5);
    assert_eq!(json["adjusted_threshold"], 6.0);
    assert_eq!(json["time_since_last_keyframe"], 2.5);
}

#[test]
fn event_display() {
    let event = KeyframeEvent::new(4.126, 103, KeyframeReason::LocalMaximum);
    assert_eq!(event.to_string(), "4.13s (frame 103, local maximum)");
}

#[test]
fn write_events_to_buffer() {
    let mut buffer = Vec::new();
    write_events(&mut buffer, &sample_events()).unwrap();
    let text = String::from_utf8(buffer).unwrap();
    assert!(text.starts_with('['));
    assert!(text.ends_with("]\n"));
    let parsed: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, events_to_json(&sample_events()));
}

#[test]
fn write_metadata_file() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("keyframes.json");

    write_metadata(&path, &sample_events()).unwrap();

    let parsed: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(parsed.as_array().map(Vec::len), Some(3));
    assert_eq!(parsed[2]["frame"], 225);
}

#[test]
fn empty_event_list_is_an_empty_array() {
    assert_eq!(events_to_json(&[]), Value::Array(Vec::new()));
}

// ── Image sink ───────────────────────────────────────────────────

#[test]
fn sink_creates_directory_and_writes_jpeg() {
    let directory = tempfile::tempdir().unwrap();
    let target = directory.path().join("out").join("keyFrames");
    let mut sink = ImageDirectorySink::create(&target).unwrap();
    assert!(target.is_dir());

    let frame = GrayFrame::filled(32, 24, 128, 1.0, 30);
    let event = KeyframeEvent::new(1.0, 30, KeyframeReason::LocalMaximum);
    let path = sink.save(&frame, &event).unwrap();

    assert_eq!(path, target.join("keyframe30.jpg"));
    let decoded = image::open(&path).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (32, 24));
    assert_eq!(decoded.color(), ColorType::Rgb8);
}

#[test]
fn sink_saves_attached_color_image() {
    let directory = tempfile::tempdir().unwrap();
    let mut sink = ImageDirectorySink::create(directory.path()).unwrap();

    let color = RgbImage::from_pixel(16, 16, Rgb([200, 30, 30]));
    let frame = GrayFrame::filled(16, 16, 90, 2.0, 48).with_color(color).unwrap();
    let event = KeyframeEvent::new(2.0, 48, KeyframeReason::LocalMaximum);
    let path = sink.save(&frame, &event).unwrap();

    let decoded = image::open(&path).unwrap();
    assert_eq!(decoded.color(), ColorType::Rgb8);
    let pixel = decoded.to_rgb8().get_pixel(8, 8).0;
    assert!(pixel[0] > 150 && pixel[1] < 80 && pixel[2] < 80, "{pixel:?}");
}

#[test]
fn sink_reports_write_failures() {
    let directory = tempfile::tempdir().unwrap();
    let target = directory.path().join("gone");
    let mut sink = ImageDirectorySink::create(&target).unwrap();
    fs::remove_dir_all(&target).unwrap();

    let frame = GrayFrame::filled(8, 8, 0, 0.0, 0);
    let event = KeyframeEvent::new(0.0, 0, KeyframeReason::FirstFrame);
    let error = sink.save(&frame, &event).unwrap_err();

    assert!(matches!(
        error,
        KeyframeError::SinkError { frame_index: 0, ref path, .. } if path.ends_with("keyframe0.jpg")
    ));
}
