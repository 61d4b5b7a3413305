//! DetectionConfig, OutputMode and TimeBounds tests.

use keyframe_detector::{
    CancellationToken, ContentType, DetectionConfig, KeyframeDetector, KeyframeError, OutputMode,
    Sensitivity, TimeBounds,
};

// ── OutputMode ───────────────────────────────────────────────────

#[test]
fn output_mode_parsing() {
    assert_eq!("images".parse::<OutputMode>().unwrap(), OutputMode::Images);
    assert_eq!("json".parse::<OutputMode>().unwrap(), OutputMode::Json);
    assert_eq!("json_only".parse::<OutputMode>().unwrap(), OutputMode::JsonOnly);
    assert_eq!("json-debug".parse::<OutputMode>().unwrap(), OutputMode::JsonDebug);
    assert_eq!("JSON_DEBUG".parse::<OutputMode>().unwrap(), OutputMode::JsonDebug);
    assert!(matches!(
        "text".parse::<OutputMode>(),
        Err(KeyframeError::InvalidConfig(_))
    ));
}

#[test]
fn output_mode_effects() {
    assert!(OutputMode::Images.saves_images() && !OutputMode::Images.writes_json());
    assert!(OutputMode::Json.saves_images() && OutputMode::Json.writes_json());
    assert!(!OutputMode::JsonOnly.saves_images() && OutputMode::JsonOnly.writes_json());
    assert!(!OutputMode::JsonDebug.saves_images() && OutputMode::JsonDebug.writes_json());
    assert!(OutputMode::JsonDebug.includes_debug());
    assert!(!OutputMode::Json.includes_debug());
    assert_eq!(OutputMode::default(), OutputMode::Images);
    assert_eq!(OutputMode::JsonOnly.to_string(), "json_only");
}

// ── TimeBounds ───────────────────────────────────────────────────

#[test]
fn bounds_checks() {
    let bounds = TimeBounds::new(Some(2.0), Some(5.0));
    assert!(bounds.is_before_start(1.9));
    assert!(!bounds.is_before_start(2.0));
    assert!(!bounds.is_past_end(5.0));
    assert!(bounds.is_past_end(5.1));

    let open = TimeBounds::default();
    assert!(!open.is_before_start(-1.0));
    assert!(!open.is_past_end(f64::MAX));
}

#[test]
fn bounds_validation() {
    assert!(TimeBounds::new(Some(1.0), Some(1.0)).validate().is_ok());
    assert!(TimeBounds::new(Some(3.0), Some(1.0)).validate().is_err());
    assert!(TimeBounds::new(Some(-1.0), None).validate().is_err());
    assert!(TimeBounds::new(None, Some(f64::NAN)).validate().is_err());
}

// ── DetectionConfig ──────────────────────────────────────────────

#[test]
fn config_defaults() {
    let config = DetectionConfig::new();
    let debug = format!("{config:?}");
    assert!(debug.contains("DetectionConfig"));
    assert!(debug.contains("has_cancellation: false"));
    assert!(debug.contains("batch_size: 1"));
    assert_eq!(config.output_mode(), OutputMode::Images);
    assert!(!config.debug_enabled());
}

#[test]
fn config_with_batch_size_clamps_zero() {
    let config = DetectionConfig::new().with_batch_size(0);
    assert!(format!("{config:?}").contains("batch_size: 1"));
}

#[test]
fn config_with_cancellation() {
    let config = DetectionConfig::new().with_cancellation(CancellationToken::new());
    assert!(format!("{config:?}").contains("has_cancellation: true"));
}

#[test]
fn config_builds_policy() {
    let params = DetectionConfig::new()
        .with_sensitivity(Sensitivity::High)
        .with_content_type(ContentType::Action)
        .with_min_scene_duration(2.0)
        .with_min_time_constraint(0.5)
        .with_max_time_constraint(12.0)
        .with_look_ahead_time(0.5)
        .policy_parameters()
        .unwrap();

    assert!((params.threshold - 4.0).abs() < 1e-9);
    assert!((params.min_scene_length - 1.0).abs() < 1e-9);
    assert_eq!(params.min_time_constraint, Some(0.5));
    assert_eq!(params.max_time_constraint, Some(12.0));
    assert_eq!(params.look_ahead_time, 0.5);
}

#[test]
fn json_debug_enables_debug_fields() {
    let config = DetectionConfig::new().with_output_mode(OutputMode::JsonDebug);
    assert!(config.debug_enabled());
    assert!(DetectionConfig::new().with_debug(true).debug_enabled());
}

#[test]
fn invalid_bounds_fail_before_any_frame() {
    let config = DetectionConfig::new().with_time_bounds(Some(10.0), Some(5.0));
    let error = KeyframeDetector::new(&config, 25.0).unwrap_err();
    assert!(error.is_configuration_error());
}

#[test]
fn invalid_frame_rate_fails() {
    let result = KeyframeDetector::new(&DetectionConfig::new(), 0.0);
    assert!(matches!(result, Err(KeyframeError::InvalidConfig(_))));
}

#[test]
fn huge_look_ahead_fails_before_any_frame() {
    let config = DetectionConfig::new().with_look_ahead_time(1.0e20);
    assert!(config.policy_parameters().is_ok());
    assert!(matches!(
        KeyframeDetector::new(&config, 30.0),
        Err(KeyframeError::InvalidConfig(_))
    ));
}

#[test]
fn invalid_look_ahead_fails() {
    let config = DetectionConfig::new().with_look_ahead_time(-1.0);
    assert!(matches!(
        config.policy_parameters(),
        Err(KeyframeError::InvalidConfig(_))
    ));
}
