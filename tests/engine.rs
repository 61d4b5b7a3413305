//! Decision engine integration tests.

use keyframe_detector::{
    EngineState, GrayFrame, KeyframeDecisionEngine, KeyframeError, KeyframeEvent, KeyframeReason,
    PolicyParameters, TimeBounds,
};

fn params(threshold: f64, look_ahead_time: f64) -> PolicyParameters {
    PolicyParameters {
        threshold,
        min_scene_length: 1.0,
        max_motion_factor: 1.0,
        content_weight: 1.0,
        min_time_constraint: None,
        max_time_constraint: None,
        look_ahead_time,
    }
}

/// One frame per second whose consecutive differences are `magnitudes`.
/// The first frame has no magnitude of its own.
fn frames_from_magnitudes(magnitudes: &[u8]) -> Vec<GrayFrame> {
    let mut value: u8 = 0;
    let mut frames = vec![GrayFrame::filled(4, 4, value, 0.0, 0)];
    for (offset, &magnitude) in magnitudes.iter().enumerate() {
        value = match value.checked_add(magnitude) {
            Some(next) => next,
            None => value - magnitude,
        };
        let index = offset as u64 + 1;
        frames.push(GrayFrame::filled(4, 4, value, index as f64, index));
    }
    frames
}

fn run(engine: &mut KeyframeDecisionEngine, frames: Vec<GrayFrame>) -> Vec<KeyframeEvent> {
    for frame in frames {
        engine.process(frame).unwrap();
    }
    engine.events().to_vec()
}

fn times(events: &[KeyframeEvent]) -> Vec<f64> {
    events.iter().map(|event| event.time).collect()
}

// ── First frame ──────────────────────────────────────────────────

#[test]
fn first_frame_is_always_a_keyframe() {
    let mut engine = KeyframeDecisionEngine::new(params(10.0, 1.0), 25.0).unwrap();
    assert_eq!(engine.state(), EngineState::AwaitingFirstFrame);

    let decision = engine
        .process(GrayFrame::filled(8, 8, 3, 12.5, 300))
        .unwrap()
        .expect("first frame decision");

    assert_eq!(decision.event.time, 0.0);
    assert_eq!(decision.event.frame_index, 0);
    assert_eq!(decision.event.reason, KeyframeReason::FirstFrame);
    assert!(decision.frame.is_none());
    assert_eq!(engine.state(), EngineState::Streaming);
}

#[test]
fn first_frame_debug_fields() {
    let mut engine = KeyframeDecisionEngine::new(params(7.0, 1.0), 10.0)
        .unwrap()
        .with_debug(true);
    let decision = engine.process(GrayFrame::filled(2, 2, 0, 0.0, 0)).unwrap().unwrap();
    let debug = decision.event.debug.expect("debug fields");
    assert_eq!(debug.magnitude, 0.0);
    assert_eq!(debug.adjusted_threshold, 7.0);
    assert_eq!(debug.time_since_last_keyframe, 0.0);
}

// ── Local maxima ─────────────────────────────────────────────────

#[test]
fn isolated_peak_is_flagged_once_it_is_centered() {
    let mut engine = KeyframeDecisionEngine::new(params(5.0, 3.0), 1.0).unwrap();
    let frames = frames_from_magnitudes(&[2, 2, 2, 9, 2, 2, 2, 2]);

    let mut decided_on = Vec::new();
    for frame in frames {
        let index = frame.index;
        if let Some(decision) = engine.process(frame).unwrap() {
            decided_on.push((index, decision.event));
        }
    }

    assert_eq!(decided_on.len(), 2);
    let (arrival, event) = &decided_on[1];
    assert_eq!(*arrival, 5, "peak is confirmed when the next frame arrives");
    assert_eq!(event.reason, KeyframeReason::LocalMaximum);
    assert_eq!(event.time, 4.0);
    assert_eq!(event.frame_index, 4);
}

#[test]
fn peak_below_threshold_is_ignored() {
    let mut engine = KeyframeDecisionEngine::new(params(20.0, 3.0), 1.0).unwrap();
    let events = run(&mut engine, frames_from_magnitudes(&[2, 2, 2, 9, 2, 2, 2, 2]));
    assert_eq!(events.len(), 1);
}

#[test]
fn retained_frame_is_the_peak_frame() {
    let mut engine = KeyframeDecisionEngine::new(params(5.0, 3.0), 1.0)
        .unwrap()
        .retain_frames(true);
    let frames = frames_from_magnitudes(&[2, 2, 2, 9, 2, 2, 2, 2]);
    let expected = frames[4].clone();

    let mut images = Vec::new();
    for frame in frames {
        if let Some(decision) = engine.process(frame).unwrap() {
            images.push(decision.frame.expect("retained pixels"));
        }
    }

    assert_eq!(images.len(), 2);
    assert_eq!(images[0].pixels(), [0u8; 16]);
    assert_eq!(images[1], expected);
}

#[test]
fn debug_fields_describe_the_decision() {
    let mut engine = KeyframeDecisionEngine::new(params(5.0, 3.0), 1.0)
        .unwrap()
        .with_debug(true);
    let events = run(&mut engine, frames_from_magnitudes(&[2, 2, 2, 9, 2, 2, 2, 2]));
    let debug = events[1].debug.expect("debug fields");
    assert_eq!(debug.magnitude, 9.0);
    assert_eq!(debug.adjusted_threshold, 5.0);
    assert_eq!(debug.time_since_last_keyframe, 5.0);
}

// ── Time constraints ─────────────────────────────────────────────

#[test]
fn flat_signal_forces_keyframes_at_max_interval() {
    let base = PolicyParameters {
        max_time_constraint: Some(5.0),
        ..params(10.0, 1.0)
    };
    let mut engine = KeyframeDecisionEngine::new(base, 1.0).unwrap();
    let events = run(&mut engine, frames_from_magnitudes(&[0; 20]));

    assert_eq!(times(&events), [0.0, 5.0, 10.0, 15.0, 20.0]);
    assert!(
        events[1..]
            .iter()
            .all(|event| event.reason == KeyframeReason::MaxTimeConstraint)
    );
}

#[test]
fn gaps_never_exceed_max_constraint() {
    let base = PolicyParameters {
        max_time_constraint: Some(3.0),
        ..params(50.0, 2.0)
    };
    let mut engine = KeyframeDecisionEngine::new(base, 1.0).unwrap();
    let magnitudes: Vec<u8> = (0..40).map(|i| [1, 4, 2, 30, 1][i % 5]).collect();
    let events = run(&mut engine, frames_from_magnitudes(&magnitudes));

    for pair in events.windows(2) {
        assert!(pair[1].time - pair[0].time <= 3.0);
    }
}

#[test]
fn min_constraint_suppresses_early_maxima() {
    let base = PolicyParameters {
        min_time_constraint: Some(3.0),
        ..params(5.0, 1.0)
    };
    let mut engine = KeyframeDecisionEngine::new(base, 1.0).unwrap().with_debug(true);
    let events = run(&mut engine, frames_from_magnitudes(&[50; 10]));

    assert_eq!(times(&events), [0.0, 3.0, 6.0, 9.0]);
    for event in &events[1..] {
        assert_eq!(event.reason, KeyframeReason::LocalMaximum);
        assert!(event.debug.unwrap().time_since_last_keyframe >= 3.0);
    }
}

#[test]
fn event_times_strictly_increase() {
    let base = PolicyParameters {
        max_time_constraint: Some(2.0),
        ..params(3.0, 5.0)
    };
    let mut engine = KeyframeDecisionEngine::new(base, 1.0).unwrap();
    let magnitudes: Vec<u8> = (0..60).map(|i| ((i * 37) % 23) as u8).collect();
    let events = run(&mut engine, frames_from_magnitudes(&magnitudes));

    assert!(events.len() > 2);
    for pair in events.windows(2) {
        assert!(pair[1].time > pair[0].time, "{} then {}", pair[0], pair[1]);
    }
}

#[test]
fn identical_inputs_give_identical_events() {
    let magnitudes: Vec<u8> = (0..80).map(|i| ((i * 13) % 17) as u8).collect();
    let build = || {
        KeyframeDecisionEngine::new(
            PolicyParameters {
                max_time_constraint: Some(6.0),
                ..params(4.0, 2.0)
            },
            1.0,
        )
        .unwrap()
        .with_debug(true)
    };

    let first = run(&mut build(), frames_from_magnitudes(&magnitudes));
    let second = run(&mut build(), frames_from_magnitudes(&magnitudes));
    assert_eq!(first, second);
}

// ── Bounds and lifecycle ─────────────────────────────────────────

#[test]
fn bounds_skip_and_finish() {
    let base = PolicyParameters {
        max_time_constraint: Some(2.0),
        ..params(10.0, 1.0)
    };
    let mut engine = KeyframeDecisionEngine::new(base, 1.0)
        .unwrap()
        .with_bounds(TimeBounds::new(Some(3.0), Some(6.0)));
    let events = run(&mut engine, frames_from_magnitudes(&[0; 10]));

    assert_eq!(times(&events), [0.0, 3.0, 5.0]);
    assert_eq!(engine.state(), EngineState::Finished);
    // Frames after the end bound are ignored once finished.
    assert_eq!(engine.frame_count(), 8);
}

#[test]
fn skipped_frames_do_not_replace_previous_frame() {
    let mut engine = KeyframeDecisionEngine::new(params(10.0, 1.0), 1.0)
        .unwrap()
        .with_debug(true)
        .with_bounds(TimeBounds::new(Some(3.0), None));
    let frames = vec![
        GrayFrame::filled(4, 4, 0, 0.0, 0),
        GrayFrame::filled(4, 4, 100, 1.0, 1),
        GrayFrame::filled(4, 4, 100, 2.0, 2),
        GrayFrame::filled(4, 4, 100, 3.0, 3),
    ];
    let events = run(&mut engine, frames);

    // Frame 3 is compared with frame 0, not with the skipped frame 2.
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].frame_index, 3);
    assert_eq!(events[1].reason, KeyframeReason::LocalMaximum);
    assert_eq!(events[1].debug.unwrap().magnitude, 100.0);
}

#[test]
fn forced_keyframe_blocks_lagging_center() {
    let base = PolicyParameters {
        max_time_constraint: Some(3.0),
        ..params(10.0, 3.0)
    };
    let mut engine = KeyframeDecisionEngine::new(base, 1.0).unwrap();
    // The peak arrives at frame 3, the same frame the max constraint fires.
    // It only becomes the window center at frame 4.
    let events = run(&mut engine, frames_from_magnitudes(&[1, 1, 50, 1, 1]));

    let summary: Vec<(f64, KeyframeReason)> =
        events.iter().map(|event| (event.time, event.reason)).collect();
    assert_eq!(
        summary,
        [
            (0.0, KeyframeReason::FirstFrame),
            (3.0, KeyframeReason::MaxTimeConstraint),
        ]
    );
}

#[test]
fn dimension_change_aborts() {
    let mut engine = KeyframeDecisionEngine::new(params(10.0, 1.0), 1.0).unwrap();
    engine.process(GrayFrame::filled(4, 4, 0, 0.0, 0)).unwrap();
    let error = engine
        .process(GrayFrame::filled(8, 4, 0, 1.0, 1))
        .unwrap_err();

    assert!(matches!(error, KeyframeError::DimensionMismatch { frame_index: 1, .. }));
    assert_eq!(engine.state(), EngineState::Finished);
    assert!(engine.process(GrayFrame::filled(4, 4, 0, 2.0, 2)).unwrap().is_none());
}

#[test]
fn finished_engine_ignores_frames() {
    let mut engine = KeyframeDecisionEngine::new(params(10.0, 1.0), 1.0).unwrap();
    engine.finish();
    assert!(engine.process(GrayFrame::filled(4, 4, 0, 0.0, 0)).unwrap().is_none());
    assert!(engine.events().is_empty());
}

#[test]
fn invalid_frame_rate_is_rejected() {
    let result = KeyframeDecisionEngine::new(params(10.0, 1.0), 0.0);
    assert!(matches!(result, Err(KeyframeError::InvalidConfig(_))));
}
