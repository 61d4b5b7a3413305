//! Offline peak-baseline strategy tests.

use keyframe_detector::peak::{baseline, normalized_threshold, peak_indexes};
use keyframe_detector::{KeyframeReason, MagnitudeSample, PeakBaselineOptions};

// ── Peak picking ─────────────────────────────────────────────────

#[test]
fn peaks_above_normalized_threshold() {
    let values = [0.0, 1.0, 0.0, 3.0, 0.0];
    assert_eq!(peak_indexes(&values, 0.3, 1), [1, 3]);
    assert_eq!(peak_indexes(&values, 0.5, 1), [3]);
}

#[test]
fn plateau_peak_is_its_center() {
    let values = [0.0, 2.0, 2.0, 2.0, 0.0];
    assert_eq!(peak_indexes(&values, 0.3, 1), [2]);
}

#[test]
fn edges_are_never_peaks() {
    let values = [5.0, 1.0, 0.0, 1.0, 5.0];
    assert!(peak_indexes(&values, 0.1, 1).is_empty());
}

#[test]
fn flat_or_short_signals_have_no_peaks() {
    assert!(peak_indexes(&[4.0; 10], 0.3, 1).is_empty());
    assert!(peak_indexes(&[4.0], 0.3, 1).is_empty());
    assert!(peak_indexes(&[], 0.3, 1).is_empty());
}

#[test]
fn close_peaks_keep_the_highest() {
    let values = [0.0, 5.0, 0.0, 3.0, 0.0, 0.0, 0.0];
    assert_eq!(peak_indexes(&values, 0.3, 1), [1, 3]);
    assert_eq!(peak_indexes(&values, 0.3, 3), [1]);
}

#[test]
fn normalized_threshold_spans_range() {
    assert_eq!(normalized_threshold(&[2.0, 12.0], 0.5), 7.0);
    assert_eq!(normalized_threshold(&[], 0.5), 0.0);
}

// ── Baseline ─────────────────────────────────────────────────────

#[test]
fn baseline_follows_a_linear_trend() {
    let values: Vec<f64> = (0..20).map(|i| 3.0 + 0.5 * i as f64).collect();
    let base = baseline(&values, 2);
    for (value, fit) in values.iter().zip(&base) {
        assert!((value - fit).abs() < 1e-6, "{value} vs {fit}");
    }
}

#[test]
fn baseline_stays_under_spikes() {
    let mut values = vec![1.0; 21];
    values[10] = 20.0;
    let base = baseline(&values, 2);
    assert_eq!(base.len(), values.len());
    assert!(base[10] < 5.0);
}

#[test]
fn baseline_of_short_signal_is_the_signal() {
    assert_eq!(baseline(&[1.0, 4.0], 2), [1.0, 4.0]);
}

// ── Selection ────────────────────────────────────────────────────

fn samples(magnitudes: &[f64]) -> Vec<MagnitudeSample> {
    magnitudes
        .iter()
        .enumerate()
        .map(|(offset, &magnitude)| {
            let index = offset as u64 + 1;
            MagnitudeSample::new(index as f64, index, magnitude)
        })
        .collect()
}

fn spiky_signal() -> Vec<f64> {
    let mut magnitudes = vec![1.0; 21];
    magnitudes[6] = 30.0;
    magnitudes[14] = 30.0;
    magnitudes
}

#[test]
fn select_reports_spikes_in_order() {
    let events = PeakBaselineOptions::new().select(&samples(&spiky_signal()), 0.0, false);

    let frames: Vec<u64> = events.iter().map(|event| event.frame_index).collect();
    assert_eq!(frames, [7, 15]);
    assert!(events.iter().all(|event| event.reason == KeyframeReason::BaselinePeak));
    assert!(events.iter().all(|event| event.debug.is_none()));
}

#[test]
fn select_skips_peaks_before_the_first_keyframe() {
    let events = PeakBaselineOptions::new().select(&samples(&spiky_signal()), 10.0, false);
    let frames: Vec<u64> = events.iter().map(|event| event.frame_index).collect();
    assert_eq!(frames, [15]);
}

#[test]
fn select_debug_fields() {
    let events = PeakBaselineOptions::new().select(&samples(&spiky_signal()), 0.0, true);
    let first = events[0].debug.expect("debug fields");
    assert_eq!(first.magnitude, 30.0);
    assert_eq!(first.time_since_last_keyframe, 7.0);
    assert!(first.adjusted_threshold < 30.0);

    let second = events[1].debug.expect("debug fields");
    assert_eq!(second.time_since_last_keyframe, 8.0);
}

#[test]
fn options_builder() {
    let options = PeakBaselineOptions::new()
        .threshold(0.45)
        .baseline_degree(3)
        .min_distance(0);
    assert_eq!(options.threshold, 0.45);
    assert_eq!(options.baseline_degree, 3);
    assert_eq!(options.min_distance, 1);
}
