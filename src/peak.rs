//! Offline peak-baseline keyframe selection.
//!
//! This strategy works on the whole difference signal of a run at once. A
//! low-order polynomial baseline is fitted underneath the signal and
//! subtracted, then peaks of the corrected signal above a normalized
//! threshold become keyframes. Only magnitudes are kept in memory, never
//! frames.

use crate::error::KeyframeError;
use crate::event::{KeyframeDebug, KeyframeEvent, KeyframeReason};
use crate::window::MagnitudeSample;

const BASELINE_MAX_ITERATIONS: usize = 100;
const BASELINE_TOLERANCE: f64 = 1e-3;

/// Settings for [`DecisionStrategy::PeakBaseline`](crate::DecisionStrategy).
#[derive(Debug, Clone, PartialEq)]
pub struct PeakBaselineOptions {
    /// Peak threshold as a fraction of the corrected signal's range
    /// (0.0 – 1.0). Default: 0.3.
    pub threshold: f64,
    /// Degree of the baseline polynomial. Default: 2.
    pub baseline_degree: usize,
    /// Minimum distance between peaks in samples; closer peaks keep only
    /// the highest. Default: 1 (no suppression).
    pub min_distance: usize,
}

impl Default for PeakBaselineOptions {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            baseline_degree: 2,
            min_distance: 1,
        }
    }
}

impl PeakBaselineOptions {
    /// Options with the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalized peak height threshold in `[0, 1]`.
    #[must_use]
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Degree of the polynomial baseline.
    #[must_use]
    pub fn baseline_degree(mut self, degree: usize) -> Self {
        self.baseline_degree = degree;
        self
    }

    /// Minimum samples between peaks (at least 1).
    #[must_use]
    pub fn min_distance(mut self, samples: usize) -> Self {
        self.min_distance = samples.max(1);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), KeyframeError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(KeyframeError::InvalidConfig(format!(
                "peak threshold must be within 0.0..=1.0, got {}",
                self.threshold
            )));
        }
        Ok(())
    }

    /// Pick keyframes from a run's samples.
    ///
    /// Returns one [`KeyframeReason::BaselinePeak`] event per peak, in time
    /// order, skipping peaks at or before `after_time` (the first-frame
    /// keyframe's time).
    pub fn select(&self, samples: &[MagnitudeSample], after_time: f64, debug: bool) -> Vec<KeyframeEvent> {
        let values: Vec<f64> = samples.iter().map(|sample| sample.magnitude).collect();
        let base = baseline(&values, self.baseline_degree);
        let corrected: Vec<f64> = values.iter().zip(&base).map(|(v, b)| v - b).collect();
        let absolute_threshold = normalized_threshold(&corrected, self.threshold);

        let mut events = Vec::new();
        let mut last_time = after_time;
        for index in peak_indexes(&corrected, self.threshold, self.min_distance) {
            let sample = samples[index];
            if sample.time <= last_time {
                continue;
            }
            let mut event = KeyframeEvent::new(sample.time, sample.frame_index, KeyframeReason::BaselinePeak);
            if debug {
                event = event.with_debug(KeyframeDebug {
                    magnitude: sample.magnitude,
                    adjusted_threshold: absolute_threshold + base[index],
                    time_since_last_keyframe: sample.time - last_time,
                });
            }
            last_time = sample.time;
            events.push(event);
        }

        log::debug!(
            "Baseline peak selection: {} samples, {} peaks (threshold {:.3} above baseline)",
            samples.len(),
            events.len(),
            absolute_threshold,
        );

        events
    }
}

/// Fit a polynomial baseline under `values`.
///
/// Iteratively fits a least-squares polynomial of `degree` and clips the
/// working signal to the fit, so peaks stop pulling the baseline up. Stops
/// when the relative coefficient change drops below `1e-3` or after 100
/// iterations.
pub fn baseline(values: &[f64], degree: usize) -> Vec<f64> {
    let order = degree + 1;
    let n = values.len();
    if n < order {
        return values.to_vec();
    }

    let xs: Vec<f64> = if n > 1 {
        (0..n).map(|i| i as f64 / (n - 1) as f64).collect()
    } else {
        vec![0.0]
    };

    let mut working = values.to_vec();
    let mut coefficients = vec![1.0; order];
    let mut base = values.to_vec();

    for _ in 0..BASELINE_MAX_ITERATIONS {
        let Some(fitted) = least_squares_fit(&xs, &working, order) else {
            break;
        };

        let delta = euclidean_norm(fitted.iter().zip(&coefficients).map(|(a, b)| a - b));
        let scale = euclidean_norm(coefficients.iter().copied());
        let change = if scale > 0.0 { delta / scale } else { delta };
        if change < BASELINE_TOLERANCE {
            break;
        }

        coefficients = fitted;
        base = xs.iter().map(|&x| evaluate(&coefficients, x)).collect();
        for (value, &fit) in working.iter_mut().zip(&base) {
            *value = value.min(fit);
        }
    }

    base
}

/// `threshold * (max - min) + min` over `values`.
pub fn normalized_threshold(values: &[f64], threshold: f64) -> f64 {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if values.is_empty() {
        return 0.0;
    }
    threshold * (max - min) + min
}

/// Indices of local peaks of `values` above a normalized `threshold`.
///
/// A peak is where the first difference turns from rising to falling.
/// Flat runs are split at their midpoint so a plateau yields a single peak
/// at its center. Peaks closer than `min_distance` samples keep only the
/// highest.
pub fn peak_indexes(values: &[f64], threshold: f64, min_distance: usize) -> Vec<usize> {
    let n = values.len();
    if n < 2 {
        return Vec::new();
    }

    let cutoff = normalized_threshold(values, threshold);
    let mut dy: Vec<f64> = values.windows(2).map(|pair| pair[1] - pair[0]).collect();

    let zeros: Vec<usize> = (0..dy.len()).filter(|&i| dy[i] == 0.0).collect();
    if zeros.len() == dy.len() {
        return Vec::new();
    }
    fill_plateaus(&mut dy, &zeros);

    let mut peaks: Vec<usize> = (0..n)
        .filter(|&i| {
            let falling = dy.get(i).copied().unwrap_or(0.0) < 0.0;
            let rising = i > 0 && dy[i - 1] > 0.0;
            falling && rising && values[i] > cutoff
        })
        .collect();

    if peaks.len() > 1 && min_distance > 1 {
        peaks = suppress_close_peaks(values, &peaks, min_distance);
    }

    peaks
}

/// Give zero-slope runs the slope of their neighbours: the left half takes
/// the slope before the run and the right half the slope after it. Runs
/// touching either end take the slope of their only neighbour.
fn fill_plateaus(dy: &mut [f64], zeros: &[usize]) {
    let mut plateaus: Vec<Vec<usize>> = Vec::new();
    for &index in zeros {
        match plateaus.last_mut() {
            Some(run) if run.last().is_some_and(|&last| last + 1 == index) => run.push(index),
            _ => plateaus.push(vec![index]),
        }
    }

    let last_index = dy.len() - 1;
    if let Some(first) = plateaus.first()
        && first[0] == 0
    {
        let fill = dy[first[first.len() - 1] + 1];
        for &index in first {
            dy[index] = fill;
        }
        plateaus.remove(0);
    }
    if let Some(last) = plateaus.last()
        && last[last.len() - 1] == last_index
    {
        let fill = dy[last[0] - 1];
        for &index in last {
            dy[index] = fill;
        }
        plateaus.pop();
    }

    for run in &plateaus {
        let before = dy[run[0] - 1];
        let after = dy[run[run.len() - 1] + 1];
        let median = median_index(run);
        for &index in run {
            dy[index] = if (index as f64) < median { before } else { after };
        }
    }
}

fn median_index(run: &[usize]) -> f64 {
    let len = run.len();
    if len % 2 == 1 {
        run[len / 2] as f64
    } else {
        (run[len / 2 - 1] + run[len / 2]) as f64 / 2.0
    }
}

fn suppress_close_peaks(values: &[f64], peaks: &[usize], min_distance: usize) -> Vec<usize> {
    let mut by_height = peaks.to_vec();
    by_height.sort_by(|&a, &b| values[b].total_cmp(&values[a]).then(a.cmp(&b)));

    let mut removed = vec![true; values.len()];
    for &peak in peaks {
        removed[peak] = false;
    }
    for &peak in &by_height {
        if removed[peak] {
            continue;
        }
        let start = peak.saturating_sub(min_distance);
        let end = (peak + min_distance + 1).min(values.len());
        for flag in &mut removed[start..end] {
            *flag = true;
        }
        removed[peak] = false;
    }

    (0..values.len()).filter(|&i| !removed[i]).collect()
}

/// Least-squares polynomial coefficients (ascending powers) via the normal
/// equations. `None` if the system is singular.
fn least_squares_fit(xs: &[f64], ys: &[f64], order: usize) -> Option<Vec<f64>> {
    let mut matrix = vec![vec![0.0; order + 1]; order];
    for (&x, &y) in xs.iter().zip(ys) {
        let powers: Vec<f64> = (0..order).map(|p| x.powi(p as i32)).collect();
        for row in 0..order {
            for column in 0..order {
                matrix[row][column] += powers[row] * powers[column];
            }
            matrix[row][order] += powers[row] * y;
        }
    }
    solve(matrix)
}

/// Gaussian elimination with partial pivoting on an augmented matrix.
fn solve(mut matrix: Vec<Vec<f64>>) -> Option<Vec<f64>> {
    let size = matrix.len();
    for column in 0..size {
        let pivot = (column..size).max_by(|&a, &b| {
            matrix[a][column].abs().total_cmp(&matrix[b][column].abs())
        })?;
        if matrix[pivot][column].abs() < 1e-12 {
            return None;
        }
        matrix.swap(column, pivot);

        for row in column + 1..size {
            let factor = matrix[row][column] / matrix[column][column];
            for k in column..=size {
                matrix[row][k] -= factor * matrix[column][k];
            }
        }
    }

    let mut solution = vec![0.0; size];
    for row in (0..size).rev() {
        let tail: f64 = (row + 1..size).map(|k| matrix[row][k] * solution[k]).sum();
        solution[row] = (matrix[row][size] - tail) / matrix[row][row];
    }
    Some(solution)
}

fn evaluate(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

fn euclidean_norm(values: impl Iterator<Item = f64>) -> f64 {
    values.map(|v| v * v).sum::<f64>().sqrt()
}
