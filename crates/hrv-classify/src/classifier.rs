//! Threshold-based stress classifier
//!
//! Stressed is checked before Fatigued, so a window satisfying both rules
//! classifies as Stressed.

use hrv_core::{mean_metric, ClassificationState, TelemetryRecord};

use crate::Thresholds;

/// Sample mean above this is always stressed
pub const STRESS_CEILING: f64 = 107.0;

/// Sample mean below this is always fatigued
pub const FATIGUE_FLOOR: f64 = 16.0;

/// Sample mean above `baseline * STRESS_RATIO` is stressed
pub const STRESS_RATIO: f64 = 1.15;

/// Sample mean below `baseline * FATIGUE_RATIO` is fatigued
pub const FATIGUE_RATIO: f64 = 0.85;

/// Classify a sample window against a baseline window.
///
/// Returns `None` if either window is empty; the caller keeps its previous
/// state in that case.
pub fn classify(
    sample: &[TelemetryRecord],
    baseline: &[TelemetryRecord],
    thresholds: &Thresholds,
) -> Option<ClassificationState> {
    let sample_mean = mean_metric(sample)?;
    let baseline_mean = mean_metric(baseline)?;
    Some(classify_means(sample_mean, baseline_mean, thresholds))
}

/// Classify from precomputed window means
pub fn classify_means(
    sample_mean: f64,
    baseline_mean: f64,
    thresholds: &Thresholds,
) -> ClassificationState {
    if is_stressed(sample_mean, baseline_mean, thresholds) {
        ClassificationState::Stressed
    } else if is_fatigued(sample_mean, baseline_mean, thresholds) {
        ClassificationState::Fatigued
    } else {
        ClassificationState::Normal
    }
}

pub fn is_stressed(value: f64, baseline_mean: f64, thresholds: &Thresholds) -> bool {
    value > STRESS_CEILING || value > STRESS_RATIO * baseline_mean || value > thresholds.upper
}

pub fn is_fatigued(value: f64, baseline_mean: f64, thresholds: &Thresholds) -> bool {
    value < FATIGUE_FLOOR || value < FATIGUE_RATIO * baseline_mean || value < thresholds.lower
}
