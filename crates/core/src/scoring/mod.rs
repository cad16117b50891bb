use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ScoringConfig;

/// Feedback text recorded for a hit that matched no event.
pub const OFF_WINDOW_FEEDBACK: &str = "off window";

/// Cosmetic timing grade. Has no influence on the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    Perfect,
    Good,
    Adjust,
}

impl Grade {
    pub fn from_accuracy(accuracy_ms: f64, config: &ScoringConfig) -> Self {
        if accuracy_ms <= config.perfect_ms {
            Grade::Perfect
        } else if accuracy_ms <= config.good_ms {
            Grade::Good
        } else {
            Grade::Adjust
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Grade::Perfect => "Perfect",
            Grade::Good => "Good",
            Grade::Adjust => "Adjust",
        })
    }
}

/// Timing quality in `[0, 1]`: 1 at the window centre, 0 at or past its edge.
pub fn quality(delta: f64, window_ms: u32) -> f64 {
    let accuracy_ms = delta.abs() * 1000.0;
    if window_ms == 0 {
        return if accuracy_ms == 0.0 { 1.0 } else { 0.0 };
    }
    (1.0 - accuracy_ms / f64::from(window_ms)).max(0.0)
}

/// Points awarded for a matched hit.
///
/// Any in-window hit earns at least a quarter of `base_points`, scaling to the
/// full amount at perfect timing. `combo_before` is the combo before this hit
/// is counted and adds `streak_unit` per step.
pub fn score_for_delta(delta: f64, window_ms: u32, combo_before: u32, config: &ScoringConfig) -> u32 {
    let quality = quality(delta, window_ms);
    let bonus = (f64::from(config.base_points) * (0.25 + 0.75 * quality)).round() as u32;
    let streak = combo_before.saturating_mul(config.streak_unit);
    bonus.saturating_add(streak)
}

/// Human-readable feedback such as `Good: 2: beat 3 (41 ms late)`.
pub fn feedback_label(label: &str, delta: f64, config: &ScoringConfig) -> String {
    let accuracy_ms = delta.abs() * 1000.0;
    let direction = if delta < 0.0 { "early" } else { "late" };
    let grade = Grade::from_accuracy(accuracy_ms, config);
    format!("{grade}: {label} ({accuracy_ms:.0} ms {direction})")
}
