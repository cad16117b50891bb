//! Declarative description of a rhythm exercise.
//!
//! A [`RhythmLevel`] is authored once and never mutated. Timing is expressed
//! in musical units (beats at a tempo); the [`crate::RhythmTimeline`] turns it
//! into wall-clock events when a run starts.

pub mod catalog;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Result, RhythmError};

pub use catalog::{LevelCatalog, LevelSummary};

const DEFAULT_COUNT_IN_BEATS: f64 = 2.0;
const DEFAULT_LEAD_OUT_BEATS: f64 = 2.0;

/// A position within the pattern. Beat 0 is the first beat after the count-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RhythmPoint {
    pub beat: f64,
    pub label: String,
}

impl RhythmPoint {
    pub fn new(beat: f64, label: impl Into<String>) -> Self {
        Self {
            beat,
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RhythmLevel {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub tempo_bpm: f64,
    pub window_ms: u32,
    /// Obstacle travel speed in world units per second.
    pub base_speed: f64,
    pub pattern_length_beats: f64,
    pub hit_points: Vec<RhythmPoint>,
    #[serde(default = "default_count_in")]
    pub count_in_beats: f64,
    #[serde(default = "default_lead_out")]
    pub lead_out_beats: f64,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

fn default_count_in() -> f64 {
    DEFAULT_COUNT_IN_BEATS
}

fn default_lead_out() -> f64 {
    DEFAULT_LEAD_OUT_BEATS
}

impl RhythmLevel {
    /// Builds a level with the default two-beat count-in and lead-out.
    pub fn new(
        slug: impl Into<String>,
        name: impl Into<String>,
        tempo_bpm: f64,
        window_ms: u32,
        base_speed: f64,
        pattern_length_beats: f64,
        hit_points: impl IntoIterator<Item = (f64, String)>,
    ) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            description: String::new(),
            tempo_bpm,
            window_ms,
            base_speed,
            pattern_length_beats,
            hit_points: hit_points
                .into_iter()
                .map(|(beat, label)| RhythmPoint::new(beat, label))
                .collect(),
            count_in_beats: DEFAULT_COUNT_IN_BEATS,
            lead_out_beats: DEFAULT_LEAD_OUT_BEATS,
            tags: BTreeSet::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_count_in(mut self, beats: f64) -> Self {
        self.count_in_beats = beats;
        self
    }

    pub fn with_lead_out(mut self, beats: f64) -> Self {
        self.lead_out_beats = beats;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.tempo_bpm
    }

    /// Wall-clock time of a pattern beat, measured from run start.
    pub fn beat_to_seconds(&self, beat: f64) -> f64 {
        (self.count_in_beats + beat) * self.seconds_per_beat()
    }

    /// Checks the pattern invariants.
    ///
    /// Beats that go backwards are rejected rather than sorted: matching is
    /// strictly sequential, so an out-of-order point could never be reached.
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: String| Err(RhythmError::invalid_level(&self.slug, reason));

        if self.slug.trim().is_empty() {
            return fail("slug must not be empty".to_string());
        }
        if !(self.tempo_bpm.is_finite() && self.tempo_bpm > 0.0) {
            return fail(format!("tempo must be positive, got {}", self.tempo_bpm));
        }
        if !(self.base_speed.is_finite() && self.base_speed > 0.0) {
            return fail(format!("base speed must be positive, got {}", self.base_speed));
        }
        if !(self.pattern_length_beats.is_finite() && self.pattern_length_beats > 0.0) {
            return fail(format!(
                "pattern length must be positive, got {}",
                self.pattern_length_beats
            ));
        }
        if !(self.count_in_beats.is_finite() && self.count_in_beats >= 0.0) {
            return fail(format!("count-in must be >= 0, got {}", self.count_in_beats));
        }
        if !(self.lead_out_beats.is_finite() && self.lead_out_beats >= 0.0) {
            return fail(format!("lead-out must be >= 0, got {}", self.lead_out_beats));
        }

        let mut previous = f64::NEG_INFINITY;
        for point in &self.hit_points {
            if !(0.0..=self.pattern_length_beats).contains(&point.beat) {
                return fail(format!(
                    "hit point `{}` at beat {} lies outside [0, {}]",
                    point.label, point.beat, self.pattern_length_beats
                ));
            }
            if point.beat < previous {
                return fail(format!(
                    "hit point `{}` at beat {} comes before beat {}",
                    point.label, point.beat, previous
                ));
            }
            previous = point.beat;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse() -> RhythmLevel {
        RhythmLevel::new(
            "pulse",
            "Pulse",
            92.0,
            150,
            320.0,
            4.0,
            [(0.0, "one".to_string()), (2.0, "three".to_string())],
        )
    }

    #[test]
    fn beat_mapping_includes_count_in() {
        let level = pulse();
        assert!((level.beat_to_seconds(0.0) - 120.0 / 92.0).abs() < 1e-12);
        assert!((level.beat_to_seconds(2.0) - 240.0 / 92.0).abs() < 1e-12);
    }

    #[test]
    fn accepts_well_formed_level() {
        assert!(pulse().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_order_beats() {
        let mut level = pulse();
        level.hit_points.reverse();
        let err = level.validate().unwrap_err();
        assert!(format!("{err}").contains("comes before"));
    }

    #[test]
    fn rejects_points_outside_pattern() {
        let mut level = pulse();
        level.hit_points.push(RhythmPoint::new(4.5, "late"));
        assert!(matches!(
            level.validate(),
            Err(RhythmError::InvalidLevel { .. })
        ));
    }

    #[test]
    fn rejects_non_positive_tempo() {
        let mut level = pulse();
        level.tempo_bpm = 0.0;
        assert!(level.validate().is_err());
    }

    #[test]
    fn deserializes_with_optional_fields() {
        let json = r#"{
            "slug": "mini",
            "name": "Mini",
            "tempo_bpm": 100.0,
            "window_ms": 120,
            "base_speed": 300.0,
            "pattern_length_beats": 2.0,
            "hit_points": [{ "beat": 0.0, "label": "a" }]
        }"#;
        let level: RhythmLevel = serde_json::from_str(json).unwrap();
        assert_eq!(level.count_in_beats, 2.0);
        assert_eq!(level.lead_out_beats, 2.0);
        assert!(level.tags.is_empty());
        assert!(level.validate().is_ok());
    }
}
