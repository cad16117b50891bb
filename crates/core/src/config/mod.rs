use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Result, RhythmError};

/// Top-level configuration structure for the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scoring: ScoringConfig,
    pub world: WorldConfig,
}

impl EngineConfig {
    /// Parses a JSON document. Missing sections fall back to their defaults.
    pub fn from_json_str(input: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        self.scoring.validate()?;
        self.world.validate()
    }
}

/// Reward constants and the cosmetic grade thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub base_points: u32,
    pub streak_unit: u32,
    pub perfect_ms: f64,
    pub good_ms: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_points: 120,
            streak_unit: 4,
            perfect_ms: 25.0,
            good_ms: 60.0,
        }
    }
}

impl ScoringConfig {
    fn validate(&self) -> Result<()> {
        if !(self.perfect_ms >= 0.0 && self.good_ms >= self.perfect_ms) {
            return Err(RhythmError::InvalidConfig(format!(
                "grade thresholds must satisfy 0 <= perfect_ms ({}) <= good_ms ({})",
                self.perfect_ms, self.good_ms
            )));
        }
        Ok(())
    }
}

/// Geometry and physics of the runner world, in screen units.
///
/// Gravity and jump impulse are expressed per frame at `reference_fps`, so a
/// tick of `1 / reference_fps` seconds advances the player by exactly one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub width: f64,
    pub height: f64,
    pub ground_ratio: f64,
    pub player_x: f64,
    pub player_width: f64,
    pub player_height: f64,
    pub obstacle_width: f64,
    pub obstacle_height: f64,
    pub spawn_margin: f64,
    pub cull_margin: f64,
    pub gravity: f64,
    pub jump_impulse: f64,
    pub reference_fps: f64,
    pub collisions: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 1024.0,
            height: 360.0,
            ground_ratio: 0.78,
            player_x: 80.0,
            player_width: 40.0,
            player_height: 40.0,
            obstacle_width: 34.0,
            obstacle_height: 52.0,
            spawn_margin: 80.0,
            cull_margin: 60.0,
            gravity: 0.78,
            jump_impulse: 14.0,
            reference_fps: 60.0,
            collisions: true,
        }
    }
}

impl WorldConfig {
    pub fn ground_y(&self) -> f64 {
        (self.height * self.ground_ratio).trunc()
    }

    /// Horizontal position at which obstacles enter the world.
    pub fn spawn_x(&self) -> f64 {
        self.width + self.spawn_margin
    }

    /// The interaction point: the front edge of the player.
    pub fn hit_line_x(&self) -> f64 {
        self.player_x + self.player_width
    }

    /// Distance an obstacle covers between spawning and reaching the hit line.
    pub fn travel_distance(&self) -> f64 {
        self.spawn_x() - self.hit_line_x()
    }

    fn validate(&self) -> Result<()> {
        let positive = [
            ("width", self.width),
            ("height", self.height),
            ("player_width", self.player_width),
            ("player_height", self.player_height),
            ("obstacle_width", self.obstacle_width),
            ("obstacle_height", self.obstacle_height),
            ("reference_fps", self.reference_fps),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(RhythmError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.ground_ratio) {
            return Err(RhythmError::InvalidConfig(format!(
                "ground_ratio must lie in [0, 1], got {}",
                self.ground_ratio
            )));
        }
        if self.travel_distance() <= 0.0 {
            return Err(RhythmError::InvalidConfig(
                "spawn position must lie ahead of the player".to_string(),
            ));
        }
        Ok(())
    }
}
