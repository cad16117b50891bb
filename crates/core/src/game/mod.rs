//! Run state machine: spawns obstacles, consumes hits, detects misses and
//! collisions, and keeps score for a single attempt at a level.

use serde::{Deserialize, Serialize};

use crate::{
    scoring::{self, OFF_WINDOW_FEEDBACK},
    snapshot::{EventStatus, Feedback, ObstacleView, RunSnapshot},
    world::{Obstacle, Player},
    EngineConfig, HitSource, Result, RhythmLevel, RhythmTimeline,
};

/// Fail reason recorded when the player runs into an unresolved obstacle.
pub const COLLISION_REASON: &str = "collision";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    Failed,
    Completed,
}

/// End-of-run statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub state: RunState,
    pub score: u32,
    pub max_combo: u32,
    /// Events resolved by a hit.
    pub hits: usize,
    /// Hits that landed outside the current event's window.
    pub stray_hits: u32,
    pub misses: usize,
    pub mean_accuracy_ms: Option<f64>,
    pub completion_ratio: f64,
}

/// One attempt at a level, advanced by the caller once per tick.
///
/// Time is always supplied by the caller as seconds since run start, so a
/// run is fully determined by its `(now, hits)` trace.
#[derive(Debug)]
pub struct RhythmRun {
    level: RhythmLevel,
    config: EngineConfig,
    timeline: RhythmTimeline,
    player: Player,
    obstacles: Vec<Obstacle>,
    next_spawn_index: usize,
    state: RunState,
    score: u32,
    combo: u32,
    max_combo: u32,
    stray_hits: u32,
    fail_reason: Option<String>,
    last_feedback: Option<Feedback>,
}

impl RhythmRun {
    pub fn new(level: RhythmLevel, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let mut timeline = RhythmTimeline::new(&level)?;
        timeline.assign_spawn_times(config.world.travel_distance(), level.base_speed);
        let player = Player::new(&config.world);

        tracing::debug!(
            level = %level.slug,
            events = timeline.len(),
            duration = timeline.total_duration(),
            "starting run"
        );

        Ok(Self {
            level,
            config,
            timeline,
            player,
            obstacles: Vec::new(),
            next_spawn_index: 0,
            state: RunState::Running,
            score: 0,
            combo: 0,
            max_combo: 0,
            stray_hits: 0,
            fail_reason: None,
            last_feedback: None,
        })
    }

    /// Starts the level over. Nothing carries across attempts.
    pub fn retry(&mut self) {
        self.timeline.reset();
        self.player.reset();
        self.obstacles.clear();
        self.next_spawn_index = 0;
        self.state = RunState::Running;
        self.score = 0;
        self.combo = 0;
        self.max_combo = 0;
        self.stray_hits = 0;
        self.fail_reason = None;
        self.last_feedback = None;
        tracing::debug!(level = %self.level.slug, "retrying run");
    }

    /// Advances the run to `now`, with `dt` seconds since the previous tick.
    ///
    /// Ticks on a finished run change nothing.
    pub fn tick(&mut self, now: f64, dt: f64, hits: &mut dyn HitSource) -> RunState {
        if self.state != RunState::Running {
            return self.state;
        }

        hits.begin_tick(now);
        self.spawn_obstacles(now);
        self.process_hits(now, hits);
        self.detect_miss(now);
        if self.state != RunState::Running {
            return self.state;
        }

        self.advance_world(now, dt);
        if self.state == RunState::Running
            && self.timeline.is_complete()
            && self.obstacles.is_empty()
        {
            self.state = RunState::Completed;
            tracing::info!(level = %self.level.slug, score = self.score, "level completed");
        }
        self.state
    }

    fn spawn_obstacles(&mut self, now: f64) {
        while let Some(event) = self.timeline.event(self.next_spawn_index) {
            if event.spawn_time > now {
                break;
            }
            tracing::debug!(label = %event.label, now, "spawning obstacle");
            self.obstacles.push(Obstacle::spawn(
                self.next_spawn_index,
                event.spawn_time,
                &self.config.world,
            ));
            self.next_spawn_index += 1;
        }
    }

    fn process_hits(&mut self, now: f64, hits: &mut dyn HitSource) {
        while self.state == RunState::Running && hits.consume_hit() {
            let Some(matched) = self.timeline.register_hit(now) else {
                self.combo = 0;
                self.stray_hits += 1;
                self.last_feedback = Some(Feedback {
                    text: OFF_WINDOW_FEEDBACK.to_string(),
                    at: now,
                });
                continue;
            };

            let event = &self.timeline.events()[matched.index];
            let gained = scoring::score_for_delta(
                matched.delta,
                event.window_ms,
                self.combo,
                &self.config.scoring,
            );
            let text = scoring::feedback_label(&event.label, matched.delta, &self.config.scoring);
            tracing::debug!(label = %event.label, delta = matched.delta, gained, "hit matched");

            self.player.jump();
            self.combo += 1;
            self.max_combo = self.max_combo.max(self.combo);
            self.score = self.score.saturating_add(gained);
            self.last_feedback = Some(Feedback { text, at: now });
        }
    }

    fn detect_miss(&mut self, now: f64) {
        let missed = self.timeline.next_timeout(now).map(|event| event.label.clone());
        if let Some(label) = missed {
            self.combo = 0;
            self.fail(format!("no hit for {label}"));
        }
    }

    fn advance_world(&mut self, now: f64, dt: f64) {
        self.player.update(dt);
        for obstacle in &mut self.obstacles {
            obstacle.advance_to(now, self.level.base_speed);
        }
        let cull_margin = self.config.world.cull_margin;
        self.obstacles.retain(|obstacle| !obstacle.is_gone(cull_margin));

        if !self.config.world.collisions {
            return;
        }
        let player = self.player.rect();
        let collided = self.obstacles.iter().any(|obstacle| {
            let resolved = self
                .timeline
                .event(obstacle.event_index)
                .is_some_and(|event| event.resolved);
            !resolved && player.intersects(&obstacle.rect())
        });
        if collided {
            self.combo = 0;
            self.fail(COLLISION_REASON.to_string());
        }
    }

    fn fail(&mut self, reason: String) {
        tracing::info!(level = %self.level.slug, %reason, score = self.score, "run failed");
        self.state = RunState::Failed;
        self.fail_reason = Some(reason);
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn max_combo(&self) -> u32 {
        self.max_combo
    }

    pub fn fail_reason(&self) -> Option<&str> {
        self.fail_reason.as_deref()
    }

    pub fn last_feedback(&self) -> Option<&Feedback> {
        self.last_feedback.as_ref()
    }

    pub fn level(&self) -> &RhythmLevel {
        &self.level
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn timeline(&self) -> &RhythmTimeline {
        &self.timeline
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn summary(&self) -> RunSummary {
        let accuracies: Vec<f64> = self
            .timeline
            .events()
            .iter()
            .filter_map(|event| event.accuracy_ms)
            .collect();
        let mean_accuracy_ms = if accuracies.is_empty() {
            None
        } else {
            Some(accuracies.iter().sum::<f64>() / accuracies.len() as f64)
        };

        RunSummary {
            state: self.state,
            score: self.score,
            max_combo: self.max_combo,
            hits: self.timeline.resolved_count(),
            stray_hits: self.stray_hits,
            misses: self.timeline.missed_count(),
            mean_accuracy_ms,
            completion_ratio: self.timeline.completion_ratio(),
        }
    }

    pub fn snapshot(&self) -> RunSnapshot {
        let obstacles = self
            .obstacles
            .iter()
            .filter_map(|obstacle| {
                let event = self.timeline.event(obstacle.event_index)?;
                Some(ObstacleView {
                    rect: obstacle.rect(),
                    label: event.label.clone(),
                    status: EventStatus::from(event),
                })
            })
            .collect();

        RunSnapshot {
            state: self.state,
            score: self.score,
            combo: self.combo,
            fail_reason: self.fail_reason.clone(),
            player: self.player.rect(),
            obstacles,
            last_feedback: self.last_feedback.clone(),
            completion_ratio: self.timeline.completion_ratio(),
        }
    }
}
