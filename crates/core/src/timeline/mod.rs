use serde::{Deserialize, Serialize};

use crate::{Result, RhythmError, RhythmLevel};

/// Slack applied to window comparisons so that a hit landing exactly on the
/// window edge still counts despite floating point rounding.
const WINDOW_EPSILON: f64 = 1e-9;

/// Fixed-rate clock for replaying a run, in seconds since run start.
///
/// Time is derived from the frame count rather than summed, so a long replay
/// lands on exactly the same instants as a short one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackClock {
    fps: f64,
    frame: u64,
}

impl PlaybackClock {
    pub fn fixed_rate(fps: u32) -> Result<Self> {
        if fps == 0 {
            return Err(RhythmError::InvalidConfig(
                "frame rate must be positive".to_string(),
            ));
        }
        Ok(Self {
            fps: f64::from(fps),
            frame: 0,
        })
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Seconds between two frames.
    pub fn dt(&self) -> f64 {
        1.0 / self.fps
    }

    pub fn time_seconds(&self) -> f64 {
        self.frame as f64 / self.fps
    }

    pub fn advance(&mut self) {
        self.frame += 1;
    }

    pub fn reset(&mut self) {
        self.frame = 0;
    }
}

/// Runtime state of one pattern point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RhythmEvent {
    pub beat: f64,
    /// Seconds from run start, count-in included.
    pub expected_time: f64,
    pub label: String,
    pub window_ms: u32,
    pub spawn_time: f64,
    pub resolved: bool,
    pub missed: bool,
    pub hit_time: Option<f64>,
    pub accuracy_ms: Option<f64>,
}

impl RhythmEvent {
    pub fn window_seconds(&self) -> f64 {
        f64::from(self.window_ms) / 1000.0
    }

    /// Neither resolved nor missed yet.
    pub fn is_pending(&self) -> bool {
        !self.resolved && !self.missed
    }

    fn clear_outcome(&mut self) {
        self.resolved = false;
        self.missed = false;
        self.hit_time = None;
        self.accuracy_ms = None;
    }
}

/// Outcome of a successful [`RhythmTimeline::register_hit`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitMatch {
    /// Index of the resolved event.
    pub index: usize,
    /// Signed offset `now - expected_time` in seconds; negative means early.
    pub delta: f64,
}

/// Ordered events of one run plus the matching cursor.
///
/// Events before `cursor` are resolved or missed, events at or after it are
/// neither. Hits only ever resolve the cursor event, so matching never
/// reorders or skips the pattern; the only way past an event is a timeout.
#[derive(Debug, Clone)]
pub struct RhythmTimeline {
    events: Vec<RhythmEvent>,
    cursor: usize,
    seconds_per_beat: f64,
    total_duration: f64,
}

impl RhythmTimeline {
    pub fn new(level: &RhythmLevel) -> Result<Self> {
        level.validate()?;

        let events = level
            .hit_points
            .iter()
            .map(|point| RhythmEvent {
                beat: point.beat,
                expected_time: level.beat_to_seconds(point.beat),
                label: point.label.clone(),
                window_ms: level.window_ms,
                spawn_time: 0.0,
                resolved: false,
                missed: false,
                hit_time: None,
                accuracy_ms: None,
            })
            .collect();

        let total_beats = level.count_in_beats + level.pattern_length_beats + level.lead_out_beats;
        Ok(Self {
            events,
            cursor: 0,
            seconds_per_beat: level.seconds_per_beat(),
            total_duration: total_beats * level.seconds_per_beat(),
        })
    }

    pub fn events(&self) -> &[RhythmEvent] {
        &self.events
    }

    pub fn event(&self, index: usize) -> Option<&RhythmEvent> {
        self.events.get(index)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Index of the next event eligible for matching or timeout.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&RhythmEvent> {
        self.events.get(self.cursor)
    }

    pub fn seconds_per_beat(&self) -> f64 {
        self.seconds_per_beat
    }

    /// Length of the whole run: count-in, pattern and lead-out.
    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    /// Schedules every event so that a cue covering `distance` at `speed`
    /// reaches the hit line exactly at its expected time. Cues that would
    /// need to start before the run spawn at zero and arrive late.
    pub fn assign_spawn_times(&mut self, distance: f64, speed: f64) {
        let travel_time = distance / speed;
        for event in &mut self.events {
            event.spawn_time = (event.expected_time - travel_time).max(0.0);
        }
    }

    /// Tries to resolve a hit at `now` against the cursor event only.
    ///
    /// A hit outside the cursor event's window is discarded and leaves the
    /// timeline untouched.
    pub fn register_hit(&mut self, now: f64) -> Option<HitMatch> {
        let index = self.cursor;
        let event = self.events.get_mut(index)?;
        let delta = now - event.expected_time;
        if delta.abs() > event.window_seconds() + WINDOW_EPSILON {
            return None;
        }

        event.resolved = true;
        event.hit_time = Some(now);
        event.accuracy_ms = Some(delta.abs() * 1000.0);
        self.cursor += 1;
        debug_assert!(self.cursor <= self.events.len());
        Some(HitMatch { index, delta })
    }

    /// Marks the cursor event missed once its window has fully elapsed.
    ///
    /// Reports at most one miss per call; callers poll it every tick.
    pub fn next_timeout(&mut self, now: f64) -> Option<&RhythmEvent> {
        let index = self.cursor;
        let event = self.events.get_mut(index)?;
        if now - event.expected_time <= event.window_seconds() + WINDOW_EPSILON {
            return None;
        }

        event.missed = true;
        self.cursor += 1;
        debug_assert!(self.cursor <= self.events.len());
        self.events.get(index)
    }

    pub fn resolved_count(&self) -> usize {
        self.events.iter().filter(|event| event.resolved).count()
    }

    pub fn missed_count(&self) -> usize {
        self.events.iter().filter(|event| event.missed).count()
    }

    /// Share of resolved events; an empty pattern counts as complete.
    pub fn completion_ratio(&self) -> f64 {
        if self.events.is_empty() {
            return 1.0;
        }
        self.resolved_count() as f64 / self.events.len() as f64
    }

    pub fn is_complete(&self) -> bool {
        self.events.iter().all(|event| event.resolved)
    }

    /// Clears all run outcomes. Expected and spawn times are kept.
    pub fn reset(&mut self) {
        self.cursor = 0;
        for event in &mut self.events {
            event.clear_outcome();
        }
    }
}
