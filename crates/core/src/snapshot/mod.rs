use serde::{Deserialize, Serialize};

use crate::{world::Rect, RhythmEvent, RunState};

/// Display state of the event an obstacle is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Pending,
    Resolved,
    Missed,
}

impl From<&RhythmEvent> for EventStatus {
    fn from(event: &RhythmEvent) -> Self {
        if event.missed {
            EventStatus::Missed
        } else if event.resolved {
            EventStatus::Resolved
        } else {
            EventStatus::Pending
        }
    }
}

/// Text shown to the player after a hit, stamped with the run time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub text: String,
    pub at: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleView {
    pub rect: Rect,
    pub label: String,
    pub status: EventStatus,
}

/// Read-only per-tick view handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub state: RunState,
    pub score: u32,
    pub combo: u32,
    pub fail_reason: Option<String>,
    pub player: Rect,
    pub obstacles: Vec<ObstacleView>,
    pub last_feedback: Option<Feedback>,
    pub completion_ratio: f64,
}

impl RunSnapshot {
    /// Feedback that is still fresh at `now`, for HUDs that fade it out.
    pub fn feedback_at(&self, now: f64, ttl: f64) -> Option<&Feedback> {
        self.last_feedback
            .as_ref()
            .filter(|feedback| now - feedback.at <= ttl)
    }
}
