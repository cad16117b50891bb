//! Core library for the Rhythm Dino trainer.
//!
//! The crate turns a declarative rhythm pattern into timed events, matches a
//! live stream of drum hits against them and drives a small runner game
//! whose obstacles arrive on the beat. Rendering, audio and device transports
//! live outside the crate; everything here is driven by a caller-supplied
//! clock so that a run can be replayed deterministically from a hit trace.

pub mod config;
pub mod error;
pub mod game;
pub mod input;
pub mod level;
pub mod scoring;
pub mod snapshot;
pub mod timeline;
pub mod world;

pub use config::{EngineConfig, ScoringConfig, WorldConfig};
pub use error::{Result, RhythmError};
pub use game::{RhythmRun, RunState, RunSummary};
pub use input::{
    ChannelHitSource, HitAggregator, HitCounter, HitProducer, HitSource, InputMessage, Key,
    NullHitSource, ScriptedHits,
};
pub use level::{LevelCatalog, LevelSummary, RhythmLevel, RhythmPoint};
pub use scoring::{score_for_delta, Grade};
pub use snapshot::{EventStatus, Feedback, ObstacleView, RunSnapshot};
pub use timeline::{HitMatch, PlaybackClock, RhythmEvent, RhythmTimeline};
pub use world::{Obstacle, Player, Rect};
