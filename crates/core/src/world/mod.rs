use serde::{Deserialize, Serialize};

use crate::WorldConfig;

/// Axis-aligned rectangle in screen units, `y` growing downwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Strict overlap: rectangles that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// The runner. Jumps when a hit lands on its beat.
#[derive(Debug, Clone)]
pub struct Player {
    pub x: f64,
    pub y: f64,
    pub vy: f64,
    pub on_ground: bool,
    width: f64,
    height: f64,
    ground_y: f64,
    gravity: f64,
    jump_impulse: f64,
    reference_fps: f64,
}

impl Player {
    pub fn new(config: &WorldConfig) -> Self {
        let ground_y = config.ground_y();
        Self {
            x: config.player_x,
            y: ground_y - config.player_height,
            vy: 0.0,
            on_ground: true,
            width: config.player_width,
            height: config.player_height,
            ground_y,
            gravity: config.gravity,
            jump_impulse: config.jump_impulse,
            reference_fps: config.reference_fps,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn jump(&mut self) {
        if self.on_ground {
            self.vy = -self.jump_impulse;
            self.on_ground = false;
        }
    }

    /// Integrates one tick. `dt` is converted to reference frames.
    pub fn update(&mut self, dt: f64) {
        let frames = dt * self.reference_fps;
        self.y += self.vy * frames;
        self.vy += self.gravity * frames;

        let rest_y = self.ground_y - self.height;
        if self.y >= rest_y {
            self.y = rest_y;
            self.vy = 0.0;
            self.on_ground = true;
        }
    }

    /// Puts the player back on the ground at rest.
    pub fn reset(&mut self) {
        self.y = self.ground_y - self.height;
        self.vy = 0.0;
        self.on_ground = true;
    }
}

/// Moving obstacle bound to one timeline event by index.
///
/// Its position is a function of the run clock rather than an accumulation
/// of frame deltas, so it crosses the hit line exactly at the event's
/// expected time whatever the tick rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub event_index: usize,
    pub spawn_time: f64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    origin_x: f64,
}

impl Obstacle {
    pub fn spawn(event_index: usize, spawn_time: f64, config: &WorldConfig) -> Self {
        let origin_x = config.spawn_x();
        Self {
            event_index,
            spawn_time,
            x: origin_x,
            y: config.ground_y() - config.obstacle_height,
            width: config.obstacle_width,
            height: config.obstacle_height,
            origin_x,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Moves the obstacle to where it is at `now` when travelling at `speed`.
    pub fn advance_to(&mut self, now: f64, speed: f64) {
        self.x = self.origin_x - speed * (now - self.spawn_time).max(0.0);
    }

    /// Whether the obstacle has scrolled fully past the left margin.
    pub fn is_gone(&self, cull_margin: f64) -> bool {
        self.x + self.width <= -cull_margin
    }
}
