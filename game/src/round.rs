use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const ROUND_DURATION: Duration = Duration::from_secs(180);
pub const SUCCESS_POINTS: u32 = 100;
pub const FAILURE_PENALTY: u32 = 50;
/// The countdown cue plays while this many seconds or fewer remain.
pub const COUNTDOWN_CUE_FROM: u32 = 5;

/// Mutable state of one timed round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundState {
    pub is_playing: bool,
    score: u32,
    time_left: u32,
    tasks_completed: u32,
}

impl Default for RoundState {
    fn default() -> Self {
        Self::new(ROUND_DURATION)
    }
}

impl RoundState {
    pub fn new(length: Duration) -> Self {
        Self {
            is_playing: false,
            score: 0,
            time_left: length.as_secs() as u32,
            tasks_completed: 0,
        }
    }

    pub fn reset(&mut self, length: Duration) {
        *self = Self::new(length);
        self.is_playing = true;
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn tasks_completed(&self) -> u32 {
        self.tasks_completed
    }

    pub fn view(&self) -> RoundView {
        RoundView {
            is_playing: self.is_playing,
            score: self.score,
            time_left: self.time_left,
            tasks_completed: self.tasks_completed,
        }
    }

    /// Adds base points plus `bonus`; returns the amount awarded.
    pub fn award(&mut self, bonus: u32) -> u32 {
        let points = SUCCESS_POINTS.saturating_add(bonus);
        self.score = self.score.saturating_add(points);
        points
    }

    /// Subtracts up to `points`, never going below zero; returns what was
    /// actually taken.
    pub fn penalize(&mut self, points: u32) -> u32 {
        let taken = points.min(self.score);
        self.score -= taken;
        taken
    }

    pub fn note_task_mounted(&mut self) {
        self.tasks_completed = self.tasks_completed.saturating_add(1);
    }

    /// One second of countdown. Returns `true` when this tick reached zero.
    pub fn tick(&mut self) -> bool {
        if self.time_left == 0 {
            return false;
        }
        self.time_left -= 1;
        self.time_left == 0
    }

    pub fn clock_text(&self) -> String {
        format_clock(self.time_left)
    }
}

/// Read-only copy of the round handed to mounted tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundView {
    pub is_playing: bool,
    pub score: u32,
    pub time_left: u32,
    pub tasks_completed: u32,
}

impl RoundView {
    /// `floor(time_left / divisor)`; the usual success bonus.
    pub fn time_bonus(&self, divisor: u32) -> u32 {
        self.time_left / divisor.max(1)
    }
}

/// `M:SS`.
pub fn format_clock(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultTier {
    Encouragement,
    Strong,
    Top,
}

impl ResultTier {
    pub fn for_score(score: u32) -> Self {
        if score >= 1000 {
            ResultTier::Top
        } else if score >= 500 {
            ResultTier::Strong
        } else {
            ResultTier::Encouragement
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            ResultTier::Top => "Outstanding! You are a true IT professional!",
            ResultTier::Strong => "Great result! You really know your tech!",
            ResultTier::Encouragement => "Not bad! With practice you'll get even better!",
        }
    }
}
