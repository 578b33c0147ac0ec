use engine::audio::{ClipSource, SoundBank};
use serde::{Deserialize, Serialize};

/// Default cue volume (0.0..=1.0).
pub const CUE_VOLUME: f32 = 0.6;

/// The named sound cues the game triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Cue {
    Success,
    Error,
    Click,
    GameOver,
    Countdown,
}

impl Cue {
    pub const ALL: [Cue; 5] = [
        Cue::Success,
        Cue::Error,
        Cue::Click,
        Cue::GameOver,
        Cue::Countdown,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Cue::Success => "success",
            Cue::Error => "error",
            Cue::Click => "click",
            Cue::GameOver => "gameOver",
            Cue::Countdown => "countdown",
        }
    }

    fn file_name(self) -> &'static str {
        match self {
            Cue::Success => "success.mp3",
            Cue::Error => "error.mp3",
            Cue::Click => "click.mp3",
            Cue::GameOver => "game-over.mp3",
            Cue::Countdown => "countdown.mp3",
        }
    }
}

/// One clip per cue under `base` (a directory or URL prefix).
pub fn default_clips(base: &str) -> Vec<ClipSource> {
    let base = base.trim_end_matches('/');
    Cue::ALL
        .iter()
        .map(|cue| ClipSource::new(cue.name(), format!("{base}/{}", cue.file_name())))
        .collect()
}

/// Something that can voice a cue. The sound bank is the real one.
pub trait CuePlayer {
    fn cue(&self, cue: Cue);
}

impl CuePlayer for SoundBank {
    fn cue(&self, cue: Cue) {
        self.play(cue.name());
    }
}
