use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Screen {
    #[default]
    Start,
    Playing,
    Result,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenEvent {
    Start,
    TimeUp,
    Replay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenEffect {
    None,
    ResetRound,
    CloseRound,
    ClearPlayArea,
}

impl Screen {
    /// Pure transition function for the screen state machine.
    ///
    /// Side effects are reported via `ScreenEffect` so the orchestrator stays
    /// the only place that touches timers and surfaces.
    pub fn handle(self, event: ScreenEvent) -> (Screen, ScreenEffect) {
        match (self, event) {
            (Screen::Start, ScreenEvent::Start) => (Screen::Playing, ScreenEffect::ResetRound),
            (Screen::Playing, ScreenEvent::TimeUp) => (Screen::Result, ScreenEffect::CloseRound),
            (Screen::Result, ScreenEvent::Replay) => (Screen::Start, ScreenEffect::ClearPlayArea),

            // Ignore irrelevant events in the current state.
            (state, _) => (state, ScreenEffect::None),
        }
    }

    pub fn is_playing(self) -> bool {
        matches!(self, Screen::Playing)
    }
}
