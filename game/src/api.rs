//! Serializable views of a running game and the session that owns it.

use std::time::Duration;

use engine::HeadlessRunner;
use engine::audio::AudioState;
use engine::input::PointerEvent;
use engine::surface::Surface;
use serde::Serialize;

use crate::leaderboard::{LeaderboardRow, NamePrompt, PromptInput};
use crate::orchestrator::{Game, GameInput, Hud, RoundResult, Submission};
use crate::round::RoundView;
use crate::session::SubmissionResult;
use crate::tasks::TaskKind;
use crate::view::Screen;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardSnapshot {
    pub rows: Vec<LeaderboardRow>,
    pub prompt: Option<NamePrompt>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub frame: u64,
    pub now_ms: u64,
    pub screen: Screen,
    pub round: RoundView,
    pub hud: Hud,
    pub task: Option<TaskKind>,
    pub task_settled: bool,
    pub surface: Surface,
    pub result: Option<RoundResult>,
    pub leaderboard: LeaderboardSnapshot,
    pub round_closed: bool,
    pub audio: AudioState,
}

/// A game plus the frame runner that advances it.
#[derive(Debug)]
pub struct GameSession {
    runner: HeadlessRunner<Game>,
}

impl GameSession {
    pub fn new(game: Game) -> Self {
        Self {
            runner: HeadlessRunner::new(game),
        }
    }

    pub fn game(&self) -> &Game {
        self.runner.sim()
    }

    pub fn game_mut(&mut self) -> &mut Game {
        self.runner.sim_mut()
    }

    pub fn leaderboard(&self) -> LeaderboardSnapshot {
        let board = self.game().leaderboard();
        LeaderboardSnapshot {
            rows: board.rows(),
            prompt: board.prompt().cloned(),
        }
    }

    pub fn state(&self) -> GameSnapshot {
        let game = self.game();
        GameSnapshot {
            frame: self.runner.frame(),
            now_ms: game.now().as_millis() as u64,
            screen: game.screen(),
            round: game.round(),
            hud: game.hud().clone(),
            task: game.current_task(),
            task_settled: game.is_task_settled(),
            surface: game.surface().clone(),
            result: game.result().cloned(),
            leaderboard: self.leaderboard(),
            round_closed: game.is_round_closed(),
            audio: game.sounds().state(),
        }
    }

    pub fn start(&mut self) -> GameSnapshot {
        self.runner.send(GameInput::Start);
        self.state()
    }

    pub fn reset(&mut self) -> GameSnapshot {
        self.runner.send(GameInput::Replay);
        self.state()
    }

    pub fn pointer(&mut self, event: PointerEvent) -> GameSnapshot {
        self.runner.send(GameInput::Pointer(event));
        self.state()
    }

    pub fn prompt(&mut self, input: PromptInput) -> GameSnapshot {
        self.runner.send(GameInput::Prompt(input));
        self.state()
    }

    /// Feeds wall-clock time; returns the number of whole frames stepped.
    pub fn elapse(&mut self, dt: Duration) -> u64 {
        self.runner.elapse(dt)
    }

    pub fn take_pending_submission(&mut self) -> Option<Submission> {
        self.game_mut().take_pending_submission()
    }

    pub fn apply_submission(&mut self, result: SubmissionResult) {
        self.game_mut().apply_submission(result.receipt, result.top);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::GameOptions;

    fn session() -> GameSession {
        GameSession::new(Game::headless(GameOptions {
            seed: Some(11),
            round_length: Duration::from_secs(10),
            ..GameOptions::default()
        }))
    }

    #[test]
    fn fresh_session_sits_on_the_start_screen() {
        let s = session().state();
        assert_eq!(s.screen, Screen::Start);
        assert_eq!(s.frame, 0);
        assert!(s.task.is_none());
        assert!(s.surface.is_empty());
    }

    #[test]
    fn start_mounts_a_task_and_elapse_counts_frames() {
        let mut s = session();
        let snap = s.start();
        assert_eq!(snap.screen, Screen::Playing);
        assert!(snap.task.is_some());
        assert_eq!(snap.audio, AudioState::Running);

        assert_eq!(s.elapse(Duration::from_millis(95)), 3);
        assert_eq!(s.state().frame, 3);
    }

    #[test]
    fn snapshot_serializes_with_camel_case_keys() {
        let mut s = session();
        s.start();
        let json = serde_json::to_value(s.state()).unwrap();
        assert_eq!(json["screen"], "playing");
        assert_eq!(json["hud"]["timer"], "Time: 0:10");
        assert!(json["taskSettled"].is_boolean());
        assert!(json["surface"]["nodes"].is_array());
    }

    #[test]
    fn round_end_opens_the_prompt_in_the_leaderboard_snapshot() {
        let mut s = session();
        s.start();
        s.elapse(Duration::from_secs(11));
        let board = s.leaderboard();
        assert_eq!(board.prompt.map(|p| p.score), Some(s.game().round().score));
    }
}
