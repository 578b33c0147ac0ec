//! Round lifecycle: screens, countdown, task mounting and scoring.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use engine::Simulation;
use engine::audio::SoundBank;
use engine::clock::{Scheduler, TimerId, TimerScope};
use engine::input::PointerEvent;
use engine::rng::Rng;
use engine::surface::{NodeId, NodeKind, NodeSpec, Point, Surface, SurfaceSize, Tone};
use serde::{Deserialize, Serialize};

use crate::content::ContentPack;
use crate::leaderboard::{LeaderboardView, PromptInput, PromptOutcome};
use crate::round::{
    COUNTDOWN_CUE_FROM, FAILURE_PENALTY, ROUND_DURATION, ResultTier, RoundState, RoundView,
    format_clock,
};
use crate::score::{LeaderboardEntry, SubmitReceipt};
use crate::sfx::{Cue, CuePlayer};
use crate::tasks::{Task, TaskContext, TaskKind, TaskOutcome, TaskTimer};
use crate::view::{Screen, ScreenEffect, ScreenEvent};

pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);
pub const FADE_STEP: Duration = Duration::from_millis(30);
pub const FADE_DELTA: f32 = 0.05;
pub const FADE_STEPS: u32 = 20;
pub const NEXT_TASK_DELAY: Duration = Duration::from_millis(300);
/// How far a success indicator drifts up over its fade.
const INDICATOR_RISE: f32 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameTimer {
    Countdown,
    Fade,
    MountNext,
    Task(TaskTimer),
}

/// Title, score and clock strings shown above the play surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hud {
    pub title: String,
    pub score: String,
    pub timer: String,
}

impl Hud {
    pub fn refresh_score(&mut self, score: u32) {
        self.score = format!("Score: {score}");
    }

    pub fn refresh_timer(&mut self, secs: u32) {
        self.timer = format!("Time: {}", format_clock(secs));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GameInput {
    Start,
    Replay,
    Pointer(PointerEvent),
    Prompt(PromptInput),
}

#[derive(Debug, Clone)]
pub struct GameOptions {
    pub round_length: Duration,
    /// Fixed seed for reproducible rounds; entropy otherwise.
    pub seed: Option<u64>,
    pub task_pool: Vec<TaskKind>,
    pub surface: SurfaceSize,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            round_length: ROUND_DURATION,
            seed: None,
            task_pool: TaskKind::ALL.to_vec(),
            surface: SurfaceSize::default(),
        }
    }
}

/// A confirmed leaderboard entry waiting for the score service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub score: u32,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResult {
    pub score: u32,
    pub tier: ResultTier,
    pub message: String,
}

struct Mounted {
    task: Box<dyn Task>,
    scope: TimerScope,
    outcome: Option<TaskOutcome>,
    scored: bool,
}

#[derive(Debug)]
struct Fade {
    timer: TimerId,
    node: NodeId,
    origin: Point,
    steps: u32,
    rising: bool,
}

pub struct Game {
    options: GameOptions,
    content: Arc<ContentPack>,
    screen: Screen,
    round: RoundState,
    hud: Hud,
    surface: Surface,
    timers: Scheduler<GameTimer>,
    rng: Rng,
    sounds: SoundBank,
    current: Option<Mounted>,
    next_scope: u32,
    fade: Option<Fade>,
    result: Option<RoundResult>,
    leaderboard: LeaderboardView,
    pending: Option<Submission>,
    round_closed: bool,
}

impl fmt::Debug for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Game")
            .field("screen", &self.screen)
            .field("round", &self.round)
            .field("task", &self.current_task())
            .field("timers", &self.timers.len())
            .finish_non_exhaustive()
    }
}

impl Game {
    pub fn new(options: GameOptions, content: Arc<ContentPack>, sounds: SoundBank) -> Self {
        let rng = options.seed.map(Rng::new).unwrap_or_else(Rng::from_entropy);
        let mut hud = Hud::default();
        hud.refresh_score(0);
        hud.refresh_timer(options.round_length.as_secs() as u32);
        Self {
            surface: Surface::new(options.surface),
            round: RoundState::new(options.round_length),
            options,
            content,
            screen: Screen::default(),
            hud,
            timers: Scheduler::new(),
            rng,
            sounds,
            current: None,
            next_scope: 1,
            fade: None,
            result: None,
            leaderboard: LeaderboardView::new(),
            pending: None,
            round_closed: false,
        }
    }

    /// Built-in content, no audio device.
    pub fn headless(options: GameOptions) -> Self {
        Self::new(options, Arc::new(ContentPack::builtin()), SoundBank::silent())
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn round(&self) -> RoundView {
        self.round.view()
    }

    pub fn hud(&self) -> &Hud {
        &self.hud
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn result(&self) -> Option<&RoundResult> {
        self.result.as_ref()
    }

    pub fn leaderboard(&self) -> &LeaderboardView {
        &self.leaderboard
    }

    pub fn sounds(&self) -> &SoundBank {
        &self.sounds
    }

    pub fn sounds_mut(&mut self) -> &mut SoundBank {
        &mut self.sounds
    }

    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    pub fn current_task(&self) -> Option<TaskKind> {
        self.current.as_ref().map(|m| m.task.kind())
    }

    /// The mounted task has answered and is waiting for the next one.
    pub fn is_task_settled(&self) -> bool {
        self.current.as_ref().is_some_and(|m| m.outcome.is_some())
    }

    /// Set once the post-round name prompt has been submitted or dismissed.
    pub fn is_round_closed(&self) -> bool {
        self.round_closed
    }

    pub fn start(&mut self) {
        let (screen, effect) = self.screen.handle(ScreenEvent::Start);
        if effect != ScreenEffect::ResetRound {
            tracing::debug!(screen = ?self.screen, "start ignored");
            return;
        }
        self.screen = screen;
        self.sounds.resume();
        self.sounds.cue(Cue::Click);

        self.timers.clear();
        self.fade = None;
        self.unmount_task();
        self.round.reset(self.options.round_length);
        self.hud.refresh_score(self.round.score());
        self.hud.refresh_timer(self.round.time_left());
        self.result = None;
        self.pending = None;
        self.round_closed = false;

        self.timers
            .set_interval(TimerScope::ROOT, COUNTDOWN_TICK, GameTimer::Countdown);
        tracing::info!(length_secs = self.round.time_left(), "round started");
        self.mount_next_task();
    }

    pub fn reset(&mut self) {
        if self.leaderboard.is_prompt_open() {
            tracing::debug!("reset ignored while the name prompt is open");
            return;
        }
        let (screen, effect) = self.screen.handle(ScreenEvent::Replay);
        if effect != ScreenEffect::ClearPlayArea {
            return;
        }
        self.sounds.cue(Cue::Click);
        self.screen = screen;
        self.surface.clear();
        self.hud.title.clear();
        self.result = None;
    }

    pub fn pointer(&mut self, event: PointerEvent) {
        if !self.screen.is_playing() || self.is_task_settled() {
            return;
        }
        self.dispatch(|task, ctx| task.on_input(&event, ctx));
    }

    pub fn prompt(&mut self, input: PromptInput) {
        match self.leaderboard.handle(input) {
            PromptOutcome::Pending => {}
            PromptOutcome::Submit {
                score,
                display_name,
            } => {
                tracing::info!(score, %display_name, "leaderboard entry confirmed");
                self.pending = Some(Submission {
                    score,
                    display_name,
                });
            }
            PromptOutcome::Cancelled => {
                tracing::info!("leaderboard entry skipped");
                self.round_closed = true;
            }
        }
    }

    pub fn take_pending_submission(&mut self) -> Option<Submission> {
        self.pending.take()
    }

    /// Closes the name prompt after the score service answered.
    pub fn apply_submission(
        &mut self,
        receipt: Option<SubmitReceipt>,
        top: Option<Vec<LeaderboardEntry>>,
    ) {
        if receipt.is_none() {
            tracing::warn!("score was not saved");
        }
        self.leaderboard.close_prompt();
        if let Some(top) = top {
            self.leaderboard.set_entries(top);
        }
        self.round_closed = true;
    }

    pub fn set_leaderboard(&mut self, entries: Vec<LeaderboardEntry>) {
        self.leaderboard.set_entries(entries);
    }

    /// Tears down the current task and mounts a random one.
    pub fn mount_next_task(&mut self) {
        self.unmount_task();
        if !self.round.is_playing {
            return;
        }
        let pool = &self.options.task_pool;
        let index = self.rng.below(pool.len());
        let Some(kind) = pool.get(index).copied() else {
            tracing::error!(index, pool = pool.len(), "unknown task type");
            return;
        };
        self.mount_task(kind);
    }

    pub fn mount_task(&mut self, kind: TaskKind) {
        self.unmount_task();
        let scope = TimerScope(self.next_scope);
        self.next_scope += 1;
        self.round.note_task_mounted();
        self.hud.title.clear();
        self.current = Some(Mounted {
            task: kind.build(&self.content),
            scope,
            outcome: None,
            scored: false,
        });
        tracing::debug!(task = kind.name(), mounted = self.round.tasks_completed(), "task mounted");
        self.dispatch(|task, ctx| task.mount(ctx));
    }

    fn unmount_task(&mut self) {
        if let Some(mounted) = self.current.take() {
            self.timers.cancel_scope(mounted.scope);
        }
        self.surface.clear();
    }

    fn dispatch(&mut self, f: impl FnOnce(&mut dyn Task, &mut TaskContext<'_>)) {
        let Some(mounted) = self.current.as_mut() else {
            return;
        };
        let mut ctx = TaskContext {
            surface: &mut self.surface,
            hud: &mut self.hud,
            round: &mut self.round,
            sounds: &self.sounds,
            timers: &mut self.timers,
            scope: mounted.scope,
            rng: &mut self.rng,
            outcome: &mut mounted.outcome,
        };
        f(mounted.task.as_mut(), &mut ctx);

        let outcome = match self.current.as_mut() {
            Some(m) if !m.scored && m.outcome.is_some() => {
                m.scored = true;
                m.outcome
            }
            _ => None,
        };
        if let Some(outcome) = outcome {
            self.on_task_complete(outcome);
        }
    }

    fn on_task_complete(&mut self, outcome: TaskOutcome) {
        if let Some(mounted) = self.current.as_ref() {
            self.timers.cancel_scope(mounted.scope);
        }
        let (text, tone) = if outcome.success {
            let points = self.round.award(outcome.time_bonus);
            self.sounds.cue(Cue::Success);
            (format!("+{points}"), Tone::Success)
        } else {
            self.round.penalize(FAILURE_PENALTY);
            self.sounds.cue(Cue::Error);
            (format!("-{FAILURE_PENALTY}"), Tone::Error)
        };
        self.hud.refresh_score(self.round.score());
        tracing::debug!(success = outcome.success, score = self.round.score(), "task finished");

        let origin = self.surface.size().center();
        let node = self
            .surface
            .append(NodeSpec::new(NodeKind::Indicator, text).at(origin).tone(tone));
        let timer = self
            .timers
            .set_interval(TimerScope::ROOT, FADE_STEP, GameTimer::Fade);
        self.fade = Some(Fade {
            timer,
            node,
            origin,
            steps: 0,
            rising: outcome.success,
        });
    }

    fn step_fade(&mut self, id: TimerId) {
        let Some(fade) = self.fade.as_mut().filter(|f| f.timer == id) else {
            self.timers.cancel(id);
            return;
        };
        fade.steps += 1;
        let opacity = (1.0 - fade.steps as f32 * FADE_DELTA).max(0.0);
        if let Some(node) = self.surface.node_mut(fade.node) {
            node.opacity = opacity;
            if fade.rising {
                let lift = INDICATOR_RISE * fade.steps as f32 / FADE_STEPS as f32;
                node.pos = Some(Point::new(fade.origin.x, fade.origin.y - lift));
            }
        }
        if fade.steps >= FADE_STEPS {
            let (timer, node) = (fade.timer, fade.node);
            self.fade = None;
            self.timers.cancel(timer);
            self.surface.remove(node);
            self.timers
                .set_timeout(TimerScope::ROOT, NEXT_TASK_DELAY, GameTimer::MountNext);
        }
    }

    fn tick_countdown(&mut self) {
        if !self.round.is_playing {
            return;
        }
        let expired = self.round.tick();
        self.hud.refresh_timer(self.round.time_left());
        if expired {
            self.end_round();
        } else if self.round.time_left() <= COUNTDOWN_CUE_FROM {
            self.sounds.cue(Cue::Countdown);
        }
    }

    fn end_round(&mut self) {
        let (screen, effect) = self.screen.handle(ScreenEvent::TimeUp);
        if effect != ScreenEffect::CloseRound {
            return;
        }
        self.sounds.cue(Cue::GameOver);
        self.round.is_playing = false;
        self.timers.clear();
        self.fade = None;
        self.unmount_task();
        self.hud.title.clear();
        self.screen = screen;

        let score = self.round.score();
        let tier = ResultTier::for_score(score);
        self.result = Some(RoundResult {
            score,
            tier,
            message: tier.message().to_string(),
        });
        self.leaderboard.open_prompt(score);
        tracing::info!(score, tasks = self.round.tasks_completed(), "round over");
    }

    fn on_timer(&mut self, id: TimerId, timer: GameTimer) {
        match timer {
            GameTimer::Countdown => self.tick_countdown(),
            GameTimer::Fade => self.step_fade(id),
            GameTimer::MountNext => self.mount_next_task(),
            GameTimer::Task(timer) => {
                if !self.is_task_settled() {
                    self.dispatch(|task, ctx| task.on_timer(timer, ctx));
                }
            }
        }
    }
}

impl Simulation for Game {
    type Input = GameInput;

    fn input(&mut self, input: GameInput) {
        match input {
            GameInput::Start => self.start(),
            GameInput::Replay => self.reset(),
            GameInput::Pointer(event) => self.pointer(event),
            GameInput::Prompt(input) => self.prompt(input),
        }
    }

    fn advance(&mut self, dt: Duration) {
        let until = self.timers.now() + dt;
        while let Some(fired) = self.timers.pop_due(until) {
            self.on_timer(fired.id, fired.payload);
        }
        self.timers.settle(until);
    }
}

#[cfg(test)]
mod tests {
    use engine::HeadlessRunner;
    use engine::audio::{Clip, RecordingOutput};

    use super::*;

    fn game_with(pool: Vec<TaskKind>) -> Game {
        Game::headless(GameOptions {
            seed: Some(7),
            task_pool: pool,
            ..GameOptions::default()
        })
    }

    fn answer_buttons(game: &Game) -> Vec<(NodeId, String)> {
        game.surface()
            .nodes()
            .iter()
            .filter(|n| n.kind == NodeKind::Button && n.enabled)
            .map(|n| (n.id, n.text.clone()))
            .collect()
    }

    const GOOD_BACKUP: &str = "Backup (yesterday, 23:00, stable)";

    fn backup_option(game: &Game, correct: bool) -> NodeId {
        answer_buttons(game)
            .into_iter()
            .find(|(_, label)| (label == GOOD_BACKUP) == correct)
            .map(|(id, _)| id)
            .expect("backup options shown")
    }

    fn restore(game: &mut Game, correct: bool) {
        let id = backup_option(game, correct);
        game.pointer(PointerEvent::Click { target: id });
    }

    fn backup_only() -> Game {
        let mut content = ContentPack::builtin();
        content.backups.truncate(1);
        Game::new(
            GameOptions {
                seed: Some(7),
                task_pool: vec![TaskKind::RestoreBackup],
                ..GameOptions::default()
            },
            Arc::new(content),
            SoundBank::silent(),
        )
    }

    #[test]
    fn start_resets_and_mounts_a_task() {
        let mut game = game_with(vec![TaskKind::SortData]);
        game.start();
        assert_eq!(game.screen(), Screen::Playing);
        assert_eq!(game.hud().timer, "Time: 3:00");
        assert_eq!(game.hud().score, "Score: 0");
        assert_eq!(game.current_task(), Some(TaskKind::SortData));
        assert_eq!(game.round().tasks_completed, 1);
        assert!(!game.surface().is_empty());
    }

    #[test]
    fn success_scores_fades_and_mounts_the_next_task() {
        let mut game = backup_only();
        game.start();
        let decoy = backup_option(&game, false);
        restore(&mut game, true);

        // 180 s left, bonus floor(180 / 10).
        assert_eq!(game.round().score, 118);
        assert_eq!(game.hud().score, "Score: 118");
        let indicator = game
            .surface()
            .nodes()
            .iter()
            .find(|n| n.kind == NodeKind::Indicator)
            .cloned()
            .unwrap();
        assert_eq!(indicator.text, "+118");

        // Settled tasks ignore further input.
        game.pointer(PointerEvent::Click { target: decoy });
        assert_eq!(game.round().score, 118);

        game.advance(FADE_STEP * 10);
        let half = game.surface().node(indicator.id).unwrap();
        assert!((half.opacity - 0.5).abs() < 1e-4);
        assert!(half.pos.unwrap().y < indicator.pos.unwrap().y);

        game.advance(FADE_STEP * 10);
        assert!(!game.surface().contains(indicator.id));
        assert_eq!(game.round().tasks_completed, 1);
        game.advance(NEXT_TASK_DELAY - Duration::from_millis(1));
        assert_eq!(game.round().tasks_completed, 1);
        game.advance(Duration::from_millis(1));
        assert_eq!(game.round().tasks_completed, 2);
        assert!(!game.is_task_settled());
    }

    #[test]
    fn failure_is_floored_at_zero_and_still_moves_on() {
        let mut game = backup_only();
        game.start();
        restore(&mut game, false);
        assert_eq!(game.round().score, 0);
        assert!(game.surface().texts_of(NodeKind::Indicator).contains(&"-50"));

        game.advance(FADE_STEP * FADE_STEPS + NEXT_TASK_DELAY);
        assert_eq!(game.round().tasks_completed, 2);
    }

    #[test]
    fn failure_takes_fifty_after_a_success() {
        let mut game = backup_only();
        game.start();
        restore(&mut game, true);
        game.advance(FADE_STEP * FADE_STEPS + NEXT_TASK_DELAY);
        restore(&mut game, false);
        assert_eq!(game.round().score, 68);
    }

    #[test]
    fn empty_pool_logs_and_mounts_nothing() {
        let mut game = game_with(Vec::new());
        game.start();
        assert_eq!(game.current_task(), None);
        assert_eq!(game.round().tasks_completed, 0);
        assert_eq!(game.screen(), Screen::Playing);
    }

    #[test]
    fn countdown_ends_the_round_at_exactly_180_ticks() {
        let mut runner = HeadlessRunner::new(game_with(vec![TaskKind::SortData]));
        runner.send(GameInput::Start);
        runner.run_for(Duration::from_secs(179));
        assert_eq!(runner.sim().hud().timer, "Time: 0:01");
        assert_eq!(runner.sim().screen(), Screen::Playing);

        runner.run_for(Duration::from_secs(1));
        let game = runner.sim();
        assert_eq!(game.hud().timer, "Time: 0:00");
        assert_eq!(game.screen(), Screen::Result);
        assert!(game.surface().is_empty());
        assert_eq!(game.current_task(), None);
        assert!(game.leaderboard().is_prompt_open());
        assert_eq!(game.result().unwrap().tier, ResultTier::Encouragement);
    }

    #[test]
    fn countdown_cue_plays_for_the_last_five_seconds() {
        let rec = RecordingOutput::new();
        let mut bank = SoundBank::new(Box::new(rec.clone()));
        for cue in Cue::ALL {
            bank.insert(
                cue.name(),
                Clip::from_pcm16(8000, &[0, 1000, -1000, 0]).expect("wav decodes"),
            );
        }
        let mut game = Game::new(
            GameOptions {
                seed: Some(1),
                round_length: Duration::from_secs(8),
                task_pool: vec![TaskKind::SortData],
                ..GameOptions::default()
            },
            Arc::new(ContentPack::builtin()),
            bank,
        );
        game.start();
        game.advance(Duration::from_secs(8));
        let played = rec.take();
        let countdowns = played.iter().filter(|n| *n == "countdown").count();
        assert_eq!(countdowns, 5);
        assert_eq!(played.first().map(String::as_str), Some("click"));
        assert_eq!(played.last().map(String::as_str), Some("gameOver"));
    }

    #[test]
    fn round_end_mid_fade_cancels_everything() {
        let mut content = ContentPack::builtin();
        content.backups.truncate(1);
        let mut game = Game::new(
            GameOptions {
                seed: Some(3),
                round_length: Duration::from_secs(1),
                task_pool: vec![TaskKind::RestoreBackup],
                ..GameOptions::default()
            },
            Arc::new(content),
            SoundBank::silent(),
        );
        game.start();
        game.advance(Duration::from_millis(900));
        restore(&mut game, true);
        game.advance(Duration::from_secs(5));
        assert_eq!(game.screen(), Screen::Result);
        assert_eq!(game.round().tasks_completed, 1);
        assert!(game.surface().is_empty());
    }

    #[test]
    fn replay_waits_for_the_prompt_then_returns_to_start() {
        let mut game = game_with(vec![TaskKind::SortData]);
        game.start();
        game.advance(Duration::from_secs(180));

        game.reset();
        assert_eq!(game.screen(), Screen::Result);

        game.prompt(PromptInput::ClickOutside);
        assert!(game.is_round_closed());
        game.reset();
        assert_eq!(game.screen(), Screen::Start);
        assert!(game.surface().is_empty());

        game.start();
        assert_eq!(game.screen(), Screen::Playing);
        assert_eq!(game.round().time_left, 180);
    }

    #[test]
    fn confirmed_name_becomes_a_pending_submission() {
        let mut game = game_with(vec![TaskKind::SortData]);
        game.start();
        game.advance(Duration::from_secs(180));
        game.prompt(PromptInput::SetText {
            text: "   ".into(),
        });
        game.prompt(PromptInput::Save);
        let sub = game.take_pending_submission().unwrap();
        assert_eq!(sub.display_name, "Anonymous");
        assert!(game.take_pending_submission().is_none());
        assert!(!game.is_round_closed());

        game.apply_submission(None, None);
        assert!(game.is_round_closed());
        assert!(!game.leaderboard().is_prompt_open());
    }

    #[test]
    fn pointer_input_is_ignored_off_the_play_screen() {
        let mut game = backup_only();
        game.pointer(PointerEvent::Leave);
        assert_eq!(game.current_task(), None);
    }
}
