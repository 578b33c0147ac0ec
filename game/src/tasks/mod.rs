//! The seven mini-tasks and the capability bundle they are mounted with.

pub mod close_vulnerability;
pub mod decrypt_message;
pub mod find_bug;
pub mod packet_defense;
pub mod restore_backup;
pub mod sort_data;
pub mod wire_components;

use std::time::Duration;

use engine::clock::{Scheduler, TimerId, TimerScope};
use engine::input::PointerEvent;
use engine::rng::Rng;
use engine::surface::{NodeId, NodeKind, NodeSpec, Point, Surface, Tone};
use serde::{Deserialize, Serialize};

use crate::content::ContentPack;
use crate::orchestrator::{GameTimer, Hud};
use crate::round::{RoundState, RoundView};
use crate::sfx::{Cue, CuePlayer};

/// Most tasks pay `floor(time_left / 10)` on success.
pub const STANDARD_BONUS_DIVISOR: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskKind {
    FindBug,
    WireComponents,
    CloseVulnerability,
    DecryptMessage,
    SortData,
    PacketDefense,
    RestoreBackup,
}

impl TaskKind {
    pub const ALL: [TaskKind; 7] = [
        TaskKind::FindBug,
        TaskKind::WireComponents,
        TaskKind::CloseVulnerability,
        TaskKind::DecryptMessage,
        TaskKind::SortData,
        TaskKind::PacketDefense,
        TaskKind::RestoreBackup,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            TaskKind::FindBug => "findBug",
            TaskKind::WireComponents => "wireComponents",
            TaskKind::CloseVulnerability => "closeVulnerability",
            TaskKind::DecryptMessage => "decryptMessage",
            TaskKind::SortData => "sortData",
            TaskKind::PacketDefense => "packetDefense",
            TaskKind::RestoreBackup => "restoreBackup",
        }
    }

    /// Builds a fresh instance; puzzle selection happens in `mount`.
    pub fn build(self, content: &ContentPack) -> Box<dyn Task> {
        match self {
            TaskKind::FindBug => Box::new(find_bug::FindBug::new(content.snippets.clone())),
            TaskKind::WireComponents => Box::new(wire_components::WireComponents::new(
                content.scenarios.clone(),
            )),
            TaskKind::CloseVulnerability => Box::new(close_vulnerability::CloseVulnerability::new(
                content.vulnerabilities.clone(),
            )),
            TaskKind::DecryptMessage => Box::new(decrypt_message::DecryptMessage::new(
                content.messages.clone(),
            )),
            TaskKind::SortData => Box::new(sort_data::SortData::new()),
            TaskKind::PacketDefense => Box::new(packet_defense::PacketDefense::new()),
            TaskKind::RestoreBackup => Box::new(restore_backup::RestoreBackup::new(
                content.backups.clone(),
            )),
        }
    }
}

/// Timers a task can schedule in its own scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskTimer {
    Spawn,
    Move,
    Finish,
    ClearFlash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutcome {
    pub success: bool,
    pub time_bonus: u32,
}

pub trait Task {
    fn kind(&self) -> TaskKind;

    fn mount(&mut self, ctx: &mut TaskContext<'_>);

    fn on_input(&mut self, event: &PointerEvent, ctx: &mut TaskContext<'_>);

    fn on_timer(&mut self, _timer: TaskTimer, _ctx: &mut TaskContext<'_>) {}
}

/// Everything a mounted task is allowed to touch.
pub struct TaskContext<'a> {
    pub(crate) surface: &'a mut Surface,
    pub(crate) hud: &'a mut Hud,
    pub(crate) round: &'a mut RoundState,
    pub(crate) sounds: &'a dyn CuePlayer,
    pub(crate) timers: &'a mut Scheduler<GameTimer>,
    pub(crate) scope: TimerScope,
    pub(crate) rng: &'a mut Rng,
    pub(crate) outcome: &'a mut Option<TaskOutcome>,
}

impl<'a> TaskContext<'a> {
    pub fn surface(&mut self) -> &mut Surface {
        self.surface
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.hud.title = title.into();
    }

    pub fn round(&self) -> RoundView {
        self.round.view()
    }

    /// Reports the terminal answer. Only the first report counts.
    pub fn complete(&mut self, success: bool, time_bonus: u32) {
        if self.outcome.is_some() {
            tracing::debug!(success, "task already completed; ignoring");
            return;
        }
        *self.outcome = Some(TaskOutcome {
            success,
            time_bonus,
        });
    }

    pub fn is_completed(&self) -> bool {
        self.outcome.is_some()
    }

    /// Completes with `floor(time_left / 10)` as the bonus on success.
    pub fn answer(&mut self, correct: bool) {
        let bonus = if correct {
            self.round().time_bonus(STANDARD_BONUS_DIVISOR)
        } else {
            0
        };
        self.complete(correct, bonus);
    }

    /// Takes up to `points` from the score and refreshes the display.
    pub fn penalize(&mut self, points: u32) -> u32 {
        let taken = self.round.penalize(points);
        self.refresh_score();
        taken
    }

    pub fn refresh_score(&mut self) {
        self.hud.refresh_score(self.round.score());
    }

    pub fn cue(&self, cue: Cue) {
        self.sounds.cue(cue);
    }

    pub fn set_interval(&mut self, period: Duration, timer: TaskTimer) -> TimerId {
        self.timers
            .set_interval(self.scope, period, GameTimer::Task(timer))
    }

    pub fn set_timeout(&mut self, delay: Duration, timer: TaskTimer) -> TimerId {
        self.timers
            .set_timeout(self.scope, delay, GameTimer::Task(timer))
    }

    pub fn cancel_timers(&mut self) {
        self.timers.cancel_scope(self.scope);
    }

    pub fn rng(&mut self) -> &mut Rng {
        self.rng
    }
}

/// One shuffled column of answer buttons; returns the ids in display order.
pub(crate) fn option_buttons(
    surface: &mut Surface,
    options: &[String],
    top: f32,
) -> Vec<NodeId> {
    let x = surface.size().width as f32 / 2.0;
    options
        .iter()
        .enumerate()
        .map(|(i, label)| {
            surface.append(NodeSpec::button(label.clone()).at(Point::new(x, top + i as f32 * 50.0)))
        })
        .collect()
}

/// Shows the verdict on the chosen button and locks the rest.
pub(crate) fn mark_answer(surface: &mut Surface, buttons: &[NodeId], chosen: NodeId, correct: bool) {
    for id in buttons {
        surface.set_enabled(*id, false);
    }
    surface.set_tone(chosen, if correct { Tone::Success } else { Tone::Error });
}

/// A read-only block of text lines (code, config, ciphertext).
pub(crate) fn text_block(surface: &mut Surface, lines: &[String], top: f32) {
    for (i, line) in lines.iter().enumerate() {
        surface.append(
            NodeSpec::new(NodeKind::Text, line.clone())
                .at(Point::new(40.0, top + i as f32 * 22.0))
                .group(i as u32),
        );
    }
}


#[cfg(test)]
mod tests {
    use super::testing::Harness;
    use super::*;

    #[test]
    fn kinds_index_round_trip() {
        for (i, kind) in TaskKind::ALL.iter().enumerate() {
            assert_eq!(TaskKind::from_index(i), Some(*kind));
        }
        assert_eq!(TaskKind::from_index(7), None);
    }

    #[test]
    fn first_completion_wins() {
        let mut h = Harness::new(1);
        let mut ctx = h.ctx();
        ctx.complete(true, 12);
        ctx.complete(false, 0);
        assert!(ctx.is_completed());
        assert_eq!(
            h.outcome,
            Some(TaskOutcome {
                success: true,
                time_bonus: 12
            })
        );
    }

    #[test]
    fn answer_uses_the_standard_bonus() {
        let mut h = Harness::new(1);
        h.round.tick();
        h.ctx().answer(true);
        assert_eq!(h.outcome.map(|o| o.time_bonus), Some(17));
    }

    #[test]
    fn penalize_refreshes_the_score_text() {
        let mut h = Harness::new(1);
        h.round.award(0);
        let taken = h.ctx().penalize(30);
        assert_eq!(taken, 30);
        assert_eq!(h.hud.score, "Score: 70");
    }

    #[test]
    fn every_kind_builds_and_mounts_from_builtin_content() {
        let content = ContentPack::builtin();
        for kind in TaskKind::ALL {
            let mut h = Harness::new(42);
            let mut task = kind.build(&content);
            assert_eq!(task.kind(), kind);
            h.mount(task.as_mut());
            assert!(!h.surface.is_empty(), "{kind:?} drew nothing");
            assert!(!h.hud.title.is_empty(), "{kind:?} set no title");
            assert!(h.outcome.is_none());
        }
    }
}
