use engine::input::PointerEvent;
use engine::surface::{NodeId, NodeKind, NodeSpec, Point, Tone};

use super::{Task, TaskContext, TaskKind, mark_answer, option_buttons};
use crate::content::BackupPuzzle;

/// Choose the recovery action that brings the broken server back.
#[derive(Debug)]
pub struct RestoreBackup {
    pool: Vec<BackupPuzzle>,
    buttons: Vec<NodeId>,
    correct: Option<NodeId>,
    file_icon: Option<NodeId>,
}

impl RestoreBackup {
    pub fn new(pool: Vec<BackupPuzzle>) -> Self {
        Self {
            pool,
            buttons: Vec::new(),
            correct: None,
            file_icon: None,
        }
    }
}

impl Task for RestoreBackup {
    fn kind(&self) -> TaskKind {
        TaskKind::RestoreBackup
    }

    fn mount(&mut self, ctx: &mut TaskContext<'_>) {
        ctx.set_title("Restore from backup");
        let Some(puzzle) = ctx.rng().choose(&self.pool).cloned() else {
            tracing::error!("no backup puzzles to choose from");
            return;
        };

        let mut decoys = puzzle.decoys.clone();
        ctx.rng().shuffle(&mut decoys);
        decoys.truncate(puzzle.decoys_shown);
        let mut options = decoys;
        options.push(puzzle.correct.clone());
        ctx.rng().shuffle(&mut options);

        let surface = ctx.surface();
        let center = surface.size().center();
        self.file_icon = Some(
            surface.append(
                NodeSpec::new(NodeKind::Sprite, "broken-file")
                    .at(Point::new(center.x, 60.0))
                    .tone(Tone::Error),
            ),
        );
        surface.append(
            NodeSpec::text(puzzle.prompt.clone())
                .at(Point::new(40.0, 120.0))
                .tone(Tone::Accent),
        );
        self.buttons = option_buttons(surface, &options, 180.0);
        self.correct = options
            .iter()
            .position(|o| *o == puzzle.correct)
            .map(|i| self.buttons[i]);
    }

    fn on_input(&mut self, event: &PointerEvent, ctx: &mut TaskContext<'_>) {
        let PointerEvent::Click { target } = event else {
            return;
        };
        if ctx.is_completed() || !self.buttons.contains(target) {
            return;
        }
        let correct = self.correct == Some(*target);
        let surface = ctx.surface();
        mark_answer(surface, &self.buttons, *target, correct);
        if let (true, Some(icon)) = (correct, self.file_icon) {
            surface.set_text(icon, "restored-file");
            surface.set_tone(icon, Tone::Success);
        }
        ctx.answer(correct);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentPack;
    use crate::tasks::testing::Harness;

    fn first() -> Vec<BackupPuzzle> {
        vec![ContentPack::builtin().backups[0].clone()]
    }

    #[test]
    fn one_correct_and_two_decoys_are_offered() {
        let mut h = Harness::new(21);
        let mut task = RestoreBackup::new(first());
        h.mount(&mut task);
        let labels: Vec<_> = h.buttons().into_iter().map(|(_, l)| l).collect();
        assert_eq!(labels.len(), 3);
        assert!(labels.contains(&"Backup (yesterday, 23:00, stable)".to_string()));
    }

    #[test]
    fn correct_choice_restores_the_file() {
        let mut h = Harness::new(21);
        let mut task = RestoreBackup::new(first());
        h.mount(&mut task);
        let right = h.button("Backup (yesterday, 23:00, stable)");
        h.send(&mut task, PointerEvent::Click { target: right });

        assert_eq!(h.outcome.map(|o| o.success), Some(true));
        let icon = h.surface.node(task.file_icon.unwrap()).unwrap();
        assert_eq!(icon.text, "restored-file");
    }

    #[test]
    fn decoy_leaves_the_file_broken() {
        let mut h = Harness::new(21);
        let mut task = RestoreBackup::new(first());
        h.mount(&mut task);
        let (wrong, _) = h
            .buttons()
            .into_iter()
            .find(|(_, l)| l != "Backup (yesterday, 23:00, stable)")
            .unwrap();
        h.send(&mut task, PointerEvent::Click { target: wrong });

        assert_eq!(h.outcome.map(|o| o.success), Some(false));
        let icon = h.surface.node(task.file_icon.unwrap()).unwrap();
        assert_eq!(icon.text, "broken-file");
    }
}
