use engine::input::PointerEvent;
use engine::surface::{NodeId, NodeSpec, Point, Tone};

use super::{Task, TaskContext, TaskKind, mark_answer, option_buttons, text_block};
use crate::content::Vulnerability;

/// Candidate fixes offered per puzzle, the correct one included.
pub const OPTIONS_SHOWN: usize = 4;

/// Pick the fix that actually closes a hole in a code or config excerpt.
#[derive(Debug)]
pub struct CloseVulnerability {
    pool: Vec<Vulnerability>,
    buttons: Vec<NodeId>,
    correct: Option<NodeId>,
}

impl CloseVulnerability {
    pub fn new(pool: Vec<Vulnerability>) -> Self {
        Self {
            pool,
            buttons: Vec::new(),
            correct: None,
        }
    }
}

impl Task for CloseVulnerability {
    fn kind(&self) -> TaskKind {
        TaskKind::CloseVulnerability
    }

    fn mount(&mut self, ctx: &mut TaskContext<'_>) {
        ctx.set_title("Close the vulnerability");
        let Some(vuln) = ctx.rng().choose(&self.pool).cloned() else {
            tracing::error!("no vulnerabilities to choose from");
            return;
        };

        let mut decoys = vuln.decoys.clone();
        ctx.rng().shuffle(&mut decoys);
        decoys.truncate(OPTIONS_SHOWN - 1);
        let mut options = decoys;
        options.push(vuln.fix.clone());
        ctx.rng().shuffle(&mut options);

        let surface = ctx.surface();
        surface.append(
            NodeSpec::text(vuln.title.clone())
                .at(Point::new(40.0, 30.0))
                .tone(Tone::Error),
        );
        text_block(surface, &vuln.excerpt, 70.0);
        let top = 90.0 + vuln.excerpt.len() as f32 * 22.0;
        self.buttons = option_buttons(surface, &options, top);
        self.correct = options
            .iter()
            .position(|o| *o == vuln.fix)
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
        mark_answer(ctx.surface(), &self.buttons, *target, correct);
        ctx.answer(correct);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentPack;
    use crate::tasks::testing::Harness;

    fn pool() -> Vec<Vulnerability> {
        ContentPack::builtin().vulnerabilities
    }

    #[test]
    fn offers_four_options_with_one_fix() {
        let pack = pool();
        let mut h = Harness::new(11);
        let mut task = CloseVulnerability::new(pack.clone());
        h.mount(&mut task);

        let labels: Vec<_> = h.buttons().into_iter().map(|(_, l)| l).collect();
        assert_eq!(labels.len(), OPTIONS_SHOWN);
        let fixes = labels
            .iter()
            .filter(|l| pack.iter().any(|v| &v.fix == *l))
            .count();
        assert_eq!(fixes, 1);
    }

    #[test]
    fn choosing_the_fix_succeeds() {
        let mut h = Harness::new(5);
        let mut task = CloseVulnerability::new(pool());
        h.mount(&mut task);
        let fix = task.correct.unwrap();
        h.send(&mut task, PointerEvent::Click { target: fix });
        assert_eq!(h.outcome.map(|o| o.success), Some(true));
    }

    #[test]
    fn choosing_a_decoy_fails() {
        let mut h = Harness::new(5);
        let mut task = CloseVulnerability::new(pool());
        h.mount(&mut task);
        let decoy = *task
            .buttons
            .iter()
            .find(|id| Some(**id) != task.correct)
            .unwrap();
        h.send(&mut task, PointerEvent::Click { target: decoy });
        let outcome = h.outcome.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.time_bonus, 0);
    }
}
