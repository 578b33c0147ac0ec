use engine::input::PointerEvent;
use engine::surface::{NodeId, NodeSpec, Point, Tone};

use super::{Task, TaskContext, TaskKind, mark_answer, option_buttons};
use crate::content::{Cipher, CipherPuzzle};

fn cipher_hint(cipher: Cipher) -> &'static str {
    match cipher {
        Cipher::Caesar { .. } => "Hint: every letter was shifted along the alphabet.",
        Cipher::Reverse => "Hint: read it from the other end.",
        Cipher::LetterNumbers => "Hint: each number is a letter's position in the alphabet.",
    }
}

/// Work out which plaintext produced the shown ciphertext.
#[derive(Debug)]
pub struct DecryptMessage {
    pool: Vec<CipherPuzzle>,
    buttons: Vec<NodeId>,
    correct: Option<NodeId>,
}

impl DecryptMessage {
    pub fn new(pool: Vec<CipherPuzzle>) -> Self {
        Self {
            pool,
            buttons: Vec::new(),
            correct: None,
        }
    }
}

impl Task for DecryptMessage {
    fn kind(&self) -> TaskKind {
        TaskKind::DecryptMessage
    }

    fn mount(&mut self, ctx: &mut TaskContext<'_>) {
        ctx.set_title("Decrypt the message");
        let Some(puzzle) = ctx.rng().choose(&self.pool).cloned() else {
            tracing::error!("no messages to choose from");
            return;
        };

        let mut options = puzzle.decoys.clone();
        options.push(puzzle.plaintext.clone());
        ctx.rng().shuffle(&mut options);

        let surface = ctx.surface();
        surface.append(
            NodeSpec::text(puzzle.ciphertext())
                .at(Point::new(40.0, 60.0))
                .tone(Tone::Accent),
        );
        surface.append(
            NodeSpec::text(cipher_hint(puzzle.cipher))
                .at(Point::new(40.0, 100.0))
                .tone(Tone::Muted),
        );
        self.buttons = option_buttons(surface, &options, 160.0);
        self.correct = options
            .iter()
            .position(|o| *o == puzzle.plaintext)
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
    use engine::surface::NodeKind;

    use super::*;
    use crate::tasks::testing::Harness;

    fn reversed() -> Vec<CipherPuzzle> {
        vec![CipherPuzzle {
            plaintext: "smart technologies".into(),
            cipher: Cipher::Reverse,
            decoys: vec!["start technologies".into(), "small technicians".into()],
        }]
    }

    #[test]
    fn shows_ciphertext_and_all_options() {
        let mut h = Harness::new(8);
        let mut task = DecryptMessage::new(reversed());
        h.mount(&mut task);

        assert!(h.surface.texts_of(NodeKind::Text).contains(&"seigolonhcet trams"));
        assert_eq!(h.buttons().len(), 3);
    }

    #[test]
    fn plaintext_is_the_right_answer() {
        let mut h = Harness::new(8);
        let mut task = DecryptMessage::new(reversed());
        h.mount(&mut task);
        let right = h.button("smart technologies");
        h.send(&mut task, PointerEvent::Click { target: right });
        assert_eq!(h.outcome.map(|o| o.success), Some(true));
        assert_eq!(h.surface.node(right).unwrap().tone, Tone::Success);
    }

    #[test]
    fn decoy_fails_and_later_clicks_are_ignored() {
        let mut h = Harness::new(8);
        let mut task = DecryptMessage::new(reversed());
        h.mount(&mut task);
        let wrong = h.button("small technicians");
        let right = h.button("smart technologies");
        h.send(&mut task, PointerEvent::Click { target: wrong });
        h.send(&mut task, PointerEvent::Click { target: right });
        assert_eq!(h.outcome.map(|o| o.success), Some(false));
        assert_eq!(h.surface.node(right).unwrap().tone, Tone::Neutral);
    }
}
