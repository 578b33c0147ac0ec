use engine::input::Key;
use serde::{Deserialize, Serialize};

use crate::score::LeaderboardEntry;

pub const DEFAULT_DISPLAY_NAME: &str = "Anonymous";
pub const MAX_NAME_CHARS: usize = 20;

/// Trims, caps at 20 characters and falls back to "Anonymous".
pub fn sanitize_display_name(raw: &str) -> String {
    let name: String = raw.trim().chars().take(MAX_NAME_CHARS).collect();
    let name = name.trim_end();
    if name.is_empty() {
        DEFAULT_DISPLAY_NAME.to_string()
    } else {
        name.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRow {
    pub rank: usize,
    pub name: String,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamePrompt {
    pub score: u32,
    pub text: String,
    pub submitting: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PromptInput {
    Key { key: Key },
    SetText { text: String },
    Save,
    ClickOutside,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOutcome {
    /// Still editing, or the input did not apply.
    Pending,
    Submit { score: u32, display_name: String },
    Cancelled,
}

/// The top list plus the post-round name prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardView {
    entries: Vec<LeaderboardEntry>,
    prompt: Option<NamePrompt>,
}

impl LeaderboardView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_entries(&mut self, entries: Vec<LeaderboardEntry>) {
        self.entries = entries;
    }

    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    pub fn rows(&self) -> Vec<LeaderboardRow> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| LeaderboardRow {
                rank: i + 1,
                name: e
                    .display_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .unwrap_or(DEFAULT_DISPLAY_NAME)
                    .to_string(),
                score: e.score,
            })
            .collect()
    }

    pub fn prompt(&self) -> Option<&NamePrompt> {
        self.prompt.as_ref()
    }

    pub fn is_prompt_open(&self) -> bool {
        self.prompt.is_some()
    }

    pub fn open_prompt(&mut self, score: u32) {
        self.prompt = Some(NamePrompt {
            score,
            text: String::new(),
            submitting: false,
        });
    }

    /// Closes the prompt once the store has answered, whatever the answer.
    pub fn close_prompt(&mut self) {
        self.prompt = None;
    }

    pub fn handle(&mut self, input: PromptInput) -> PromptOutcome {
        let Some(prompt) = self.prompt.as_mut() else {
            return PromptOutcome::Pending;
        };
        if prompt.submitting {
            tracing::debug!("submission in flight; ignoring prompt input");
            return PromptOutcome::Pending;
        }
        match input {
            PromptInput::Key { key: Key::Char(c) } => {
                if prompt.text.chars().count() < MAX_NAME_CHARS {
                    prompt.text.push(c);
                }
                PromptOutcome::Pending
            }
            PromptInput::Key { key: Key::Backspace } => {
                prompt.text.pop();
                PromptOutcome::Pending
            }
            PromptInput::SetText { text } => {
                prompt.text = text.chars().take(MAX_NAME_CHARS).collect();
                PromptOutcome::Pending
            }
            PromptInput::Key { key: Key::Enter } | PromptInput::Save => {
                prompt.submitting = true;
                PromptOutcome::Submit {
                    score: prompt.score,
                    display_name: sanitize_display_name(&prompt.text),
                }
            }
            PromptInput::ClickOutside => {
                self.prompt = None;
                PromptOutcome::Cancelled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(view: &mut LeaderboardView, text: &str) {
        for c in text.chars() {
            view.handle(PromptInput::Key { key: Key::Char(c) });
        }
    }

    #[test]
    fn blank_names_become_anonymous() {
        assert_eq!(sanitize_display_name(""), "Anonymous");
        assert_eq!(sanitize_display_name("   "), "Anonymous");
        assert_eq!(sanitize_display_name("  Ada "), "Ada");
    }

    #[test]
    fn long_names_keep_the_first_twenty_chars() {
        let name = "abcdefghijklmnopqrstuvwxy";
        assert_eq!(sanitize_display_name(name), "abcdefghijklmnopqrst");
    }

    #[test]
    fn typing_is_capped_at_twenty() {
        let mut view = LeaderboardView::new();
        view.open_prompt(700);
        typed(&mut view, &"z".repeat(25));
        assert_eq!(view.prompt().unwrap().text.len(), MAX_NAME_CHARS);
    }

    #[test]
    fn enter_submits_once() {
        let mut view = LeaderboardView::new();
        view.open_prompt(700);
        typed(&mut view, "Grace");
        let first = view.handle(PromptInput::Key { key: Key::Enter });
        assert_eq!(
            first,
            PromptOutcome::Submit {
                score: 700,
                display_name: "Grace".into()
            }
        );
        assert_eq!(view.handle(PromptInput::Save), PromptOutcome::Pending);
        assert_eq!(view.handle(PromptInput::ClickOutside), PromptOutcome::Pending);
    }

    #[test]
    fn click_outside_cancels() {
        let mut view = LeaderboardView::new();
        view.open_prompt(10);
        typed(&mut view, "x");
        assert_eq!(view.handle(PromptInput::ClickOutside), PromptOutcome::Cancelled);
        assert!(!view.is_prompt_open());
        assert_eq!(view.handle(PromptInput::Save), PromptOutcome::Pending);
    }

    #[test]
    fn rows_fill_in_missing_names() {
        let mut view = LeaderboardView::new();
        view.set_entries(vec![
            LeaderboardEntry {
                user_id: None,
                score: 900,
                display_name: Some("Linus".into()),
                created_at: None,
            },
            LeaderboardEntry {
                user_id: None,
                score: 400,
                display_name: None,
                created_at: None,
            },
        ]);
        let rows = view.rows();
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[1].name, "Anonymous");
        assert_eq!(rows[1].score, 400);
    }

    #[test]
    fn prompt_input_uses_tagged_json() {
        let input: PromptInput =
            serde_json::from_str(r#"{"type":"key","key":{"type":"char","value":"a"}}"#).unwrap();
        assert_eq!(input, PromptInput::Key { key: Key::Char('a') });
    }
}
