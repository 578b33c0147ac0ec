use std::collections::HashMap;

use engine::input::PointerEvent;
use engine::surface::{NodeId, NodeKind, NodeSpec, Point, Tone};

use super::{Task, TaskContext, TaskKind};
use crate::content::{BUG_CLOSE, BUG_OPEN, BugSnippet};

const CHAR_WIDTH: f32 = 9.0;
const LINE_HEIGHT: f32 = 22.0;
const CODE_TOP: f32 = 60.0;
const CODE_LEFT: f32 = 40.0;

const OPERATORS: [&str; 14] = [
    "===", "!==", "==", "!=", "<=", ">=", "=>", "&&", "||", "++", "--", "+=", "-=", "*=",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Code,
    Comment,
    Space,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub kind: SpanKind,
    pub is_bug: bool,
}

impl Span {
    fn new(text: impl Into<String>, kind: SpanKind) -> Self {
        Self {
            text: text.into(),
            kind,
            is_bug: false,
        }
    }

    pub fn clickable(&self) -> bool {
        self.kind == SpanKind::Code
    }
}

/// Splits one snippet line into spans. The `[[...]]` region, if any, becomes
/// a single clickable bug span with the markers stripped.
pub fn tokenize_line(line: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut rest = line;
    while let Some(open) = rest.find(BUG_OPEN) {
        let after = &rest[open + BUG_OPEN.len()..];
        let Some(close) = after.find(BUG_CLOSE) else {
            break;
        };
        tokenize_plain(&rest[..open], &mut spans);
        spans.push(Span {
            text: after[..close].to_string(),
            kind: SpanKind::Code,
            is_bug: true,
        });
        rest = &after[close + BUG_CLOSE.len()..];
    }
    tokenize_plain(rest, &mut spans);
    spans
}

fn tokenize_plain(src: &str, out: &mut Vec<Span>) {
    let mut rest = src;
    while let Some(c) = rest.chars().next() {
        if rest.starts_with("//") {
            out.push(Span::new(rest, SpanKind::Comment));
            return;
        }
        let len = if c.is_whitespace() {
            let n = rest.find(|ch: char| !ch.is_whitespace()).unwrap_or(rest.len());
            out.push(Span::new(&rest[..n], SpanKind::Space));
            rest = &rest[n..];
            continue;
        } else if c == '"' || c == '\'' {
            rest[1..].find(c).map(|end| end + 2).unwrap_or(rest.len())
        } else if is_word_char(c) {
            rest.find(|ch: char| !is_word_char(ch)).unwrap_or(rest.len())
        } else if let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            op.len()
        } else {
            c.len_utf8()
        };
        out.push(Span::new(&rest[..len], SpanKind::Code));
        rest = &rest[len..];
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Click the faulty token in a short code snippet.
#[derive(Debug)]
pub struct FindBug {
    snippets: Vec<BugSnippet>,
    tokens: HashMap<NodeId, bool>,
}

impl FindBug {
    pub fn new(snippets: Vec<BugSnippet>) -> Self {
        Self {
            snippets,
            tokens: HashMap::new(),
        }
    }
}

impl Task for FindBug {
    fn kind(&self) -> TaskKind {
        TaskKind::FindBug
    }

    fn mount(&mut self, ctx: &mut TaskContext<'_>) {
        ctx.set_title("Find the bug in the code");
        let Some(snippet) = ctx.rng().choose(&self.snippets).cloned() else {
            tracing::error!("no code snippets to choose from");
            return;
        };
        tracing::debug!(snippet = %snippet.id, "bug hunt mounted");

        self.tokens.clear();
        let surface = ctx.surface();
        surface.append(
            NodeSpec::text("Click the token that contains the error.")
                .at(Point::new(CODE_LEFT, 24.0))
                .tone(Tone::Muted),
        );
        for (row, line) in snippet.lines.iter().enumerate() {
            let y = CODE_TOP + row as f32 * LINE_HEIGHT;
            let mut column = 0usize;
            for span in tokenize_line(line) {
                let at = Point::new(CODE_LEFT + column as f32 * CHAR_WIDTH, y);
                column += span.text.chars().count();
                if span.kind == SpanKind::Space {
                    continue;
                }
                if span.clickable() {
                    let id = surface.append(
                        NodeSpec::new(NodeKind::Token, span.text)
                            .at(at)
                            .group(row as u32),
                    );
                    self.tokens.insert(id, span.is_bug);
                } else {
                    surface.append(
                        NodeSpec::text(span.text)
                            .at(at)
                            .group(row as u32)
                            .tone(Tone::Muted)
                            .disabled(),
                    );
                }
            }
        }
    }

    fn on_input(&mut self, event: &PointerEvent, ctx: &mut TaskContext<'_>) {
        let PointerEvent::Click { target } = event else {
            return;
        };
        let Some(&is_bug) = self.tokens.get(target) else {
            return;
        };
        if ctx.is_completed() {
            return;
        }
        let surface = ctx.surface();
        surface.set_tone(*target, if is_bug { Tone::Success } else { Tone::Error });
        if is_bug {
            if let Some(node) = surface.node_mut(*target) {
                node.struck = true;
            }
        }
        for id in self.tokens.keys() {
            surface.set_enabled(*id, false);
        }
        ctx.answer(is_bug);
    }
}
