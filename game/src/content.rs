//! Puzzle content tables.
//!
//! Everything a task needs to build a puzzle lives here as plain data, so the
//! pool can be swapped (or loaded from JSON) without touching task logic.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::tasks::find_bug::tokenize_line;

pub const CONTENT_VERSION: u32 = 1;

/// Marks the faulty span inside a snippet line, e.g. `sum += items[i].[[prize]];`.
pub const BUG_OPEN: &str = "[[";
pub const BUG_CLOSE: &str = "]]";

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("reading content file failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("content json is invalid: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported content version {found} (expected {CONTENT_VERSION})")]
    Version { found: u32 },
    #[error("{pool} pool is empty")]
    EmptyPool { pool: &'static str },
    #[error("{pool} entry `{id}`: {reason}")]
    Invalid {
        pool: &'static str,
        id: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPack {
    pub version: u32,
    pub snippets: Vec<BugSnippet>,
    pub scenarios: Vec<WiringScenario>,
    pub vulnerabilities: Vec<Vulnerability>,
    pub messages: Vec<CipherPuzzle>,
    pub backups: Vec<BackupPuzzle>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BugSnippet {
    pub id: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WiringScenario {
    pub id: String,
    pub title: String,
    pub components: Vec<ComponentSpec>,
    pub required: Vec<EdgeSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    pub id: String,
    pub label: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub info: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub from: String,
    pub to: String,
}

impl EdgeSpec {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vulnerability {
    pub id: String,
    pub title: String,
    pub excerpt: Vec<String>,
    pub fix: String,
    pub decoys: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Cipher {
    Caesar { shift: i32 },
    Reverse,
    LetterNumbers,
}

impl Cipher {
    pub fn apply(self, plaintext: &str) -> String {
        match self {
            Cipher::Caesar { shift } => plaintext.chars().map(|c| caesar(c, shift)).collect(),
            Cipher::Reverse => plaintext.chars().rev().collect(),
            Cipher::LetterNumbers => plaintext
                .split(' ')
                .map(|word| {
                    word.chars()
                        .map(|c| match letter_index(c) {
                            Some(i) => (i + 1).to_string(),
                            None => c.to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join("-")
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

fn letter_index(c: char) -> Option<u32> {
    if c.is_ascii_lowercase() {
        Some(c as u32 - 'a' as u32)
    } else if c.is_ascii_uppercase() {
        Some(c as u32 - 'A' as u32)
    } else {
        None
    }
}

fn caesar(c: char, shift: i32) -> char {
    let base = if c.is_ascii_lowercase() {
        b'a'
    } else if c.is_ascii_uppercase() {
        b'A'
    } else {
        return c;
    };
    let offset = (c as u8 - base) as i32;
    let rotated = (offset + shift).rem_euclid(26) as u8;
    (base + rotated) as char
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CipherPuzzle {
    pub plaintext: String,
    pub cipher: Cipher,
    pub decoys: Vec<String>,
}

impl CipherPuzzle {
    pub fn ciphertext(&self) -> String {
        self.cipher.apply(&self.plaintext)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupPuzzle {
    pub prompt: String,
    pub correct: String,
    pub decoys: Vec<String>,
    /// How many decoys are offered next to the correct action.
    pub decoys_shown: usize,
}

impl Default for ContentPack {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ContentPack {
    pub fn from_json(text: &str) -> Result<Self, ContentError> {
        let pack: ContentPack = serde_json::from_str(text)?;
        pack.validate()?;
        Ok(pack)
    }

    pub fn load(path: &Path) -> Result<Self, ContentError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ContentError> {
        if self.version != CONTENT_VERSION {
            return Err(ContentError::Version {
                found: self.version,
            });
        }
        non_empty("snippet", self.snippets.len())?;
        non_empty("scenario", self.scenarios.len())?;
        non_empty("vulnerability", self.vulnerabilities.len())?;
        non_empty("message", self.messages.len())?;
        non_empty("backup", self.backups.len())?;

        for snippet in &self.snippets {
            check_bug_marker(&snippet.lines)
                .map_err(|reason| invalid("snippet", &snippet.id, reason))?;
        }

        for scenario in &self.scenarios {
            let ids: HashSet<&str> = scenario.components.iter().map(|c| c.id.as_str()).collect();
            if ids.len() != scenario.components.len() {
                return Err(invalid("scenario", &scenario.id, "duplicate component id"));
            }
            if scenario.required.is_empty() {
                return Err(invalid("scenario", &scenario.id, "no required connections"));
            }
            for edge in &scenario.required {
                if !ids.contains(edge.from.as_str()) || !ids.contains(edge.to.as_str()) {
                    return Err(invalid(
                        "scenario",
                        &scenario.id,
                        format!("edge {} -> {} names an unknown component", edge.from, edge.to),
                    ));
                }
                if edge.from == edge.to {
                    return Err(invalid("scenario", &scenario.id, "self-connection required"));
                }
            }
        }

        for vuln in &self.vulnerabilities {
            if vuln.decoys.is_empty() || vuln.decoys.contains(&vuln.fix) {
                return Err(invalid("vulnerability", &vuln.id, "decoys must differ from the fix"));
            }
        }

        for msg in &self.messages {
            if msg.decoys.is_empty() || msg.decoys.contains(&msg.plaintext) {
                return Err(invalid(
                    "message",
                    &msg.plaintext,
                    "decoys must differ from the plaintext",
                ));
            }
        }

        for backup in &self.backups {
            if backup.decoys_shown < 1 || backup.decoys.len() < backup.decoys_shown {
                return Err(invalid(
                    "backup",
                    &backup.prompt,
                    format!(
                        "needs at least {} decoys, has {}",
                        backup.decoys_shown.max(1),
                        backup.decoys.len()
                    ),
                ));
            }
        }
        Ok(())
    }

    pub fn builtin() -> Self {
        Self {
            version: CONTENT_VERSION,
            snippets: builtin_snippets(),
            scenarios: builtin_scenarios(),
            vulnerabilities: builtin_vulnerabilities(),
            messages: builtin_messages(),
            backups: builtin_backups(),
        }
    }
}

/// Exactly one `[[...]]` span, opened and closed on the same line, with no
/// stray or ambiguous brackets around it.
fn check_bug_marker(lines: &[String]) -> Result<(), String> {
    let mut bugs = 0;
    for line in lines {
        if line.contains("[[[") || line.contains("]]]") {
            return Err(format!("ambiguous bug marker in `{line}`"));
        }
        let mut plain = String::new();
        for span in tokenize_line(line) {
            if !span.is_bug {
                plain.push_str(&span.text);
            } else if span.text.trim().is_empty() {
                return Err("bug marker is empty".to_string());
            } else if span.text.contains(BUG_OPEN) {
                return Err(format!("ambiguous bug marker in `{line}`"));
            } else {
                bugs += 1;
            }
        }
        if plain.contains(BUG_OPEN) || plain.contains(BUG_CLOSE) {
            return Err(format!("unclosed bug marker in `{line}`"));
        }
    }
    match bugs {
        1 => Ok(()),
        n => Err(format!("expected exactly one bug marker, found {n}")),
    }
}

fn non_empty(pool: &'static str, len: usize) -> Result<(), ContentError> {
    if len == 0 {
        Err(ContentError::EmptyPool { pool })
    } else {
        Ok(())
    }
}

fn invalid(pool: &'static str, id: &str, reason: impl Into<String>) -> ContentError {
    ContentError::Invalid {
        pool,
        id: id.to_string(),
        reason: reason.into(),
    }
}

fn lines(src: &[&str]) -> Vec<String> {
    src.iter().map(|l| l.to_string()).collect()
}

fn strings(src: &[&str]) -> Vec<String> {
    lines(src)
}

fn builtin_snippets() -> Vec<BugSnippet> {
    vec![
        BugSnippet {
            id: "calculate_total".into(),
            lines: lines(&[
                "function calculateTotal(items) {",
                "  let sum = 0;",
                "  for (let i = 0; i < items.length; i++) {",
                "    sum += items[i].[[prize]];",
                "  }",
                "  return sum;",
                "}",
            ]),
        },
        BugSnippet {
            id: "validate_user".into(),
            lines: lines(&[
                "[[functoin]] validateUser(user) {",
                "  if (user.name && user.email) {",
                "    return true;",
                "  }",
                "  return false;",
                "}",
            ]),
        },
        BugSnippet {
            id: "off_by_one".into(),
            lines: lines(&[
                "function lastScores(scores) {",
                "  const out = [];",
                "  for (let i = 0; i [[<=]] scores.length; i++) {",
                "    out.push(scores[i]);",
                "  }",
                "  return out;",
                "}",
            ]),
        },
        BugSnippet {
            id: "admin_check".into(),
            lines: lines(&[
                "function canDelete(user) {",
                "  if (user.role [[=]] \"admin\") {",
                "    return true;",
                "  }",
                "  return false;",
                "}",
            ]),
        },
        BugSnippet {
            id: "add_numbers".into(),
            lines: lines(&[
                "// adds two numbers",
                "function add(a, b) {",
                "  return a [[-]] b;",
                "}",
            ]),
        },
    ]
}

fn component(id: &str, label: &str, x: f32, y: f32, info: Option<&str>) -> ComponentSpec {
    ComponentSpec {
        id: id.to_string(),
        label: label.to_string(),
        x,
        y,
        info: info.map(str::to_string),
    }
}

fn builtin_scenarios() -> Vec<WiringScenario> {
    vec![
        WiringScenario {
            id: "basic_web".into(),
            title: "Build a basic web architecture".into(),
            components: vec![
                component("client", "Client", 100.0, 200.0, Some("End user; requests data.")),
                component(
                    "web_server",
                    "Web server",
                    300.0,
                    200.0,
                    Some("Handles client requests; may talk to the cache and the database."),
                ),
                component("database", "Database", 500.0, 300.0, Some("Stores persistent data.")),
                component(
                    "cache",
                    "Cache",
                    500.0,
                    100.0,
                    Some("Keeps hot data for fast access."),
                ),
            ],
            required: vec![
                EdgeSpec::new("client", "web_server"),
                EdgeSpec::new("web_server", "client"),
                EdgeSpec::new("web_server", "database"),
                EdgeSpec::new("web_server", "cache"),
                EdgeSpec::new("cache", "web_server"),
            ],
        },
        WiringScenario {
            id: "load_balanced_app".into(),
            title: "Assemble a fault-tolerant app behind a load balancer".into(),
            components: vec![
                component("client", "Client", 50.0, 250.0, None),
                component(
                    "lb",
                    "Load balancer",
                    200.0,
                    250.0,
                    Some("Spreads load across the app servers."),
                ),
                component("app_server1", "App server #1", 350.0, 150.0, None),
                component("app_server2", "App server #2", 350.0, 350.0, None),
                component("database", "Database", 550.0, 250.0, None),
            ],
            required: vec![
                EdgeSpec::new("client", "lb"),
                EdgeSpec::new("lb", "app_server1"),
                EdgeSpec::new("lb", "app_server2"),
                EdgeSpec::new("app_server1", "database"),
                EdgeSpec::new("app_server2", "database"),
                EdgeSpec::new("app_server1", "lb"),
                EdgeSpec::new("app_server2", "lb"),
                EdgeSpec::new("lb", "client"),
            ],
        },
        WiringScenario {
            id: "job_queue".into(),
            title: "Wire up a background job pipeline".into(),
            components: vec![
                component("api", "API", 80.0, 220.0, Some("Accepts uploads and enqueues jobs.")),
                component("queue", "Queue", 260.0, 220.0, Some("Buffers jobs until a worker is free.")),
                component("worker", "Worker", 440.0, 220.0, Some("Processes jobs one at a time.")),
                component("storage", "Object storage", 620.0, 120.0, None),
                component("database", "Database", 620.0, 320.0, None),
            ],
            required: vec![
                EdgeSpec::new("api", "queue"),
                EdgeSpec::new("queue", "worker"),
                EdgeSpec::new("worker", "storage"),
                EdgeSpec::new("worker", "database"),
            ],
        },
    ]
}

fn builtin_vulnerabilities() -> Vec<Vulnerability> {
    vec![
        Vulnerability {
            id: "sql_injection".into(),
            title: "Login lets anyone in with ' OR '1'='1".into(),
            excerpt: lines(&[
                "const sql = \"SELECT * FROM users WHERE name = '\" + name + \"'\";",
                "db.query(sql);",
            ]),
            fix: "Use a parameterized query".into(),
            decoys: strings(&[
                "Hide database error messages",
                "Add a CAPTCHA to the login form",
                "Rename the users table",
            ]),
        },
        Vulnerability {
            id: "open_ssh".into(),
            title: "SSH is open to the whole internet with passwords".into(),
            excerpt: lines(&[
                "sshd:",
                "  port: 22",
                "  allow_from: 0.0.0.0/0",
                "  password_auth: yes",
            ]),
            fix: "Disable password login and allow SSH only from the VPN".into(),
            decoys: strings(&[
                "Move SSH to port 2222",
                "Add a friendly login banner",
                "Reboot the server every night",
            ]),
        },
        Vulnerability {
            id: "stored_xss".into(),
            title: "Comments can run scripts in other users' browsers".into(),
            excerpt: lines(&["commentBox.innerHTML = comment.text;"]),
            fix: "Render the comment as text so HTML is escaped".into(),
            decoys: strings(&[
                "Limit comments to 200 characters",
                "Minify the JavaScript bundle",
                "Add rate limiting to the comment form",
            ]),
        },
        Vulnerability {
            id: "hardcoded_key".into(),
            title: "A live API key was committed to the repository".into(),
            excerpt: lines(&["const API_KEY = \"sk_live_51Hx9...\";", "payments.init(API_KEY);"]),
            fix: "Revoke the key and load a new one from a secret store".into(),
            decoys: strings(&[
                "Encode the key with base64",
                "Rename the variable to something boring",
                "Delete the line in the next commit",
            ]),
        },
    ]
}

fn builtin_messages() -> Vec<CipherPuzzle> {
    vec![
        CipherPuzzle {
            plaintext: "secure the network".into(),
            cipher: Cipher::Caesar { shift: 1 },
            decoys: strings(&["rescue the netball", "secure the netbook", "server the network"]),
        },
        CipherPuzzle {
            plaintext: "deploy on friday".into(),
            cipher: Cipher::Caesar { shift: -1 },
            decoys: strings(&["destroy on friday", "deploy on monday", "debug on friday"]),
        },
        CipherPuzzle {
            plaintext: "smart technologies".into(),
            cipher: Cipher::Reverse,
            decoys: strings(&["start technologies", "smart terminologies", "small technicians"]),
        },
        CipherPuzzle {
            plaintext: "hello world".into(),
            cipher: Cipher::LetterNumbers,
            decoys: strings(&["help the world", "hello words", "yellow world"]),
        },
        CipherPuzzle {
            plaintext: "backup your data".into(),
            cipher: Cipher::Caesar { shift: 3 },
            decoys: strings(&["back up your dad", "backlog your data", "backup your date"]),
        },
    ]
}

fn builtin_backups() -> Vec<BackupPuzzle> {
    vec![
        BackupPuzzle {
            prompt: "Urgent! The server is down. What do you do?!".into(),
            correct: "Backup (yesterday, 23:00, stable)".into(),
            decoys: strings(&[
                "Backup (today, 02:00, corrupted!)",
                "Windows restore point (software conflict)",
                "Format drive C:",
            ]),
            decoys_shown: 2,
        },
        BackupPuzzle {
            prompt: "Someone dropped the orders table in production. Now what?".into(),
            correct: "Restore last night's snapshot and replay the transaction log".into(),
            decoys: strings(&[
                "Recreate the table empty and hope nobody notices",
                "Ask customers to place their orders again",
                "Restore the dump from three months ago",
            ]),
            decoys_shown: 2,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_pack_is_valid() {
        ContentPack::builtin().validate().expect("builtin content validates");
    }

    #[test]
    fn caesar_wraps_and_keeps_punctuation() {
        assert_eq!(Cipher::Caesar { shift: 1 }.apply("xyz, Z!"), "yza, A!");
        assert_eq!(Cipher::Caesar { shift: -1 }.apply("abc"), "zab");
        assert_eq!(Cipher::Caesar { shift: 27 }.apply("a"), "b");
    }

    #[test]
    fn reverse_reverses_characters() {
        assert_eq!(Cipher::Reverse.apply("smart technologies"), "seigolonhcet trams");
    }

    #[test]
    fn letter_numbers_use_dashes_within_words() {
        assert_eq!(Cipher::LetterNumbers.apply("hello world"), "8-5-12-12-15 23-15-18-12-4");
        assert_eq!(Cipher::LetterNumbers.apply("a1"), "1-1");
    }

    #[test]
    fn json_round_trip_keeps_the_pack() {
        let pack = ContentPack::builtin();
        let json = serde_json::to_string(&pack).expect("serialize");
        assert_eq!(ContentPack::from_json(&json).expect("parse"), pack);
    }

    #[test]
    fn snippet_without_a_bug_is_rejected() {
        let mut pack = ContentPack::builtin();
        pack.snippets[0].lines = lines(&["let ok = 1;"]);
        match pack.validate() {
            Err(ContentError::Invalid { pool, id, .. }) => {
                assert_eq!(pool, "snippet");
                assert_eq!(id, "calculate_total");
            }
            other => panic!("expected invalid snippet, got {other:?}"),
        }
    }

    fn snippet_error(first: &[&str]) -> String {
        let mut pack = ContentPack::builtin();
        pack.snippets[0].lines = lines(first);
        match pack.validate() {
            Err(ContentError::Invalid { pool, reason, .. }) => {
                assert_eq!(pool, "snippet");
                reason
            }
            other => panic!("expected invalid snippet, got {other:?}"),
        }
    }

    #[test]
    fn bug_marker_split_across_lines_is_rejected() {
        let reason = snippet_error(&["let a = [[foo", "bar]];"]);
        assert!(reason.contains("unclosed"), "{reason}");
    }

    #[test]
    fn nested_brackets_inside_a_marker_are_rejected() {
        let reason = snippet_error(&["let x = [[items[i]]];"]);
        assert!(reason.contains("ambiguous"), "{reason}");
    }

    #[test]
    fn two_bug_markers_are_rejected() {
        let reason = snippet_error(&["let [[a]] = [[b]];"]);
        assert!(reason.contains("found 2"), "{reason}");
    }

    #[test]
    fn empty_bug_marker_is_rejected() {
        let reason = snippet_error(&["let a = [[]];"]);
        assert!(reason.contains("empty"), "{reason}");
    }

    #[test]
    fn unknown_edge_endpoint_is_rejected() {
        let mut pack = ContentPack::builtin();
        pack.scenarios[0].required.push(EdgeSpec::new("client", "mainframe"));
        assert!(matches!(pack.validate(), Err(ContentError::Invalid { pool: "scenario", .. })));
    }

    #[test]
    fn wrong_version_is_rejected() {
        let mut pack = ContentPack::builtin();
        pack.version = 99;
        assert!(matches!(pack.validate(), Err(ContentError::Version { found: 99 })));
    }

    #[test]
    fn backups_need_enough_decoys() {
        let mut pack = ContentPack::builtin();
        pack.backups[0].decoys.truncate(1);
        assert!(pack.validate().is_err());
    }

    #[test]
    fn empty_pool_is_reported_by_name() {
        let mut pack = ContentPack::builtin();
        pack.messages.clear();
        assert!(matches!(
            pack.validate(),
            Err(ContentError::EmptyPool { pool: "message" })
        ));
    }
}
