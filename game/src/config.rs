use std::fs;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use engine::audio::ClipSource;
use serde::{Deserialize, Serialize};

use crate::content::ContentPack;
use crate::orchestrator::GameOptions;
use crate::round::ROUND_DURATION;
use crate::score::{DEFAULT_TABLE, DEFAULT_TOP_N};
use crate::sfx::{CUE_VOLUME, default_clips};

pub const MIN_ROUND: Duration = Duration::from_secs(10);
pub const MAX_ROUND: Duration = Duration::from_secs(3600);
pub const MAX_TOP_N: usize = 100;
pub const DEFAULT_AUDIO_BASE: &str = "./assets/audio";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoundSettings {
    #[serde(with = "crate::serde_duration")]
    pub length: Duration,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for RoundSettings {
    fn default() -> Self {
        Self {
            length: ROUND_DURATION,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AudioSettings {
    pub volume: f32,
    pub mute: bool,
    #[serde(default = "builtin_clips")]
    pub clips: Vec<ClipSource>,
}

fn builtin_clips() -> Vec<ClipSource> {
    default_clips(DEFAULT_AUDIO_BASE)
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            volume: CUE_VOLUME,
            mute: false,
            clips: builtin_clips(),
        }
    }
}

impl AudioSettings {
    pub fn effective_volume(&self) -> f32 {
        if self.mute { 0.0 } else { self.volume }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LeaderboardBackend {
    #[default]
    Memory,
    #[serde(rename_all = "camelCase")]
    Rest {
        url: String,
        api_key: String,
        #[serde(default = "default_table")]
        table: String,
    },
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardSettings {
    #[serde(default)]
    pub backend: LeaderboardBackend,
    pub top_n: usize,
}

impl Default for LeaderboardSettings {
    fn default() -> Self {
        Self {
            backend: LeaderboardBackend::default(),
            top_n: DEFAULT_TOP_N,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 4000)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub round: RoundSettings,
    #[serde(default)]
    pub audio: AudioSettings,
    #[serde(default)]
    pub leaderboard: LeaderboardSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub content_path: Option<PathBuf>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            round: RoundSettings::default(),
            audio: AudioSettings::default(),
            leaderboard: LeaderboardSettings::default(),
            server: ServerSettings::default(),
            content_path: None,
        }
    }
}

impl GameConfig {
    pub fn sanitized(mut self) -> Self {
        self.version = default_version();
        self.round.length = self.round.length.clamp(MIN_ROUND, MAX_ROUND);
        self.audio.volume = self.audio.volume.clamp(0.0, 1.0);
        if self.audio.volume.is_nan() {
            self.audio.volume = CUE_VOLUME;
        }
        self.leaderboard.top_n = self.leaderboard.top_n.clamp(1, MAX_TOP_N);
        self
    }

    pub fn game_options(&self) -> GameOptions {
        GameOptions {
            round_length: self.round.length,
            seed: self.round.seed,
            ..GameOptions::default()
        }
    }

    /// The configured content file, or the built-in pack when it is unset or
    /// unusable.
    pub fn load_content(&self) -> Arc<ContentPack> {
        let Some(path) = self.content_path.as_deref() else {
            return Arc::new(ContentPack::builtin());
        };
        match ContentPack::load(path) {
            Ok(pack) => {
                tracing::info!(path = %path.display(), "content pack loaded");
                Arc::new(pack)
            }
            Err(err) => {
                tracing::error!(path = %path.display(), "content pack rejected, using built-in: {err}");
                Arc::new(ContentPack::builtin())
            }
        }
    }
}

fn default_version() -> u32 {
    1
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    pub fn from_lookup<F>(mut get_env: F) -> Self
    where
        F: FnMut(&str) -> Option<std::ffi::OsString>,
    {
        if let Some(explicit) = get_env("IT_RUSH_CONFIG_PATH") {
            return Self::new(explicit);
        }

        let base = get_env("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| {
                get_env("HOME").map(|home| {
                    let mut p = PathBuf::from(home);
                    p.push(".config");
                    p
                })
            })
            .unwrap_or_else(|| PathBuf::from("."));

        let mut path = base;
        path.push("it-rush");
        path.push("config.json");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> GameConfig {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) => {
                if err.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(path = %self.path.display(), "config unreadable: {err}");
                }
                return GameConfig::default();
            }
        };
        match serde_json::from_slice::<GameConfig>(&bytes) {
            Ok(config) => config.sanitized(),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), "config invalid, using defaults: {err}");
                GameConfig::default()
            }
        }
    }

    pub fn save(&self, config: &GameConfig) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string_pretty(config)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, text)
    }
}
