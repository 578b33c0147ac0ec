pub mod api;
pub mod config;
pub mod content;
pub mod leaderboard;
pub mod orchestrator;
pub mod remote;
pub mod round;
pub mod score;
pub mod serde_duration;
pub mod session;
pub mod sfx;
pub mod tasks;
pub mod view;
