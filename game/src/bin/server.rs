use std::{env, io, net::SocketAddr, sync::Arc};

use engine::audio::{RodioOutput, SoundBank};
use engine::net::{HttpClient, NetError};
use it_rush::api::GameSession;
use it_rush::config::{ConfigStore, GameConfig, LeaderboardBackend};
use it_rush::orchestrator::Game;
use it_rush::remote::{RemoteServer, run_game_loop};
use it_rush::score::{MemoryScoreStore, RestEndpoints, RestScoreStore, ScoreService, ScoreStore};
use it_rush::session;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum ServerError {
    #[error("control server: {0}")]
    Io(#[from] io::Error),
    #[error("leaderboard backend: {0}")]
    Net(#[from] NetError),
}

fn resolve_addr<F>(config: &GameConfig, mut get_env: F) -> SocketAddr
where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(addr) = get_env("IT_RUSH_ADDR").and_then(|v| v.parse().ok()) {
        return addr;
    }

    if let Some(port) = get_env("IT_RUSH_PORT").and_then(|v| v.parse::<u16>().ok()) {
        return SocketAddr::from(([127, 0, 0, 1], port));
    }

    config.server.addr
}

fn score_store(config: &GameConfig) -> Result<Box<dyn ScoreStore>, ServerError> {
    match &config.leaderboard.backend {
        LeaderboardBackend::Memory => {
            tracing::info!("leaderboard kept in memory");
            Ok(Box::new(MemoryScoreStore::new()))
        }
        LeaderboardBackend::Rest {
            url,
            api_key,
            table,
        } => {
            tracing::info!(%url, %table, "leaderboard backed by rest service");
            let http = HttpClient::new()?;
            Ok(Box::new(RestScoreStore::new(
                http,
                RestEndpoints::new(url, table.clone()),
                api_key.clone(),
            )))
        }
    }
}

async fn sound_bank(config: &GameConfig) -> SoundBank {
    if config.audio.mute {
        return SoundBank::silent();
    }
    let mut bank = match RodioOutput::try_default(config.audio.effective_volume()) {
        Ok(output) => SoundBank::new(Box::new(output)),
        Err(err) => {
            tracing::warn!("no audio output, continuing silently: {err}");
            return SoundBank::silent();
        }
    };
    bank.load_all(&config.audio.clips).await;
    bank
}

async fn run() -> Result<(), ServerError> {
    let store = ConfigStore::from_env();
    let config = store.load();
    tracing::info!(path = %store.path().display(), "config resolved");

    let addr = resolve_addr(&config, |k| env::var(k).ok());
    let service = Arc::new(ScoreService::new(score_store(&config)?));
    let top_n = config.leaderboard.top_n;

    let game = Game::new(
        config.game_options(),
        config.load_content(),
        sound_bank(&config).await,
    );
    let mut session = GameSession::new(game);
    session::refresh_leaderboard(session.game_mut(), &*service, top_n).await;

    let mut server = RemoteServer::start(addr)?;
    if let Some(rx) = server.take_commands() {
        tokio::select! {
            _ = run_game_loop(session, rx, service, top_n) => {}
            _ = tokio::signal::ctrl_c() => tracing::info!("interrupted"),
        }
    }
    server.shutdown();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = run().await {
        tracing::error!("it-rush-server failed: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_addr_defaults_to_config() {
        let addr = resolve_addr(&GameConfig::default(), |_| None);
        assert_eq!(addr, "127.0.0.1:4000".parse().unwrap());
    }

    #[test]
    fn resolve_addr_prefers_explicit_addr() {
        let addr = resolve_addr(&GameConfig::default(), |k| match k {
            "IT_RUSH_ADDR" => Some("0.0.0.0:4555".to_string()),
            _ => None,
        });
        assert_eq!(addr, "0.0.0.0:4555".parse().unwrap());
    }

    #[test]
    fn resolve_addr_ignores_invalid_addr_but_uses_valid_port() {
        let addr = resolve_addr(&GameConfig::default(), |k| match k {
            "IT_RUSH_ADDR" => Some("not-an-addr".to_string()),
            "IT_RUSH_PORT" => Some("4557".to_string()),
            _ => None,
        });
        assert_eq!(addr, SocketAddr::from(([127, 0, 0, 1], 4557)));
    }

    #[test]
    fn memory_backend_needs_no_network() {
        assert!(score_store(&GameConfig::default()).is_ok());
    }
}
