use std::{
    io,
    net::{SocketAddr, TcpListener},
    sync::Arc,
    thread,
    time::Duration,
};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use engine::DEFAULT_FRAME;
use engine::input::PointerEvent;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tower_http::cors::{Any, CorsLayer};

use crate::api::{GameSession, GameSnapshot, LeaderboardSnapshot};
use crate::leaderboard::PromptInput;
use crate::score::{ScoreService, ScoreStore};
use crate::session::{self, SubmissionResult};

pub const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug)]
pub enum RemoteCmd {
    GetState {
        respond: oneshot::Sender<GameSnapshot>,
    },
    Start {
        respond: oneshot::Sender<GameSnapshot>,
    },
    Reset {
        respond: oneshot::Sender<GameSnapshot>,
    },
    Pointer {
        event: PointerEvent,
        respond: oneshot::Sender<GameSnapshot>,
    },
    Prompt {
        input: PromptInput,
        respond: oneshot::Sender<GameSnapshot>,
    },
    GetLeaderboard {
        respond: oneshot::Sender<LeaderboardSnapshot>,
    },
}

#[derive(Clone)]
struct RemoteState {
    tx: mpsc::UnboundedSender<RemoteCmd>,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

async fn health() -> &'static str {
    "ok"
}

async fn send_cmd<T>(
    tx: &mpsc::UnboundedSender<RemoteCmd>,
    cmd: RemoteCmd,
    rx: oneshot::Receiver<T>,
) -> Result<T, (StatusCode, String)> {
    tx.send(cmd).map_err(|_| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "game command channel closed".to_string(),
        )
    })?;

    match tokio::time::timeout(REPLY_TIMEOUT, rx).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(_)) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "game did not respond".to_string(),
        )),
        Err(_) => Err((StatusCode::GATEWAY_TIMEOUT, "game timed out".to_string())),
    }
}

async fn state(State(state): State<RemoteState>) -> ApiResult<GameSnapshot> {
    let (tx, rx) = oneshot::channel();
    let snapshot = send_cmd(&state.tx, RemoteCmd::GetState { respond: tx }, rx).await?;
    Ok(Json(snapshot))
}

async fn start(State(state): State<RemoteState>) -> ApiResult<GameSnapshot> {
    let (tx, rx) = oneshot::channel();
    let snapshot = send_cmd(&state.tx, RemoteCmd::Start { respond: tx }, rx).await?;
    Ok(Json(snapshot))
}

async fn reset(State(state): State<RemoteState>) -> ApiResult<GameSnapshot> {
    let (tx, rx) = oneshot::channel();
    let snapshot = send_cmd(&state.tx, RemoteCmd::Reset { respond: tx }, rx).await?;
    Ok(Json(snapshot))
}

async fn input(
    State(state): State<RemoteState>,
    Json(event): Json<PointerEvent>,
) -> ApiResult<GameSnapshot> {
    let (tx, rx) = oneshot::channel();
    let snapshot = send_cmd(
        &state.tx,
        RemoteCmd::Pointer { event, respond: tx },
        rx,
    )
    .await?;
    Ok(Json(snapshot))
}

async fn prompt(
    State(state): State<RemoteState>,
    Json(input): Json<PromptInput>,
) -> ApiResult<GameSnapshot> {
    let (tx, rx) = oneshot::channel();
    let snapshot = send_cmd(&state.tx, RemoteCmd::Prompt { input, respond: tx }, rx).await?;
    Ok(Json(snapshot))
}

async fn leaderboard(State(state): State<RemoteState>) -> ApiResult<LeaderboardSnapshot> {
    let (tx, rx) = oneshot::channel();
    let board = send_cmd(&state.tx, RemoteCmd::GetLeaderboard { respond: tx }, rx).await?;
    Ok(Json(board))
}

pub fn router(tx: mpsc::UnboundedSender<RemoteCmd>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/state", get(state))
        .route("/api/start", post(start))
        .route("/api/reset", post(reset))
        .route("/api/input", post(input))
        .route("/api/prompt", post(prompt))
        .route("/api/leaderboard", get(leaderboard))
        .with_state(RemoteState { tx })
        .layer(cors)
}

/// Answers one command against the session. A dropped responder means the
/// HTTP side gave up waiting; the command has still been applied.
pub fn handle(session: &mut GameSession, cmd: RemoteCmd) {
    match cmd {
        RemoteCmd::GetState { respond } => {
            let _ = respond.send(session.state());
        }
        RemoteCmd::Start { respond } => {
            let _ = respond.send(session.start());
        }
        RemoteCmd::Reset { respond } => {
            let _ = respond.send(session.reset());
        }
        RemoteCmd::Pointer { event, respond } => {
            let _ = respond.send(session.pointer(event));
        }
        RemoteCmd::Prompt { input, respond } => {
            let _ = respond.send(session.prompt(input));
        }
        RemoteCmd::GetLeaderboard { respond } => {
            let _ = respond.send(session.leaderboard());
        }
    }
}

/// Drives the session in real time until every command sender is gone.
///
/// Frames advance on a 30 ms interval. Confirmed leaderboard entries are
/// handed to the score service on a spawned task and folded back into the
/// game when it answers, so a slow backend never stalls the frame loop.
pub async fn run_game_loop<S>(
    mut session: GameSession,
    mut rx: mpsc::UnboundedReceiver<RemoteCmd>,
    service: Arc<ScoreService<S>>,
    top_n: usize,
) -> GameSession
where
    S: ScoreStore + 'static,
{
    let mut frames = tokio::time::interval(DEFAULT_FRAME);
    frames.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<SubmissionResult>();
    let mut last = Instant::now();

    loop {
        tokio::select! {
            _ = frames.tick() => {
                let now = Instant::now();
                session.elapse(now.saturating_duration_since(last));
                last = now;
            }
            cmd = rx.recv() => match cmd {
                Some(cmd) => handle(&mut session, cmd),
                None => break,
            },
            Some(result) = done_rx.recv() => session.apply_submission(result),
        }

        if let Some(submission) = session.take_pending_submission() {
            let service = service.clone();
            let done = done_tx.clone();
            tokio::spawn(async move {
                let result = session::submit(&*service, submission, top_n).await;
                let _ = done.send(result);
            });
        }
    }

    tracing::info!("command channel closed; game loop stopping");
    session
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteServerInfo {
    pub addr: SocketAddr,
}

pub struct RemoteServer {
    rx: Option<mpsc::UnboundedReceiver<RemoteCmd>>,
    shutdown: Option<oneshot::Sender<()>>,
    pub info: RemoteServerInfo,
}

impl RemoteServer {
    pub fn start(addr: SocketAddr) -> io::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel::<RemoteCmd>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        // Bind synchronously so we can fail fast if the port is unavailable.
        let std_listener = TcpListener::bind(addr)?;
        std_listener.set_nonblocking(true)?;
        let info = RemoteServerInfo {
            addr: std_listener.local_addr()?,
        };

        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()?;

        thread::spawn(move || {
            rt.block_on(async move {
                let listener = match tokio::net::TcpListener::from_std(std_listener) {
                    Ok(listener) => listener,
                    Err(err) => {
                        tracing::error!("control server listener failed: {err}");
                        return;
                    }
                };
                let serve = axum::serve(listener, router(tx)).with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                });

                if let Err(err) = serve.await {
                    tracing::error!("control server error: {err}");
                }
            });
        });

        tracing::info!(addr = %info.addr, "control server listening");
        Ok(Self {
            rx: Some(rx),
            shutdown: Some(shutdown_tx),
            info,
        })
    }

    /// The command stream for the game loop; `None` once taken.
    pub fn take_commands(&mut self) -> Option<mpsc::UnboundedReceiver<RemoteCmd>> {
        self.rx.take()
    }

    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for RemoteServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
