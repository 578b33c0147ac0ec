use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use it_rush::api::GameSession;
use it_rush::orchestrator::{Game, GameOptions};
use it_rush::remote::{RemoteCmd, router, run_game_loop};
use it_rush::score::{MemoryScoreStore, ScoreService};
use it_rush::tasks::TaskKind;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::task::LocalSet;
use tower::ServiceExt;

fn session(round_secs: u64) -> GameSession {
    GameSession::new(Game::headless(GameOptions {
        seed: Some(9),
        round_length: Duration::from_secs(round_secs),
        task_pool: vec![TaskKind::DecryptMessage],
        ..GameOptions::default()
    }))
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn health_answers_without_the_game() {
    let (tx, _rx) = mpsc::unbounded_channel::<RemoteCmd>();
    let app = router(tx);
    let resp = app
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn stopped_game_is_service_unavailable() {
    let (tx, rx) = mpsc::unbounded_channel::<RemoteCmd>();
    drop(rx);
    let (status, _) = call(&router(tx), "GET", "/api/state", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test(start_paused = true)]
async fn a_round_played_over_http() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let (tx, rx) = mpsc::unbounded_channel();
            let service = Arc::new(ScoreService::new(MemoryScoreStore::new()));
            let game_loop = tokio::task::spawn_local(run_game_loop(session(2), rx, service.clone(), 10));
            let app = router(tx);

            let (status, state) = call(&app, "GET", "/api/state", None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(state["screen"], "start");

            let (_, state) = call(&app, "POST", "/api/start", None).await;
            assert_eq!(state["screen"], "playing");
            assert_eq!(state["task"], "decryptMessage");
            assert_eq!(state["hud"]["timer"], "Time: 0:02");

            let (status, _) = call(&app, "POST", "/api/input", Some(json!({ "type": "leave" }))).await;
            assert_eq!(status, StatusCode::OK);

            let (status, _) = call(&app, "POST", "/api/input", Some(json!({ "type": "bogus" }))).await;
            assert!(status.is_client_error());

            tokio::time::sleep(Duration::from_millis(2500)).await;
            let (_, state) = call(&app, "GET", "/api/state", None).await;
            assert_eq!(state["screen"], "result");
            assert_eq!(state["leaderboard"]["prompt"]["score"], 0);

            call(&app, "POST", "/api/prompt", Some(json!({ "type": "setText", "text": "Grace" }))).await;
            let (_, state) = call(&app, "POST", "/api/prompt", Some(json!({ "type": "save" }))).await;
            assert_eq!(state["leaderboard"]["prompt"]["submitting"], true);

            let mut rows = Value::Null;
            for _ in 0..20 {
                tokio::time::sleep(Duration::from_millis(30)).await;
                let (_, board) = call(&app, "GET", "/api/leaderboard", None).await;
                if board["prompt"].is_null() {
                    rows = board["rows"].clone();
                    break;
                }
            }
            assert_eq!(rows[0]["name"], "Grace");
            assert_eq!(rows[0]["rank"], 1);

            drop(app);
            let session = game_loop.await.unwrap();
            assert!(session.game().is_round_closed());
            assert_eq!(service.store().rows().len(), 1);
        })
        .await;
}
