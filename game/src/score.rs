//! Leaderboard persistence.
//!
//! [`ScoreService`] is what the game talks to; it never fails loudly. The
//! [`ScoreStore`] behind it does the actual I/O and reports typed errors.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use engine::net::{HttpClient, NetError};
use engine::rng::Rng;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TABLE: &str = "leaderboard";
pub const DEFAULT_TOP_N: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Net(#[from] NetError),
    #[error("sign-in returned no user")]
    NoUser,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    #[serde(default)]
    pub access_token: Option<String>,
}

/// Row written on submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub user_id: String,
    pub score: u32,
    pub display_name: String,
}

/// Row read back for the top list. Older rows may lack a display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    #[serde(default)]
    pub user_id: Option<String>,
    pub score: u32,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub user_id: String,
    pub score: u32,
    pub display_name: String,
}

#[async_trait]
pub trait ScoreStore: Send + Sync {
    async fn sign_in_anonymously(&self) -> Result<Session, StoreError>;

    async fn insert_score(&self, session: &Session, record: &ScoreRecord) -> Result<(), StoreError>;

    /// Highest scores first, at most `limit` rows.
    async fn top_scores(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError>;
}

/// Lets the backend be picked from config at runtime.
#[async_trait]
impl ScoreStore for Box<dyn ScoreStore> {
    async fn sign_in_anonymously(&self) -> Result<Session, StoreError> {
        (**self).sign_in_anonymously().await
    }

    async fn insert_score(&self, session: &Session, record: &ScoreRecord) -> Result<(), StoreError> {
        (**self).insert_score(session, record).await
    }

    async fn top_scores(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
        (**self).top_scores(limit).await
    }
}

/// Error-swallowing facade over a [`ScoreStore`] that caches the anonymous
/// session for the lifetime of the process.
pub struct ScoreService<S> {
    store: S,
    session: tokio::sync::Mutex<Option<Session>>,
}

impl<S: ScoreStore> ScoreService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            session: tokio::sync::Mutex::new(None),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn session(&self) -> Result<Session, StoreError> {
        let mut cached = self.session.lock().await;
        if let Some(session) = cached.as_ref() {
            return Ok(session.clone());
        }
        let session = self.store.sign_in_anonymously().await?;
        tracing::info!(user_id = %session.user_id, "anonymous session created");
        *cached = Some(session.clone());
        Ok(session)
    }

    pub async fn submit_score(&self, score: u32, display_name: &str) -> Option<SubmitReceipt> {
        let session = match self.session().await {
            Ok(session) => session,
            Err(err) => {
                tracing::error!("anonymous sign-in failed: {err}");
                return None;
            }
        };
        let record = ScoreRecord {
            user_id: session.user_id.clone(),
            score,
            display_name: display_name.to_string(),
        };
        match self.store.insert_score(&session, &record).await {
            Ok(()) => {
                tracing::info!(score, display_name, "score submitted");
                Some(SubmitReceipt {
                    user_id: record.user_id,
                    score,
                    display_name: record.display_name,
                })
            }
            Err(err) => {
                tracing::error!(score, "saving score failed: {err}");
                None
            }
        }
    }

    pub async fn get_top_scores(&self, limit: usize) -> Vec<LeaderboardEntry> {
        match self.store.top_scores(limit).await {
            Ok(mut rows) => {
                rows.sort_by(|a, b| b.score.cmp(&a.score));
                rows.truncate(limit);
                rows
            }
            Err(err) => {
                tracing::error!("loading leaderboard failed: {err}");
                Vec::new()
            }
        }
    }
}

/// Throwaway credentials for an anonymous sign-up.
pub fn anonymous_credentials(rng: &mut Rng) -> (String, String) {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let salt: String = (0..8)
        .map(|_| char::from_digit(rng.below(36) as u32, 36).unwrap_or('0'))
        .collect();
    (
        format!("anonymous_{ts}@temp.com"),
        format!("temp_{ts}_{salt}"),
    )
}

#[derive(Debug, Deserialize)]
struct SignupUser {
    id: String,
}

/// Auth servers answer either `{ user, access_token }` or the bare user when
/// confirmation is pending.
#[derive(Debug, Deserialize)]
struct SignupResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    user: Option<SignupUser>,
    #[serde(default)]
    id: Option<String>,
}

impl SignupResponse {
    /// A usable session needs both a user and a token; a pending
    /// confirmation counts as a failed sign-in.
    fn into_session(self) -> Result<Session, StoreError> {
        let user_id = self
            .user
            .map(|u| u.id)
            .or(self.id)
            .ok_or(StoreError::NoUser)?;
        let access_token = self.access_token.ok_or(StoreError::NoUser)?;
        Ok(Session {
            user_id,
            access_token: Some(access_token),
        })
    }
}

/// URL layout of the hosted backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestEndpoints {
    base_url: String,
    table: String,
}

impl RestEndpoints {
    pub fn new(base_url: &str, table: impl Into<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            table: table.into(),
        }
    }

    pub fn signup_url(&self) -> String {
        format!("{}/auth/v1/signup", self.base_url)
    }

    pub fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    pub fn top_url(&self, limit: usize) -> String {
        format!("{}?select=*&order=score.desc&limit={limit}", self.table_url())
    }
}

/// Hosted Postgres backend with a REST layer and email/password auth.
#[derive(Debug, Clone)]
pub struct RestScoreStore {
    http: HttpClient,
    endpoints: RestEndpoints,
    api_key: String,
}

impl RestScoreStore {
    pub fn new(http: HttpClient, endpoints: RestEndpoints, api_key: impl Into<String>) -> Self {
        Self {
            http,
            endpoints,
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl ScoreStore for RestScoreStore {
    async fn sign_in_anonymously(&self) -> Result<Session, StoreError> {
        let (email, password) = anonymous_credentials(&mut Rng::from_entropy());
        let bearer = format!("Bearer {}", self.api_key);
        let body = serde_json::json!({ "email": email, "password": password });
        let resp = self
            .http
            .post_json(
                &self.endpoints.signup_url(),
                &[("apikey", self.api_key.as_str()), ("authorization", bearer.as_str())],
                &body,
            )
            .await?
            .error_for_status()?;
        resp.json::<SignupResponse>()?.into_session()
    }

    async fn insert_score(&self, session: &Session, record: &ScoreRecord) -> Result<(), StoreError> {
        let token = session.access_token.as_deref().unwrap_or(&self.api_key);
        let bearer = format!("Bearer {token}");
        self.http
            .post_json(
                &self.endpoints.table_url(),
                &[
                    ("apikey", self.api_key.as_str()),
                    ("authorization", bearer.as_str()),
                    ("prefer", "return=minimal"),
                ],
                &[record],
            )
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn top_scores(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let bearer = format!("Bearer {}", self.api_key);
        let resp = self
            .http
            .get(
                &self.endpoints.top_url(limit),
                &[("apikey", self.api_key.as_str()), ("authorization", bearer.as_str())],
            )
            .await?
            .error_for_status()?;
        Ok(resp.json()?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailPoint {
    SignIn,
    Insert,
    Read,
}

#[derive(Debug, Default)]
struct MemoryInner {
    rows: Vec<LeaderboardEntry>,
    sign_ins: u32,
    fail: Option<FailPoint>,
}

/// In-process store for offline play and tests.
#[derive(Debug, Default)]
pub struct MemoryScoreStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<LeaderboardEntry>) -> Self {
        let store = Self::new();
        if let Ok(mut inner) = store.inner.lock() {
            inner.rows = rows;
        }
        store
    }

    /// Makes the given operation fail until cleared with `None`.
    pub fn fail_at(&self, point: Option<FailPoint>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail = point;
        }
    }

    pub fn rows(&self) -> Vec<LeaderboardEntry> {
        self.inner
            .lock()
            .map(|i| i.rows.clone())
            .unwrap_or_default()
    }

    pub fn sign_ins(&self) -> u32 {
        self.inner.lock().map(|i| i.sign_ins).unwrap_or_default()
    }

    fn with_inner<T>(
        &self,
        point: FailPoint,
        f: impl FnOnce(&mut MemoryInner) -> T,
    ) -> Result<T, StoreError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".into()))?;
        if inner.fail == Some(point) {
            return Err(StoreError::Unavailable(format!("injected {point:?} failure")));
        }
        Ok(f(&mut inner))
    }
}

#[async_trait]
impl ScoreStore for MemoryScoreStore {
    async fn sign_in_anonymously(&self) -> Result<Session, StoreError> {
        self.with_inner(FailPoint::SignIn, |inner| {
            inner.sign_ins += 1;
            Session {
                user_id: format!("anon-{}", inner.sign_ins),
                access_token: None,
            }
        })
    }

    async fn insert_score(&self, _session: &Session, record: &ScoreRecord) -> Result<(), StoreError> {
        self.with_inner(FailPoint::Insert, |inner| {
            inner.rows.push(LeaderboardEntry {
                user_id: Some(record.user_id.clone()),
                score: record.score,
                display_name: Some(record.display_name.clone()),
                created_at: None,
            });
        })
    }

    async fn top_scores(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
        self.with_inner(FailPoint::Read, |inner| {
            let mut rows = inner.rows.clone();
            rows.sort_by(|a, b| b.score.cmp(&a.score));
            rows.truncate(limit);
            rows
        })
    }
}
