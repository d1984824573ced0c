//! PAGI Brand Voice Gateway: JSON API over the conversation engine.
//! One `Session` per id; turns of a session are serialized by its mutex.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use dashmap::DashMap;
use pagi_brandvoice_core::{
    ChatEngine, ChatMessage, ComposeError, Feedback, GenerationErrorKind, RatingOutcome, Session, SessionError,
    TurnOutcome,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Idle lifetime used by [`AppState::new`].
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(30 * 60);

struct SessionEntry {
    session: Arc<Mutex<Session>>,
    touched: Instant,
}

pub struct AppState {
    engine: Arc<ChatEngine>,
    sessions: DashMap<Uuid, SessionEntry>,
    idle_timeout: Duration,
}

impl AppState {
    pub fn new(engine: ChatEngine) -> Self {
        Self::with_idle_timeout(engine, DEFAULT_SESSION_IDLE)
    }

    /// Sessions not touched for `idle_timeout` are dropped on the next session creation.
    pub fn with_idle_timeout(engine: ChatEngine, idle_timeout: Duration) -> Self {
        Self {
            engine: Arc::new(engine),
            sessions: DashMap::new(),
            idle_timeout,
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Drops idle sessions. Returns how many were removed.
    pub fn evict_idle(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| entry.touched.elapsed() < self.idle_timeout);
        before.saturating_sub(self.sessions.len())
    }

    fn insert(&self, id: Uuid, session: Session) {
        self.sessions.insert(
            id,
            SessionEntry {
                session: Arc::new(Mutex::new(session)),
                touched: Instant::now(),
            },
        );
    }

    fn remove(&self, id: Uuid) -> Result<(), ApiError> {
        self.sessions
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("unknown session {}", id)))
    }

    /// Handle for `id`, refreshing its idle clock.
    fn session(&self, id: Uuid) -> Result<Arc<Mutex<Session>>, ApiError> {
        let mut entry = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("unknown session {}", id)))?;
        entry.touched = Instant::now();
        Ok(Arc::clone(&entry.session))
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/modes", get(list_modes))
        .route("/api/v1/sessions", post(create_session))
        .route("/api/v1/sessions/:id", get(get_session).delete(delete_session))
        .route("/api/v1/sessions/:id/mode", put(select_mode).delete(change_mode))
        .route("/api/v1/sessions/:id/messages", post(submit_message).delete(clear_messages))
        .route("/api/v1/sessions/:id/feedback", post(rate_message))
        .with_state(state)
        .layer(axum::middleware::from_fn(log_requests))
}

async fn log_requests(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    tracing::info!(%method, %path, status = response.status().as_u16(), "[BRANDVOICE] request served");
    response
}

// ---------- errors ----------

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        let status = match &e {
            SessionError::ModeNotSelected | SessionError::NotRateable(_) => StatusCode::CONFLICT,
            SessionError::EmptyInput | SessionError::Compose(ComposeError::UnknownMode(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        };
        Self::new(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

// ---------- wire types ----------

#[derive(Serialize)]
struct SessionView {
    id: Uuid,
    mode: Option<String>,
    messages: Vec<ChatMessage>,
    /// Index of the reply that accepts a rating, if any.
    rateable: Option<usize>,
}

impl SessionView {
    fn of(id: Uuid, session: &Session) -> Self {
        Self {
            id,
            mode: session.mode().map(str::to_string),
            messages: session.messages().to_vec(),
            rateable: session.latest_rateable(),
        }
    }
}

#[derive(Deserialize)]
struct ModeBody {
    mode: String,
}

#[derive(Deserialize)]
struct MessageBody {
    text: String,
}

#[derive(Serialize)]
struct Notice {
    kind: GenerationErrorKind,
    message: String,
}

#[derive(Serialize)]
struct TurnResponse {
    message_index: usize,
    message: ChatMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<Notice>,
}

#[derive(Deserialize)]
struct FeedbackBody {
    message_index: usize,
    #[serde(flatten)]
    feedback: Feedback,
}

// ---------- handlers ----------

async fn health() -> &'static str {
    "OK"
}

async fn list_modes(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "modes": state.engine.composer().modes() }))
}

async fn create_session(State(state): State<Arc<AppState>>) -> (StatusCode, Json<SessionView>) {
    let evicted = state.evict_idle();
    if evicted > 0 {
        tracing::info!(evicted, "idle sessions dropped");
    }
    let session = state.engine.start_session().await;
    let id = Uuid::new_v4();
    let view = SessionView::of(id, &session);
    state.insert(id, session);
    tracing::info!(session = %id, "session started");
    (StatusCode::CREATED, Json(view))
}

async fn delete_session(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    state.remove(id)?;
    tracing::info!(session = %id, "session ended");
    Ok(StatusCode::NO_CONTENT)
}

async fn get_session(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<Json<SessionView>, ApiError> {
    let handle = state.session(id)?;
    let session = handle.lock().await;
    Ok(Json(SessionView::of(id, &session)))
}

async fn select_mode(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<ModeBody>,
) -> Result<Json<SessionView>, ApiError> {
    let handle = state.session(id)?;
    let mut session = handle.lock().await;
    state.engine.select_mode(&mut session, body.mode.trim())?;
    Ok(Json(SessionView::of(id, &session)))
}

async fn change_mode(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<Json<SessionView>, ApiError> {
    let handle = state.session(id)?;
    let mut session = handle.lock().await;
    session.change_mode();
    Ok(Json(SessionView::of(id, &session)))
}

async fn submit_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<MessageBody>,
) -> Result<Json<TurnResponse>, ApiError> {
    let handle = state.session(id)?;
    let mut session = handle.lock().await;
    let outcome = state.engine.submit(&mut session, &body.text).await?;

    let message_index = outcome.message_index();
    let notice = match &outcome {
        TurnOutcome::Replied { .. } => None,
        TurnOutcome::Failed { error, .. } => Some(Notice {
            kind: error.kind(),
            message: error.user_notice(),
        }),
    };
    let message = session
        .messages()
        .get(message_index)
        .cloned()
        .ok_or_else(|| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "reply missing from history"))?;
    Ok(Json(TurnResponse {
        message_index,
        message,
        notice,
    }))
}

async fn clear_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let handle = state.session(id)?;
    let mut session = handle.lock().await;
    session.clear_conversation();
    Ok(Json(SessionView::of(id, &session)))
}

async fn rate_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<FeedbackBody>,
) -> Result<Json<RatingOutcome>, ApiError> {
    let handle = state.session(id)?;
    let mut session = handle.lock().await;
    let outcome = state.engine.rate(&mut session, body.message_index, body.feedback).await?;
    Ok(Json(outcome))
}
