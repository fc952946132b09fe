use crate::error::ApiError;
use crate::types::{
    CheckinResponse, DashboardResponse, PhotoUpload, RecordingResponse, RecordingUpload,
    ResetResponse, SessionResponse, TrendQuery, TrendResponse,
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use moodlog_core::{
    CheckinSession, Choice, Emotion, Entry, Insights, PipelineSettings, Services, TrendSeries,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::CorsLayer;

type SessionHandle = Arc<Mutex<CheckinSession>>;

/// Shared state for the gateway server.
#[derive(Clone)]
struct AppState {
    services: Services,
    settings: PipelineSettings,
    /// At most one check-in in progress per user.
    sessions: Arc<RwLock<HashMap<String, SessionHandle>>>,
}

/// HTTP front end for the check-in flow and the dashboard.
pub struct GatewayServer {
    state: AppState,
    host: String,
    port: u16,
}

impl GatewayServer {
    pub fn new(services: Services, settings: PipelineSettings, host: &str, port: u16) -> Self {
        Self {
            state: AppState {
                services,
                settings,
                sessions: Arc::new(RwLock::new(HashMap::new())),
            },
            host: host.to_string(),
            port,
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/users/:user/dashboard", get(dashboard))
            .route("/users/:user/trend", get(trend))
            .route("/users/:user/checkin", post(start_checkin).delete(abandon_checkin))
            .route("/users/:user/checkin/photo", put(upload_photo))
            .route("/users/:user/checkin/recording", put(upload_recording))
            .route("/users/:user/checkin/submit", post(submit))
            .route("/users/:user/checkin/confirm", post(confirm))
            .route("/users/:user/checkin/reject", post(reject))
            .route("/users/:user/checkin/retry", post(retry_save))
            .route("/users/:user/entries/today", axum::routing::delete(reset_today))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Bind and serve until the task is dropped.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        let app = self.router();
        let addr = format!("{}:{}", self.host, self.port);
        tokio::spawn(async move {
            let listener = match tokio::net::TcpListener::bind(&addr).await {
                Ok(l) => l,
                Err(e) => {
                    tracing::error!("Gateway failed to bind {}: {}", addr, e);
                    return;
                }
            };
            tracing::info!("Gateway listening on {}", addr);
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("Gateway server error: {}", e);
            }
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

impl AppState {
    async fn session(&self, user: &str) -> Result<SessionHandle, ApiError> {
        self.sessions
            .read()
            .await
            .get(user)
            .cloned()
            .ok_or_else(|| ApiError::NoSession(user.to_string()))
    }

    /// Drop the user's session if it is still `handle`; a newer check-in
    /// started meanwhile is left alone.
    async fn end_session(&self, user: &str, handle: &SessionHandle) {
        let mut sessions = self.sessions.write().await;
        if sessions.get(user).is_some_and(|current| Arc::ptr_eq(current, handle)) {
            sessions.remove(user);
        }
    }

    async fn insights(&self, user: &str) -> Result<(Vec<Entry>, Insights), ApiError> {
        let entries = self.services.store.list(user).await?;
        let insights = Insights::compute(&entries, self.settings.clock.today());
        Ok((entries, insights))
    }
}

fn decode(field: &str, data: &str) -> Result<Vec<u8>, ApiError> {
    // Browsers send data URLs; keep only the payload.
    let payload = data.split_once(',').map_or(data, |(_, rest)| rest);
    BASE64
        .decode(payload.trim())
        .map_err(|e| ApiError::BadRequest(format!("{} is not valid base64: {}", field, e)))
}

// ============================================================================
// Route handlers
// ============================================================================

async fn health() -> &'static str {
    "ok"
}

/// GET /users/:user/dashboard
async fn dashboard(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let (entries, insights) = state.insights(&user).await?;
    Ok(Json(DashboardResponse {
        user,
        entries,
        streak: insights.streak,
        recap: insights.recap,
    }))
}

/// GET /users/:user/trend?highlight=happy
async fn trend(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Query(query): Query<TrendQuery>,
) -> Result<Json<TrendResponse>, ApiError> {
    let highlight = match query.highlight.as_deref() {
        None | Some("") => None,
        Some(name) => Some(
            name.parse::<Emotion>()
                .map_err(|_| ApiError::BadRequest(format!("Unknown emotion: {}", name)))?,
        ),
    };
    let entries = state.services.store.list(&user).await?;
    Ok(Json(TrendSeries::build(&entries, highlight).into()))
}

/// POST /users/:user/checkin
async fn start_checkin(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Json<SessionResponse> {
    let session = CheckinSession::start(&user, state.services.clone(), state.settings.clone());
    let response = SessionResponse {
        session_id: session.id(),
        status: session.status(),
    };
    let previous = state
        .sessions
        .write()
        .await
        .insert(user.clone(), Arc::new(Mutex::new(session)));
    if previous.is_some() {
        tracing::info!(
            "Replaced unfinished check-in for {} with {}",
            user,
            response.session_id
        );
    }
    Json(response)
}

/// DELETE /users/:user/checkin
async fn abandon_checkin(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let handle = state
        .sessions
        .write()
        .await
        .remove(&user)
        .ok_or_else(|| ApiError::NoSession(user.clone()))?;
    match Arc::try_unwrap(handle) {
        Ok(session) => session.into_inner().abandon(),
        // A request still holds it; it is dropped when that finishes.
        Err(_) => tracing::info!("Check-in for {} abandoned while busy", user),
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

/// PUT /users/:user/checkin/photo
async fn upload_photo(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Json(upload): Json<PhotoUpload>,
) -> Result<Json<SessionResponse>, ApiError> {
    let image = decode("image_base64", &upload.image_base64)?;
    let handle = state.session(&user).await?;
    let mut session = handle.lock().await;
    session.capture_photo(image);
    Ok(Json(SessionResponse {
        session_id: session.id(),
        status: session.status(),
    }))
}

/// PUT /users/:user/checkin/recording
async fn upload_recording(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Json(upload): Json<RecordingUpload>,
) -> Result<Json<RecordingResponse>, ApiError> {
    let audio = decode("audio_base64", &upload.audio_base64)?;
    let handle = state.session(&user).await?;
    let transcript = handle.lock().await.finish_recording(audio).await;
    Ok(Json(RecordingResponse { transcript }))
}

/// POST /users/:user/checkin/submit
async fn submit(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<CheckinResponse>, ApiError> {
    let handle = state.session(&user).await?;
    let outcome = handle.lock().await.submit().await?;
    let response = CheckinResponse::from(outcome);
    if matches!(response, CheckinResponse::Saved { .. }) {
        state.end_session(&user, &handle).await;
    }
    Ok(Json(response))
}

async fn resolve(
    state: AppState,
    user: String,
    choice: Choice,
) -> Result<Json<CheckinResponse>, ApiError> {
    let handle = state.session(&user).await?;
    let summary = handle.lock().await.resolve(choice).await?;
    state.end_session(&user, &handle).await;
    Ok(Json(summary.into()))
}

/// POST /users/:user/checkin/confirm
async fn confirm(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<CheckinResponse>, ApiError> {
    resolve(state, user, Choice::Confirm).await
}

/// POST /users/:user/checkin/reject
async fn reject(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<CheckinResponse>, ApiError> {
    resolve(state, user, Choice::Reject).await
}

/// POST /users/:user/checkin/retry
async fn retry_save(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<CheckinResponse>, ApiError> {
    let handle = state.session(&user).await?;
    let summary = handle.lock().await.retry_save().await?;
    state.end_session(&user, &handle).await;
    Ok(Json(summary.into()))
}

/// DELETE /users/:user/entries/today
///
/// Lets the user redo today's check-in from scratch.
async fn reset_today(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<ResetResponse>, ApiError> {
    let today = state.settings.clock.today();
    let removed = state.services.store.remove(&user, today).await?;
    tracing::info!("Reset check-in for {} on {} (removed: {})", user, today, removed);
    Ok(Json(ResetResponse {
        success: true,
        removed,
    }))
}
