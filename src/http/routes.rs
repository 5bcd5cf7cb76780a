//! HTTP route definitions

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::app::AppState;
use crate::game::GameMode;
use crate::store::{LedgerError, ScoreEntry};
use crate::util::time::uptime_secs;
use crate::ws::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/scores", get(scores_handler))
        .route("/update_score", post(update_score_handler))
        .route("/ws", get(ws_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.client_origins))
        .with_state(state)
}

/// Explicit origins get credentials, no origins means anyone may connect
fn cors_layer(origins: &[String]) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    if allowed.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(allowed)
            .allow_methods(methods)
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
    }
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    mode: Option<GameMode>,
    /// Roster size, absent before the first `init`
    players: Option<u32>,
    observers: usize,
    hardware_links: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        mode: state.engine.mode(),
        players: state.engine.session().map(|s| s.num_players()),
        observers: state.engine.clients().len(),
        hardware_links: state.engine.hardware_links(),
    })
}

// ============================================================================
// Score ledger endpoints
// ============================================================================

#[derive(Serialize)]
struct ScoresResponse {
    scores: Vec<ScoreEntry>,
}

async fn scores_handler(State(state): State<AppState>) -> Result<Json<ScoresResponse>, AppError> {
    let scores = state.ledger.scores().await?;
    Ok(Json(ScoresResponse { scores }))
}

#[derive(Deserialize)]
struct UpdateScoreRequest {
    username: String,
    #[serde(default = "default_increment")]
    increment: i64,
}

fn default_increment() -> i64 {
    1
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateScoreResponse {
    message: String,
    username: String,
    new_score: i64,
}

async fn update_score_handler(
    State(state): State<AppState>,
    Json(req): Json<UpdateScoreRequest>,
) -> Result<Json<UpdateScoreResponse>, AppError> {
    let username = req.username.trim().to_string();
    let new_score = state.ledger.update_score(&username, req.increment).await?;
    info!(username = %username, increment = req.increment, new_score, "Score updated over HTTP");

    Ok(Json(UpdateScoreResponse {
        message: "Score updated".to_string(),
        username,
        new_score,
    }))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<LedgerError> for AppError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::EmptyName => AppError::BadRequest(e.to_string()),
            LedgerError::Supabase(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
