//! Daimon HTTP routes

use axum::{extract::State, http::StatusCode, routing::{get, post}, Json, Router};
use daimon_core::{
    BatchRequest, BatchResponse, ClaudeEvent, ClaudeEventResponse, HealthResponse, QuickCheckRequest,
    QuickCheckResponse, SessionEndRequest, SessionEndResponse, CLAUDE_EVENT_PATH, HEALTH_PATH,
    MAX_PROMPT_CHARS, QUICK_CHECK_PATH, SESSION_END_PATH, SHELL_BATCH_PATH,
};
use daimon_heartbeat::RiskClassifier;
use std::sync::Arc;
use tracing::{debug, info};

/// Sessions at least this many files or minutes become precedents.
const PRECEDENT_MIN_FILES: u32 = 5;
const PRECEDENT_MIN_MINUTES: f64 = 30.0;

pub struct GatewayState {
    pub classifier: RiskClassifier,
}

pub fn router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route(QUICK_CHECK_PATH, post(quick_check_handler))
        .route(SHELL_BATCH_PATH, post(shell_batch_handler))
        .route(CLAUDE_EVENT_PATH, post(claude_event_handler))
        .route(SESSION_END_PATH, post(session_end_handler))
        .route(HEALTH_PATH, get(health_handler))
        .with_state(state)
}

async fn quick_check_handler(
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<QuickCheckRequest>,
) -> Result<Json<QuickCheckResponse>, (StatusCode, String)> {
    let chars = request.prompt.chars().count();
    if chars == 0 || chars > MAX_PROMPT_CHARS {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("prompt must be 1..={} characters, got {}", MAX_PROMPT_CHARS, chars),
        ));
    }
    let classification = state.classifier.classify(&request.prompt);
    Ok(Json(QuickCheckResponse::from(&classification)))
}

async fn shell_batch_handler(Json(batch): Json<BatchRequest>) -> Json<BatchResponse> {
    for hb in batch.heartbeats.iter().filter(|hb| hb.is_failure()) {
        let shown: String = hb.payload.chars().take(50).collect();
        debug!("Command failed: {} (exit {:?})", shown, hb.exit_code);
    }
    let insights = batch_insights(&batch);
    Json(BatchResponse {
        status: "ok".into(),
        stored: batch.heartbeats.len(),
        insights,
    })
}

async fn claude_event_handler(Json(event): Json<ClaudeEvent>) -> Json<ClaudeEventResponse> {
    debug!("Session event: {} ({})", event.event_type, event.project);
    Json(ClaudeEventResponse {
        status: "ok".into(),
        stored: true,
    })
}

async fn session_end_handler(Json(request): Json<SessionEndRequest>) -> Json<SessionEndResponse> {
    info!(
        "Session ended - {} ({}, {} files)",
        request.session_id, request.outcome, request.files_changed
    );
    let precedent_id = precedent_id(&request);
    if let Some(id) = &precedent_id {
        info!("Created precedent {}", id);
    }
    Json(SessionEndResponse {
        status: "ok".into(),
        precedent_id,
    })
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        service: "daimon".into(),
        endpoints: [QUICK_CHECK_PATH, SHELL_BATCH_PATH, CLAUDE_EVENT_PATH, SESSION_END_PATH]
            .iter()
            .map(|p| p.to_string())
            .collect(),
    })
}

/// Insights derived from the patterns a collector attached to its batch.
pub fn batch_insights(batch: &BatchRequest) -> Vec<String> {
    if !batch.patterns.possible_frustration {
        return Vec::new();
    }
    let streak = batch.patterns.error_streak.unwrap_or(0);
    info!("Frustration pattern detected ({} errors)", streak);
    vec![format!("Frustration detected: {} consecutive errors", streak)]
}

/// Only significant sessions are kept as precedents.
pub fn precedent_id(request: &SessionEndRequest) -> Option<String> {
    if request.files_changed >= PRECEDENT_MIN_FILES || request.duration_minutes >= PRECEDENT_MIN_MINUTES {
        let prefix: String = request.session_id.chars().take(8).collect();
        Some(format!("sess_{}", prefix))
    } else {
        None
    }
}
