use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use inbox_analytics::{summarize, AnalyticsSummary};
use inbox_core::error::InboxError;
use inbox_core::search::{distinct_receivers, ThreadFilter};
use inbox_core::trace::{lookup_trace, TraceDebug};
use inbox_core::types::ConversationThread;
use inbox_core::build_threads;
use serde::Deserialize;

const CONVERSATIONS_ERROR: &str = "Failed to fetch conversations";
const ANALYTICS_ERROR: &str = "Failed to fetch analytics";
const DEBUG_ERROR: &str = "Failed to fetch debug data";

/// Fetch rows and rebuild threads, optionally for a single receiver.
async fn load_threads(
    state: &AppState,
    receiver_id: Option<&str>,
) -> Result<Vec<ConversationThread>, InboxError> {
    let store = state.store()?;
    let records = store.fetch_interactions(receiver_id).await?;
    build_threads(&records, receiver_id)
}

/// Unwrap query parameters, answering a malformed query string with a JSON 400.
fn query_params<T>(query: Result<Query<T>, QueryRejection>, context: &str) -> Result<T, ApiError> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| {
            ApiError::new(context, InboxError::InvalidParameter(rejection.body_text()))
        })
}

/// Blank query parameters count as absent.
fn non_empty(param: &Option<String>) -> Option<&str> {
    param.as_deref().filter(|p| !p.is_empty())
}

// ── Health ──────────────────────────────────────────────────────────────

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ── Conversations ───────────────────────────────────────────────────────

pub fn conversation_routes() -> Router<AppState> {
    Router::new()
        .route("/api/conversations", get(list_conversations))
        .route("/api/receivers", get(list_receivers))
}

async fn list_conversations(
    State(state): State<AppState>,
    filter: Result<Query<ThreadFilter>, QueryRejection>,
) -> Result<Json<Vec<ConversationThread>>, ApiError> {
    let filter = query_params(filter, CONVERSATIONS_ERROR)?;
    let threads = load_threads(&state, non_empty(&filter.receiver_id))
        .await
        .map_err(|e| ApiError::new(CONVERSATIONS_ERROR, e))?;
    Ok(Json(filter.apply(threads)))
}

async fn list_receivers(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let threads = load_threads(&state, None)
        .await
        .map_err(|e| ApiError::new(CONVERSATIONS_ERROR, e))?;
    Ok(Json(distinct_receivers(&threads)))
}

// ── Analytics ───────────────────────────────────────────────────────────

pub fn analytics_routes() -> Router<AppState> {
    Router::new().route("/api/analytics", get(analytics))
}

#[derive(Debug, Deserialize)]
struct AnalyticsParams {
    receiver_id: Option<String>,
}

async fn analytics(
    State(state): State<AppState>,
    params: Result<Query<AnalyticsParams>, QueryRejection>,
) -> Result<Json<AnalyticsSummary>, ApiError> {
    let params = query_params(params, ANALYTICS_ERROR)?;
    let receiver_id = non_empty(&params.receiver_id);
    let threads = load_threads(&state, receiver_id)
        .await
        .map_err(|e| ApiError::new(ANALYTICS_ERROR, e))?;
    Ok(Json(summarize(&threads)))
}

// ── Debug trace ─────────────────────────────────────────────────────────

pub fn debug_routes() -> Router<AppState> {
    Router::new().route("/api/debug", get(debug_trace))
}

#[derive(Debug, Deserialize)]
struct DebugParams {
    sender_id: Option<String>,
    input_query: Option<String>,
}

async fn debug_trace(
    State(state): State<AppState>,
    params: Result<Query<DebugParams>, QueryRejection>,
) -> Result<Json<TraceDebug>, ApiError> {
    let params = query_params(params, DEBUG_ERROR)?;
    let store = state.store().map_err(|e| ApiError::new(DEBUG_ERROR, e))?;
    let sender_id = params.sender_id.unwrap_or_default();
    let input_query = params.input_query.unwrap_or_default();

    let debug = lookup_trace(store, &sender_id, &input_query)
        .await
        .map_err(|e| ApiError::new(DEBUG_ERROR, e))?;
    Ok(Json(debug))
}
