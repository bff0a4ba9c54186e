use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::{services::scheduler::TickOutcome, AppState};

// GET /api/monitor/status
pub async fn get_status(State(state): State<AppState>) -> Response {
    let last = state.scheduler.last_cycle().await;

    Json(json!({
        "running": state.scheduler.is_running(),
        "cycle_interval_seconds": state.settings.cycle_interval_seconds,
        "last_cycle": last,
    }))
    .into_response()
}

// POST /api/monitor/run
pub async fn post_run(State(state): State<AppState>) -> Response {
    match state.scheduler.run_now().await {
        TickOutcome::Completed(result) => (StatusCode::OK, Json(json!({ "result": result }))).into_response(),
        TickOutcome::Failed(error) => {
            (StatusCode::BAD_GATEWAY, Json(json!({ "error": error }))).into_response()
        }
        TickOutcome::Skipped => (
            StatusCode::CONFLICT,
            Json(json!({ "message": "A cycle is already running" })),
        )
            .into_response(),
    }
}

// GET /api/cache/stats
pub async fn get_cache_stats(State(state): State<AppState>) -> Response {
    let prices = state.scheduler.monitor().prices();

    Json(json!({
        "size": prices.cache_size(),
        "ttl_seconds": state.settings.quote_cache_ttl_seconds,
    }))
    .into_response()
}

// DELETE /api/cache
pub async fn delete_cache(State(state): State<AppState>) -> Response {
    state.scheduler.monitor().prices().clear_cache();
    tracing::info!("price cache cleared");

    Json(json!({ "message": "Cache cleared" })).into_response()
}
