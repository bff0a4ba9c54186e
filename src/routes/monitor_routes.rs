use axum::{Router, routing::{delete, get, post}};
use crate::{AppState, controllers::monitor_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/api/monitor/status", get(monitor_controller::get_status))
        .route("/api/monitor/run", post(monitor_controller::post_run))
        .route("/api/cache", delete(monitor_controller::delete_cache))
        .route("/api/cache/stats", get(monitor_controller::get_cache_stats))
}
