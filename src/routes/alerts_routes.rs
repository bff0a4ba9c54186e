use axum::{Router, routing::{delete, get, post}};
use crate::{AppState, controllers::alerts_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/api/alerts", post(alerts_controller::post_create_alert))
        .route("/api/users/:user_id/alerts", get(alerts_controller::get_user_alerts))
        .route("/api/users/:user_id/alerts/:id", delete(alerts_controller::delete_user_alert))
}
