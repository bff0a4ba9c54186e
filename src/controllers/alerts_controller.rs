use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::RepoError,
    models::Alert,
    services::alerts_service::{self, AlertInput},
    AppState,
};

fn alert_json(a: &Alert) -> serde_json::Value {
    json!({
        "id": a.id.to_hex(),
        "user_id": a.user_id.to_hex(),
        "asset_id": a.asset_id,
        "asset_name": a.asset_name,
        "asset_symbol": a.asset_symbol,
        "target_price": a.target_price,
        "direction": a.direction,
        "last_price": a.last_price,
        "active": a.active,
        "fired": a.fired,
        "fired_at": a.fired_at,
        "notified": a.notified,
        "created_at": a.created_at,
    })
}

fn message(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({ "message": msg }))).into_response()
}

fn db_error(e: RepoError) -> Response {
    tracing::error!(error = %e, "alerts api database error");
    message(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
}

fn parse_oid(raw: &str) -> Option<ObjectId> {
    ObjectId::parse_str(raw.trim()).ok()
}

// GET /api/users/:user_id/alerts
pub async fn get_user_alerts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Response {
    let Some(uid) = parse_oid(&user_id) else {
        return message(StatusCode::BAD_REQUEST, "Invalid user id");
    };

    match alerts_service::list_user_alerts(&state.db, uid).await {
        Ok(alerts) => {
            let items: Vec<_> = alerts.iter().map(alert_json).collect();
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => db_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAlertBody {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub asset_id: String,
    #[serde(default)]
    pub asset_name: String,
    #[serde(default)]
    pub asset_symbol: String,
    pub target_price: Option<f64>,
    #[serde(default)]
    pub direction: String,
}

// POST /api/alerts
pub async fn post_create_alert(
    State(state): State<AppState>,
    Json(body): Json<CreateAlertBody>,
) -> Response {
    let input = AlertInput {
        user_id: &body.user_id,
        asset_id: &body.asset_id,
        asset_name: &body.asset_name,
        asset_symbol: &body.asset_symbol,
        target_price: body.target_price,
        direction: &body.direction,
    };

    let new = match alerts_service::validate(&input) {
        Ok(n) => n,
        Err(errs) => {
            let errors: serde_json::Map<String, serde_json::Value> = errs
                .into_iter()
                .map(|(field, msg)| (field.to_string(), json!(msg)))
                .collect();
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "Please provide all required fields", "errors": errors })),
            )
                .into_response();
        }
    };

    created_response(alerts_service::create_alert(&state.db, &state.events_tx, new).await)
}

fn created_response(res: Result<Alert, RepoError>) -> Response {
    match res {
        Ok(alert) => (StatusCode::CREATED, Json(alert_json(&alert))).into_response(),
        Err(e) => db_error(e),
    }
}

// DELETE /api/users/:user_id/alerts/:id
pub async fn delete_user_alert(
    State(state): State<AppState>,
    Path((user_id, id)): Path<(String, String)>,
) -> Response {
    let (Some(uid), Some(aid)) = (parse_oid(&user_id), parse_oid(&id)) else {
        return message(StatusCode::BAD_REQUEST, "Invalid id");
    };

    deleted_response(alerts_service::delete_user_alert(&state.db, &state.events_tx, uid, aid).await)
}

// Someone else's alert is indistinguishable from a missing one.
fn deleted_response(res: Result<(), RepoError>) -> Response {
    match res {
        Ok(()) => message(StatusCode::OK, "Alert removed"),
        Err(RepoError::NotFound) => message(StatusCode::NOT_FOUND, "Alert not found"),
        Err(e) => db_error(e),
    }
}
