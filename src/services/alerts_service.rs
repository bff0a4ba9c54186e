use std::sync::LazyLock;

use chrono::Utc;
use futures_util::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::options::FindOptions;
use mongodb::Database;
use regex::Regex;
use tokio::sync::broadcast;

use crate::{
    error::RepoError,
    models::{Alert, Direction},
    ALERTS_UPDATED,
};

static ASSET_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*$").expect("asset id regex"));

#[derive(Debug, Clone)]
pub struct NewAlert {
    pub user_id: ObjectId,
    pub asset_id: String,
    pub asset_name: String,
    pub asset_symbol: String,
    pub target_price: f64,
    pub direction: Direction,
}

/// Field name -> message, for every input that failed validation.
pub type FieldErrors = Vec<(&'static str, &'static str)>;

pub struct AlertInput<'a> {
    pub user_id: &'a str,
    pub asset_id: &'a str,
    pub asset_name: &'a str,
    pub asset_symbol: &'a str,
    pub target_price: Option<f64>,
    pub direction: &'a str,
}

pub fn validate(input: &AlertInput<'_>) -> Result<NewAlert, FieldErrors> {
    let mut errs: FieldErrors = Vec::new();

    let user_id = ObjectId::parse_str(input.user_id.trim()).ok();
    if user_id.is_none() {
        errs.push(("user_id", "Invalid user id."));
    }

    let asset_id = input.asset_id.trim().to_lowercase();
    if !ASSET_ID_RE.is_match(&asset_id) {
        errs.push(("asset_id", "Invalid asset id."));
    }

    let asset_name = input.asset_name.trim().to_string();
    if asset_name.is_empty() {
        errs.push(("asset_name", "Asset name is required."));
    }

    let asset_symbol = input.asset_symbol.trim().to_string();
    if asset_symbol.is_empty() {
        errs.push(("asset_symbol", "Asset symbol is required."));
    }

    let target_price = input.target_price.filter(|t| t.is_finite() && *t >= 0.0);
    if target_price.is_none() {
        errs.push(("target_price", "Please enter a valid target price."));
    }

    let direction = Direction::parse(input.direction);
    if direction.is_none() {
        errs.push(("direction", "Please choose a valid condition."));
    }

    match (user_id, target_price, direction) {
        (Some(user_id), Some(target_price), Some(direction)) if errs.is_empty() => Ok(NewAlert {
            user_id,
            asset_id,
            asset_name,
            asset_symbol,
            target_price,
            direction,
        }),
        _ => Err(errs),
    }
}

fn notify_updated(events_tx: &broadcast::Sender<String>) {
    let _ = events_tx.send(ALERTS_UPDATED.to_string());
}

pub async fn list_user_alerts(db: &Database, user_id: ObjectId) -> Result<Vec<Alert>, RepoError> {
    let alerts = db.collection::<Alert>("alerts");

    let find_opts = FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .build();

    let cursor = alerts.find(doc! { "user_id": user_id }, find_opts).await?;
    Ok(cursor.try_collect().await?)
}

pub async fn create_alert(
    db: &Database,
    events_tx: &broadcast::Sender<String>,
    new: NewAlert,
) -> Result<Alert, RepoError> {
    let alerts = db.collection::<Alert>("alerts");

    let alert = build_alert(new, Utc::now().timestamp());
    alerts.insert_one(&alert, None).await?;
    notify_updated(events_tx);

    Ok(alert)
}

/// A freshly created alert is watching: active and not yet fired.
fn build_alert(new: NewAlert, created_at: i64) -> Alert {
    Alert {
        id: ObjectId::new(),
        user_id: new.user_id,
        asset_id: new.asset_id,
        asset_name: new.asset_name,
        asset_symbol: new.asset_symbol,
        target_price: new.target_price,
        direction: new.direction,
        last_price: 0.0,
        active: true,
        fired: false,
        fired_at: None,
        notified: false,
        created_at,
        user_email: None,
    }
}

fn owned_filter(user_id: ObjectId, alert_id: ObjectId) -> Document {
    doc! { "_id": alert_id, "user_id": user_id }
}

// Nothing deleted means the alert is absent or belongs to someone else.
fn deleted_or_not_found(deleted_count: u64) -> Result<(), RepoError> {
    if deleted_count == 0 {
        return Err(RepoError::NotFound);
    }
    Ok(())
}

/// Deletes an alert only if `user_id` owns it.
pub async fn delete_user_alert(
    db: &Database,
    events_tx: &broadcast::Sender<String>,
    user_id: ObjectId,
    alert_id: ObjectId,
) -> Result<(), RepoError> {
    let alerts = db.collection::<Alert>("alerts");

    let res = alerts
        .delete_one(owned_filter(user_id, alert_id), None)
        .await?;
    deleted_or_not_found(res.deleted_count)?;

    notify_updated(events_tx);
    Ok(())
}
