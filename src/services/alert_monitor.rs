//! One monitoring cycle: load watching alerts, price them in one batch,
//! commit every satisfied alert to its terminal state, then notify.
//!
//! The trigger write always happens before the notification. A crash or a
//! failed delivery after the write loses at most the notification, never
//! produces a second trigger.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::{
    error::{CycleError, NotifyError},
    models::Alert,
    templates::{self, Hbs},
    ALERTS_UPDATED,
};

use super::{
    alert_repository::AlertRepository, evaluator, notifier::Notifier, price_fetcher::PriceFetcher,
};

#[derive(Debug, Clone, Serialize)]
pub struct NotificationFailure {
    pub alert_id: String,
    pub asset_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleResult {
    pub examined: usize,
    pub triggered: usize,
    pub skipped_no_price: usize,
    // conditional write found the alert already fired
    pub lost_races: usize,
    pub commit_failures: usize,
    pub notified: usize,
    pub deleted: usize,
    pub notification_failures: Vec<NotificationFailure>,
}

#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub currency: String,
    pub notify_timeout: Duration,
    pub delete_after_notify: bool,
}

pub struct AlertMonitor {
    repo: Arc<dyn AlertRepository>,
    prices: Arc<PriceFetcher>,
    notifier: Arc<dyn Notifier>,
    hbs: Hbs,
    options: MonitorOptions,
    events_tx: Option<broadcast::Sender<String>>,
}

impl AlertMonitor {
    pub fn new(
        repo: Arc<dyn AlertRepository>,
        prices: Arc<PriceFetcher>,
        notifier: Arc<dyn Notifier>,
        hbs: Hbs,
        options: MonitorOptions,
    ) -> Self {
        Self {
            repo,
            prices,
            notifier,
            hbs,
            options,
            events_tx: None,
        }
    }

    /// Publish [`ALERTS_UPDATED`] whenever a cycle fires at least one alert.
    pub fn with_events(mut self, events_tx: broadcast::Sender<String>) -> Self {
        self.events_tx = Some(events_tx);
        self
    }

    pub fn prices(&self) -> &Arc<PriceFetcher> {
        &self.prices
    }

    pub async fn run_cycle(&self) -> Result<CycleResult, CycleError> {
        let alerts = self
            .repo
            .list_active_untriggered()
            .await
            .map_err(CycleError::Load)?;

        // The repository filter is authoritative, but never act on anything else.
        let alerts: Vec<Alert> = alerts.into_iter().filter(Alert::is_watching).collect();

        let mut result = CycleResult {
            examined: alerts.len(),
            ..CycleResult::default()
        };

        if alerts.is_empty() {
            tracing::debug!("no active alerts to check");
            return Ok(result);
        }

        let asset_ids: BTreeSet<String> = alerts.iter().map(|a| a.asset_id.clone()).collect();
        let snapshot = self
            .prices
            .get_prices(&asset_ids, &self.options.currency)
            .await?;

        for alert in &alerts {
            let Some(&price) = snapshot.get(&alert.asset_id) else {
                result.skipped_no_price += 1;
                continue;
            };

            if !evaluator::is_satisfied(alert, price) {
                continue;
            }

            self.fire(alert, price, &mut result).await;
        }

        if result.triggered > 0 {
            if let Some(tx) = &self.events_tx {
                let _ = tx.send(ALERTS_UPDATED.to_string());
            }
        }

        Ok(result)
    }

    async fn fire(&self, alert: &Alert, price: f64, result: &mut CycleResult) {
        let fired_at = Utc::now().timestamp();

        match self.repo.commit_trigger(alert.id, price, fired_at).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(alert_id = %alert.id, "alert already fired elsewhere");
                result.lost_races += 1;
                return;
            }
            Err(e) => {
                // Still active; the next cycle re-evaluates it.
                tracing::error!(alert_id = %alert.id, error = %e, "failed to persist trigger");
                result.commit_failures += 1;
                return;
            }
        }

        result.triggered += 1;
        tracing::info!(
            alert_id = %alert.id,
            asset = %alert.asset_name,
            price,
            target = alert.target_price,
            direction = %alert.direction,
            "alert triggered"
        );

        match self.notify(alert, price).await {
            Ok(()) => {
                result.notified += 1;
                self.after_notified(alert.id, result).await;
            }
            Err(e) => {
                tracing::warn!(alert_id = %alert.id, error = %e, "alert fired but notification failed");
                result.notification_failures.push(NotificationFailure {
                    alert_id: alert.id.to_hex(),
                    asset_id: alert.asset_id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    async fn notify(&self, alert: &Alert, price: f64) -> Result<(), NotifyError> {
        let to = alert
            .user_email
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(NotifyError::MissingContact)?;

        let message = templates::render_triggered(&self.hbs, alert, price)?;

        let timeout = self.options.notify_timeout;
        tokio::time::timeout(timeout, self.notifier.send(to, &message))
            .await
            .map_err(|_| NotifyError::Timeout(timeout))?
    }

    // Cleanup after delivery is best effort; failures are logged only.
    async fn after_notified(&self, alert_id: ObjectId, result: &mut CycleResult) {
        if let Err(e) = self.repo.mark_notified(alert_id).await {
            tracing::warn!(%alert_id, error = %e, "failed to mark alert notified");
        }

        if self.options.delete_after_notify {
            match self.repo.delete_alert(alert_id).await {
                Ok(()) => result.deleted += 1,
                Err(e) => tracing::warn!(%alert_id, error = %e, "failed to delete notified alert"),
            }
        }
    }
}
