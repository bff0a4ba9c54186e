//! Library entrypoint for PriceSentinel.
//!
//! Integration tests under `tests/` build the monitor, scheduler and routers
//! from here with in-memory collaborators.

use std::sync::Arc;

use tokio::sync::broadcast;

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod templates;

pub mod controllers;
pub mod routes;

use services::{
    alert_monitor::{AlertMonitor, MonitorOptions},
    alert_repository::AlertRepository,
    notifier::Notifier,
    price_fetcher::PriceFetcher,
    price_source::PriceSource,
    scheduler::Scheduler,
};

/// Event name broadcast to `/events` subscribers when alert rows change.
pub const ALERTS_UPDATED: &str = "alertsUpdated";

#[derive(Clone)]
pub struct AppState {
    pub db: mongodb::Database,
    pub settings: config::Settings,
    pub scheduler: Arc<Scheduler>,
    pub events_tx: broadcast::Sender<String>,
}

/// Wires the monitoring engine from settings and its three collaborators.
pub fn build_scheduler(
    settings: &config::Settings,
    repo: Arc<dyn AlertRepository>,
    source: Arc<dyn PriceSource>,
    notifier: Arc<dyn Notifier>,
    events_tx: broadcast::Sender<String>,
) -> Arc<Scheduler> {
    let prices = Arc::new(PriceFetcher::new(
        source,
        settings.quote_cache_ttl(),
        settings.price_timeout(),
    ));

    let options = MonitorOptions {
        currency: settings.price_currency.clone(),
        notify_timeout: settings.notify_timeout(),
        delete_after_notify: settings.delete_after_notify,
    };

    let monitor = AlertMonitor::new(repo, prices, notifier, templates::build_handlebars(), options)
        .with_events(events_tx);

    Arc::new(Scheduler::new(Arc::new(monitor), settings.cycle_interval()))
}
