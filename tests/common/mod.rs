#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use tokio::sync::{broadcast, Barrier};

use pricesentinel::{
    build_scheduler, config,
    error::{NotifyError, PriceError, RepoError},
    models::{Alert, Direction},
    services::{
        alert_repository::AlertRepository,
        notifier::{Message, Notifier},
        price_source::{PriceSource, PriceTable},
        scheduler::Scheduler,
    },
};

pub fn alert(asset_id: &str, target: f64, direction: Direction) -> Alert {
    Alert {
        id: ObjectId::new(),
        user_id: ObjectId::new(),
        asset_id: asset_id.to_string(),
        asset_name: asset_id.to_string(),
        asset_symbol: asset_id.chars().take(3).collect(),
        target_price: target,
        direction,
        last_price: 0.0,
        active: true,
        fired: false,
        fired_at: None,
        notified: false,
        created_at: 1_700_000_000,
        user_email: Some("trader@example.com".to_string()),
    }
}

pub fn settings() -> config::Settings {
    let mut s = config::load();
    s.cycle_interval_seconds = 60;
    s.quote_cache_ttl_seconds = 55;
    s.price_currency = "usd".to_string();
    s.price_timeout_seconds = 5;
    s.notify_timeout_seconds = 5;
    s.delete_after_notify = false;
    s
}

// ---------------- Alert repository ----------------

#[derive(Default)]
pub struct InMemoryAlertRepository {
    alerts: Mutex<HashMap<ObjectId, Alert>>,
    pub list_calls: AtomicUsize,
    pub commit_successes: AtomicUsize,
    pub fail_commits: AtomicBool,
    pub fail_deletes: AtomicBool,
    pub panic_on_next_list: AtomicBool,
    list_barrier: Option<Barrier>,
}

impl InMemoryAlertRepository {
    pub fn with_alerts(alerts: Vec<Alert>) -> Self {
        let repo = Self::default();
        repo.insert_all(alerts);
        repo
    }

    /// Every `list_active_untriggered` call waits until `n` callers arrived.
    pub fn with_list_barrier(alerts: Vec<Alert>, n: usize) -> Self {
        let repo = Self {
            list_barrier: Some(Barrier::new(n)),
            ..Self::default()
        };
        repo.insert_all(alerts);
        repo
    }

    fn insert_all(&self, alerts: Vec<Alert>) {
        let mut map = self.alerts.lock().unwrap();
        for a in alerts {
            map.insert(a.id, a);
        }
    }

    pub fn get(&self, id: ObjectId) -> Option<Alert> {
        self.alerts.lock().unwrap().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.alerts.lock().unwrap().len()
    }
}

#[async_trait]
impl AlertRepository for InMemoryAlertRepository {
    async fn list_active_untriggered(&self) -> Result<Vec<Alert>, RepoError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if self.panic_on_next_list.swap(false, Ordering::SeqCst) {
            panic!("repository exploded");
        }

        let items: Vec<Alert> = self
            .alerts
            .lock()
            .unwrap()
            .values()
            .filter(|a| a.active && !a.fired)
            .cloned()
            .collect();

        if let Some(barrier) = &self.list_barrier {
            barrier.wait().await;
        }

        Ok(items)
    }

    async fn commit_trigger(
        &self,
        alert_id: ObjectId,
        current_price: f64,
        fired_at: i64,
    ) -> Result<bool, RepoError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(RepoError::Invalid("write rejected".to_string()));
        }

        let mut map = self.alerts.lock().unwrap();
        let Some(a) = map.get_mut(&alert_id) else {
            return Ok(false);
        };
        if !a.active || a.fired {
            return Ok(false);
        }

        a.fired = true;
        a.active = false;
        a.fired_at = Some(fired_at);
        a.last_price = current_price;
        self.commit_successes.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn mark_notified(&self, alert_id: ObjectId) -> Result<(), RepoError> {
        let mut map = self.alerts.lock().unwrap();
        match map.get_mut(&alert_id) {
            Some(a) => {
                a.notified = true;
                Ok(())
            }
            None => Err(RepoError::NotFound),
        }
    }

    async fn delete_alert(&self, alert_id: ObjectId) -> Result<(), RepoError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(RepoError::Invalid("delete rejected".to_string()));
        }
        self.alerts.lock().unwrap().remove(&alert_id);
        Ok(())
    }
}

// ---------------- Price source ----------------

#[derive(Default)]
pub struct StaticPriceSource {
    table: Mutex<PriceTable>,
    pub calls: AtomicUsize,
    pub requested: Mutex<Vec<Vec<String>>>,
    pub fail: AtomicBool,
    delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl StaticPriceSource {
    pub fn with_prices(prices: &[(&str, f64)]) -> Self {
        let source = Self::default();
        for (asset, price) in prices {
            source.set_price(asset, *price);
        }
        source
    }

    pub fn set_price(&self, asset: &str, price: f64) {
        self.table
            .lock()
            .unwrap()
            .insert(asset.to_string(), HashMap::from([("usd".to_string(), price)]));
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    async fn fetch(&self, asset_ids: &[String], _currency: &str) -> Result<PriceTable, PriceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(asset_ids.to_vec());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return Err(PriceError::Status {
                status: 429,
                body: "rate limited".to_string(),
            });
        }

        let table = self.table.lock().unwrap();
        Ok(asset_ids
            .iter()
            .filter_map(|id| table.get(id).map(|q| (id.clone(), q.clone())))
            .collect())
    }
}

// ---------------- Notifier ----------------

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, Message)>>,
    pub fail: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        let n = Self::default();
        n.fail.store(true, Ordering::SeqCst);
        n
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, to: &str, message: &Message) -> Result<(), NotifyError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Status {
                status: 502,
                body: "smtp relay down".to_string(),
            });
        }

        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), message.clone()));
        Ok(())
    }
}

// ---------------- Wiring ----------------

pub struct Harness {
    pub repo: Arc<InMemoryAlertRepository>,
    pub source: Arc<StaticPriceSource>,
    pub notifier: Arc<RecordingNotifier>,
    pub scheduler: Arc<Scheduler>,
    pub events_rx: broadcast::Receiver<String>,
}

pub fn harness_with(
    settings: &config::Settings,
    repo: InMemoryAlertRepository,
    source: StaticPriceSource,
    notifier: RecordingNotifier,
) -> Harness {
    let repo = Arc::new(repo);
    let source = Arc::new(source);
    let notifier = Arc::new(notifier);
    let (events_tx, events_rx) = broadcast::channel(16);

    let scheduler = build_scheduler(
        settings,
        repo.clone(),
        source.clone(),
        notifier.clone(),
        events_tx,
    );

    Harness {
        repo,
        source,
        notifier,
        scheduler,
        events_rx,
    }
}

pub fn harness(alerts: Vec<Alert>, prices: &[(&str, f64)]) -> Harness {
    harness_with(
        &settings(),
        InMemoryAlertRepository::with_alerts(alerts),
        StaticPriceSource::with_prices(prices),
        RecordingNotifier::default(),
    )
}
