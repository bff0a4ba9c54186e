pub mod quote_cache;
pub mod price_source;
pub mod price_fetcher;
pub mod evaluator;
pub mod alert_repository;
pub mod notifier;
pub mod alert_monitor;
pub mod scheduler;

pub mod alerts_service;
pub mod db_init;
