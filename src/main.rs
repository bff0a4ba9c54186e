use std::{net::SocketAddr, process::ExitCode, sync::Arc};

use mongodb::Client;
use tracing_subscriber::EnvFilter;

use pricesentinel::{
    build_scheduler, config, routes,
    services::{
        alert_repository::MongoAlertRepository,
        db_init,
        notifier::{LogNotifier, MailApiNotifier, Notifier},
        price_source::CoinGeckoClient,
        scheduler::spawn_price_alert_monitor,
    },
    AppState,
};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = config::load();

    if settings.ttl_outlives_interval() {
        tracing::warn!(
            ttl = settings.quote_cache_ttl_seconds,
            interval = settings.cycle_interval_seconds,
            "quote cache TTL is not below the cycle interval; consecutive cycles may reuse one snapshot"
        );
    }

    // Mongo connection
    let client = Client::with_uri_str(&settings.mongodb_uri).await?;
    let db = client.database(&settings.mongodb_db);

    if let Err(e) = db_init::ensure_indexes(&db).await {
        tracing::warn!(error = %e, "could not create indexes");
    }

    let source = CoinGeckoClient::new(
        settings.price_api_url.clone(),
        settings.price_api_key.clone(),
        settings.price_timeout(),
    )?;

    let notifier: Arc<dyn Notifier> = if settings.mail_api_url.trim().is_empty() {
        tracing::info!("MAIL_API_URL not set, notifications will only be logged");
        Arc::new(LogNotifier)
    } else {
        Arc::new(MailApiNotifier::new(
            settings.mail_api_url.clone(),
            settings.mail_api_key.clone(),
            settings.from_name.clone(),
            settings.from_email.clone(),
            settings.notify_timeout(),
        )?)
    };

    let (events_tx, _events_rx) = tokio::sync::broadcast::channel::<String>(64);

    let scheduler = build_scheduler(
        &settings,
        Arc::new(MongoAlertRepository::new(&db)),
        Arc::new(source),
        notifier,
        events_tx.clone(),
    );
    spawn_price_alert_monitor(scheduler.clone());

    let state = AppState {
        db,
        settings: settings.clone(),
        scheduler,
        events_tx,
    };

    let addr = SocketAddr::from((settings.host.parse::<std::net::IpAddr>()?, settings.port));
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, routes::app(state)).await?;

    Ok(())
}
