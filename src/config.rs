use std::{env, time::Duration};

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub host: String,
    pub port: u16,

    pub cycle_interval_seconds: u64,
    pub quote_cache_ttl_seconds: u64,

    pub price_api_url: String,
    pub price_api_key: String,
    pub price_currency: String,
    pub price_timeout_seconds: u64,

    pub notify_timeout_seconds: u64,
    pub mail_api_url: String,
    pub mail_api_key: String,
    pub from_name: String,
    pub from_email: String,

    pub delete_after_notify: bool,
}

impl Settings {
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_seconds)
    }

    pub fn quote_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.quote_cache_ttl_seconds)
    }

    pub fn price_timeout(&self) -> Duration {
        Duration::from_secs(self.price_timeout_seconds)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_seconds)
    }

    /// A snapshot cached for a full interval or longer can be served to two
    /// consecutive cycles.
    pub fn ttl_outlives_interval(&self) -> bool {
        self.quote_cache_ttl_seconds >= self.cycle_interval_seconds
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn positive_secs(raw: Option<String>, default: u64) -> u64 {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

fn flag(raw: Option<String>) -> bool {
    raw.map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let port = env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    Settings {
        mongodb_uri: var_or("MONGODB_URI", "mongodb://localhost:27017"),
        mongodb_db: var_or("MONGODB_DB", "pricesentinel"),
        host: var_or("HOST", "127.0.0.1"),
        port,

        cycle_interval_seconds: positive_secs(env::var("CYCLE_INTERVAL_SECONDS").ok(), 60),
        quote_cache_ttl_seconds: positive_secs(env::var("QUOTE_CACHE_TTL_SECONDS").ok(), 55),

        price_api_url: var_or("PRICE_API_URL", "https://api.coingecko.com/api/v3"),
        price_api_key: var_or("PRICE_API_KEY", ""),
        price_currency: var_or("PRICE_CURRENCY", "usd").to_lowercase(),
        price_timeout_seconds: positive_secs(env::var("PRICE_TIMEOUT_SECONDS").ok(), 10),

        notify_timeout_seconds: positive_secs(env::var("NOTIFY_TIMEOUT_SECONDS").ok(), 10),
        mail_api_url: var_or("MAIL_API_URL", ""),
        mail_api_key: var_or("MAIL_API_KEY", ""),
        from_name: var_or("FROM_NAME", "PriceSentinel"),
        from_email: var_or("FROM_EMAIL", "noreply@pricesentinel.local"),

        delete_after_notify: flag(env::var("DELETE_AFTER_NOTIFY").ok()),
    }
}
