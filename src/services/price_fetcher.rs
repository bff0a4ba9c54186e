//! Read-through batch price lookup.
//!
//! A whole batch is memoized under one key derived from the sorted asset set
//! and the currency, so every alert in a cycle shares one upstream request.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use crate::error::PriceError;

use super::price_source::{PriceSource, PriceTable};
use super::quote_cache::QuoteCache;

/// Prices for one currency, keyed by asset id.
pub type PriceSnapshot = HashMap<String, f64>;

pub struct PriceFetcher {
    source: Arc<dyn PriceSource>,
    cache: QuoteCache<String, Arc<PriceTable>>,
    ttl: Duration,
    timeout: Duration,
}

impl PriceFetcher {
    pub fn new(source: Arc<dyn PriceSource>, ttl: Duration, timeout: Duration) -> Self {
        Self {
            source,
            cache: QuoteCache::new(),
            ttl,
            timeout,
        }
    }

    pub fn cache_key(asset_ids: &BTreeSet<String>, currency: &str) -> String {
        let ids: Vec<&str> = asset_ids.iter().map(String::as_str).collect();
        format!("simple_price:{}:{}", currency, ids.join(","))
    }

    pub async fn get_prices(
        &self,
        asset_ids: &BTreeSet<String>,
        currency: &str,
    ) -> Result<PriceSnapshot, PriceError> {
        if asset_ids.is_empty() {
            return Ok(PriceSnapshot::new());
        }

        let key = Self::cache_key(asset_ids, currency);

        if let Some(table) = self.cache.get(&key) {
            tracing::debug!(%key, "price cache hit");
            return Ok(snapshot_for(&table, currency));
        }

        tracing::debug!(%key, assets = asset_ids.len(), "price cache miss, fetching upstream");

        let ids: Vec<String> = asset_ids.iter().cloned().collect();
        let table = tokio::time::timeout(self.timeout, self.source.fetch(&ids, currency))
            .await
            .map_err(|_| PriceError::Timeout(self.timeout))??;

        let table = Arc::new(table);
        self.cache.set(key, table.clone(), self.ttl);

        Ok(snapshot_for(&table, currency))
    }

    pub fn cache_size(&self) -> usize {
        self.cache.size()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

// Non-finite or negative quotes are treated as if the asset were missing.
fn snapshot_for(table: &PriceTable, currency: &str) -> PriceSnapshot {
    table
        .iter()
        .filter_map(|(asset, quotes)| {
            let price = *quotes.get(currency)?;
            (price.is_finite() && price >= 0.0).then(|| (asset.clone(), price))
        })
        .collect()
}
