use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::PriceError;

/// `{assetId: {currency: price}}`, the shape CoinGecko's `/simple/price` returns.
pub type PriceTable = HashMap<String, HashMap<String, f64>>;

/// Upstream quote provider. One call covers a whole batch of assets.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch(&self, asset_ids: &[String], currency: &str) -> Result<PriceTable, PriceError>;
}

#[derive(Clone)]
pub struct CoinGeckoClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl CoinGeckoClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, PriceError> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[async_trait]
impl PriceSource for CoinGeckoClient {
    async fn fetch(&self, asset_ids: &[String], currency: &str) -> Result<PriceTable, PriceError> {
        if asset_ids.is_empty() {
            return Ok(PriceTable::new());
        }

        let url = format!("{}/simple/price", self.base_url);
        let ids = asset_ids.join(",");

        let mut req = self
            .http
            .get(url)
            .query(&[("ids", ids.as_str()), ("vs_currencies", currency)]);
        if self.has_key() {
            req = req.header("x-cg-demo-api-key", &self.api_key);
        }

        let res = req.send().await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(PriceError::Status { status, body });
        }

        let body = res.text().await?;
        parse_price_table(&body)
    }
}

/// Unknown ids are simply absent from the payload. Entries that are not
/// numbers (CoinGecko sends `null` for some delisted coins) are dropped.
pub fn parse_price_table(body: &str) -> Result<PriceTable, PriceError> {
    let raw: HashMap<String, HashMap<String, serde_json::Value>> =
        serde_json::from_str(body).map_err(|e| PriceError::Decode(e.to_string()))?;

    let table = raw
        .into_iter()
        .map(|(asset, quotes)| {
            let quotes = quotes
                .into_iter()
                .filter_map(|(cur, v)| v.as_f64().map(|p| (cur, p)))
                .collect::<HashMap<_, _>>();
            (asset, quotes)
        })
        .collect();

    Ok(table)
}
