mod common;

use std::collections::BTreeSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use pricesentinel::{error::PriceError, services::price_fetcher::PriceFetcher};

use common::StaticPriceSource;

fn ids(v: &[&str]) -> BTreeSet<String> {
    v.iter().map(|s| s.to_string()).collect()
}

fn fetcher(source: Arc<StaticPriceSource>, ttl_secs: u64) -> PriceFetcher {
    PriceFetcher::new(source, Duration::from_secs(ttl_secs), Duration::from_secs(5))
}

#[tokio::test(start_paused = true)]
async fn batch_is_memoized_until_ttl() {
    let source = Arc::new(StaticPriceSource::with_prices(&[("bitcoin", 50000.0), ("ethereum", 3000.0)]));
    let prices = fetcher(source.clone(), 55);
    let set = ids(&["ethereum", "bitcoin"]);

    let first = prices.get_prices(&set, "usd").await.unwrap();
    let second = prices.get_prices(&set, "usd").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    assert_eq!(prices.cache_size(), 1);

    tokio::time::advance(Duration::from_secs(56)).await;
    prices.get_prices(&set, "usd").await.unwrap();
    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn different_asset_sets_use_different_entries() {
    let source = Arc::new(StaticPriceSource::with_prices(&[("bitcoin", 50000.0), ("ethereum", 3000.0)]));
    let prices = fetcher(source.clone(), 55);

    prices.get_prices(&ids(&["bitcoin"]), "usd").await.unwrap();
    let both = prices.get_prices(&ids(&["bitcoin", "ethereum"]), "usd").await.unwrap();

    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    assert_eq!(both.len(), 2);
    assert_eq!(prices.cache_size(), 2);
}

#[tokio::test]
async fn upstream_error_is_returned_and_not_cached() {
    let source = Arc::new(StaticPriceSource::with_prices(&[("bitcoin", 50000.0)]));
    source.fail.store(true, Ordering::SeqCst);
    let prices = fetcher(source.clone(), 55);

    let err = prices.get_prices(&ids(&["bitcoin"]), "usd").await.unwrap_err();
    assert!(matches!(err, PriceError::Status { status: 429, .. }));
    assert_eq!(prices.cache_size(), 0);
}

#[tokio::test]
async fn empty_set_skips_upstream() {
    let source = Arc::new(StaticPriceSource::default());
    let prices = fetcher(source.clone(), 55);

    let snap = prices.get_prices(&BTreeSet::new(), "usd").await.unwrap();
    assert!(snap.is_empty());
    assert_eq!(source.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn clear_cache_forces_refetch() {
    let source = Arc::new(StaticPriceSource::with_prices(&[("bitcoin", 50000.0)]));
    let prices = fetcher(source.clone(), 55);
    let set = ids(&["bitcoin"]);

    prices.get_prices(&set, "usd").await.unwrap();
    prices.clear_cache();
    source.set_price("bitcoin", 51000.0);

    let snap = prices.get_prices(&set, "usd").await.unwrap();
    assert_eq!(snap["bitcoin"], 51000.0);
    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn changing_watch_sets_do_not_accumulate_entries() {
    let source = Arc::new(StaticPriceSource::with_prices(&[("bitcoin", 50000.0)]));
    let prices = fetcher(source.clone(), 55);

    for i in 0..200 {
        let coin = format!("coin-{i}");
        prices.get_prices(&ids(&["bitcoin", coin.as_str()]), "usd").await.unwrap();
        assert!(prices.cache_size() <= 1, "cache size {}", prices.cache_size());

        tokio::time::advance(Duration::from_secs(60)).await;
    }

    assert_eq!(source.calls.load(Ordering::SeqCst), 200);
}
