//! Integration test: currency conversion over the cached price feed.
//!
//! Exercises finvo-rates end to end: the simulated feed, the TTL cache
//! with request coalescing, and the USD-bridged converter.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;

use finvo_core::{CryptoCurrency, Currency, FiatCurrency};
use finvo_rates::{CurrencyConverter, PriceCache, SimulatedFeed};

fn converter_over(feed: Arc<SimulatedFeed>) -> CurrencyConverter {
    let cache = Arc::new(PriceCache::with_default_ttl(feed));
    CurrencyConverter::new(cache)
}

// =========================================================================
// Conversion arithmetic
// =========================================================================

#[tokio::test]
async fn test_usd_sol_round_trip() {
    let converter = converter_over(Arc::new(SimulatedFeed::new()));
    let usd = Currency::Fiat(FiatCurrency::USD);
    let sol = Currency::Crypto(CryptoCurrency::SOL);

    // 80 USD/SOL in the simulated table
    let bought = converter.convert(dec!(1000), usd, sol).await.unwrap();
    assert_eq!(bought, dec!(12.5));

    let back = converter.convert(bought, sol, usd).await.unwrap();
    assert_eq!(back, dec!(1000.00));
}

#[tokio::test]
async fn test_cross_crypto_routes_through_usd() {
    let converter = converter_over(Arc::new(SimulatedFeed::new()));
    let btc = Currency::Crypto(CryptoCurrency::BTC);
    let eth = Currency::Crypto(CryptoCurrency::ETH);

    // 1 BTC = 40000 USD, 1 ETH = 2500 USD
    let converted = converter.convert(dec!(1), btc, eth).await.unwrap();
    assert_eq!(converted, dec!(16));
}

#[tokio::test]
async fn test_fiat_legs_hold_usd_parity() {
    let converter = converter_over(Arc::new(SimulatedFeed::new()));
    let usd = Currency::Fiat(FiatCurrency::USD);
    let eur = Currency::Fiat(FiatCurrency::EUR);

    // Non-USD fiat has no rate feed and is valued 1:1
    let converted = converter.convert(dec!(100), usd, eur).await.unwrap();
    assert_eq!(converted, dec!(100.00));
}

#[tokio::test]
async fn test_same_currency_skips_the_feed() {
    let feed = Arc::new(SimulatedFeed::new());
    let converter = converter_over(Arc::clone(&feed));
    let sol = Currency::Crypto(CryptoCurrency::SOL);

    let converted = converter.convert(dec!(3), sol, sol).await.unwrap();
    assert_eq!(converted, dec!(3));
    assert_eq!(feed.fetch_count(), 0);
}

// =========================================================================
// Cache behavior under load and outage
// =========================================================================

#[tokio::test]
async fn test_repeat_conversions_reuse_cached_prices() {
    let feed = Arc::new(SimulatedFeed::new());
    let converter = converter_over(Arc::clone(&feed));
    let usd = Currency::Fiat(FiatCurrency::USD);
    let sol = Currency::Crypto(CryptoCurrency::SOL);

    converter.convert(dec!(1000), usd, sol).await.unwrap();
    converter.convert(dec!(500), usd, sol).await.unwrap();
    converter.convert(dec!(12.5), sol, usd).await.unwrap();

    // One upstream fetch serves every conversion within the TTL
    assert_eq!(feed.fetch_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_forced_refreshes_coalesce() {
    let feed = Arc::new(SimulatedFeed::with_latency(Duration::from_millis(50)));
    let cache = Arc::new(PriceCache::with_default_ttl(Arc::clone(&feed)));

    let (a, b) = tokio::join!(
        cache.get(CryptoCurrency::SOL, true),
        cache.get(CryptoCurrency::SOL, true),
    );
    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(feed.fetch_count(), 1);
}

#[tokio::test]
async fn test_outage_serves_stale_reads_but_fails_fresh_ones() {
    let feed = Arc::new(SimulatedFeed::new());
    let cache = Arc::new(PriceCache::new(Arc::clone(&feed), 0));

    // Prime the cache, then take the feed down
    let primed = cache.get(CryptoCurrency::SOL, false).await.unwrap();
    feed.set_failing(true);

    // Display reads fall back to the last known value
    let stale = cache.get(CryptoCurrency::SOL, true).await.unwrap();
    assert_eq!(stale.price_usd, primed.price_usd);

    // Settlement-grade reads refuse the substitute
    assert!(cache.get_fresh(CryptoCurrency::SOL).await.is_err());
}
