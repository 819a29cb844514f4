use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use dashmap::DashMap;
use finvo_core::CryptoCurrency;
use tokio::sync::Mutex;

use crate::error::RateError;
use crate::feed::PriceFeed;
use crate::price::{CryptoPrice, RateSnapshot};

/// Default time-to-live for cached prices.
pub const DEFAULT_TTL_SECS: u64 = 60;

/// TTL cache over a price feed.
///
/// Refreshes for the same symbol coalesce: callers that arrive while a
/// refresh is in flight wait for it and share its result instead of issuing
/// their own upstream call. On a failed refresh the lenient read path serves
/// the last known value; the strict path surfaces the failure.
pub struct PriceCache {
    feed: Arc<dyn PriceFeed>,
    ttl: Duration,
    prices: DashMap<CryptoCurrency, CryptoPrice>,
    refresh_locks: DashMap<CryptoCurrency, Arc<Mutex<()>>>,
    batch_lock: Mutex<()>,
}

impl PriceCache {
    /// Create a cache over `feed` with the given TTL in seconds.
    pub fn new(feed: Arc<dyn PriceFeed>, ttl_secs: u64) -> Self {
        Self {
            feed,
            ttl: Duration::seconds(ttl_secs as i64),
            prices: DashMap::new(),
            refresh_locks: DashMap::new(),
            batch_lock: Mutex::new(()),
        }
    }

    /// Create a cache with the default 60 second TTL.
    pub fn with_default_ttl(feed: Arc<dyn PriceFeed>) -> Self {
        Self::new(feed, DEFAULT_TTL_SECS)
    }

    /// Get the price for `symbol`, refreshing when the cached value is
    /// missing, older than the TTL, or `force_refresh` is set.
    ///
    /// Lenient: a failed refresh falls back to the last known value when
    /// one exists.
    pub async fn get(
        &self,
        symbol: CryptoCurrency,
        force_refresh: bool,
    ) -> Result<CryptoPrice, RateError> {
        if !force_refresh {
            if let Some(hit) = self.cached_fresh(symbol) {
                return Ok(hit);
            }
        }

        match self.refresh(symbol).await {
            Ok(price) => Ok(price),
            Err(err) => match self.prices.get(&symbol) {
                Some(stale) => {
                    tracing::warn!(
                        symbol = %symbol,
                        error = %err,
                        observed_at = %stale.observed_at,
                        "price refresh failed, serving last known value"
                    );
                    Ok(stale.clone())
                }
                None => Err(err),
            },
        }
    }

    /// Get a TTL-fresh price for `symbol`, never substituting stale data.
    ///
    /// This is the read used when money moves; a feed failure is surfaced
    /// rather than papered over.
    pub async fn get_fresh(&self, symbol: CryptoCurrency) -> Result<CryptoPrice, RateError> {
        if let Some(hit) = self.cached_fresh(symbol) {
            return Ok(hit);
        }
        self.refresh(symbol).await
    }

    /// Get prices for all supported symbols with one batched upstream call
    /// for whatever needs refreshing.
    pub async fn get_all(&self, force_refresh: bool) -> Result<Vec<CryptoPrice>, RateError> {
        let started = Utc::now();
        let needed = self.symbols_needing_refresh(force_refresh);

        if !needed.is_empty() {
            let _guard = self.batch_lock.lock().await;
            // A batch that completed while this caller waited covers any
            // symbol observed at or after the wait began.
            let still_needed: Vec<CryptoCurrency> = needed
                .into_iter()
                .filter(|symbol| {
                    self.prices
                        .get(symbol)
                        .map_or(true, |p| p.observed_at < started)
                })
                .collect();

            if !still_needed.is_empty() {
                match self.feed.fetch(&still_needed).await {
                    Ok(prices) => {
                        for price in prices {
                            self.prices.insert(price.symbol, price);
                        }
                    }
                    Err(err) => {
                        let all_known = CryptoCurrency::ALL
                            .iter()
                            .all(|symbol| self.prices.contains_key(symbol));
                        if !all_known {
                            return Err(err);
                        }
                        tracing::warn!(
                            error = %err,
                            "price refresh failed, serving last known values"
                        );
                    }
                }
            }
        }

        Ok(CryptoCurrency::ALL
            .iter()
            .filter_map(|symbol| self.prices.get(symbol).map(|p| p.clone()))
            .collect())
    }

    /// Resolve every symbol into one immutable snapshot, strictly.
    pub async fn snapshot(&self, symbols: &[CryptoCurrency]) -> Result<RateSnapshot, RateError> {
        let mut prices = HashMap::new();
        for symbol in symbols {
            if prices.contains_key(symbol) {
                continue;
            }
            let price = self.get_fresh(*symbol).await?;
            prices.insert(*symbol, price.price_usd);
        }
        Ok(RateSnapshot::new(prices))
    }

    fn cached_fresh(&self, symbol: CryptoCurrency) -> Option<CryptoPrice> {
        self.prices
            .get(&symbol)
            .filter(|hit| hit.is_fresh(self.ttl, Utc::now()))
            .map(|hit| hit.clone())
    }

    fn symbols_needing_refresh(&self, force_refresh: bool) -> Vec<CryptoCurrency> {
        let now = Utc::now();
        CryptoCurrency::ALL
            .iter()
            .copied()
            .filter(|symbol| {
                force_refresh
                    || self
                        .prices
                        .get(symbol)
                        .map_or(true, |p| !p.is_fresh(self.ttl, now))
            })
            .collect()
    }

    /// Refresh one symbol through its per-symbol lock.
    ///
    /// The lock serializes refreshes; the watermark recheck after acquiring
    /// it turns N concurrent refreshes into one upstream call whose result
    /// every waiter shares.
    async fn refresh(&self, symbol: CryptoCurrency) -> Result<CryptoPrice, RateError> {
        let started = Utc::now();
        let lock = self
            .refresh_locks
            .entry(symbol)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        if let Some(hit) = self.prices.get(&symbol) {
            if hit.observed_at >= started {
                return Ok(hit.clone());
            }
        }

        let fetched = self.feed.fetch(&[symbol]).await?;
        let price = fetched
            .into_iter()
            .find(|p| p.symbol == symbol)
            .ok_or_else(|| {
                RateError::Upstream(format!("feed returned no price for {}", symbol))
            })?;
        self.prices.insert(symbol, price.clone());

        tracing::debug!(
            symbol = %symbol,
            price_usd = %price.price_usd,
            source = self.feed.source_id(),
            "price refreshed"
        );
        Ok(price)
    }
}
