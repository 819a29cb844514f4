use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use finvo_core::CryptoCurrency;
use rust_decimal::Decimal;

use crate::error::RateError;
use crate::price::CryptoPrice;

/// Source of USD market prices.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Fetch current USD prices for the given symbols.
    async fn fetch(&self, symbols: &[CryptoCurrency]) -> Result<Vec<CryptoPrice>, RateError>;

    /// Stable identifier for logs.
    fn source_id(&self) -> &str;
}

/// Default upstream for the HTTP feed.
pub const DEFAULT_FEED_URL: &str = "https://api.coingecko.com/api/v3";

/// CoinGecko-style `simple/price` HTTP feed.
pub struct HttpPriceFeed {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpPriceFeed {
    /// Create a feed against `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
            timeout,
        }
    }

    /// Upstream asset identifier for a symbol.
    fn provider_id(symbol: CryptoCurrency) -> &'static str {
        match symbol {
            CryptoCurrency::SOL => "solana",
            CryptoCurrency::USDC => "usd-coin",
            CryptoCurrency::USDT => "tether",
            CryptoCurrency::BTC => "bitcoin",
            CryptoCurrency::ETH => "ethereum",
        }
    }
}

#[async_trait]
impl PriceFeed for HttpPriceFeed {
    async fn fetch(&self, symbols: &[CryptoCurrency]) -> Result<Vec<CryptoPrice>, RateError> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<&str> = symbols.iter().map(|s| Self::provider_id(*s)).collect();
        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd",
            self.base_url,
            ids.join(",")
        );

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| RateError::Upstream(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(RateError::Upstream(format!(
                "feed returned HTTP {}",
                response.status()
            )));
        }

        let body: HashMap<String, HashMap<String, Decimal>> = response
            .json()
            .await
            .map_err(|e| RateError::Upstream(format!("malformed feed response: {}", e)))?;

        let mut prices = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let price_usd = body
                .get(Self::provider_id(*symbol))
                .and_then(|entry| entry.get("usd"))
                .copied()
                .ok_or_else(|| {
                    RateError::Upstream(format!("feed response missing price for {}", symbol))
                })?;
            prices.push(CryptoPrice::now(*symbol, price_usd));
        }

        tracing::debug!(
            symbols = symbols.len(),
            source = self.source_id(),
            "fetched market prices"
        );
        Ok(prices)
    }

    fn source_id(&self) -> &str {
        "coingecko"
    }
}

/// Deterministic in-process feed.
///
/// Serves a fixed price table, counts upstream calls, and can be switched
/// into a failing mode. Used for offline/demo deployments and as the
/// instrument for cache behavior tests.
pub struct SimulatedFeed {
    prices: DashMap<CryptoCurrency, Decimal>,
    fetch_count: AtomicUsize,
    failing: AtomicBool,
    latency: Option<Duration>,
}

impl SimulatedFeed {
    /// Create a feed with the default price table.
    pub fn new() -> Self {
        let prices = DashMap::new();
        prices.insert(CryptoCurrency::SOL, Decimal::from(80));
        prices.insert(CryptoCurrency::BTC, Decimal::from(40_000));
        prices.insert(CryptoCurrency::ETH, Decimal::from(2_500));
        prices.insert(CryptoCurrency::USDC, Decimal::ONE);
        prices.insert(CryptoCurrency::USDT, Decimal::ONE);
        Self {
            prices,
            fetch_count: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            latency: None,
        }
    }

    /// Create a feed that suspends for `latency` inside each fetch, like a
    /// real network call would.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::new()
        }
    }

    /// Override the price for one symbol.
    pub fn set_price(&self, symbol: CryptoCurrency, price_usd: Decimal) {
        self.prices.insert(symbol, price_usd);
    }

    /// Make subsequent fetches fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of fetches issued against this feed.
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

impl Default for SimulatedFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceFeed for SimulatedFeed {
    async fn fetch(&self, symbols: &[CryptoCurrency]) -> Result<Vec<CryptoPrice>, RateError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(RateError::Upstream("simulated feed failure".into()));
        }

        symbols
            .iter()
            .map(|symbol| {
                self.prices
                    .get(symbol)
                    .map(|price| CryptoPrice::now(*symbol, *price))
                    .ok_or_else(|| RateError::UnsupportedCurrency(symbol.to_string()))
            })
            .collect()
    }

    fn source_id(&self) -> &str {
        "simulated"
    }
}
