use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use finvo_core::CryptoCurrency;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One USD price observation for a crypto symbol.
///
/// Observations are immutable; the cache replaces whole values on refresh,
/// so readers always see a consistent (symbol, price, time) triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoPrice {
    pub symbol: CryptoCurrency,
    pub price_usd: Decimal,
    pub observed_at: DateTime<Utc>,
}

impl CryptoPrice {
    /// Create an observation stamped with the current time.
    pub fn now(symbol: CryptoCurrency, price_usd: Decimal) -> Self {
        Self {
            symbol,
            price_usd,
            observed_at: Utc::now(),
        }
    }

    /// Whether the observation is younger than `ttl` as of `now`.
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now - self.observed_at < ttl
    }
}

/// An immutable set of USD rates backing one logical conversion.
///
/// Both legs of a cross-currency conversion are priced from the same
/// snapshot, so a concurrent cache refresh can never mix rates from two
/// different market moments inside one conversion.
#[derive(Debug, Clone)]
pub struct RateSnapshot {
    prices: HashMap<CryptoCurrency, Decimal>,
    taken_at: DateTime<Utc>,
}

impl RateSnapshot {
    /// Build a snapshot from resolved per-symbol USD prices.
    pub fn new(prices: HashMap<CryptoCurrency, Decimal>) -> Self {
        Self {
            prices,
            taken_at: Utc::now(),
        }
    }

    /// The USD price for `symbol`, if the snapshot covers it.
    pub fn price_usd(&self, symbol: CryptoCurrency) -> Option<Decimal> {
        self.prices.get(&symbol).copied()
    }

    /// When the snapshot was assembled.
    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }
}
