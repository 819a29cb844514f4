use std::sync::Arc;

use finvo_core::{Currency, FiatCurrency};
use rust_decimal::Decimal;

use crate::cache::PriceCache;
use crate::error::RateError;
use crate::price::RateSnapshot;

/// Converts amounts between supported currencies through a USD bridge.
///
/// Crypto legs are priced from a single rate snapshot per conversion.
/// Non-USD fiat currencies are valued at 1:1 USD parity until a fiat rate
/// feed exists; every such conversion logs a warning.
pub struct CurrencyConverter {
    cache: Arc<PriceCache>,
}

impl CurrencyConverter {
    /// Create a converter over the given price cache.
    pub fn new(cache: Arc<PriceCache>) -> Self {
        Self { cache }
    }

    /// Convert `amount` from one currency to another at current rates.
    ///
    /// Rates are resolved strictly: a feed failure surfaces instead of a
    /// stale substitute, since conversions back settlement decisions.
    pub async fn convert(
        &self,
        amount: Decimal,
        from: Currency,
        to: Currency,
    ) -> Result<Decimal, RateError> {
        if from == to {
            return Ok(amount);
        }

        let snapshot = self.snapshot_for(from, to).await?;
        convert_with(&snapshot, amount, from, to)
    }

    /// Resolve one snapshot covering every crypto leg of a `from` -> `to`
    /// conversion. Callers that derive several figures from the same payment
    /// reuse it so all of them price identically.
    pub async fn snapshot_for(
        &self,
        from: Currency,
        to: Currency,
    ) -> Result<RateSnapshot, RateError> {
        let mut symbols = Vec::with_capacity(2);
        if let Some(symbol) = from.as_crypto() {
            symbols.push(symbol);
        }
        if let Some(symbol) = to.as_crypto() {
            symbols.push(symbol);
        }
        self.cache.snapshot(&symbols).await
    }
}

/// Pure conversion against an already-resolved rate snapshot.
///
/// The result is rounded to the target currency's precision.
pub fn convert_with(
    snapshot: &RateSnapshot,
    amount: Decimal,
    from: Currency,
    to: Currency,
) -> Result<Decimal, RateError> {
    if from == to {
        return Ok(amount);
    }

    let usd_value = match from {
        Currency::Fiat(fiat) => fiat_as_usd(fiat, amount),
        Currency::Crypto(symbol) => {
            let price = snapshot
                .price_usd(symbol)
                .ok_or_else(|| RateError::UnsupportedCurrency(symbol.to_string()))?;
            amount * price
        }
    };

    let converted = match to {
        Currency::Fiat(fiat) => fiat_as_usd(fiat, usd_value),
        Currency::Crypto(symbol) => {
            let price = snapshot
                .price_usd(symbol)
                .ok_or_else(|| RateError::UnsupportedCurrency(symbol.to_string()))?;
            if price <= Decimal::ZERO {
                return Err(RateError::Internal(format!(
                    "non-positive price for {}: {}",
                    symbol, price
                )));
            }
            usd_value / price
        }
    };

    Ok(converted.round_dp(to.decimals()))
}

/// Value a fiat amount in USD. Non-USD fiat is held at 1:1 parity, loudly.
fn fiat_as_usd(fiat: FiatCurrency, amount: Decimal) -> Decimal {
    if fiat != FiatCurrency::USD {
        tracing::warn!(
            currency = fiat.code(),
            "no fiat rate feed, valuing at 1:1 USD parity"
        );
    }
    amount
}
