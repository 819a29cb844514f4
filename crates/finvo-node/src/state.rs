//! Shared application state and component wiring.

use std::sync::Arc;
use std::time::{Duration, Instant};

use finvo_core::{Currency, FiatCurrency};
use finvo_ledger::{InvoiceStore, TransactionLedger};
use finvo_rates::{CurrencyConverter, HttpPriceFeed, PriceCache, PriceFeed, SimulatedFeed};
use finvo_settlement::SettlementProcessor;
use finvo_wallet::{
    RpcWalletAdapter, SimulatedWalletAdapter, WalletAdapter, WalletBalanceResolver,
};
use rust_decimal::Decimal;

use crate::config::FinvoConfig;

/// Everything the API handlers share.
pub struct AppState {
    pub started_at: Instant,
    pub invoices: Arc<InvoiceStore>,
    pub ledger: Arc<TransactionLedger>,
    pub prices: Arc<PriceCache>,
    pub converter: Arc<CurrencyConverter>,
    pub processor: SettlementProcessor,
    pub resolver: WalletBalanceResolver,
    /// Always available for the demo flows, regardless of which adapter
    /// backs the balance resolver.
    pub simulated_wallet: Arc<SimulatedWalletAdapter>,
}

impl AppState {
    /// Wire all components from configuration.
    pub fn build(config: &FinvoConfig) -> Arc<Self> {
        let invoices = Arc::new(InvoiceStore::new());
        let ledger = Arc::new(TransactionLedger::new(invoices.clone()));

        let feed: Arc<dyn PriceFeed> = if config.rates.simulate {
            Arc::new(SimulatedFeed::new())
        } else {
            Arc::new(HttpPriceFeed::new(
                config.rates.endpoint.clone(),
                Duration::from_secs(config.rates.request_timeout_secs),
            ))
        };
        let prices = Arc::new(PriceCache::new(feed, config.rates.ttl_secs));
        let converter = Arc::new(CurrencyConverter::new(prices.clone()));
        let processor = SettlementProcessor::with_tolerance(
            invoices.clone(),
            ledger.clone(),
            converter.clone(),
            config.settlement.tolerance(),
        );

        let simulated_wallet = Arc::new(SimulatedWalletAdapter::new());
        let adapter: Arc<dyn WalletAdapter> = if config.chain.simulate {
            simulated_wallet.clone()
        } else {
            Arc::new(RpcWalletAdapter::new(
                config.chain.rpc_url.clone(),
                Duration::from_secs(config.chain.request_timeout_secs),
            ))
        };
        let resolver = WalletBalanceResolver::new(
            adapter,
            Duration::from_secs(config.chain.request_timeout_secs),
        );

        tracing::info!(
            rates_simulated = config.rates.simulate,
            chain_simulated = config.chain.simulate,
            tolerance_bps = config.settlement.tolerance_bps,
            "application state wired"
        );

        Arc::new(Self {
            started_at: Instant::now(),
            invoices,
            ledger,
            prices,
            converter,
            processor,
            resolver,
            simulated_wallet,
        })
    }

    /// Best-effort USD valuation used to annotate newly created invoices.
    pub async fn usd_value(&self, amount: Decimal, currency: Currency) -> Option<Decimal> {
        self.converter
            .convert(amount, currency, Currency::Fiat(FiatCurrency::USD))
            .await
            .ok()
    }
}
