//! Node configuration loading and management.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Full configuration for the finvo node.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FinvoConfig {
    /// HTTP API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Price feed settings.
    #[serde(default)]
    pub rates: RatesConfig,

    /// Chain access settings.
    #[serde(default)]
    pub chain: ChainConfig,

    /// Settlement settings.
    #[serde(default)]
    pub settlement: SettlementConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API listen address.
    #[serde(default = "default_api_addr")]
    pub listen_addr: String,
    /// API port.
    #[serde(default = "default_api_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatesConfig {
    /// Price feed base URL.
    #[serde(default = "default_rates_endpoint")]
    pub endpoint: String,
    /// Serve deterministic simulated prices instead of querying the feed.
    #[serde(default = "default_true")]
    pub simulate: bool,
    /// Price cache time-to-live in seconds.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Upstream request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Solana JSON-RPC endpoint.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Use the simulated wallet adapter instead of RPC.
    #[serde(default = "default_true")]
    pub simulate: bool,
    /// RPC request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementConfig {
    /// Accepted payment shortfall in basis points.
    #[serde(default = "default_tolerance_bps")]
    pub tolerance_bps: u32,
}

impl SettlementConfig {
    /// Tolerance as a decimal fraction, e.g. 50 bps is 0.005.
    pub fn tolerance(&self) -> Decimal {
        Decimal::new(self.tolerance_bps as i64, 4)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_api_addr() -> String {
    "127.0.0.1".into()
}
fn default_api_port() -> u16 {
    8080
}
fn default_rates_endpoint() -> String {
    "https://api.coingecko.com/api/v3".into()
}
fn default_true() -> bool {
    true
}
fn default_ttl_secs() -> u64 {
    60
}
fn default_request_timeout_secs() -> u64 {
    10
}
fn default_rpc_url() -> String {
    "https://api.devnet.solana.com".into()
}
fn default_tolerance_bps() -> u32 {
    50
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_api_addr(),
            port: default_api_port(),
        }
    }
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            endpoint: default_rates_endpoint(),
            simulate: true,
            ttl_secs: default_ttl_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            simulate: true,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            tolerance_bps: default_tolerance_bps(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl FinvoConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: FinvoConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }
}
