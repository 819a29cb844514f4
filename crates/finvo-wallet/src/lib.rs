//! Finvo Wallet
//!
//! Wallet adapters for the Solana rail and balance resolution for the
//! HTTP API. Adapters are pluggable: a JSON-RPC adapter for live chains
//! and a deterministic simulated adapter for offline deployments.

pub mod adapter;
pub mod error;
pub mod resolver;
pub mod types;

pub use adapter::{RpcWalletAdapter, SimulatedWalletAdapter, WalletAdapter};
pub use error::WalletError;
pub use resolver::WalletBalanceResolver;
pub use types::{WalletBalanceView, LAMPORTS_PER_SOL};
