use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lamports per SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// A wallet balance as served to clients. Informational only, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletBalanceView {
    pub address: String,
    /// Balance in whole native units (SOL).
    pub balance: Decimal,
    /// Balance in the smallest on-chain unit.
    pub lamports: u64,
}

impl WalletBalanceView {
    /// Build a view from a raw lamport balance.
    pub fn from_lamports(address: impl Into<String>, lamports: u64) -> Self {
        Self {
            address: address.into(),
            balance: Decimal::from_i128_with_scale(lamports as i128, 9),
            lamports,
        }
    }
}
