use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashSet;
use finvo_core::address;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::WalletError;
use crate::types::{WalletBalanceView, LAMPORTS_PER_SOL};

/// One capability surface for every wallet backing.
///
/// `connect` takes an identity reference: a plain address for on-chain
/// adapters, or a secret phrase for the simulated adapter, and returns the
/// wallet address a session was established for.
#[async_trait]
pub trait WalletAdapter: Send + Sync {
    /// Establish a session and return the wallet address.
    async fn connect(&self, identity: &str) -> Result<String, WalletError>;

    /// Tear down a session.
    async fn disconnect(&self, address: &str) -> Result<(), WalletError>;

    /// Current balance of `address`.
    async fn balance(&self, address: &str) -> Result<WalletBalanceView, WalletError>;

    /// Sign `message` with the wallet key.
    async fn sign_message(&self, address: &str, message: &[u8])
        -> Result<Vec<u8>, WalletError>;

    /// Stable identifier for logs.
    fn adapter_id(&self) -> &str;
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u32,
    method: &'static str,
    params: (&'a str,),
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<RpcBalanceResult>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcBalanceResult {
    value: u64,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Wallet adapter over a Solana JSON-RPC endpoint.
///
/// Sessions are stateless here: connecting just validates the address.
/// Signing is refused, because this service never holds keys.
pub struct RpcWalletAdapter {
    rpc_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl RpcWalletAdapter {
    /// Create an adapter against `rpc_url` with a per-request timeout.
    pub fn new(rpc_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl WalletAdapter for RpcWalletAdapter {
    async fn connect(&self, identity: &str) -> Result<String, WalletError> {
        if !address::is_wellformed(identity) {
            return Err(WalletError::InvalidAddress(identity.to_string()));
        }
        tracing::debug!(address = %identity, "wallet connected");
        Ok(identity.to_string())
    }

    async fn disconnect(&self, _address: &str) -> Result<(), WalletError> {
        Ok(())
    }

    async fn balance(&self, address: &str) -> Result<WalletBalanceView, WalletError> {
        if !address::is_wellformed(address) {
            return Err(WalletError::InvalidAddress(address.to_string()));
        }

        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method: "getBalance",
            params: (address,),
        };
        let response = self
            .client
            .post(&self.rpc_url)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| WalletError::Rpc(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(WalletError::Rpc(format!(
                "rpc returned HTTP {}",
                response.status()
            )));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| WalletError::Rpc(format!("malformed rpc response: {}", e)))?;

        if let Some(err) = body.error {
            return Err(WalletError::Rpc(format!(
                "rpc error {}: {}",
                err.code, err.message
            )));
        }
        let result = body
            .result
            .ok_or_else(|| WalletError::Rpc("rpc response missing result".into()))?;

        Ok(WalletBalanceView::from_lamports(address, result.value))
    }

    async fn sign_message(
        &self,
        _address: &str,
        _message: &[u8],
    ) -> Result<Vec<u8>, WalletError> {
        Err(WalletError::Unsupported(
            "signing requires a local keypair".into(),
        ))
    }

    fn adapter_id(&self) -> &str {
        "solana-rpc"
    }
}

/// Deterministic in-process wallet adapter.
///
/// Connecting derives a stable `sim`-prefixed address from the secret, so
/// the same secret always maps to the same wallet. Balances and signatures
/// are pure functions of their inputs.
pub struct SimulatedWalletAdapter {
    connected: DashSet<String>,
}

impl SimulatedWalletAdapter {
    /// Create an adapter with no open sessions.
    pub fn new() -> Self {
        Self {
            connected: DashSet::new(),
        }
    }

    /// The address derived for `secret`.
    pub fn derive_address(secret: &str) -> String {
        let digest = Sha256::digest(secret.as_bytes());
        format!(
            "{}{}",
            address::SIMULATED_PREFIX,
            bs58::encode(&digest[..16]).into_string()
        )
    }

    /// Number of open sessions.
    pub fn session_count(&self) -> usize {
        self.connected.len()
    }

    fn derived_lamports(address: &str) -> u64 {
        let digest = Sha256::digest(address.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(bytes) % (100 * LAMPORTS_PER_SOL)
    }
}

impl Default for SimulatedWalletAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WalletAdapter for SimulatedWalletAdapter {
    async fn connect(&self, identity: &str) -> Result<String, WalletError> {
        if identity.trim().is_empty() {
            return Err(WalletError::InvalidAddress(
                "empty wallet secret".to_string(),
            ));
        }
        let derived = Self::derive_address(identity);
        self.connected.insert(derived.clone());
        tracing::debug!(address = %derived, "simulated wallet connected");
        Ok(derived)
    }

    async fn disconnect(&self, address: &str) -> Result<(), WalletError> {
        if self.connected.remove(address).is_none() {
            return Err(WalletError::NotConnected(address.to_string()));
        }
        Ok(())
    }

    async fn balance(&self, address: &str) -> Result<WalletBalanceView, WalletError> {
        if !address::is_simulated(address) {
            return Err(WalletError::InvalidAddress(address.to_string()));
        }
        Ok(WalletBalanceView::from_lamports(
            address,
            Self::derived_lamports(address),
        ))
    }

    async fn sign_message(
        &self,
        address: &str,
        message: &[u8],
    ) -> Result<Vec<u8>, WalletError> {
        if !self.connected.contains(address) {
            return Err(WalletError::NotConnected(address.to_string()));
        }
        let mut hasher = Sha256::new();
        hasher.update(address.as_bytes());
        hasher.update(message);
        Ok(hasher.finalize().to_vec())
    }

    fn adapter_id(&self) -> &str {
        "simulated"
    }
}
