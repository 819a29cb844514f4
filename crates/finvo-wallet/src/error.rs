/// Wallet-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("wallet not connected: {0}")]
    NotConnected(String),

    #[error("rpc request failed: {0}")]
    Rpc(String),

    #[error("operation not supported by this adapter: {0}")]
    Unsupported(String),
}
