//! Wallet address syntax checks.
//!
//! Solana addresses are base58-encoded Ed25519 public keys: exactly 32 bytes,
//! rendered as 32 to 44 characters. Simulated wallets use a `sim` prefix and
//! never decode to a real key.

/// Minimum rendered length of a base58 32-byte key.
pub const MIN_ADDRESS_LEN: usize = 32;
/// Maximum rendered length of a base58 32-byte key.
pub const MAX_ADDRESS_LEN: usize = 44;

/// Prefix marking addresses issued by the simulated wallet adapter.
pub const SIMULATED_PREFIX: &str = "sim";

/// Whether `address` is a well-formed on-chain address: base58 within the
/// rendered length bounds, decoding to exactly 32 bytes.
pub fn is_wellformed(address: &str) -> bool {
    if address.len() < MIN_ADDRESS_LEN || address.len() > MAX_ADDRESS_LEN {
        return false;
    }
    matches!(bs58::decode(address).into_vec(), Ok(bytes) if bytes.len() == 32)
}

/// Looser payer-side check: accepts both well-formed on-chain addresses and
/// simulated ones. Rejects empty, oversized, or non-alphanumeric input.
pub fn is_plausible(address: &str) -> bool {
    let len = address.len();
    len >= 8 && len <= MAX_ADDRESS_LEN && address.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Whether `address` matches the simulated-wallet pattern.
pub fn is_simulated(address: &str) -> bool {
    address.starts_with(SIMULATED_PREFIX)
}
