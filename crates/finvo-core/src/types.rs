use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::CoreError;

/// Unique identifier for an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvoiceId(pub Uuid);

impl InvoiceId {
    /// Create a new random invoice ID (UUID v7, time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for InvoiceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for InvoiceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Unique identifier for a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub Uuid);

impl TransactionId {
    /// Create a new random transaction ID (UUID v7, time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TransactionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Currencies supported for invoicing and settlement.
///
/// On the wire a currency is its bare code string ("USD", "SOL").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Currency {
    /// Fiat currency with ISO 4217 code.
    Fiat(FiatCurrency),
    /// Cryptocurrency.
    Crypto(CryptoCurrency),
}

impl Currency {
    /// Currency code.
    pub fn code(&self) -> &str {
        match self {
            Currency::Fiat(fiat) => fiat.code(),
            Currency::Crypto(crypto) => crypto.code(),
        }
    }

    /// Number of decimal places.
    pub fn decimals(&self) -> u32 {
        match self {
            Currency::Fiat(fiat) => fiat.decimals(),
            Currency::Crypto(crypto) => crypto.decimals(),
        }
    }

    /// Parse from a currency code, fiat or crypto.
    pub fn parse(code: &str) -> Result<Self, CoreError> {
        FiatCurrency::from_code(code)
            .map(Currency::Fiat)
            .or_else(|| CryptoCurrency::from_code(code).map(Currency::Crypto))
            .ok_or_else(|| CoreError::UnknownCurrency(code.to_string()))
    }

    /// Whether this is a fiat currency.
    pub fn is_fiat(&self) -> bool {
        matches!(self, Currency::Fiat(_))
    }

    /// Whether this is a cryptocurrency.
    pub fn is_crypto(&self) -> bool {
        matches!(self, Currency::Crypto(_))
    }

    /// The crypto symbol, if this is a cryptocurrency.
    pub fn as_crypto(&self) -> Option<CryptoCurrency> {
        match self {
            Currency::Crypto(crypto) => Some(*crypto),
            Currency::Fiat(_) => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl TryFrom<String> for Currency {
    type Error = CoreError;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        Currency::parse(&code)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.code().to_string()
    }
}

/// ISO 4217 fiat currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FiatCurrency {
    USD,
    EUR,
    GBP,
}

impl FiatCurrency {
    /// ISO 4217 code.
    pub fn code(&self) -> &str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
        }
    }

    /// Number of decimal places.
    pub fn decimals(&self) -> u32 {
        2
    }

    /// Parse from ISO 4217 code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "USD" => Some(Self::USD),
            "EUR" => Some(Self::EUR),
            "GBP" => Some(Self::GBP),
            _ => None,
        }
    }
}

/// Cryptocurrencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CryptoCurrency {
    SOL,
    USDC,
    USDT,
    BTC,
    ETH,
}

impl CryptoCurrency {
    /// All supported crypto symbols.
    pub const ALL: [Self; 5] = [Self::SOL, Self::USDC, Self::USDT, Self::BTC, Self::ETH];

    /// Currency symbol.
    pub fn code(&self) -> &str {
        match self {
            Self::SOL => "SOL",
            Self::USDC => "USDC",
            Self::USDT => "USDT",
            Self::BTC => "BTC",
            Self::ETH => "ETH",
        }
    }

    /// Number of decimal places in the smallest on-chain unit.
    pub fn decimals(&self) -> u32 {
        match self {
            Self::SOL => 9,
            Self::USDC | Self::USDT => 6,
            Self::BTC => 8,
            Self::ETH => 18,
        }
    }

    /// Parse from code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "SOL" => Some(Self::SOL),
            "USDC" => Some(Self::USDC),
            "USDT" => Some(Self::USDT),
            "BTC" => Some(Self::BTC),
            "ETH" => Some(Self::ETH),
            _ => None,
        }
    }
}

impl fmt::Display for CryptoCurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
