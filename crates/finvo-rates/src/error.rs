/// Rate-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum RateError {
    #[error("no market price for currency: {0}")]
    UnsupportedCurrency(String),

    #[error("price feed unavailable: {0}")]
    Upstream(String),

    #[error("internal rate error: {0}")]
    Internal(String),
}
