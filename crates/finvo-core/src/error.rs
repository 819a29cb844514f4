/// Core type errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("unknown currency code: {0}")]
    UnknownCurrency(String),

    #[error("unknown status: {0}")]
    UnknownStatus(String),
}
