use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The totals payload is not a tax-year to amount mapping.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown tax year: {0}")]
    UnknownYear(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
