//! Error types for the Herald service.

use herald_ledger::LedgerError;
use herald_store::StoreError;
use thiserror::Error;

/// Errors that can occur during Herald operations.
#[derive(Debug, Error)]
pub enum HeraldError {
    /// The ledger rejected the operation. Nothing was committed.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl HeraldError {
    /// The ledger rejection behind this error, if any.
    pub fn as_ledger(&self) -> Option<&LedgerError> {
        match self {
            Self::Ledger(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for Herald operations.
pub type Result<T> = std::result::Result<T, HeraldError>;
