use forksync_core::{Address, LedgerKind, ReadError, TxHash};
use thiserror::Error;

/// Result alias for ledger client operations.
pub type ChainResult<T> = Result<T, ChainError>;

/// Error type surfaced by ledger and sandbox clients.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("transaction {0} reverted")]
    Reverted(TxHash),
    #[error("no receipt for transaction {hash} after {polls} polls")]
    ReceiptTimeout { hash: TxHash, polls: u32 },
    #[error("call to {0} returned false")]
    ReturnedFalse(Address),
    #[error("{0} is not impersonated on this ledger")]
    NotImpersonated(Address),
}

impl ChainError {
    /// Classify a failed reserve read for the snapshot stage.
    pub fn into_read_error(self, ledger: LedgerKind, pool: Address) -> ReadError {
        match self {
            Self::Transport(message) => ReadError::Unreachable { ledger, message },
            other => ReadError::Malformed {
                ledger,
                pool,
                message: other.to_string(),
            },
        }
    }
}

impl From<alloy::sol_types::Error> for ChainError {
    fn from(value: alloy::sol_types::Error) -> Self {
        Self::Decode(value.to_string())
    }
}

impl From<reqwest::Error> for ChainError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}
