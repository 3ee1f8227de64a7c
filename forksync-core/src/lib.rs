//! Domain types shared by the reserve reconciliation pipeline.

mod amount;
mod delta;
mod error;
mod pool;

pub use alloy::primitives::{Address, TxHash, U256};
pub use amount::{AmountError, BaseUnits, DisplayAmount};
pub use delta::{CorrectiveAction, Direction, ReconciliationDelta};
pub use error::{
    BootstrapError, BurnError, BurnStage, ConfigurationError, ConvergenceWarning, FinalizeError,
    FundServiceError, ReadError, RunError, SlotMismatch,
};
pub use pool::{AssetMetadata, AssetSlot, LedgerKind, PoolIdentity, ReservePair};

/// Canonical unspendable address that receives burned tokens.
pub const BURN_ADDRESS: Address =
    alloy::primitives::address!("000000000000000000000000000000000000dead");
