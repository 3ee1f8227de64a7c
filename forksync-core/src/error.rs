use std::fmt;

use alloy::primitives::Address;
use thiserror::Error;

use crate::amount::BaseUnits;
use crate::pool::{AssetSlot, LedgerKind};

/// Snapshot failure; aborts the run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReadError {
    #[error("{ledger} ledger unreachable: {message}")]
    Unreachable { ledger: LedgerKind, message: String },
    #[error("{ledger} ledger returned an unusable response for {pool}: {message}")]
    Malformed {
        ledger: LedgerKind,
        pool: Address,
        message: String,
    },
}

/// Funding-service failure; non-fatal, the correction stays unapplied.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FundServiceError {
    #[error("funding service transport failed: {0}")]
    Transport(String),
    #[error("funding service rejected the request (code {code}): {message}")]
    Rejected { code: i64, message: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BurnStage {
    /// The pool could not be impersonated, so nothing was sent.
    Impersonate,
    Approve,
    Transfer,
}

impl fmt::Display for BurnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Impersonate => f.write_str("impersonate"),
            Self::Approve => f.write_str("approve"),
            Self::Transfer => f.write_str("transfer"),
        }
    }
}

/// Burn failure at one stage; ends that asset's corrective path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{stage} for burning {amount} {asset} failed: {message}")]
pub struct BurnError {
    pub stage: BurnStage,
    pub asset: Address,
    pub amount: BaseUnits,
    pub message: String,
}

/// Both the primary and the secondary commit failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("pool commit failed: sync: {primary}; skim: {secondary}")]
pub struct FinalizeError {
    pub primary: String,
    pub secondary: String,
}

/// One slot that still differs after the run committed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotMismatch {
    pub slot: AssetSlot,
    pub reference: BaseUnits,
    pub sandbox: BaseUnits,
}

impl fmt::Display for SlotMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} reference={} sandbox={}",
            self.slot, self.reference, self.sandbox
        )
    }
}

/// Post-commit verification mismatch. Observational only.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("sandbox did not converge: {}", describe_mismatches(.mismatches))]
pub struct ConvergenceWarning {
    pub mismatches: Vec<SlotMismatch>,
}

fn describe_mismatches(mismatches: &[SlotMismatch]) -> String {
    mismatches
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Invalid or incomplete configuration; raised before any ledger call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("missing required configuration key `{0}`")]
    Missing(&'static str),
    #[error("invalid value for `{key}`: {message}")]
    Invalid { key: &'static str, message: String },
    #[error("failed to load configuration: {0}")]
    Load(String),
}

/// Native-funds precondition could not be satisfied.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BootstrapError {
    #[error("native balance read failed: {0}")]
    Balance(String),
    #[error("pool has no native balance and no signer key is configured for injection")]
    MissingSigner,
    #[error("operator funding failed: {0}")]
    Funding(#[from] FundServiceError),
    #[error("injector deployment failed: {0}")]
    Deploy(String),
    #[error("native balance of {0} is still zero after injection")]
    NotApplied(Address),
}

/// Fatal errors that terminate a run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
}
