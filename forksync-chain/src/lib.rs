//! Ledger clients and sandbox collaborators for reserve reconciliation.
//!
//! Everything that talks to a chain lives here behind `async_trait` seams so
//! the pipeline can run against in-memory doubles in tests.

pub mod abi;
mod actor;
mod error;
mod faucet;
mod injector;
mod ledger;
mod limiter;
mod rpc;

pub use actor::ImpersonatedActor;
pub use error::{ChainError, ChainResult};
pub use faucet::{BuildBearFaucet, FundingService};
pub use injector::{NativeInjector, SelfDestructInjector};
pub use ledger::{EvmLedger, LedgerReader, SandboxLedger};
pub use limiter::RateLimiter;
pub use rpc::{JsonRpcClient, ReceiptPolicy, TxReceipt};

pub use alloy::signers::local::PrivateKeySigner;
