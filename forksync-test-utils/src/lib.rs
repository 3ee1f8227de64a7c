//! Test doubles for the reconciliation pipeline.

mod faucet;
mod injector;
mod ledger;

pub use faucet::{FaucetRequest, MockFaucet};
pub use injector::MockInjector;
pub use ledger::{MockLedger, SentCall};

use alloy::primitives::address;
use forksync_core::{Address, PoolIdentity};

/// Pool address used across fixtures.
pub const POOL: Address = address!("5050505050505050505050505050505050505050");
pub const ASSET0: Address = address!("a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0");
pub const ASSET1: Address = address!("a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1");
pub const OPERATOR: Address = address!("0e0e0e0e0e0e0e0e0e0e0e0e0e0e0e0e0e0e0e0e");

pub fn pool_identity() -> PoolIdentity {
    PoolIdentity::new(POOL, ASSET0, ASSET1)
}
