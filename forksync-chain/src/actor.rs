use std::fmt;
use std::sync::Arc;

use alloy::primitives::Bytes;
use alloy::sol_types::SolValue;
use forksync_core::{Address, BaseUnits};

use crate::abi;
use crate::error::{ChainError, ChainResult};
use crate::ledger::SandboxLedger;
use crate::rpc::TxReceipt;

/// Capability to act as one fixed address on the sandbox without its key.
///
/// The address is bound at acquisition and cannot be changed, so a handle for
/// the pool can never sign for anything else.
#[derive(Clone)]
pub struct ImpersonatedActor {
    address: Address,
    ledger: Arc<dyn SandboxLedger>,
}

impl ImpersonatedActor {
    pub async fn acquire(ledger: Arc<dyn SandboxLedger>, address: Address) -> ChainResult<Self> {
        ledger.impersonate(address).await?;
        Ok(Self { address, ledger })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn approve(
        &self,
        asset: Address,
        spender: Address,
        amount: BaseUnits,
    ) -> ChainResult<TxReceipt> {
        self.send_token_call(asset, abi::approve(spender, amount.raw())).await
    }

    pub async fn transfer(
        &self,
        asset: Address,
        to: Address,
        amount: BaseUnits,
    ) -> ChainResult<TxReceipt> {
        self.send_token_call(asset, abi::transfer(to, amount.raw())).await
    }

    /// Pool primary commit: re-derive reserves from actual balances.
    pub async fn sync(&self, pool: Address) -> ChainResult<TxReceipt> {
        self.ledger.send_as(self.address, pool, abi::sync()).await
    }

    /// Pool secondary commit: push balance above reserves out to `recipient`.
    pub async fn skim(&self, pool: Address, recipient: Address) -> ChainResult<TxReceipt> {
        self.ledger
            .send_as(self.address, pool, abi::skim(recipient))
            .await
    }

    /// Simulate an ERC-20 call first so a token that returns `false` instead
    /// of reverting is caught before anything is submitted. Tokens that
    /// return nothing are treated as successful.
    async fn send_token_call(&self, asset: Address, input: Bytes) -> ChainResult<TxReceipt> {
        let output = self.ledger.call_as(self.address, asset, input.clone()).await?;
        if !output.is_empty() && !bool::abi_decode(&output, true)? {
            return Err(ChainError::ReturnedFalse(asset));
        }
        self.ledger.send_as(self.address, asset, input).await
    }
}

impl fmt::Debug for ImpersonatedActor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImpersonatedActor")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
