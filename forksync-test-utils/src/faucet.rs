use std::collections::HashMap;

use async_trait::async_trait;
use forksync_chain::FundingService;
use forksync_core::{Address, BaseUnits, FundServiceError};
use parking_lot::Mutex;

use crate::ledger::MockLedger;

/// Request observed by [`MockFaucet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaucetRequest {
    pub recipient: Address,
    pub amount: BaseUnits,
    pub asset: Option<Address>,
}

/// Faucet that credits a [`MockLedger`] directly.
pub struct MockFaucet {
    ledger: MockLedger,
    failures: Mutex<HashMap<Option<Address>, FundServiceError>>,
    requests: Mutex<Vec<FaucetRequest>>,
}

impl MockFaucet {
    pub fn new(ledger: MockLedger) -> Self {
        Self {
            ledger,
            failures: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fail every request for `asset` (`None` for native currency).
    pub fn fail_for(&self, asset: Option<Address>, error: FundServiceError) {
        self.failures.lock().insert(asset, error);
    }

    pub fn requests(&self) -> Vec<FaucetRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl FundingService for MockFaucet {
    async fn credit(
        &self,
        recipient: Address,
        amount: BaseUnits,
        asset: Option<Address>,
    ) -> Result<(), FundServiceError> {
        self.requests.lock().push(FaucetRequest {
            recipient,
            amount,
            asset,
        });
        if let Some(error) = self.failures.lock().get(&asset).cloned() {
            return Err(error);
        }
        match asset {
            Some(token) => self.ledger.credit(token, recipient, amount),
            None => self.ledger.add_native(recipient, amount),
        }
        Ok(())
    }
}
