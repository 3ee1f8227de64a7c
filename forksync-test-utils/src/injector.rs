use async_trait::async_trait;
use forksync_chain::NativeInjector;
use forksync_core::{Address, BaseUnits, BootstrapError, TxHash};
use parking_lot::Mutex;

use crate::ledger::MockLedger;

/// Injector that writes the native balance straight into a [`MockLedger`].
pub struct MockInjector {
    ledger: MockLedger,
    failure: Mutex<Option<BootstrapError>>,
    silent: Mutex<bool>,
    calls: Mutex<Vec<(Address, BaseUnits)>>,
}

impl MockInjector {
    pub fn new(ledger: MockLedger) -> Self {
        Self {
            ledger,
            failure: Mutex::new(None),
            silent: Mutex::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_with(&self, error: BootstrapError) {
        *self.failure.lock() = Some(error);
    }

    /// Report success without crediting anything.
    pub fn succeed_without_effect(&self) {
        *self.silent.lock() = true;
    }

    pub fn calls(&self) -> Vec<(Address, BaseUnits)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl NativeInjector for MockInjector {
    async fn inject(&self, target: Address, amount: BaseUnits) -> Result<TxHash, BootstrapError> {
        self.calls.lock().push((target, amount));
        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }
        if !*self.silent.lock() {
            self.ledger.add_native(target, amount);
        }
        Ok(TxHash::repeat_byte(0x5d))
    }
}
