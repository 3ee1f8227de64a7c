use std::sync::Arc;

use forksync_chain::{ChainError, FundingService, ImpersonatedActor, SandboxLedger};
use forksync_core::{Address, BurnError, BurnStage, CorrectiveAction};
use tracing::{error, info, warn};

use super::burn::{burn, BurnResult};
use super::diff::CorrectionPlan;
use super::fund::{fund, FundResult};
use super::metadata::MetadataBook;

/// Configuration for the correction dispatcher.
#[derive(Clone)]
pub struct CorrectionDispatcherConfig {
    pub sandbox: Arc<dyn SandboxLedger>,
    pub faucet: Arc<dyn FundingService>,
}

/// Result of one corrective action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    Funded {
        action: CorrectiveAction,
        result: FundResult,
    },
    Burned {
        action: CorrectiveAction,
        result: Result<BurnResult, BurnError>,
    },
}

impl ActionOutcome {
    pub fn action(&self) -> &CorrectiveAction {
        match self {
            Self::Funded { action, .. } | Self::Burned { action, .. } => action,
        }
    }

    pub fn succeeded(&self) -> bool {
        match self {
            Self::Funded { result, .. } => result.success,
            Self::Burned { result, .. } => result.is_ok(),
        }
    }
}

/// Applies a [`CorrectionPlan`] to the sandbox, one asset slot at a time.
pub struct CorrectionDispatcher {
    sandbox: Arc<dyn SandboxLedger>,
    faucet: Arc<dyn FundingService>,
}

impl CorrectionDispatcher {
    pub fn new(config: CorrectionDispatcherConfig) -> Self {
        Self {
            sandbox: config.sandbox,
            faucet: config.faucet,
        }
    }

    /// Run every planned action in order. A failure is logged against its
    /// slot and the remaining slots are still processed.
    ///
    /// Funding goes to `pool` and never needs the pool actor; without one,
    /// each burn is recorded as failed at [`BurnStage::Impersonate`].
    pub async fn dispatch(
        &self,
        plan: &CorrectionPlan,
        pool: Address,
        actor: Result<&ImpersonatedActor, &ChainError>,
        metadata: &MetadataBook,
    ) -> Vec<ActionOutcome> {
        let mut outcomes = Vec::with_capacity(plan.actions.len());
        for action in &plan.actions {
            info!(
                slot = %action.slot(),
                asset = %action.asset(),
                amount = %action.amount(),
                direction = %action.direction(),
                display = %metadata.describe(action.asset(), action.amount()),
                "applying corrective action"
            );
            let outcome = match *action {
                CorrectiveAction::Fund { asset, amount, .. } => {
                    let result = fund(
                        self.sandbox.as_ref(),
                        self.faucet.as_ref(),
                        pool,
                        amount,
                        Some(asset),
                    )
                    .await;
                    ActionOutcome::Funded {
                        action: *action,
                        result,
                    }
                }
                CorrectiveAction::Burn { asset, amount, .. } => {
                    let result = match actor {
                        Ok(actor) => burn(self.sandbox.as_ref(), actor, asset, amount).await,
                        Err(err) => Err(BurnError {
                            stage: BurnStage::Impersonate,
                            asset,
                            amount,
                            message: err.to_string(),
                        }),
                    };
                    if let Err(err) = &result {
                        error!(
                            slot = %action.slot(),
                            asset = %asset,
                            amount = %amount,
                            direction = %action.direction(),
                            stage = %err.stage,
                            error = %err,
                            "burn failed; excess stays in the pool"
                        );
                    }
                    ActionOutcome::Burned {
                        action: *action,
                        result,
                    }
                }
            };
            if !outcome.succeeded() {
                warn!(
                    slot = %action.slot(),
                    direction = %action.direction(),
                    "corrective action not applied; continuing with remaining slots"
                );
            }
            outcomes.push(outcome);
        }
        outcomes
    }
}
