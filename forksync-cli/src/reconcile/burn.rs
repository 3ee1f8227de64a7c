use forksync_chain::{ChainError, ImpersonatedActor, LedgerReader};
use forksync_core::{Address, BaseUnits, BurnError, BurnStage, TxHash, BURN_ADDRESS};
use tracing::{info, warn};

/// Successful burn of pool-held tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BurnResult {
    pub balance_before: Option<BaseUnits>,
    pub balance_after: Option<BaseUnits>,
    pub approve_tx: TxHash,
    pub transfer_tx: TxHash,
}

/// Move `amount` of `asset` out of the pool to [`BURN_ADDRESS`], acting as
/// the pool through `actor`. Either call reverting or returning `false` ends
/// the burn.
pub async fn burn<L>(
    ledger: &L,
    actor: &ImpersonatedActor,
    asset: Address,
    amount: BaseUnits,
) -> Result<BurnResult, BurnError>
where
    L: LedgerReader + ?Sized,
{
    let pool = actor.address();
    let balance_before = pool_balance(ledger, asset, pool, "before").await;
    let fail = |stage: BurnStage, err: ChainError| BurnError {
        stage,
        asset,
        amount,
        message: err.to_string(),
    };

    let approve = actor
        .approve(asset, BURN_ADDRESS, amount)
        .await
        .map_err(|err| fail(BurnStage::Approve, err))?;
    let transfer = actor
        .transfer(asset, BURN_ADDRESS, amount)
        .await
        .map_err(|err| fail(BurnStage::Transfer, err))?;

    let balance_after = pool_balance(ledger, asset, pool, "after").await;
    info!(
        pool = %pool,
        asset = %asset,
        amount = %amount,
        tx = %transfer.hash,
        "burned excess pool balance"
    );
    Ok(BurnResult {
        balance_before,
        balance_after,
        approve_tx: approve.hash,
        transfer_tx: transfer.hash,
    })
}

async fn pool_balance<L>(
    ledger: &L,
    asset: Address,
    pool: Address,
    when: &'static str,
) -> Option<BaseUnits>
where
    L: LedgerReader + ?Sized,
{
    match ledger.token_balance(asset, pool).await {
        Ok(balance) => Some(balance),
        Err(err) => {
            warn!(
                pool = %pool,
                asset = %asset,
                when,
                error = %err,
                "pool balance read failed"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use alloy::sol_types::SolCall;
    use forksync_chain::abi::IERC20;
    use forksync_core::{LedgerKind, ReservePair};
    use forksync_test_utils::{MockLedger, ASSET0, ASSET1, POOL};

    async fn setup() -> (MockLedger, ImpersonatedActor) {
        let ledger = MockLedger::new(LedgerKind::Sandbox).with_pool(
            POOL,
            ASSET0,
            ASSET1,
            ReservePair::new(1000u64, 2500u64),
        );
        let actor = ImpersonatedActor::acquire(Arc::new(ledger.clone()), POOL)
            .await
            .unwrap();
        (ledger, actor)
    }

    #[tokio::test]
    async fn moves_excess_to_burn_address() {
        let (ledger, actor) = setup().await;
        let result = burn(&ledger, &actor, ASSET1, BaseUnits::from(500u64))
            .await
            .unwrap();
        assert_eq!(result.balance_before, Some(BaseUnits::from(2500u64)));
        assert_eq!(result.balance_after, Some(BaseUnits::from(2000u64)));
        assert_eq!(
            ledger.balance_of(ASSET1, BURN_ADDRESS),
            BaseUnits::from(500u64)
        );
    }

    #[tokio::test]
    async fn transfer_revert_is_reported_with_stage() {
        let (ledger, actor) = setup().await;
        ledger.fail_selector(IERC20::transferCall::SELECTOR);
        let err = burn(&ledger, &actor, ASSET1, BaseUnits::from(500u64))
            .await
            .unwrap_err();
        assert_eq!(err.stage, BurnStage::Transfer);
        assert_eq!(err.amount, BaseUnits::from(500u64));
        assert_eq!(ledger.balance_of(ASSET1, POOL), BaseUnits::from(2500u64));
    }

    #[tokio::test]
    async fn approve_revert_skips_transfer() {
        let (ledger, actor) = setup().await;
        ledger.fail_selector(IERC20::approveCall::SELECTOR);
        let err = burn(&ledger, &actor, ASSET1, BaseUnits::from(500u64))
            .await
            .unwrap_err();
        assert_eq!(err.stage, BurnStage::Approve);
        assert_eq!(ledger.calls_with(IERC20::transferCall::SELECTOR), 0);
    }

    #[tokio::test]
    async fn token_returning_false_is_not_reported_as_burned() {
        let (ledger, actor) = setup().await;
        ledger.return_false(IERC20::transferCall::SELECTOR);
        let err = burn(&ledger, &actor, ASSET1, BaseUnits::from(500u64))
            .await
            .unwrap_err();
        assert_eq!(err.stage, BurnStage::Transfer);
        assert!(err.message.contains("returned false"));
        assert_eq!(ledger.calls_with(IERC20::transferCall::SELECTOR), 0);
        assert_eq!(ledger.balance_of(ASSET1, POOL), BaseUnits::from(2500u64));
    }
}
