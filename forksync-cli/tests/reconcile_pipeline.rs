use std::sync::Arc;

use alloy::sol_types::SolCall;
use anyhow::Result;
use forksync_chain::abi::{IERC20, IPair};
use forksync_chain::NativeInjector;
use forksync_cli::reconcile::{
    ActionOutcome, BootstrapOutcome, CommitPath, FinalizeState, ReconcileEngine,
    ReconcileEngineConfig, Verification,
};
use forksync_core::{
    AssetSlot, BaseUnits, BootstrapError, BurnStage, CorrectiveAction, Direction,
    FundServiceError, LedgerKind, ReadError, ReservePair, RunError, BURN_ADDRESS,
};
use forksync_test_utils::{
    pool_identity, MockFaucet, MockInjector, MockLedger, ASSET0, ASSET1, OPERATOR, POOL,
};

const INJECTION: u64 = 1_000_000;

struct Harness {
    reference: MockLedger,
    sandbox: MockLedger,
    faucet: Arc<MockFaucet>,
    injector: Arc<MockInjector>,
}

impl Harness {
    /// Pool on both ledgers, sandbox pool already holding native funds.
    fn new(reference: (u64, u64), sandbox: (u64, u64)) -> Self {
        Self::with_native(reference, sandbox, 1)
    }

    fn with_native(reference: (u64, u64), sandbox: (u64, u64), native: u64) -> Self {
        let reference = MockLedger::new(LedgerKind::Reference).with_pool(
            POOL,
            ASSET0,
            ASSET1,
            ReservePair::new(reference.0, reference.1),
        );
        let sandbox = MockLedger::new(LedgerKind::Sandbox)
            .with_pool(POOL, ASSET0, ASSET1, ReservePair::new(sandbox.0, sandbox.1))
            .with_native(POOL, native);
        let faucet = Arc::new(MockFaucet::new(sandbox.clone()));
        let injector = Arc::new(MockInjector::new(sandbox.clone()));
        Self {
            reference,
            sandbox,
            faucet,
            injector,
        }
    }

    fn engine(&self) -> ReconcileEngine {
        ReconcileEngine::new(ReconcileEngineConfig {
            identity: pool_identity(),
            reference: Arc::new(self.reference.clone()),
            sandbox: Arc::new(self.sandbox.clone()),
            faucet: self.faucet.clone(),
            injector: Some(self.injector.clone() as Arc<dyn NativeInjector>),
            fallback_recipient: OPERATOR,
            bootstrap: Some(BaseUnits::from(INJECTION)),
        })
    }

    fn sandbox_reserves(&self) -> Option<ReservePair> {
        self.sandbox.reserves_of(POOL)
    }
}

#[tokio::test]
async fn converged_pool_is_a_no_op() -> Result<()> {
    let harness = Harness::new((1000, 2000), (1000, 2000));
    let report = harness.engine().run().await?;

    assert!(report.actions.is_empty());
    assert!(report.finalize.is_none());
    assert!(matches!(report.verification, Verification::Trivial(_)));
    assert!(report.succeeded());
    assert!(report.converged());
    assert!(harness.sandbox.sent_calls().is_empty());
    assert!(harness.faucet.requests().is_empty());
    assert_eq!(harness.reference.reserve_reads(), 1);
    assert_eq!(harness.sandbox.reserve_reads(), 1);
    Ok(())
}

#[tokio::test]
async fn missing_reserve_is_funded_and_synced() -> Result<()> {
    let harness = Harness::new((1000, 2000), (800, 2000));
    let report = harness.engine().run().await?;

    assert_eq!(
        report.plan.actions,
        vec![CorrectiveAction::Fund {
            slot: AssetSlot::Asset0,
            asset: ASSET0,
            amount: BaseUnits::from(200u64),
        }]
    );
    let requests = harness.faucet.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].recipient, POOL);
    assert_eq!(requests[0].amount, BaseUnits::from(200u64));
    assert_eq!(requests[0].asset, Some(ASSET0));
    match &report.actions[0] {
        ActionOutcome::Funded { result, .. } => {
            assert!(result.success);
            assert_eq!(result.balance_before, Some(BaseUnits::from(800u64)));
            assert_eq!(result.balance_after, Some(BaseUnits::from(1000u64)));
        }
        other => panic!("expected a fund outcome, got {other:?}"),
    }
    assert_eq!(
        report.finalize.as_ref().and_then(FinalizeState::commit_path),
        Some(CommitPath::Sync)
    );
    assert_eq!(
        harness.sandbox_reserves(),
        Some(ReservePair::new(1000u64, 2000u64))
    );
    assert!(matches!(report.verification, Verification::Converged(_)));
    assert!(report.succeeded());
    Ok(())
}

#[tokio::test]
async fn excess_reserve_is_burned_and_synced() -> Result<()> {
    let harness = Harness::new((1000, 2000), (1000, 2500));
    let report = harness.engine().run().await?;

    assert_eq!(report.actions.len(), 1);
    let action = report.actions[0].action();
    assert_eq!(action.direction(), Direction::Burn);
    assert_eq!(action.slot(), AssetSlot::Asset1);
    assert_eq!(action.amount(), BaseUnits::from(500u64));
    assert_eq!(
        harness.sandbox.balance_of(ASSET1, BURN_ADDRESS),
        BaseUnits::from(500u64)
    );
    assert_eq!(harness.sandbox.calls_with(IPair::syncCall::SELECTOR), 1);
    assert_eq!(
        harness.sandbox_reserves(),
        Some(ReservePair::new(1000u64, 2000u64))
    );
    assert!(report.succeeded());
    assert!(report.converged());
    Ok(())
}

#[tokio::test]
async fn reverted_burn_still_finalizes_and_reports_mismatch() -> Result<()> {
    let harness = Harness::new((1000, 2000), (1000, 2500));
    harness.sandbox.fail_selector(IERC20::transferCall::SELECTOR);
    let report = harness.engine().run().await?;

    match &report.actions[0] {
        ActionOutcome::Burned { result: Err(err), .. } => {
            assert_eq!(err.stage, BurnStage::Transfer);
            assert_eq!(err.asset, ASSET1);
        }
        other => panic!("expected a failed burn, got {other:?}"),
    }
    assert_eq!(harness.sandbox.calls_with(IPair::syncCall::SELECTOR), 1);
    assert!(!report.succeeded());

    let warning = report
        .verification
        .warning()
        .expect("verification should report a mismatch");
    assert_eq!(warning.mismatches.len(), 1);
    assert_eq!(warning.mismatches[0].slot, AssetSlot::Asset1);
    assert_eq!(warning.mismatches[0].reference, BaseUnits::from(2000u64));
    assert_eq!(warning.mismatches[0].sandbox, BaseUnits::from(2500u64));
    Ok(())
}

#[tokio::test]
async fn failed_sync_falls_back_to_skim_and_succeeds() -> Result<()> {
    let harness = Harness::new((1000, 2000), (800, 2000));
    harness.sandbox.fail_selector(IPair::syncCall::SELECTOR);
    let report = harness.engine().run().await?;

    let finalize = report.finalize.as_ref().expect("finalize should run");
    assert_eq!(finalize.commit_path(), Some(CommitPath::Skim));
    assert!(matches!(
        finalize,
        FinalizeState::Finalized {
            primary_error: Some(_),
            ..
        }
    ));
    assert!(report.succeeded());
    assert_eq!(harness.sandbox.calls_with(IPair::syncCall::SELECTOR), 1);
    assert_eq!(harness.sandbox.calls_with(IPair::skimCall::SELECTOR), 1);
    let skim = harness
        .sandbox
        .sent_calls()
        .into_iter()
        .find(|call| call.selector == IPair::skimCall::SELECTOR)
        .expect("skim was sent");
    assert_eq!(IPair::skimCall::abi_decode(&skim.input, true)?.to, OPERATOR);
    Ok(())
}

#[tokio::test]
async fn both_commits_failing_is_reported_without_third_attempt() -> Result<()> {
    let harness = Harness::new((1000, 2000), (800, 2000));
    harness.sandbox.fail_selector(IPair::syncCall::SELECTOR);
    harness.sandbox.fail_selector(IPair::skimCall::SELECTOR);
    let report = harness.engine().run().await?;

    let finalize = report.finalize.as_ref().expect("finalize should run");
    assert!(finalize.error().is_some());
    assert!(!report.succeeded());
    assert_eq!(harness.sandbox.calls_with(IPair::syncCall::SELECTOR), 1);
    assert_eq!(harness.sandbox.calls_with(IPair::skimCall::SELECTOR), 1);
    Ok(())
}

#[tokio::test]
async fn empty_native_balance_is_injected_before_snapshots() -> Result<()> {
    let harness = Harness::with_native((1000, 2000), (1000, 2000), 0);
    let report = harness.engine().run().await?;

    assert_eq!(
        harness.injector.calls(),
        vec![(POOL, BaseUnits::from(INJECTION))]
    );
    assert!(!harness.sandbox.native_of(POOL).is_zero());
    assert!(matches!(report.bootstrap, BootstrapOutcome::Injected { .. }));
    Ok(())
}

#[tokio::test]
async fn injection_happens_even_when_snapshot_later_fails() -> Result<()> {
    let harness = Harness::with_native((1000, 2000), (1000, 2000), 0);
    harness.reference.set_unreachable(true);
    let err = harness.engine().run().await.unwrap_err();

    assert!(matches!(err, RunError::Read(ReadError::Unreachable { .. })));
    assert_eq!(harness.injector.calls().len(), 1);
    Ok(())
}

#[tokio::test]
async fn funded_pool_skips_injection() -> Result<()> {
    let harness = Harness::new((1000, 2000), (1000, 2000));
    let report = harness.engine().run().await?;
    assert!(harness.injector.calls().is_empty());
    assert!(matches!(report.bootstrap, BootstrapOutcome::AlreadyFunded(_)));
    Ok(())
}

#[tokio::test]
async fn rerun_after_convergence_issues_nothing() -> Result<()> {
    let harness = Harness::new((1000, 2000), (800, 2500));
    let engine = harness.engine();
    let first = engine.run().await?;
    assert_eq!(first.actions.len(), 2);
    assert!(first.converged());

    let sent_before = harness.sandbox.sent_calls().len();
    let second = engine.run().await?;
    assert!(second.actions.is_empty());
    assert!(second.finalize.is_none());
    assert_eq!(harness.sandbox.sent_calls().len(), sent_before);
    Ok(())
}

#[tokio::test]
async fn asset0_failure_does_not_block_asset1() -> Result<()> {
    let harness = Harness::new((1000, 2000), (800, 2500));
    harness.faucet.fail_for(
        Some(ASSET0),
        FundServiceError::Rejected {
            code: -32000,
            message: "token not supported".into(),
        },
    );
    let report = harness.engine().run().await?;

    let by_slot = |slot| {
        report
            .actions
            .iter()
            .find(|outcome| outcome.action().slot() == slot)
            .expect("action for slot")
    };
    assert!(!by_slot(AssetSlot::Asset0).succeeded());
    assert!(by_slot(AssetSlot::Asset1).succeeded());
    assert_eq!(
        harness.sandbox.balance_of(ASSET1, BURN_ADDRESS),
        BaseUnits::from(500u64)
    );
    assert!(report.finalize.is_some());
    assert!(!report.succeeded());
    Ok(())
}

#[tokio::test]
async fn asset1_failure_does_not_block_asset0() -> Result<()> {
    let harness = Harness::new((1000, 2000), (800, 2500));
    harness.sandbox.fail_selector(IERC20::approveCall::SELECTOR);
    let report = harness.engine().run().await?;

    assert_eq!(report.actions.len(), 2);
    assert!(!report.actions[0].succeeded());
    assert!(report.actions[1].succeeded());
    assert_eq!(harness.faucet.requests().len(), 1);
    Ok(())
}

#[tokio::test]
async fn refused_impersonation_still_funds_but_skips_burn_and_commit() -> Result<()> {
    let harness = Harness::new((1000, 2000), (800, 2500));
    harness.sandbox.refuse_impersonation();
    let report = harness.engine().run().await?;

    assert_eq!(report.actions.len(), 2);
    match &report.actions[0] {
        ActionOutcome::Burned { result: Err(err), .. } => {
            assert_eq!(err.stage, BurnStage::Impersonate);
            assert_eq!(err.asset, ASSET1);
        }
        other => panic!("expected a failed burn, got {other:?}"),
    }
    assert!(report.actions[1].succeeded());
    let requests = harness.faucet.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].recipient, POOL);
    assert_eq!(requests[0].amount, BaseUnits::from(200u64));

    let finalize = report.finalize.as_ref().expect("finalize outcome is recorded");
    assert!(finalize.error().is_some());
    assert!(harness.sandbox.sent_calls().is_empty());
    assert!(!report.succeeded());
    assert!(!report.converged());
    Ok(())
}

#[tokio::test]
async fn refused_impersonation_with_only_funding_is_attempted() -> Result<()> {
    let harness = Harness::new((1000, 2000), (800, 2000));
    harness.sandbox.refuse_impersonation();
    let report = harness.engine().run().await?;

    assert_eq!(harness.faucet.requests().len(), 1);
    assert_eq!(
        harness.sandbox.balance_of(ASSET0, POOL),
        BaseUnits::from(1000u64)
    );
    assert!(report.actions[0].succeeded());
    assert!(!report.succeeded());
    Ok(())
}

#[tokio::test]
async fn failed_injection_aborts_before_snapshots() -> Result<()> {
    let harness = Harness::with_native((1000, 2000), (800, 2000), 0);
    harness
        .injector
        .fail_with(BootstrapError::Deploy("transaction reverted".into()));
    let err = harness.engine().run().await.unwrap_err();

    assert!(matches!(err, RunError::Bootstrap(BootstrapError::Deploy(_))));
    assert_eq!(harness.injector.calls().len(), 1);
    assert_eq!(harness.reference.reserve_reads(), 0);
    assert!(harness.faucet.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn unreachable_sandbox_aborts_the_run() -> Result<()> {
    let harness = Harness::new((1000, 2000), (800, 2000));
    harness.sandbox.set_unreachable(true);
    let err = harness.engine().run().await.unwrap_err();

    assert!(matches!(
        err,
        RunError::Bootstrap(_) | RunError::Read(ReadError::Unreachable { .. })
    ));
    assert!(harness.faucet.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn dry_run_plan_touches_nothing() -> Result<()> {
    let harness = Harness::with_native((1000, 2000), (800, 2500), 0);
    let plan = harness.engine().plan().await?;

    assert_eq!(plan.actions.len(), 2);
    assert!(harness.injector.calls().is_empty());
    assert!(harness.sandbox.sent_calls().is_empty());
    assert!(harness.faucet.requests().is_empty());
    Ok(())
}
