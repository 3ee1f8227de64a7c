use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use forksync_chain::{
    FundingService, ImpersonatedActor, LedgerReader, NativeInjector, SandboxLedger,
};
use forksync_core::{
    Address, AssetSlot, BaseUnits, DisplayAmount, PoolIdentity, ReconciliationDelta, RunError,
};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::bootstrap::{ensure_native_funds, BootstrapOutcome};
use super::burn::{burn, BurnResult};
use super::diff::CorrectionPlan;
use super::finalize::{finalize, FinalizeState};
use super::fund::{fund, FundResult};
use super::handlers::{ActionOutcome, CorrectionDispatcher, CorrectionDispatcherConfig};
use super::metadata::MetadataBook;
use super::snapshot::PoolSnapshots;
use super::verify::{verify, Verification};

/// Collaborators and identity for one pool.
#[derive(Clone)]
pub struct ReconcileEngineConfig {
    pub identity: PoolIdentity,
    pub reference: Arc<dyn LedgerReader>,
    pub sandbox: Arc<dyn SandboxLedger>,
    pub faucet: Arc<dyn FundingService>,
    pub injector: Option<Arc<dyn NativeInjector>>,
    /// Receives skimmed balance when the primary commit fails.
    pub fallback_recipient: Address,
    /// Native amount to inject when the pool holds none; `None` skips the check.
    pub bootstrap: Option<BaseUnits>,
}

/// Everything one reconciliation run observed and did.
#[derive(Clone, Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub identity: PoolIdentity,
    pub bootstrap: BootstrapOutcome,
    pub plan: CorrectionPlan,
    pub actions: Vec<ActionOutcome>,
    /// `None` when the pool was already converged.
    pub finalize: Option<FinalizeState>,
    pub verification: Verification,
}

impl RunReport {
    /// Every corrective action applied and the commit went through.
    /// Verification mismatches do not count against success.
    pub fn succeeded(&self) -> bool {
        self.actions.iter().all(ActionOutcome::succeeded)
            && self
                .finalize
                .as_ref()
                .map_or(true, FinalizeState::succeeded)
    }

    pub fn converged(&self) -> bool {
        self.verification.passed()
    }

    pub fn failed_actions(&self) -> impl Iterator<Item = &ActionOutcome> {
        self.actions.iter().filter(|outcome| !outcome.succeeded())
    }
}

/// Read-only view of a pool on both ledgers.
#[derive(Clone, Debug)]
pub struct PoolInspection {
    pub snapshots: PoolSnapshots,
    pub delta: ReconciliationDelta,
    pub native_balance: Option<BaseUnits>,
    pub metadata: MetadataBook,
}

/// Runs the snapshot, correct, commit, verify pipeline for one pool.
pub struct ReconcileEngine {
    identity: PoolIdentity,
    reference: Arc<dyn LedgerReader>,
    sandbox: Arc<dyn SandboxLedger>,
    faucet: Arc<dyn FundingService>,
    injector: Option<Arc<dyn NativeInjector>>,
    fallback_recipient: Address,
    bootstrap: Option<BaseUnits>,
    dispatcher: CorrectionDispatcher,
}

impl ReconcileEngine {
    pub fn new(config: ReconcileEngineConfig) -> Self {
        let dispatcher = CorrectionDispatcher::new(CorrectionDispatcherConfig {
            sandbox: config.sandbox.clone(),
            faucet: config.faucet.clone(),
        });
        Self {
            identity: config.identity,
            reference: config.reference,
            sandbox: config.sandbox,
            faucet: config.faucet,
            injector: config.injector,
            fallback_recipient: config.fallback_recipient,
            bootstrap: config.bootstrap,
            dispatcher,
        }
    }

    pub fn identity(&self) -> &PoolIdentity {
        &self.identity
    }

    pub async fn run(&self) -> Result<RunReport, RunError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("reconcile", run_id = %run_id, pool = %self.identity.pool());
        self.run_inner(run_id).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid) -> Result<RunReport, RunError> {
        let started_at = Utc::now();
        let pool = self.identity.pool();

        let bootstrap = self.ensure_bootstrap().await?;
        let metadata = MetadataBook::resolve(self.sandbox.as_ref(), &self.identity).await;
        let snapshots = self.capture().await?;
        info!(
            reference = %snapshots.reference,
            sandbox = %snapshots.sandbox,
            "captured reserves"
        );
        let plan = CorrectionPlan::from_snapshots(snapshots, &self.identity);

        if plan.is_converged() {
            info!("sandbox already matches reference; nothing to do");
            return Ok(RunReport {
                run_id,
                started_at,
                finished_at: Utc::now(),
                identity: self.identity,
                bootstrap,
                plan,
                actions: Vec::new(),
                finalize: None,
                verification: Verification::Trivial(snapshots),
            });
        }

        let actor = ImpersonatedActor::acquire(self.sandbox.clone(), pool).await;
        if let Err(err) = &actor {
            error!(
                pool = %pool,
                error = %err,
                "cannot impersonate pool; burns and the commit will be skipped"
            );
        }
        let actions = self
            .dispatcher
            .dispatch(&plan, pool, actor.as_ref(), &metadata)
            .await;
        let finalize = match &actor {
            Ok(actor) => finalize(actor, &self.identity, self.fallback_recipient).await,
            Err(err) => FinalizeState::without_actor(pool, err),
        };
        let verification =
            verify(self.reference.as_ref(), self.sandbox.as_ref(), &self.identity).await?;

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            identity: self.identity,
            bootstrap,
            plan,
            actions,
            finalize: Some(finalize),
            verification,
        };
        if report.succeeded() {
            info!(converged = report.converged(), "reconciliation finished");
        } else {
            warn!(
                failed_actions = report.failed_actions().count(),
                commit_failed = report.finalize.as_ref().is_some_and(|state| !state.succeeded()),
                "reconciliation finished with failures"
            );
        }
        Ok(report)
    }

    /// Snapshot both ledgers and compute the plan without touching the sandbox.
    pub async fn plan(&self) -> Result<CorrectionPlan, RunError> {
        let snapshots = self.capture().await?;
        Ok(CorrectionPlan::from_snapshots(snapshots, &self.identity))
    }

    pub async fn inspect(&self) -> Result<PoolInspection, RunError> {
        let snapshots = self.capture().await?;
        let native_balance = match self.sandbox.native_balance(self.identity.pool()).await {
            Ok(balance) => Some(balance),
            Err(err) => {
                warn!(error = %err, "native balance unavailable");
                None
            }
        };
        let metadata = MetadataBook::resolve(self.sandbox.as_ref(), &self.identity).await;
        Ok(PoolInspection {
            snapshots,
            delta: snapshots.delta(),
            native_balance,
            metadata,
        })
    }

    /// Fund the pool with a human-denominated amount of one slot's asset.
    pub async fn fund_slot(&self, slot: AssetSlot, amount: DisplayAmount) -> Result<FundResult> {
        let asset = self.identity.asset(slot);
        let base = self.to_base_units(asset, amount).await?;
        Ok(fund(
            self.sandbox.as_ref(),
            self.faucet.as_ref(),
            self.identity.pool(),
            base,
            Some(asset),
        )
        .await)
    }

    /// Burn a human-denominated amount of one slot's asset from the pool.
    pub async fn burn_slot(&self, slot: AssetSlot, amount: DisplayAmount) -> Result<BurnResult> {
        let asset = self.identity.asset(slot);
        let base = self.to_base_units(asset, amount).await?;
        self.ensure_bootstrap().await?;
        let pool = self.identity.pool();
        let actor = ImpersonatedActor::acquire(self.sandbox.clone(), pool)
            .await
            .with_context(|| format!("failed to impersonate {pool}"))?;
        Ok(burn(self.sandbox.as_ref(), &actor, asset, base).await?)
    }

    async fn capture(&self) -> Result<PoolSnapshots, RunError> {
        Ok(
            PoolSnapshots::capture(self.reference.as_ref(), self.sandbox.as_ref(), &self.identity)
                .await?,
        )
    }

    async fn ensure_bootstrap(&self) -> Result<BootstrapOutcome, RunError> {
        let Some(amount) = self.bootstrap else {
            return Ok(BootstrapOutcome::Disabled);
        };
        Ok(ensure_native_funds(
            self.sandbox.as_ref(),
            self.injector.as_deref(),
            self.identity.pool(),
            amount,
        )
        .await?)
    }

    async fn to_base_units(&self, asset: Address, amount: DisplayAmount) -> Result<BaseUnits> {
        let metadata = self
            .sandbox
            .asset_metadata(asset)
            .await
            .with_context(|| format!("cannot resolve decimals for {asset}"))?;
        amount
            .to_base_units(metadata.decimals)
            .map_err(|err| anyhow!("{amount} {}: {err}", metadata.symbol))
    }
}
