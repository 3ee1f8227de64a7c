use std::sync::Arc;

use forksync_chain::{
    BuildBearFaucet, EvmLedger, FundingService, JsonRpcClient, LedgerReader, NativeInjector,
    RateLimiter, SandboxLedger, SelfDestructInjector,
};
use forksync_config::ReconcilerSettings;
use forksync_core::LedgerKind;
use tracing::debug;

use crate::reconcile::{ReconcileEngine, ReconcileEngineConfig};

/// Build the production engine from validated settings.
pub fn build_engine(settings: &ReconcilerSettings) -> ReconcileEngine {
    let reference_rpc = rpc_client(settings, &settings.reference_rpc);
    let sandbox_rpc = rpc_client(settings, &settings.sandbox_rpc);

    let reference: Arc<dyn LedgerReader> = Arc::new(
        EvmLedger::new(LedgerKind::Reference, reference_rpc)
            .with_receipt_policy(settings.rpc.receipts),
    );
    let sandbox: Arc<dyn SandboxLedger> = Arc::new(
        EvmLedger::new(LedgerKind::Sandbox, sandbox_rpc.clone())
            .with_receipt_policy(settings.rpc.receipts),
    );
    let faucet: Arc<dyn FundingService> = Arc::new(BuildBearFaucet::new(sandbox_rpc.clone()));
    let injector = settings.signer.clone().map(|signer| {
        debug!(operator = %signer.address(), "bootstrap injector configured");
        Arc::new(
            SelfDestructInjector::new(sandbox_rpc.clone(), faucet.clone(), signer)
                .with_receipt_policy(settings.rpc.receipts),
        ) as Arc<dyn NativeInjector>
    });

    ReconcileEngine::new(ReconcileEngineConfig {
        identity: settings.pool,
        reference,
        sandbox,
        faucet,
        injector,
        fallback_recipient: settings.operator,
        bootstrap: settings
            .bootstrap
            .enabled
            .then_some(settings.bootstrap.native_amount),
    })
}

fn rpc_client(settings: &ReconcilerSettings, url: &str) -> JsonRpcClient {
    let client = JsonRpcClient::new(url);
    match settings.rpc.requests_per_second {
        Some(limit) => client.with_rate_limiter(RateLimiter::per_second(limit)),
        None => client,
    }
}
