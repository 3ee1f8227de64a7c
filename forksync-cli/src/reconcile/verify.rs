use forksync_chain::LedgerReader;
use forksync_core::{ConvergenceWarning, PoolIdentity, ReadError};
use tracing::{info, warn};

use super::snapshot::PoolSnapshots;

/// Post-commit comparison of both ledgers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verification {
    /// The pool was already converged; nothing was re-read.
    Trivial(PoolSnapshots),
    Converged(PoolSnapshots),
    Diverged {
        snapshots: PoolSnapshots,
        warning: ConvergenceWarning,
    },
}

impl Verification {
    pub fn passed(&self) -> bool {
        !matches!(self, Self::Diverged { .. })
    }

    pub fn snapshots(&self) -> &PoolSnapshots {
        match self {
            Self::Trivial(snapshots) | Self::Converged(snapshots) => snapshots,
            Self::Diverged { snapshots, .. } => snapshots,
        }
    }

    pub fn warning(&self) -> Option<&ConvergenceWarning> {
        match self {
            Self::Diverged { warning, .. } => Some(warning),
            _ => None,
        }
    }
}

/// Re-snapshot both ledgers and compare. A mismatch is logged, not raised.
pub async fn verify<R, S>(
    reference: &R,
    sandbox: &S,
    identity: &PoolIdentity,
) -> Result<Verification, ReadError>
where
    R: LedgerReader + ?Sized,
    S: LedgerReader + ?Sized,
{
    let snapshots = PoolSnapshots::capture(reference, sandbox, identity).await?;
    let mismatches = snapshots.mismatches();
    if mismatches.is_empty() {
        info!(reserves = %snapshots.sandbox, "sandbox reserves match reference");
        return Ok(Verification::Converged(snapshots));
    }
    let warning = ConvergenceWarning { mismatches };
    warn!(
        reference = %snapshots.reference,
        sandbox = %snapshots.sandbox,
        "{warning}"
    );
    Ok(Verification::Diverged { snapshots, warning })
}
