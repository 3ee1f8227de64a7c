use forksync_chain::LedgerReader;
use forksync_core::{
    AssetSlot, PoolIdentity, ReadError, ReconciliationDelta, ReservePair, SlotMismatch,
};
use tracing::debug;

/// Read the pool's reserve pair from one ledger. No retries.
pub async fn snapshot<L>(ledger: &L, identity: &PoolIdentity) -> Result<ReservePair, ReadError>
where
    L: LedgerReader + ?Sized,
{
    let pool = identity.pool();
    let reserves = ledger
        .reserves(pool)
        .await
        .map_err(|err| err.into_read_error(ledger.kind(), pool))?;
    debug!(ledger = %ledger.kind(), pool = %pool, reserves = %reserves, "captured snapshot");
    Ok(reserves)
}

/// Reserve pairs observed on both ledgers for the same pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolSnapshots {
    pub reference: ReservePair,
    pub sandbox: ReservePair,
}

impl PoolSnapshots {
    pub fn new(reference: ReservePair, sandbox: ReservePair) -> Self {
        Self { reference, sandbox }
    }

    /// Fetch both ledgers concurrently. Either failure aborts the capture.
    pub async fn capture<R, S>(
        reference: &R,
        sandbox: &S,
        identity: &PoolIdentity,
    ) -> Result<Self, ReadError>
    where
        R: LedgerReader + ?Sized,
        S: LedgerReader + ?Sized,
    {
        let (reference, sandbox) = tokio::try_join!(
            snapshot(reference, identity),
            snapshot(sandbox, identity)
        )?;
        Ok(Self::new(reference, sandbox))
    }

    pub fn delta(&self) -> ReconciliationDelta {
        ReconciliationDelta::between(&self.reference, &self.sandbox)
    }

    /// Slots whose sandbox reserve differs from the reference.
    pub fn mismatches(&self) -> Vec<SlotMismatch> {
        AssetSlot::ALL
            .into_iter()
            .filter(|slot| self.reference.get(*slot) != self.sandbox.get(*slot))
            .map(|slot| SlotMismatch {
                slot,
                reference: self.reference.get(slot),
                sandbox: self.sandbox.get(slot),
            })
            .collect()
    }
}
