use forksync_core::{CorrectiveAction, PoolIdentity, ReconciliationDelta};

use super::snapshot::PoolSnapshots;

/// Corrective actions derived from one pair of snapshots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorrectionPlan {
    pub snapshots: PoolSnapshots,
    pub delta: ReconciliationDelta,
    pub actions: Vec<CorrectiveAction>,
}

impl CorrectionPlan {
    /// Compute the delta and the actions it implies, in dispatch order.
    pub fn from_snapshots(snapshots: PoolSnapshots, identity: &PoolIdentity) -> Self {
        let delta = snapshots.delta();
        let actions = delta.actions(identity);
        Self {
            snapshots,
            delta,
            actions,
        }
    }

    /// A converged pool needs neither corrections nor a commit.
    pub fn is_converged(&self) -> bool {
        self.delta.is_converged()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forksync_core::{AssetSlot, BaseUnits, Direction, ReservePair};
    use forksync_test_utils::pool_identity;

    fn plan(reference: ReservePair, sandbox: ReservePair) -> CorrectionPlan {
        CorrectionPlan::from_snapshots(PoolSnapshots::new(reference, sandbox), &pool_identity())
    }

    #[test]
    fn converged_pool_plans_nothing() {
        let pair = ReservePair::new(1000u64, 2000u64);
        let plan = plan(pair, pair);
        assert!(plan.is_converged());
        assert!(plan.actions.is_empty());
    }

    #[test]
    fn each_slot_gets_exactly_one_direction() {
        let plan = plan(
            ReservePair::new(1000u64, 2000u64),
            ReservePair::new(900u64, 2100u64),
        );
        assert_eq!(plan.actions.len(), 2);
        assert_eq!(plan.actions[0].slot(), AssetSlot::Asset1);
        assert_eq!(plan.actions[0].direction(), Direction::Burn);
        assert_eq!(plan.actions[1].slot(), AssetSlot::Asset0);
        assert_eq!(plan.actions[1].direction(), Direction::Fund);
        assert_eq!(plan.actions[1].amount(), BaseUnits::from(100u64));
    }
}
