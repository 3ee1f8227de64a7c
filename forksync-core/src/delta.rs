use std::fmt;

use alloy::primitives::Address;

use crate::amount::BaseUnits;
use crate::pool::{AssetSlot, PoolIdentity, ReservePair};

/// Per-slot shortfall and surplus of the sandbox relative to the reference.
///
/// Both arrays are clamped projections of the same signed difference, so for
/// any slot at most one of `missing` and `excess` is non-zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconciliationDelta {
    missing: [BaseUnits; 2],
    excess: [BaseUnits; 2],
}

impl ReconciliationDelta {
    pub fn between(reference: &ReservePair, sandbox: &ReservePair) -> Self {
        let mut delta = Self::default();
        for slot in AssetSlot::ALL {
            let reference = reference.get(slot);
            let sandbox = sandbox.get(slot);
            delta.missing[slot.index()] = reference.saturating_sub(sandbox);
            delta.excess[slot.index()] = sandbox.saturating_sub(reference);
        }
        delta
    }

    pub fn missing(&self, slot: AssetSlot) -> BaseUnits {
        self.missing[slot.index()]
    }

    pub fn excess(&self, slot: AssetSlot) -> BaseUnits {
        self.excess[slot.index()]
    }

    /// True when every slot already matches; such a pool needs no action and no commit.
    pub fn is_converged(&self) -> bool {
        self.missing.iter().chain(self.excess.iter()).all(|v| v.is_zero())
    }

    /// Corrective actions in [`AssetSlot::DISPATCH_ORDER`].
    pub fn actions(&self, identity: &PoolIdentity) -> Vec<CorrectiveAction> {
        let mut actions = Vec::with_capacity(2);
        for slot in AssetSlot::DISPATCH_ORDER {
            let asset = identity.asset(slot);
            let missing = self.missing(slot);
            let excess = self.excess(slot);
            if !missing.is_zero() {
                actions.push(CorrectiveAction::Fund {
                    slot,
                    asset,
                    amount: missing,
                });
            } else if !excess.is_zero() {
                actions.push(CorrectiveAction::Burn {
                    slot,
                    asset,
                    amount: excess,
                });
            }
        }
        actions
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Fund,
    Burn,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fund => f.write_str("fund"),
            Self::Burn => f.write_str("burn"),
        }
    }
}

/// A single correction for one asset slot; created and consumed within a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CorrectiveAction {
    Fund {
        slot: AssetSlot,
        asset: Address,
        amount: BaseUnits,
    },
    Burn {
        slot: AssetSlot,
        asset: Address,
        amount: BaseUnits,
    },
}

impl CorrectiveAction {
    pub fn slot(&self) -> AssetSlot {
        match self {
            Self::Fund { slot, .. } | Self::Burn { slot, .. } => *slot,
        }
    }

    pub fn asset(&self) -> Address {
        match self {
            Self::Fund { asset, .. } | Self::Burn { asset, .. } => *asset,
        }
    }

    pub fn amount(&self) -> BaseUnits {
        match self {
            Self::Fund { amount, .. } | Self::Burn { amount, .. } => *amount,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Self::Fund { .. } => Direction::Fund,
            Self::Burn { .. } => Direction::Burn,
        }
    }
}

impl fmt::Display for CorrectiveAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} of {} ({})",
            self.direction(),
            self.amount(),
            self.asset(),
            self.slot()
        )
    }
}
