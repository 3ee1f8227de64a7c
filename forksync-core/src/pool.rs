use std::fmt;

use alloy::primitives::Address;

use crate::amount::BaseUnits;

/// Which chain view a value was observed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LedgerKind {
    /// Live chain treated as ground truth.
    Reference,
    /// Forked chain corrected to match the reference.
    Sandbox,
}

impl fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reference => f.write_str("reference"),
            Self::Sandbox => f.write_str("sandbox"),
        }
    }
}

/// One of the two reserve slots of a pool, in the pool's own token ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetSlot {
    Asset0,
    Asset1,
}

impl AssetSlot {
    pub const ALL: [AssetSlot; 2] = [AssetSlot::Asset0, AssetSlot::Asset1];

    /// Order in which corrective actions are issued. Asset1 goes first; the
    /// slots are independent so the order only fixes log and call sequencing.
    pub const DISPATCH_ORDER: [AssetSlot; 2] = [AssetSlot::Asset1, AssetSlot::Asset0];

    pub const fn index(self) -> usize {
        match self {
            Self::Asset0 => 0,
            Self::Asset1 => 1,
        }
    }
}

impl fmt::Display for AssetSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asset0 => f.write_str("asset0"),
            Self::Asset1 => f.write_str("asset1"),
        }
    }
}

impl TryFrom<u8> for AssetSlot {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Asset0),
            1 => Ok(Self::Asset1),
            other => Err(other),
        }
    }
}

/// Pool address plus its two tracked assets, fixed for the lifetime of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PoolIdentity {
    pool: Address,
    assets: [Address; 2],
}

impl PoolIdentity {
    /// `asset0` and `asset1` must follow the pool's internal ordering; nothing
    /// downstream reorders them.
    pub fn new(pool: Address, asset0: Address, asset1: Address) -> Self {
        Self {
            pool,
            assets: [asset0, asset1],
        }
    }

    pub fn pool(&self) -> Address {
        self.pool
    }

    pub fn asset(&self, slot: AssetSlot) -> Address {
        self.assets[slot.index()]
    }
}

/// Reserve balances of a pool as observed on one ledger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReservePair {
    amounts: [BaseUnits; 2],
}

impl ReservePair {
    pub fn new(asset0: impl Into<BaseUnits>, asset1: impl Into<BaseUnits>) -> Self {
        Self {
            amounts: [asset0.into(), asset1.into()],
        }
    }

    pub fn get(&self, slot: AssetSlot) -> BaseUnits {
        self.amounts[slot.index()]
    }

    pub fn asset0(&self) -> BaseUnits {
        self.amounts[0]
    }

    pub fn asset1(&self) -> BaseUnits {
        self.amounts[1]
    }
}

impl fmt::Display for ReservePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.amounts[0], self.amounts[1])
    }
}

/// Token metadata used only for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetMetadata {
    pub address: Address,
    pub decimals: u8,
    pub name: String,
    pub symbol: String,
}

impl AssetMetadata {
    /// Human rendering such as `1.5 USDC`.
    pub fn describe(&self, amount: BaseUnits) -> String {
        format!("{} {}", amount.format_units(self.decimals), self.symbol)
    }
}
