use std::fmt;
use std::str::FromStr;

use alloy::primitives::U256;
use rust_decimal::Decimal;
use thiserror::Error;

/// Raw integer amount expressed in an asset's smallest unit (wei for the
/// native asset, `10^-decimals` for tokens).
///
/// Reserve deltas are already base units; they flow into funding and burn
/// calls untouched. The only way to obtain a `BaseUnits` from a human figure
/// is [`DisplayAmount::to_base_units`], which makes double scaling a type error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BaseUnits(U256);

impl BaseUnits {
    pub const ZERO: Self = Self(U256::ZERO);

    pub const fn new(raw: U256) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> U256 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    /// Clamped subtraction; never underflows.
    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Render the amount with the given decimal precision, trimming trailing zeros.
    pub fn format_units(self, decimals: u8) -> String {
        let digits = self.0.to_string();
        let decimals = usize::from(decimals);
        if decimals == 0 {
            return digits;
        }
        let padded = if digits.len() <= decimals {
            format!("{}{digits}", "0".repeat(decimals - digits.len() + 1))
        } else {
            digits
        };
        let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
        let frac_part = frac_part.trim_end_matches('0');
        if frac_part.is_empty() {
            int_part.to_string()
        } else {
            format!("{int_part}.{frac_part}")
        }
    }
}

impl fmt::Display for BaseUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<U256> for BaseUnits {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl From<u64> for BaseUnits {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl From<u128> for BaseUnits {
    fn from(value: u128) -> Self {
        Self(U256::from(value))
    }
}

impl FromStr for BaseUnits {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        U256::from_str(s.trim())
            .map(Self)
            .map_err(|err| AmountError::Parse(format!("{s}: {err}")))
    }
}

/// Human-readable amount as typed by an operator, e.g. `"1.5"` USDC.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct DisplayAmount(Decimal);

impl DisplayAmount {
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Scale into base units for an asset with `decimals` digits of precision.
    pub fn to_base_units(&self, decimals: u8) -> Result<BaseUnits, AmountError> {
        if self.0.is_sign_negative() && !self.0.is_zero() {
            return Err(AmountError::Negative(self.0));
        }
        let normalized = self.0.normalize();
        let scale = normalized.scale();
        if scale > u32::from(decimals) {
            return Err(AmountError::PrecisionLoss {
                amount: self.0,
                decimals,
            });
        }
        let mantissa = U256::from(normalized.mantissa().unsigned_abs());
        let exponent = U256::from(u32::from(decimals) - scale);
        U256::from(10u64)
            .checked_pow(exponent)
            .and_then(|factor| mantissa.checked_mul(factor))
            .map(BaseUnits)
            .ok_or(AmountError::Overflow {
                amount: self.0,
                decimals,
            })
    }
}

impl fmt::Display for DisplayAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for DisplayAmount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim())
            .map(Self)
            .map_err(|err| AmountError::Parse(format!("{s}: {err}")))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("invalid amount {0}")]
    Parse(String),
    #[error("amount must not be negative: {0}")]
    Negative(Decimal),
    #[error("{amount} has more fractional digits than the asset's {decimals} decimals")]
    PrecisionLoss { amount: Decimal, decimals: u8 },
    #[error("{amount} overflows 256 bits at {decimals} decimals")]
    Overflow { amount: Decimal, decimals: u8 },
}
