use crate::error::{CheckoutError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Decimal places used by the payment token unless configured otherwise.
pub const DEFAULT_DECIMALS: u32 = 18;

/// Most decimal places a `u128` amount can carry.
pub const MAX_DECIMALS: u32 = 38;

/// A token amount expressed as an integer count of the token's smallest unit.
///
/// All price arithmetic happens on this type. Human-readable decimals are only
/// accepted at the edges (catalog definitions, CLI input) through
/// [`BaseUnits::from_decimal`] and [`BaseUnits::parse_units`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BaseUnits(pub u128);

impl BaseUnits {
    pub const ZERO: Self = Self(0);

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Scales a decimal value by `decimals` places into base units.
    ///
    /// Fails on negative values and on values carrying more fractional digits
    /// than the token can represent.
    pub fn from_decimal(value: Decimal, decimals: u32) -> Result<Self> {
        if decimals > MAX_DECIMALS {
            return Err(CheckoutError::InvalidAmount(format!(
                "{decimals} decimal places exceed the maximum of {MAX_DECIMALS}"
            )));
        }
        if value.is_sign_negative() && !value.is_zero() {
            return Err(CheckoutError::InvalidAmount(format!(
                "{value} is negative"
            )));
        }

        let value = value.normalize();
        let scale = value.scale();
        if scale > decimals {
            return Err(CheckoutError::InvalidAmount(format!(
                "{value} has more than {decimals} fractional digits"
            )));
        }

        let mantissa = value.mantissa().unsigned_abs();
        let factor = 10u128
            .checked_pow(decimals - scale)
            .ok_or(CheckoutError::AmountOverflow)?;

        mantissa
            .checked_mul(factor)
            .map(Self)
            .ok_or(CheckoutError::AmountOverflow)
    }

    /// Parses a human-readable amount such as `"0.75"`.
    pub fn parse_units(input: &str, decimals: u32) -> Result<Self> {
        let value = Decimal::from_str(input.trim())
            .map_err(|e| CheckoutError::InvalidAmount(format!("{input:?}: {e}")))?;
        Self::from_decimal(value, decimals)
    }

    /// Renders the amount as a decimal string, trailing zeros trimmed.
    pub fn format_units(&self, decimals: u32) -> String {
        let decimals = decimals as usize;
        let digits = self.0.to_string();
        if decimals == 0 {
            return digits;
        }

        let padded = format!("{digits:0>width$}", width = decimals + 1);
        let (whole, fraction) = padded.split_at(padded.len() - decimals);
        let fraction = fraction.trim_end_matches('0');
        if fraction.is_empty() {
            whole.to_string()
        } else {
            format!("{whole}.{fraction}")
        }
    }
}

impl fmt::Display for BaseUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Serialized as a string: base-unit values routinely exceed 2^53.
impl Serialize for BaseUnits {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for BaseUnits {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<u128>()
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}
