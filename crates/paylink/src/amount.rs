//! Paylink Amount
//!
//! Integer base units of a ledger asset, plus the decimal conversions used by the split allocator
//! (cents, rounded to nearest) and by settlement (asset base units, rounded toward zero).

use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ensure_paylink;

/// Number of fractional digits of a cent amount
pub const CENT_DIGITS: u32 = 2;

/// Amount Error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Amount overflow
    #[error("Amount Overflow")]
    AmountOverflow,
    /// Negative amounts cannot be converted to base units
    #[error("Amount cannot be negative")]
    NegativeAmount,
    /// Invalid amount
    #[error("Invalid Amount: {0}")]
    InvalidAmount(String),
}

/// Amount in base units of an asset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    /// Amount zero
    pub const ZERO: Amount = Amount(0);

    /// Amount one
    pub const ONE: Amount = Amount(1);

    /// Convert a decimal into base units with `decimals` fractional digits.
    ///
    /// Rounds toward zero, so a value with more precision than the asset supports is truncated
    /// rather than rounded up.
    pub fn from_decimal_truncated(value: Decimal, decimals: u8) -> Result<Self, Error> {
        ensure_paylink!(!value.is_sign_negative() || value.is_zero(), Error::NegativeAmount);
        let value = value.abs();

        let scale = 10u64
            .checked_pow(u32::from(decimals))
            .map(Decimal::from)
            .ok_or(Error::AmountOverflow)?;
        let scaled = value.checked_mul(scale).ok_or(Error::AmountOverflow)?;

        scaled
            .round_dp_with_strategy(0, RoundingStrategy::ToZero)
            .to_u64()
            .map(Amount)
            .ok_or(Error::AmountOverflow)
    }

    /// Render as a decimal with `decimals` fractional digits
    pub fn to_decimal(&self, decimals: u8) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(self.0), u32::from(decimals))
    }

    /// Checked addition for Amount. Returns None if overflow occurs.
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Checked subtraction for Amount. Returns None if overflow occurs.
    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Try sum to check for overflow
    pub fn try_sum<I>(iter: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = Self>,
    {
        iter.into_iter().try_fold(Amount::ZERO, |acc, x| {
            acc.checked_add(x).ok_or(Error::AmountOverflow)
        })
    }

    /// Raw base units
    pub fn to_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Amount> for u64 {
    fn from(value: Amount) -> Self {
        value.0
    }
}

impl FromStr for Amount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .parse::<u64>()
            .map_err(|_| Error::InvalidAmount(s.to_owned()))?;
        Ok(Amount(value))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Convert a decimal currency value into integer cents.
///
/// Multiplies by 100 and rounds to the nearest cent (midpoint away from zero). Never truncates.
pub fn cents_from_decimal(value: Decimal) -> Result<u64, Error> {
    ensure_paylink!(!value.is_sign_negative() || value.is_zero(), Error::NegativeAmount);

    value
        .abs()
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or(Error::AmountOverflow)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .ok_or(Error::AmountOverflow)
}

/// Integer cents as a two digit decimal
pub fn decimal_from_cents(cents: u64) -> Decimal {
    Decimal::from_i128_with_scale(i128::from(cents), CENT_DIGITS)
}

/// Whether the value is a whole number of cents
pub fn is_whole_cents(value: Decimal) -> bool {
    value
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|scaled| scaled.fract().is_zero())
        .unwrap_or(false)
}
