//! Fixed-point signed amounts
//!
//! Amounts are converted into scaled integers without rounding. The scale is
//! the currency precision, widened when an entry carries more decimal digits,
//! so "balanced" always means the exact sum is zero.

use bigdecimal::{BigDecimal, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg};

use crate::types::{Entry, LedgerError, LedgerResult};

/// Largest magnitude accepted for a single amount, in minor units
pub const MAX_UNITS: i128 = 10_i128.pow(30);

/// Number of decimal digits kept for a currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Precision {
    digits: u32,
}

/// Fractional digits needed to hold the value exactly
fn fractional_digits(value: &BigDecimal) -> u32 {
    let (_, scale) = value.normalized().as_bigint_and_exponent();
    u32::try_from(scale.max(0)).unwrap_or(u32::MAX)
}

impl Precision {
    pub fn new(digits: u32) -> Self {
        Self { digits }
    }

    pub fn digits(&self) -> u32 {
        self.digits
    }

    /// Smallest precision, not below this one, that holds every amount of
    /// the entries exactly
    pub fn widen_for<'e, I>(self, entries: I) -> Self
    where
        I: IntoIterator<Item = &'e Entry>,
    {
        let digits = entries
            .into_iter()
            .flat_map(|entry| [&entry.debit, &entry.credit])
            .map(fractional_digits)
            .fold(self.digits, u32::max);
        Self::new(digits)
    }

    /// Scale a decimal value to this precision. Values that would lose
    /// digits are rejected rather than rounded.
    pub fn to_money(&self, value: &BigDecimal) -> LedgerResult<Money> {
        if fractional_digits(value) > self.digits {
            return Err(LedgerError::Validation(format!(
                "Amount {} has more than {} decimal digits",
                value, self.digits
            )));
        }
        let (units, _) = value
            .with_scale(i64::from(self.digits))
            .as_bigint_and_exponent();
        units
            .to_i128()
            .filter(|units| units.unsigned_abs() <= MAX_UNITS.unsigned_abs())
            .map(Money)
            .ok_or_else(|| LedgerError::Validation(format!("Amount {} is out of range", value)))
    }

    /// Signed amount of an entry at this precision
    pub fn entry_amount(&self, entry: &Entry) -> LedgerResult<Money> {
        self.to_money(&entry.signed_amount())
    }

    /// Convert back to a decimal value
    pub fn to_decimal(&self, money: Money) -> BigDecimal {
        BigDecimal::new(money.0.into(), i64::from(self.digits))
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self::new(2)
    }
}

/// Signed amount in minor units of a currency
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Money(i128);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_units(units: i128) -> Self {
        Money(units)
    }

    pub fn units(&self) -> i128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn abs(&self) -> Money {
        Money(self.0.abs())
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Sum that reports overflow instead of wrapping
    pub fn checked_sum<I>(amounts: I) -> LedgerResult<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, Money::checked_add)
            .ok_or_else(|| LedgerError::Validation("Sum of amounts is out of range".to_string()))
    }
}

// Single amounts are capped at `MAX_UNITS`, far below the `i128` limit, so
// sums over a bounded group cannot overflow. Unbounded sums go through
// `Money::checked_sum`.
impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}
