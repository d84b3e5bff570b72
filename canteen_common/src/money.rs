use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::newtype_ops;

pub const CURRENCY_CODE: &str = "USD";

/// Number of minor units (cents) in one major unit.
const MINOR_UNITS: i64 = 100;

//--------------------------------------       Money         ---------------------------------------------------------
/// An amount of money, held as an integer number of minor units (cents). All prices, totals, balances and refunds
/// are carried in this type, so there is never any floating-point rounding in the order flow.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

newtype_ops!(Money => Add::add, Sub::sub);
newtype_ops!(Money assign AddAssign::add_assign, SubAssign::sub_assign);
newtype_ops!(Money unary Neg::neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as money: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Money {}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MoneyConversionError(format!("Value {value} is too large to convert to Money")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / MINOR_UNITS as u64, abs % MINOR_UNITS as u64)
    }
}

impl FromStr for Money {
    type Err = MoneyConversionError;

    /// Parses a decimal amount in major units, e.g. "12", "12.5" or "-0.05". At most two decimal places are allowed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MoneyConversionError(format!("'{s}' is not a valid amount"));
        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (major, minor) = digits.split_once('.').unwrap_or((digits, ""));
        if major.is_empty() || minor.len() > 2 || !major.chars().chain(minor.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let major = major.parse::<i64>().map_err(|_| invalid())?;
        let minor = format!("{minor:0<2}").parse::<i64>().map_err(|_| invalid())?;
        let value = major.checked_mul(MINOR_UNITS).and_then(|v| v.checked_add(minor)).ok_or_else(invalid)?;
        Ok(Self(if negative { -value } else { value }))
    }
}

impl Money {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_major(units: i64) -> Self {
        Self(units * MINOR_UNITS)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Returns `percent`% of this amount, rounded down to the nearest minor unit.
    pub fn percentage(&self, percent: u8) -> Self {
        Self(self.0 * i64::from(percent) / 100)
    }
}
