//! A decimal amount of money that can be stored in SQLite without losing precision.

use std::{
    fmt::Display,
    ops::Neg,
    str::FromStr,
};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Error;

/// The number of decimal places money is tracked to.
pub const MONEY_SCALE: u32 = 2;

/// The largest amount accepted for a single deposit, withdrawal, transfer or
/// loan: 1,000,000,000,000,000.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// An amount of money in the bank's single currency.
///
/// Stored in the database as TEXT and serialized to JSON as a string, so that
/// amounts like `0.10` survive a round trip exactly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Create a new amount.
    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// No money at all.
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// The underlying decimal value.
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether the amount is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Check that the amount can be used for a deposit, withdrawal, transfer or loan.
    ///
    /// # Errors
    /// Returns [Error::InvalidAmount] if the amount is zero or negative, larger
    /// than [MAX_AMOUNT], or if it has more than two decimal places.
    pub fn validate_amount(self) -> Result<Self, Error> {
        if self.0 <= Decimal::ZERO {
            return Err(Error::InvalidAmount(format!(
                "{} is not greater than zero",
                self.0
            )));
        }

        if self.0 > MAX_AMOUNT {
            return Err(Error::InvalidAmount(format!(
                "{} is greater than the limit of {MAX_AMOUNT}",
                self.0
            )));
        }

        if self.0.normalize().scale() > MONEY_SCALE {
            return Err(Error::InvalidAmount(format!(
                "{} has more than {MONEY_SCALE} decimal places",
                self.0
            )));
        }

        Ok(self)
    }

    /// Add two amounts.
    ///
    /// # Errors
    /// Returns [Error::ArithmeticOverflow] if the sum cannot be represented.
    pub fn checked_add(self, rhs: Self) -> Result<Self, Error> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or(Error::ArithmeticOverflow("addition"))
    }

    /// Subtract `rhs` from this amount.
    ///
    /// # Errors
    /// Returns [Error::ArithmeticOverflow] if the difference cannot be represented.
    pub fn checked_sub(self, rhs: Self) -> Result<Self, Error> {
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or(Error::ArithmeticOverflow("subtraction"))
    }

    /// Round to whole cents, half away from zero.
    pub fn round_to_cents(self) -> Self {
        Self(self.0.round_dp_with_strategy(
            MONEY_SCALE,
            rust_decimal::RoundingStrategy::MidpointAwayFromZero,
        ))
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s).map(Self)
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl ToSql for Money {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.to_string()))
    }
}

impl FromSql for Money {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Text(_) => value
                .as_str()?
                .parse::<Decimal>()
                .map(Self)
                .map_err(|error| FromSqlError::Other(Box::new(error))),
            ValueRef::Integer(amount) => Ok(Self(Decimal::from(amount))),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}
