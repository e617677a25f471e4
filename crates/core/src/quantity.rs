//! Decimal quantities: pounds of product and money.
//!
//! Both wrap `rust_decimal::Decimal` so that accumulating many small harvests
//! and sales never drifts, and so that summation is exact (and therefore
//! order-independent). All arithmetic that can overflow is checked.

use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// A weight in pounds.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Pounds(Decimal);

/// An amount of money in the ledger's (single, implicit) currency.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(Decimal);

macro_rules! impl_decimal_newtype {
    ($t:ident, $name:literal) => {
        impl $t {
            pub const ZERO: Self = Self(Decimal::ZERO);

            pub const fn new(value: Decimal) -> Self {
                Self(value)
            }

            pub fn value(&self) -> Decimal {
                self.0
            }

            /// Strictly greater than zero.
            pub fn is_positive(&self) -> bool {
                self.0 > Decimal::ZERO
            }

            pub fn is_negative(&self) -> bool {
                self.0 < Decimal::ZERO
            }

            pub fn is_zero(&self) -> bool {
                self.0.is_zero()
            }

            pub fn checked_add(self, rhs: Self) -> DomainResult<Self> {
                self.0
                    .checked_add(rhs.0)
                    .map(Self)
                    .ok_or_else(|| DomainError::invariant(concat!($name, " overflow on add")))
            }

            pub fn checked_sub(self, rhs: Self) -> DomainResult<Self> {
                self.0
                    .checked_sub(rhs.0)
                    .map(Self)
                    .ok_or_else(|| DomainError::invariant(concat!($name, " overflow on subtract")))
            }
        }

        impl ValueObject for $t {}

        impl From<Decimal> for $t {
            fn from(value: Decimal) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Decimal {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0.normalize(), f)
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Decimal::from_str(s.trim())
                    .map(Self)
                    .map_err(|e| DomainError::validation(format!("{}: {}", $name, e)))
            }
        }
    };
}

impl_decimal_newtype!(Pounds, "Pounds");
impl_decimal_newtype!(Money, "Money");

impl Pounds {
    /// Whether this weight is an exact multiple of `increment`.
    ///
    /// A non-positive increment accepts every weight.
    pub fn is_multiple_of(&self, increment: Pounds) -> bool {
        if !increment.is_positive() {
            return true;
        }
        self.0
            .checked_rem(increment.0)
            .is_some_and(|rem| rem.is_zero())
    }
}

impl Money {
    /// `weight × unit_price`, rounded half away from zero to `scale` places.
    pub fn extended(weight: Pounds, unit_price: Money, scale: u32) -> DomainResult<Money> {
        weight
            .0
            .checked_mul(unit_price.0)
            .map(|v| Money(v.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)))
            .ok_or_else(|| DomainError::invariant("Money overflow on extend"))
    }
}
