use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Div, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

pub const RIAL_CURRENCY_CODE: &str = "IRR";
pub const RIAL_CURRENCY_CODE_LOWER: &str = "irr";

//--------------------------------------       Rial       ------------------------------------------------------------
/// An amount of money in Rial minor units. The engine works in a single fixed currency, so all prices, deposits and
/// settlement amounts are plain integer Rials.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Rial(i64);

impl Add for Rial {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Rial {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Rial {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Rial {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Mul<i64> for Rial {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Div<i64> for Rial {
    type Output = Self;

    fn div(self, rhs: i64) -> Self::Output {
        Self::from(self.value() / rhs)
    }
}

impl Sum for Rial {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in Rial: {0}")]
pub struct RialConversionError(String);

impl From<i64> for Rial {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Rial {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Rial {}

impl TryFrom<u64> for Rial {
    type Error = RialConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(RialConversionError(format!("Value {} is too large to convert to Rial", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Rial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {RIAL_CURRENCY_CODE}", self.0)
    }
}

impl Rial {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arithmetic() {
        let a = Rial::from(1_000_000);
        let b = Rial::from(250_000);
        assert_eq!(a - b, Rial::from(750_000));
        assert_eq!(a + b, Rial::from(1_250_000));
        assert_eq!(b * 4, a);
        assert_eq!(a / 4, b);
        assert_eq!(-b, Rial::from(-250_000));
    }

    #[test]
    fn sum_and_display() {
        let total: Rial = [1, 2, 3].into_iter().map(Rial::from).sum();
        assert_eq!(total, Rial::from(6));
        assert_eq!(Rial::from(5_000_000).to_string(), "5000000 IRR");
    }
}
