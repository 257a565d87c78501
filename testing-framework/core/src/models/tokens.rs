use std::{fmt, ops::Add};

use serde::{Deserialize, Serialize};

/// Smallest units per token.
pub const UNITS_PER_TOKEN: i64 = 10_000_000_000;

/// Token amount in chain units (1 token = 10^10 units).
#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Tokens(pub i64);

impl Tokens {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn from_units(units: i64) -> Self {
        Self(units)
    }

    /// Converts a whole or fractional token amount, rounding to the nearest
    /// unit.
    #[must_use]
    pub fn from_tokens(tokens: f64) -> Self {
        let units = (tokens * UNITS_PER_TOKEN as f64).round() as i64;
        Self(units)
    }

    #[must_use]
    pub const fn units(self) -> i64 {
        self.0
    }

    #[must_use]
    pub fn as_tokens(self) -> f64 {
        self.0 as f64 / UNITS_PER_TOKEN as f64
    }
}

impl Add for Tokens {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl fmt::Display for Tokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ZCN", self.as_tokens())
    }
}
