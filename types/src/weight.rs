//! Ownership weight as fixed-point basis points.
//!
//! All quorum arithmetic is integer arithmetic on basis points: 10_000 bps
//! = 100.00%. There is no floating-point representation anywhere in the
//! engine, so "sums to exactly 100%" means `total == Weight::FULL` with no
//! tolerance constant.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};

/// An ownership share expressed in basis points (1/100th of a percent).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Weight(u32);

impl Weight {
    /// Zero weight.
    pub const ZERO: Self = Self(0);

    /// The whole asset: 10_000 basis points = 100.00%.
    pub const FULL: Self = Self(10_000);

    pub fn from_bps(bps: u32) -> Self {
        Self(bps)
    }

    /// Convenience constructor from whole percent.
    pub fn from_percent(percent: u32) -> Self {
        Self(percent * 100)
    }

    pub fn bps(&self) -> u32 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Strict majority test: does this weight exceed half of `total`?
    ///
    /// An exact half does NOT qualify; the tie resolves against.
    pub fn exceeds_half_of(self, total: Self) -> bool {
        u64::from(self.0) * 2 > u64::from(total.0)
    }
}

impl Add for Weight {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Weight {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Sum for Weight {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_is_hundred_percent() {
        assert_eq!(Weight::FULL, Weight::from_percent(100));
        assert_eq!(Weight::FULL.bps(), 10_000);
    }

    #[test]
    fn exact_half_is_not_a_majority() {
        let half = Weight::from_bps(5_000);
        assert!(!half.exceeds_half_of(Weight::FULL));
        assert!(Weight::from_bps(5_001).exceeds_half_of(Weight::FULL));
    }

    #[test]
    fn sum_of_splits() {
        let splits = [
            Weight::from_percent(50),
            Weight::from_percent(30),
            Weight::from_percent(20),
        ];
        let total: Weight = splits.iter().copied().sum();
        assert_eq!(total, Weight::FULL);
    }

    #[test]
    fn display_two_decimals() {
        assert_eq!(Weight::from_bps(3_333).to_string(), "33.33%");
        assert_eq!(Weight::from_bps(5_000).to_string(), "50.00%");
    }
}
