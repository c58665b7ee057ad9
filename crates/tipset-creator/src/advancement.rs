//! Tipset advancement weight
//!
//! A pair of `(weighted advancement, zero-weight advancement count)`.
//! Zero-weight nodes never move consensus forward, but building on them is
//! still better than building on nothing, so their advancement is counted
//! separately and only breaks ties.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Advancement between two tipsets
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TipsetAdvancementWeight {
    /// Sum of weights of non-zero-weight creators that advanced
    pub advancement_weight: u64,
    /// Number of zero-weight creators that advanced
    pub zero_weight_advancement_count: u64,
}

impl TipsetAdvancementWeight {
    /// No advancement at all
    pub const ZERO: Self = Self {
        advancement_weight: 0,
        zero_weight_advancement_count: 0,
    };

    pub const fn of(advancement_weight: u64, zero_weight_advancement_count: u64) -> Self {
        Self {
            advancement_weight,
            zero_weight_advancement_count,
        }
    }

    pub fn plus(&self, other: &Self) -> Self {
        Self {
            advancement_weight: self.advancement_weight.saturating_add(other.advancement_weight),
            zero_weight_advancement_count: self
                .zero_weight_advancement_count
                .saturating_add(other.zero_weight_advancement_count),
        }
    }

    /// Componentwise difference, saturating at zero
    pub fn minus(&self, other: &Self) -> Self {
        Self {
            advancement_weight: self.advancement_weight.saturating_sub(other.advancement_weight),
            zero_weight_advancement_count: self
                .zero_weight_advancement_count
                .saturating_sub(other.zero_weight_advancement_count),
        }
    }

    pub fn is_greater_than(&self, other: &Self) -> bool {
        self > other
    }

    pub fn is_non_zero(&self) -> bool {
        *self != Self::ZERO
    }
}

impl Add for TipsetAdvancementWeight {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.plus(&rhs)
    }
}

impl Sub for TipsetAdvancementWeight {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.minus(&rhs)
    }
}

impl fmt::Display for TipsetAdvancementWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {})",
            self.advancement_weight, self.zero_weight_advancement_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_is_lexicographic() {
        let a = TipsetAdvancementWeight::of(1, 0);
        let b = TipsetAdvancementWeight::of(0, 5);
        let c = TipsetAdvancementWeight::of(1, 2);

        assert!(a.is_greater_than(&b));
        assert!(c.is_greater_than(&a));
        assert!(b.is_greater_than(&TipsetAdvancementWeight::ZERO));
        assert!(!a.is_greater_than(&a));
    }

    #[test]
    fn test_plus_minus() {
        let a = TipsetAdvancementWeight::of(3, 1);
        let b = TipsetAdvancementWeight::of(1, 1);

        assert_eq!(a + b, TipsetAdvancementWeight::of(4, 2));
        assert_eq!(a - b, TipsetAdvancementWeight::of(2, 0));
        assert_eq!(a.plus(&b).minus(&b), a);
    }

    #[test]
    fn test_minus_saturates() {
        let small = TipsetAdvancementWeight::of(1, 0);
        let large = TipsetAdvancementWeight::of(2, 3);
        assert_eq!(small - large, TipsetAdvancementWeight::ZERO);
    }

    #[test]
    fn test_non_zero() {
        assert!(!TipsetAdvancementWeight::ZERO.is_non_zero());
        assert!(TipsetAdvancementWeight::of(0, 1).is_non_zero());
        assert_eq!(format!("{}", TipsetAdvancementWeight::of(2, 1)), "(2, 1)");
    }
}
