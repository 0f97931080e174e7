//! Exact rational arithmetic for scores and food accounting.
//!
//! Kill points are split `1/n` between attackers and the food accumulator
//! carries a `food_rate·N/food_turn` remainder forever, so floating point
//! would drift. Values are kept normalized (`gcd(num, den) == 1`, `den > 0`).

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// A normalized rational number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fraction {
    num: i128,
    den: i128,
}

impl Fraction {
    /// Zero.
    pub const ZERO: Self = Self { num: 0, den: 1 };
    /// One.
    pub const ONE: Self = Self { num: 1, den: 1 };

    /// Create `num / den`, normalized.
    ///
    /// # Panics
    ///
    /// Panics if `den` is zero.
    #[must_use]
    pub fn new(num: i128, den: i128) -> Self {
        assert!(den != 0, "fraction with zero denominator");
        let sign = if den < 0 { -1 } else { 1 };
        let g = gcd(num.unsigned_abs(), den.unsigned_abs());
        #[allow(clippy::cast_possible_wrap)]
        let g = g as i128;
        Self {
            num: sign * num / g,
            den: sign * den / g,
        }
    }

    /// A whole number.
    #[must_use]
    pub const fn from_int(value: i128) -> Self {
        Self { num: value, den: 1 }
    }

    /// `1 / n`, the share each of `n` recipients gets from one point.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero.
    #[must_use]
    pub fn share(n: usize) -> Self {
        Self::new(1, i128::try_from(n).unwrap_or(i128::MAX))
    }

    /// Numerator.
    #[must_use]
    pub const fn numer(&self) -> i128 {
        self.num
    }

    /// Denominator (always positive).
    #[must_use]
    pub const fn denom(&self) -> i128 {
        self.den
    }

    /// Largest integer not greater than the value.
    #[must_use]
    pub const fn floor(&self) -> i128 {
        self.num.div_euclid(self.den)
    }

    /// Floor, clamped into `i64` for reporting.
    #[must_use]
    pub fn floor_i64(&self) -> i64 {
        i64::try_from(self.floor()).unwrap_or(if self.num < 0 { i64::MIN } else { i64::MAX })
    }

    /// Approximate value, for display only.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Multiply by an integer.
    #[must_use]
    pub fn scale(self, factor: i128) -> Self {
        Self::new(self.num * factor, self.den)
    }
}

impl Default for Fraction {
    fn default() -> Self {
        Self::ZERO
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    if a == 0 { 1 } else { a }
}

impl Add for Fraction {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        if self.den == rhs.den {
            return Self::new(self.num + rhs.num, self.den);
        }
        let g = gcd(self.den.unsigned_abs(), rhs.den.unsigned_abs());
        #[allow(clippy::cast_possible_wrap)]
        let g = g as i128;
        let lhs_scale = rhs.den / g;
        let rhs_scale = self.den / g;
        Self::new(
            self.num * lhs_scale + rhs.num * rhs_scale,
            self.den * lhs_scale,
        )
    }
}

impl Sub for Fraction {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self + Self {
            num: -rhs.num,
            den: rhs.den,
        }
    }
}

impl AddAssign for Fraction {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Fraction {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl From<i128> for Fraction {
    fn from(value: i128) -> Self {
        Self::from_int(value)
    }
}

impl Ord for Fraction {
    fn cmp(&self, other: &Self) -> Ordering {
        // Denominators are positive so cross-multiplication keeps the order.
        (self.num * other.den).cmp(&(other.num * self.den))
    }
}

impl PartialOrd for Fraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes() {
        let f = Fraction::new(6, -4);
        assert_eq!(f.numer(), -3);
        assert_eq!(f.denom(), 2);
    }

    #[test]
    fn test_shares_sum_to_one() {
        let mut total = Fraction::ZERO;
        for _ in 0..3 {
            total += Fraction::share(3);
        }
        assert_eq!(total, Fraction::ONE);
    }

    #[test]
    fn test_floor_negative() {
        assert_eq!(Fraction::new(-1, 2).floor(), -1);
        assert_eq!(Fraction::new(7, 2).floor(), 3);
        assert_eq!(Fraction::new(4, 2).floor(), 2);
    }

    #[test]
    fn test_ordering() {
        assert!(Fraction::new(1, 3) < Fraction::new(1, 2));
        assert!(Fraction::new(-1, 3) > Fraction::new(-1, 2));
        assert_eq!(Fraction::new(2, 4).cmp(&Fraction::new(1, 2)), Ordering::Equal);
    }

    #[test]
    fn test_display() {
        assert_eq!(Fraction::new(3, 6).to_string(), "1/2");
        assert_eq!(Fraction::from_int(4).to_string(), "4");
    }
}
