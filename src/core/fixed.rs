//! Q32.32 Fixed-Point Arithmetic
//!
//! Deterministic fixed-point math for the simulation. All operations use
//! integer arithmetic only - no floats anywhere near game state.
//!
//! ## Format: Q32.32
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Bit Layout: Q32.32 (64-bit signed integer)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  [S][IIIIIIIIIIIIIIIIIIIIIIIIIIIIIII][FFFF....FFFF]         │
//! │   │  └──────── 31 bits ─────────────┘└── 32 bits ──┘        │
//! │   └─ Sign bit                                               │
//! │                                                             │
//! │  Range: about ±2.1 billion units                            │
//! │  Precision: 2^-32 ≈ 0.00000000023 units                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Semantics
//!
//! Every operation is a pure function of its raw inputs. Multiplication and
//! division widen to i128 before the renormalization shift and saturate to
//! the i64 range on overflow; saturation is observable and deterministic.
//! Division by zero and sqrt of a negative fail with typed errors rather
//! than producing a value.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::error::{LockstepError, Result};

/// Number of fractional bits (32).
pub const FIXED_SHIFT: u32 = 32;

/// 1.0 in raw form (2^32).
pub const FIXED_ONE_RAW: i64 = 1 << FIXED_SHIFT;

/// Q32.32 fixed-point number stored as i64.
///
/// Equality, ordering and hashing are by raw value.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Fp(i64);

/// Clamp a widened intermediate back into the i64 range.
#[inline]
pub(crate) const fn saturate(wide: i128) -> i64 {
    if wide > i64::MAX as i128 {
        i64::MAX
    } else if wide < i64::MIN as i128 {
        i64::MIN
    } else {
        wide as i64
    }
}

/// Integer square root by Newton-Raphson, iterating until non-decreasing.
///
/// Starts from a power-of-two guess at or above the true root so the
/// sequence decreases monotonically and terminates at floor(sqrt(x)).
#[inline]
fn isqrt_u64(x: u64) -> u64 {
    if x == 0 {
        return 0;
    }
    let mut r = 1u64 << ((63 - x.leading_zeros()) / 2 + 1);
    loop {
        let next = (r + x / r) >> 1;
        if next >= r {
            return r;
        }
        r = next;
    }
}

impl Fp {
    /// Zero constant.
    pub const ZERO: Self = Self(0);

    /// One constant.
    pub const ONE: Self = Self(FIXED_ONE_RAW);

    /// One half.
    pub const HALF: Self = Self(FIXED_ONE_RAW >> 1);

    /// Two.
    pub const TWO: Self = Self(FIXED_ONE_RAW << 1);

    /// Maximum representable value.
    pub const MAX: Self = Self(i64::MAX);

    /// Minimum representable value.
    pub const MIN: Self = Self(i64::MIN);

    /// Smallest positive increment (2^-32).
    pub const EPSILON: Self = Self(1);

    /// π (raw = round(π · 2^32)).
    pub const PI: Self = Self(13_493_037_705);

    /// 2π.
    pub const TWO_PI: Self = Self(26_986_075_409);

    /// π/2.
    pub const HALF_PI: Self = Self(6_746_518_852);

    /// Create from a raw Q32.32 value.
    #[inline]
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Create from an integer.
    #[inline]
    pub const fn from_int(i: i32) -> Self {
        Self((i as i64) << FIXED_SHIFT)
    }

    /// Create from a ratio of integers, truncating toward zero.
    ///
    /// # Panics
    /// Panics if `den` is zero. Intended for constants and initialization,
    /// not the tick loop.
    #[inline]
    pub fn from_ratio(num: i64, den: i64) -> Self {
        assert!(den != 0, "from_ratio denominator must be nonzero");
        Self(saturate(((num as i128) << FIXED_SHIFT) / den as i128))
    }

    /// Convert a float to fixed-point.
    ///
    /// # Warning
    /// Only use at initialization or in tests. NEVER in the tick loop.
    #[inline]
    pub fn from_f64(f: f64) -> Self {
        Self(saturate((f * FIXED_ONE_RAW as f64) as i128))
    }

    /// Get the raw Q32.32 value.
    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Convert to float for display/rendering.
    ///
    /// # Warning
    /// Only use for visual output. NEVER use the result in game logic.
    #[inline]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / FIXED_ONE_RAW as f64
    }

    /// Integer part, rounding toward negative infinity.
    #[inline]
    pub const fn to_int(self) -> i64 {
        self.0 >> FIXED_SHIFT
    }

    /// Saturating multiplication through a widened intermediate.
    #[inline]
    pub fn mul(self, rhs: Self) -> Self {
        Self(saturate(((self.0 as i128) * (rhs.0 as i128)) >> FIXED_SHIFT))
    }

    /// Division, failing on a zero divisor.
    ///
    /// Widens the numerator before the shift so precision is kept; the
    /// quotient saturates on overflow.
    #[inline]
    pub fn try_div(self, rhs: Self) -> Result<Self> {
        if rhs.0 == 0 {
            return Err(LockstepError::DivideByZero);
        }
        Ok(Self(div_raw(self.0, rhs.0)))
    }

    /// Square root, failing on negative input.
    ///
    /// For raw values below 2^32 the input is pre-scaled (`raw << 32`) and
    /// rooted directly; larger magnitudes are rooted unscaled and the result
    /// shifted left by 16, which avoids overflowing the widened domain.
    pub fn sqrt(self) -> Result<Self> {
        if self.0 < 0 {
            return Err(LockstepError::DomainError("sqrt of negative value"));
        }
        let raw = self.0 as u64;
        let root = if raw < (1u64 << FIXED_SHIFT) {
            isqrt_u64(raw << FIXED_SHIFT)
        } else {
            isqrt_u64(raw) << (FIXED_SHIFT / 2)
        };
        Ok(Self(root as i64))
    }

    /// Absolute value (saturating: |MIN| = MAX).
    #[inline]
    pub const fn abs(self) -> Self {
        Self(self.0.saturating_abs())
    }

    /// Sign as -1, 0 or +1 in fixed-point.
    #[inline]
    pub const fn signum(self) -> Self {
        Self(self.0.signum() << FIXED_SHIFT)
    }

    /// Minimum of two values.
    #[inline]
    pub fn min(self, other: Self) -> Self {
        if self.0 < other.0 {
            self
        } else {
            other
        }
    }

    /// Maximum of two values.
    #[inline]
    pub fn max(self, other: Self) -> Self {
        if self.0 > other.0 {
            self
        } else {
            other
        }
    }

    /// Clamp to a range.
    #[inline]
    pub fn clamp(self, min: Self, max: Self) -> Self {
        self.max(min).min(max)
    }

    /// Largest integral value not greater than self.
    #[inline]
    pub const fn floor(self) -> Self {
        Self(self.0 & !(FIXED_ONE_RAW - 1))
    }

    /// Smallest integral value not less than self.
    #[inline]
    pub const fn ceil(self) -> Self {
        Self(self.0.saturating_add(FIXED_ONE_RAW - 1) & !(FIXED_ONE_RAW - 1))
    }

    /// Nearest integral value, half rounding up.
    #[inline]
    pub const fn round(self) -> Self {
        Self(self.0.saturating_add(FIXED_ONE_RAW >> 1) & !(FIXED_ONE_RAW - 1))
    }

    /// Linear interpolation: self + (other - self) * t.
    #[inline]
    pub fn lerp(self, other: Self, t: Self) -> Self {
        self + (other - self).mul(t)
    }

    /// True if the raw value is zero.
    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

/// Raw-domain division. Caller guarantees `b != 0`.
#[inline]
pub(crate) fn div_raw(a: i64, b: i64) -> i64 {
    debug_assert!(b != 0);
    saturate(((a as i128) << FIXED_SHIFT) / b as i128)
}

impl Add for Fp {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Fp {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for Fp {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Fp {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_sub(rhs.0);
    }
}

impl Mul for Fp {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Fp::mul(self, rhs)
    }
}

impl Neg for Fp {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

impl fmt::Debug for Fp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fp({:.6})", self.to_f64())
    }
}

impl fmt::Display for Fp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.to_f64())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_constants() {
        assert_eq!(Fp::ONE.raw(), 1 << 32);
        assert_eq!(Fp::HALF.raw(), 1 << 31);
        assert_eq!(Fp::TWO.raw(), 2 << 32);
        assert_eq!(Fp::from_int(10).raw(), 42_949_672_960);
    }

    #[test]
    fn test_mul() {
        // 2.0 * 3.0 = 6.0
        assert_eq!(Fp::from_int(2) * Fp::from_int(3), Fp::from_int(6));

        // 0.5 * 0.5 = 0.25
        let quarter = Fp::HALF * Fp::HALF;
        assert_eq!(quarter, Fp::from_ratio(1, 4));

        // Negative: -2.0 * 3.0 = -6.0
        assert_eq!(Fp::from_int(-2) * Fp::from_int(3), Fp::from_int(-6));
    }

    #[test]
    fn test_mul_saturates() {
        // MAX * MAX saturates to MAX, deterministically
        assert_eq!(Fp::MAX * Fp::MAX, Fp::MAX);
        assert_eq!(Fp::MIN * Fp::MAX, Fp::MIN);
        // MIN * MIN is a huge positive product
        assert_eq!(Fp::MIN * Fp::MIN, Fp::MAX);
    }

    #[test]
    fn test_add_saturates() {
        assert_eq!(Fp::MAX + Fp::ONE, Fp::MAX);
        assert_eq!(Fp::MIN - Fp::ONE, Fp::MIN);
        assert_eq!(-Fp::MIN, Fp::MAX);
    }

    #[test]
    fn test_div() {
        // 6.0 / 2.0 = 3.0
        let r = Fp::from_int(6).try_div(Fp::from_int(2)).unwrap();
        assert_eq!(r, Fp::from_int(3));

        // 1.0 / 4.0 = 0.25
        let r = Fp::ONE.try_div(Fp::from_int(4)).unwrap();
        assert_eq!(r, Fp::from_ratio(1, 4));

        // Division by zero is an error, not a value
        assert!(matches!(
            Fp::ONE.try_div(Fp::ZERO),
            Err(LockstepError::DivideByZero)
        ));
    }

    #[test]
    fn test_div_saturates() {
        // MAX / epsilon overflows the quotient and saturates
        let r = Fp::MAX.try_div(Fp::EPSILON).unwrap();
        assert_eq!(r, Fp::MAX);
    }

    #[test]
    fn test_sqrt() {
        // sqrt(4.0) = 2.0 exactly
        assert_eq!(Fp::from_int(4).sqrt().unwrap(), Fp::from_int(2));
        // sqrt(1.0) = 1.0 exactly
        assert_eq!(Fp::ONE.sqrt().unwrap(), Fp::ONE);
        // sqrt(0) = 0
        assert_eq!(Fp::ZERO.sqrt().unwrap(), Fp::ZERO);

        // sqrt(2) accurate to well under a millionth
        let r = Fp::TWO.sqrt().unwrap();
        assert!((r.to_f64() - std::f64::consts::SQRT_2).abs() < 1e-6);

        // Large-magnitude branch: sqrt(10^9)
        let big = Fp::from_int(1_000_000_000);
        let r = big.sqrt().unwrap();
        assert!((r.to_f64() - 31622.7766).abs() < 0.01);

        // sqrt(negative) is a domain error
        assert!(matches!(
            Fp::from_int(-1).sqrt(),
            Err(LockstepError::DomainError(_))
        ));
    }

    #[test]
    fn test_floor_ceil_round() {
        let v = Fp::from_f64(2.7);
        assert_eq!(v.floor(), Fp::from_int(2));
        assert_eq!(v.ceil(), Fp::from_int(3));
        assert_eq!(v.round(), Fp::from_int(3));

        let v = Fp::from_f64(-2.3);
        assert_eq!(v.floor(), Fp::from_int(-3));
        assert_eq!(v.ceil(), Fp::from_int(-2));
        assert_eq!(v.round(), Fp::from_int(-2));

        assert_eq!(Fp::from_f64(2.5).to_int(), 2);
        assert_eq!(Fp::from_f64(-2.5).to_int(), -3);
    }

    #[test]
    fn test_lerp() {
        let a = Fp::from_int(10);
        let b = Fp::from_int(20);
        assert_eq!(a.lerp(b, Fp::ZERO), a);
        assert_eq!(a.lerp(b, Fp::ONE), b);
        assert_eq!(a.lerp(b, Fp::HALF), Fp::from_int(15));
    }

    #[test]
    fn test_clamp_signum() {
        assert_eq!(
            Fp::from_int(7).clamp(Fp::ZERO, Fp::from_int(5)),
            Fp::from_int(5)
        );
        assert_eq!(Fp::from_int(-3).signum(), Fp::from_int(-1));
        assert_eq!(Fp::ZERO.signum(), Fp::ZERO);
        assert_eq!(Fp::from_int(-3).abs(), Fp::from_int(3));
        assert_eq!(Fp::MIN.abs(), Fp::MAX);
    }

    #[test]
    fn test_determinism() {
        let a = Fp::from_raw(123_456_789_012_345);
        let b = Fp::from_raw(987_654_321_098_765);
        for _ in 0..1000 {
            assert_eq!(a * b, a * b);
            assert_eq!(a.try_div(b).unwrap(), a.try_div(b).unwrap());
            assert_eq!(a.sqrt().unwrap(), a.sqrt().unwrap());
        }
    }

    proptest! {
        #[test]
        fn prop_add_commutative(a in any::<i64>(), b in any::<i64>()) {
            let (a, b) = (Fp::from_raw(a), Fp::from_raw(b));
            prop_assert_eq!(a + b, b + a);
        }

        #[test]
        fn prop_add_associative_in_range(
            a in -(1i64 << 60)..(1i64 << 60),
            b in -(1i64 << 60)..(1i64 << 60),
            c in -(1i64 << 60)..(1i64 << 60),
        ) {
            // Away from the saturation rails, addition associates exactly.
            let (a, b, c) = (Fp::from_raw(a), Fp::from_raw(b), Fp::from_raw(c));
            prop_assert_eq!((a + b) + c, a + (b + c));
        }

        #[test]
        fn prop_mul_commutative(a in any::<i64>(), b in any::<i64>()) {
            let (a, b) = (Fp::from_raw(a), Fp::from_raw(b));
            prop_assert_eq!(a * b, b * a);
        }

        #[test]
        fn prop_div_inverts_mul(a in -100_000i32..100_000, b in 1i32..100_000) {
            // Exact for non-overflowing integral inputs.
            let a = Fp::from_int(a);
            let b = Fp::from_int(b);
            let prod = a * b;
            prop_assert_eq!(prod.try_div(b).unwrap(), a);
        }

        #[test]
        fn prop_sqrt_is_floor_root(raw in 0i64..=i64::MAX) {
            let x = Fp::from_raw(raw);
            let r = x.sqrt().unwrap();
            // The root never overshoots: r^2 <= x in the widened domain.
            let r_wide = r.raw() as i128;
            let x_wide = (x.raw() as i128) << 32;
            prop_assert!(r_wide * r_wide <= x_wide);
        }
    }
}
