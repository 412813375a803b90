//! Fixed-Point 2D Vector
//!
//! Deterministic 2D vector operations. All arithmetic is fixed-point; the
//! squared-length and dot products sum their widened products *before* the
//! renormalization shift, so intermediate overflow cannot corrupt low bits.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::core::fixed::{div_raw, saturate, Fp, FIXED_SHIFT};
use crate::core::trig::acos;
use crate::error::{LockstepError, Result};

/// 2D vector with Q32.32 components.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FpVec2 {
    /// X component.
    pub x: Fp,
    /// Y component.
    pub y: Fp,
}

impl FpVec2 {
    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fp::ZERO,
        y: Fp::ZERO,
    };

    /// Unit vector pointing right (+X).
    pub const RIGHT: Self = Self {
        x: Fp::ONE,
        y: Fp::ZERO,
    };

    /// Unit vector pointing up (+Y).
    pub const UP: Self = Self {
        x: Fp::ZERO,
        y: Fp::ONE,
    };

    /// Create a new vector.
    #[inline]
    pub const fn new(x: Fp, y: Fp) -> Self {
        Self { x, y }
    }

    /// Create a vector from integer components.
    #[inline]
    pub const fn from_ints(x: i32, y: i32) -> Self {
        Self {
            x: Fp::from_int(x),
            y: Fp::from_int(y),
        }
    }

    /// Scale by a fixed-point scalar.
    #[inline]
    pub fn scale(self, scalar: Fp) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }

    /// Componentwise division by a scalar, failing on zero.
    #[inline]
    pub fn try_div_scalar(self, scalar: Fp) -> Result<Self> {
        if scalar.is_zero() {
            return Err(LockstepError::DivideByZero);
        }
        Ok(Self {
            x: Fp::from_raw(div_raw(self.x.raw(), scalar.raw())),
            y: Fp::from_raw(div_raw(self.y.raw(), scalar.raw())),
        })
    }

    /// Squared length. The x²+y² sum happens in the widened domain.
    #[inline]
    pub fn sqr_magnitude(self) -> Fp {
        let x = self.x.raw() as i128;
        let y = self.y.raw() as i128;
        Fp::from_raw(saturate((x * x + y * y) >> FIXED_SHIFT))
    }

    /// Length. Prefer `sqr_magnitude` for comparisons.
    #[inline]
    pub fn magnitude(self) -> Fp {
        // sqr_magnitude is non-negative by construction
        self.sqr_magnitude().sqrt().unwrap_or(Fp::ZERO)
    }

    /// Squared distance to another point.
    #[inline]
    pub fn sqr_distance(self, other: Self) -> Fp {
        (other - self).sqr_magnitude()
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(self, other: Self) -> Fp {
        (other - self).magnitude()
    }

    /// Dot product, summed in the widened domain.
    #[inline]
    pub fn dot(self, other: Self) -> Fp {
        let a = (self.x.raw() as i128) * (other.x.raw() as i128);
        let b = (self.y.raw() as i128) * (other.y.raw() as i128);
        Fp::from_raw(saturate((a + b) >> FIXED_SHIFT))
    }

    /// 2D cross product (scalar z component). Positive when `other` is
    /// counter-clockwise from self.
    #[inline]
    pub fn cross(self, other: Self) -> Fp {
        let a = (self.x.raw() as i128) * (other.y.raw() as i128);
        let b = (self.y.raw() as i128) * (other.x.raw() as i128);
        Fp::from_raw(saturate((a - b) >> FIXED_SHIFT))
    }

    /// Normalize to unit length. Returns ZERO for the zero vector.
    #[inline]
    pub fn normalized(self) -> Self {
        let len = self.magnitude();
        if len.is_zero() {
            return Self::ZERO;
        }
        Self {
            x: Fp::from_raw(div_raw(self.x.raw(), len.raw())),
            y: Fp::from_raw(div_raw(self.y.raw(), len.raw())),
        }
    }

    /// Linear interpolation. t = 0 returns self, t = 1 returns other.
    #[inline]
    pub fn lerp(self, other: Self, t: Fp) -> Self {
        Self {
            x: self.x.lerp(other.x, t),
            y: self.y.lerp(other.y, t),
        }
    }

    /// Step toward `target` by at most `max_delta`, landing exactly on the
    /// target once within range.
    pub fn move_towards(self, target: Self, max_delta: Fp) -> Self {
        let delta = target - self;
        let dist = delta.magnitude();
        if dist.is_zero() || dist <= max_delta {
            return target;
        }
        let t = Fp::from_raw(div_raw(max_delta.raw(), dist.raw()));
        self + delta.scale(t)
    }

    /// Unsigned angle between two vectors, in radians [0, π].
    /// Zero-length operands give zero.
    pub fn angle(self, other: Self) -> Fp {
        let denom = self.magnitude() * other.magnitude();
        if denom.is_zero() {
            return Fp::ZERO;
        }
        let cos = Fp::from_raw(div_raw(self.dot(other).raw(), denom.raw()));
        acos(cos).unwrap_or(Fp::ZERO)
    }

    /// Clamp the vector's length to at most `max`.
    pub fn clamp_magnitude(self, max: Fp) -> Self {
        let len = self.magnitude();
        if len <= max || len.is_zero() {
            return self;
        }
        let t = Fp::from_raw(div_raw(max.raw(), len.raw()));
        self.scale(t)
    }

    /// Reflect off the plane with the given (unit) normal: v - 2(v·n)n.
    pub fn reflect(self, normal: Self) -> Self {
        let d = self.dot(normal);
        self - normal.scale(d * Fp::TWO)
    }

    /// Project onto another vector. Zero `on` gives ZERO.
    pub fn project(self, on: Self) -> Self {
        let denom = on.dot(on);
        if denom.is_zero() {
            return Self::ZERO;
        }
        let t = Fp::from_raw(div_raw(self.dot(on).raw(), denom.raw()));
        on.scale(t)
    }

    /// Rotate 90 degrees counter-clockwise.
    #[inline]
    pub fn perpendicular(self) -> Self {
        Self {
            x: -self.y,
            y: self.x,
        }
    }

    /// Convert to a float tuple for rendering.
    #[inline]
    pub fn to_f64s(self) -> (f64, f64) {
        (self.x.to_f64(), self.y.to_f64())
    }
}

impl Add for FpVec2 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl AddAssign for FpVec2 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for FpVec2 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl SubAssign for FpVec2 {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul<Fp> for FpVec2 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Fp) -> Self {
        self.scale(rhs)
    }
}

impl Neg for FpVec2 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }
}

impl fmt::Debug for FpVec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (fx, fy) = self.to_f64s();
        write!(f, "Vec2({:.3}, {:.3})", fx, fy)
    }
}

impl fmt::Display for FpVec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (fx, fy) = self.to_f64s();
        write!(f, "({:.3}, {:.3})", fx, fy)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(FpVec2::ZERO.x, Fp::ZERO);
        assert_eq!(FpVec2::RIGHT.x, Fp::ONE);
        assert_eq!(FpVec2::UP.y, Fp::ONE);
    }

    #[test]
    fn test_add_sub() {
        let a = FpVec2::from_ints(3, 4);
        let b = FpVec2::from_ints(1, 2);
        assert_eq!(a + b, FpVec2::from_ints(4, 6));
        assert_eq!(a - b, FpVec2::from_ints(2, 2));
        assert_eq!(-a, FpVec2::from_ints(-3, -4));
    }

    #[test]
    fn test_scale_div() {
        let v = FpVec2::from_ints(2, 3);
        assert_eq!(v.scale(Fp::TWO), FpVec2::from_ints(4, 6));
        assert_eq!(
            v.try_div_scalar(Fp::TWO).unwrap(),
            FpVec2::new(Fp::ONE, Fp::from_ratio(3, 2))
        );
        assert!(v.try_div_scalar(Fp::ZERO).is_err());
    }

    #[test]
    fn test_magnitude() {
        // 3-4-5 triangle
        let v = FpVec2::from_ints(3, 4);
        assert_eq!(v.sqr_magnitude(), Fp::from_int(25));
        assert_eq!(v.magnitude(), Fp::from_int(5));
    }

    #[test]
    fn test_sqr_magnitude_saturates_not_wraps() {
        let v = FpVec2::new(Fp::MAX, Fp::MAX);
        assert_eq!(v.sqr_magnitude(), Fp::MAX);
    }

    #[test]
    fn test_dot_cross() {
        let a = FpVec2::from_ints(2, 3);
        let b = FpVec2::from_ints(4, 5);
        // 2*4 + 3*5 = 23
        assert_eq!(a.dot(b), Fp::from_int(23));
        // 2*5 - 3*4 = -2
        assert_eq!(a.cross(b), Fp::from_int(-2));
        // Max-magnitude dot saturates
        let m = FpVec2::new(Fp::MAX, Fp::MAX);
        assert_eq!(m.dot(m), Fp::MAX);
    }

    #[test]
    fn test_normalized() {
        let v = FpVec2::from_ints(3, 4);
        let n = v.normalized();
        assert!((n.magnitude() - Fp::ONE).abs() < Fp::from_raw(1 << 16));
        assert_eq!(FpVec2::ZERO.normalized(), FpVec2::ZERO);
    }

    #[test]
    fn test_lerp() {
        let a = FpVec2::from_ints(0, 0);
        let b = FpVec2::from_ints(10, 20);
        assert_eq!(a.lerp(b, Fp::ZERO), a);
        assert_eq!(a.lerp(b, Fp::ONE), b);
        assert_eq!(a.lerp(b, Fp::HALF), FpVec2::from_ints(5, 10));
    }

    #[test]
    fn test_move_towards() {
        let from = FpVec2::ZERO;
        let to = FpVec2::from_ints(10, 0);

        // Step shorter than the distance
        let step = from.move_towards(to, Fp::from_int(3));
        assert_eq!(step, FpVec2::from_ints(3, 0));

        // Step past the target lands exactly on it
        let arrive = from.move_towards(to, Fp::from_int(50));
        assert_eq!(arrive, to);

        // Already there
        assert_eq!(to.move_towards(to, Fp::ONE), to);
    }

    #[test]
    fn test_angle() {
        let right = FpVec2::RIGHT;
        let up = FpVec2::UP;
        let a = right.angle(up);
        assert!((a.to_f64() - std::f64::consts::FRAC_PI_2).abs() < 0.001);
        assert_eq!(right.angle(FpVec2::ZERO), Fp::ZERO);
    }

    #[test]
    fn test_clamp_magnitude() {
        let v = FpVec2::from_ints(6, 8); // length 10
        let clamped = v.clamp_magnitude(Fp::from_int(5));
        assert!((clamped.magnitude() - Fp::from_int(5)).abs() < Fp::from_raw(1 << 16));
        // Already short enough - untouched
        assert_eq!(v.clamp_magnitude(Fp::from_int(100)), v);
    }

    #[test]
    fn test_reflect() {
        // Bounce (1, -1) off the floor (normal +Y) -> (1, 1)
        let v = FpVec2::new(Fp::ONE, -Fp::ONE);
        let r = v.reflect(FpVec2::UP);
        assert_eq!(r, FpVec2::new(Fp::ONE, Fp::ONE));
    }

    #[test]
    fn test_project() {
        let v = FpVec2::from_ints(3, 4);
        let p = v.project(FpVec2::RIGHT);
        assert_eq!(p, FpVec2::from_ints(3, 0));
        assert_eq!(v.project(FpVec2::ZERO), FpVec2::ZERO);
    }

    #[test]
    fn test_determinism() {
        let a = FpVec2::new(Fp::from_raw(12_345_678_901), Fp::from_raw(-87_654_321_098));
        let b = FpVec2::new(Fp::from_raw(11_111_111_111), Fp::from_raw(22_222_222_222));
        for _ in 0..1000 {
            assert_eq!(a + b, a + b);
            assert_eq!(a.dot(b), a.dot(b));
            assert_eq!(a.magnitude(), a.magnitude());
            assert_eq!(a.normalized(), a.normalized());
        }
    }
}
