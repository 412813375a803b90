//! Fixed-Point 3D Vector
//!
//! Same discipline as the 2D type: widened sums before the renormalization
//! shift, saturation instead of wrap, typed errors where a value cannot be
//! produced.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::core::fixed::{div_raw, saturate, Fp, FIXED_SHIFT};
use crate::core::trig::acos;
use crate::error::{LockstepError, Result};

/// 3D vector with Q32.32 components.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FpVec3 {
    /// X component.
    pub x: Fp,
    /// Y component.
    pub y: Fp,
    /// Z component.
    pub z: Fp,
}

impl FpVec3 {
    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fp::ZERO,
        y: Fp::ZERO,
        z: Fp::ZERO,
    };

    /// All components one.
    pub const ONE: Self = Self {
        x: Fp::ONE,
        y: Fp::ONE,
        z: Fp::ONE,
    };

    /// Unit vector +X.
    pub const RIGHT: Self = Self {
        x: Fp::ONE,
        y: Fp::ZERO,
        z: Fp::ZERO,
    };

    /// Unit vector +Y.
    pub const UP: Self = Self {
        x: Fp::ZERO,
        y: Fp::ONE,
        z: Fp::ZERO,
    };

    /// Unit vector +Z.
    pub const FORWARD: Self = Self {
        x: Fp::ZERO,
        y: Fp::ZERO,
        z: Fp::ONE,
    };

    /// Create a new vector.
    #[inline]
    pub const fn new(x: Fp, y: Fp, z: Fp) -> Self {
        Self { x, y, z }
    }

    /// Create a vector from integer components.
    #[inline]
    pub const fn from_ints(x: i32, y: i32, z: i32) -> Self {
        Self {
            x: Fp::from_int(x),
            y: Fp::from_int(y),
            z: Fp::from_int(z),
        }
    }

    /// Create a vector from raw Q32.32 components.
    #[inline]
    pub const fn from_raws(x: i64, y: i64, z: i64) -> Self {
        Self {
            x: Fp::from_raw(x),
            y: Fp::from_raw(y),
            z: Fp::from_raw(z),
        }
    }

    /// Scale by a fixed-point scalar.
    #[inline]
    pub fn scale(self, scalar: Fp) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
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
            z: Fp::from_raw(div_raw(self.z.raw(), scalar.raw())),
        })
    }

    /// Squared length. x²+y²+z² summed in the widened domain.
    #[inline]
    pub fn sqr_magnitude(self) -> Fp {
        let x = self.x.raw() as i128;
        let y = self.y.raw() as i128;
        let z = self.z.raw() as i128;
        Fp::from_raw(saturate((x * x + y * y + z * z) >> FIXED_SHIFT))
    }

    /// Length. Prefer `sqr_magnitude` for comparisons.
    #[inline]
    pub fn magnitude(self) -> Fp {
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
        let c = (self.z.raw() as i128) * (other.z.raw() as i128);
        Fp::from_raw(saturate((a + b + c) >> FIXED_SHIFT))
    }

    /// Cross product.
    #[inline]
    pub fn cross(self, other: Self) -> Self {
        let cx = (self.y.raw() as i128) * (other.z.raw() as i128)
            - (self.z.raw() as i128) * (other.y.raw() as i128);
        let cy = (self.z.raw() as i128) * (other.x.raw() as i128)
            - (self.x.raw() as i128) * (other.z.raw() as i128);
        let cz = (self.x.raw() as i128) * (other.y.raw() as i128)
            - (self.y.raw() as i128) * (other.x.raw() as i128);
        Self {
            x: Fp::from_raw(saturate(cx >> FIXED_SHIFT)),
            y: Fp::from_raw(saturate(cy >> FIXED_SHIFT)),
            z: Fp::from_raw(saturate(cz >> FIXED_SHIFT)),
        }
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
            z: Fp::from_raw(div_raw(self.z.raw(), len.raw())),
        }
    }

    /// Linear interpolation. t = 0 returns self, t = 1 returns other.
    #[inline]
    pub fn lerp(self, other: Self, t: Fp) -> Self {
        Self {
            x: self.x.lerp(other.x, t),
            y: self.y.lerp(other.y, t),
            z: self.z.lerp(other.z, t),
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

    /// Convert to a float tuple for rendering.
    #[inline]
    pub fn to_f64s(self) -> (f64, f64, f64) {
        (self.x.to_f64(), self.y.to_f64(), self.z.to_f64())
    }
}

impl Add for FpVec3 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl AddAssign for FpVec3 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for FpVec3 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl SubAssign for FpVec3 {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul<Fp> for FpVec3 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Fp) -> Self {
        self.scale(rhs)
    }
}

impl Neg for FpVec3 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

impl fmt::Debug for FpVec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (fx, fy, fz) = self.to_f64s();
        write!(f, "Vec3({:.3}, {:.3}, {:.3})", fx, fy, fz)
    }
}

impl fmt::Display for FpVec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (fx, fy, fz) = self.to_f64s();
        write!(f, "({:.3}, {:.3}, {:.3})", fx, fy, fz)
    }
}

// =============================================================================
// TESTS
// =============================================================================
