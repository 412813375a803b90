//! Deterministic Trigonometry
//!
//! Pure-integer CORDIC implementations of sin/cos (rotation mode) and
//! atan2 (vectoring mode). No lookup into float-derived tables at runtime:
//! the only constants are the `atan(2^-i)` raws and the inverse CORDIC
//! gain, both fixed at compile time, so outputs are bit-identical on every
//! platform.
//!
//! Precision: sin/cos are accurate to within a few raw ulps, atan2 to
//! well under 0.001 rad - far tighter than callers need.

use crate::core::fixed::Fp;
use crate::error::Result;

/// Inverse CORDIC gain: prod(cos(atan(2^-i))) for 32 iterations, Q32.32.
const CORDIC_GAIN_INV: i64 = 2_608_131_496;

/// atan(2^-i) in Q32.32 raw form, for i = 0..32.
const ATAN_TABLE: [i64; 32] = [
    3_373_259_426, // atan(2^0)
    1_991_351_318, // atan(2^-1)
    1_052_175_346, // atan(2^-2)
    534_100_635,   // atan(2^-3)
    268_086_748,   // atan(2^-4)
    134_174_063,   // atan(2^-5)
    67_103_403,    // atan(2^-6)
    33_553_749,    // atan(2^-7)
    16_777_131,    // atan(2^-8)
    8_388_597,     // atan(2^-9)
    4_194_303,     // atan(2^-10)
    2_097_152,     // atan(2^-11)
    1_048_576,     // atan(2^-12)
    524_288,       // atan(2^-13)
    262_144,       // atan(2^-14)
    131_072,       // atan(2^-15)
    65_536,        // atan(2^-16)
    32_768,        // atan(2^-17)
    16_384,        // atan(2^-18)
    8_192,         // atan(2^-19)
    4_096,         // atan(2^-20)
    2_048,         // atan(2^-21)
    1_024,         // atan(2^-22)
    512,           // atan(2^-23)
    256,           // atan(2^-24)
    128,           // atan(2^-25)
    64,            // atan(2^-26)
    32,            // atan(2^-27)
    16,            // atan(2^-28)
    8,             // atan(2^-29)
    4,             // atan(2^-30)
    2,             // atan(2^-31)
];

/// Reduce an angle to [-π, π].
#[inline]
fn reduce_angle(angle: Fp) -> i64 {
    let mut a = angle.raw() % Fp::TWO_PI.raw();
    if a > Fp::PI.raw() {
        a -= Fp::TWO_PI.raw();
    } else if a < -Fp::PI.raw() {
        a += Fp::TWO_PI.raw();
    }
    a
}

/// CORDIC rotation of (CORDIC_GAIN_INV, 0) by `angle` ∈ [0, π/2].
///
/// Returns (cos, sin) raws, each clamped into [-1, 1].
fn cordic_rotate(angle: i64) -> (i64, i64) {
    let mut x: i64 = CORDIC_GAIN_INV;
    let mut y: i64 = 0;
    let mut z: i64 = angle;

    for (i, &step) in ATAN_TABLE.iter().enumerate() {
        if z >= 0 {
            let nx = x - (y >> i);
            let ny = y + (x >> i);
            x = nx;
            y = ny;
            z -= step;
        } else {
            let nx = x + (y >> i);
            let ny = y - (x >> i);
            x = nx;
            y = ny;
            z += step;
        }
    }

    let one = Fp::ONE.raw();
    (x.clamp(-one, one), y.clamp(-one, one))
}

/// Sine and cosine of an angle in radians, computed together.
///
/// Range-reduces to [-π, π], symmetry-reduces to [0, π/2], rotates, then
/// applies the sign flips.
pub fn sin_cos(angle: Fp) -> (Fp, Fp) {
    let mut a = reduce_angle(angle);

    let mut sin_sign = 1i64;
    if a < 0 {
        a = -a;
        sin_sign = -1;
    }

    let mut cos_sign = 1i64;
    if a > Fp::HALF_PI.raw() {
        a = Fp::PI.raw() - a;
        cos_sign = -1;
    }

    let (c, s) = cordic_rotate(a);
    (Fp::from_raw(sin_sign * s), Fp::from_raw(cos_sign * c))
}

/// Sine of an angle in radians.
#[inline]
pub fn sin(angle: Fp) -> Fp {
    sin_cos(angle).0
}

/// Cosine of an angle in radians.
#[inline]
pub fn cos(angle: Fp) -> Fp {
    sin_cos(angle).1
}

/// Tangent of an angle in radians. Returns `Fp::MAX` at the poles.
pub fn tan(angle: Fp) -> Fp {
    let (s, c) = sin_cos(angle);
    if c.is_zero() {
        return Fp::MAX;
    }
    match s.try_div(c) {
        Ok(v) => v,
        Err(_) => Fp::MAX,
    }
}

/// Four-quadrant arctangent via CORDIC vectoring, 32 iterations.
///
/// `atan2(0, 0)` is defined as 0. Result lies in (-π, π].
pub fn atan2(y: Fp, x: Fp) -> Fp {
    let mut yr = y.raw();
    let mut xr = x.raw();

    if yr == 0 {
        return if xr < 0 { Fp::PI } else { Fp::ZERO };
    }
    if xr == 0 {
        return if yr > 0 { Fp::HALF_PI } else { -Fp::HALF_PI };
    }

    // Equal right-shifts keep the ratio (and so the angle) while bringing
    // large magnitudes under the vectoring loop's overflow headroom.
    while xr.unsigned_abs() >= (1 << 60) || yr.unsigned_abs() >= (1 << 60) {
        xr >>= 1;
        yr >>= 1;
    }

    // Pre-flip into the right half-plane (rotate by π).
    let flipped = xr < 0;
    if flipped {
        xr = -xr;
        yr = -yr;
    }

    let mut z: i64 = 0;
    let mut xv = xr;
    let mut yv = yr;
    for (i, &step) in ATAN_TABLE.iter().enumerate() {
        if yv > 0 {
            let nx = xv + (yv >> i);
            let ny = yv - (xv >> i);
            xv = nx;
            yv = ny;
            z += step;
        } else {
            let nx = xv - (yv >> i);
            let ny = yv + (xv >> i);
            xv = nx;
            yv = ny;
            z -= step;
        }
    }

    if flipped {
        if z > 0 {
            z -= Fp::PI.raw();
        } else {
            z += Fp::PI.raw();
        }
    }

    Fp::from_raw(z)
}

/// Arccosine. The input is clamped to [-1, 1]; result lies in [0, π].
pub fn acos(x: Fp) -> Result<Fp> {
    let x = x.clamp(-Fp::ONE, Fp::ONE);
    let sine = (Fp::ONE - x * x).sqrt()?;
    Ok(atan2(sine, x))
}

// =============================================================================
// TESTS
// =============================================================================
