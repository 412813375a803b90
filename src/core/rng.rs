//! Deterministic Random Number Generator
//!
//! Xorshift128+ with SplitMix64 seeding. Given the same seed, the sequence
//! is identical on every platform (x86, ARM, WASM); all derived draws go
//! through `next_u64` and fixed-point arithmetic only.

use serde::{Deserialize, Serialize};

use crate::core::fixed::Fp;
use crate::core::trig::sin_cos;
use crate::core::vec2::FpVec2;
use crate::core::vec3::FpVec3;

/// Deterministic PRNG using the xorshift128+ algorithm.
///
/// # Determinism Guarantee
///
/// The step function is a pure function of the two state words. State can
/// be saved and restored byte-exactly, which replay and checkpointing rely
/// on.
///
/// # Example
///
/// ```
/// use lockstep::core::rng::DeterministicRng;
///
/// let mut rng = DeterministicRng::new(12345);
/// assert_eq!(rng.next_u64(), 6233086606872742541); // Always the same!
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Create a new RNG from a 32-bit seed.
    ///
    /// SplitMix64 expands the seed into the state pair, giving good
    /// distribution even from small sequential seeds.
    pub fn new(seed: u32) -> Self {
        let mut s = seed as u64;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // All-zero state would be a fixed point of the step function
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Restore an RNG from a saved state pair.
    pub fn from_state(state: [u64; 2]) -> Self {
        Self { state }
    }

    /// Generate the next 64-bit value (xorshift128+ step).
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let mut s1 = self.state[0];
        let s0 = self.state[1];
        let result = s0.wrapping_add(s1);

        self.state[0] = s0;
        s1 ^= s1 << 23;
        self.state[1] = s1 ^ s0 ^ (s1 >> 18) ^ (s0 >> 5);

        result
    }

    /// Generate a random i32 over the full range.
    #[inline]
    pub fn next_int(&mut self) -> i32 {
        self.next_u64() as i32
    }

    /// Generate a random integer in the half-open range [min, max).
    /// Returns `min` when `max <= min`.
    #[inline]
    pub fn next_int_range(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        let span = (max as i64 - min as i64) as u64;
        (min as i64 + (self.next_u64() % span) as i64) as i32
    }

    /// Generate a random boolean.
    #[inline]
    pub fn next_bool(&mut self) -> bool {
        self.next_u64() & 1 == 1
    }

    /// Generate true with the given percent probability (0..=100).
    #[inline]
    pub fn next_chance(&mut self, pct: u32) -> bool {
        (self.next_int_range(0, 100) as u32) < pct
    }

    /// Generate a random fixed-point value in [0, 1).
    ///
    /// The low 32 bits of the draw become the fractional raw directly.
    #[inline]
    pub fn next_fp(&mut self) -> Fp {
        Fp::from_raw((self.next_u64() & 0xFFFF_FFFF) as i64)
    }

    /// Pick an index with probability proportional to its weight.
    /// Returns `None` for an empty or all-zero weight list.
    pub fn next_weighted(&mut self, weights: &[u32]) -> Option<usize> {
        let total: u64 = weights.iter().map(|&w| w as u64).sum();
        if total == 0 {
            return None;
        }
        let mut r = self.next_u64() % total;
        for (i, &w) in weights.iter().enumerate() {
            let w = w as u64;
            if r < w {
                return Some(i);
            }
            r -= w;
        }
        // Unreachable: r < total = sum of weights
        Some(weights.len() - 1)
    }

    /// Uniform point inside the unit circle, by rejection sampling of the
    /// enclosing square.
    pub fn inside_unit_circle(&mut self) -> FpVec2 {
        loop {
            let x = self.next_fp() * Fp::TWO - Fp::ONE;
            let y = self.next_fp() * Fp::TWO - Fp::ONE;
            let v = FpVec2::new(x, y);
            if v.sqr_magnitude() <= Fp::ONE {
                return v;
            }
        }
    }

    /// Uniform point inside the unit sphere, by rejection sampling of the
    /// enclosing cube.
    pub fn inside_unit_sphere(&mut self) -> FpVec3 {
        loop {
            let x = self.next_fp() * Fp::TWO - Fp::ONE;
            let y = self.next_fp() * Fp::TWO - Fp::ONE;
            let z = self.next_fp() * Fp::TWO - Fp::ONE;
            let v = FpVec3::new(x, y, z);
            if v.sqr_magnitude() <= Fp::ONE {
                return v;
            }
        }
    }

    /// Random unit-length 2D direction (rejection sample, then normalize).
    pub fn direction2d(&mut self) -> FpVec2 {
        loop {
            let v = self.inside_unit_circle();
            if !v.sqr_magnitude().is_zero() {
                return v.normalized();
            }
        }
    }

    /// Random unit-length 3D direction, uniform on the sphere.
    ///
    /// Samples z in [-1, 1] and an azimuth θ in [0, 2π); the slice radius
    /// sin(φ) = sqrt(1 − z²) makes the distribution area-uniform.
    pub fn direction3d(&mut self) -> FpVec3 {
        let z = self.next_fp() * Fp::TWO - Fp::ONE;
        let theta = self.next_fp() * Fp::TWO_PI;
        let sin_phi = (Fp::ONE - z * z).sqrt().unwrap_or(Fp::ZERO);
        let (sin_t, cos_t) = sin_cos(theta);
        FpVec3::new(sin_phi * cos_t, sin_phi * sin_t, z)
    }

    /// Shuffle a slice in place using Fisher-Yates.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.next_int_range(0, (i + 1) as i32) as usize;
            slice.swap(i, j);
        }
    }

    /// Select a random element from a slice.
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        if slice.is_empty() {
            None
        } else {
            let idx = self.next_int_range(0, slice.len() as i32) as usize;
            Some(&slice[idx])
        }
    }

    /// Get current state (for checkpointing).
    pub fn state(&self) -> [u64; 2] {
        self.state
    }

    /// Restore from a saved state.
    pub fn set_state(&mut self, state: [u64; 2]) {
        self.state = state;
    }
}

/// SplitMix64 for seed expansion.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

// =============================================================================
// TESTS
// =============================================================================
