//! State Hashing for Sync Verification
//!
//! FNV-1a over little-endian field bytes. Entity hashes and the world hash
//! are built by streaming fields through `FnvHasher` in a fixed order; the
//! order is part of the determinism contract.
//!
//! This is the canonical byte-at-a-time FNV-1a. It is cheap enough to run
//! at every sync checkpoint and endian-defined because every field goes
//! through an explicit little-endian encoding first.

use crate::core::fixed::Fp;
use crate::core::vec2::FpVec2;
use crate::core::vec3::FpVec3;

/// FNV-1a 64-bit offset basis.
pub const FNV_OFFSET_BASIS: u64 = 0xCBF2_9CE4_8422_2325;

/// FNV-1a 64-bit prime.
pub const FNV_PRIME: u64 = 0x0000_0100_0000_01B3;

/// Streaming FNV-1a hasher with typed helpers for the simulation's field
/// types. Update order is critical for determinism.
#[derive(Clone, Debug)]
pub struct FnvHasher {
    state: u64,
}

impl Default for FnvHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl FnvHasher {
    /// Create a fresh hasher at the offset basis.
    #[inline]
    pub fn new() -> Self {
        Self {
            state: FNV_OFFSET_BASIS,
        }
    }

    /// Fold raw bytes into the state, one byte at a time.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        let mut h = self.state;
        for &b in bytes {
            h ^= b as u64;
            h = h.wrapping_mul(FNV_PRIME);
        }
        self.state = h;
    }

    /// Fold a u8.
    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.write_bytes(&[value]);
    }

    /// Fold a bool as one byte.
    #[inline]
    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(value as u8);
    }

    /// Fold a u32 (little-endian).
    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Fold a u64 (little-endian).
    #[inline]
    pub fn write_u64(&mut self, value: u64) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Fold an i32 (little-endian).
    #[inline]
    pub fn write_i32(&mut self, value: i32) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Fold an i64 (little-endian).
    #[inline]
    pub fn write_i64(&mut self, value: i64) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Fold a fixed-point value by its raw bits.
    #[inline]
    pub fn write_fp(&mut self, value: Fp) {
        self.write_i64(value.raw());
    }

    /// Fold a 2D vector.
    #[inline]
    pub fn write_vec2(&mut self, value: FpVec2) {
        self.write_fp(value.x);
        self.write_fp(value.y);
    }

    /// Fold a 3D vector.
    #[inline]
    pub fn write_vec3(&mut self, value: FpVec3) {
        self.write_fp(value.x);
        self.write_fp(value.y);
        self.write_fp(value.z);
    }

    /// Current hash value.
    #[inline]
    pub fn finish(&self) -> u64 {
        self.state
    }
}

/// One-shot FNV-1a over a byte slice.
#[inline]
pub fn fnv1a(bytes: &[u8]) -> u64 {
    let mut h = FnvHasher::new();
    h.write_bytes(bytes);
    h.finish()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_vectors() {
        // Canonical FNV-1a test vectors
        assert_eq!(fnv1a(b""), 0xCBF2_9CE4_8422_2325);
        assert_eq!(fnv1a(b"a"), 0xAF63_DC4C_8601_EC8C);
        assert_eq!(fnv1a(b"foobar"), 0x85944171F73967E8);
    }

    #[test]
    fn test_streaming_matches_oneshot() {
        let mut h = FnvHasher::new();
        h.write_bytes(b"foo");
        h.write_bytes(b"bar");
        assert_eq!(h.finish(), fnv1a(b"foobar"));
    }

    #[test]
    fn test_order_matters() {
        let mut a = FnvHasher::new();
        a.write_u32(1);
        a.write_u32(2);

        let mut b = FnvHasher::new();
        b.write_u32(2);
        b.write_u32(1);

        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn test_typed_writes_are_le_bytes() {
        let mut h = FnvHasher::new();
        h.write_u32(0x0403_0201);
        assert_eq!(h.finish(), fnv1a(&[1, 2, 3, 4]));

        let mut h = FnvHasher::new();
        h.write_fp(Fp::from_raw(-1));
        assert_eq!(h.finish(), fnv1a(&[0xFF; 8]));
    }

    #[test]
    fn test_determinism() {
        let make = || {
            let mut h = FnvHasher::new();
            h.write_i32(100);
            h.write_u64(12345);
            h.write_fp(Fp::from_f64(5.5));
            h.write_vec3(FpVec3::from_ints(1, 2, 3));
            h.write_bool(true);
            h.finish()
        };
        assert_eq!(make(), make());
    }
}
