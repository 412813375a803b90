//! Deterministic primitives: fixed-point arithmetic, trigonometry, vectors,
//! PRNG, hashing and the little-endian byte codec.
//!
//! Nothing in this module touches floating point on a simulation path, and
//! nothing here depends on platform behavior. These are the only numeric
//! tools the simulation layers are allowed to use.

pub mod codec;
pub mod fixed;
pub mod hash;
pub mod rng;
pub mod trig;
pub mod vec2;
pub mod vec3;
