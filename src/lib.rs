//! # Lockstep Core
//!
//! Deterministic lockstep networking core for real-time multiplayer games:
//! peers exchange player inputs (never world state) on a discrete tick
//! clock, and every peer runs a bit-for-bit identical simulation.
//! Identical command sequences yield identical world states everywhere -
//! that guarantee is the entire product.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       LOCKSTEP CORE                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── fixed.rs    - Q32.32 fixed-point arithmetic             │
//! │  ├── trig.rs     - CORDIC sin/cos/atan2 (pure integer)       │
//! │  ├── vec2.rs     - 2D fixed-point vector                     │
//! │  ├── vec3.rs     - 3D fixed-point vector                     │
//! │  ├── rng.rs      - Deterministic xorshift128+ PRNG           │
//! │  ├── hash.rs     - FNV-1a state hashing                      │
//! │  └── codec.rs    - Little-endian byte codec                  │
//! │                                                              │
//! │  sim/            - Simulation layer (deterministic)          │
//! │  ├── command.rs  - Typed player inputs + registry            │
//! │  ├── input_buffer.rs - (tick, player) -> command store       │
//! │  ├── predictor.rs    - Last-value input prediction           │
//! │  ├── entity.rs   - Syncable entities + factory               │
//! │  ├── world.rs    - Entity set, snapshots, world hash         │
//! │  ├── snapshot.rs - Bounded snapshot ring                     │
//! │  └── simulation.rs - The tick machine                        │
//! │                                                              │
//! │  engine/         - Lockstep engine                           │
//! │  └── lockstep.rs - Clock, gate, predict, rollback, sync      │
//! │                                                              │
//! │  net/            - Command plane (non-deterministic zone)    │
//! │  ├── transport.rs - Transport capability + in-memory hub     │
//! │  ├── messages.rs  - Wire message catalogue                   │
//! │  └── service.rs   - Rooms, players, sync hashes, RTT         │
//! │                                                              │
//! │  replay/         - Record & playback                         │
//! │  ├── data.rs     - Command log + file container              │
//! │  ├── recorder.rs - Deep-copy capture                         │
//! │  └── player.rs   - Paced playback, seeking                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `sim/` modules are 100% deterministic:
//! - No floating point in simulation, hashing or PRNG paths
//! - No HashMap (BTreeMap everywhere, for sorted iteration)
//! - No system time inside the determinism boundary
//! - All randomness from the seeded xorshift128+ PRNG
//!
//! Given an identical seed and identical command sequences, the simulation
//! produces identical snapshot bytes and state hashes on any platform.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod engine;
pub mod error;
pub mod net;
pub mod replay;
pub mod sim;

// Re-export commonly used types
pub use crate::core::fixed::Fp;
pub use crate::core::rng::DeterministicRng;
pub use crate::core::vec2::FpVec2;
pub use crate::core::vec3::FpVec3;
pub use crate::engine::config::LockstepConfig;
pub use crate::engine::events::{EngineEvent, EngineState};
pub use crate::engine::lockstep::LockstepEngine;
pub use crate::error::{LockstepError, Result};
pub use crate::net::service::NetworkService;
pub use crate::net::transport::{MemoryHub, Transport};
pub use crate::replay::player::ReplaySpeed;
pub use crate::sim::command::{Command, CommandRegistry};
pub use crate::sim::simulation::Simulation;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tick rate implied by the default 50 ms interval (Hz).
pub const DEFAULT_TICK_RATE: u32 = 20;
