//! Networking layer: the transport capability, the command-plane wire
//! messages and the broker service that routes them to the engine.
//!
//! Everything here lives outside the determinism boundary - timestamps and
//! RTT measurements are allowed, simulation state is not.

pub mod messages;
pub mod service;
pub mod transport;
