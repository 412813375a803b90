//! Replay subsystem: command-log capture, the versioned file container and
//! the playback driver that reproduces a session through the same
//! simulation.

pub mod data;
pub mod player;
pub mod recorder;
