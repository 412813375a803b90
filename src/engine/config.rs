//! Engine Configuration

use serde::{Deserialize, Serialize};

/// Lockstep engine tuning. The host sets these before `start`; the
/// session's authoritative values arrive with GameStart and override the
/// interval and input delay on every peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockstepConfig {
    /// Tick duration in milliseconds.
    pub tick_interval_ms: u32,
    /// Forward offset applied to locally issued commands, in ticks.
    pub input_delay_ticks: u32,
    /// How far back a rollback may reach, in ticks.
    pub max_rollback_ticks: u32,
    /// Ticks between state-hash checkpoints.
    pub sync_check_interval: u32,
    /// Advance through missing inputs with predictions instead of pausing.
    pub use_prediction: bool,
}

impl Default for LockstepConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 50,
            input_delay_ticks: 2,
            max_rollback_ticks: 10,
            sync_check_interval: 30,
            use_prediction: true,
        }
    }
}
