//! Replay Recorder
//!
//! Captures the command log of a live session. Recorded commands are deep
//! copies made through the registry's serialize/deserialize path, so the
//! log shares no storage with the live buffers. Ticks are keyed, not
//! appended: a resimulated tick overwrites its earlier recording.

use tracing::{debug, warn};
use uuid::Uuid;

use crate::replay::data::{ReplayData, ReplayMetadata, REPLAY_CURRENT_VERSION};
use crate::sim::command::{Command, CommandRegistry};

/// Records confirmed ticks into a `ReplayData`.
#[derive(Debug)]
pub struct ReplayRecorder {
    data: ReplayData,
    recording: bool,
}

impl ReplayRecorder {
    /// Open a recording for a session.
    pub fn start(player_count: usize, tick_interval_ms: u32, seed: i32) -> Self {
        let metadata = ReplayMetadata {
            version: REPLAY_CURRENT_VERSION,
            session_id: Uuid::new_v4().to_string(),
            recorded_at: chrono::Utc::now().timestamp_millis(),
            duration_ms: 0,
            total_ticks: 0,
            player_count: player_count as i32,
            tick_interval_ms: tick_interval_ms as i32,
            random_seed: seed,
        };
        debug!(session = %metadata.session_id, "replay recording started");
        Self {
            data: ReplayData::new(metadata),
            recording: true,
        }
    }

    /// Record a tick's commands (deep copies). No-op once stopped.
    pub fn record_tick(&mut self, tick: i32, commands: &[Command], registry: &CommandRegistry) {
        if !self.recording {
            return;
        }
        let mut copies = Vec::with_capacity(commands.len());
        for cmd in commands {
            match registry.deep_copy(cmd) {
                Ok(copy) => copies.push(copy),
                Err(err) => {
                    // A command that entered the buffer always has a
                    // registered kind; failing here means the registry
                    // changed mid-session.
                    warn!(tick, kind = cmd.kind, %err, "skipping unrecordable command");
                }
            }
        }
        self.data.set_tick(tick, copies);
    }

    /// Freeze the metadata. Further `record_tick` calls are ignored.
    pub fn stop(&mut self, total_ticks: i32) {
        if !self.recording {
            return;
        }
        self.recording = false;
        self.data.metadata.total_ticks = total_ticks;
        self.data.metadata.duration_ms =
            total_ticks as i64 * self.data.metadata.tick_interval_ms as i64;
        debug!(
            session = %self.data.metadata.session_id,
            total_ticks,
            "replay recording stopped"
        );
    }

    /// True while accepting ticks.
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// The recorded data so far.
    pub fn data(&self) -> &ReplayData {
        &self.data
    }

    /// Consume the recorder, yielding the recorded data.
    pub fn into_data(self) -> ReplayData {
        self.data
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vec3::FpVec3;

    #[test]
    fn test_record_and_stop() {
        let registry = CommandRegistry::with_builtins();
        let mut rec = ReplayRecorder::start(2, 50, 12345);
        assert!(rec.is_recording());

        for t in 0..10 {
            let commands = vec![
                Command::move_to(0, t, FpVec3::from_ints(t, 0, 0)),
                Command::empty(1, t),
            ];
            rec.record_tick(t, &commands, &registry);
        }
        rec.stop(10);

        assert!(!rec.is_recording());
        let data = rec.data();
        assert_eq!(data.tick_count(), 10);
        assert_eq!(data.metadata.total_ticks, 10);
        assert_eq!(data.metadata.duration_ms, 500);
        assert_eq!(data.metadata.player_count, 2);
        assert_eq!(data.metadata.random_seed, 12345);
        assert!(!data.metadata.session_id.is_empty());
    }

    #[test]
    fn test_commands_are_deep_copies() {
        let registry = CommandRegistry::with_builtins();
        let mut rec = ReplayRecorder::start(1, 50, 0);
        let cmd = Command::move_to(0, 0, FpVec3::from_ints(5, 0, 5));
        rec.record_tick(0, std::slice::from_ref(&cmd), &registry);

        let recorded = &rec.data().commands_at(0).unwrap()[0];
        assert_eq!(recorded, &cmd);
    }

    #[test]
    fn test_resimulated_tick_overwrites() {
        let registry = CommandRegistry::with_builtins();
        let mut rec = ReplayRecorder::start(1, 50, 0);

        rec.record_tick(4, &[Command::empty(0, 4)], &registry);
        // Rollback replaces the predicted recording with the real one
        rec.record_tick(
            4,
            &[Command::action(0, 4, 1, -1, FpVec3::ZERO)],
            &registry,
        );

        assert_eq!(rec.data().tick_count(), 1);
        assert_eq!(rec.data().commands_at(4).unwrap()[0].kind, 2);
    }

    #[test]
    fn test_no_recording_after_stop() {
        let registry = CommandRegistry::with_builtins();
        let mut rec = ReplayRecorder::start(1, 50, 0);
        rec.record_tick(0, &[Command::empty(0, 0)], &registry);
        rec.stop(1);
        rec.record_tick(1, &[Command::empty(0, 1)], &registry);
        assert_eq!(rec.data().tick_count(), 1);
    }
}
