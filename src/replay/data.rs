//! Replay Data and File Container
//!
//! A replay is the session metadata plus the per-tick command log; feeding
//! it back through the same simulation reproduces the session exactly.
//!
//! ## File format
//!
//! ```text
//! magic:u32 ("RPLY")
//! version:i32 | session_id:lengthPrefixedUtf8 | recorded_at:i64 |
//! duration_ms:i64 | total_ticks:i32 | player_count:i32 |
//! tick_interval_ms:i32 | random_seed:i32
//! tick_count:i32
//! per tick: tick:i32 | cmd_count:i32 | per command: len:i32 | cmd_bytes
//! ```
//!
//! Unknown magic or a version newer than `REPLAY_CURRENT_VERSION` fails
//! without touching any engine state.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::codec::{ByteReader, ByteWriter};
use crate::error::{LockstepError, Result};
use crate::sim::command::{Command, CommandRegistry};

/// "RPLY" in a u32.
pub const REPLAY_MAGIC: u32 = 0x5250_4C59;

/// Newest container version this build reads and writes.
pub const REPLAY_CURRENT_VERSION: i32 = 1;

/// Session metadata frozen when recording stops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayMetadata {
    /// Container version.
    pub version: i32,
    /// Unique id of the recorded session.
    pub session_id: String,
    /// Wall-clock capture time, Unix milliseconds.
    pub recorded_at: i64,
    /// Session length in milliseconds.
    pub duration_ms: i64,
    /// Ticks recorded.
    pub total_ticks: i32,
    /// Players in the session.
    pub player_count: i32,
    /// Tick duration the session ran at.
    pub tick_interval_ms: i32,
    /// PRNG seed the session started from.
    pub random_seed: i32,
}

/// A recorded session: metadata plus the tick-keyed command log.
#[derive(Debug, Clone)]
pub struct ReplayData {
    /// Session metadata.
    pub metadata: ReplayMetadata,
    ticks: BTreeMap<i32, Vec<Command>>,
}

impl ReplayData {
    /// Empty log under the given metadata.
    pub fn new(metadata: ReplayMetadata) -> Self {
        Self {
            metadata,
            ticks: BTreeMap::new(),
        }
    }

    /// Store a tick's commands, replacing any previous entry for the tick
    /// (resimulated ticks overwrite their first recording).
    pub fn set_tick(&mut self, tick: i32, commands: Vec<Command>) {
        self.ticks.insert(tick, commands);
    }

    /// Commands recorded at a tick.
    pub fn commands_at(&self, tick: i32) -> Option<&[Command]> {
        self.ticks.get(&tick).map(|v| v.as_slice())
    }

    /// Recorded ticks in ascending order.
    pub fn entries(&self) -> impl Iterator<Item = (i32, &[Command])> {
        self.ticks.iter().map(|(t, c)| (*t, c.as_slice()))
    }

    /// Number of recorded ticks.
    pub fn tick_count(&self) -> usize {
        self.ticks.len()
    }

    /// First recorded tick.
    pub fn first_tick(&self) -> Option<i32> {
        self.ticks.keys().next().copied()
    }

    /// Last recorded tick.
    pub fn last_tick(&self) -> Option<i32> {
        self.ticks.keys().next_back().copied()
    }

    /// Append the container encoding.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        let mut w = ByteWriter::new(buf);
        w.write_u32(REPLAY_MAGIC);
        w.write_i32(self.metadata.version);
        w.write_string(&self.metadata.session_id);
        w.write_i64(self.metadata.recorded_at);
        w.write_i64(self.metadata.duration_ms);
        w.write_i32(self.metadata.total_ticks);
        w.write_i32(self.metadata.player_count);
        w.write_i32(self.metadata.tick_interval_ms);
        w.write_i32(self.metadata.random_seed);

        w.write_i32(self.ticks.len() as i32);
        let mut cmd_buf: Vec<u8> = Vec::with_capacity(64);
        for (tick, commands) in &self.ticks {
            w.write_i32(*tick);
            w.write_i32(commands.len() as i32);
            for cmd in commands {
                cmd_buf.clear();
                cmd.serialize(&mut ByteWriter::new(&mut cmd_buf));
                w.write_i32(cmd_buf.len() as i32);
                w.write_bytes(&cmd_buf);
            }
        }
    }

    /// Decode a container, resolving command kinds through the registry.
    pub fn decode(bytes: &[u8], registry: &CommandRegistry) -> Result<Self> {
        let mut r = ByteReader::new(bytes);

        let magic = r.read_u32()?;
        if magic != REPLAY_MAGIC {
            return Err(LockstepError::InvalidReplayFormat(format!(
                "bad magic {magic:#010x}"
            )));
        }

        let version = r.read_i32()?;
        if version > REPLAY_CURRENT_VERSION {
            return Err(LockstepError::UnsupportedReplay {
                found: version,
                supported: REPLAY_CURRENT_VERSION,
            });
        }
        if version < 1 {
            return Err(LockstepError::InvalidReplayFormat(format!(
                "bad version {version}"
            )));
        }

        let metadata = ReplayMetadata {
            version,
            session_id: r.read_string()?,
            recorded_at: r.read_i64()?,
            duration_ms: r.read_i64()?,
            total_ticks: r.read_i32()?,
            player_count: r.read_i32()?,
            tick_interval_ms: r.read_i32()?,
            random_seed: r.read_i32()?,
        };

        let tick_count = r.read_count()?;
        let mut ticks = BTreeMap::new();
        for _ in 0..tick_count {
            let tick = r.read_i32()?;
            let cmd_count = r.read_count()?;
            let mut commands = Vec::with_capacity(cmd_count);
            for _ in 0..cmd_count {
                let len = r.read_count()?;
                let cmd_bytes = r.read_bytes(len)?;
                commands.push(registry.deserialize(cmd_bytes)?);
            }
            ticks.insert(tick, commands);
        }

        Ok(Self { metadata, ticks })
    }

    /// Write the container to disk.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        std::fs::write(path.as_ref(), &buf)?;
        info!(
            path = %path.as_ref().display(),
            ticks = self.ticks.len(),
            bytes = buf.len(),
            "replay saved"
        );
        Ok(())
    }

    /// Read a container from disk.
    pub fn load_from_file<P: AsRef<Path>>(path: P, registry: &CommandRegistry) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let data = Self::decode(&bytes, registry)?;
        info!(
            path = %path.as_ref().display(),
            session = %data.metadata.session_id,
            ticks = data.tick_count(),
            "replay loaded"
        );
        Ok(data)
    }
}

// =============================================================================
// TESTS
// =============================================================================
