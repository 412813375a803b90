//! Engine States and Observability Events
//!
//! Events are a drained queue rather than callbacks: the engine pushes at
//! defined points between simulation steps, the host drains after each
//! update. Push order preserves the ordering guarantees (TickExecuted for
//! T precedes any simulation work for T+1).

/// Engine lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Constructed, not started.
    Idle,
    /// Started, waiting for the game-start signal.
    WaitingForPlayers,
    /// Ticking.
    Running,
    /// Waiting for missing inputs (prediction disabled).
    Paused,
    /// Stopped or playback complete.
    Finished,
}

/// Observability events drained by the host after each update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The session started; the world is initialized and at tick 0.
    GameStarted {
        /// Session seed.
        seed: i32,
        /// Participating players.
        player_count: usize,
    },
    /// A tick was executed (confirmed, predicted, resimulated or played
    /// back from a replay).
    TickExecuted {
        /// The executed tick.
        tick: i32,
    },
    /// A peer command was accepted into the input buffer.
    CommandReceived {
        /// Issuing player.
        player_id: i32,
        /// Scheduled tick.
        tick: i32,
    },
    /// A remote state hash disagreed with ours.
    DesyncDetected {
        /// Checkpoint tick.
        tick: i32,
        /// Our hash.
        local_hash: u64,
        /// The remote hash.
        remote_hash: u64,
    },
    /// A rollback restored an earlier snapshot.
    RollbackPerformed {
        /// Tick the engine was at.
        from_tick: i32,
        /// Snapshot tick actually restored.
        to_tick: i32,
    },
    /// Replay playback reached the end of the log.
    ReplayFinished,
}
