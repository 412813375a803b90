//! Error Types
//!
//! Every failure the core can surface, in one place. The split follows the
//! recovery disposition: arithmetic errors unwind from the simulation step,
//! protocol errors drop the offending message, replay errors surface to the
//! loader, and rollback errors leave the engine running at its current tick.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, LockstepError>;

/// All error kinds distinguished by the core.
#[derive(Debug, Error)]
pub enum LockstepError {
    /// Fixed-point division by zero. Fatal to the caller.
    #[error("fixed-point division by zero")]
    DivideByZero,

    /// Input outside a function's domain (sqrt of negative, bad PRNG range).
    #[error("domain error: {0}")]
    DomainError(&'static str),

    /// A serialized command carried a kind with no registered decoder.
    /// The offending message is logged and dropped.
    #[error("unknown command kind {0}")]
    UnknownCommandKind(u32),

    /// A snapshot entry carried a type id with no registered entity factory.
    #[error("unknown entity type {0}")]
    UnknownEntityType(i32),

    /// Replay file with a newer version than this reader understands.
    #[error("unsupported replay version {found} (reader supports up to {supported})")]
    UnsupportedReplay {
        /// Version found in the file.
        found: i32,
        /// Highest version this reader accepts.
        supported: i32,
    },

    /// Replay file is structurally invalid (bad magic, truncated, garbage).
    #[error("invalid replay format: {0}")]
    InvalidReplayFormat(String),

    /// No snapshot at or before the rollback target, or the target lies
    /// outside the rollback window. The engine continues at its current tick.
    #[error("rollback to tick {target} impossible (current tick {current})")]
    RollbackImpossible {
        /// Requested rollback tick.
        target: i32,
        /// Engine tick when the rollback was requested.
        current: i32,
    },

    /// A replay control call arrived with no replay session active.
    #[error("no replay session is active")]
    NoActiveReplay,

    /// A replay save was requested but recording was never enabled.
    #[error("recording was not enabled for this session")]
    RecordingDisabled,

    /// A byte buffer ended before the decoder was done with it.
    #[error("truncated buffer: needed {needed} bytes at offset {offset}, had {available}")]
    Truncated {
        /// Bytes the decoder asked for.
        needed: usize,
        /// Read position at the time of the failure.
        offset: usize,
        /// Bytes remaining in the buffer.
        available: usize,
    },

    /// A decoded field held a value the format forbids (negative count,
    /// oversized length prefix, non-UTF-8 string).
    #[error("malformed field: {0}")]
    MalformedField(&'static str),

    /// Replay file I/O.
    #[error("replay i/o: {0}")]
    Io(#[from] std::io::Error),
}
