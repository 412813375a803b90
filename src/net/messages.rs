//! Command-Plane Wire Messages
//!
//! Every message is a byte string beginning with a one-byte type tag;
//! all integers are little-endian. Tag numbers and payload layouts are a
//! wire contract between peers and must not change.
//!
//! | Tag | Name        | Payload                                          |
//! |-----|-------------|--------------------------------------------------|
//! | 1   | JoinRoom    | reserved                                         |
//! | 2   | LeaveRoom   | reserved                                         |
//! | 3   | PlayerReady | player_id:i32, ready:u8                          |
//! | 4   | GameStart   | seed:i32, interval:i32, delay:i32, n:i32, ids    |
//! | 10  | Command     | tick:i32, player_id:i32, len:i32, cmd_bytes      |
//! | 11  | CommandAck  | tick:i32, player_id:i32                          |
//! | 20  | SyncHash    | tick:i32, hash:i64, player_id:i32                |
//! | 30  | Ping        | ts:i64, seq:i32                                  |
//! | 31  | Pong        | ts:i64, seq:i32                                  |

use crate::core::codec::{ByteReader, ByteWriter};
use crate::error::{LockstepError, Result};
use crate::net::transport::Reliability;

/// Message type tags.
pub const TAG_JOIN_ROOM: u8 = 1;
/// See module table.
pub const TAG_LEAVE_ROOM: u8 = 2;
/// See module table.
pub const TAG_PLAYER_READY: u8 = 3;
/// See module table.
pub const TAG_GAME_START: u8 = 4;
/// See module table.
pub const TAG_COMMAND: u8 = 10;
/// See module table.
pub const TAG_COMMAND_ACK: u8 = 11;
/// See module table.
pub const TAG_SYNC_HASH: u8 = 20;
/// See module table.
pub const TAG_PING: u8 = 30;
/// See module table.
pub const TAG_PONG: u8 = 31;

/// A decoded command-plane message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Peer asks to join the room (payload reserved).
    JoinRoom,
    /// Peer leaves the room (payload reserved).
    LeaveRoom,
    /// Ready-state change.
    PlayerReady {
        /// Player changing state.
        player_id: i32,
        /// New ready flag.
        ready: bool,
    },
    /// Host starts the session.
    GameStart {
        /// Shared PRNG seed.
        seed: i32,
        /// Tick duration all peers run at.
        tick_interval_ms: i32,
        /// Input delay all peers apply.
        input_delay_ticks: i32,
        /// Every participating player id, in player order.
        player_ids: Vec<i32>,
    },
    /// A serialized command for a (tick, player) slot.
    Command {
        /// Execution tick.
        tick: i32,
        /// Issuing player.
        player_id: i32,
        /// Full serialized `Command` bytes.
        cmd_bytes: Vec<u8>,
    },
    /// Receipt acknowledgement for a command slot.
    CommandAck {
        /// Acknowledged tick.
        tick: i32,
        /// Acknowledged player.
        player_id: i32,
    },
    /// Periodic state-hash checkpoint.
    SyncHash {
        /// Checkpoint tick.
        tick: i32,
        /// Sender's world hash at that tick (i64 on the wire).
        hash: i64,
        /// Sender's player id.
        player_id: i32,
    },
    /// RTT probe.
    Ping {
        /// Sender timestamp, milliseconds.
        ts: i64,
        /// Probe sequence number.
        seq: i32,
    },
    /// RTT probe reply, echoing the probe's fields.
    Pong {
        /// Echoed timestamp.
        ts: i64,
        /// Echoed sequence number.
        seq: i32,
    },
}

impl Message {
    /// Delivery guarantee this message travels with.
    pub fn reliability(&self) -> Reliability {
        match self {
            Message::Ping { .. } | Message::Pong { .. } => Reliability::Unreliable,
            _ => Reliability::ReliableOrdered,
        }
    }

    /// Append the wire encoding.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        let mut w = ByteWriter::new(buf);
        match self {
            Message::JoinRoom => {
                w.write_u8(TAG_JOIN_ROOM);
            }
            Message::LeaveRoom => {
                w.write_u8(TAG_LEAVE_ROOM);
            }
            Message::PlayerReady { player_id, ready } => {
                w.write_u8(TAG_PLAYER_READY);
                w.write_i32(*player_id);
                w.write_u8(*ready as u8);
            }
            Message::GameStart {
                seed,
                tick_interval_ms,
                input_delay_ticks,
                player_ids,
            } => {
                w.write_u8(TAG_GAME_START);
                w.write_i32(*seed);
                w.write_i32(*tick_interval_ms);
                w.write_i32(*input_delay_ticks);
                w.write_i32(player_ids.len() as i32);
                for id in player_ids {
                    w.write_i32(*id);
                }
            }
            Message::Command {
                tick,
                player_id,
                cmd_bytes,
            } => {
                w.write_u8(TAG_COMMAND);
                w.write_i32(*tick);
                w.write_i32(*player_id);
                w.write_i32(cmd_bytes.len() as i32);
                w.write_bytes(cmd_bytes);
            }
            Message::CommandAck { tick, player_id } => {
                w.write_u8(TAG_COMMAND_ACK);
                w.write_i32(*tick);
                w.write_i32(*player_id);
            }
            Message::SyncHash {
                tick,
                hash,
                player_id,
            } => {
                w.write_u8(TAG_SYNC_HASH);
                w.write_i32(*tick);
                w.write_i64(*hash);
                w.write_i32(*player_id);
            }
            Message::Ping { ts, seq } => {
                w.write_u8(TAG_PING);
                w.write_i64(*ts);
                w.write_i32(*seq);
            }
            Message::Pong { ts, seq } => {
                w.write_u8(TAG_PONG);
                w.write_i64(*ts);
                w.write_i32(*seq);
            }
        }
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(32);
        self.encode(&mut buf);
        buf
    }

    /// Decode one message from its wire form.
    pub fn decode(bytes: &[u8]) -> Result<Message> {
        let mut r = ByteReader::new(bytes);
        let tag = r.read_u8()?;
        match tag {
            TAG_JOIN_ROOM => Ok(Message::JoinRoom),
            TAG_LEAVE_ROOM => Ok(Message::LeaveRoom),
            TAG_PLAYER_READY => Ok(Message::PlayerReady {
                player_id: r.read_i32()?,
                ready: r.read_u8()? != 0,
            }),
            TAG_GAME_START => {
                let seed = r.read_i32()?;
                let tick_interval_ms = r.read_i32()?;
                let input_delay_ticks = r.read_i32()?;
                let n = r.read_count()?;
                let mut player_ids = Vec::with_capacity(n);
                for _ in 0..n {
                    player_ids.push(r.read_i32()?);
                }
                Ok(Message::GameStart {
                    seed,
                    tick_interval_ms,
                    input_delay_ticks,
                    player_ids,
                })
            }
            TAG_COMMAND => {
                let tick = r.read_i32()?;
                let player_id = r.read_i32()?;
                let len = r.read_count()?;
                Ok(Message::Command {
                    tick,
                    player_id,
                    cmd_bytes: r.read_bytes(len)?.to_vec(),
                })
            }
            TAG_COMMAND_ACK => Ok(Message::CommandAck {
                tick: r.read_i32()?,
                player_id: r.read_i32()?,
            }),
            TAG_SYNC_HASH => Ok(Message::SyncHash {
                tick: r.read_i32()?,
                hash: r.read_i64()?,
                player_id: r.read_i32()?,
            }),
            TAG_PING => Ok(Message::Ping {
                ts: r.read_i64()?,
                seq: r.read_i32()?,
            }),
            TAG_PONG => Ok(Message::Pong {
                ts: r.read_i64()?,
                seq: r.read_i32()?,
            }),
            _ => Err(LockstepError::MalformedField("unknown message tag")),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
