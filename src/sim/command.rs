//! Player Commands and the Command Registry
//!
//! A command is the unit of input exchanged between peers: one typed value
//! per (tick, player). Commands are value types with structural equality
//! and a stable binary form; once accepted into the input buffer they are
//! never mutated.
//!
//! ## Wire form
//!
//! ```text
//! kind:u32 | player_id:i32 | tick:i32 | payload (fixed per kind)
//! ```
//!
//! The kind is the first 4 bytes so the registry can dispatch before the
//! full decode runs; the decode pass then reads it a second time. That
//! double read is deliberate and part of the wire contract.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::codec::{ByteReader, ByteWriter};
use crate::core::vec3::FpVec3;
use crate::error::{LockstepError, Result};

/// Built-in kind: no input this tick.
pub const KIND_EMPTY: u32 = 0;

/// Built-in kind: set a movement target.
pub const KIND_MOVE: u32 = 1;

/// Built-in kind: trigger an action at a point / on an entity.
pub const KIND_ACTION: u32 = 2;

/// Kind-specific command payload.
///
/// Externally registered kinds decode to `Opaque`, which preserves the
/// payload bytes exactly so round-trips stay byte-identical.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandPayload {
    /// No input.
    Empty,
    /// Movement order toward a world position.
    Move {
        /// Target position.
        target: FpVec3,
    },
    /// Action trigger.
    Action {
        /// Game-defined action identifier.
        action_id: i32,
        /// Target entity, or -1 for none.
        target_entity: i32,
        /// World point the action refers to.
        point: FpVec3,
    },
    /// Payload of an externally registered kind, kept as raw bytes.
    Opaque {
        /// The payload bytes exactly as they appeared after the header.
        bytes: Vec<u8>,
    },
}

/// A single player input scheduled for a specific tick.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Issuing player.
    pub player_id: i32,
    /// Tick the command executes on.
    pub tick: i32,
    /// Numeric kind; part of the wire contract.
    pub kind: u32,
    /// Kind-specific data.
    pub payload: CommandPayload,
}

impl Command {
    /// An empty (no-input) command.
    pub fn empty(player_id: i32, tick: i32) -> Self {
        Self {
            player_id,
            tick,
            kind: KIND_EMPTY,
            payload: CommandPayload::Empty,
        }
    }

    /// A movement command.
    pub fn move_to(player_id: i32, tick: i32, target: FpVec3) -> Self {
        Self {
            player_id,
            tick,
            kind: KIND_MOVE,
            payload: CommandPayload::Move { target },
        }
    }

    /// An action command.
    pub fn action(
        player_id: i32,
        tick: i32,
        action_id: i32,
        target_entity: i32,
        point: FpVec3,
    ) -> Self {
        Self {
            player_id,
            tick,
            kind: KIND_ACTION,
            payload: CommandPayload::Action {
                action_id,
                target_entity,
                point,
            },
        }
    }

    /// A command of an externally registered kind.
    pub fn opaque(player_id: i32, tick: i32, kind: u32, bytes: Vec<u8>) -> Self {
        Self {
            player_id,
            tick,
            kind,
            payload: CommandPayload::Opaque { bytes },
        }
    }

    /// Append the stable binary form.
    pub fn serialize(&self, w: &mut ByteWriter<'_>) {
        w.write_u32(self.kind);
        w.write_i32(self.player_id);
        w.write_i32(self.tick);
        match &self.payload {
            CommandPayload::Empty => {}
            CommandPayload::Move { target } => {
                w.write_vec3(*target);
            }
            CommandPayload::Action {
                action_id,
                target_entity,
                point,
            } => {
                w.write_i32(*action_id);
                w.write_i32(*target_entity);
                w.write_vec3(*point);
            }
            CommandPayload::Opaque { bytes } => {
                w.write_bytes(bytes);
            }
        }
    }

    /// Serialize into a fresh buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(40);
        self.serialize(&mut ByteWriter::new(&mut buf));
        buf
    }
}

/// Decoder for one command kind's payload. Receives the kind it was
/// registered under and a reader positioned just past the command header.
pub type PayloadDecoder = fn(kind: u32, r: &mut ByteReader<'_>) -> Result<CommandPayload>;

fn decode_empty(_kind: u32, _r: &mut ByteReader<'_>) -> Result<CommandPayload> {
    Ok(CommandPayload::Empty)
}

fn decode_move(_kind: u32, r: &mut ByteReader<'_>) -> Result<CommandPayload> {
    Ok(CommandPayload::Move {
        target: r.read_vec3()?,
    })
}

fn decode_action(_kind: u32, r: &mut ByteReader<'_>) -> Result<CommandPayload> {
    Ok(CommandPayload::Action {
        action_id: r.read_i32()?,
        target_entity: r.read_i32()?,
        point: r.read_vec3()?,
    })
}

fn decode_opaque(_kind: u32, r: &mut ByteReader<'_>) -> Result<CommandPayload> {
    let bytes = r.read_bytes(r.remaining())?.to_vec();
    Ok(CommandPayload::Opaque { bytes })
}

/// Maps numeric kinds to payload decoders.
///
/// Built-in kinds are pre-registered; games add their own kinds at startup.
/// Kind numbers are part of the wire contract between peers, so both sides
/// must register the same set.
#[derive(Clone)]
pub struct CommandRegistry {
    decoders: BTreeMap<u32, PayloadDecoder>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl CommandRegistry {
    /// Registry with only the built-in kinds.
    pub fn with_builtins() -> Self {
        let mut decoders: BTreeMap<u32, PayloadDecoder> = BTreeMap::new();
        decoders.insert(KIND_EMPTY, decode_empty);
        decoders.insert(KIND_MOVE, decode_move);
        decoders.insert(KIND_ACTION, decode_action);
        Self { decoders }
    }

    /// Register a custom decoder for a kind.
    pub fn register(&mut self, kind: u32, decoder: PayloadDecoder) {
        self.decoders.insert(kind, decoder);
    }

    /// Register a kind whose payload is carried as opaque bytes.
    pub fn register_opaque(&mut self, kind: u32) {
        self.decoders.insert(kind, decode_opaque);
    }

    /// True if the kind has a decoder.
    pub fn is_registered(&self, kind: u32) -> bool {
        self.decoders.contains_key(&kind)
    }

    /// Decode a full serialized command.
    ///
    /// Reads the leading kind to find the decoder, then decodes the whole
    /// slice (the kind is read twice by design).
    pub fn deserialize(&self, bytes: &[u8]) -> Result<Command> {
        let mut peek = ByteReader::new(bytes);
        let kind = peek.read_u32()?;
        let decoder = self
            .decoders
            .get(&kind)
            .ok_or(LockstepError::UnknownCommandKind(kind))?;

        let mut r = ByteReader::new(bytes);
        let kind = r.read_u32()?;
        let player_id = r.read_i32()?;
        let tick = r.read_i32()?;
        let payload = decoder(kind, &mut r)?;

        Ok(Command {
            player_id,
            tick,
            kind,
            payload,
        })
    }

    /// Deep-copy a command by passing it through its binary form.
    ///
    /// The replay recorder uses this so logged commands share no storage
    /// with live ones.
    pub fn deep_copy(&self, cmd: &Command) -> Result<Command> {
        self.deserialize(&cmd.to_bytes())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::Fp;

    #[test]
    fn test_wire_layout() {
        let cmd = Command::empty(3, 7);
        let bytes = cmd.to_bytes();
        assert_eq!(bytes.len(), 12);
        // kind, then player id, then tick, all little-endian
        assert_eq!(&bytes[0..4], &[0, 0, 0, 0]);
        assert_eq!(&bytes[4..8], &[3, 0, 0, 0]);
        assert_eq!(&bytes[8..12], &[7, 0, 0, 0]);
    }

    #[test]
    fn test_move_round_trip() {
        let registry = CommandRegistry::with_builtins();
        let cmd = Command::move_to(
            0,
            10,
            FpVec3::new(Fp::from_int(10), Fp::ZERO, Fp::from_int(10)),
        );
        let bytes = cmd.to_bytes();
        assert_eq!(bytes.len(), 12 + 24);
        // Raw value of 10.0 appears verbatim in the payload
        assert_eq!(
            i64::from_le_bytes(bytes[12..20].try_into().unwrap()),
            42_949_672_960
        );

        let back = registry.deserialize(&bytes).unwrap();
        assert_eq!(back, cmd);
        assert_eq!(back.to_bytes(), bytes);
    }

    #[test]
    fn test_action_round_trip() {
        let registry = CommandRegistry::with_builtins();
        let cmd = Command::action(
            1,
            20,
            5,
            42,
            FpVec3::new(Fp::from_int(-3), Fp::HALF, Fp::MAX),
        );
        let bytes = cmd.to_bytes();
        assert_eq!(bytes.len(), 12 + 4 + 4 + 24);
        let back = registry.deserialize(&bytes).unwrap();
        assert_eq!(back, cmd);
        assert_eq!(back.to_bytes(), bytes);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let registry = CommandRegistry::with_builtins();
        let cmd = Command::opaque(0, 0, 99, vec![1, 2, 3]);
        let err = registry.deserialize(&cmd.to_bytes()).unwrap_err();
        assert!(matches!(err, LockstepError::UnknownCommandKind(99)));
    }

    #[test]
    fn test_registered_opaque_kind_round_trips() {
        let mut registry = CommandRegistry::with_builtins();
        registry.register_opaque(99);
        assert!(registry.is_registered(99));

        let cmd = Command::opaque(2, 15, 99, vec![0xAA, 0xBB, 0xCC]);
        let bytes = cmd.to_bytes();
        let back = registry.deserialize(&bytes).unwrap();
        assert_eq!(back, cmd);
        assert_eq!(back.to_bytes(), bytes);
    }

    #[test]
    fn test_custom_decoder() {
        fn decode_pair(_kind: u32, r: &mut ByteReader<'_>) -> Result<CommandPayload> {
            let a = r.read_i32()?;
            let b = r.read_i32()?;
            Ok(CommandPayload::Action {
                action_id: a,
                target_entity: b,
                point: FpVec3::ZERO,
            })
        }

        let mut registry = CommandRegistry::with_builtins();
        registry.register(50, decode_pair);

        let mut buf = Vec::new();
        let mut w = ByteWriter::new(&mut buf);
        w.write_u32(50);
        w.write_i32(1); // player
        w.write_i32(2); // tick
        w.write_i32(7);
        w.write_i32(8);

        let cmd = registry.deserialize(&buf).unwrap();
        assert_eq!(cmd.kind, 50);
        assert!(matches!(
            cmd.payload,
            CommandPayload::Action {
                action_id: 7,
                target_entity: 8,
                ..
            }
        ));
    }

    #[test]
    fn test_truncated_command_fails() {
        let registry = CommandRegistry::with_builtins();
        let bytes = Command::move_to(0, 0, FpVec3::ONE).to_bytes();
        let err = registry.deserialize(&bytes[..20]).unwrap_err();
        assert!(matches!(err, LockstepError::Truncated { .. }));
    }

    #[test]
    fn test_deep_copy_is_equal_but_disjoint() {
        let registry = CommandRegistry::with_builtins();
        let cmd = Command::move_to(1, 5, FpVec3::from_ints(1, 2, 3));
        let copy = registry.deep_copy(&cmd).unwrap();
        assert_eq!(copy, cmd);
    }
}
