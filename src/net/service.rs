//! Network Service
//!
//! A thin broker between the lockstep engine and the transport capability.
//! It keeps the room and player tables, broadcasts commands and sync
//! hashes, measures RTT, and turns incoming messages into `NetEvent`s the
//! engine consumes at the start of each update.
//!
//! The service never touches simulation state. Everything non-deterministic
//! (timestamps, RTT) lives here, on the outside of the determinism
//! boundary.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::net::messages::Message;
use crate::net::transport::{PeerId, Transport};
use crate::sim::command::{Command, CommandRegistry};

/// One row of the player table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInfo {
    /// Stable player id within the session (0 = host).
    pub player_id: i32,
    /// Display name.
    pub name: String,
    /// Ready flag for the lobby.
    pub ready: bool,
    /// Last measured round-trip time, milliseconds (-1 = unmeasured).
    pub ping_ms: i32,
    /// Highest tick this player has acknowledged receiving from us.
    pub last_acked_tick: i32,
}

impl PlayerInfo {
    fn new(player_id: i32, name: String) -> Self {
        Self {
            player_id,
            name,
            ready: false,
            ping_ms: -1,
            last_acked_tick: -1,
        }
    }
}

/// Current room, if joined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomInfo {
    /// Room name (also salts the derived session seed).
    pub name: String,
    /// Seats in the room; all must be filled and ready to start.
    pub max_players: usize,
}

/// Events the service hands to the engine each poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetEvent {
    /// A peer's command arrived and decoded.
    CommandReceived(Command),
    /// The session is starting.
    GameStart {
        /// Shared PRNG seed.
        seed: i32,
        /// Session tick duration.
        tick_interval_ms: u32,
        /// Session input delay.
        input_delay_ticks: u32,
        /// All participating players.
        player_ids: Vec<i32>,
    },
    /// A remote hash disagreed with ours at a checkpoint tick.
    DesyncDetected {
        /// Checkpoint tick.
        tick: i32,
        /// Player whose hash disagreed.
        player_id: i32,
        /// Our hash at that tick.
        local_hash: u64,
        /// Their hash at that tick.
        remote_hash: u64,
    },
    /// A player joined the room (host side).
    PlayerJoined {
        /// The new player's id.
        player_id: i32,
    },
    /// A player left the room.
    PlayerLeft {
        /// The departed player's id.
        player_id: i32,
    },
    /// A player's ready flag changed.
    PlayerReady {
        /// The player.
        player_id: i32,
        /// New flag.
        ready: bool,
    },
}

/// Broker over the transport: rooms, players, command plane, sync hashes.
pub struct NetworkService {
    transport: Box<dyn Transport>,
    registry: CommandRegistry,

    room: Option<RoomInfo>,
    is_host: bool,
    local_player_id: i32,
    players: Vec<PlayerInfo>,
    peer_players: BTreeMap<PeerId, i32>,

    /// Session parameters the host advertises in GameStart.
    tick_interval_ms: u32,
    input_delay_ticks: u32,

    /// Remote hashes keyed by the unambiguous (tick, player_id) tuple.
    remote_hashes: BTreeMap<(i32, i32), u64>,
    /// Our own broadcast hashes by tick.
    local_hashes: BTreeMap<i32, u64>,
    /// (tick, player) pairs already compared, so a desync fires once.
    checked_hashes: BTreeSet<(i32, i32)>,

    ping_seq: i32,
    game_started: bool,

    events: Vec<NetEvent>,
    inbox: Vec<(PeerId, Vec<u8>)>,
    encode_buf: Vec<u8>,
}

impl NetworkService {
    /// Create a service over a transport, decoding commands with the given
    /// registry (peers must register the same kinds).
    pub fn new(transport: Box<dyn Transport>, registry: CommandRegistry) -> Self {
        Self {
            transport,
            registry,
            room: None,
            is_host: false,
            local_player_id: -1,
            players: Vec::new(),
            peer_players: BTreeMap::new(),
            tick_interval_ms: 50,
            input_delay_ticks: 2,
            remote_hashes: BTreeMap::new(),
            local_hashes: BTreeMap::new(),
            checked_hashes: BTreeSet::new(),
            ping_seq: 0,
            game_started: false,
            events: Vec::new(),
            inbox: Vec::new(),
            encode_buf: Vec::new(),
        }
    }

    /// Session parameters the host will advertise in GameStart.
    pub fn set_session_params(&mut self, tick_interval_ms: u32, input_delay_ticks: u32) {
        self.tick_interval_ms = tick_interval_ms;
        self.input_delay_ticks = input_delay_ticks;
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Host path: open a room and seat ourselves as player 0.
    pub fn create_room(&mut self, name: &str, max_players: usize) {
        info!(room = name, max_players, "creating room");
        self.reset_session_tables();
        self.room = Some(RoomInfo {
            name: name.to_string(),
            max_players,
        });
        self.is_host = true;
        self.local_player_id = 0;
        self.players.push(PlayerInfo::new(0, "player-0".to_string()));
    }

    /// Peer path: join a room under a player id assigned out of band (by
    /// the lobby/matchmaker that brought us here).
    pub fn join_room(&mut self, name: &str, player_id: i32) {
        info!(room = name, player_id, "joining room");
        self.reset_session_tables();
        self.room = Some(RoomInfo {
            name: name.to_string(),
            max_players: 0,
        });
        self.is_host = false;
        self.local_player_id = player_id;
        self.players
            .push(PlayerInfo::new(player_id, format!("player-{player_id}")));
        self.send_to_all(&Message::JoinRoom);
    }

    /// Leave the room and forget all session state.
    pub fn leave_room(&mut self) {
        if self.room.is_some() {
            self.send_to_all(&Message::LeaveRoom);
        }
        self.room = None;
        self.is_host = false;
        self.local_player_id = -1;
        self.reset_session_tables();
    }

    /// Flag our ready state; the host starts the game once the room is
    /// full and everyone is ready.
    pub fn set_ready(&mut self, ready: bool) {
        let player_id = self.local_player_id;
        if let Some(p) = self.players.iter_mut().find(|p| p.player_id == player_id) {
            p.ready = ready;
        }
        self.send_to_all(&Message::PlayerReady { player_id, ready });
        if self.is_host {
            self.maybe_start_game();
        }
    }

    fn reset_session_tables(&mut self) {
        self.players.clear();
        self.peer_players.clear();
        self.remote_hashes.clear();
        self.local_hashes.clear();
        self.checked_hashes.clear();
        self.game_started = false;
    }

    fn maybe_start_game(&mut self) {
        let Some(room) = &self.room else { return };
        if self.game_started
            || self.players.len() < room.max_players
            || !self.players.iter().all(|p| p.ready)
        {
            return;
        }

        let mut player_ids: Vec<i32> = self.players.iter().map(|p| p.player_id).collect();
        player_ids.sort_unstable();
        let seed = derive_session_seed(&room.name, &player_ids) as i32;

        info!(seed, players = player_ids.len(), "all ready, starting game");
        let msg = Message::GameStart {
            seed,
            tick_interval_ms: self.tick_interval_ms as i32,
            input_delay_ticks: self.input_delay_ticks as i32,
            player_ids: player_ids.clone(),
        };
        self.send_to_all(&msg);
        self.game_started = true;

        // The host's own engine starts through the same event path.
        self.events.push(NetEvent::GameStart {
            seed,
            tick_interval_ms: self.tick_interval_ms,
            input_delay_ticks: self.input_delay_ticks,
            player_ids,
        });
    }

    // =========================================================================
    // Outgoing
    // =========================================================================

    /// Broadcast a command (reliable-ordered).
    pub fn send_command(&mut self, cmd: &Command) {
        let msg = Message::Command {
            tick: cmd.tick,
            player_id: cmd.player_id,
            cmd_bytes: cmd.to_bytes(),
        };
        self.send_to_all(&msg);
    }

    /// Record our hash for a checkpoint tick and broadcast it.
    pub fn send_sync_hash(&mut self, tick: i32, hash: u64) {
        self.local_hashes.insert(tick, hash);

        // Remote hashes for this tick may have arrived before ours was
        // computed; compare now.
        let pending: Vec<(i32, u64)> = self
            .remote_hashes
            .range((tick, i32::MIN)..=(tick, i32::MAX))
            .map(|(&(_, player), &h)| (player, h))
            .collect();
        for (player_id, remote_hash) in pending {
            self.compare_hashes(tick, player_id, remote_hash);
        }

        let msg = Message::SyncHash {
            tick,
            hash: hash as i64,
            player_id: self.local_player_id,
        };
        self.send_to_all(&msg);
    }

    /// Broadcast an RTT probe (unreliable).
    pub fn send_ping(&mut self) {
        self.ping_seq += 1;
        let msg = Message::Ping {
            ts: now_ms(),
            seq: self.ping_seq,
        };
        self.send_to_all(&msg);
    }

    /// Prune hash bookkeeping for ticks older than `tick`.
    pub fn clear_old_data(&mut self, tick: i32) {
        self.local_hashes = self.local_hashes.split_off(&tick);
        self.remote_hashes = self.remote_hashes.split_off(&(tick, i32::MIN));
        self.checked_hashes = self.checked_hashes.split_off(&(tick, i32::MIN));
    }

    fn send_to_all(&mut self, msg: &Message) {
        self.encode_buf.clear();
        msg.encode(&mut self.encode_buf);
        self.transport
            .broadcast(&self.encode_buf, msg.reliability());
    }

    fn send_to_peer(&mut self, peer: PeerId, msg: &Message) {
        self.encode_buf.clear();
        msg.encode(&mut self.encode_buf);
        self.transport
            .send(peer, &self.encode_buf, msg.reliability());
    }

    // =========================================================================
    // Incoming
    // =========================================================================

    /// Drain the transport, dispatch every received message, and return
    /// the resulting events for the engine.
    pub fn poll(&mut self) -> Vec<NetEvent> {
        let mut inbox = std::mem::take(&mut self.inbox);
        inbox.clear();
        self.transport.poll(&mut inbox);
        for (peer, bytes) in &inbox {
            match Message::decode(bytes) {
                Ok(msg) => self.dispatch(*peer, msg),
                Err(err) => {
                    warn!(peer = *peer, %err, "dropping undecodable message");
                }
            }
        }
        self.inbox = inbox;
        std::mem::take(&mut self.events)
    }

    fn dispatch(&mut self, peer: PeerId, msg: Message) {
        match msg {
            Message::JoinRoom => self.on_join_room(peer),
            Message::LeaveRoom => self.on_leave_room(peer),
            Message::PlayerReady { player_id, ready } => {
                self.on_player_ready(peer, player_id, ready)
            }
            Message::GameStart {
                seed,
                tick_interval_ms,
                input_delay_ticks,
                player_ids,
            } => self.on_game_start(seed, tick_interval_ms, input_delay_ticks, player_ids),
            Message::Command {
                tick,
                player_id,
                cmd_bytes,
            } => self.on_command(peer, tick, player_id, &cmd_bytes),
            Message::CommandAck { tick, player_id } => self.on_command_ack(tick, player_id),
            Message::SyncHash {
                tick,
                hash,
                player_id,
            } => self.on_sync_hash(tick, player_id, hash as u64),
            Message::Ping { ts, seq } => {
                self.send_to_peer(peer, &Message::Pong { ts, seq });
            }
            Message::Pong { ts, seq: _ } => self.on_pong(peer, ts),
        }
    }

    fn on_join_room(&mut self, peer: PeerId) {
        if !self.is_host {
            return;
        }
        let Some(room) = &self.room else { return };
        if self.players.len() >= room.max_players {
            warn!(peer, "join rejected: room full");
            return;
        }
        let player_id = self
            .players
            .iter()
            .map(|p| p.player_id)
            .max()
            .unwrap_or(-1)
            + 1;
        info!(peer, player_id, "player joined room");
        self.players
            .push(PlayerInfo::new(player_id, format!("player-{player_id}")));
        self.peer_players.insert(peer, player_id);
        self.events.push(NetEvent::PlayerJoined { player_id });
    }

    fn on_leave_room(&mut self, peer: PeerId) {
        if let Some(player_id) = self.peer_players.remove(&peer) {
            self.players.retain(|p| p.player_id != player_id);
            info!(peer, player_id, "player left room");
            self.events.push(NetEvent::PlayerLeft { player_id });
        }
    }

    fn on_player_ready(&mut self, peer: PeerId, player_id: i32, ready: bool) {
        self.peer_players.entry(peer).or_insert(player_id);
        match self.players.iter_mut().find(|p| p.player_id == player_id) {
            Some(p) => p.ready = ready,
            None => {
                let mut p = PlayerInfo::new(player_id, format!("player-{player_id}"));
                p.ready = ready;
                self.players.push(p);
                self.players.sort_by_key(|p| p.player_id);
            }
        }
        self.events.push(NetEvent::PlayerReady { player_id, ready });
        if self.is_host {
            self.maybe_start_game();
        }
    }

    fn on_game_start(
        &mut self,
        seed: i32,
        tick_interval_ms: i32,
        input_delay_ticks: i32,
        player_ids: Vec<i32>,
    ) {
        info!(seed, ?player_ids, "received game start");
        // Peers learn the authoritative roster here.
        self.players = player_ids
            .iter()
            .map(|&id| PlayerInfo::new(id, format!("player-{id}")))
            .collect();
        self.game_started = true;
        self.events.push(NetEvent::GameStart {
            seed,
            tick_interval_ms: tick_interval_ms as u32,
            input_delay_ticks: input_delay_ticks as u32,
            player_ids,
        });
    }

    fn on_command(&mut self, peer: PeerId, tick: i32, player_id: i32, cmd_bytes: &[u8]) {
        match self.registry.deserialize(cmd_bytes) {
            Ok(cmd) => {
                debug!(tick, player_id, kind = cmd.kind, "command received");
                self.send_to_peer(peer, &Message::CommandAck { tick, player_id });
                self.events.push(NetEvent::CommandReceived(cmd));
            }
            Err(err) => {
                // Unknown kinds and malformed payloads are logged and
                // dropped; nothing downstream sees them.
                warn!(tick, player_id, %err, "dropping undecodable command");
            }
        }
    }

    fn on_command_ack(&mut self, tick: i32, player_id: i32) {
        if let Some(p) = self.players.iter_mut().find(|p| p.player_id == player_id) {
            if tick > p.last_acked_tick {
                p.last_acked_tick = tick;
            }
        }
    }

    fn on_sync_hash(&mut self, tick: i32, player_id: i32, hash: u64) {
        if player_id == self.local_player_id {
            return;
        }
        self.remote_hashes.insert((tick, player_id), hash);
        self.compare_hashes(tick, player_id, hash);
    }

    fn compare_hashes(&mut self, tick: i32, player_id: i32, remote_hash: u64) {
        let Some(&local_hash) = self.local_hashes.get(&tick) else {
            return;
        };
        if !self.checked_hashes.insert((tick, player_id)) {
            return; // already compared this pair
        }
        if local_hash != remote_hash {
            warn!(
                tick,
                player_id,
                local = %hex::encode(local_hash.to_le_bytes()),
                remote = %hex::encode(remote_hash.to_le_bytes()),
                "desync detected"
            );
            self.events.push(NetEvent::DesyncDetected {
                tick,
                player_id,
                local_hash,
                remote_hash,
            });
        } else {
            debug!(tick, player_id, "sync hash verified");
        }
    }

    fn on_pong(&mut self, peer: PeerId, ts: i64) {
        let rtt = (now_ms() - ts).max(0) as i32;
        if let Some(&player_id) = self.peer_players.get(&peer) {
            if let Some(p) = self.players.iter_mut().find(|p| p.player_id == player_id) {
                p.ping_ms = rtt;
            }
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Our player id (-1 before joining).
    pub fn local_player_id(&self) -> i32 {
        self.local_player_id
    }

    /// True on the room-owning peer.
    pub fn is_host(&self) -> bool {
        self.is_host
    }

    /// The current room.
    pub fn room(&self) -> Option<&RoomInfo> {
        self.room.as_ref()
    }

    /// The player table.
    pub fn players(&self) -> &[PlayerInfo] {
        &self.players
    }

    /// Players currently seated.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }
}

/// Wall-clock milliseconds for RTT probes (never used in simulation).
fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Derive the session seed from the room name and the sorted player ids.
///
/// Domain-separated SHA-256, truncated to 32 bits. Every peer derives the
/// same seed from the same GameStart roster, and no single player picks it.
pub fn derive_session_seed(room_name: &str, player_ids: &[i32]) -> u32 {
    let mut hasher = Sha256::new();
    hasher.update(b"LOCKSTEP_SEED_V1");
    hasher.update(room_name.as_bytes());
    for id in player_ids {
        hasher.update(id.to_le_bytes());
    }
    let digest = hasher.finalize();
    u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
}

// =============================================================================
// TESTS
// =============================================================================
