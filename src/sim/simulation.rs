//! Deterministic Simulation
//!
//! The authoritative per-tick state machine. One call to `tick` applies
//! the tick's commands to their owners' entities, advances every entity,
//! runs the registered system passes and increments the world tick.
//!
//! # Determinism
//!
//! Identical seed + identical command sequence ⇒ identical snapshot bytes
//! and identical hash at every tick:
//! - commands are applied exactly in the order the engine passes them
//! - entity iteration is ascending id order (BTreeMap)
//! - all math is fixed-point, all randomness is the seeded PRNG

use tracing::warn;

use crate::core::rng::DeterministicRng;
use crate::error::{LockstepError, Result};
use crate::sim::command::Command;
use crate::sim::entity::EntityFactory;
use crate::sim::snapshot::{Snapshot, SnapshotRing};
use crate::sim::world::WorldState;

/// Ticks between periodic snapshots (engine and replay seek both use it).
pub const SNAPSHOT_INTERVAL_TICKS: i32 = 5;

/// Bound on the snapshot ring.
const MAX_SNAPSHOTS: usize = 64;

/// Extension slot run after entity stepping each tick (collision, AI).
///
/// Passes receive the world and the simulation's PRNG; any randomness they
/// need must come from that PRNG or determinism is gone.
pub trait SystemPass {
    /// Run the pass for one tick.
    fn run(&mut self, world: &mut WorldState, rng: &mut DeterministicRng, delta_ms: u32);
}

/// The deterministic simulation: world + snapshot ring + PRNG + systems.
pub struct Simulation {
    world: WorldState,
    snapshots: SnapshotRing,
    rng: DeterministicRng,
    factory: EntityFactory,
    systems: Vec<Box<dyn SystemPass>>,
    tick_interval_ms: u32,
}

impl Simulation {
    /// New simulation with the built-in entity factory.
    pub fn new(tick_interval_ms: u32) -> Self {
        Self::with_factory(tick_interval_ms, EntityFactory::with_builtins())
    }

    /// New simulation with a custom entity factory.
    pub fn with_factory(tick_interval_ms: u32, factory: EntityFactory) -> Self {
        Self {
            world: WorldState::new(),
            snapshots: SnapshotRing::new(MAX_SNAPSHOTS),
            rng: DeterministicRng::new(0),
            factory,
            systems: Vec::new(),
            tick_interval_ms,
        }
    }

    /// Clear the world and snapshot history and reseed the PRNG.
    pub fn initialize(&mut self, seed: u32) {
        self.world.clear();
        self.snapshots.clear_all();
        self.rng = DeterministicRng::new(seed);
    }

    /// Register a system pass. Registration order is execution order and
    /// must match across peers.
    pub fn add_system(&mut self, system: Box<dyn SystemPass>) {
        self.systems.push(system);
    }

    /// Spawn an entity, returning its id.
    pub fn spawn_entity(&mut self, type_id: i32, owner_id: i32) -> Result<i32> {
        self.world.spawn(&self.factory, type_id, owner_id)
    }

    /// Execute one tick with the given commands, in the given order.
    pub fn tick(&mut self, commands: &[Command]) {
        for cmd in commands {
            for entity in self.world.entities_mut() {
                if entity.owner_id() == cmd.player_id {
                    entity.apply_command(cmd);
                }
            }
        }

        let dt = self.tick_interval_ms;
        for entity in self.world.entities_mut() {
            entity.simulation_step(dt);
        }

        let Self {
            world,
            rng,
            systems,
            tick_interval_ms,
            ..
        } = self;
        for system in systems.iter_mut() {
            system.run(world, rng, *tick_interval_ms);
        }

        self.world.advance_tick();
    }

    /// Capture the world at its current tick.
    pub fn create_snapshot(&self) -> Snapshot {
        let mut bytes = Vec::new();
        self.world.write_snapshot(&mut bytes);
        Snapshot {
            tick: self.world.tick(),
            bytes,
        }
    }

    /// Capture and store a snapshot in the ring.
    pub fn save_snapshot(&mut self) {
        let snapshot = self.create_snapshot();
        self.snapshots.save(snapshot);
    }

    /// Restore the nearest snapshot at or before `target_tick`, dropping
    /// later snapshots. Returns the tick actually restored.
    pub fn rollback(&mut self, target_tick: i32) -> Result<i32> {
        let snapshot = match self.snapshots.nearest_at_or_before(target_tick) {
            Some(s) => s.clone(),
            None => {
                warn!(
                    target_tick,
                    current_tick = self.world.tick(),
                    "rollback impossible: no snapshot at or before target"
                );
                return Err(LockstepError::RollbackImpossible {
                    target: target_tick,
                    current: self.world.tick(),
                });
            }
        };

        self.world
            .restore_from_snapshot(&snapshot.bytes, &self.factory)?;
        self.snapshots.clear_after(snapshot.tick);
        Ok(snapshot.tick)
    }

    /// Deterministic content hash of the world.
    pub fn state_hash(&self) -> u64 {
        self.world.hash()
    }

    /// Current world tick.
    pub fn current_tick(&self) -> i32 {
        self.world.tick()
    }

    /// Read-only world access (rendering reads positions from here).
    pub fn world(&self) -> &WorldState {
        &self.world
    }

    /// The snapshot ring (read-only).
    pub fn snapshots(&self) -> &SnapshotRing {
        &self.snapshots
    }

    /// Tick duration in milliseconds.
    pub fn tick_interval_ms(&self) -> u32 {
        self.tick_interval_ms
    }

    /// Override the tick duration (engine applies the session's value at
    /// game start).
    pub fn set_tick_interval_ms(&mut self, tick_interval_ms: u32) {
        self.tick_interval_ms = tick_interval_ms;
    }

    /// PRNG state for checkpointing by hosts whose systems draw from it.
    pub fn rng_state(&self) -> [u64; 2] {
        self.rng.state()
    }

    /// Restore a checkpointed PRNG state.
    pub fn set_rng_state(&mut self, state: [u64; 2]) {
        self.rng.set_state(state);
    }
}

// =============================================================================
// TESTS
// =============================================================================
