//! Syncable Entities
//!
//! Entities are the unit of world state. They serialize to a stable byte
//! form, hash deterministically (FNV-1a over the serialized fields), and
//! are only ever mutated inside `Simulation::tick` or a snapshot restore.
//! Identity is the entity id, which is never reused within a session.
//!
//! Type identity at the wire boundary is the numeric `type_id`; the
//! factory maps it back to a constructor, so no runtime reflection is
//! involved.

use std::collections::BTreeMap;

use crate::core::codec::{ByteReader, ByteWriter};
use crate::core::fixed::Fp;
use crate::core::hash::FnvHasher;
use crate::core::trig::atan2;
use crate::core::vec3::FpVec3;
use crate::error::{LockstepError, Result};
use crate::sim::command::{Command, CommandPayload};

/// Behaviors every syncable entity provides.
pub trait SyncEntity {
    /// Unique id within the session.
    fn entity_id(&self) -> i32;

    /// Numeric type tag; the single source of type truth on the wire.
    fn type_id(&self) -> i32;

    /// Owning player, or -1 for world-owned entities.
    fn owner_id(&self) -> i32;

    /// Assign identity at spawn time.
    fn set_identity(&mut self, entity_id: i32, owner_id: i32);

    /// Current world position (read-only view for the host/renderer).
    fn position(&self) -> FpVec3;

    /// Append the entity's full state.
    fn serialize(&self, w: &mut ByteWriter<'_>);

    /// Overwrite the entity's state from serialized form.
    fn deserialize(&mut self, r: &mut ByteReader<'_>) -> Result<()>;

    /// FNV-1a over the serialized fields, streamed without allocation.
    fn hash(&self) -> u64;

    /// Advance one tick of `delta_ms` milliseconds.
    fn simulation_step(&mut self, delta_ms: u32);

    /// Apply a command issued by this entity's owner.
    fn apply_command(&mut self, cmd: &Command);

    /// Return to the just-spawned state (identity is kept).
    fn reset(&mut self);
}

/// Constructor for one entity type.
pub type EntityConstructor = fn() -> Box<dyn SyncEntity>;

/// Maps `type_id` to entity constructors.
///
/// Games register their entity types at startup, the same way command
/// kinds register. Snapshot restore uses this to rebuild entities that do
/// not currently exist.
#[derive(Clone)]
pub struct EntityFactory {
    constructors: BTreeMap<i32, EntityConstructor>,
}

impl Default for EntityFactory {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl EntityFactory {
    /// Factory with the built-in demonstration entity registered.
    pub fn with_builtins() -> Self {
        let mut constructors: BTreeMap<i32, EntityConstructor> = BTreeMap::new();
        constructors.insert(UNIT_TYPE_ID, || Box::new(UnitEntity::new()));
        Self { constructors }
    }

    /// Register a constructor for a type id.
    pub fn register(&mut self, type_id: i32, ctor: EntityConstructor) {
        self.constructors.insert(type_id, ctor);
    }

    /// True if the type id has a constructor.
    pub fn is_registered(&self, type_id: i32) -> bool {
        self.constructors.contains_key(&type_id)
    }

    /// Construct a fresh entity of the given type.
    pub fn create(&self, type_id: i32) -> Result<Box<dyn SyncEntity>> {
        let ctor = self
            .constructors
            .get(&type_id)
            .ok_or(LockstepError::UnknownEntityType(type_id))?;
        Ok(ctor())
    }
}

// =============================================================================
// UNIT ENTITY (demonstration entity)
// =============================================================================

/// Type id of the built-in unit entity.
pub const UNIT_TYPE_ID: i32 = 1;

/// Default unit movement speed, units per second.
pub const UNIT_DEFAULT_MOVE_SPEED: Fp = Fp::from_int(5);

/// The demonstration entity: a unit with a position and a movement target.
///
/// `Move` sets the target and turns the unit toward it; each simulation
/// step advances `move_speed * dt` toward the target and stops exactly on
/// arrival. `Action` records the action id and faces the action point.
#[derive(Debug, Clone)]
pub struct UnitEntity {
    entity_id: i32,
    owner_id: i32,
    position: FpVec3,
    rotation: Fp,
    scale: FpVec3,
    move_target: FpVec3,
    move_speed: Fp,
    is_moving: bool,
    last_action_id: i32,
}

impl Default for UnitEntity {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitEntity {
    /// A unit at the origin with the default speed.
    pub fn new() -> Self {
        Self {
            entity_id: 0,
            owner_id: -1,
            position: FpVec3::ZERO,
            rotation: Fp::ZERO,
            scale: FpVec3::ONE,
            move_target: FpVec3::ZERO,
            move_speed: UNIT_DEFAULT_MOVE_SPEED,
            is_moving: false,
            last_action_id: 0,
        }
    }

    /// Current movement target.
    pub fn move_target(&self) -> FpVec3 {
        self.move_target
    }

    /// Whether the unit is en route to its target.
    pub fn is_moving(&self) -> bool {
        self.is_moving
    }

    /// Movement speed in units per second.
    pub fn move_speed(&self) -> Fp {
        self.move_speed
    }

    /// Override the movement speed (setup/spawn time).
    pub fn set_move_speed(&mut self, speed: Fp) {
        self.move_speed = speed;
    }

    /// Place the unit (setup/spawn time).
    pub fn set_position(&mut self, position: FpVec3) {
        self.position = position;
    }

    /// Facing angle around the Y axis, radians.
    pub fn rotation(&self) -> Fp {
        self.rotation
    }

    /// Most recent action id applied to this unit.
    pub fn last_action_id(&self) -> i32 {
        self.last_action_id
    }

    fn face(&mut self, point: FpVec3) {
        let delta = point - self.position;
        if !delta.x.is_zero() || !delta.z.is_zero() {
            self.rotation = atan2(delta.z, delta.x);
        }
    }
}

impl SyncEntity for UnitEntity {
    fn entity_id(&self) -> i32 {
        self.entity_id
    }

    fn type_id(&self) -> i32 {
        UNIT_TYPE_ID
    }

    fn owner_id(&self) -> i32 {
        self.owner_id
    }

    fn set_identity(&mut self, entity_id: i32, owner_id: i32) {
        self.entity_id = entity_id;
        self.owner_id = owner_id;
    }

    fn position(&self) -> FpVec3 {
        self.position
    }

    fn serialize(&self, w: &mut ByteWriter<'_>) {
        w.write_i32(self.entity_id);
        w.write_i32(self.owner_id);
        w.write_vec3(self.position);
        w.write_fp(self.rotation);
        w.write_vec3(self.scale);
        w.write_vec3(self.move_target);
        w.write_fp(self.move_speed);
        w.write_u8(self.is_moving as u8);
        w.write_i32(self.last_action_id);
    }

    fn deserialize(&mut self, r: &mut ByteReader<'_>) -> Result<()> {
        self.entity_id = r.read_i32()?;
        self.owner_id = r.read_i32()?;
        self.position = r.read_vec3()?;
        self.rotation = r.read_fp()?;
        self.scale = r.read_vec3()?;
        self.move_target = r.read_vec3()?;
        self.move_speed = r.read_fp()?;
        self.is_moving = r.read_u8()? != 0;
        self.last_action_id = r.read_i32()?;
        Ok(())
    }

    fn hash(&self) -> u64 {
        // Same fields, same order as serialize()
        let mut h = FnvHasher::new();
        h.write_i32(self.entity_id);
        h.write_i32(self.owner_id);
        h.write_vec3(self.position);
        h.write_fp(self.rotation);
        h.write_vec3(self.scale);
        h.write_vec3(self.move_target);
        h.write_fp(self.move_speed);
        h.write_u8(self.is_moving as u8);
        h.write_i32(self.last_action_id);
        h.finish()
    }

    fn simulation_step(&mut self, delta_ms: u32) {
        if !self.is_moving {
            return;
        }
        let dt = Fp::from_ratio(delta_ms as i64, 1000);
        let step = self.move_speed * dt;
        self.position = self.position.move_towards(self.move_target, step);
        if self.position == self.move_target {
            self.is_moving = false;
        }
    }

    fn apply_command(&mut self, cmd: &Command) {
        match &cmd.payload {
            CommandPayload::Move { target } => {
                self.face(*target);
                self.move_target = *target;
                self.is_moving = self.position != *target;
            }
            CommandPayload::Action {
                action_id, point, ..
            } => {
                self.face(*point);
                self.last_action_id = *action_id;
            }
            CommandPayload::Empty | CommandPayload::Opaque { .. } => {}
        }
    }

    fn reset(&mut self) {
        self.position = FpVec3::ZERO;
        self.rotation = Fp::ZERO;
        self.scale = FpVec3::ONE;
        self.move_target = FpVec3::ZERO;
        self.move_speed = UNIT_DEFAULT_MOVE_SPEED;
        self.is_moving = false;
        self.last_action_id = 0;
    }
}

// =============================================================================
// TESTS
// =============================================================================
