//! World State
//!
//! The ordered entity set plus the tick counter and the id allocator.
//! Entities are keyed by id in a BTreeMap, so every iteration - stepping,
//! serialization, hashing - runs in ascending entity id order. Ids are
//! monotonic and never reused, which makes id order and insertion order
//! the same thing.

use crate::core::codec::{ByteReader, ByteWriter};
use crate::core::hash::FnvHasher;
use crate::error::Result;
use crate::sim::entity::{EntityFactory, SyncEntity};
use std::collections::BTreeMap;

/// The full syncable world: entities, id allocator, tick counter.
pub struct WorldState {
    entities: BTreeMap<i32, Box<dyn SyncEntity>>,
    next_entity_id: i32,
    tick: i32,
}

impl Default for WorldState {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldState {
    /// An empty world at tick 0. Entity ids start at 1.
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            next_entity_id: 1,
            tick: 0,
        }
    }

    /// Current tick.
    pub fn tick(&self) -> i32 {
        self.tick
    }

    /// Advance the tick counter by one.
    pub(crate) fn advance_tick(&mut self) {
        self.tick += 1;
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Next id the allocator will hand out.
    pub fn next_entity_id(&self) -> i32 {
        self.next_entity_id
    }

    /// Read-only access to one entity.
    pub fn entity(&self, entity_id: i32) -> Option<&dyn SyncEntity> {
        self.entities.get(&entity_id).map(|e| e.as_ref())
    }

    /// Iterate entities in ascending id order.
    pub fn entities(&self) -> impl Iterator<Item = &dyn SyncEntity> {
        self.entities.values().map(|e| e.as_ref())
    }

    /// Mutable iteration in ascending id order (crate-internal: entities
    /// are only mutated inside the simulation boundaries).
    pub(crate) fn entities_mut(
        &mut self,
    ) -> impl Iterator<Item = &mut Box<dyn SyncEntity>> {
        self.entities.values_mut()
    }

    /// Spawn a new entity of the given type, returning its id.
    pub fn spawn(&mut self, factory: &EntityFactory, type_id: i32, owner_id: i32) -> Result<i32> {
        let mut entity = factory.create(type_id)?;
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        entity.set_identity(id, owner_id);
        self.entities.insert(id, entity);
        Ok(id)
    }

    /// Insert a pre-built entity under its own id, bumping the allocator
    /// past it. Used by snapshot restore and by hosts that construct
    /// entities directly.
    pub fn insert_entity(&mut self, entity: Box<dyn SyncEntity>) -> i32 {
        let id = entity.entity_id();
        if id >= self.next_entity_id {
            self.next_entity_id = id + 1;
        }
        self.entities.insert(id, entity);
        id
    }

    /// Remove an entity. Returns true if it existed.
    pub fn remove_entity(&mut self, entity_id: i32) -> bool {
        self.entities.remove(&entity_id).is_some()
    }

    /// Drop all entities and reset tick and allocator.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.next_entity_id = 1;
        self.tick = 0;
    }

    /// Append the snapshot encoding of the world:
    ///
    /// ```text
    /// tick:i32 | next_entity_id:i32 | count:i32 |
    ///   per entity: entity_id:i32 | type_id:i32 | data_len:i32 | data
    /// ```
    pub fn write_snapshot(&self, out: &mut Vec<u8>) {
        let mut scratch: Vec<u8> = Vec::with_capacity(128);
        let mut w = ByteWriter::new(out);
        w.write_i32(self.tick);
        w.write_i32(self.next_entity_id);
        w.write_i32(self.entities.len() as i32);
        for (id, entity) in &self.entities {
            scratch.clear();
            entity.serialize(&mut ByteWriter::new(&mut scratch));
            w.write_i32(*id);
            w.write_i32(entity.type_id());
            w.write_i32(scratch.len() as i32);
            w.write_bytes(&scratch);
        }
    }

    /// Restore the world from snapshot bytes.
    ///
    /// Entities present in the snapshot are updated in place or recreated
    /// through the factory; entities absent from the snapshot are removed;
    /// tick and allocator are restored verbatim. The bytes are validated
    /// structurally before any mutation happens.
    pub fn restore_from_snapshot(&mut self, bytes: &[u8], factory: &EntityFactory) -> Result<()> {
        // Validation pass: the world is untouched until the layout parses.
        let mut r = ByteReader::new(bytes);
        let tick = r.read_i32()?;
        let next_entity_id = r.read_i32()?;
        let count = r.read_count()?;

        let mut entries: Vec<(i32, i32, &[u8])> = Vec::with_capacity(count);
        for _ in 0..count {
            let entity_id = r.read_i32()?;
            let type_id = r.read_i32()?;
            let len = r.read_count()?;
            let data = r.read_bytes(len)?;
            entries.push((entity_id, type_id, data));
        }

        // Apply pass.
        let mut listed: Vec<i32> = Vec::with_capacity(count);
        for (entity_id, type_id, data) in entries {
            listed.push(entity_id);
            match self.entities.get_mut(&entity_id) {
                Some(existing) => {
                    existing.deserialize(&mut ByteReader::new(data))?;
                }
                None => {
                    let mut fresh = factory.create(type_id)?;
                    fresh.deserialize(&mut ByteReader::new(data))?;
                    self.entities.insert(entity_id, fresh);
                }
            }
        }

        // Entities that were present but are not listed get removed.
        listed.sort_unstable();
        self.entities
            .retain(|id, _| listed.binary_search(id).is_ok());

        self.tick = tick;
        self.next_entity_id = next_entity_id;
        Ok(())
    }

    /// Content hash: FNV-1a over (tick, count, each entity hash ascending
    /// by entity id). Ascending iteration is the BTreeMap's order, the
    /// sole safeguard against iteration-order nondeterminism.
    pub fn hash(&self) -> u64 {
        let mut h = FnvHasher::new();
        h.write_i32(self.tick);
        h.write_i32(self.entities.len() as i32);
        for entity in self.entities.values() {
            h.write_u64(entity.hash());
        }
        h.finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
