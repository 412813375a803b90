//! Snapshots and the Snapshot Ring
//!
//! A snapshot is the world's deterministic serialization at a known tick;
//! the ring is the bounded, tick-keyed history the engine rolls back into.
//! Eviction follows insertion order, so a re-saved tick keeps its original
//! slot in the eviction queue.

use std::collections::{BTreeMap, VecDeque};

/// Serialized world state at a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Tick the world was at when captured (pre-execution of that tick).
    pub tick: i32,
    /// Snapshot encoding as produced by `WorldState::write_snapshot`.
    pub bytes: Vec<u8>,
}

/// Bounded tick-keyed snapshot history.
#[derive(Debug, Default)]
pub struct SnapshotRing {
    max_snapshots: usize,
    by_tick: BTreeMap<i32, Snapshot>,
    order: VecDeque<i32>,
}

impl SnapshotRing {
    /// Ring holding at most `max_snapshots` entries.
    pub fn new(max_snapshots: usize) -> Self {
        Self {
            max_snapshots,
            by_tick: BTreeMap::new(),
            order: VecDeque::with_capacity(max_snapshots),
        }
    }

    /// Store a snapshot. A snapshot for an already-present tick replaces
    /// the old bytes in place; otherwise the oldest insertion is evicted
    /// once the ring is full.
    pub fn save(&mut self, snapshot: Snapshot) {
        let tick = snapshot.tick;
        if self.by_tick.insert(tick, snapshot).is_none() {
            self.order.push_back(tick);
            while self.order.len() > self.max_snapshots {
                if let Some(evicted) = self.order.pop_front() {
                    self.by_tick.remove(&evicted);
                }
            }
        }
    }

    /// Exact-tick lookup.
    pub fn get(&self, tick: i32) -> Option<&Snapshot> {
        self.by_tick.get(&tick)
    }

    /// The newest snapshot at or before `tick`.
    pub fn nearest_at_or_before(&self, tick: i32) -> Option<&Snapshot> {
        self.by_tick.range(..=tick).next_back().map(|(_, s)| s)
    }

    /// Drop all snapshots strictly after `tick`.
    pub fn clear_after(&mut self, tick: i32) {
        let _dropped = self.by_tick.split_off(&(tick.saturating_add(1)));
        self.order.retain(|t| *t <= tick);
    }

    /// Drop everything.
    pub fn clear_all(&mut self) {
        self.by_tick.clear();
        self.order.clear();
    }

    /// Number of stored snapshots.
    pub fn len(&self) -> usize {
        self.by_tick.len()
    }

    /// True when no snapshot is stored.
    pub fn is_empty(&self) -> bool {
        self.by_tick.is_empty()
    }

    /// Smallest stored tick.
    pub fn oldest_tick(&self) -> Option<i32> {
        self.by_tick.keys().next().copied()
    }

    /// Largest stored tick.
    pub fn newest_tick(&self) -> Option<i32> {
        self.by_tick.keys().next_back().copied()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(tick: i32) -> Snapshot {
        Snapshot {
            tick,
            bytes: vec![tick as u8],
        }
    }

    #[test]
    fn test_save_get() {
        let mut ring = SnapshotRing::new(4);
        ring.save(snap(0));
        ring.save(snap(5));

        assert_eq!(ring.len(), 2);
        assert_eq!(ring.get(5).unwrap().tick, 5);
        assert!(ring.get(3).is_none());
    }

    #[test]
    fn test_eviction_is_insertion_order() {
        let mut ring = SnapshotRing::new(3);
        for t in [0, 5, 10, 15, 20] {
            ring.save(snap(t));
        }
        assert_eq!(ring.len(), 3);
        assert!(ring.get(0).is_none());
        assert!(ring.get(5).is_none());
        assert_eq!(ring.oldest_tick(), Some(10));
        assert_eq!(ring.newest_tick(), Some(20));
    }

    #[test]
    fn test_resave_replaces_in_place() {
        let mut ring = SnapshotRing::new(2);
        ring.save(snap(0));
        ring.save(snap(5));
        ring.save(Snapshot {
            tick: 0,
            bytes: vec![99],
        });

        // Still two entries, tick 0 updated, nothing evicted
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.get(0).unwrap().bytes, vec![99]);

        // The next new tick still evicts tick 0 first (original slot kept)
        ring.save(snap(10));
        assert!(ring.get(0).is_none());
        assert!(ring.get(5).is_some());
    }

    #[test]
    fn test_nearest_at_or_before() {
        let mut ring = SnapshotRing::new(8);
        for t in [0, 5, 10, 15] {
            ring.save(snap(t));
        }

        assert_eq!(ring.nearest_at_or_before(15).unwrap().tick, 15);
        assert_eq!(ring.nearest_at_or_before(14).unwrap().tick, 10);
        assert_eq!(ring.nearest_at_or_before(7).unwrap().tick, 5);
        assert_eq!(ring.nearest_at_or_before(0).unwrap().tick, 0);
        assert!(ring.nearest_at_or_before(-1).is_none());
    }

    #[test]
    fn test_clear_after() {
        let mut ring = SnapshotRing::new(8);
        for t in [0, 5, 10, 15] {
            ring.save(snap(t));
        }
        ring.clear_after(10);

        assert_eq!(ring.len(), 3);
        assert!(ring.get(15).is_none());
        assert_eq!(ring.newest_tick(), Some(10));

        // The eviction queue forgot tick 15 as well: filling the ring now
        // evicts 0, not a ghost entry.
        for t in [20, 25, 30, 35, 40] {
            ring.save(snap(t));
        }
        assert_eq!(ring.len(), 8);
        assert!(ring.get(0).is_none());
        assert!(ring.get(5).is_some());
    }

    #[test]
    fn test_clear_all() {
        let mut ring = SnapshotRing::new(4);
        ring.save(snap(0));
        ring.clear_all();
        assert!(ring.is_empty());
        assert_eq!(ring.nearest_at_or_before(100), None);
    }
}
