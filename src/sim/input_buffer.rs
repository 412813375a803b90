//! Input Buffer
//!
//! Per-(tick, player) command store with a retention window. Both levels
//! are BTreeMaps so every iteration is sorted: ticks ascending, and within
//! a tick, player ids ascending - the order the simulation applies
//! commands in, which is a determinism requirement.

use std::collections::BTreeMap;

use crate::sim::command::Command;

/// `(tick, player_id) -> Command` store.
///
/// Re-adding to an occupied slot overwrites: the latest arrival is
/// authoritative (relevant when a peer resends with the same tick/player).
#[derive(Debug, Default)]
pub struct InputBuffer {
    ticks: BTreeMap<i32, BTreeMap<i32, Command>>,
    oldest_tick: Option<i32>,
    newest_tick: Option<i32>,
}

impl InputBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a command at its (tick, player) slot, overwriting any
    /// previous occupant.
    pub fn add(&mut self, cmd: Command) {
        let tick = cmd.tick;
        self.ticks
            .entry(tick)
            .or_default()
            .insert(cmd.player_id, cmd);

        // Bounds track incrementally on insert
        self.oldest_tick = Some(match self.oldest_tick {
            Some(t) if t <= tick => t,
            _ => tick,
        });
        self.newest_tick = Some(match self.newest_tick {
            Some(t) if t >= tick => t,
            _ => tick,
        });
    }

    /// Look up one slot.
    pub fn get(&self, tick: i32, player_id: i32) -> Option<&Command> {
        self.ticks.get(&tick)?.get(&player_id)
    }

    /// Iterate a tick's commands in ascending player order.
    pub fn get_all(&self, tick: i32) -> impl Iterator<Item = &Command> {
        self.ticks.get(&tick).into_iter().flat_map(|m| m.values())
    }

    /// Clone a tick's commands into a caller-owned list (ascending player
    /// order). The list is cleared first; reusing one vector across ticks
    /// keeps this allocation-free after warmup.
    pub fn as_list(&self, tick: i32, out: &mut Vec<Command>) {
        out.clear();
        if let Some(m) = self.ticks.get(&tick) {
            out.extend(m.values().cloned());
        }
    }

    /// True if the (tick, player) slot is filled.
    pub fn has_slot(&self, tick: i32, player_id: i32) -> bool {
        self.get(tick, player_id).is_some()
    }

    /// True iff exactly the players `0..player_count` are present at the
    /// tick.
    pub fn has_all(&self, tick: i32, player_count: usize) -> bool {
        match self.ticks.get(&tick) {
            Some(m) => {
                m.len() == player_count
                    && (0..player_count as i32).all(|p| m.contains_key(&p))
            }
            None => player_count == 0,
        }
    }

    /// Number of commands stored at a tick.
    pub fn count_at(&self, tick: i32) -> usize {
        self.ticks.get(&tick).map_or(0, |m| m.len())
    }

    /// Total number of stored commands.
    pub fn len(&self) -> usize {
        self.ticks.values().map(|m| m.len()).sum()
    }

    /// True if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Drop every tick strictly before `tick`.
    pub fn clear_before(&mut self, tick: i32) {
        self.ticks = self.ticks.split_off(&tick);
        self.recompute_bounds();
    }

    /// Drop every tick strictly after `tick`.
    pub fn clear_after(&mut self, tick: i32) {
        // split_off keeps keys >= the boundary in the returned map
        let _dropped = self.ticks.split_off(&(tick.saturating_add(1)));
        self.recompute_bounds();
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.ticks.clear();
        self.oldest_tick = None;
        self.newest_tick = None;
    }

    /// Smallest tick with at least one command.
    pub fn oldest_tick(&self) -> Option<i32> {
        self.oldest_tick
    }

    /// Largest tick with at least one command.
    pub fn newest_tick(&self) -> Option<i32> {
        self.newest_tick
    }

    /// Bounds by scan, used after bulk clears.
    fn recompute_bounds(&mut self) {
        self.oldest_tick = self.ticks.keys().next().copied();
        self.newest_tick = self.ticks.keys().next_back().copied();
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vec3::FpVec3;
    use crate::sim::command::KIND_MOVE;

    fn cmd(tick: i32, player: i32) -> Command {
        Command::empty(player, tick)
    }

    #[test]
    fn test_add_get() {
        let mut buf = InputBuffer::new();
        buf.add(cmd(5, 0));
        buf.add(cmd(5, 1));

        assert!(buf.has_slot(5, 0));
        assert!(buf.has_slot(5, 1));
        assert!(!buf.has_slot(5, 2));
        assert!(!buf.has_slot(6, 0));
        assert_eq!(buf.get(5, 0).unwrap().player_id, 0);
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_overwrite_same_slot() {
        let mut buf = InputBuffer::new();
        buf.add(cmd(5, 0));
        buf.add(Command::move_to(0, 5, FpVec3::from_ints(1, 0, 0)));

        // Latest arrival wins
        assert_eq!(buf.count_at(5), 1);
        assert_eq!(buf.get(5, 0).unwrap().kind, KIND_MOVE);
    }

    #[test]
    fn test_player_order_within_tick() {
        let mut buf = InputBuffer::new();
        buf.add(cmd(3, 2));
        buf.add(cmd(3, 0));
        buf.add(cmd(3, 1));

        let order: Vec<i32> = buf.get_all(3).map(|c| c.player_id).collect();
        assert_eq!(order, vec![0, 1, 2]);

        let mut list = Vec::new();
        buf.as_list(3, &mut list);
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].player_id, 0);
        assert_eq!(list[2].player_id, 2);
    }

    #[test]
    fn test_as_list_clears_previous_contents() {
        let mut buf = InputBuffer::new();
        buf.add(cmd(1, 0));
        let mut list = vec![cmd(99, 9)];
        buf.as_list(1, &mut list);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].tick, 1);
        buf.as_list(2, &mut list);
        assert!(list.is_empty());
    }

    #[test]
    fn test_has_all() {
        let mut buf = InputBuffer::new();
        buf.add(cmd(10, 0));
        assert!(!buf.has_all(10, 2));
        buf.add(cmd(10, 1));
        assert!(buf.has_all(10, 2));

        // A stray extra player breaks the "exactly" requirement
        buf.add(cmd(10, 5));
        assert!(!buf.has_all(10, 2));

        // Wrong id set of the right size fails too
        buf.add(cmd(11, 1));
        buf.add(cmd(11, 2));
        assert!(!buf.has_all(11, 2));

        assert!(buf.has_all(12, 0));
    }

    #[test]
    fn test_bounds_incremental() {
        let mut buf = InputBuffer::new();
        assert_eq!(buf.oldest_tick(), None);
        assert_eq!(buf.newest_tick(), None);

        buf.add(cmd(10, 0));
        buf.add(cmd(5, 0));
        buf.add(cmd(20, 0));

        assert_eq!(buf.oldest_tick(), Some(5));
        assert_eq!(buf.newest_tick(), Some(20));
    }

    #[test]
    fn test_clear_before() {
        let mut buf = InputBuffer::new();
        for t in 0..10 {
            buf.add(cmd(t, 0));
        }
        buf.clear_before(4);

        assert!(!buf.has_slot(3, 0));
        assert!(buf.has_slot(4, 0));
        assert_eq!(buf.oldest_tick(), Some(4));
        assert_eq!(buf.newest_tick(), Some(9));
        assert_eq!(buf.len(), 6);
    }

    #[test]
    fn test_clear_after() {
        let mut buf = InputBuffer::new();
        for t in 0..10 {
            buf.add(cmd(t, 0));
        }
        buf.clear_after(6);

        assert!(buf.has_slot(6, 0));
        assert!(!buf.has_slot(7, 0));
        assert_eq!(buf.oldest_tick(), Some(0));
        assert_eq!(buf.newest_tick(), Some(6));
    }

    #[test]
    fn test_clear() {
        let mut buf = InputBuffer::new();
        buf.add(cmd(1, 0));
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.oldest_tick(), None);
        assert_eq!(buf.newest_tick(), None);
    }

    #[test]
    fn test_bounds_after_mixed_operations() {
        // Property 6: bounds always match the min/max of remaining keys
        let mut buf = InputBuffer::new();
        let ops: &[(&str, i32)] = &[
            ("add", 50),
            ("add", 10),
            ("add", 90),
            ("before", 20),
            ("add", 15),
            ("after", 60),
            ("add", 55),
            ("before", 55),
        ];
        for (op, t) in ops {
            match *op {
                "add" => buf.add(cmd(*t, 0)),
                "before" => buf.clear_before(*t),
                "after" => buf.clear_after(*t),
                _ => unreachable!(),
            }
            let keys: Vec<i32> = (0..200).filter(|k| buf.has_slot(*k, 0)).collect();
            assert_eq!(buf.oldest_tick(), keys.first().copied());
            assert_eq!(buf.newest_tick(), keys.last().copied());
        }
    }
}
