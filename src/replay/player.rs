//! Replay Player
//!
//! Drives a recorded command log back through a simulation on the same
//! accumulator clock the engine uses, scaled by a speed multiplier. The
//! player owns pacing and position; the engine owns the simulation and
//! feeds each due tick's commands into it.
//!
//! Playback walks every tick from 0 to the recorded total, handing an
//! empty command list for ticks the log has no entry for, so the world
//! tick counter advances exactly as it did live.

use tracing::debug;

use crate::replay::data::ReplayData;
use crate::sim::command::Command;

/// Playback speed multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplaySpeed {
    /// 0.25x.
    Quarter,
    /// 0.5x.
    Half,
    /// 1x.
    #[default]
    Normal,
    /// 2x.
    Double,
    /// 4x.
    Quadruple,
}

impl ReplaySpeed {
    /// The accumulator scale factor.
    pub fn multiplier(self) -> f64 {
        match self {
            ReplaySpeed::Quarter => 0.25,
            ReplaySpeed::Half => 0.5,
            ReplaySpeed::Normal => 1.0,
            ReplaySpeed::Double => 2.0,
            ReplaySpeed::Quadruple => 4.0,
        }
    }
}

/// Plays a `ReplayData` tick by tick.
#[derive(Debug)]
pub struct ReplayPlayer {
    data: ReplayData,
    /// One past the last tick to play.
    total_ticks: i32,
    /// Next tick to play.
    next_tick: i32,
    accumulator_ms: f64,
    speed: ReplaySpeed,
    playing: bool,
    finished: bool,
}

impl ReplayPlayer {
    /// Load a recorded session, positioned at the start, paused.
    pub fn load(data: ReplayData) -> Self {
        // Trust the frozen metadata, but never cut off recorded entries.
        let total_ticks = data
            .metadata
            .total_ticks
            .max(data.last_tick().map_or(0, |t| t + 1));
        Self {
            data,
            total_ticks,
            next_tick: 0,
            accumulator_ms: 0.0,
            speed: ReplaySpeed::Normal,
            playing: false,
            finished: false,
        }
    }

    /// Begin playback from the current position.
    pub fn play(&mut self) {
        self.playing = true;
        self.finished = self.next_tick >= self.total_ticks;
    }

    /// Pause playback, keeping position.
    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Resume a paused playback.
    pub fn resume(&mut self) {
        if !self.finished {
            self.playing = true;
        }
    }

    /// Stop playback and rewind to the start.
    pub fn stop(&mut self) {
        self.playing = false;
        self.finished = false;
        self.next_tick = 0;
        self.accumulator_ms = 0.0;
    }

    /// Change playback speed.
    pub fn set_speed(&mut self, speed: ReplaySpeed) {
        self.speed = speed;
    }

    /// Current playback speed.
    pub fn speed(&self) -> ReplaySpeed {
        self.speed
    }

    /// True while the clock advances on update.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// True once the last tick has been played.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The recorded session.
    pub fn data(&self) -> &ReplayData {
        &self.data
    }

    /// The next tick to play (total_ticks when done).
    pub fn current_tick(&self) -> i32 {
        self.next_tick
    }

    /// One past the last tick of the session.
    pub fn total_ticks(&self) -> i32 {
        self.total_ticks
    }

    /// Playback position in [0, 1].
    pub fn progress(&self) -> f64 {
        if self.total_ticks <= 0 {
            return 1.0;
        }
        self.next_tick as f64 / self.total_ticks as f64
    }

    /// Advance the playback clock by `dt_seconds`, handing each due tick's
    /// commands to `sink`. Returns true exactly once, on the update that
    /// plays the final tick.
    pub fn update(&mut self, dt_seconds: f64, mut sink: impl FnMut(i32, &[Command])) -> bool {
        if !self.playing || self.finished {
            return false;
        }
        let interval = self.data.metadata.tick_interval_ms.max(1) as f64;
        self.accumulator_ms += dt_seconds * 1000.0 * self.speed.multiplier();

        while self.accumulator_ms >= interval && self.next_tick < self.total_ticks {
            let tick = self.next_tick;
            sink(tick, self.data.commands_at(tick).unwrap_or(&[]));
            self.next_tick += 1;
            self.accumulator_ms -= interval;
        }

        if self.next_tick >= self.total_ticks {
            self.playing = false;
            self.finished = true;
            debug!("replay playback finished");
            return true;
        }
        false
    }

    /// Hand every tick below `target_tick` to `sink` immediately, without
    /// pacing. Used by seeking.
    pub fn drain_until(&mut self, target_tick: i32, mut sink: impl FnMut(i32, &[Command])) {
        let target = target_tick.min(self.total_ticks);
        while self.next_tick < target {
            let tick = self.next_tick;
            sink(tick, self.data.commands_at(tick).unwrap_or(&[]));
            self.next_tick += 1;
        }
        if self.next_tick >= self.total_ticks {
            self.playing = false;
            self.finished = true;
        }
    }

    /// Reposition so the next tick played is `tick`. Clears the finished
    /// flag if ticks remain.
    pub fn rewind_to(&mut self, tick: i32) {
        self.next_tick = tick.clamp(0, self.total_ticks);
        self.accumulator_ms = 0.0;
        self.finished = self.next_tick >= self.total_ticks;
    }

    /// Tick corresponding to a progress fraction in [0, 1].
    pub fn tick_at_progress(&self, progress: f64) -> i32 {
        (progress.clamp(0.0, 1.0) * self.total_ticks as f64) as i32
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::data::{ReplayMetadata, REPLAY_CURRENT_VERSION};

    fn data(ticks: i32) -> ReplayData {
        let mut data = ReplayData::new(ReplayMetadata {
            version: REPLAY_CURRENT_VERSION,
            session_id: "s".to_string(),
            recorded_at: 0,
            duration_ms: (ticks as i64) * 50,
            total_ticks: ticks,
            player_count: 1,
            tick_interval_ms: 50,
            random_seed: 1,
        });
        for t in 0..ticks {
            data.set_tick(t, vec![Command::empty(0, t)]);
        }
        data
    }

    fn collect_update(player: &mut ReplayPlayer, dt: f64) -> (Vec<i32>, bool) {
        let mut played = Vec::new();
        let finished = player.update(dt, |t, _| played.push(t));
        (played, finished)
    }

    #[test]
    fn test_paused_until_play() {
        let mut player = ReplayPlayer::load(data(10));
        let (played, _) = collect_update(&mut player, 1.0);
        assert!(played.is_empty());

        player.play();
        let (played, _) = collect_update(&mut player, 0.1);
        assert_eq!(played, vec![0, 1]);
    }

    #[test]
    fn test_normal_speed_pacing() {
        let mut player = ReplayPlayer::load(data(100));
        player.play();

        // 50 ms per tick: 0.25 s plays 5 ticks
        let (played, finished) = collect_update(&mut player, 0.25);
        assert_eq!(played, vec![0, 1, 2, 3, 4]);
        assert!(!finished);
        assert_eq!(player.current_tick(), 5);
    }

    #[test]
    fn test_speed_multipliers() {
        let mut player = ReplayPlayer::load(data(100));
        player.play();
        player.set_speed(ReplaySpeed::Double);
        let (played, _) = collect_update(&mut player, 0.25);
        assert_eq!(played.len(), 10);

        let mut player = ReplayPlayer::load(data(100));
        player.play();
        player.set_speed(ReplaySpeed::Quarter);
        let (played, _) = collect_update(&mut player, 0.8);
        assert_eq!(played.len(), 4);
    }

    #[test]
    fn test_gap_ticks_play_empty() {
        // A log holding only tick 3 still plays ticks 0..5
        let mut sparse = ReplayData::new(data(5).metadata.clone());
        sparse.set_tick(3, vec![Command::empty(0, 3)]);
        let mut player = ReplayPlayer::load(sparse);
        player.play();

        let mut played = Vec::new();
        player.update(1.0, |t, cmds| played.push((t, cmds.len())));
        assert_eq!(
            played,
            vec![(0, 0), (1, 0), (2, 0), (3, 1), (4, 0)]
        );
    }

    #[test]
    fn test_finishes_exactly_once() {
        let mut player = ReplayPlayer::load(data(3));
        player.play();

        let (played, finished) = collect_update(&mut player, 1.0);
        assert_eq!(played, vec![0, 1, 2]);
        assert!(finished);
        assert!(player.is_finished());
        assert!(!player.is_playing());

        let (played, finished) = collect_update(&mut player, 1.0);
        assert!(played.is_empty());
        assert!(!finished);
    }

    #[test]
    fn test_pause_resume() {
        let mut player = ReplayPlayer::load(data(10));
        player.play();
        collect_update(&mut player, 0.1); // plays 0, 1
        player.pause();
        let (played, _) = collect_update(&mut player, 1.0);
        assert!(played.is_empty());

        player.resume();
        let (played, _) = collect_update(&mut player, 0.05);
        assert_eq!(played, vec![2]);
    }

    #[test]
    fn test_stop_rewinds() {
        let mut player = ReplayPlayer::load(data(10));
        player.play();
        collect_update(&mut player, 0.2);
        player.stop();
        assert_eq!(player.current_tick(), 0);

        player.play();
        let (played, _) = collect_update(&mut player, 0.05);
        assert_eq!(played, vec![0]);
    }

    #[test]
    fn test_drain_until() {
        let mut player = ReplayPlayer::load(data(10));
        let mut played = Vec::new();
        player.drain_until(7, |t, _| played.push(t));
        assert_eq!(played, vec![0, 1, 2, 3, 4, 5, 6]);
        assert_eq!(player.current_tick(), 7);
        assert!(!player.is_finished());
    }

    #[test]
    fn test_rewind_to() {
        let mut player = ReplayPlayer::load(data(10));
        player.drain_until(10, |_, _| {});
        assert!(player.is_finished());

        player.rewind_to(4);
        assert!(!player.is_finished());
        assert_eq!(player.current_tick(), 4);
    }

    #[test]
    fn test_progress() {
        let mut player = ReplayPlayer::load(data(10));
        assert_eq!(player.progress(), 0.0);
        player.drain_until(5, |_, _| {});
        assert!((player.progress() - 0.5).abs() < 1e-9);
        assert_eq!(player.tick_at_progress(0.5), 5);
        assert_eq!(player.tick_at_progress(2.0), 10);
    }
}
