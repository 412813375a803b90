//! Input Prediction
//!
//! Fills a missing (tick, player) slot from that player's recent history:
//! clone the latest observed command with the tick rewritten, or emit an
//! empty command when no history exists. The accuracy counter is pure
//! observability - the engine never changes behavior based on it.

use std::collections::{BTreeMap, VecDeque};

use crate::sim::command::Command;

/// Commands of history kept per player.
const HISTORY_LEN: usize = 5;

/// Last-value input predictor with a per-player history window.
#[derive(Debug, Default)]
pub struct InputPredictor {
    history: BTreeMap<i32, VecDeque<Command>>,
    total_predictions: u64,
    correct_predictions: u64,
}

impl InputPredictor {
    /// Create an empty predictor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an authoritative command into the player's history window.
    pub fn observe(&mut self, cmd: &Command) {
        let window = self.history.entry(cmd.player_id).or_default();
        if window.len() == HISTORY_LEN {
            window.pop_front();
        }
        window.push_back(cmd.clone());
    }

    /// Predict the command for a missing (tick, player) slot.
    pub fn predict(&mut self, player_id: i32, tick: i32) -> Command {
        self.total_predictions += 1;
        match self.history.get(&player_id).and_then(|w| w.back()) {
            Some(last) => {
                let mut cmd = last.clone();
                cmd.tick = tick;
                cmd.player_id = player_id;
                cmd
            }
            None => Command::empty(player_id, tick),
        }
    }

    /// Score a prediction against the command that later arrived.
    /// "Correct" means the kinds matched.
    pub fn record_outcome(&mut self, predicted_kind: u32, actual_kind: u32) {
        if predicted_kind == actual_kind {
            self.correct_predictions += 1;
        }
    }

    /// Fraction of scored predictions whose kind matched, in [0, 1].
    /// Observability only.
    pub fn accuracy(&self) -> f64 {
        if self.total_predictions == 0 {
            return 0.0;
        }
        self.correct_predictions as f64 / self.total_predictions as f64
    }

    /// Predictions made so far.
    pub fn total_predictions(&self) -> u64 {
        self.total_predictions
    }

    /// Forget all history and counters.
    pub fn reset(&mut self) {
        self.history.clear();
        self.total_predictions = 0;
        self.correct_predictions = 0;
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vec3::FpVec3;
    use crate::sim::command::{CommandPayload, KIND_EMPTY, KIND_MOVE};

    #[test]
    fn test_no_history_predicts_empty() {
        let mut p = InputPredictor::new();
        let cmd = p.predict(3, 42);
        assert_eq!(cmd.kind, KIND_EMPTY);
        assert_eq!(cmd.player_id, 3);
        assert_eq!(cmd.tick, 42);
    }

    #[test]
    fn test_predicts_last_value_with_rewritten_tick() {
        let mut p = InputPredictor::new();
        let target = FpVec3::from_ints(5, 0, 5);
        p.observe(&Command::move_to(1, 10, target));

        let cmd = p.predict(1, 13);
        assert_eq!(cmd.kind, KIND_MOVE);
        assert_eq!(cmd.tick, 13);
        assert_eq!(cmd.player_id, 1);
        assert_eq!(cmd.payload, CommandPayload::Move { target });
    }

    #[test]
    fn test_history_window_caps_at_five() {
        let mut p = InputPredictor::new();
        for t in 0..20 {
            p.observe(&Command::move_to(0, t, FpVec3::from_ints(t, 0, 0)));
        }
        // Most recent observation wins regardless of window churn
        let cmd = p.predict(0, 100);
        assert_eq!(cmd.payload, CommandPayload::Move {
            target: FpVec3::from_ints(19, 0, 0)
        });
        assert_eq!(p.history.get(&0).unwrap().len(), HISTORY_LEN);
    }

    #[test]
    fn test_histories_are_per_player() {
        let mut p = InputPredictor::new();
        p.observe(&Command::move_to(0, 1, FpVec3::from_ints(1, 0, 0)));

        assert_eq!(p.predict(0, 5).kind, KIND_MOVE);
        assert_eq!(p.predict(1, 5).kind, KIND_EMPTY);
    }

    #[test]
    fn test_accuracy_counter() {
        let mut p = InputPredictor::new();
        assert_eq!(p.accuracy(), 0.0);

        p.observe(&Command::move_to(0, 1, FpVec3::ZERO));
        let a = p.predict(0, 2);
        p.record_outcome(a.kind, KIND_MOVE);
        let b = p.predict(0, 3);
        p.record_outcome(b.kind, KIND_EMPTY);

        assert_eq!(p.total_predictions(), 2);
        assert!((p.accuracy() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_reset() {
        let mut p = InputPredictor::new();
        p.observe(&Command::move_to(0, 1, FpVec3::ZERO));
        p.predict(0, 2);
        p.reset();
        assert_eq!(p.total_predictions(), 0);
        assert_eq!(p.predict(0, 3).kind, KIND_EMPTY);
    }
}
