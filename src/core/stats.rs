//! Simulation statistics
//!
//! Lightweight counters for debugging agent behavior: ticks stepped, time
//! spent per behavior state, transition counts.

use rustc_hash::FxHashMap;

/// Per-agent behavior statistics tracker.
#[derive(Debug, Default)]
pub struct BehaviorStats {
    /// Seconds accumulated per state name
    state_time: FxHashMap<&'static str, f32>,
    /// Transition counts per (from, to) edge
    transitions: FxHashMap<(&'static str, &'static str), u32>,
    /// Total ticks recorded
    total_ticks: u64,
}

impl BehaviorStats {
    /// Create a new stats tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a tick spent in the given state.
    pub fn record_tick(&mut self, state: &'static str, dt: f32) {
        self.total_ticks += 1;
        *self.state_time.entry(state).or_insert(0.0) += dt;
    }

    /// Record a state transition.
    pub fn record_transition(&mut self, from: &'static str, to: &'static str) {
        *self.transitions.entry((from, to)).or_insert(0) += 1;
    }

    /// Seconds accumulated in a state.
    #[must_use]
    pub fn time_in(&self, state: &str) -> f32 {
        self.state_time
            .iter()
            .find(|(name, _)| **name == state)
            .map_or(0.0, |(_, t)| *t)
    }

    /// Number of times a specific transition fired.
    #[must_use]
    pub fn transition_count(&self, from: &str, to: &str) -> u32 {
        self.transitions
            .iter()
            .find(|((f, t), _)| *f == from && *t == to)
            .map_or(0, |(_, count)| *count)
    }

    /// Total ticks recorded.
    #[must_use]
    pub const fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Reset all counters.
    pub fn reset(&mut self) {
        self.state_time.clear();
        self.transitions.clear();
        self.total_ticks = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_accumulate() {
        let mut stats = BehaviorStats::new();

        stats.record_tick("Patrol", 0.1);
        stats.record_tick("Patrol", 0.1);
        stats.record_tick("Chase", 0.1);
        stats.record_transition("Patrol", "Chase");

        assert!((stats.time_in("Patrol") - 0.2).abs() < 1e-6);
        assert_eq!(stats.transition_count("Patrol", "Chase"), 1);
        assert_eq!(stats.transition_count("Chase", "Patrol"), 0);
        assert_eq!(stats.total_ticks(), 3);
    }

    #[test]
    fn test_stats_reset() {
        let mut stats = BehaviorStats::new();
        stats.record_tick("Chase", 1.0);
        stats.reset();

        assert_eq!(stats.total_ticks(), 0);
        assert_eq!(stats.time_in("Chase"), 0.0);
    }
}
