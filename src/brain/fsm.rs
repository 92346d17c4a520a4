//! Finite State Machine for enemy behavior
//!
//! States encapsulate behavior logic with enter/update/exit lifecycle
//! hooks. Exactly one state is active at a time, and the machine reports
//! every transition edge so the agent can log it, emit events, and feed
//! statistics.
//!
//! # Design Principles
//!
//! - **Encapsulation**: Each state owns its behavior and transition logic
//! - **Totality**: Every state returns a defined transition for every
//!   trigger it reacts to; staying put is an explicit `Transition::None`
//! - **Debuggability**: States carry a typed kind with a stable name

use std::fmt;

use super::agent::BrainCtx;

// ============================================================================
// Behavior State Kinds
// ============================================================================

/// The node of the behavior state machine an agent currently occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BehaviorState {
    /// Cycling through patrol waypoints
    Patrol,
    /// Sleeping or eating, unaware
    Passive,
    /// Committed wake-up sequence
    Alert,
    /// Actively pursuing a target
    Chase,
    /// Uninterruptible attack sequence
    Attack,
    /// Destroying an obstacle blocking the pursuit
    BreakWall,
    /// Moving to and listening at the last known position
    Investigate,
    /// Returning to idle posture before patrol resumes
    Return,
    /// Terminal: the agent died
    Dead,
}

impl BehaviorState {
    /// Stable state name for logs and events.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Patrol => "Patrol",
            Self::Passive => "Passive",
            Self::Alert => "Alert",
            Self::Chase => "Chase",
            Self::Attack => "Attack",
            Self::BreakWall => "BreakWall",
            Self::Investigate => "Investigate",
            Self::Return => "Return",
            Self::Dead => "Dead",
        }
    }

    /// Whether this state evaluates new sensor input.
    ///
    /// Attacks are uninterruptible by new detections (but not by death), so
    /// sensor fusion is skipped entirely while one runs.
    #[must_use]
    pub const fn evaluates_sensors(&self) -> bool {
        !matches!(self, Self::Attack | Self::BreakWall | Self::Dead)
    }
}

// ============================================================================
// State Trait
// ============================================================================

/// A state in the behavior machine.
///
/// Lifecycle: `enter()` once on entry, `update()` every tick while active,
/// `exit()` once on leave.
pub trait State: fmt::Debug {
    /// Which behavior node this state is.
    fn kind(&self) -> BehaviorState;

    /// Called when entering this state.
    fn enter(&mut self, _ctx: &mut BrainCtx<'_>) {}

    /// Called each tick while in this state.
    fn update(&mut self, ctx: &mut BrainCtx<'_>) -> Transition;

    /// Called when exiting this state.
    fn exit(&mut self, _ctx: &mut BrainCtx<'_>) {}
}

// ============================================================================
// Transition
// ============================================================================

/// Transition decision returned from `State::update()`.
pub enum Transition {
    /// Stay in the current state.
    None,
    /// Transition to a new state.
    To(Box<dyn State>),
}

impl Transition {
    /// Create a transition to a new state.
    pub fn to<S: State + 'static>(state: S) -> Self {
        Self::To(Box::new(state))
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "Transition::None"),
            Self::To(state) => write!(f, "Transition::To({})", state.kind().name()),
        }
    }
}

// ============================================================================
// State Machine
// ============================================================================

/// Owns the active state and drives the enter/update/exit lifecycle.
pub struct StateMachine {
    /// Current active state
    current: Box<dyn State>,
    /// Whether enter() has been called on the current state
    entered: bool,
}

impl StateMachine {
    /// Create a state machine with an initial state.
    ///
    /// The initial state's `enter()` runs on the first `update()`.
    pub fn new<S: State + 'static>(initial: S) -> Self {
        Self {
            current: Box::new(initial),
            entered: false,
        }
    }

    /// Update the state machine by one tick.
    ///
    /// Returns the `(from, to)` edge names when a transition fired.
    pub fn update(&mut self, ctx: &mut BrainCtx<'_>) -> Option<(&'static str, &'static str)> {
        if !self.entered {
            self.current.enter(ctx);
            self.entered = true;
        }

        let transition = self.current.update(ctx);

        if let Transition::To(mut new_state) = transition {
            let from = self.current.kind().name();
            let to = new_state.kind().name();

            self.current.exit(ctx);
            new_state.enter(ctx);
            self.current = new_state;
            self.entered = true;

            return Some((from, to));
        }

        None
    }

    /// Replace the current state without running lifecycle hooks.
    ///
    /// Reserved for terminal transitions (death) and resets, where the
    /// caller tears down locomotion and combat explicitly.
    pub fn replace<S: State + 'static>(&mut self, new_state: S) {
        self.current = Box::new(new_state);
        self.entered = true;
    }

    /// The kind of the active state.
    #[must_use]
    pub fn state(&self) -> BehaviorState {
        self.current.kind()
    }
}

impl fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("current", &self.current.kind().name())
            .field("entered", &self.entered)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_names_are_stable() {
        assert_eq!(BehaviorState::Patrol.name(), "Patrol");
        assert_eq!(BehaviorState::BreakWall.name(), "BreakWall");
        assert_eq!(BehaviorState::Dead.name(), "Dead");
    }

    #[test]
    fn test_sensor_suppression_states() {
        assert!(BehaviorState::Chase.evaluates_sensors());
        assert!(BehaviorState::Investigate.evaluates_sensors());
        assert!(!BehaviorState::Attack.evaluates_sensors());
        assert!(!BehaviorState::BreakWall.evaluates_sensors());
        assert!(!BehaviorState::Dead.evaluates_sensors());
    }
}
