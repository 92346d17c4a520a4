//! Resumable behavior sequences
//!
//! Every "wait N seconds then do X" behavior is a small state object
//! carrying a phase and an elapsed counter, advanced by the per-frame tick.
//! A sequence does bounded work per tick and never blocks the simulation;
//! cancellation is only ever checked between ticks, at the yield points the
//! owning behavior state defines.

use glam::Vec3;
use hecs::Entity;

use crate::combat::{AnimationDriver, SIGNAL_RETURN_IDLE, SIGNAL_WAKE_UP};
use crate::core::{EventQueue, GameEvent};

/// Result of advancing a sequence by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceStatus {
    /// The sequence needs more ticks.
    Running,
    /// The sequence completed this tick.
    Finished,
}

/// Seconds the agent takes to stand up.
const WAKE_STAND_DURATION: f32 = 1.2;
/// Pause between standing and roaring.
const WAKE_PAUSE_DURATION: f32 = 0.8;
/// Roar length.
const WAKE_ROAR_DURATION: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WakePhase {
    Stand,
    Pause,
    Roar,
}

/// Multi-second wake-up: stand up, pause, then roar.
///
/// Once started, the agent commits to fully waking - losing the target
/// mid-sequence does not cancel it. Only death does, by discarding the
/// owning state.
#[derive(Debug)]
pub struct WakeUpSequence {
    phase: WakePhase,
    elapsed: f32,
    roar_played: bool,
}

impl WakeUpSequence {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: WakePhase::Stand,
            elapsed: 0.0,
            roar_played: false,
        }
    }

    /// Shortened variant for agents that are already standing: skips
    /// straight to the roar.
    #[must_use]
    pub fn roar_only() -> Self {
        Self {
            phase: WakePhase::Roar,
            elapsed: 0.0,
            roar_played: false,
        }
    }

    /// Advance the wake-up by one tick.
    pub fn tick(
        &mut self,
        dt: f32,
        animator: &mut dyn AnimationDriver,
        events: &mut EventQueue,
        agent: Entity,
        position: Vec3,
    ) -> SequenceStatus {
        self.elapsed += dt;

        match self.phase {
            WakePhase::Stand => {
                if self.elapsed >= WAKE_STAND_DURATION {
                    self.phase = WakePhase::Pause;
                    self.elapsed = 0.0;
                }
                SequenceStatus::Running
            }
            WakePhase::Pause => {
                if self.elapsed >= WAKE_PAUSE_DURATION {
                    self.phase = WakePhase::Roar;
                    self.elapsed = 0.0;
                }
                SequenceStatus::Running
            }
            WakePhase::Roar => {
                if !self.roar_played {
                    self.roar_played = true;
                    if !animator.play(SIGNAL_WAKE_UP, 0) {
                        log::warn!("agent {agent:?}: wake-up animation unavailable");
                    }
                    events.push(GameEvent::PlaySound {
                        name: "roar",
                        position: Some(position),
                        volume: 1.0,
                    });
                }
                if self.elapsed >= WAKE_ROAR_DURATION {
                    SequenceStatus::Finished
                } else {
                    SequenceStatus::Running
                }
            }
        }
    }
}

impl Default for WakeUpSequence {
    fn default() -> Self {
        Self::new()
    }
}

/// Seconds the return-to-idle posture takes.
const RETURN_DURATION: f32 = 1.5;

/// Return-to-idle posture played before resuming patrol.
#[derive(Debug)]
pub struct ReturnSequence {
    elapsed: f32,
    started: bool,
}

impl ReturnSequence {
    #[must_use]
    pub fn new() -> Self {
        Self {
            elapsed: 0.0,
            started: false,
        }
    }

    /// Advance the posture return by one tick.
    pub fn tick(&mut self, dt: f32, animator: &mut dyn AnimationDriver) -> SequenceStatus {
        if !self.started {
            self.started = true;
            // Missing animator just shortens the posture change to a wait
            let _ = animator.play(SIGNAL_RETURN_IDLE, 0);
        }

        self.elapsed += dt;
        if self.elapsed >= RETURN_DURATION {
            SequenceStatus::Finished
        } else {
            SequenceStatus::Running
        }
    }
}

impl Default for ReturnSequence {
    fn default() -> Self {
        Self::new()
    }
}
