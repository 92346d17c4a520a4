//! Autonomous pursuit-enemy simulation core
//!
//! This crate provides:
//! - Sensor fusion (hearing, line-of-sight, liveness) with pluggable
//!   target-scoring policies
//! - A cooperative finite-state-machine behavior controller
//! - A pathfinding-driven locomotion wrapper with stuck recovery
//! - An attack/obstacle-destruction sequencer synchronized to external
//!   animation events
//!
//! Rendering, audio playback, and real engine integrations stay outside;
//! the core consumes them through narrow traits (`NavProvider`,
//! `Occlusion`, `AnimationDriver`) and fire-and-forget events.

pub mod brain;
pub mod combat;
pub mod core;
pub mod ecs;
pub mod motor;
pub mod nav;
pub mod obstacle;
pub mod physics;
pub mod senses;
pub mod sim;

// Re-exports for convenience
pub use glam;
pub use hecs;
pub use rapier3d;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::brain::{Agent, BehaviorState};
    pub use crate::combat::{AnimEvent, AnimationDriver, SignalTable, TimedAnimator};
    pub use crate::core::{
        AgentConfig, EventQueue, GameEvent, ObstacleConfig, SpawnBehavior, TickClock,
    };
    pub use crate::ecs::{Health, Name, Transform, World};
    pub use crate::motor::Motor;
    pub use crate::nav::{GridNav, NavGrid, NavProvider};
    pub use crate::obstacle::{DestructibleObstacle, ObstacleSet};
    pub use crate::physics::{Physics, layers};
    pub use crate::senses::{NoiseSource, Senses, TargetKind, TargetPolicy};
    pub use crate::sim::Simulation;
    pub use glam::{Quat, Vec3};
}
