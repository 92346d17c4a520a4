//! Core simulation module
//!
//! Time stepping, configuration, events, and statistics

mod config;
mod events;
mod stats;
mod time;

pub use config::{
    AgentConfig, BehaviorConfig, CombatConfig, ConfigError, DetectionConfig, LocomotionConfig,
    ObstacleConfig, SpawnBehavior,
};
pub use events::{EventQueue, GameEvent};
pub use stats::BehaviorStats;
pub use time::{TickClock, Timer};
