//! Agent and obstacle configuration
//!
//! Spawn-time parameters are plain data, loadable from RON (preferred) or
//! JSON. Everything an agent needs to differ per spawn - speeds, detection
//! tuning, combat numbers, patrol route, initial behavior, target-scoring
//! policy - lives here, so the two historical enemy variants become two
//! config files instead of two class hierarchies.

use std::fs;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::senses::TargetPolicy;

/// Behavior the agent starts in when spawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpawnBehavior {
    /// Start asleep; wakes through the alert sequence
    Sleeping,
    /// Start eating; wakes through the alert sequence
    Eating,
    /// Start on the patrol route
    #[default]
    Patrol,
}

/// Locomotion tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocomotionConfig {
    /// Movement speed while patrolling (m/s)
    pub patrol_speed: f32,
    /// Movement speed while chasing (m/s)
    pub chase_speed: f32,
    /// Turn rate (radians/s)
    pub rotation_rate: f32,
    /// Default stopping tolerance for path requests (m)
    pub stopping_distance: f32,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            patrol_speed: 2.0,
            chase_speed: 4.5,
            rotation_rate: std::f32::consts::PI,
            stopping_distance: 0.3,
        }
    }
}

/// Detection tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Maximum hearing/seeing distance (m)
    pub radius: f32,
    /// Range at which even idle hum is detectable (m)
    pub ultra_close_range: f32,
    /// Minimum audible radius a source must have to register
    pub min_noise_to_detect: f32,
    /// Eye height offset for line-of-sight rays (m)
    pub eye_height: f32,
    /// How long a lost target is remembered (s)
    pub memory_duration: f32,
    /// Target scoring policy
    pub policy: TargetPolicy,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            radius: 10.0,
            ultra_close_range: 1.5,
            min_noise_to_detect: 0.1,
            eye_height: 1.6,
            memory_duration: 8.0,
            policy: TargetPolicy::default(),
        }
    }
}

/// Combat tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatConfig {
    /// Maximum distance at which an attack can start (m)
    pub attack_range: f32,
    /// Cooldown between attacks (s)
    pub attack_cooldown: f32,
    /// Damage dealt to player targets
    pub damage_player: f32,
    /// Damage dealt to NPC targets
    pub damage_npc: f32,
    /// Safeguard: maximum wait for any animation event (s)
    pub event_timeout: f32,
    /// Distance at which a wall-break swing can start (m)
    pub wall_break_range: f32,
    /// Whether this agent is able to break destructible obstacles
    pub wall_breaking: bool,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            attack_range: 2.5,
            attack_cooldown: 2.0,
            damage_player: 25.0,
            damage_npc: 40.0,
            event_timeout: 3.0,
            wall_break_range: 2.0,
            wall_breaking: true,
        }
    }
}

/// Behavior-state tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorConfig {
    /// Initial behavior at spawn
    pub spawn_behavior: SpawnBehavior,
    /// Patrol waypoints in world space (looped in order)
    pub patrol_route: Vec<Vec3>,
    /// Pause at each patrol waypoint (s)
    pub patrol_wait_time: f32,
    /// Listening time at the last known position (s)
    pub investigation_duration: f32,
    /// Interval between stuck-detection samples (s)
    pub stuck_check_interval: f32,
    /// Displacement below which a moving agent counts as stuck (m)
    pub stuck_min_displacement: f32,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            spawn_behavior: SpawnBehavior::Patrol,
            patrol_route: Vec::new(),
            patrol_wait_time: 2.0,
            investigation_duration: 4.0,
            stuck_check_interval: 0.5,
            stuck_min_displacement: 0.1,
        }
    }
}

/// Full per-spawn agent configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Locomotion tuning
    pub locomotion: LocomotionConfig,
    /// Detection tuning
    pub detection: DetectionConfig,
    /// Combat tuning
    pub combat: CombatConfig,
    /// Behavior tuning
    pub behavior: BehaviorConfig,
}

/// Destructible obstacle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleConfig {
    /// Fragments along the obstacle's width
    pub fragments_x: u32,
    /// Fragments along the obstacle's height
    pub fragments_y: u32,
    /// Base impulse magnitude per unit of fragment mass
    pub impulse_per_mass: f32,
    /// Half-angle of the randomized impulse cone (radians)
    pub impulse_cone: f32,
    /// Delay before the navigation surface rebuild (s)
    pub rebuild_delay: f32,
    /// Window after which fragment bodies are frozen (s)
    pub freeze_after: f32,
    /// Optional delay after freezing before fragments despawn (s)
    pub despawn_after: Option<f32>,
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            fragments_x: 4,
            fragments_y: 3,
            impulse_per_mass: 3.0,
            impulse_cone: 0.5,
            rebuild_delay: 0.5,
            freeze_after: 3.0,
            despawn_after: Some(10.0),
        }
    }
}

impl AgentConfig {
    /// Save the configuration to a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let ron_string = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;
        fs::write(path, ron_string).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Load a configuration from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let config: Self =
            ron::from_str(&content).map_err(|e| ConfigError::DeserializeError(e.to_string()))?;
        Ok(config)
    }

    /// Save the configuration to a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json_string = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;
        fs::write(path, json_string).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Load a configuration from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| ConfigError::DeserializeError(e.to_string()))?;
        Ok(config)
    }
}

/// Errors that can occur during config load/save
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Serialization failed
    SerializeError(String),
    /// Deserialization failed
    DeserializeError(String),
    /// File I/O failed
    IoError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SerializeError(msg) => write!(f, "serialize error: {msg}"),
            Self::DeserializeError(msg) => write!(f, "deserialize error: {msg}"),
            Self::IoError(msg) => write!(f, "io error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
