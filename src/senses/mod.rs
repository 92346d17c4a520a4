//! Sensor fusion module
//!
//! Detection is split into small pure queries (hearing, vision) and a
//! fusion layer that scans the world, scores candidates, and tracks the
//! currently selected target.

mod fusion;
mod hearing;
mod noise;
mod vision;

pub use fusion::{Senses, TargetPolicy, TargetSnapshot, WeightedParams};
pub use hearing::is_audible;
pub use noise::NoiseSource;
pub use vision::{NoOcclusion, Occlusion, has_line_of_sight};

use serde::{Deserialize, Serialize};

/// What kind of entity a detection candidate is.
///
/// Attached as a component to every detectable entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetKind {
    /// The player character
    Player,
    /// A non-player character
    Npc,
    /// A loose prop that can emit noise
    Object,
}
