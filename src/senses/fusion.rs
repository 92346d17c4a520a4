//! Sensor fusion
//!
//! Combines hearing, line-of-sight, and liveness into one ranked candidate
//! list and tracks the currently selected target. Two scoring policies are
//! supported; the policy is part of the agent's spawn configuration, not a
//! separate implementation.

use glam::Vec3;
use hecs::Entity;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::{DetectionConfig, EventQueue, GameEvent};
use crate::ecs::{Health, Transform, World};
use crate::obstacle::ObstacleSet;
use crate::physics::{Physics, layers};

use super::{NoiseSource, Occlusion, TargetKind, has_line_of_sight, is_audible};

/// Height above a target's origin the sight ray aims at.
const TARGET_AIM_HEIGHT: f32 = 0.5;

// ============================================================================
// Scoring Policies
// ============================================================================

/// How surviving candidates are ranked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TargetPolicy {
    /// Loudest candidate wins; ties broken by distance.
    SoundPriority,
    /// Weighted score from kind, proximity, and facing angle, with a
    /// switch-hysteresis window to prevent thrashing between candidates.
    WeightedPriority(WeightedParams),
}

impl Default for TargetPolicy {
    fn default() -> Self {
        Self::SoundPriority
    }
}

/// Parameters for `TargetPolicy::WeightedPriority`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightedParams {
    /// Base priority weight for player targets
    pub player_weight: f32,
    /// Base priority weight for NPC targets
    pub npc_weight: f32,
    /// Base priority weight for noisy objects
    pub object_weight: f32,
    /// Seconds a locked target is held even if another scores higher
    pub target_switch_delay: f32,
}

impl Default for WeightedParams {
    fn default() -> Self {
        Self {
            player_weight: 1.0,
            npc_weight: 0.8,
            object_weight: 0.4,
            target_switch_delay: 1.5,
        }
    }
}

impl WeightedParams {
    fn base_weight(&self, kind: TargetKind) -> f32 {
        match kind {
            TargetKind::Player => self.player_weight,
            TargetKind::Npc => self.npc_weight,
            TargetKind::Object => self.object_weight,
        }
    }
}

/// Multiplier rewarding candidates inside the forward cone.
fn angle_factor(angle: f32) -> f32 {
    let degrees = angle.to_degrees();
    if degrees <= 45.0 {
        1.5
    } else if degrees <= 90.0 {
        1.2
    } else if degrees <= 135.0 {
        0.8
    } else {
        0.5
    }
}

// ============================================================================
// Candidate Snapshot
// ============================================================================

/// Per-tick snapshot of a detection candidate.
///
/// The agent never owns a target; it holds the entity id plus this cached
/// observation.
#[derive(Debug, Clone, Copy)]
pub struct TargetSnapshot {
    /// Candidate entity
    pub entity: Entity,
    /// Candidate kind
    pub kind: TargetKind,
    /// World position at observation time
    pub position: Vec3,
    /// Distance from the observing agent
    pub distance: f32,
    /// Audible radius at observation time
    pub noise: f32,
}

// ============================================================================
// Sensor Fusion
// ============================================================================

/// The agent's combined senses.
///
/// `current_target` is `Some` exactly while a target is actively detected;
/// `last_known_position` outlives the target and feeds investigation.
#[derive(Debug)]
pub struct Senses {
    config: DetectionConfig,
    current_target: Option<Entity>,
    last_known_position: Option<Vec3>,
    noise_at_detection: f32,
    /// Seconds since the last successful detection
    time_since_detection: f32,
    /// Seconds the current target has been locked
    lock_elapsed: f32,
}

impl Senses {
    /// Create senses from detection configuration.
    #[must_use]
    pub fn new(config: DetectionConfig) -> Self {
        Self {
            config,
            current_target: None,
            last_known_position: None,
            noise_at_detection: 0.0,
            time_since_detection: f32::INFINITY,
            lock_elapsed: 0.0,
        }
    }

    /// Whether a target is currently detected.
    #[must_use]
    pub const fn has_target(&self) -> bool {
        self.current_target.is_some()
    }

    /// The currently detected target, if any.
    #[must_use]
    pub const fn current_target(&self) -> Option<Entity> {
        self.current_target
    }

    /// Where the target was last observed. Survives target loss.
    #[must_use]
    pub const fn last_known_position(&self) -> Option<Vec3> {
        self.last_known_position
    }

    /// Audible radius of the target when it was last detected.
    #[must_use]
    pub const fn noise_level_at_detection(&self) -> f32 {
        self.noise_at_detection
    }

    /// Seconds since the last successful detection.
    #[must_use]
    pub const fn seconds_since_detection(&self) -> f32 {
        self.time_since_detection
    }

    /// Whether the remembered last-known position is still fresh enough to
    /// act on.
    #[must_use]
    pub fn remembers_target(&self) -> bool {
        self.last_known_position.is_some()
            && self.time_since_detection < self.config.memory_duration
    }

    /// Drop the current target but keep the last known position for
    /// investigation.
    pub fn clear_target(&mut self) {
        self.current_target = None;
    }

    /// Reset all detection state (used on agent reset/respawn).
    pub fn forget(&mut self) {
        self.current_target = None;
        self.last_known_position = None;
        self.noise_at_detection = 0.0;
        self.time_since_detection = f32::INFINITY;
        self.lock_elapsed = 0.0;
    }

    /// Scan the world and update the selected target.
    ///
    /// `allow_object_detection` is disabled by the brain during attacks so
    /// a clattering prop cannot steal the target mid-swing.
    pub fn tick(
        &mut self,
        world: &World,
        occlusion: &dyn Occlusion,
        events: &mut EventQueue,
        self_entity: Entity,
        pose: &Transform,
        allow_object_detection: bool,
        dt: f32,
    ) {
        self.time_since_detection += dt;
        self.lock_elapsed += dt;

        let candidates = self.scan(world, occlusion, self_entity, pose, allow_object_detection);

        let selected = match self.config.policy.clone() {
            TargetPolicy::SoundPriority => select_sound_priority(&candidates),
            TargetPolicy::WeightedPriority(params) => {
                self.select_weighted(&candidates, pose, &params)
            }
        };

        match selected {
            Some(snapshot) => {
                if self.current_target != Some(snapshot.entity) {
                    self.lock_elapsed = 0.0;
                    events.push(GameEvent::TargetAcquired {
                        agent: self_entity,
                        target: snapshot.entity,
                        kind: snapshot.kind,
                    });
                }
                self.current_target = Some(snapshot.entity);
                self.last_known_position = Some(snapshot.position);
                self.noise_at_detection = snapshot.noise;
                self.time_since_detection = 0.0;
            }
            None => {
                if self.current_target.take().is_some() {
                    events.push(GameEvent::TargetLost {
                        agent: self_entity,
                        last_known_position: self
                            .last_known_position
                            .unwrap_or(pose.position),
                    });
                }
            }
        }
    }

    /// Probe for a destructible obstacle between the agent and the target's
    /// last known position.
    ///
    /// Returns the obstacle's registry index if an intact obstacle blocks
    /// the way within `check_distance`.
    #[must_use]
    pub fn check_wall_in_path(
        &self,
        physics: &Physics,
        obstacles: &ObstacleSet,
        pose: &Transform,
        obstacle_layer: u32,
        check_distance: f32,
    ) -> Option<usize> {
        let goal = self.last_known_position?;
        let mut direction = goal - pose.position;
        direction.y = 0.0;
        if direction.length_squared() < 1e-6 {
            return None;
        }
        let direction = direction.normalize();
        let origin = pose.position + Vec3::Y * (self.config.eye_height * 0.5);

        let hit = physics.raycast(origin, direction, check_distance, obstacle_layer)?;
        let index = obstacles.find_by_collider(hit.collider)?;
        obstacles.get(index).is_intact().then_some(index)
    }

    fn scan(
        &self,
        world: &World,
        occlusion: &dyn Occlusion,
        self_entity: Entity,
        pose: &Transform,
        allow_object_detection: bool,
    ) -> SmallVec<[TargetSnapshot; 8]> {
        let mut candidates = SmallVec::new();

        for (entity, (transform, kind, health, noise)) in world
            .query::<(
                &Transform,
                &TargetKind,
                Option<&Health>,
                Option<&NoiseSource>,
            )>()
            .iter()
        {
            if entity == self_entity {
                continue;
            }
            if *kind == TargetKind::Object && !allow_object_detection {
                continue;
            }
            if !health.map_or(true, Health::is_alive) {
                continue;
            }

            let distance = pose.position.distance(transform.position);
            if distance > self.config.radius {
                continue;
            }

            let noise_radius = noise.map_or(0.0, NoiseSource::current_audible_radius);
            let audible = is_audible(
                distance,
                noise_radius,
                self.config.radius,
                self.config.ultra_close_range,
                self.config.min_noise_to_detect,
            );
            // Objects are heard, never seen
            let visible = *kind != TargetKind::Object
                && has_line_of_sight(
                    occlusion,
                    pose.position,
                    self.config.eye_height,
                    transform.position + Vec3::Y * TARGET_AIM_HEIGHT,
                    layers::SIGHT_BLOCKERS,
                );

            if !audible && !visible {
                continue;
            }

            candidates.push(TargetSnapshot {
                entity,
                kind: *kind,
                position: transform.position,
                distance,
                noise: noise_radius,
            });
        }

        candidates
    }

    fn select_weighted(
        &self,
        candidates: &[TargetSnapshot],
        pose: &Transform,
        params: &WeightedParams,
    ) -> Option<TargetSnapshot> {
        if candidates.is_empty() {
            return None;
        }

        // Hysteresis: hold the locked target while the switch window is open
        if let Some(current) = self.current_target
            && self.lock_elapsed < params.target_switch_delay
            && let Some(held) = candidates.iter().find(|c| c.entity == current)
        {
            return Some(*held);
        }

        candidates
            .iter()
            .map(|c| {
                let proximity = 1.0 - c.distance / self.config.radius;
                let score = params.base_weight(c.kind)
                    * proximity
                    * angle_factor(pose.angle_to(c.position));
                (score, c)
            })
            .max_by(|(a, _), (b, _)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(_, c)| *c)
    }
}

fn select_sound_priority(candidates: &[TargetSnapshot]) -> Option<TargetSnapshot> {
    candidates
        .iter()
        .min_by(|a, b| {
            // Descending noise, then ascending distance
            b.noise
                .partial_cmp(&a.noise)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(
                    a.distance
                        .partial_cmp(&b.distance)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
        })
        .copied()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::senses::NoOcclusion;

    fn agent_pose() -> Transform {
        Transform::from_position(Vec3::ZERO)
    }

    fn spawn_noisy(
        world: &mut World,
        kind: TargetKind,
        position: Vec3,
        noise_radius: f32,
    ) -> Entity {
        let mut noise = NoiseSource::new(noise_radius, noise_radius, noise_radius);
        noise.update(0.0, 0.0);
        world.spawn((
            Transform::from_position(position),
            kind,
            Health::new(100.0),
            noise,
        ))
    }

    fn default_senses() -> Senses {
        Senses::new(DetectionConfig::default())
    }

    #[test]
    fn test_detects_audible_target_in_radius() {
        // Target at distance 3 inside detection radius 10, audible radius 4
        let mut world = World::new();
        let mut events = EventQueue::new();
        let agent = world.spawn(());
        let target = spawn_noisy(&mut world, TargetKind::Player, Vec3::new(3.0, 0.0, 0.0), 4.0);

        let mut senses = default_senses();
        senses.tick(
            &world,
            &NoOcclusion,
            &mut events,
            agent,
            &agent_pose(),
            true,
            0.1,
        );

        assert!(senses.has_target());
        assert_eq!(senses.current_target(), Some(target));
        assert_eq!(
            senses.last_known_position(),
            Some(Vec3::new(3.0, 0.0, 0.0))
        );
        assert!((senses.noise_level_at_detection() - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_sound_priority_prefers_louder() {
        // Player (noise 2) and NPC (noise 5) both at distance 5
        let mut world = World::new();
        let mut events = EventQueue::new();
        let agent = world.spawn(());
        spawn_noisy(&mut world, TargetKind::Player, Vec3::new(5.0, 0.0, 0.0), 2.0);
        let npc = spawn_noisy(&mut world, TargetKind::Npc, Vec3::new(0.0, 0.0, 5.0), 5.0);

        let mut senses = default_senses();
        senses.tick(
            &world,
            &NoOcclusion,
            &mut events,
            agent,
            &agent_pose(),
            true,
            0.1,
        );

        assert_eq!(senses.current_target(), Some(npc));
    }

    #[test]
    fn test_no_target_preserves_last_known_position() {
        let mut world = World::new();
        let mut events = EventQueue::new();
        let agent = world.spawn(());
        let target = spawn_noisy(&mut world, TargetKind::Player, Vec3::new(3.0, 0.0, 0.0), 4.0);

        let mut senses = default_senses();
        senses.tick(
            &world,
            &NoOcclusion,
            &mut events,
            agent,
            &agent_pose(),
            true,
            0.1,
        );
        assert!(senses.has_target());

        // Target goes quiet and slips out of range
        world.despawn(target).unwrap();
        senses.tick(
            &world,
            &NoOcclusion,
            &mut events,
            agent,
            &agent_pose(),
            true,
            0.1,
        );

        assert!(!senses.has_target());
        assert_eq!(senses.current_target(), None);
        assert_eq!(
            senses.last_known_position(),
            Some(Vec3::new(3.0, 0.0, 0.0)),
            "last known position must survive target loss"
        );
    }

    #[test]
    fn test_dead_candidates_rejected() {
        let mut world = World::new();
        let mut events = EventQueue::new();
        let agent = world.spawn(());
        let corpse = spawn_noisy(&mut world, TargetKind::Npc, Vec3::new(2.0, 0.0, 0.0), 5.0);
        world.get_mut::<Health>(corpse).unwrap().damage(1000.0);

        let mut senses = default_senses();
        senses.tick(
            &world,
            &NoOcclusion,
            &mut events,
            agent,
            &agent_pose(),
            true,
            0.1,
        );

        assert!(!senses.has_target());
    }

    #[test]
    fn test_objects_skipped_when_disallowed() {
        let mut world = World::new();
        let mut events = EventQueue::new();
        let agent = world.spawn(());
        spawn_noisy(&mut world, TargetKind::Object, Vec3::new(2.0, 0.0, 0.0), 6.0);

        let mut senses = default_senses();
        senses.tick(
            &world,
            &NoOcclusion,
            &mut events,
            agent,
            &agent_pose(),
            false,
            0.1,
        );
        assert!(!senses.has_target());

        senses.tick(
            &world,
            &NoOcclusion,
            &mut events,
            agent,
            &agent_pose(),
            true,
            0.1,
        );
        assert!(senses.has_target());
    }

    #[test]
    fn test_weighted_switch_hysteresis() {
        let mut config = DetectionConfig::default();
        config.policy = TargetPolicy::WeightedPriority(WeightedParams {
            target_switch_delay: 1.0,
            ..Default::default()
        });

        let mut world = World::new();
        let mut events = EventQueue::new();
        let agent = world.spawn(());

        // A is locked first; B appears later with a better score (closer,
        // same kind, straight ahead)
        let a = spawn_noisy(&mut world, TargetKind::Npc, Vec3::new(0.0, 0.0, -8.0), 3.0);
        let mut senses = Senses::new(config);
        let pose = agent_pose();

        senses.tick(&world, &NoOcclusion, &mut events, agent, &pose, true, 0.1);
        assert_eq!(senses.current_target(), Some(a));

        let b = spawn_noisy(&mut world, TargetKind::Npc, Vec3::new(0.0, 0.0, -2.0), 3.0);

        // Within the switch window: stays locked on A
        senses.tick(&world, &NoOcclusion, &mut events, agent, &pose, true, 0.1);
        assert_eq!(
            senses.current_target(),
            Some(a),
            "must hold A inside the hysteresis window"
        );

        // After the window elapses, the better candidate wins
        for _ in 0..11 {
            senses.tick(&world, &NoOcclusion, &mut events, agent, &pose, true, 0.1);
        }
        assert_eq!(senses.current_target(), Some(b));
    }

    #[test]
    fn test_angle_factor_tiers() {
        assert_eq!(angle_factor(30f32.to_radians()), 1.5);
        assert_eq!(angle_factor(80f32.to_radians()), 1.2);
        assert_eq!(angle_factor(120f32.to_radians()), 0.8);
        assert_eq!(angle_factor(170f32.to_radians()), 0.5);
    }
}
