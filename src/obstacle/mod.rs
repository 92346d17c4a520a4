//! Destructible obstacles
//!
//! A wall is intact until `explode` is invoked by the combat controller;
//! the transition is irreversible. Destruction is a two-phase sequence:
//! colliders are disabled synchronously on the tick of the impact, while
//! the navigation-surface rebuild runs on a later tick, after the fragment
//! physics has had time to settle. Fragments are frozen after a bounded
//! simulation window and can optionally despawn later.

use glam::{Quat, Vec3};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::core::{EventQueue, GameEvent, ObstacleConfig, Timer};
use crate::nav::NavGrid;
use crate::physics::{ColliderHandle, Physics, RigidBodyHandle, layers};

/// Density used for fragment colliders (kg/m^3).
const FRAGMENT_DENSITY: f32 = 300.0;

/// One physical chunk of a destroyed obstacle.
#[derive(Debug, Clone, Copy)]
struct Fragment {
    body: RigidBodyHandle,
}

#[derive(Debug)]
enum ObstacleState {
    Intact {
        body: RigidBodyHandle,
        collider: ColliderHandle,
    },
    Destroyed {
        fragments: Vec<Fragment>,
        /// Pending navigation-surface rebuild; `None` once done
        rebuild: Option<Timer>,
        /// Pending fragment freeze; `None` once done
        freeze: Option<Timer>,
        /// Pending fragment cleanup; `None` once done or not configured
        despawn: Option<Timer>,
    },
}

/// A destructible wall blocking a navigable route.
#[derive(Debug)]
pub struct DestructibleObstacle {
    config: ObstacleConfig,
    center: Vec3,
    half_extents: Vec3,
    state: ObstacleState,
}

impl DestructibleObstacle {
    /// Spawn an intact obstacle: fixed body + collider on the obstacle
    /// layer, and an unwalkable footprint stamped into the nav surface.
    pub fn spawn(
        physics: &mut Physics,
        nav: &mut NavGrid,
        config: ObstacleConfig,
        center: Vec3,
        half_extents: Vec3,
    ) -> Self {
        let body = physics.create_fixed_body(center, Quat::IDENTITY);
        let collider =
            physics.add_box_collider(body, half_extents, 1.0, layers::OBSTACLE, layers::ALL);
        physics.refresh_queries();

        nav.stamp_region(center - half_extents, center + half_extents, false);

        Self {
            config,
            center,
            half_extents,
            state: ObstacleState::Intact { body, collider },
        }
    }

    /// Obstacle center in world space.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.center
    }

    /// Whether the obstacle still stands.
    #[must_use]
    pub const fn is_intact(&self) -> bool {
        matches!(self.state, ObstacleState::Intact { .. })
    }

    /// Collider of the intact obstacle, used to resolve ray hits back to
    /// the registry.
    #[must_use]
    pub fn intact_collider(&self) -> Option<ColliderHandle> {
        match &self.state {
            ObstacleState::Intact { collider, .. } => Some(*collider),
            ObstacleState::Destroyed { .. } => None,
        }
    }

    /// Number of live fragments.
    #[must_use]
    pub fn fragment_count(&self) -> usize {
        match &self.state {
            ObstacleState::Intact { .. } => 0,
            ObstacleState::Destroyed { fragments, .. } => fragments.len(),
        }
    }

    /// Destroy the obstacle.
    ///
    /// Disables the intact collider set synchronously, spawns fragments
    /// with an outward impulse randomized within a cone around
    /// `impact_direction`, and schedules the surface rebuild, fragment
    /// freeze, and optional despawn. Idempotent: a second call is a no-op
    /// and returns false.
    pub fn explode(
        &mut self,
        physics: &mut Physics,
        rng: &mut ChaCha8Rng,
        impact_point: Vec3,
        impact_direction: Vec3,
    ) -> bool {
        let (body, collider) = match &self.state {
            ObstacleState::Intact { body, collider } => (*body, *collider),
            ObstacleState::Destroyed { .. } => {
                log::debug!("obstacle at {:?}: already destroyed", self.center);
                return false;
            }
        };

        // Phase one, synchronous: the intact collider set goes away now so
        // the nav rebuild never observes it half-disabled
        physics.set_collider_enabled(collider, false);
        physics.remove_body(body);

        let fragments = self.spawn_fragments(physics, rng, impact_point, impact_direction);
        physics.refresh_queries();

        let despawn = self
            .config
            .despawn_after
            .map(|delay| Timer::new(self.config.freeze_after + delay));

        self.state = ObstacleState::Destroyed {
            fragments,
            rebuild: Some(Timer::new(self.config.rebuild_delay)),
            freeze: Some(Timer::new(self.config.freeze_after)),
            despawn,
        };

        log::info!("obstacle at {:?}: destroyed", self.center);
        true
    }

    /// Advance destruction bookkeeping: surface rebuild, fragment freeze,
    /// fragment despawn.
    pub fn update(
        &mut self,
        physics: &mut Physics,
        nav: &mut NavGrid,
        events: &mut EventQueue,
        dt: f32,
    ) {
        let ObstacleState::Destroyed {
            fragments,
            rebuild,
            freeze,
            despawn,
        } = &mut self.state
        else {
            return;
        };

        if let Some(timer) = rebuild {
            timer.tick(dt);
            if timer.is_finished() {
                let version = nav.rebuild_region(
                    self.center - self.half_extents,
                    self.center + self.half_extents,
                    true,
                );
                events.push(GameEvent::NavSurfaceRebuilt { version });
                log::debug!("obstacle at {:?}: nav surface rebuilt", self.center);
                *rebuild = None;
            }
        }

        if let Some(timer) = freeze {
            timer.tick(dt);
            if timer.is_finished() {
                for fragment in fragments.iter() {
                    physics.freeze_body(fragment.body);
                }
                *freeze = None;
            }
        }

        if let Some(timer) = despawn {
            timer.tick(dt);
            if timer.is_finished() {
                for fragment in fragments.drain(..) {
                    physics.remove_body(fragment.body);
                }
                physics.refresh_queries();
                *despawn = None;
            }
        }
    }

    fn spawn_fragments(
        &self,
        physics: &mut Physics,
        rng: &mut ChaCha8Rng,
        _impact_point: Vec3,
        impact_direction: Vec3,
    ) -> Vec<Fragment> {
        let nx = self.config.fragments_x.max(1);
        let ny = self.config.fragments_y.max(1);
        let fragment_half = Vec3::new(
            self.half_extents.x / nx as f32,
            self.half_extents.y / ny as f32,
            self.half_extents.z,
        );

        let base_direction = impact_direction.normalize_or_zero();
        let mut fragments = Vec::with_capacity((nx * ny) as usize);

        for iy in 0..ny {
            for ix in 0..nx {
                let offset = Vec3::new(
                    -self.half_extents.x + (2.0 * ix as f32 + 1.0) * fragment_half.x,
                    -self.half_extents.y + (2.0 * iy as f32 + 1.0) * fragment_half.y,
                    0.0,
                );
                let body = physics.create_dynamic_body(self.center + offset, Quat::IDENTITY);
                // Fragments never collide with enemy agents
                physics.add_box_collider(
                    body,
                    fragment_half * 0.9,
                    FRAGMENT_DENSITY,
                    layers::FRAGMENT,
                    layers::ALL & !layers::ENEMY,
                );

                // Outward impulse in a cone around the blow direction,
                // magnitude proportional to fragment mass
                let spread = self.config.impulse_cone;
                let yaw = rng.gen_range(-spread..=spread);
                let pitch = rng.gen_range(-spread..=spread);
                let direction = (Quat::from_rotation_y(yaw)
                    * Quat::from_rotation_x(pitch)
                    * base_direction)
                    .normalize_or_zero();
                let mass = physics.get_mass(body).unwrap_or(1.0);
                physics.apply_impulse(body, direction * self.config.impulse_per_mass * mass);

                fragments.push(Fragment { body });
            }
        }

        fragments
    }
}

/// Registry of destructible obstacles in the level.
///
/// Indices are stable; senses resolve ray hits back to obstacles through
/// `find_by_collider`.
#[derive(Debug, Default)]
pub struct ObstacleSet {
    obstacles: Vec<DestructibleObstacle>,
}

impl ObstacleSet {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an obstacle and return its stable index.
    pub fn push(&mut self, obstacle: DestructibleObstacle) -> usize {
        self.obstacles.push(obstacle);
        self.obstacles.len() - 1
    }

    /// Get an obstacle by index. Panics on a bad index.
    #[must_use]
    pub fn get(&self, index: usize) -> &DestructibleObstacle {
        &self.obstacles[index]
    }

    /// Get an obstacle by index, if it exists.
    #[must_use]
    pub fn try_get(&self, index: usize) -> Option<&DestructibleObstacle> {
        self.obstacles.get(index)
    }

    /// Get an obstacle mutably by index, if it exists.
    pub fn try_get_mut(&mut self, index: usize) -> Option<&mut DestructibleObstacle> {
        self.obstacles.get_mut(index)
    }

    /// Number of registered obstacles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    /// Resolve an intact obstacle from one of its colliders.
    #[must_use]
    pub fn find_by_collider(&self, collider: ColliderHandle) -> Option<usize> {
        self.obstacles
            .iter()
            .position(|o| o.intact_collider() == Some(collider))
    }

    /// Advance destruction bookkeeping for every obstacle.
    pub fn update_all(
        &mut self,
        physics: &mut Physics,
        nav: &mut NavGrid,
        events: &mut EventQueue,
        dt: f32,
    ) {
        for obstacle in &mut self.obstacles {
            obstacle.update(physics, nav, events, dt);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn setup() -> (Physics, NavGrid, ChaCha8Rng, DestructibleObstacle) {
        let mut physics = Physics::new();
        let mut nav = NavGrid::new(20, 20, 1.0);
        let rng = ChaCha8Rng::seed_from_u64(11);
        let obstacle = DestructibleObstacle::spawn(
            &mut physics,
            &mut nav,
            ObstacleConfig::default(),
            Vec3::new(10.0, 1.0, 10.0),
            Vec3::new(2.0, 1.0, 0.5),
        );
        (physics, nav, rng, obstacle)
    }

    #[test]
    fn test_spawn_blocks_nav_surface() {
        let (_physics, nav, _rng, obstacle) = setup();

        assert!(obstacle.is_intact());
        assert!(!nav.is_walkable_world(Vec3::new(10.0, 0.0, 10.0)));
        assert!(nav.is_walkable_world(Vec3::new(2.0, 0.0, 2.0)));
    }

    #[test]
    fn test_explode_is_idempotent() {
        let (mut physics, _nav, mut rng, mut obstacle) = setup();

        let destroyed = obstacle.explode(&mut physics, &mut rng, obstacle.position(), Vec3::X);
        assert!(destroyed);
        assert!(!obstacle.is_intact());

        let expected = (ObstacleConfig::default().fragments_x
            * ObstacleConfig::default().fragments_y) as usize;
        assert_eq!(obstacle.fragment_count(), expected);

        // Second call must not double-spawn fragments
        let destroyed_again =
            obstacle.explode(&mut physics, &mut rng, obstacle.position(), Vec3::X);
        assert!(!destroyed_again);
        assert_eq!(obstacle.fragment_count(), expected);
    }

    #[test]
    fn test_rebuild_happens_after_delay() {
        let (mut physics, mut nav, mut rng, mut obstacle) = setup();
        let mut events = EventQueue::new();

        obstacle.explode(&mut physics, &mut rng, obstacle.position(), Vec3::X);

        // Before the settle delay the footprint stays blocked
        obstacle.update(&mut physics, &mut nav, &mut events, 0.1);
        assert!(!nav.is_walkable_world(Vec3::new(10.0, 0.0, 10.0)));
        assert_eq!(nav.version(), 0);

        // After the delay the surface reopens and the version bumps
        obstacle.update(&mut physics, &mut nav, &mut events, 1.0);
        assert!(nav.is_walkable_world(Vec3::new(10.0, 0.0, 10.0)));
        assert_eq!(nav.version(), 1);

        events.swap();
        assert!(
            events
                .iter()
                .any(|e| matches!(e, GameEvent::NavSurfaceRebuilt { version: 1 })),
            "rebuild must be announced"
        );

        // The rebuild fires exactly once
        obstacle.update(&mut physics, &mut nav, &mut events, 1.0);
        assert_eq!(nav.version(), 1);
    }

    #[test]
    fn test_fragments_freeze_after_window() {
        let (mut physics, mut nav, mut rng, mut obstacle) = setup();
        let mut events = EventQueue::new();
        let config = ObstacleConfig::default();

        obstacle.explode(&mut physics, &mut rng, obstacle.position(), Vec3::X);

        // Let physics run past the freeze window
        let dt = 1.0 / 60.0;
        let mut elapsed = 0.0;
        while elapsed < config.freeze_after + 0.5 {
            obstacle.update(&mut physics, &mut nav, &mut events, dt);
            physics.step(dt);
            elapsed += dt;
        }

        assert!(obstacle.fragment_count() > 0, "fragments still present");
        // All fragments frozen: stepping further moves nothing
        physics.step(dt);
    }

    #[test]
    fn test_fragments_despawn_after_cleanup_delay() {
        let (mut physics, mut nav, mut rng, mut obstacle) = setup();
        let mut events = EventQueue::new();
        let config = ObstacleConfig::default();

        obstacle.explode(&mut physics, &mut rng, obstacle.position(), Vec3::X);

        let total = config.freeze_after + config.despawn_after.unwrap() + 0.5;
        obstacle.update(&mut physics, &mut nav, &mut events, total);

        assert_eq!(obstacle.fragment_count(), 0);
    }

    #[test]
    fn test_find_by_collider_only_while_intact() {
        let (mut physics, mut nav, mut rng, _obstacle) = setup();
        let mut set = ObstacleSet::new();
        let obstacle = DestructibleObstacle::spawn(
            &mut physics,
            &mut nav,
            ObstacleConfig::default(),
            Vec3::new(5.0, 1.0, 5.0),
            Vec3::new(1.0, 1.0, 0.5),
        );
        let collider = obstacle.intact_collider().unwrap();
        let index = set.push(obstacle);

        assert_eq!(set.find_by_collider(collider), Some(index));

        set.try_get_mut(index)
            .unwrap()
            .explode(&mut physics, &mut rng, Vec3::ZERO, Vec3::X);
        assert_eq!(set.find_by_collider(collider), None);
    }
}
