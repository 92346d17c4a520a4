//! Physics simulation using rapier3d
//!
//! The AI core consumes this through two narrow surfaces: ray casts
//! (occlusion, wall probes) and rigid-body impulses (obstacle fragments).

use glam::{Quat, Vec3};
use rapier3d::na::UnitQuaternion;
use rapier3d::prelude::*;

use crate::senses::Occlusion;

/// Collision layer bits used by ray casts and collider filters.
pub mod layers {
    /// Static level geometry
    pub const WORLD: u32 = 1 << 0;
    /// Intact destructible obstacles
    pub const OBSTACLE: u32 = 1 << 1;
    /// Obstacle fragments after destruction
    pub const FRAGMENT: u32 = 1 << 2;
    /// Enemy agents
    pub const ENEMY: u32 = 1 << 3;
    /// Detectable targets (players, NPCs, props)
    pub const TARGET: u32 = 1 << 4;
    /// Everything
    pub const ALL: u32 = u32::MAX;
    /// Layers that occlude sight lines
    pub const SIGHT_BLOCKERS: u32 = WORLD | OBSTACLE;
}

/// Handle to a rigid body in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RigidBodyHandle(pub rapier3d::dynamics::RigidBodyHandle);

/// Handle to a collider in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColliderHandle(pub rapier3d::geometry::ColliderHandle);

/// Convert glam Quat to rapier3d UnitQuaternion
fn quat_to_rapier(q: Quat) -> UnitQuaternion<f32> {
    UnitQuaternion::from_quaternion(rapier3d::na::Quaternion::new(q.w, q.x, q.y, q.z))
}

fn interaction_groups(membership: u32, filter: u32) -> InteractionGroups {
    InteractionGroups::new(
        Group::from_bits_truncate(membership),
        Group::from_bits_truncate(filter),
    )
}

/// Physics world manager
pub struct Physics {
    /// Gravity vector
    pub gravity: Vec3,
    /// Physics pipeline
    pipeline: PhysicsPipeline,
    /// Island manager
    island_manager: IslandManager,
    /// Broad phase
    broad_phase: DefaultBroadPhase,
    /// Narrow phase
    narrow_phase: NarrowPhase,
    /// Rigid body set
    rigid_body_set: RigidBodySet,
    /// Collider set
    collider_set: ColliderSet,
    /// Impulse joint set
    impulse_joint_set: ImpulseJointSet,
    /// Multibody joint set
    multibody_joint_set: MultibodyJointSet,
    /// CCD solver
    ccd_solver: CCDSolver,
    /// Query pipeline for raycasting
    query_pipeline: QueryPipeline,
    /// Integration parameters
    integration_parameters: IntegrationParameters,
}

impl Physics {
    /// Create a new physics world with default gravity
    pub fn new() -> Self {
        Self::with_gravity(Vec3::new(0.0, -9.81, 0.0))
    }

    /// Create a new physics world with custom gravity
    pub fn with_gravity(gravity: Vec3) -> Self {
        Self {
            gravity,
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            integration_parameters: IntegrationParameters::default(),
        }
    }

    /// Step the physics simulation
    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;

        self.pipeline.step(
            &vector![self.gravity.x, self.gravity.y, self.gravity.z],
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// Refresh the query pipeline after colliders were added or removed
    /// outside of `step` (level setup, obstacle destruction).
    pub fn refresh_queries(&mut self) {
        self.query_pipeline.update(&self.collider_set);
    }

    /// Create a static rigid body (doesn't move)
    pub fn create_fixed_body(&mut self, position: Vec3, rotation: Quat) -> RigidBodyHandle {
        let isometry = Isometry::from_parts(
            rapier3d::na::Translation3::new(position.x, position.y, position.z),
            quat_to_rapier(rotation),
        );
        let body = RigidBodyBuilder::fixed().position(isometry).build();

        RigidBodyHandle(self.rigid_body_set.insert(body))
    }

    /// Create a dynamic rigid body (affected by forces)
    pub fn create_dynamic_body(&mut self, position: Vec3, rotation: Quat) -> RigidBodyHandle {
        let isometry = Isometry::from_parts(
            rapier3d::na::Translation3::new(position.x, position.y, position.z),
            quat_to_rapier(rotation),
        );
        let body = RigidBodyBuilder::dynamic().position(isometry).build();

        RigidBodyHandle(self.rigid_body_set.insert(body))
    }

    /// Add a box collider with collision layers to a rigid body.
    ///
    /// `membership` is the layer this collider lives on; `filter` is the set
    /// of layers it collides with.
    pub fn add_box_collider(
        &mut self,
        body: RigidBodyHandle,
        half_extents: Vec3,
        density: f32,
        membership: u32,
        filter: u32,
    ) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .density(density)
            .collision_groups(interaction_groups(membership, filter))
            .build();

        ColliderHandle(self.collider_set.insert_with_parent(
            collider,
            body.0,
            &mut self.rigid_body_set,
        ))
    }

    /// Enable or disable a collider without removing it
    pub fn set_collider_enabled(&mut self, collider: ColliderHandle, enabled: bool) {
        if let Some(c) = self.collider_set.get_mut(collider.0) {
            c.set_enabled(enabled);
        }
    }

    /// Get the position of a rigid body
    pub fn get_position(&self, body: RigidBodyHandle) -> Option<Vec3> {
        self.rigid_body_set.get(body.0).map(|rb| {
            let pos = rb.translation();
            Vec3::new(pos.x, pos.y, pos.z)
        })
    }

    /// Get the linear velocity of a body
    pub fn get_linear_velocity(&self, body: RigidBodyHandle) -> Option<Vec3> {
        self.rigid_body_set.get(body.0).map(|rb| {
            let vel = rb.linvel();
            Vec3::new(vel.x, vel.y, vel.z)
        })
    }

    /// Get the mass of a body
    pub fn get_mass(&self, body: RigidBodyHandle) -> Option<f32> {
        self.rigid_body_set.get(body.0).map(|rb| rb.mass())
    }

    /// Apply an impulse to a dynamic body
    pub fn apply_impulse(&mut self, body: RigidBodyHandle, impulse: Vec3) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            rb.apply_impulse(vector![impulse.x, impulse.y, impulse.z], true);
        }
    }

    /// Freeze a body in place by converting it to a fixed body
    pub fn freeze_body(&mut self, body: RigidBodyHandle) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            rb.set_body_type(RigidBodyType::Fixed, true);
        }
    }

    /// Cast a ray and return the first hit on the given layers
    pub fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: u32,
    ) -> Option<RaycastHit> {
        let ray = Ray::new(
            point![origin.x, origin.y, origin.z],
            vector![direction.x, direction.y, direction.z],
        );

        let filter = QueryFilter::default().groups(interaction_groups(layers::ALL, mask));

        self.query_pipeline
            .cast_ray(
                &self.rigid_body_set,
                &self.collider_set,
                &ray,
                max_distance,
                true,
                filter,
            )
            .map(|(handle, distance)| {
                let point = ray.point_at(distance);
                RaycastHit {
                    collider: ColliderHandle(handle),
                    point: Vec3::new(point.x, point.y, point.z),
                    distance,
                }
            })
    }

    /// Remove a rigid body and its colliders
    pub fn remove_body(&mut self, body: RigidBodyHandle) {
        self.rigid_body_set.remove(
            body.0,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
    }
}

impl Default for Physics {
    fn default() -> Self {
        Self::new()
    }
}

impl Occlusion for Physics {
    fn raycast_blocked(&self, from: Vec3, to: Vec3, mask: u32) -> bool {
        let delta = to - from;
        let distance = delta.length();
        if distance < 1e-4 {
            return false;
        }
        self.raycast(from, delta / distance, distance, mask).is_some()
    }
}

/// Result of a raycast
#[derive(Debug, Clone)]
pub struct RaycastHit {
    /// The collider that was hit
    pub collider: ColliderHandle,
    /// The point of intersection
    pub point: Vec3,
    /// Distance from ray origin
    pub distance: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raycast_respects_layers() {
        let mut physics = Physics::new();

        let body = physics.create_fixed_body(Vec3::new(0.0, 0.0, -5.0), Quat::IDENTITY);
        physics.add_box_collider(body, Vec3::splat(1.0), 1.0, layers::OBSTACLE, layers::ALL);
        physics.refresh_queries();

        // Hit on the obstacle layer
        let hit = physics.raycast(Vec3::ZERO, Vec3::NEG_Z, 20.0, layers::OBSTACLE);
        assert!(hit.is_some());
        let hit = hit.unwrap();
        assert!((hit.distance - 4.0).abs() < 0.01);

        // Invisible when only querying world geometry
        let miss = physics.raycast(Vec3::ZERO, Vec3::NEG_Z, 20.0, layers::WORLD);
        assert!(miss.is_none());
    }

    #[test]
    fn test_occlusion_blocked() {
        let mut physics = Physics::new();

        let body = physics.create_fixed_body(Vec3::new(0.0, 0.0, -5.0), Quat::IDENTITY);
        physics.add_box_collider(
            body,
            Vec3::splat(1.0),
            1.0,
            layers::WORLD,
            layers::ALL,
        );
        physics.refresh_queries();

        assert!(physics.raycast_blocked(
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, -10.0),
            layers::SIGHT_BLOCKERS
        ));
        assert!(!physics.raycast_blocked(
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, 10.0),
            layers::SIGHT_BLOCKERS
        ));
    }

    #[test]
    fn test_disabled_collider_not_hit() {
        let mut physics = Physics::new();

        let body = physics.create_fixed_body(Vec3::new(0.0, 0.0, -5.0), Quat::IDENTITY);
        let collider =
            physics.add_box_collider(body, Vec3::splat(1.0), 1.0, layers::OBSTACLE, layers::ALL);
        physics.refresh_queries();

        physics.set_collider_enabled(collider, false);
        physics.refresh_queries();

        assert!(physics
            .raycast(Vec3::ZERO, Vec3::NEG_Z, 20.0, layers::OBSTACLE)
            .is_none());
    }

    #[test]
    fn test_fragment_impulse_and_freeze() {
        let mut physics = Physics::new();

        let body = physics.create_dynamic_body(Vec3::new(0.0, 5.0, 0.0), Quat::IDENTITY);
        physics.add_box_collider(
            body,
            Vec3::splat(0.25),
            600.0,
            layers::FRAGMENT,
            layers::ALL & !layers::ENEMY,
        );

        physics.apply_impulse(body, Vec3::new(50.0, 0.0, 0.0));
        physics.step(1.0 / 60.0);

        let vel = physics.get_linear_velocity(body).unwrap();
        assert!(vel.x > 0.0, "impulse should push the fragment");

        physics.freeze_body(body);
        physics.step(1.0 / 60.0);
        let vel = physics.get_linear_velocity(body).unwrap();
        assert_eq!(vel, Vec3::ZERO, "frozen fragment must not move");
    }
}
