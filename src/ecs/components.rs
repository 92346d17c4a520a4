//! Common ECS components

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Transform component for position and orientation
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Transform {
    /// Position in world space
    pub position: Vec3,
    /// Rotation as a quaternion
    pub rotation: Quat,
}

impl Transform {
    /// Create a new transform at the origin
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transform with just a position
    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    #[must_use]
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Get the forward direction (negative Z in local space)
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Get the right direction (positive X in local space)
    #[must_use]
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Get the up direction (positive Y in local space)
    #[must_use]
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Translate by a delta
    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }

    /// Yaw rotation whose forward points from here toward `point`,
    /// flattened to the horizontal plane.
    ///
    /// Returns the current rotation when `point` is directly above or below.
    #[must_use]
    pub fn yaw_towards(&self, point: Vec3) -> Quat {
        let mut to_point = point - self.position;
        to_point.y = 0.0;
        if to_point.length_squared() < 1e-6 {
            return self.rotation;
        }
        let yaw = f32::atan2(-to_point.x, -to_point.z);
        Quat::from_rotation_y(yaw)
    }

    /// Rotate toward facing `point` by at most `max_step` radians.
    ///
    /// Only the horizontal bearing is affected.
    pub fn rotate_step_towards(&mut self, point: Vec3, max_step: f32) {
        let desired = self.yaw_towards(point);
        let angle = self.rotation.angle_between(desired);
        if angle < 1e-4 {
            self.rotation = desired;
            return;
        }
        let t = (max_step / angle).min(1.0);
        self.rotation = self.rotation.slerp(desired, t);
    }

    /// Whether the horizontal bearing to `point` is within `tolerance`
    /// radians of the current forward direction.
    #[must_use]
    pub fn is_facing(&self, point: Vec3, tolerance: f32) -> bool {
        self.rotation.angle_between(self.yaw_towards(point)) <= tolerance
    }

    /// Unsigned angle in radians between forward and the direction to `point`.
    #[must_use]
    pub fn angle_to(&self, point: Vec3) -> f32 {
        let mut to_point = point - self.position;
        to_point.y = 0.0;
        let mut fwd = self.forward();
        fwd.y = 0.0;
        let to_point = to_point.normalize_or_zero();
        let fwd = fwd.normalize_or_zero();
        if to_point == Vec3::ZERO || fwd == Vec3::ZERO {
            return 0.0;
        }
        fwd.dot(to_point).clamp(-1.0, 1.0).acos()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

/// Health component; liveness authority for any damageable entity
#[derive(Debug, Clone, Copy)]
pub struct Health {
    /// Current hit points
    pub current: f32,
    /// Maximum hit points
    pub max: f32,
}

impl Health {
    /// Create a health component at full hit points
    #[must_use]
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    /// Whether the entity is alive
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    /// Apply damage, clamping at zero
    pub fn damage(&mut self, amount: f32) {
        self.current = (self.current - amount).max(0.0);
    }
}

/// Name component for debugging
#[derive(Debug, Clone)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_rotate_step_converges() {
        let mut transform = Transform::from_position(Vec3::ZERO);
        let target = Vec3::new(5.0, 0.0, 0.0);

        // Forward starts at -Z; target is at +X, a 90 degree turn
        for _ in 0..100 {
            transform.rotate_step_towards(target, 0.1);
        }

        assert!(transform.is_facing(target, 0.01));
        let fwd = transform.forward();
        assert!((fwd - Vec3::X).length() < 0.05);
    }

    #[test]
    fn test_transform_angle_to() {
        let transform = Transform::from_position(Vec3::ZERO);

        // Straight ahead (-Z)
        assert!(transform.angle_to(Vec3::new(0.0, 0.0, -5.0)) < 0.01);
        // Directly behind
        let behind = transform.angle_to(Vec3::new(0.0, 0.0, 5.0));
        assert!((behind - std::f32::consts::PI).abs() < 0.01);
        // To the side
        let side = transform.angle_to(Vec3::new(5.0, 0.0, 0.0));
        assert!((side - std::f32::consts::FRAC_PI_2).abs() < 0.01);
    }

    #[test]
    fn test_health_damage_clamps() {
        let mut health = Health::new(50.0);
        health.damage(30.0);
        assert!(health.is_alive());

        health.damage(100.0);
        assert_eq!(health.current, 0.0);
        assert!(!health.is_alive());
    }
}
