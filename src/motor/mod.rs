//! Locomotion controller
//!
//! Thin wrapper over the pathfinding provider: issues destinations, reports
//! movement/arrival state, and smooths orientation. Stuck detection does
//! NOT live here - it needs behavior-level knowledge of whether movement is
//! intentional, so the brain owns it.

use glam::Vec3;

use crate::ecs::Transform;
use crate::nav::NavProvider;

/// Actual speed below which the agent counts as standing still (m/s).
const MOVE_EPSILON: f32 = 0.05;

/// Desired speed above which the agent counts as committed to moving (m/s).
const COMMIT_THRESHOLD: f32 = 0.1;

/// Locomotion controller for one agent.
pub struct Motor {
    nav: Box<dyn NavProvider>,
    /// Turn rate (radians/s)
    rotation_rate: f32,
    /// Whether to face the movement direction automatically
    auto_face: bool,
    stopped: bool,
}

impl Motor {
    /// Create a motor over a navigation provider.
    #[must_use]
    pub fn new(nav: Box<dyn NavProvider>, rotation_rate: f32) -> Self {
        Self {
            nav,
            rotation_rate,
            auto_face: true,
            stopped: true,
        }
    }

    /// Request movement to `point` at `speed`, stopping within
    /// `stopping_distance`. Resumes movement if previously stopped.
    pub fn move_to(&mut self, point: Vec3, speed: f32, stopping_distance: f32) {
        self.nav.set_speed(speed);
        self.nav.set_stopping_distance(stopping_distance);
        self.nav.request_path(point);
        self.stopped = false;
    }

    /// Cancel the current path, zero velocity, clear the moving flag.
    pub fn stop(&mut self) {
        self.nav.stop();
        self.stopped = true;
    }

    /// Smoothly rotate toward the horizontal bearing of `point`.
    ///
    /// Used during attacks, where automatic path-following rotation is
    /// disabled.
    pub fn rotate_towards(&self, transform: &mut Transform, point: Vec3, dt: f32) {
        transform.rotate_step_towards(point, self.rotation_rate * dt);
    }

    /// Enable or disable automatic facing along the path direction.
    pub fn set_auto_face(&mut self, auto_face: bool) {
        self.auto_face = auto_face;
    }

    /// Whether the agent is moving or about to move.
    ///
    /// True if actual speed exceeds a small threshold, OR desired velocity
    /// exceeds the commitment threshold, OR a path request is still being
    /// resolved - the pending clause prevents a one-frame "idle" flicker
    /// between requesting a path and receiving it.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        if self.stopped {
            return false;
        }
        self.nav.current_velocity().length() > MOVE_EPSILON
            || self.nav.desired_velocity().length() > COMMIT_THRESHOLD
            || self.nav.has_pending_path()
    }

    /// Distance left to the destination; infinite while a path is pending.
    /// Infinite remaining distance means "not yet arrived", never failure.
    #[must_use]
    pub fn remaining_distance(&self) -> f32 {
        self.nav.remaining_distance()
    }

    /// Whether the agent has arrived (no pending path, nothing left to walk).
    #[must_use]
    pub fn has_arrived(&self) -> bool {
        !self.nav.has_pending_path() && self.nav.remaining_distance() <= f32::EPSILON
    }

    /// Advance along the current path and update facing.
    pub fn update(&mut self, transform: &mut Transform, dt: f32) {
        if self.stopped {
            return;
        }

        transform.position = self.nav.step(transform.position, dt);

        if self.auto_face {
            let velocity = self.nav.current_velocity();
            if velocity.length() > MOVE_EPSILON {
                transform
                    .rotate_step_towards(transform.position + velocity, self.rotation_rate * dt);
            }
        }
    }
}
