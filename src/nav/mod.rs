//! Navigation module
//!
//! The locomotion layer talks to pathfinding through the `NavProvider`
//! trait so a real engine's navigation system can be swapped in. The
//! default implementation is `GridNav`, which plans on a shared `NavGrid`
//! surface.
//!
//! Path requests are deferred: `request_path` records the destination and
//! the path is computed on the next `step`. Until then the provider reports
//! a pending path with infinite remaining distance, which callers must
//! treat as "not yet arrived" rather than failure.

mod grid;

pub use grid::{NavGrid, PathResult, find_path};

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;

/// Distance at which a waypoint counts as reached.
const WAYPOINT_RADIUS: f32 = 0.3;

/// Pathfinding provider consumed by the locomotion controller.
pub trait NavProvider {
    /// Request a path to `destination`. Replaces any current path.
    fn request_path(&mut self, destination: Vec3);

    /// Cancel the current path and zero velocity.
    fn stop(&mut self);

    /// Set the desired movement speed (m/s).
    fn set_speed(&mut self, speed: f32);

    /// Set the arrival tolerance (m).
    fn set_stopping_distance(&mut self, distance: f32);

    /// Velocity the agent actually moved with on the last step.
    fn current_velocity(&self) -> Vec3;

    /// Velocity the agent is trying to move with.
    fn desired_velocity(&self) -> Vec3;

    /// Distance left along the path; infinite while a path is pending.
    fn remaining_distance(&self) -> f32;

    /// Whether a requested path has not been resolved yet.
    fn has_pending_path(&self) -> bool;

    /// Normalized direction toward the next waypoint.
    fn steering_direction(&self) -> Vec3;

    /// Advance along the path; returns the new position.
    fn step(&mut self, position: Vec3, dt: f32) -> Vec3;
}

/// Grid-backed navigation agent.
///
/// Holds a shared handle to the navigation surface. When the surface
/// version changes (an obstacle was destroyed and the region rebuilt), the
/// agent re-requests any path that now crosses changed cells.
pub struct GridNav {
    grid: Rc<RefCell<NavGrid>>,
    destination: Option<Vec3>,
    pending: Option<Vec3>,
    path: Vec<Vec3>,
    next_waypoint: usize,
    speed: f32,
    stopping_distance: f32,
    velocity: Vec3,
    remaining: f32,
    /// Position at the last step, used for steering queries between steps
    last_position: Vec3,
    seen_version: u64,
}

impl GridNav {
    /// Create a navigation agent on the given surface.
    #[must_use]
    pub fn new(grid: Rc<RefCell<NavGrid>>) -> Self {
        let seen_version = grid.borrow().version();
        Self {
            grid,
            destination: None,
            pending: None,
            path: Vec::new(),
            next_waypoint: 0,
            speed: 0.0,
            stopping_distance: WAYPOINT_RADIUS,
            velocity: Vec3::ZERO,
            remaining: 0.0,
            last_position: Vec3::ZERO,
            seen_version,
        }
    }

    fn clear_path(&mut self) {
        self.path.clear();
        self.next_waypoint = 0;
        self.velocity = Vec3::ZERO;
        self.remaining = 0.0;
    }

    fn horizontal_distance(a: Vec3, b: Vec3) -> f32 {
        let mut d = b - a;
        d.y = 0.0;
        d.length()
    }
}

impl NavProvider for GridNav {
    fn request_path(&mut self, destination: Vec3) {
        self.destination = Some(destination);
        self.pending = Some(destination);
        self.clear_path();
    }

    fn stop(&mut self) {
        self.destination = None;
        self.pending = None;
        self.clear_path();
    }

    fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    fn set_stopping_distance(&mut self, distance: f32) {
        self.stopping_distance = distance.max(WAYPOINT_RADIUS);
    }

    fn current_velocity(&self) -> Vec3 {
        self.velocity
    }

    fn desired_velocity(&self) -> Vec3 {
        if self.path.is_empty() {
            Vec3::ZERO
        } else {
            self.steering_direction() * self.speed
        }
    }

    fn remaining_distance(&self) -> f32 {
        if self.pending.is_some() {
            f32::INFINITY
        } else {
            self.remaining
        }
    }

    fn has_pending_path(&self) -> bool {
        self.pending.is_some()
    }

    fn steering_direction(&self) -> Vec3 {
        match self.path.get(self.next_waypoint) {
            Some(wp) => {
                let mut dir = *wp - self.last_position;
                dir.y = 0.0;
                dir.normalize_or_zero()
            }
            None => Vec3::ZERO,
        }
    }

    fn step(&mut self, position: Vec3, dt: f32) -> Vec3 {
        self.last_position = position;
        let grid = self.grid.clone();
        let grid = grid.borrow();

        // Surface changed: recompute paths crossing rebuilt cells
        if grid.version() != self.seen_version {
            self.seen_version = grid.version();
            if !self.path.is_empty()
                && grid.path_blocked(&self.path[self.next_waypoint..])
                && let Some(dest) = self.destination
            {
                self.pending = Some(dest);
                self.clear_path();
            }
        }

        // Resolve a pending request
        if let Some(dest) = self.pending.take() {
            let result = find_path(&grid, position, dest);
            self.path = result.waypoints;
            self.next_waypoint = 0;
            self.remaining = result.length;
        }

        if self.path.is_empty() {
            self.velocity = Vec3::ZERO;
            self.remaining = 0.0;
            return position;
        }

        // Advance past reached waypoints
        while self.next_waypoint < self.path.len()
            && Self::horizontal_distance(position, self.path[self.next_waypoint])
                <= WAYPOINT_RADIUS
        {
            self.next_waypoint += 1;
        }

        // Remaining distance from here through the rest of the path
        let mut remaining = 0.0;
        let mut cursor = position;
        for wp in &self.path[self.next_waypoint.min(self.path.len())..] {
            remaining += Self::horizontal_distance(cursor, *wp);
            cursor = *wp;
        }
        self.remaining = remaining;

        // Arrived within tolerance
        if self.next_waypoint >= self.path.len() || remaining <= self.stopping_distance {
            self.clear_path();
            return position;
        }

        // Move toward the current waypoint
        let target = self.path[self.next_waypoint];
        let mut dir = target - position;
        dir.y = 0.0;
        let distance = dir.length();
        if distance < 1e-5 {
            self.velocity = Vec3::ZERO;
            return position;
        }
        let dir = dir / distance;
        let step_len = (self.speed * dt).min(distance);

        self.velocity = dir * self.speed;
        position + dir * step_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_grid() -> Rc<RefCell<NavGrid>> {
        Rc::new(RefCell::new(NavGrid::new(20, 20, 1.0)))
    }

    #[test]
    fn test_pending_path_reports_infinite_remaining() {
        let mut nav = GridNav::new(open_grid());
        nav.set_speed(2.0);
        nav.request_path(Vec3::new(10.5, 0.0, 0.5));

        assert!(nav.has_pending_path());
        assert_eq!(nav.remaining_distance(), f32::INFINITY);

        let pos = nav.step(Vec3::new(0.5, 0.0, 0.5), 0.1);
        assert!(!nav.has_pending_path());
        assert!(nav.remaining_distance().is_finite());
        assert!(pos.x > 0.5, "agent should start moving along the path");
    }

    #[test]
    fn test_agent_reaches_destination() {
        let mut nav = GridNav::new(open_grid());
        nav.set_speed(4.0);
        nav.set_stopping_distance(0.5);
        nav.request_path(Vec3::new(8.5, 0.0, 0.5));

        let mut pos = Vec3::new(0.5, 0.0, 0.5);
        for _ in 0..200 {
            pos = nav.step(pos, 1.0 / 60.0);
        }

        assert!(pos.distance(Vec3::new(8.5, 0.0, 0.5)) < 1.0);
        assert_eq!(nav.current_velocity(), Vec3::ZERO);
        assert_eq!(nav.remaining_distance(), 0.0);
    }

    #[test]
    fn test_unreachable_destination_walks_partial_path() {
        let grid = open_grid();
        // Seal off the goal cell
        {
            let mut g = grid.borrow_mut();
            g.set_walkable(10, 9, false);
            g.set_walkable(10, 11, false);
            g.set_walkable(9, 10, false);
            g.set_walkable(11, 10, false);
            g.set_walkable(10, 10, false);
        }

        let goal = Vec3::new(10.5, 0.0, 10.5);
        let mut nav = GridNav::new(grid);
        nav.set_speed(4.0);
        nav.request_path(goal);

        let mut pos = Vec3::new(0.5, 0.0, 0.5);
        for _ in 0..400 {
            pos = nav.step(pos, 1.0 / 60.0);
        }

        // Walked as close as the seal allows, then settled
        assert!(pos.distance(goal) < 2.5);
        assert_eq!(nav.current_velocity(), Vec3::ZERO);
        assert_eq!(nav.remaining_distance(), 0.0);
    }

    #[test]
    fn test_surface_rebuild_triggers_repath() {
        let grid = open_grid();
        let mut nav = GridNav::new(grid.clone());
        nav.set_speed(2.0);
        nav.request_path(Vec3::new(15.5, 0.0, 0.5));

        let mut pos = Vec3::new(0.5, 0.0, 0.5);
        pos = nav.step(pos, 0.1);
        let straight = nav.remaining_distance();

        // A wall drops across the path, leaving a gap far to the north
        grid.borrow_mut().rebuild_region(
            Vec3::new(8.0, 0.0, 0.0),
            Vec3::new(8.9, 0.0, 10.9),
            false,
        );

        pos = nav.step(pos, 0.1);
        assert!(
            nav.remaining_distance() > straight + 10.0,
            "repathed route must detour around the new wall"
        );
        let _ = pos;
    }
}
