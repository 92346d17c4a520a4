//! A* pathfinding on a 2D grid
//!
//! Grid-based navigation surface for AI agents. The world is projected onto
//! the XZ plane; obstacles stamp rectangular regions unwalkable. Rebuilding
//! a region bumps the surface version so agents can detect that their
//! current path may have become stale.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use glam::Vec3;
use rustc_hash::FxHashMap;

/// A navigation grid over the XZ plane
#[derive(Debug, Clone)]
pub struct NavGrid {
    /// Width in cells (X axis)
    pub width: usize,
    /// Depth in cells (Z axis)
    pub depth: usize,
    /// Cell size in world units
    pub cell_size: f32,
    /// Walkable cells (true = walkable)
    cells: Vec<bool>,
    /// World origin offset (XZ)
    pub origin: Vec3,
    /// Bumped on every rebuild
    version: u64,
}

impl NavGrid {
    /// Create a new grid (all cells walkable by default)
    #[must_use]
    pub fn new(width: usize, depth: usize, cell_size: f32) -> Self {
        Self {
            width,
            depth,
            cell_size,
            cells: vec![true; width * depth],
            origin: Vec3::ZERO,
            version: 0,
        }
    }

    /// Current surface version
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Set a cell's walkability
    pub fn set_walkable(&mut self, x: usize, z: usize, walkable: bool) {
        if x < self.width && z < self.depth {
            self.cells[z * self.width + x] = walkable;
        }
    }

    /// Check if a cell is walkable
    #[must_use]
    pub fn is_walkable(&self, x: usize, z: usize) -> bool {
        if x >= self.width || z >= self.depth {
            return false;
        }
        self.cells[z * self.width + x]
    }

    /// Whether the cell containing a world position is walkable
    #[must_use]
    pub fn is_walkable_world(&self, pos: Vec3) -> bool {
        let (x, z) = self.world_to_grid(pos);
        if x < 0 || z < 0 {
            return false;
        }
        self.is_walkable(x as usize, z as usize)
    }

    /// Stamp a world-space rectangle walkable or unwalkable.
    ///
    /// Used by level setup to carve obstacle footprints, and by obstacle
    /// destruction to open them back up.
    pub fn stamp_region(&mut self, min: Vec3, max: Vec3, walkable: bool) {
        let (min_x, min_z) = self.world_to_grid(min);
        let (max_x, max_z) = self.world_to_grid(max);
        if max_x < 0 || max_z < 0 {
            return;
        }

        for z in min_z.max(0)..=max_z {
            for x in min_x.max(0)..=max_x {
                self.set_walkable(x as usize, z as usize, walkable);
            }
        }
    }

    /// Rebuild a region of the surface, bumping the version.
    ///
    /// Agents compare their last-seen version against the current one and
    /// re-request paths that cross changed cells.
    pub fn rebuild_region(&mut self, min: Vec3, max: Vec3, walkable: bool) -> u64 {
        self.stamp_region(min, max, walkable);
        self.version += 1;
        self.version
    }

    /// Convert world position to grid coordinates
    #[must_use]
    pub fn world_to_grid(&self, pos: Vec3) -> (i32, i32) {
        let local = pos - self.origin;
        (
            (local.x / self.cell_size).floor() as i32,
            (local.z / self.cell_size).floor() as i32,
        )
    }

    /// Convert grid coordinates to world position (center of cell, y = 0)
    #[must_use]
    pub fn grid_to_world(&self, x: usize, z: usize) -> Vec3 {
        self.origin
            + Vec3::new(
                (x as f32 + 0.5) * self.cell_size,
                0.0,
                (z as f32 + 0.5) * self.cell_size,
            )
    }

    /// Whether any of the given waypoints now falls on an unwalkable cell
    #[must_use]
    pub fn path_blocked(&self, waypoints: &[Vec3]) -> bool {
        waypoints.iter().any(|wp| !self.is_walkable_world(*wp))
    }

    /// Get neighbors of a cell (4-directional)
    fn neighbors(&self, x: usize, z: usize) -> Vec<(usize, usize)> {
        let mut result = Vec::with_capacity(4);

        if x > 0 && self.is_walkable(x - 1, z) {
            result.push((x - 1, z));
        }
        if x + 1 < self.width && self.is_walkable(x + 1, z) {
            result.push((x + 1, z));
        }
        if z > 0 && self.is_walkable(x, z - 1) {
            result.push((x, z - 1));
        }
        if z + 1 < self.depth && self.is_walkable(x, z + 1) {
            result.push((x, z + 1));
        }

        result
    }
}

/// Result of pathfinding
#[derive(Debug, Clone, Default)]
pub struct PathResult {
    /// Waypoints in world coordinates
    pub waypoints: Vec<Vec3>,
    /// Total path length
    pub length: f32,
    /// Whether the path reaches the requested goal. A partial path ends at
    /// the reachable cell closest to the goal.
    pub complete: bool,
}

impl PathResult {
    /// Check if no path was found
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
}

/// A* node for priority queue
#[derive(Debug, Clone)]
struct Node {
    x: usize,
    z: usize,
    f_cost: f32, // g_cost + heuristic
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.z == other.z
    }
}

impl Eq for Node {}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse for min-heap
        other
            .f_cost
            .partial_cmp(&self.f_cost)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find a path using the A* algorithm.
///
/// When the goal is unreachable, returns a partial path to the reachable
/// cell closest to it (`complete == false`), the way navigation engines
/// resolve destinations inside blocked regions. An empty result means the
/// start itself is invalid or already the closest reachable cell.
#[must_use]
pub fn find_path(grid: &NavGrid, start: Vec3, goal: Vec3) -> PathResult {
    let (start_x, start_z) = grid.world_to_grid(start);
    let (goal_x, goal_z) = grid.world_to_grid(goal);

    // Validate coordinates
    if start_x < 0 || start_z < 0 || goal_x < 0 || goal_z < 0 {
        return PathResult::default();
    }

    let start_x = start_x as usize;
    let start_z = start_z as usize;
    let goal_x = goal_x.clamp(0, grid.width.saturating_sub(1) as i32) as usize;
    let goal_z = goal_z.clamp(0, grid.depth.saturating_sub(1) as i32) as usize;

    if !grid.is_walkable(start_x, start_z) {
        return PathResult::default();
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: FxHashMap<(usize, usize), (usize, usize)> = FxHashMap::default();
    let mut g_score: FxHashMap<(usize, usize), f32> = FxHashMap::default();

    let heuristic = |x: usize, z: usize| -> f32 {
        let dx = (x as f32 - goal_x as f32).abs();
        let dz = (z as f32 - goal_z as f32).abs();
        dx + dz // Manhattan distance
    };

    g_score.insert((start_x, start_z), 0.0);
    open_set.push(Node {
        x: start_x,
        z: start_z,
        f_cost: heuristic(start_x, start_z),
    });

    // Best fallback if the goal turns out unreachable
    let mut best = (start_x, start_z);
    let mut best_h = heuristic(start_x, start_z);

    while let Some(current) = open_set.pop() {
        if current.x == goal_x && current.z == goal_z {
            return reconstruct(grid, &came_from, (goal_x, goal_z), true);
        }

        let h = heuristic(current.x, current.z);
        if h < best_h {
            best_h = h;
            best = (current.x, current.z);
        }

        for (nx, nz) in grid.neighbors(current.x, current.z) {
            let tentative_g = g_score.get(&(current.x, current.z)).unwrap_or(&f32::MAX) + 1.0;

            if tentative_g < *g_score.get(&(nx, nz)).unwrap_or(&f32::MAX) {
                came_from.insert((nx, nz), (current.x, current.z));
                g_score.insert((nx, nz), tentative_g);

                open_set.push(Node {
                    x: nx,
                    z: nz,
                    f_cost: tentative_g + heuristic(nx, nz),
                });
            }
        }
    }

    // Goal unreachable: walk to the closest cell explored
    if best == (start_x, start_z) {
        return PathResult::default();
    }
    reconstruct(grid, &came_from, best, false)
}

fn reconstruct(
    grid: &NavGrid,
    came_from: &FxHashMap<(usize, usize), (usize, usize)>,
    end: (usize, usize),
    complete: bool,
) -> PathResult {
    let mut path = vec![end];
    let mut curr = end;

    while let Some(&prev) = came_from.get(&curr) {
        path.push(prev);
        curr = prev;
    }

    path.reverse();

    let waypoints: Vec<Vec3> = path
        .iter()
        .map(|&(x, z)| grid.grid_to_world(x, z))
        .collect();

    let length = calculate_path_length(&waypoints);

    PathResult {
        waypoints,
        length,
        complete,
    }
}

/// Calculate total path length
fn calculate_path_length(waypoints: &[Vec3]) -> f32 {
    let mut length = 0.0;
    for i in 1..waypoints.len() {
        length += waypoints[i].distance(waypoints[i - 1]);
    }
    length
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_pathfinding_around_wall() {
        let mut grid = NavGrid::new(10, 10, 1.0);

        // Create a wall
        for z in 2..8 {
            grid.set_walkable(5, z, false);
        }

        let path = find_path(&grid, Vec3::new(2.5, 0.0, 5.5), Vec3::new(8.5, 0.0, 5.5));

        assert!(!path.is_empty());
        assert!(path.waypoints.len() > 2); // Should go around the wall
    }

    #[test]
    fn test_direct_path() {
        let grid = NavGrid::new(10, 10, 1.0);

        let path = find_path(&grid, Vec3::new(0.5, 0.0, 0.5), Vec3::new(3.5, 0.0, 0.5));

        assert!(!path.is_empty());
        assert_eq!(path.waypoints.len(), 4); // 4 cells in a line
    }

    #[test]
    fn test_sealed_goal_yields_partial_path() {
        let mut grid = NavGrid::new(5, 5, 1.0);

        // Block everything around the goal
        grid.set_walkable(3, 2, false);
        grid.set_walkable(3, 4, false);
        grid.set_walkable(2, 3, false);
        grid.set_walkable(4, 3, false);
        grid.set_walkable(3, 3, false);

        let goal = Vec3::new(3.5, 0.0, 3.5);
        let path = find_path(&grid, Vec3::new(0.5, 0.0, 0.5), goal);

        assert!(!path.is_empty());
        assert!(!path.complete, "sealed goal cannot be reached");
        // Ends as close to the goal as the seal allows
        let end = *path.waypoints.last().unwrap();
        assert!(end.distance(goal) < 2.5);
    }

    #[test]
    fn test_complete_flag_on_reachable_goal() {
        let grid = NavGrid::new(5, 5, 1.0);
        let path = find_path(&grid, Vec3::new(0.5, 0.0, 0.5), Vec3::new(4.5, 0.0, 4.5));
        assert!(path.complete);
    }

    #[test]
    fn test_rebuild_bumps_version_and_reopens_cells() {
        let mut grid = NavGrid::new(10, 10, 1.0);
        grid.stamp_region(Vec3::new(4.0, 0.0, 0.0), Vec3::new(5.9, 0.0, 9.9), false);
        assert_eq!(grid.version(), 0);

        let path = find_path(&grid, Vec3::new(0.5, 0.0, 5.5), Vec3::new(9.5, 0.0, 5.5));
        assert!(!path.complete, "wall spans the full grid depth");

        let version = grid.rebuild_region(
            Vec3::new(4.0, 0.0, 0.0),
            Vec3::new(5.9, 0.0, 9.9),
            true,
        );
        assert_eq!(version, 1);

        let path = find_path(&grid, Vec3::new(0.5, 0.0, 5.5), Vec3::new(9.5, 0.0, 5.5));
        assert!(path.complete, "rebuilt surface must be crossable");
    }

    #[test]
    fn test_path_blocked_detects_stale_waypoints() {
        let mut grid = NavGrid::new(10, 10, 1.0);
        let path = find_path(&grid, Vec3::new(0.5, 0.0, 0.5), Vec3::new(6.5, 0.0, 0.5));
        assert!(!grid.path_blocked(&path.waypoints));

        grid.stamp_region(Vec3::new(3.0, 0.0, 0.0), Vec3::new(3.9, 0.0, 0.9), false);
        assert!(grid.path_blocked(&path.waypoints));
    }
}
