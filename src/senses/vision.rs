//! Line-of-sight query
//!
//! Sight checks go through the `Occlusion` trait so the detection layer
//! stays independent of the concrete collision engine.

use glam::Vec3;

/// Occlusion query provided by the collision engine.
pub trait Occlusion {
    /// Whether the segment from `from` to `to` is blocked by any geometry
    /// on the layers in `mask`.
    fn raycast_blocked(&self, from: Vec3, to: Vec3, mask: u32) -> bool;
}

/// Whether an observer at `observer_position` can see `target_position`.
///
/// The ray starts from an eye-height offset above the observer. It is
/// occluded if it hits geometry on `mask` before reaching the target; the
/// target itself must not be on the masked layers.
#[must_use]
pub fn has_line_of_sight(
    occlusion: &dyn Occlusion,
    observer_position: Vec3,
    eye_height: f32,
    target_position: Vec3,
    mask: u32,
) -> bool {
    let eye = observer_position + Vec3::Y * eye_height;
    !occlusion.raycast_blocked(eye, target_position, mask)
}

/// Occlusion stub that never blocks anything.
///
/// Useful for open test arenas and headless setups without collision
/// geometry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOcclusion;

impl Occlusion for NoOcclusion {
    fn raycast_blocked(&self, _from: Vec3, _to: Vec3, _mask: u32) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Occlusion stub blocking everything crossing the x = 0 plane.
    struct WallAtOrigin;

    impl Occlusion for WallAtOrigin {
        fn raycast_blocked(&self, from: Vec3, to: Vec3, _mask: u32) -> bool {
            from.x.signum() != to.x.signum()
        }
    }

    #[test]
    fn test_line_of_sight() {
        let occ = WallAtOrigin;

        // Same side of the wall: visible
        assert!(has_line_of_sight(
            &occ,
            Vec3::new(1.0, 0.0, 0.0),
            1.6,
            Vec3::new(5.0, 0.0, 0.0),
            u32::MAX,
        ));

        // Across the wall: occluded
        assert!(!has_line_of_sight(
            &occ,
            Vec3::new(1.0, 0.0, 0.0),
            1.6,
            Vec3::new(-5.0, 0.0, 0.0),
            u32::MAX,
        ));
    }
}
