//! Noise emission
//!
//! Every detectable entity carries a `NoiseSource` that converts its motion
//! state into an audible radius. Collisions add a transient spike on top of
//! the steady-state radius that decays back down linearly.

/// Seconds a collision spike takes to decay back to steady state.
const SPIKE_DECAY_DURATION: f32 = 2.0;

/// Noise emission component for a detectable entity.
#[derive(Debug, Clone)]
pub struct NoiseSource {
    /// Audible radius while standing still
    pub idle_radius: f32,
    /// Audible radius while walking
    pub walk_radius: f32,
    /// Audible radius while running
    pub run_radius: f32,
    /// Speed above which the entity counts as walking (m/s)
    pub walk_threshold: f32,
    /// Speed above which the entity counts as running (m/s)
    pub run_threshold: f32,
    /// Whether the entity is currently carried by a player
    carried: bool,
    /// Peak radius of the most recent collision spike
    spike_peak: f32,
    /// Seconds left on the current spike
    spike_remaining: f32,
    /// Radius computed on the last update
    current: f32,
}

impl NoiseSource {
    /// Create a noise source with the given radius tiers.
    #[must_use]
    pub fn new(idle_radius: f32, walk_radius: f32, run_radius: f32) -> Self {
        Self {
            idle_radius,
            walk_radius,
            run_radius,
            walk_threshold: 0.5,
            run_threshold: 3.5,
            carried: false,
            spike_peak: 0.0,
            spike_remaining: 0.0,
            current: idle_radius,
        }
    }

    /// A typical character profile: quiet hum when idle, louder per tier.
    #[must_use]
    pub fn character() -> Self {
        Self::new(0.5, 3.0, 7.0)
    }

    /// A silent-until-disturbed prop profile.
    #[must_use]
    pub fn prop() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Mark the entity as carried (or released). A carried entity emits
    /// nothing regardless of motion or spikes.
    pub fn set_carried(&mut self, carried: bool) {
        self.carried = carried;
    }

    /// Register a collision, spiking the audible radius. The spike decays
    /// linearly back to the steady-state radius.
    ///
    /// A weaker impact never shortens a louder spike already in flight.
    pub fn trigger_collision_noise(&mut self, impact_magnitude: f32) {
        let active = self.spike_level();
        if impact_magnitude > active {
            self.spike_peak = impact_magnitude;
            self.spike_remaining = SPIKE_DECAY_DURATION;
        }
    }

    /// Recompute the audible radius from the entity's current speed.
    /// Call once per tick.
    pub fn update(&mut self, speed: f32, dt: f32) {
        if self.spike_remaining > 0.0 {
            self.spike_remaining = (self.spike_remaining - dt).max(0.0);
        }

        if self.carried {
            self.current = 0.0;
            return;
        }

        let steady = if speed >= self.run_threshold {
            self.run_radius
        } else if speed >= self.walk_threshold {
            self.walk_radius
        } else {
            self.idle_radius
        };

        self.current = steady.max(self.spike_level());
    }

    /// The audible radius computed on the last update.
    #[must_use]
    pub const fn current_audible_radius(&self) -> f32 {
        self.current
    }

    fn spike_level(&self) -> f32 {
        if self.spike_remaining <= 0.0 {
            return 0.0;
        }
        self.spike_peak * (self.spike_remaining / SPIKE_DECAY_DURATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_tiers() {
        let mut noise = NoiseSource::character();

        noise.update(0.0, 0.1);
        assert_eq!(noise.current_audible_radius(), 0.5);

        noise.update(1.0, 0.1);
        assert_eq!(noise.current_audible_radius(), 3.0);

        noise.update(5.0, 0.1);
        assert_eq!(noise.current_audible_radius(), 7.0);
    }

    #[test]
    fn test_carried_forces_silence() {
        let mut noise = NoiseSource::character();
        noise.trigger_collision_noise(10.0);
        noise.set_carried(true);
        noise.update(5.0, 0.1);

        assert_eq!(noise.current_audible_radius(), 0.0);
    }

    #[test]
    fn test_collision_spike_decays_linearly() {
        let mut noise = NoiseSource::prop();
        noise.trigger_collision_noise(8.0);

        noise.update(0.0, 0.0);
        assert!((noise.current_audible_radius() - 8.0).abs() < 1e-4);

        // Halfway through the decay window
        noise.update(0.0, SPIKE_DECAY_DURATION / 2.0);
        assert!((noise.current_audible_radius() - 4.0).abs() < 1e-4);

        // Fully decayed back to the steady radius
        noise.update(0.0, SPIKE_DECAY_DURATION);
        assert_eq!(noise.current_audible_radius(), 0.0);
    }

    #[test]
    fn test_weaker_impact_does_not_cut_spike() {
        let mut noise = NoiseSource::prop();
        noise.trigger_collision_noise(8.0);
        noise.update(0.0, 0.5);

        let before = noise.current_audible_radius();
        noise.trigger_collision_noise(1.0);
        noise.update(0.0, 0.0);

        assert!(noise.current_audible_radius() >= before - 1e-4);
    }
}
