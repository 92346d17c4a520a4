//! Animation signal table and driver interface
//!
//! The combat sequencer never applies damage on elapsed time alone - it
//! waits for impact/finished callbacks from the external animation player
//! so damage timing matches the visual swing. Signals are validated against
//! a typed table built at initialization instead of being looked up by
//! string on every call; unknown signals are rejected as a logged no-op.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

/// Attack swing signal (multiple variants).
pub const SIGNAL_ATTACK: &str = "attack";
/// Wall-break swing signal.
pub const SIGNAL_BREAK_WALL: &str = "break_wall";
/// Wake-up roar signal.
pub const SIGNAL_WAKE_UP: &str = "wake_up";
/// Return-to-idle posture signal.
pub const SIGNAL_RETURN_IDLE: &str = "return_idle";

/// Callback events emitted by the animation player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimEvent {
    /// The swing connected; damage may be applied now.
    Impact,
    /// The clip finished playing.
    Finished,
}

/// External skeletal animation player, one per agent.
pub trait AnimationDriver {
    /// Start playing a signal variant. Returns false if the driver cannot
    /// play it (missing animator, unknown clip).
    fn play(&mut self, signal: &str, variant: u32) -> bool;

    /// Pop the next pending callback event, if any.
    fn poll_event(&mut self) -> Option<AnimEvent>;

    /// Advance internal playback time. Real engines drive themselves; the
    /// built-in stand-ins use this.
    fn advance(&mut self, _dt: f32) {}
}

/// Validated map of signal name to variant count.
///
/// Built once at agent initialization. `validate` is the only lookup the
/// hot path performs.
#[derive(Debug, Clone, Default)]
pub struct SignalTable {
    signals: FxHashMap<&'static str, u32>,
}

impl SignalTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard enemy signal set.
    #[must_use]
    pub fn standard() -> Self {
        let mut table = Self::new();
        table.register(SIGNAL_ATTACK, 3);
        table.register(SIGNAL_BREAK_WALL, 1);
        table.register(SIGNAL_WAKE_UP, 1);
        table.register(SIGNAL_RETURN_IDLE, 1);
        table
    }

    /// Register a signal with its variant count.
    pub fn register(&mut self, name: &'static str, variants: u32) {
        self.signals.insert(name, variants.max(1));
    }

    /// Number of variants for a signal, if known.
    #[must_use]
    pub fn variant_count(&self, name: &str) -> Option<u32> {
        self.signals.get(name).copied()
    }

    /// Whether `(name, variant)` names a registered animation.
    #[must_use]
    pub fn validate(&self, name: &str, variant: u32) -> bool {
        self.variant_count(name).is_some_and(|count| variant < count)
    }
}

/// Animation driver stand-in that fires `Impact` and `Finished` at fixed
/// offsets after `play`.
///
/// Serves as the external player in headless runs and tests.
#[derive(Debug)]
pub struct TimedAnimator {
    /// Seconds from play to the impact callback
    pub impact_delay: f32,
    /// Seconds from play to the finished callback
    pub finish_delay: f32,
    elapsed: f32,
    playing: bool,
    impact_sent: bool,
    queue: VecDeque<AnimEvent>,
}

impl TimedAnimator {
    /// Create a timed animator with the given callback offsets.
    #[must_use]
    pub fn new(impact_delay: f32, finish_delay: f32) -> Self {
        Self {
            impact_delay,
            finish_delay,
            elapsed: 0.0,
            playing: false,
            impact_sent: false,
            queue: VecDeque::new(),
        }
    }
}

impl Default for TimedAnimator {
    fn default() -> Self {
        Self::new(0.4, 1.0)
    }
}

impl AnimationDriver for TimedAnimator {
    fn play(&mut self, _signal: &str, _variant: u32) -> bool {
        self.elapsed = 0.0;
        self.playing = true;
        self.impact_sent = false;
        self.queue.clear();
        true
    }

    fn poll_event(&mut self) -> Option<AnimEvent> {
        self.queue.pop_front()
    }

    fn advance(&mut self, dt: f32) {
        if !self.playing {
            return;
        }
        self.elapsed += dt;

        if !self.impact_sent && self.elapsed >= self.impact_delay {
            self.impact_sent = true;
            self.queue.push_back(AnimEvent::Impact);
        }
        if self.elapsed >= self.finish_delay {
            self.playing = false;
            self.queue.push_back(AnimEvent::Finished);
        }
    }
}

/// Animation driver stand-in that accepts nothing.
///
/// Models a missing animator component; every `play` is rejected and no
/// events ever fire, exercising the degraded-collaborator path.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAnimator;

impl AnimationDriver for NullAnimator {
    fn play(&mut self, _signal: &str, _variant: u32) -> bool {
        false
    }

    fn poll_event(&mut self) -> Option<AnimEvent> {
        None
    }
}
