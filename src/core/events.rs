//! Event Queue for Decoupled Communication
//!
//! A type-safe, double-buffered event queue that decouples the AI core from
//! its consumers (audio, VFX, obstacle handling). Events are written during
//! one tick and processed in the next, keeping per-tick behavior consistent
//! regardless of agent update order.
//!
//! # Design Principles
//!
//! - **Type Safety**: All events are strongly typed via the `GameEvent` enum
//! - **Double Buffering**: Events are tick-consistent (no mid-tick mutations)
//! - **Simplicity**: No pub/sub machinery - just push and iterate

use std::collections::VecDeque;

use glam::Vec3;
use hecs::Entity;

use crate::senses::TargetKind;

// ============================================================================
// Event Types
// ============================================================================

/// Events produced by the pursuit subsystem.
///
/// Side-effect notifications (sound, VFX) are fire-and-forget: the core
/// pushes them and owns no audio or visual state.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum GameEvent {
    // -------------------------------------------------------------------------
    // Detection
    // -------------------------------------------------------------------------
    /// An agent acquired a target.
    TargetAcquired {
        /// The detecting agent
        agent: Entity,
        /// The detected target
        target: Entity,
        /// What kind of target was detected
        kind: TargetKind,
    },

    /// An agent lost its current target.
    TargetLost {
        /// The agent that lost its target
        agent: Entity,
        /// Where the target was last observed
        last_known_position: Vec3,
    },

    // -------------------------------------------------------------------------
    // Behavior
    // -------------------------------------------------------------------------
    /// An agent's behavior state changed.
    StateChanged {
        /// The agent whose state changed
        agent: Entity,
        /// Name of the state that was left
        from: &'static str,
        /// Name of the state that was entered
        to: &'static str,
    },

    // -------------------------------------------------------------------------
    // Combat
    // -------------------------------------------------------------------------
    /// An entity took damage.
    EntityDamaged {
        /// The entity that was damaged
        entity: Entity,
        /// Amount of damage dealt
        amount: f32,
        /// Entity that caused the damage, if any
        source: Option<Entity>,
    },

    /// An entity's health reached zero.
    EntityDied {
        /// The entity that died
        entity: Entity,
    },

    // -------------------------------------------------------------------------
    // Obstacles
    // -------------------------------------------------------------------------
    /// An agent's wall-break attack connected with an obstacle.
    ///
    /// Consumed by the simulation driver, which triggers the obstacle's
    /// destruction on the following tick.
    ObstacleHit {
        /// Index of the obstacle in the obstacle registry
        obstacle: usize,
        /// World-space impact point
        impact_point: Vec3,
        /// Direction of the blow (agent forward)
        impact_direction: Vec3,
    },

    /// An obstacle finished its destruction transition.
    ObstacleDestroyed {
        /// Index of the destroyed obstacle
        obstacle: usize,
    },

    /// The navigation surface was rebuilt.
    NavSurfaceRebuilt {
        /// New surface version
        version: u64,
    },

    // -------------------------------------------------------------------------
    // Audio / VFX
    // -------------------------------------------------------------------------
    /// Request to play a sound effect.
    PlaySound {
        /// Sound cue name
        name: &'static str,
        /// Position for 3D audio (None for 2D)
        position: Option<Vec3>,
        /// Volume multiplier (0.0 to 1.0)
        volume: f32,
    },
}

// ============================================================================
// Event Queue
// ============================================================================

/// Double-buffered event queue for tick-consistent event processing.
///
/// Events pushed during tick N are available for reading during tick N+1.
/// This prevents issues where event order depends on agent update order.
#[derive(Debug)]
pub struct EventQueue {
    /// Events being written this tick
    pending: VecDeque<GameEvent>,
    /// Events from the previous tick, ready for processing
    processing: VecDeque<GameEvent>,
}

impl EventQueue {
    /// Default initial capacity for event queues.
    const DEFAULT_CAPACITY: usize = 64;

    /// Create a new event queue with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a new event queue with specified initial capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(capacity),
            processing: VecDeque::with_capacity(capacity),
        }
    }

    /// Push an event to be processed next tick.
    #[inline]
    pub fn push(&mut self, event: GameEvent) {
        self.pending.push_back(event);
    }

    /// Swap the pending and processing queues.
    ///
    /// Call this once per tick, at the start of the update loop. After
    /// swapping, `iter()` returns events from the previous tick and `push()`
    /// writes to the new pending queue.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.pending, &mut self.processing);
        self.pending.clear();
    }

    /// Iterate over events from the previous tick.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &GameEvent> {
        self.processing.iter()
    }

    /// Drain all events from the previous tick.
    #[inline]
    pub fn drain(&mut self) -> impl Iterator<Item = GameEvent> + '_ {
        self.processing.drain(..)
    }

    /// Check if there are any events to process.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.processing.is_empty()
    }

    /// Number of events ready for processing.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.processing.len()
    }

    /// Number of events pending for next tick.
    #[must_use]
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Clear all events (both pending and processing).
    ///
    /// Useful for level transitions or resetting simulation state.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.processing.clear();
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper to create a test entity
    fn test_entity() -> Entity {
        let mut world = hecs::World::new();
        world.spawn(())
    }

    #[test]
    fn test_event_queue_push_and_swap() {
        let mut queue = EventQueue::new();

        queue.push(GameEvent::NavSurfaceRebuilt { version: 1 });
        assert!(queue.is_empty(), "Events should not be visible before swap");

        queue.swap();
        assert_eq!(queue.len(), 1);

        let events: Vec<_> = queue.iter().collect();
        assert!(matches!(
            events[0],
            GameEvent::NavSurfaceRebuilt { version: 1 }
        ));
    }

    #[test]
    fn test_event_queue_double_buffer_isolation() {
        let mut queue = EventQueue::new();

        // Tick 1: Push event A
        queue.push(GameEvent::NavSurfaceRebuilt { version: 1 });
        queue.swap();

        // Tick 2: Push event B while A is being processed
        queue.push(GameEvent::NavSurfaceRebuilt { version: 2 });

        let events: Vec<_> = queue.iter().collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            GameEvent::NavSurfaceRebuilt { version: 1 }
        ));

        // Tick 3: Now we see event B
        queue.swap();
        let events: Vec<_> = queue.iter().collect();
        assert!(matches!(
            events[0],
            GameEvent::NavSurfaceRebuilt { version: 2 }
        ));
    }

    #[test]
    fn test_event_queue_drain() {
        let mut queue = EventQueue::new();

        queue.push(GameEvent::PlaySound {
            name: "roar",
            position: None,
            volume: 1.0,
        });
        queue.push(GameEvent::PlaySound {
            name: "wall_break",
            position: Some(Vec3::ZERO),
            volume: 0.8,
        });
        queue.swap();

        let events: Vec<_> = queue.drain().collect();
        assert_eq!(events.len(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_target_acquired_event() {
        let agent = test_entity();
        let target = test_entity();

        let event = GameEvent::TargetAcquired {
            agent,
            target,
            kind: TargetKind::Player,
        };

        if let GameEvent::TargetAcquired { kind, .. } = event {
            assert_eq!(kind, TargetKind::Player);
        } else {
            panic!("Wrong event type");
        }
    }
}
