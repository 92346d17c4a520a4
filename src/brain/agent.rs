//! The pursuing agent
//!
//! Owns the behavior state machine, senses, motor, combat controller, and
//! per-session flags, and wires them together once per simulation tick.

use hecs::Entity;
use rand_chacha::ChaCha8Rng;

use crate::combat::{AnimationDriver, Combat, SignalTable};
use crate::core::{AgentConfig, BehaviorStats, EventQueue, GameEvent, SpawnBehavior};
use crate::ecs::{Transform, World};
use crate::motor::Motor;
use crate::nav::NavProvider;
use crate::obstacle::ObstacleSet;
use crate::physics::Physics;
use crate::senses::Senses;

use super::fsm::{BehaviorState, StateMachine};
use super::states::{DeadState, PassiveMode, PassiveState, PatrolState};

/// Per-agent session flags.
///
/// Folded into the agent record and reset on respawn - never a
/// process-wide singleton.
#[derive(Debug, Default, Clone)]
pub struct SessionFlags {
    /// The chase-music stinger has already been requested this session
    pub chase_music_started: bool,
}

/// Everything a behavior state can touch during one tick.
pub struct BrainCtx<'a> {
    /// Seconds for this tick
    pub dt: f32,
    /// The agent's own entity
    pub entity: Entity,
    /// Spawn configuration
    pub config: &'a AgentConfig,
    /// The agent's pose for this tick (written back after the update)
    pub pose: &'a mut Transform,
    /// Entity world
    pub world: &'a mut World,
    /// Sensor fusion state
    pub senses: &'a mut Senses,
    /// Locomotion controller
    pub motor: &'a mut Motor,
    /// Combat controller
    pub combat: &'a mut Combat,
    /// External animation player
    pub animator: &'a mut dyn AnimationDriver,
    /// Outgoing event queue
    pub events: &'a mut EventQueue,
    /// Collision engine (occlusion + wall probes)
    pub physics: &'a Physics,
    /// Destructible obstacle registry
    pub obstacles: &'a ObstacleSet,
    /// Deterministic RNG
    pub rng: &'a mut ChaCha8Rng,
    /// Session flags
    pub session: &'a mut SessionFlags,
    /// Pose the agent spawned with
    pub spawn_pose: Transform,
}

/// The pursuing enemy: configuration plus all per-agent controllers.
pub struct Agent {
    entity: Entity,
    config: AgentConfig,
    spawn_pose: Transform,
    fsm: StateMachine,
    senses: Senses,
    motor: Motor,
    combat: Combat,
    animator: Box<dyn AnimationDriver>,
    session: SessionFlags,
    stats: BehaviorStats,
    enabled: bool,
}

impl Agent {
    /// Create an agent for an already spawned entity.
    ///
    /// The entity must carry a `Transform`; position and orientation stay
    /// owned by the world, the agent only references them.
    #[must_use]
    pub fn new(
        entity: Entity,
        config: AgentConfig,
        spawn_pose: Transform,
        nav: Box<dyn NavProvider>,
        animator: Box<dyn AnimationDriver>,
    ) -> Self {
        let fsm = Self::initial_machine(config.behavior.spawn_behavior);
        let senses = Senses::new(config.detection.clone());
        let motor = Motor::new(nav, config.locomotion.rotation_rate);
        let combat = Combat::new(config.combat.clone(), SignalTable::standard());

        Self {
            entity,
            config,
            spawn_pose,
            fsm,
            senses,
            motor,
            combat,
            animator,
            session: SessionFlags::default(),
            stats: BehaviorStats::new(),
            enabled: true,
        }
    }

    fn initial_machine(behavior: SpawnBehavior) -> StateMachine {
        match behavior {
            SpawnBehavior::Sleeping => StateMachine::new(PassiveState::new(PassiveMode::Sleeping)),
            SpawnBehavior::Eating => StateMachine::new(PassiveState::new(PassiveMode::Eating)),
            SpawnBehavior::Patrol => StateMachine::new(PatrolState::new()),
        }
    }

    /// The agent's entity id.
    #[must_use]
    pub const fn entity(&self) -> Entity {
        self.entity
    }

    /// The active behavior state.
    #[must_use]
    pub fn state(&self) -> BehaviorState {
        self.fsm.state()
    }

    /// Whether a target is currently detected.
    #[must_use]
    pub const fn has_target(&self) -> bool {
        self.senses.has_target()
    }

    /// The currently detected target.
    #[must_use]
    pub const fn current_target(&self) -> Option<Entity> {
        self.senses.current_target()
    }

    /// Behavior statistics for this session.
    #[must_use]
    pub const fn stats(&self) -> &BehaviorStats {
        &self.stats
    }

    /// Whether the agent still ticks (false after death).
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Advance the agent by one simulation tick.
    #[allow(clippy::too_many_arguments)]
    pub fn tick(
        &mut self,
        world: &mut World,
        physics: &Physics,
        obstacles: &ObstacleSet,
        events: &mut EventQueue,
        rng: &mut ChaCha8Rng,
        dt: f32,
    ) {
        if !self.enabled {
            return;
        }

        // Death notification from the external health system
        if !world.is_alive(self.entity) {
            self.on_death();
            return;
        }

        let Ok(pose_ref) = world.get::<Transform>(self.entity) else {
            log::warn!("agent {:?}: transform missing, skipping tick", self.entity);
            return;
        };
        let mut pose = *pose_ref;
        drop(pose_ref);

        self.combat.tick_cooldown(dt);

        // Attack and BreakWall are uninterruptible by new detections:
        // sensor fusion is skipped entirely while they run
        if self.fsm.state().evaluates_sensors() {
            self.senses
                .tick(&*world, physics, events, self.entity, &pose, true, dt);
        }

        let edge = {
            let mut ctx = BrainCtx {
                dt,
                entity: self.entity,
                config: &self.config,
                pose: &mut pose,
                world: &mut *world,
                senses: &mut self.senses,
                motor: &mut self.motor,
                combat: &mut self.combat,
                animator: &mut *self.animator,
                events: &mut *events,
                physics,
                obstacles,
                rng: &mut *rng,
                session: &mut self.session,
                spawn_pose: self.spawn_pose,
            };
            self.fsm.update(&mut ctx)
        };

        self.motor.update(&mut pose, dt);
        self.animator.advance(dt);

        if let Ok(mut transform) = world.get_mut::<Transform>(self.entity) {
            *transform = pose;
        }

        if let Some((from, to)) = edge {
            log::debug!("agent {:?}: {} -> {}", self.entity, from, to);
            events.push(GameEvent::StateChanged {
                agent: self.entity,
                from,
                to,
            });
            self.stats.record_transition(from, to);
        }
        self.stats.record_tick(self.fsm.state().name(), dt);
    }

    /// Terminal transition: cancel all in-flight sequences, halt
    /// locomotion, disable further ticking.
    pub fn on_death(&mut self) {
        if !self.enabled {
            return;
        }
        self.enabled = false;
        self.combat.cancel(&mut self.motor);
        self.motor.stop();
        self.fsm.replace(DeadState);
        log::info!("agent {:?}: died", self.entity);
    }

    /// Reset to the spawn state: spawn pose, initial behavior, cleared
    /// timers, targets and session flags.
    pub fn reset(&mut self, world: &mut World) {
        if let Ok(mut transform) = world.get_mut::<Transform>(self.entity) {
            *transform = self.spawn_pose;
        }

        self.fsm = Self::initial_machine(self.config.behavior.spawn_behavior);
        self.senses.forget();
        self.combat = Combat::new(self.config.combat.clone(), SignalTable::standard());
        self.motor.stop();
        self.motor.set_auto_face(true);
        self.session = SessionFlags::default();
        self.stats.reset();
        self.enabled = true;
        log::info!("agent {:?}: reset to spawn state", self.entity);
    }
}
