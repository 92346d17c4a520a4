//! Behavior states
//!
//! The transition table of the enemy state machine. Every state returns an
//! explicit transition for every trigger it reacts to; multi-tick routines
//! (wake-up, attack, wall-break, investigate-wait) are resumable sequences
//! advanced one bounded step per tick.

use glam::Vec3;

use crate::brain::sequence::{ReturnSequence, SequenceStatus, WakeUpSequence};
use crate::core::GameEvent;
use crate::ecs::Transform;
use crate::physics::layers;

use super::agent::BrainCtx;
use super::fsm::{BehaviorState, State, Transition};

/// Forward probe length for the wall-in-path check (m).
const WALL_CHECK_DISTANCE: f32 = 3.0;

/// Seconds between chase path refreshes.
const CHASE_REPATH_INTERVAL: f32 = 0.25;

/// Safeguard on approaching an obstacle before giving up (s).
const BREAK_WALL_APPROACH_TIMEOUT: f32 = 8.0;

// ============================================================================
// Patrol
// ============================================================================

/// Cycling through the configured waypoints, pausing at each.
///
/// With an empty route the agent walks back to its spawn position and
/// holds there.
#[derive(Debug, Default)]
pub struct PatrolState {
    waypoint: usize,
    waiting: bool,
    wait_elapsed: f32,
}

impl PatrolState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn current_goal(&self, ctx: &BrainCtx<'_>) -> Vec3 {
        let route = &ctx.config.behavior.patrol_route;
        if route.is_empty() {
            ctx.spawn_pose.position
        } else {
            route[self.waypoint % route.len()]
        }
    }

    fn walk_to_goal(&self, ctx: &mut BrainCtx<'_>) {
        let goal = self.current_goal(ctx);
        let speed = ctx.config.locomotion.patrol_speed;
        let stop = ctx.config.locomotion.stopping_distance;
        ctx.motor.move_to(goal, speed, stop);
    }
}

impl State for PatrolState {
    fn kind(&self) -> BehaviorState {
        BehaviorState::Patrol
    }

    fn enter(&mut self, ctx: &mut BrainCtx<'_>) {
        ctx.motor.set_auto_face(true);
        self.walk_to_goal(ctx);
    }

    fn update(&mut self, ctx: &mut BrainCtx<'_>) -> Transition {
        if ctx.senses.has_target() {
            // Already on its feet: the wake-up shortens to the roar
            return Transition::to(AlertState::from_patrol());
        }

        if !self.waiting {
            if ctx.motor.has_arrived() {
                self.waiting = true;
                self.wait_elapsed = 0.0;
                ctx.motor.stop();
            }
            return Transition::None;
        }

        self.wait_elapsed += ctx.dt;
        if self.wait_elapsed >= ctx.config.behavior.patrol_wait_time {
            self.waiting = false;
            let route_len = ctx.config.behavior.patrol_route.len();
            if route_len > 0 {
                self.waypoint = (self.waypoint + 1) % route_len;
            }
            self.walk_to_goal(ctx);
        }
        Transition::None
    }
}

// ============================================================================
// Passive
// ============================================================================

/// Sub-mode of the passive state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassiveMode {
    Sleeping,
    Eating,
}

/// Unaware idle: sleeping or eating until the senses report something.
#[derive(Debug)]
pub struct PassiveState {
    mode: PassiveMode,
}

impl PassiveState {
    #[must_use]
    pub fn new(mode: PassiveMode) -> Self {
        Self { mode }
    }
}

impl State for PassiveState {
    fn kind(&self) -> BehaviorState {
        BehaviorState::Passive
    }

    fn enter(&mut self, ctx: &mut BrainCtx<'_>) {
        ctx.motor.stop();
        log::debug!("agent {:?}: passive ({:?})", ctx.entity, self.mode);
    }

    fn update(&mut self, ctx: &mut BrainCtx<'_>) -> Transition {
        if ctx.senses.has_target() {
            return Transition::to(AlertState::from_passive());
        }
        Transition::None
    }
}

// ============================================================================
// Alert
// ============================================================================

/// The committed wake-up routine.
///
/// Runs to completion regardless of whether the target stays detected;
/// only death cancels it (by discarding the state).
#[derive(Debug)]
pub struct AlertState {
    sequence: WakeUpSequence,
}

impl AlertState {
    /// Full wake-up from sleeping/eating: stand, pause, roar.
    #[must_use]
    pub fn from_passive() -> Self {
        Self {
            sequence: WakeUpSequence::new(),
        }
    }

    /// Shortened alert from patrol: the agent is already standing.
    #[must_use]
    pub fn from_patrol() -> Self {
        Self {
            sequence: WakeUpSequence::roar_only(),
        }
    }
}

impl State for AlertState {
    fn kind(&self) -> BehaviorState {
        BehaviorState::Alert
    }

    fn enter(&mut self, ctx: &mut BrainCtx<'_>) {
        ctx.motor.stop();
    }

    fn update(&mut self, ctx: &mut BrainCtx<'_>) -> Transition {
        let status = self.sequence.tick(
            ctx.dt,
            &mut *ctx.animator,
            ctx.events,
            ctx.entity,
            ctx.pose.position,
        );
        match status {
            SequenceStatus::Running => Transition::None,
            SequenceStatus::Finished => Transition::to(ChaseState::new()),
        }
    }
}

// ============================================================================
// Chase
// ============================================================================

/// Active pursuit of the current target.
#[derive(Debug)]
pub struct ChaseState {
    repath_timer: f32,
    sample_timer: f32,
    last_sample: Vec3,
    /// Whether the motor reported movement at the previous sample
    was_moving: bool,
    arrived_short: bool,
}

impl ChaseState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            repath_timer: 0.0,
            sample_timer: 0.0,
            last_sample: Vec3::ZERO,
            was_moving: false,
            arrived_short: false,
        }
    }

    fn pursue(&mut self, ctx: &mut BrainCtx<'_>, goal: Vec3) {
        let speed = ctx.config.locomotion.chase_speed;
        let stop = ctx.config.combat.attack_range * 0.6;
        ctx.motor.move_to(goal, speed, stop);
        self.repath_timer = CHASE_REPATH_INTERVAL;
    }
}

impl Default for ChaseState {
    fn default() -> Self {
        Self::new()
    }
}

impl State for ChaseState {
    fn kind(&self) -> BehaviorState {
        BehaviorState::Chase
    }

    fn enter(&mut self, ctx: &mut BrainCtx<'_>) {
        ctx.motor.set_auto_face(true);
        self.last_sample = ctx.pose.position;

        if let Some(goal) = ctx.senses.last_known_position() {
            self.pursue(ctx, goal);
        }
        self.was_moving = ctx.motor.is_moving();

        if !ctx.session.chase_music_started {
            ctx.session.chase_music_started = true;
            ctx.events.push(GameEvent::PlaySound {
                name: "chase_music",
                position: None,
                volume: 0.8,
            });
        }
    }

    fn update(&mut self, ctx: &mut BrainCtx<'_>) -> Transition {
        // Lost or invalidated target: fall back to the last known position
        let Some(target) = ctx.senses.current_target() else {
            return Transition::to(InvestigateState::new());
        };
        if !ctx.world.is_alive(target) {
            ctx.senses.clear_target();
            return Transition::to(InvestigateState::new());
        }

        // Destructible obstacle between here and the target: detour
        if ctx.config.combat.wall_breaking
            && let Some(obstacle) = ctx.senses.check_wall_in_path(
                ctx.physics,
                ctx.obstacles,
                ctx.pose,
                layers::OBSTACLE,
                WALL_CHECK_DISTANCE,
            )
        {
            return Transition::to(BreakWallState::new(obstacle));
        }

        // In range with the attack off cooldown: strike
        if ctx
            .combat
            .can_attack_target(ctx.world, ctx.pose.position, Some(target))
        {
            return Transition::to(AttackState::new(target));
        }

        // Stuck recovery: sustained intentional movement producing no
        // displacement
        self.sample_timer += ctx.dt;
        if self.sample_timer >= ctx.config.behavior.stuck_check_interval {
            self.sample_timer = 0.0;
            let displacement = self.last_sample.distance(ctx.pose.position);
            self.last_sample = ctx.pose.position;
            let moving = ctx.motor.is_moving();
            if moving
                && self.was_moving
                && displacement < ctx.config.behavior.stuck_min_displacement
            {
                log::debug!("agent {:?}: stuck while chasing, investigating", ctx.entity);
                ctx.motor.stop();
                return Transition::to(InvestigateState::new());
            }
            self.was_moving = moving;
        }

        // Keep pursuing; refresh the path on a short cadence
        self.repath_timer -= ctx.dt;
        if self.repath_timer <= 0.0
            && let Some(goal) = ctx.senses.last_known_position()
        {
            self.pursue(ctx, goal);
        }

        // Arrived without reaching attack range twice in a row: the target
        // is not reachable by path, treat as a recoverable pathing failure
        if ctx.motor.has_arrived() {
            let distance = ctx
                .world
                .get::<Transform>(target)
                .map_or(f32::INFINITY, |t| ctx.pose.position.distance(t.position));
            if distance > ctx.config.combat.attack_range {
                if self.arrived_short {
                    ctx.motor.stop();
                    return Transition::to(InvestigateState::new());
                }
                self.arrived_short = true;
                if let Some(goal) = ctx.senses.last_known_position() {
                    self.pursue(ctx, goal);
                }
            } else {
                self.arrived_short = false;
            }
        }

        Transition::None
    }
}

// ============================================================================
// Attack
// ============================================================================

/// Uninterruptible attack sequence, delegated to the combat controller.
#[derive(Debug)]
pub struct AttackState {
    target: hecs::Entity,
}

impl AttackState {
    #[must_use]
    pub fn new(target: hecs::Entity) -> Self {
        Self { target }
    }
}

impl State for AttackState {
    fn kind(&self) -> BehaviorState {
        BehaviorState::Attack
    }

    fn enter(&mut self, ctx: &mut BrainCtx<'_>) {
        let aim = ctx
            .world
            .get::<Transform>(self.target)
            .map_or_else(
                |_| ctx.senses.last_known_position().unwrap_or(ctx.pose.position),
                |t| t.position,
            );
        ctx.combat.start_attack(self.target, aim, ctx.motor);
    }

    fn update(&mut self, ctx: &mut BrainCtx<'_>) -> Transition {
        let status = ctx.combat.tick(
            ctx.world,
            ctx.pose,
            ctx.motor,
            &mut *ctx.animator,
            ctx.events,
            ctx.rng,
            ctx.entity,
            ctx.dt,
        );

        match status {
            SequenceStatus::Running => Transition::None,
            SequenceStatus::Finished => {
                if ctx.senses.has_target() && ctx.world.is_alive(self.target) {
                    Transition::to(ChaseState::new())
                } else {
                    ctx.senses.clear_target();
                    Transition::to(InvestigateState::new())
                }
            }
        }
    }
}

// ============================================================================
// BreakWall
// ============================================================================

/// Approach a destructible obstacle, face it, and smash through.
#[derive(Debug)]
pub struct BreakWallState {
    obstacle: usize,
    smashing: bool,
    approach_elapsed: f32,
}

impl BreakWallState {
    #[must_use]
    pub fn new(obstacle: usize) -> Self {
        Self {
            obstacle,
            smashing: false,
            approach_elapsed: 0.0,
        }
    }
}

impl State for BreakWallState {
    fn kind(&self) -> BehaviorState {
        BehaviorState::BreakWall
    }

    fn enter(&mut self, ctx: &mut BrainCtx<'_>) {
        if let Some(obstacle) = ctx.obstacles.try_get(self.obstacle) {
            let speed = ctx.config.locomotion.chase_speed;
            let stop = ctx.config.locomotion.stopping_distance;
            ctx.motor.move_to(obstacle.position(), speed, stop);
        }
    }

    fn update(&mut self, ctx: &mut BrainCtx<'_>) -> Transition {
        let Some(obstacle) = ctx.obstacles.try_get(self.obstacle) else {
            return Transition::to(ChaseState::new());
        };
        // Someone else already brought it down
        if !obstacle.is_intact() && !self.smashing {
            return Transition::to(ChaseState::new());
        }
        let wall_position = obstacle.position();

        if self.smashing {
            let status = ctx.combat.tick(
                ctx.world,
                ctx.pose,
                ctx.motor,
                &mut *ctx.animator,
                ctx.events,
                ctx.rng,
                ctx.entity,
                ctx.dt,
            );
            return match status {
                SequenceStatus::Running => Transition::None,
                SequenceStatus::Finished => Transition::to(ChaseState::new()),
            };
        }

        self.approach_elapsed += ctx.dt;
        if self.approach_elapsed >= BREAK_WALL_APPROACH_TIMEOUT {
            log::debug!(
                "agent {:?}: could not reach obstacle {}, investigating",
                ctx.entity,
                self.obstacle
            );
            ctx.motor.stop();
            return Transition::to(InvestigateState::new());
        }

        let mut to_wall = wall_position - ctx.pose.position;
        to_wall.y = 0.0;
        if to_wall.length() <= ctx.config.combat.wall_break_range {
            ctx.combat
                .start_wall_break(self.obstacle, wall_position, ctx.motor);
            self.smashing = true;
        }
        Transition::None
    }
}

// ============================================================================
// Investigate
// ============================================================================

/// Move to the last known position, then listen for a while.
#[derive(Debug, Default)]
pub struct InvestigateState {
    listening: bool,
    listen_elapsed: f32,
    no_goal: bool,
}

impl InvestigateState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl State for InvestigateState {
    fn kind(&self) -> BehaviorState {
        BehaviorState::Investigate
    }

    fn enter(&mut self, ctx: &mut BrainCtx<'_>) {
        ctx.motor.set_auto_face(true);
        match ctx.senses.last_known_position() {
            Some(goal) => {
                let speed = ctx.config.locomotion.chase_speed;
                let stop = ctx.config.locomotion.stopping_distance;
                ctx.motor.move_to(goal, speed, stop);
            }
            None => self.no_goal = true,
        }
    }

    fn update(&mut self, ctx: &mut BrainCtx<'_>) -> Transition {
        // A fresh detection pulls the agent straight back into the chase
        if ctx.senses.has_target() {
            return Transition::to(ChaseState::new());
        }

        if self.no_goal {
            return Transition::to(ReturnState::new());
        }

        if !self.listening {
            // Memory of the stimulus has gone stale: stop walking toward
            // it and just listen from here
            if ctx.motor.has_arrived() || !ctx.senses.remembers_target() {
                self.listening = true;
                self.listen_elapsed = 0.0;
                ctx.motor.stop();
            }
            return Transition::None;
        }

        self.listen_elapsed += ctx.dt;
        if self.listen_elapsed >= ctx.config.behavior.investigation_duration {
            return Transition::to(ReturnState::new());
        }
        Transition::None
    }
}

// ============================================================================
// Return
// ============================================================================

/// Return-to-idle posture, then back to patrol.
#[derive(Debug, Default)]
pub struct ReturnState {
    sequence: ReturnSequence,
}

impl ReturnState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl State for ReturnState {
    fn kind(&self) -> BehaviorState {
        BehaviorState::Return
    }

    fn enter(&mut self, ctx: &mut BrainCtx<'_>) {
        ctx.motor.stop();
        ctx.motor.set_auto_face(true);
        ctx.senses.clear_target();
    }

    fn update(&mut self, ctx: &mut BrainCtx<'_>) -> Transition {
        match self.sequence.tick(ctx.dt, &mut *ctx.animator) {
            SequenceStatus::Running => Transition::None,
            SequenceStatus::Finished => Transition::to(PatrolState::new()),
        }
    }
}

// ============================================================================
// Dead
// ============================================================================

/// Terminal state: the agent no longer reacts to anything.
#[derive(Debug, Default)]
pub struct DeadState;

impl State for DeadState {
    fn kind(&self) -> BehaviorState {
        BehaviorState::Dead
    }

    fn update(&mut self, _ctx: &mut BrainCtx<'_>) -> Transition {
        Transition::None
    }
}
