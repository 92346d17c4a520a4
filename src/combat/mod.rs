//! Combat controller
//!
//! Owns attack range checks, attack-sequence timing, damage application,
//! and obstacle-destruction sequencing. Sequences are synchronized to the
//! external animation player: damage is applied only once the impact
//! callback confirms the swing connected, never on elapsed time alone.

mod signals;

pub use signals::{
    AnimEvent, AnimationDriver, NullAnimator, SIGNAL_ATTACK, SIGNAL_BREAK_WALL,
    SIGNAL_RETURN_IDLE, SIGNAL_WAKE_UP, SignalTable, TimedAnimator,
};

use glam::Vec3;
use hecs::Entity;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::brain::SequenceStatus;
use crate::core::{CombatConfig, EventQueue, GameEvent, Timer};
use crate::ecs::{Transform, World};
use crate::motor::Motor;
use crate::senses::TargetKind;

/// Facing error below which the swing may start (radians).
const FACING_TOLERANCE: f32 = 0.15;

/// Safeguard on the rotate-to-face phase (seconds).
const FACE_TIMEOUT: f32 = 1.5;

/// What an attack sequence is aimed at.
#[derive(Debug, Clone, Copy)]
enum AttackKind {
    /// A detected target entity
    Target(Entity),
    /// A destructible obstacle by registry index
    Wall { obstacle: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttackPhase {
    /// Rotating to face the aim point
    Face,
    /// Swing played; waiting for the impact callback
    Windup,
    /// Impact resolved; waiting for the finished callback
    Recover,
}

/// One in-flight attack, advanced tick by tick.
///
/// The sequence always runs to its natural animation completion: a target
/// dying mid-swing suppresses the damage, not the animation.
#[derive(Debug)]
struct AttackSequence {
    kind: AttackKind,
    phase: AttackPhase,
    elapsed: f32,
    /// Last known aim point, refreshed while the target is observable
    aim: Vec3,
    damage_applied: bool,
}

/// Combat controller for one agent.
pub struct Combat {
    config: CombatConfig,
    signals: SignalTable,
    cooldown: Timer,
    sequence: Option<AttackSequence>,
    hitboxes_active: bool,
}

impl Combat {
    /// Create a combat controller with the given tuning and signal table.
    #[must_use]
    pub fn new(config: CombatConfig, signals: SignalTable) -> Self {
        Self {
            config,
            signals,
            cooldown: Timer::finished(),
            sequence: None,
            hitboxes_active: false,
        }
    }

    /// Whether an attack on `target` can start: target non-null, attack off
    /// cooldown, and target within attack range.
    #[must_use]
    pub fn can_attack_target(
        &self,
        world: &World,
        self_position: Vec3,
        target: Option<Entity>,
    ) -> bool {
        let Some(target) = target else {
            return false;
        };
        if !self.cooldown.is_finished() {
            return false;
        }
        let Ok(transform) = world.get::<Transform>(target) else {
            return false;
        };
        self_position.distance(transform.position) <= self.config.attack_range
    }

    /// Whether an attack or wall-break sequence is in flight.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.sequence.is_some()
    }

    /// Whether attack hitboxes are currently live.
    #[must_use]
    pub const fn hitboxes_active(&self) -> bool {
        self.hitboxes_active
    }

    /// Seconds left on the attack cooldown.
    #[must_use]
    pub const fn cooldown_remaining(&self) -> f32 {
        self.cooldown.remaining()
    }

    /// Advance the cooldown. Called every tick, sequence or not.
    pub fn tick_cooldown(&mut self, dt: f32) {
        self.cooldown.tick(dt);
    }

    /// Begin an attack on a target: halt, face, swing.
    pub fn start_attack(&mut self, target: Entity, aim: Vec3, motor: &mut Motor) {
        if self.sequence.is_some() {
            return;
        }
        motor.stop();
        motor.set_auto_face(false);
        self.sequence = Some(AttackSequence {
            kind: AttackKind::Target(target),
            phase: AttackPhase::Face,
            elapsed: 0.0,
            aim,
            damage_applied: false,
        });
    }

    /// Begin a wall-break swing against an obstacle.
    pub fn start_wall_break(&mut self, obstacle: usize, aim: Vec3, motor: &mut Motor) {
        if self.sequence.is_some() {
            return;
        }
        motor.stop();
        motor.set_auto_face(false);
        self.sequence = Some(AttackSequence {
            kind: AttackKind::Wall { obstacle },
            phase: AttackPhase::Face,
            elapsed: 0.0,
            aim,
            damage_applied: false,
        });
    }

    /// Abort any in-flight sequence (agent death). Clears hitboxes and
    /// restores path-following rotation.
    pub fn cancel(&mut self, motor: &mut Motor) {
        self.sequence = None;
        self.hitboxes_active = false;
        motor.set_auto_face(true);
    }

    /// Advance the active sequence by one tick.
    ///
    /// Returns `Finished` on the tick the sequence completes (or when no
    /// sequence is active).
    #[allow(clippy::too_many_arguments)]
    pub fn tick(
        &mut self,
        world: &mut World,
        transform: &mut Transform,
        motor: &mut Motor,
        animator: &mut dyn AnimationDriver,
        events: &mut EventQueue,
        rng: &mut ChaCha8Rng,
        self_entity: Entity,
        dt: f32,
    ) -> SequenceStatus {
        let Some(mut seq) = self.sequence.take() else {
            return SequenceStatus::Finished;
        };

        // Refresh the aim point while the target is still observable
        if let AttackKind::Target(target) = seq.kind
            && let Ok(t) = world.get::<Transform>(target)
        {
            seq.aim = t.position;
        }

        seq.elapsed += dt;
        let mut finished = false;

        match seq.phase {
            AttackPhase::Face => {
                motor.rotate_towards(transform, seq.aim, dt);
                if transform.is_facing(seq.aim, FACING_TOLERANCE) || seq.elapsed >= FACE_TIMEOUT {
                    let (signal, sound) = match seq.kind {
                        AttackKind::Target(_) => (SIGNAL_ATTACK, "attack_swing"),
                        AttackKind::Wall { .. } => (SIGNAL_BREAK_WALL, "wall_swing"),
                    };
                    let variants = self.signals.variant_count(signal).unwrap_or(0);
                    let played = if variants == 0 {
                        log::warn!("agent {self_entity:?}: unknown attack signal '{signal}'");
                        false
                    } else {
                        let variant = rng.gen_range(0..variants);
                        animator.play(signal, variant)
                    };

                    if played {
                        self.hitboxes_active = true;
                        events.push(GameEvent::PlaySound {
                            name: sound,
                            position: Some(transform.position),
                            volume: 1.0,
                        });
                        seq.phase = AttackPhase::Windup;
                        seq.elapsed = 0.0;
                    } else {
                        // Missing animator: skip the swing entirely rather
                        // than crash the tick loop
                        log::warn!("agent {self_entity:?}: animation driver rejected swing");
                        finished = true;
                    }
                }
            }

            AttackPhase::Windup => {
                motor.rotate_towards(transform, seq.aim, dt);
                match animator.poll_event() {
                    Some(AnimEvent::Impact) => {
                        self.resolve_impact(&mut seq, world, transform, events, self_entity);
                        seq.phase = AttackPhase::Recover;
                        seq.elapsed = 0.0;
                    }
                    Some(AnimEvent::Finished) => {
                        // Clip ended without an impact callback; no damage
                        finished = true;
                    }
                    None => {
                        if seq.elapsed >= self.config.event_timeout {
                            log::warn!(
                                "agent {self_entity:?}: impact callback never arrived, aborting swing"
                            );
                            finished = true;
                        }
                    }
                }
            }

            AttackPhase::Recover => match animator.poll_event() {
                Some(AnimEvent::Finished) => finished = true,
                Some(AnimEvent::Impact) => {} // duplicate impact, hitboxes already resolved
                None => {
                    if seq.elapsed >= self.config.event_timeout {
                        log::warn!(
                            "agent {self_entity:?}: finished callback never arrived, forcing recovery"
                        );
                        finished = true;
                    }
                }
            },
        }

        if finished {
            self.hitboxes_active = false;
            self.cooldown.restart(self.config.attack_cooldown);
            motor.set_auto_face(true);
            SequenceStatus::Finished
        } else {
            self.sequence = Some(seq);
            SequenceStatus::Running
        }
    }

    /// Apply the consequences of a confirmed impact.
    fn resolve_impact(
        &mut self,
        seq: &mut AttackSequence,
        world: &mut World,
        transform: &Transform,
        events: &mut EventQueue,
        self_entity: Entity,
    ) {
        match seq.kind {
            AttackKind::Target(target) => {
                if seq.damage_applied {
                    return;
                }
                // Re-validate at the moment of impact: the target must
                // still be alive and in range for damage to land
                if !world.is_alive(target) {
                    return;
                }
                let in_range = world.get::<Transform>(target).is_ok_and(|t| {
                    transform.position.distance(t.position) <= self.config.attack_range
                });
                if !in_range {
                    return;
                }

                let amount = match world.get::<TargetKind>(target).map(|k| *k) {
                    Ok(TargetKind::Player) => self.config.damage_player,
                    _ => self.config.damage_npc,
                };

                world.apply_damage(target, amount, Some(self_entity), events);
                seq.damage_applied = true;
            }

            AttackKind::Wall { obstacle } => {
                events.push(GameEvent::ObstacleHit {
                    obstacle,
                    impact_point: seq.aim,
                    impact_direction: transform.forward(),
                });
                events.push(GameEvent::PlaySound {
                    name: "wall_break",
                    position: Some(seq.aim),
                    volume: 1.0,
                });
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Health;
    use crate::nav::{GridNav, NavGrid};
    use rand::SeedableRng;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Accepts every play but never emits a callback; exercises timeouts.
    struct SilentAnimator;

    impl AnimationDriver for SilentAnimator {
        fn play(&mut self, _signal: &str, _variant: u32) -> bool {
            true
        }
        fn poll_event(&mut self) -> Option<AnimEvent> {
            None
        }
    }

    struct Rig {
        world: World,
        motor: Motor,
        events: EventQueue,
        rng: ChaCha8Rng,
        agent: Entity,
        transform: Transform,
    }

    fn rig() -> Rig {
        let mut world = World::new();
        let agent = world.spawn(());
        let grid = Rc::new(RefCell::new(NavGrid::new(20, 20, 1.0)));
        Rig {
            world,
            motor: Motor::new(Box::new(GridNav::new(grid)), 10.0),
            events: EventQueue::new(),
            rng: ChaCha8Rng::seed_from_u64(7),
            agent,
            // Forward is -Z; targets are spawned straight ahead
            transform: Transform::from_position(Vec3::ZERO),
        }
    }

    fn spawn_target(world: &mut World, kind: TargetKind, position: Vec3, hp: f32) -> Entity {
        world.spawn((Transform::from_position(position), kind, Health::new(hp)))
    }

    fn run_sequence(
        combat: &mut Combat,
        rig: &mut Rig,
        animator: &mut dyn AnimationDriver,
        max_ticks: usize,
    ) -> usize {
        let dt = 1.0 / 60.0;
        for tick in 0..max_ticks {
            animator.advance(dt);
            let status = combat.tick(
                &mut rig.world,
                &mut rig.transform,
                &mut rig.motor,
                animator,
                &mut rig.events,
                &mut rig.rng,
                rig.agent,
                dt,
            );
            combat.tick_cooldown(dt);
            if status == SequenceStatus::Finished {
                return tick;
            }
        }
        panic!("sequence did not finish within {max_ticks} ticks");
    }

    #[test]
    fn test_attack_range_and_cooldown_cycle() {
        let mut rig = rig();
        let mut combat = Combat::new(CombatConfig::default(), SignalTable::standard());
        let target = spawn_target(
            &mut rig.world,
            TargetKind::Player,
            Vec3::new(0.0, 0.0, -2.0),
            100.0,
        );

        // In range (2.0 <= 2.5), off cooldown
        assert!(combat.can_attack_target(&rig.world, rig.transform.position, Some(target)));
        assert!(!combat.can_attack_target(&rig.world, rig.transform.position, None));

        // Out of range
        let far = spawn_target(
            &mut rig.world,
            TargetKind::Player,
            Vec3::new(0.0, 0.0, -9.0),
            100.0,
        );
        assert!(!combat.can_attack_target(&rig.world, rig.transform.position, Some(far)));

        // Run one full attack cycle
        let aim = Vec3::new(0.0, 0.0, -2.0);
        combat.start_attack(target, aim, &mut rig.motor);
        assert!(combat.is_busy());
        let mut animator = TimedAnimator::new(0.2, 0.5);
        run_sequence(&mut combat, &mut rig, &mut animator, 600);

        // Cooldown restarted: cannot attack again until it expires
        assert!(!combat.can_attack_target(&rig.world, rig.transform.position, Some(target)));
        for _ in 0..200 {
            combat.tick_cooldown(1.0 / 60.0);
        }
        assert!(combat.can_attack_target(&rig.world, rig.transform.position, Some(target)));
    }

    #[test]
    fn test_damage_applied_once_after_impact() {
        let mut rig = rig();
        let config = CombatConfig::default();
        let damage = config.damage_player;
        let mut combat = Combat::new(config, SignalTable::standard());
        let target = spawn_target(
            &mut rig.world,
            TargetKind::Player,
            Vec3::new(0.0, 0.0, -2.0),
            100.0,
        );

        combat.start_attack(target, Vec3::new(0.0, 0.0, -2.0), &mut rig.motor);
        let mut animator = TimedAnimator::new(0.2, 0.5);
        run_sequence(&mut combat, &mut rig, &mut animator, 600);

        let hp = rig.world.get::<Health>(target).unwrap().current;
        assert!((hp - (100.0 - damage)).abs() < 1e-4, "exactly one application");
        assert!(!combat.hitboxes_active(), "hitboxes cleared after the cycle");
    }

    #[test]
    fn test_no_damage_when_target_dies_before_impact() {
        let mut rig = rig();
        let mut combat = Combat::new(CombatConfig::default(), SignalTable::standard());
        let target = spawn_target(
            &mut rig.world,
            TargetKind::Npc,
            Vec3::new(0.0, 0.0, -2.0),
            50.0,
        );

        combat.start_attack(target, Vec3::new(0.0, 0.0, -2.0), &mut rig.motor);
        let mut animator = TimedAnimator::new(0.3, 0.8);

        // A few ticks in, before the impact callback, the target dies
        let dt = 1.0 / 60.0;
        for _ in 0..5 {
            animator.advance(dt);
            combat.tick(
                &mut rig.world,
                &mut rig.transform,
                &mut rig.motor,
                &mut animator,
                &mut rig.events,
                &mut rig.rng,
                rig.agent,
                dt,
            );
        }
        rig.world.get_mut::<Health>(target).unwrap().damage(1000.0);

        // The sequence still runs to completion
        run_sequence(&mut combat, &mut rig, &mut animator, 600);

        // No damage event came from the attack
        rig.events.swap();
        let damaged = rig
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::EntityDamaged { .. }))
            .count();
        assert_eq!(damaged, 0, "dead targets take no swing damage");
    }

    #[test]
    fn test_event_timeout_safeguard() {
        let mut rig = rig();
        let config = CombatConfig {
            event_timeout: 0.5,
            ..Default::default()
        };
        let mut combat = Combat::new(config, SignalTable::standard());
        let target = spawn_target(
            &mut rig.world,
            TargetKind::Player,
            Vec3::new(0.0, 0.0, -2.0),
            100.0,
        );

        combat.start_attack(target, Vec3::new(0.0, 0.0, -2.0), &mut rig.motor);
        let mut animator = SilentAnimator;
        // Must complete despite no callbacks ever arriving
        run_sequence(&mut combat, &mut rig, &mut animator, 600);

        let hp = rig.world.get::<Health>(target).unwrap().current;
        assert_eq!(hp, 100.0, "timeout path applies no damage");
    }

    #[test]
    fn test_wall_break_emits_obstacle_hit() {
        let mut rig = rig();
        let mut combat = Combat::new(CombatConfig::default(), SignalTable::standard());

        combat.start_wall_break(3, Vec3::new(0.0, 0.0, -1.5), &mut rig.motor);
        let mut animator = TimedAnimator::new(0.2, 0.5);
        run_sequence(&mut combat, &mut rig, &mut animator, 600);

        rig.events.swap();
        let hit = rig.events.iter().find_map(|e| match e {
            GameEvent::ObstacleHit { obstacle, .. } => Some(*obstacle),
            _ => None,
        });
        assert_eq!(hit, Some(3));
    }

    #[test]
    fn test_missing_animator_degrades_gracefully() {
        let mut rig = rig();
        let mut combat = Combat::new(CombatConfig::default(), SignalTable::standard());
        let target = spawn_target(
            &mut rig.world,
            TargetKind::Player,
            Vec3::new(0.0, 0.0, -2.0),
            100.0,
        );

        combat.start_attack(target, Vec3::new(0.0, 0.0, -2.0), &mut rig.motor);
        let mut animator = NullAnimator;
        run_sequence(&mut combat, &mut rig, &mut animator, 600);

        assert!(!combat.is_busy());
        let hp = rig.world.get::<Health>(target).unwrap().current;
        assert_eq!(hp, 100.0);
    }
}
