//! Simulation driver
//!
//! Owns the world, the collaborators (physics, navigation surface,
//! animation stand-ins), the obstacle registry, and all agents, and steps
//! everything once per frame in a fixed, deterministic order:
//!
//! 1. swap the event queue and act on last tick's events
//! 2. advance obstacle destruction bookkeeping (rebuild, freeze, despawn)
//! 3. recompute noise emission from entity motion
//! 4. tick every agent (senses, brain, motor, combat)
//! 5. step fragment physics
//!
//! Single-threaded and cooperative: one tick per agent per frame, no agent
//! threads.

use glam::Vec3;
use hecs::Entity;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

use crate::brain::Agent;
use crate::combat::{AnimationDriver, TimedAnimator};
use crate::core::{AgentConfig, EventQueue, GameEvent, ObstacleConfig, TickClock};
use crate::ecs::{Health, Transform, World};
use crate::nav::{GridNav, NavGrid};
use crate::obstacle::{DestructibleObstacle, ObstacleSet};
use crate::physics::Physics;
use crate::senses::{NoiseSource, TargetKind};

/// Default hit points for spawned characters.
const DEFAULT_HEALTH: f32 = 100.0;

/// The whole pursuit simulation for one level.
pub struct Simulation {
    /// Entity world
    pub world: World,
    /// Collision engine
    pub physics: Physics,
    /// Shared navigation surface
    pub nav: Rc<RefCell<NavGrid>>,
    /// Destructible obstacle registry
    pub obstacles: ObstacleSet,
    /// Outgoing events (readable between ticks)
    pub events: EventQueue,
    clock: TickClock,
    rng: ChaCha8Rng,
    agents: Vec<Agent>,
    /// Previous positions for noise-speed estimation
    prev_positions: FxHashMap<Entity, Vec3>,
}

impl Simulation {
    /// Create a simulation with a 64x64 navigation surface at 1m cells.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_grid(seed, NavGrid::new(64, 64, 1.0))
    }

    /// Create a simulation over a prepared navigation surface.
    #[must_use]
    pub fn with_grid(seed: u64, grid: NavGrid) -> Self {
        Self {
            world: World::new(),
            physics: Physics::new(),
            nav: Rc::new(RefCell::new(grid)),
            obstacles: ObstacleSet::new(),
            events: EventQueue::new(),
            clock: TickClock::from_hz(60.0),
            rng: ChaCha8Rng::seed_from_u64(seed),
            agents: Vec::new(),
            prev_positions: FxHashMap::default(),
        }
    }

    /// Seconds per tick.
    #[must_use]
    pub fn dt(&self) -> f32 {
        self.clock.dt()
    }

    /// Ticks stepped so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.clock.ticks()
    }

    /// Spawn a pursuing agent with the default timed animator.
    pub fn spawn_agent(&mut self, config: AgentConfig, position: Vec3) -> Entity {
        self.spawn_agent_with(config, position, Box::new(TimedAnimator::default()))
    }

    /// Spawn a pursuing agent with an explicit animation driver.
    pub fn spawn_agent_with(
        &mut self,
        config: AgentConfig,
        position: Vec3,
        animator: Box<dyn AnimationDriver>,
    ) -> Entity {
        let pose = Transform::from_position(position);
        let entity = self.world.spawn((pose, Health::new(DEFAULT_HEALTH)));
        let nav = Box::new(GridNav::new(self.nav.clone()));
        self.agents
            .push(Agent::new(entity, config, pose, nav, animator));
        entity
    }

    /// Spawn a player target.
    pub fn spawn_player(&mut self, position: Vec3, noise: NoiseSource) -> Entity {
        self.world.spawn((
            Transform::from_position(position),
            TargetKind::Player,
            Health::new(DEFAULT_HEALTH),
            noise,
        ))
    }

    /// Spawn an NPC target.
    pub fn spawn_npc(&mut self, position: Vec3, noise: NoiseSource) -> Entity {
        self.world.spawn((
            Transform::from_position(position),
            TargetKind::Npc,
            Health::new(DEFAULT_HEALTH),
            noise,
        ))
    }

    /// Spawn a noise-emitting prop.
    pub fn spawn_prop(&mut self, position: Vec3, noise: NoiseSource) -> Entity {
        self.world
            .spawn((Transform::from_position(position), TargetKind::Object, noise))
    }

    /// Spawn a destructible obstacle; returns its registry index.
    pub fn spawn_obstacle(
        &mut self,
        config: ObstacleConfig,
        center: Vec3,
        half_extents: Vec3,
    ) -> usize {
        let obstacle = DestructibleObstacle::spawn(
            &mut self.physics,
            &mut self.nav.borrow_mut(),
            config,
            center,
            half_extents,
        );
        self.obstacles.push(obstacle)
    }

    /// Agents in spawn order.
    #[must_use]
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// The agent controlling `entity`, if any.
    #[must_use]
    pub fn agent(&self, entity: Entity) -> Option<&Agent> {
        self.agents.iter().find(|a| a.entity() == entity)
    }

    /// Mutable access to the agent controlling `entity`.
    pub fn agent_mut(&mut self, entity: Entity) -> Option<&mut Agent> {
        self.agents.iter_mut().find(|a| a.entity() == entity)
    }

    /// Teleport an entity (test and editor helper).
    pub fn move_entity(&mut self, entity: Entity, position: Vec3) {
        if let Ok(mut transform) = self.world.get_mut::<Transform>(entity) {
            transform.position = position;
        }
    }

    /// Advance the simulation by one fixed tick.
    pub fn tick(&mut self) {
        let dt = self.clock.step();

        // 1. Events from the previous tick become visible and actionable
        self.events.swap();
        self.process_events();

        // 2. Obstacle destruction bookkeeping
        self.obstacles.update_all(
            &mut self.physics,
            &mut self.nav.borrow_mut(),
            &mut self.events,
            dt,
        );

        // 3. Noise emission follows entity motion
        self.update_noise(dt);

        // 4. Agents
        for agent in &mut self.agents {
            agent.tick(
                &mut self.world,
                &self.physics,
                &self.obstacles,
                &mut self.events,
                &mut self.rng,
                dt,
            );
        }

        // 5. Fragment physics
        self.physics.step(dt);
    }

    /// Run a fixed number of ticks.
    pub fn run(&mut self, ticks: u32) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    fn process_events(&mut self) {
        // Collect first: acting on an event mutates sibling fields
        let mut obstacle_hits: Vec<(usize, Vec3, Vec3)> = Vec::new();
        let mut deaths: Vec<Entity> = Vec::new();

        for event in self.events.iter() {
            match event {
                GameEvent::ObstacleHit {
                    obstacle,
                    impact_point,
                    impact_direction,
                } => obstacle_hits.push((*obstacle, *impact_point, *impact_direction)),
                GameEvent::EntityDied { entity } => deaths.push(*entity),
                _ => {}
            }
        }

        for (index, impact_point, impact_direction) in obstacle_hits {
            let Some(obstacle) = self.obstacles.try_get_mut(index) else {
                log::warn!("obstacle hit on unknown index {index}");
                continue;
            };
            if obstacle.explode(&mut self.physics, &mut self.rng, impact_point, impact_direction)
            {
                self.events.push(GameEvent::ObstacleDestroyed { obstacle: index });
            }
        }

        for entity in deaths {
            if let Some(agent) = self.agents.iter_mut().find(|a| a.entity() == entity) {
                agent.on_death();
            }
        }
    }

    fn update_noise(&mut self, dt: f32) {
        for (entity, (transform, noise)) in
            self.world.query_mut::<(&Transform, &mut NoiseSource)>()
        {
            let speed = match self.prev_positions.get(&entity) {
                Some(prev) if dt > 0.0 => prev.distance(transform.position) / dt,
                _ => 0.0,
            };
            self.prev_positions.insert(entity, transform.position);
            noise.update(speed, dt);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
