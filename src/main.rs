//! Headless demo scenario
//!
//! A sleeping enemy, a noisy player behind a destructible wall. Runs the
//! simulation for half a minute and logs detections, state transitions,
//! attacks, and the wall coming down.

use pursuit::prelude::*;

fn main() {
    env_logger::init();
    log::info!("Starting pursuit demo");

    let mut sim = Simulation::with_grid(42, NavGrid::new(24, 24, 1.0));

    // A wall splits the arena in two
    let wall = sim.spawn_obstacle(
        ObstacleConfig::default(),
        Vec3::new(12.0, 1.0, 12.0),
        Vec3::new(0.5, 1.0, 12.0),
    );

    // The enemy sleeps on the west side
    let mut config = AgentConfig::default();
    config.behavior.spawn_behavior = SpawnBehavior::Sleeping;
    config.detection.radius = 24.0;
    let enemy = sim.spawn_agent(config, Vec3::new(3.5, 0.0, 12.5));

    // The player paces around on the east side, making plenty of noise
    let player = sim.spawn_player(Vec3::new(19.5, 0.0, 12.5), NoiseSource::new(16.0, 16.0, 16.0));

    log::info!("enemy {enemy:?} sleeping, player {player:?} east of the wall");

    let seconds = 30;
    let mut last_state = sim.agent(enemy).map(|a| a.state());

    for _ in 0..(seconds * 60) {
        sim.tick();

        // Surface the tick's events the way a game shell would
        for event in sim.events.iter() {
            match event {
                GameEvent::PlaySound { name, .. } => log::info!("[audio] {name}"),
                GameEvent::TargetAcquired { target, kind, .. } => {
                    log::info!("[senses] acquired {target:?} ({kind:?})");
                }
                GameEvent::TargetLost { .. } => log::info!("[senses] target lost"),
                GameEvent::EntityDamaged { entity, amount, .. } => {
                    log::info!("[combat] {entity:?} took {amount} damage");
                }
                GameEvent::ObstacleDestroyed { obstacle } => {
                    log::info!("[world] obstacle {obstacle} destroyed");
                }
                GameEvent::NavSurfaceRebuilt { version } => {
                    log::info!("[nav] surface rebuilt (v{version})");
                }
                _ => {}
            }
        }

        let state = sim.agent(enemy).map(|a| a.state());
        if state != last_state {
            if let Some(state) = state {
                log::info!("[brain] -> {}", state.name());
            }
            last_state = state;
        }
    }

    if let Some(agent) = sim.agent(enemy) {
        let stats = agent.stats();
        log::info!(
            "done after {} ticks: wall intact = {}, chase time = {:.1}s, attacks = {}",
            sim.ticks(),
            sim.obstacles.get(wall).is_intact(),
            stats.time_in("Chase"),
            stats.transition_count("Chase", "Attack"),
        );
    }
}
