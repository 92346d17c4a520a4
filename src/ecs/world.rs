//! World wrapper around hecs

use hecs::Entity;

use super::components::Health;
use crate::core::{EventQueue, GameEvent};

/// Game world containing all entities and components
pub struct World {
    /// The underlying hecs world
    pub inner: hecs::World,
}

impl World {
    /// Create a new empty world
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: hecs::World::new(),
        }
    }

    /// Spawn an entity with the given components
    pub fn spawn(&mut self, components: impl hecs::DynamicBundle) -> Entity {
        self.inner.spawn(components)
    }

    /// Despawn an entity
    pub fn despawn(&mut self, entity: Entity) -> Result<(), hecs::NoSuchEntity> {
        self.inner.despawn(entity)
    }

    /// Get a reference to a component
    pub fn get<T: hecs::Component>(
        &self,
        entity: Entity,
    ) -> Result<hecs::Ref<'_, T>, hecs::ComponentError> {
        self.inner.get::<&T>(entity)
    }

    /// Get a mutable reference to a component
    pub fn get_mut<T: hecs::Component>(
        &mut self,
        entity: Entity,
    ) -> Result<hecs::RefMut<'_, T>, hecs::ComponentError> {
        self.inner.get::<&mut T>(entity)
    }

    /// Check if an entity exists
    pub fn contains(&self, entity: Entity) -> bool {
        self.inner.contains(entity)
    }

    /// Liveness query for a target entity.
    ///
    /// Despawned entities are dead. Entities without a `Health` component
    /// (loose props) cannot die and always count as alive.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        if !self.inner.contains(entity) {
            return false;
        }
        self.get::<Health>(entity).map_or(true, |h| h.is_alive())
    }

    /// Damage sink: apply damage to an entity's health, emitting
    /// `EntityDamaged` and, when the entity dies from it, `EntityDied`.
    ///
    /// No-op for entities without health. Returns true if damage applied.
    pub fn apply_damage(
        &mut self,
        entity: Entity,
        amount: f32,
        source: Option<Entity>,
        events: &mut EventQueue,
    ) -> bool {
        let Ok(mut health) = self.get_mut::<Health>(entity) else {
            return false;
        };
        let was_alive = health.is_alive();
        health.damage(amount);
        let died = was_alive && !health.is_alive();
        drop(health);

        events.push(GameEvent::EntityDamaged {
            entity,
            amount,
            source,
        });
        if died {
            events.push(GameEvent::EntityDied { entity });
        }
        true
    }

    /// Get the number of entities
    pub fn len(&self) -> u32 {
        self.inner.len()
    }

    /// Check if the world is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Clear all entities from the world
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Query for entities with specific components
    pub fn query<Q: hecs::Query>(&self) -> hecs::QueryBorrow<'_, Q> {
        self.inner.query::<Q>()
    }

    /// Query for entities with specific components (mutable)
    pub fn query_mut<Q: hecs::Query>(&mut self) -> hecs::QueryMut<'_, Q> {
        self.inner.query_mut::<Q>()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_alive_semantics() {
        let mut world = World::new();
        let mut events = EventQueue::new();

        let living = world.spawn((Health::new(10.0),));
        let prop = world.spawn(());

        assert!(world.is_alive(living));
        assert!(world.is_alive(prop), "props without health never die");

        world.apply_damage(living, 10.0, None, &mut events);
        assert!(!world.is_alive(living));

        world.despawn(prop).unwrap();
        assert!(!world.is_alive(prop));
    }

    #[test]
    fn test_apply_damage_emits_events() {
        let mut world = World::new();
        let mut events = EventQueue::new();
        let entity = world.spawn((Health::new(10.0),));

        assert!(world.apply_damage(entity, 10.0, None, &mut events));
        events.swap();

        let collected: Vec<_> = events.iter().collect();
        assert_eq!(collected.len(), 2, "damaged + died");
        assert!(matches!(collected[0], GameEvent::EntityDamaged { .. }));
        assert!(matches!(collected[1], GameEvent::EntityDied { .. }));

        // Damaging a prop with no health is a no-op
        let prop = world.spawn(());
        assert!(!world.apply_damage(prop, 10.0, None, &mut events));
    }
}
