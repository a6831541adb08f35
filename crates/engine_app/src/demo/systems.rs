//! Demo game systems.
//!
//! Each system keeps views of the entities it cares about, refreshed from
//! lifecycle events, and exposes its per-tick work as inherent methods the
//! game states call.

use std::collections::BTreeMap;

use engine_component::{Aspect, Component, EntityId};
use engine_ecs::{EcsError, EntityEvent, EntityManager, EntityView, System};

use crate::input::Direction;

use super::components::{
    Drifting, Health, Homing, Label, MovementFlags, PLAYER_LABEL, Position, Velocity,
};

/// Registry names of the demo systems.
pub const MOVEMENT: &str = "movement";
pub const HEALTH: &str = "health";
pub const CENSUS: &str = "census";
pub const HUD: &str = "hud";

fn is_player(manager: &EntityManager, id: EntityId) -> Result<bool, EcsError> {
    let aspect = Aspect::with([Label::type_name()]);
    Ok(manager
        .get_matching_entity(id, &aspect)?
        .and_then(|view| view.get::<Label>(Label::type_name()).map(|label| label.name == PLAYER_LABEL))
        .unwrap_or(false))
}

/// Moves every entity with a position, a velocity and one movement style.
///
/// Player-controlled entities take their velocity from [`MovementFlags`],
/// homing ones steer towards the player, drifting ones keep theirs.
#[derive(Debug)]
pub struct MovementSystem {
    aspect: Aspect,
    entities: BTreeMap<EntityId, EntityView>,
    player: Option<EntityId>,
    contact_radius: f32,
}

impl MovementSystem {
    #[must_use]
    pub fn new(contact_radius: f32) -> Self {
        Self {
            aspect: Aspect::with([Position::type_name(), Velocity::type_name()]).one_of([
                Drifting::type_name(),
                Homing::type_name(),
                MovementFlags::type_name(),
            ]),
            entities: BTreeMap::new(),
            player: None,
            contact_radius,
        }
    }

    #[cfg(test)]
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn player(&self) -> Option<EntityId> {
        self.player
    }

    fn player_position(&self) -> Option<Position> {
        let view = self.entities.get(&self.player?)?;
        view.get::<Position>(Position::type_name()).map(|p| *p)
    }

    /// Press or release a direction on the player's controls.
    pub fn handle_key(&mut self, direction: Direction, pressed: bool) {
        let Some(view) = self.player.and_then(|id| self.entities.get(&id)) else {
            return;
        };
        if let Some(mut flags) = view.get_mut::<MovementFlags>(MovementFlags::type_name()) {
            match direction {
                Direction::Up => flags.up = pressed,
                Direction::Down => flags.down = pressed,
                Direction::Left => flags.left = pressed,
                Direction::Right => flags.right = pressed,
            }
        }
    }

    /// Integrate one tick of movement.
    ///
    /// Returns the homing entities that ended the tick within contact
    /// radius of the player.
    pub fn apply(&mut self, dt: f32) -> Vec<EntityId> {
        let target = self.player_position();
        let mut contacts = Vec::new();

        for (&id, view) in &self.entities {
            let (Some(mut pos), Some(mut vel)) = (
                view.get_mut::<Position>(Position::type_name()),
                view.get_mut::<Velocity>(Velocity::type_name()),
            ) else {
                continue;
            };

            let homing = view.get::<Homing>(Homing::type_name()).map(|h| *h);
            if let Some(flags) = view.get::<MovementFlags>(MovementFlags::type_name()) {
                *vel = flags.velocity();
            } else if let (Some(homing), Some(target)) = (homing, target) {
                let (dx, dy) = (target.x - pos.x, target.y - pos.y);
                let len = (dx * dx + dy * dy).sqrt();
                if len > f32::EPSILON {
                    vel.x = dx / len * homing.speed;
                    vel.y = dy / len * homing.speed;
                }
            }

            pos.x += vel.x * dt;
            pos.y += vel.y * dt;

            if let (Some(_), Some(target)) = (homing, target)
                && pos.distance(&target) <= self.contact_radius
            {
                contacts.push(id);
            }
        }
        contacts
    }
}

impl System for MovementSystem {
    fn handle_event(&mut self, manager: &mut EntityManager, event: &EntityEvent) -> Result<(), EcsError> {
        match *event {
            EntityEvent::EntityAdded(id) if manager.is_alive(id) => {
                if let Some(view) = manager.get_matching_entity(id, &self.aspect)? {
                    if view.contains(MovementFlags::type_name()) && is_player(manager, id)? {
                        self.player = Some(id);
                    }
                    self.entities.insert(id, view);
                }
            }
            // Spawned and removed before this dispatch.
            EntityEvent::EntityAdded(_) => {}
            EntityEvent::RemoveEntity(id) => {
                self.entities.remove(&id);
                if self.player == Some(id) {
                    self.player = None;
                }
            }
        }
        Ok(())
    }
}

/// Tracks everything that can take damage.
#[derive(Debug)]
pub struct HealthSystem {
    aspect: Aspect,
    entities: BTreeMap<EntityId, EntityView>,
}

impl HealthSystem {
    #[must_use]
    pub fn new() -> Self {
        Self {
            aspect: Aspect::with([Health::type_name()]).optional([Label::type_name()]),
            entities: BTreeMap::new(),
        }
    }

    /// Current health of `id`, if tracked.
    #[cfg(test)]
    #[must_use]
    pub fn health_of(&self, id: EntityId) -> Option<Health> {
        self.entities
            .get(&id)?
            .get::<Health>(Health::type_name())
            .map(|h| *h)
    }

    /// Take `amount` off `id`'s health, returning what is left.
    pub fn damage(&mut self, id: EntityId, amount: i32) -> Option<i32> {
        let view = self.entities.get(&id)?;
        let mut health = view.get_mut::<Health>(Health::type_name())?;
        health.current = (health.current - amount).max(0);
        Some(health.current)
    }

    /// Tracked entities with no health left.
    #[must_use]
    pub fn dead(&self) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|(_, view)| {
                view.get::<Health>(Health::type_name())
                    .is_some_and(|h| h.is_dead())
            })
            .map(|(&id, _)| id)
            .collect()
    }
}

impl Default for HealthSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for HealthSystem {
    fn handle_event(&mut self, manager: &mut EntityManager, event: &EntityEvent) -> Result<(), EcsError> {
        match *event {
            EntityEvent::EntityAdded(id) if manager.is_alive(id) => {
                if let Some(view) = manager.get_matching_entity(id, &self.aspect)? {
                    self.entities.insert(id, view);
                }
            }
            EntityEvent::EntityAdded(_) => {}
            EntityEvent::RemoveEntity(id) => {
                self.entities.remove(&id);
            }
        }
        Ok(())
    }
}

/// Counts entity creations and removals.
#[derive(Debug, Default)]
pub struct CensusSystem {
    pub spawned: u64,
    pub removed: u64,
}

impl CensusSystem {
    #[must_use]
    pub fn alive(&self) -> u64 {
        self.spawned.saturating_sub(self.removed)
    }
}

impl System for CensusSystem {
    fn handle_event(&mut self, _: &mut EntityManager, event: &EntityEvent) -> Result<(), EcsError> {
        match event {
            EntityEvent::EntityAdded(_) => self.spawned += 1,
            EntityEvent::RemoveEntity(_) => self.removed += 1,
        }
        Ok(())
    }
}

/// Keeps the status text for the player up to date.
#[derive(Debug, Default)]
pub struct HudSystem {
    player: Option<EntityView>,
    lines: Vec<String>,
}

impl HudSystem {
    /// Rebuild the status lines from the player's current components.
    pub fn refresh(&mut self, enemies: u64) {
        self.lines.clear();
        let Some(player) = &self.player else {
            self.lines.push("no player".to_string());
            return;
        };
        if let Some(pos) = player.get::<Position>(Position::type_name()) {
            self.lines
                .push(format!("Player coords || x: {:.2} | y: {:.2}", pos.x, pos.y));
        }
        if let Some(health) = player.get::<Health>(Health::type_name()) {
            self.lines
                .push(format!("Player health || {}/{}", health.current, health.max));
        }
        self.lines.push(format!("Enemies || {enemies}"));
    }

    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl System for HudSystem {
    fn handle_event(&mut self, manager: &mut EntityManager, event: &EntityEvent) -> Result<(), EcsError> {
        match *event {
            EntityEvent::EntityAdded(id) if manager.is_alive(id) => {
                if is_player(manager, id)? {
                    let aspect = Aspect::with([Label::type_name()])
                        .optional([Position::type_name(), Health::type_name()]);
                    self.player = manager.get_matching_entity(id, &aspect)?;
                }
            }
            EntityEvent::EntityAdded(_) => {}
            EntityEvent::RemoveEntity(id) => {
                if self.player.as_ref().is_some_and(|view| view.entity() == id) {
                    self.player = None;
                }
            }
        }
        Ok(())
    }
}
