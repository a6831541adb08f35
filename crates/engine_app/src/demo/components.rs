//! Demo game components.
//!
//! Every component deserializes from JSON construction args, so each kind
//! is registered with the default deserializing factory.

use serde::{Deserialize, Serialize};

use engine_component::Component;
use engine_ecs::EntityManager;

/// The label carried by the player entity.
pub const PLAYER_LABEL: &str = "player";

/// World-space position, in units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    #[must_use]
    pub fn distance(&self, other: &Position) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl Component for Position {
    fn type_name() -> &'static str {
        "Position"
    }
}

/// Velocity, in units per second.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
}

impl Component for Velocity {
    fn type_name() -> &'static str {
        "Velocity"
    }
}

/// A name systems use to pick out particular entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
}

impl Component for Label {
    fn type_name() -> &'static str {
        "Label"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub current: i32,
    pub max: i32,
}

impl Health {
    #[must_use]
    pub fn full(max: i32) -> Self {
        Self { current: max, max }
    }

    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.current <= 0
    }
}

impl Component for Health {
    fn type_name() -> &'static str {
        "Health"
    }
}

// Movement styles. An entity carries exactly one of the three.

/// Keeps its velocity unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Drifting;

impl Component for Drifting {
    fn type_name() -> &'static str {
        "Drifting"
    }
}

/// Steers towards the player at `speed` units per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Homing {
    pub speed: f32,
}

impl Component for Homing {
    fn type_name() -> &'static str {
        "Homing"
    }
}

/// Directional input held by the player, turned into velocity each tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MovementFlags {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub speed: f32,
}

impl MovementFlags {
    /// The velocity the held directions produce.
    #[must_use]
    pub fn velocity(&self) -> Velocity {
        let axis = |neg: bool, pos: bool| match (neg, pos) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        };
        Velocity {
            x: axis(self.left, self.right) * self.speed,
            y: axis(self.down, self.up) * self.speed,
        }
    }
}

impl Component for MovementFlags {
    fn type_name() -> &'static str {
        "MovementFlags"
    }
}

/// Register every demo component kind under its type name.
pub fn register_all(manager: &mut EntityManager) {
    manager.register_component::<Position>(Position::type_name());
    manager.register_component::<Velocity>(Velocity::type_name());
    manager.register_component::<Label>(Label::type_name());
    manager.register_component::<Health>(Health::type_name());
    manager.register_component::<Drifting>(Drifting::type_name());
    manager.register_component::<Homing>(Homing::type_name());
    manager.register_component::<MovementFlags>(MovementFlags::type_name());
}
