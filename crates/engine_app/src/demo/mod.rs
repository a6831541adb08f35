//! A small top-down survival game built on the engine.
//!
//! The player holds out against a ring of enemies. Homing enemies chase
//! the player and cost a hit point on contact; drifting ones circle. A
//! round ends in victory, defeat or a timeout, and the next one starts
//! after a short game-over screen.

pub mod components;
pub mod states;
pub mod systems;

use std::rc::Rc;

use engine_ecs::{EntityManager, SystemRegistry};
use engine_state::{GameState, GameStateMachine, StateError};

use crate::config::GameConfig;
use crate::frame::Frame;
use crate::input::InputEvent;

use states::{CombatState, GameOverState, SPAWNING, SharedScoreboard, SpawningState};
use systems::{CENSUS, CensusSystem, HEALTH, HUD, HealthSystem, HudSystem, MOVEMENT, MovementSystem};

/// Register the demo's component kinds and systems.
pub fn register(entities: &mut EntityManager, systems: &mut SystemRegistry, config: &GameConfig) {
    components::register_all(entities);
    systems.insert(MOVEMENT, MovementSystem::new(config.contact_radius));
    systems.insert(HEALTH, HealthSystem::new());
    systems.insert(CENSUS, CensusSystem::default());
    systems.insert(HUD, HudSystem::default());
}

/// Build the state machine, starting at `Spawning`.
///
/// # Errors
///
/// [`StateError::DuplicateState`] if two states share a name.
pub fn machine(
    config: GameConfig,
    scoreboard: SharedScoreboard,
) -> Result<GameStateMachine<InputEvent, Frame>, StateError> {
    let states: [Box<dyn GameState<InputEvent, Frame>>; 3] = [
        Box::new(SpawningState::new(config.clone(), Rc::clone(&scoreboard))),
        Box::new(CombatState::new(config.clone(), Rc::clone(&scoreboard))),
        Box::new(GameOverState::new(config, scoreboard)),
    ];
    GameStateMachine::new(states, SPAWNING)
}
