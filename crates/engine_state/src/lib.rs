//! # engine_state
//!
//! Sequencing of game-level states (menus, combat, game over, ...).
//!
//! - [`GameState`]: setup / cleanup / handle_event / update / draw.
//! - [`StateControl`]: a state's done flag and named successor.
//! - [`StateContext`]: the entity store and systems handed to every call.
//! - [`GameStateMachine`]: keeps one state active and runs transitions.

pub mod error;
pub mod machine;
pub mod state;

pub use error::StateError;
pub use machine::GameStateMachine;
pub use state::{GameState, StateContext, StateControl};
