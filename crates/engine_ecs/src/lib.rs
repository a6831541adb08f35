//! # engine_ecs
//!
//! The entity store and everything that observes it.
//!
//! - [`EntityManager`]: owns entities and component instances, validates
//!   every operation, answers [`Aspect`](engine_component::Aspect) queries.
//! - [`EntityView`]: a transient kind → instance window produced by queries.
//! - [`EventQueue`] / [`EntityEvent`]: lifecycle events, drained once a tick.
//! - [`System`] / [`SystemRegistry`]: observers and the event fan-out.
//!
//! A tick runs in a fixed order: flush queued removals, drain and dispatch
//! lifecycle events, run per-tick systems, draw.
//! [`SystemRegistry::process_lifecycle`] performs the first two steps.

pub mod error;
pub mod events;
pub mod manager;
pub mod system;
pub mod view;

pub use error::EcsError;
pub use events::{EntityEvent, EventQueue};
pub use manager::EntityManager;
pub use system::{System, SystemRegistry};
pub use view::EntityView;
