//! State-machine error types.

use engine_ecs::EcsError;

/// Errors raised while building or driving a
/// [`GameStateMachine`](crate::GameStateMachine).
///
/// Transition errors are fatal: the machine is left on the state it was
/// on and nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// A state name (initial or successor) is not registered.
    #[error("state '{0}' is not registered")]
    UnknownState(String),

    /// Two states were registered under the same name.
    #[error("state '{0}' registered more than once")]
    DuplicateState(String),

    /// The active state signalled completion without naming a successor.
    #[error("state '{0}' is done but names no next state")]
    MissingSuccessor(String),

    /// A transition was requested while the active state is not done.
    #[error("state '{0}' has not signalled completion")]
    NotDone(String),

    /// A state looked up a system that is not in the registry.
    #[error("system '{0}' is not registered")]
    UnknownSystem(String),

    /// A state's work against the entity store failed.
    #[error(transparent)]
    Ecs(#[from] EcsError),
}
