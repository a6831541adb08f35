//! Entity-store error types.

use engine_component::{ComponentName, EntityId, FactoryError};

/// Errors reported by [`EntityManager`](crate::EntityManager) operations.
///
/// Every variant is a contract violation by the caller. The store validates
/// before mutating, so receiving one of these means nothing was changed.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// An operation referenced a component kind that was never registered.
    #[error("unknown component kind '{kind}'")]
    UnknownComponent { kind: ComponentName },

    /// A factory could not build a component from the supplied arguments.
    #[error("incomplete construction arguments for '{kind}': {reason}")]
    IncompleteComponentArgs {
        kind: ComponentName,
        #[source]
        reason: FactoryError,
    },

    /// An instantiated component's type disagrees with its registered kind.
    #[error("component '{kind}' expects type {expected}, got {found}")]
    ComponentTypeMismatch {
        kind: ComponentName,
        expected: &'static str,
        found: &'static str,
    },

    /// An operation referenced an entity that is not live.
    #[error("{0} does not exist")]
    UnknownEntity(EntityId),
}
