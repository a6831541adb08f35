//! Systems and the registry that fans lifecycle events out to them.
//!
//! A [`System`] is anything that reacts to [`EntityEvent`]s. Systems that
//! also do per-tick work expose it through their own inherent methods; game
//! states reach them by name and concrete type through
//! [`SystemRegistry::get_mut`].

use std::collections::BTreeMap;
use std::fmt;

use downcast_rs::{Downcast, impl_downcast};
use tracing::{debug, trace};

use crate::error::EcsError;
use crate::events::EntityEvent;
use crate::manager::EntityManager;

/// An observer of entity lifecycle events.
pub trait System: Downcast {
    /// React to one lifecycle event.
    ///
    /// # Errors
    ///
    /// Any store error hit while handling the event. Dispatch stops at the
    /// first error and hands it to the caller.
    fn handle_event(&mut self, manager: &mut EntityManager, event: &EntityEvent) -> Result<(), EcsError>;
}

impl_downcast!(System);

/// Registry of systems, keyed by name.
///
/// Events are dispatched to systems in name order.
#[derive(Default)]
pub struct SystemRegistry {
    systems: BTreeMap<String, Box<dyn System>>,
}

impl SystemRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            systems: BTreeMap::new(),
        }
    }

    /// Register a system under `name`, returning any system it replaced.
    pub fn insert<S: System>(&mut self, name: impl Into<String>, system: S) -> Option<Box<dyn System>> {
        let name = name.into();
        debug!(system = %name, "registered system");
        self.systems.insert(name, Box::new(system))
    }

    /// Remove and return the system registered under `name`.
    pub fn remove(&mut self, name: &str) -> Option<Box<dyn System>> {
        self.systems.remove(name)
    }

    /// The system under `name`, if it is a `S`.
    #[must_use]
    pub fn get<S: System>(&self, name: &str) -> Option<&S> {
        self.systems.get(name)?.downcast_ref::<S>()
    }

    /// The system under `name` mutably, if it is a `S`.
    #[must_use]
    pub fn get_mut<S: System>(&mut self, name: &str) -> Option<&mut S> {
        self.systems.get_mut(name)?.downcast_mut::<S>()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.systems.contains_key(name)
    }

    /// Registered system names, in dispatch order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.systems.keys().map(String::as_str)
    }

    /// Returns the number of registered systems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Hand one event to every registered system.
    ///
    /// # Errors
    ///
    /// The first error returned by a system.
    pub fn dispatch(&mut self, manager: &mut EntityManager, event: &EntityEvent) -> Result<(), EcsError> {
        for (name, system) in &mut self.systems {
            trace!(system = %name, ?event, "dispatching event");
            system.handle_event(manager, event)?;
        }
        Ok(())
    }

    /// The lifecycle half of a tick: flush queued removals, then drain the
    /// event queue and dispatch every event, oldest first, to every system.
    ///
    /// Returns the number of events dispatched.
    ///
    /// # Errors
    ///
    /// The first error returned by a system. The failing event and every
    /// event after it are pushed back onto the queue in order, so none is
    /// lost. Systems ahead of the failing one in name order will see the
    /// failing event again on the next call.
    pub fn process_lifecycle(&mut self, manager: &mut EntityManager) -> Result<usize, EcsError> {
        let removed = manager.remove_queued_entities();
        let events = manager.drain_events();
        let count = events.len();
        if count > 0 || !removed.is_empty() {
            debug!(removed = removed.len(), events = count, "processing lifecycle events");
        }

        let mut pending = events.into_iter();
        while let Some(event) = pending.next() {
            if let Err(err) = self.dispatch(manager, &event) {
                let later = manager.drain_events();
                for event in std::iter::once(event).chain(pending).chain(later) {
                    manager.events_mut().push(event);
                }
                return Err(err);
            }
        }
        Ok(count)
    }
}

impl fmt::Debug for SystemRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemRegistry")
            .field("systems", &self.systems.keys().collect::<Vec<_>>())
            .finish()
    }
}
