//! Entity lifecycle events and the queue that buffers them.
//!
//! The store pushes an event at the moment an entity is created or
//! immediately removed. Systems learn about those changes by draining the
//! queue once per tick instead of polling the whole entity set.

use serde::{Deserialize, Serialize};

use engine_component::EntityId;

/// A record announcing an entity's creation or removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityEvent {
    /// The entity was created with its initial components.
    EntityAdded(EntityId),
    /// The entity is being removed. Pushed before its storage is deleted.
    RemoveEntity(EntityId),
}

impl EntityEvent {
    /// The entity the event is about.
    #[must_use]
    pub fn entity(&self) -> EntityId {
        match *self {
            EntityEvent::EntityAdded(id) | EntityEvent::RemoveEntity(id) => id,
        }
    }
}

/// Strictly FIFO, unbounded buffer of [`EntityEvent`]s.
///
/// [`get`](Self::get) is destructive: it hands back everything buffered and
/// leaves the queue empty. Nothing is ever dropped or replayed.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Vec<EntityEvent>,
}

impl EventQueue {
    #[must_use]
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Append an event.
    pub fn push(&mut self, event: EntityEvent) {
        self.events.push(event);
    }

    /// Drain every buffered event, oldest first.
    #[must_use]
    pub fn get(&mut self) -> Vec<EntityEvent> {
        std::mem::take(&mut self.events)
    }

    /// Number of events waiting to be drained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_drains_in_push_order() {
        let mut queue = EventQueue::new();
        queue.push(EntityEvent::EntityAdded(EntityId(0)));
        queue.push(EntityEvent::EntityAdded(EntityId(1)));
        queue.push(EntityEvent::RemoveEntity(EntityId(0)));

        assert_eq!(
            queue.get(),
            vec![
                EntityEvent::EntityAdded(EntityId(0)),
                EntityEvent::EntityAdded(EntityId(1)),
                EntityEvent::RemoveEntity(EntityId(0)),
            ]
        );
    }

    #[test]
    fn test_second_get_is_empty() {
        let mut queue = EventQueue::new();
        queue.push(EntityEvent::EntityAdded(EntityId(3)));
        assert_eq!(queue.get().len(), 1);
        assert!(queue.get().is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_events_pushed_after_drain_are_kept() {
        let mut queue = EventQueue::new();
        queue.push(EntityEvent::EntityAdded(EntityId(1)));
        let _ = queue.get();
        queue.push(EntityEvent::RemoveEntity(EntityId(1)));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.get(), vec![EntityEvent::RemoveEntity(EntityId(1))]);
    }

    #[test]
    fn test_event_entity() {
        assert_eq!(EntityEvent::EntityAdded(EntityId(9)).entity(), EntityId(9));
        assert_eq!(EntityEvent::RemoveEntity(EntityId(2)).entity(), EntityId(2));
    }
}
