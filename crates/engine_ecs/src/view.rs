//! Entity views: transient kind → instance windows onto one entity.

use std::cell::{Ref, RefMut};
use std::collections::BTreeMap;

use engine_component::{Component, ComponentHandle, ComponentName, EntityId};

/// A transient mapping from component kind to the entity's live instance.
///
/// Views are built fresh by every query. They share the instances with the
/// store, so writes through a view land on the real component. A view must
/// not be trusted after its entity is removed; wait for the matching
/// [`EntityEvent::RemoveEntity`](crate::EntityEvent::RemoveEntity) and drop it.
#[derive(Debug, Clone)]
pub struct EntityView {
    entity: EntityId,
    components: BTreeMap<ComponentName, ComponentHandle>,
}

impl EntityView {
    pub(crate) fn new(entity: EntityId, components: BTreeMap<ComponentName, ComponentHandle>) -> Self {
        Self { entity, components }
    }

    /// The entity this view was built for.
    #[must_use]
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// The shared handle stored under `kind`.
    #[must_use]
    pub fn handle(&self, kind: &str) -> Option<&ComponentHandle> {
        self.components.get(kind)
    }

    /// Borrow the component under `kind` as a `T`.
    ///
    /// `None` if the view has no such kind or it holds a different type.
    #[must_use]
    pub fn get<T: Component>(&self, kind: &str) -> Option<Ref<'_, T>> {
        self.components.get(kind).and_then(|handle| handle.get::<T>())
    }

    /// Mutably borrow the component under `kind` as a `T`.
    #[must_use]
    pub fn get_mut<T: Component>(&self, kind: &str) -> Option<RefMut<'_, T>> {
        self.components.get(kind).and_then(|handle| handle.get_mut::<T>())
    }

    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.components.contains_key(kind)
    }

    /// Kinds present in the view, in name order.
    pub fn kinds(&self) -> impl Iterator<Item = &ComponentName> {
        self.components.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ComponentName, &ComponentHandle)> {
        self.components.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
