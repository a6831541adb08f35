//! The entity store.
//!
//! [`EntityManager`] owns every entity and component instance. It enforces
//! kind registration and instance types, answers [`Aspect`] queries, and
//! emits lifecycle events into its embedded [`EventQueue`].
//!
//! Every mutating operation validates its whole input before touching
//! storage, so a failed call leaves the store exactly as it was.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use engine_component::{
    Aspect, Component, ComponentArgs, ComponentFactory, ComponentHandle, ComponentName,
    EntityAllocator, EntityId,
};

use crate::error::EcsError;
use crate::events::{EntityEvent, EventQueue};
use crate::view::EntityView;

/// Entity and component storage with aspect queries.
///
/// Invariant: `components[k]` has an entry for entity `e` if and only if
/// `k` is in `entities[e]`.
#[derive(Debug, Default)]
pub struct EntityManager {
    /// Registered kinds and the factories that build them.
    factories: HashMap<ComponentName, ComponentFactory>,
    /// Per-kind instance maps.
    components: HashMap<ComponentName, HashMap<EntityId, ComponentHandle>>,
    /// Live entities and the kinds attached to each.
    entities: BTreeMap<EntityId, BTreeSet<ComponentName>>,
    allocator: EntityAllocator,
    /// Entities awaiting the next [`remove_queued_entities`](Self::remove_queued_entities).
    pending_removal: BTreeSet<EntityId>,
    events: EventQueue,
}

impl EntityManager {
    /// Create an empty store with no registered kinds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -- Registration --

    /// Register `T` under `kind`, built by deserializing construction args.
    ///
    /// Returns `false` if `kind` was already registered, in which case the
    /// existing registration is kept.
    pub fn register_component<T>(&mut self, kind: impl Into<ComponentName>) -> bool
    where
        T: Component + DeserializeOwned,
    {
        self.register_factory(kind, ComponentFactory::deserialize::<T>())
    }

    /// Register `kind` with a custom factory.
    ///
    /// Returns `false` if `kind` was already registered, in which case the
    /// existing registration is kept.
    pub fn register_factory(&mut self, kind: impl Into<ComponentName>, factory: ComponentFactory) -> bool {
        let kind = kind.into();
        if let Some(existing) = self.factories.get(&kind) {
            if existing.type_name() != factory.type_name() {
                warn!(
                    %kind,
                    registered = existing.type_name(),
                    ignored = factory.type_name(),
                    "component kind already registered with another type"
                );
            }
            return false;
        }
        debug!(%kind, ty = factory.type_name(), "registered component kind");
        self.components.insert(kind.clone(), HashMap::new());
        self.factories.insert(kind, factory);
        true
    }

    #[must_use]
    pub fn is_registered(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// All registered kind names, sorted.
    #[must_use]
    pub fn registered_components(&self) -> BTreeSet<&ComponentName> {
        self.factories.keys().collect()
    }

    fn factory(&self, kind: &str) -> Result<&ComponentFactory, EcsError> {
        self.factories
            .get(kind)
            .ok_or_else(|| EcsError::UnknownComponent {
                kind: kind.to_string(),
            })
    }

    fn build_component(&self, kind: &str, args: &ComponentArgs) -> Result<ComponentHandle, EcsError> {
        self.factory(kind)?
            .build(args)
            .map_err(|reason| EcsError::IncompleteComponentArgs {
                kind: kind.to_string(),
                reason,
            })
    }

    fn check_instance(&self, kind: &str, handle: &ComponentHandle) -> Result<(), EcsError> {
        let factory = self.factory(kind)?;
        if factory.accepts(handle) {
            Ok(())
        } else {
            Err(EcsError::ComponentTypeMismatch {
                kind: kind.to_string(),
                expected: factory.type_name(),
                found: handle.type_name(),
            })
        }
    }

    fn check_aspect(&self, aspect: &Aspect) -> Result<(), EcsError> {
        match aspect.all().into_iter().find(|kind| !self.is_registered(kind)) {
            Some(kind) => Err(EcsError::UnknownComponent { kind: kind.clone() }),
            None => Ok(()),
        }
    }

    fn check_names<'a>(&self, kinds: impl IntoIterator<Item = &'a ComponentName>) -> Result<(), EcsError> {
        for kind in kinds {
            self.factory(kind)?;
        }
        Ok(())
    }

    // -- Entity lifecycle --

    /// Create an entity whose components are built by their kinds' factories.
    ///
    /// All kinds are checked and all instances built before anything is
    /// stored, so on error no entity exists and no ID was consumed. A kind
    /// listed twice keeps its last arguments.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownComponent`] for an unregistered kind,
    /// [`EcsError::IncompleteComponentArgs`] if a factory rejects its args.
    pub fn create_entity<K, I>(&mut self, components: I) -> Result<EntityId, EcsError>
    where
        K: Into<ComponentName>,
        I: IntoIterator<Item = (K, ComponentArgs)>,
    {
        let requested: BTreeMap<ComponentName, ComponentArgs> = components
            .into_iter()
            .map(|(kind, args)| (kind.into(), args))
            .collect();
        self.check_names(requested.keys())?;

        let mut built = BTreeMap::new();
        for (kind, args) in &requested {
            built.insert(kind.clone(), self.build_component(kind, args)?);
        }

        Ok(self.insert_entity(built))
    }

    /// Create an entity from already-built component instances.
    ///
    /// Each instance's type is checked against the factory registered for
    /// its kind. The store keeps the very handles passed in, so the caller's
    /// clones observe later changes.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownComponent`] for an unregistered kind,
    /// [`EcsError::ComponentTypeMismatch`] if an instance has the wrong type.
    pub fn create_entity_instantiated<K, I>(&mut self, components: I) -> Result<EntityId, EcsError>
    where
        K: Into<ComponentName>,
        I: IntoIterator<Item = (K, ComponentHandle)>,
    {
        let supplied: BTreeMap<ComponentName, ComponentHandle> = components
            .into_iter()
            .map(|(kind, handle)| (kind.into(), handle))
            .collect();
        self.check_names(supplied.keys())?;
        for (kind, handle) in &supplied {
            self.check_instance(kind, handle)?;
        }

        Ok(self.insert_entity(supplied))
    }

    fn insert_entity(&mut self, components: BTreeMap<ComponentName, ComponentHandle>) -> EntityId {
        let id = self.allocator.allocate();
        let mut attached = BTreeSet::new();
        for (kind, handle) in components {
            self.components
                .entry(kind.clone())
                .or_default()
                .insert(id, handle);
            attached.insert(kind);
        }
        debug!(entity = %id, kinds = attached.len(), "created entity");
        self.entities.insert(id, attached);
        self.events.push(EntityEvent::EntityAdded(id));
        id
    }

    /// Build a component from `args` and attach it to `id`, replacing any
    /// instance of the same kind. Does not emit an event.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownEntity`], [`EcsError::UnknownComponent`] or
    /// [`EcsError::IncompleteComponentArgs`].
    pub fn add_component_to_entity(
        &mut self,
        id: EntityId,
        kind: &str,
        args: &ComponentArgs,
    ) -> Result<(), EcsError> {
        self.ensure_alive(id)?;
        let handle = self.build_component(kind, args)?;
        self.attach(id, kind, handle);
        Ok(())
    }

    /// Attach an already-built instance to `id`, replacing any instance of
    /// the same kind. Does not emit an event.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownEntity`], [`EcsError::UnknownComponent`] or
    /// [`EcsError::ComponentTypeMismatch`].
    pub fn add_instantiated_component(
        &mut self,
        id: EntityId,
        kind: &str,
        handle: ComponentHandle,
    ) -> Result<(), EcsError> {
        self.ensure_alive(id)?;
        self.check_instance(kind, &handle)?;
        self.attach(id, kind, handle);
        Ok(())
    }

    fn attach(&mut self, id: EntityId, kind: &str, handle: ComponentHandle) {
        self.components
            .entry(kind.to_string())
            .or_default()
            .insert(id, handle);
        if let Some(attached) = self.entities.get_mut(&id) {
            attached.insert(kind.to_string());
        }
        debug!(entity = %id, kind, "attached component");
    }

    /// Remove `id` now: push [`EntityEvent::RemoveEntity`], then delete every
    /// component it owns and its attached-kind record.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownEntity`] if `id` is not live.
    pub fn remove_entity(&mut self, id: EntityId) -> Result<(), EcsError> {
        self.ensure_alive(id)?;
        self.events.push(EntityEvent::RemoveEntity(id));

        if let Some(attached) = self.entities.remove(&id) {
            for kind in &attached {
                if let Some(instances) = self.components.get_mut(kind) {
                    instances.remove(&id);
                }
            }
        }
        self.pending_removal.remove(&id);
        debug!(entity = %id, "removed entity");
        Ok(())
    }

    /// Mark `id` for removal at the next
    /// [`remove_queued_entities`](Self::remove_queued_entities). Storage is
    /// untouched until then. Queueing an entity twice has no extra effect.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownEntity`] if `id` is not live.
    pub fn queue_removal(&mut self, id: EntityId) -> Result<(), EcsError> {
        self.ensure_alive(id)?;
        if self.pending_removal.insert(id) {
            debug!(entity = %id, "queued entity for removal");
        }
        Ok(())
    }

    /// Remove every queued entity, in ascending ID order, each with its own
    /// [`EntityEvent::RemoveEntity`]. Returns the IDs removed.
    ///
    /// Entities removed immediately since being queued are skipped.
    pub fn remove_queued_entities(&mut self) -> Vec<EntityId> {
        let pending = std::mem::take(&mut self.pending_removal);
        let mut removed = Vec::with_capacity(pending.len());
        for id in pending {
            if self.remove_entity(id).is_ok() {
                removed.push(id);
            }
        }
        removed
    }

    // -- Queries --

    fn ensure_alive(&self, id: EntityId) -> Result<&BTreeSet<ComponentName>, EcsError> {
        self.entities.get(&id).ok_or(EcsError::UnknownEntity(id))
    }

    fn build_view(
        &self,
        id: EntityId,
        attached: &BTreeSet<ComponentName>,
        mut include: impl FnMut(&ComponentName) -> bool,
    ) -> EntityView {
        let components = attached
            .iter()
            .filter(|kind| include(kind))
            .filter_map(|kind| {
                let handle = self.components.get(kind)?.get(&id)?;
                Some((kind.clone(), handle.clone()))
            })
            .collect();
        EntityView::new(id, components)
    }

    fn aspect_view(&self, id: EntityId, attached: &BTreeSet<ComponentName>, aspect: &Aspect) -> EntityView {
        self.build_view(id, attached, |kind| aspect.selects(kind, attached))
    }

    /// Every live entity matching `aspect`, each with a view of its
    /// mandatory, optional and resolved either-or components.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownComponent`] if the aspect names an unregistered kind.
    pub fn get_matching_entities(&self, aspect: &Aspect) -> Result<BTreeMap<EntityId, EntityView>, EcsError> {
        self.check_aspect(aspect)?;
        Ok(self
            .entities
            .iter()
            .filter(|(_, attached)| aspect.is_matched(attached))
            .map(|(&id, attached)| (id, self.aspect_view(id, attached, aspect)))
            .collect())
    }

    /// The view of one entity through `aspect`, or `None` if it does not match.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownComponent`] if the aspect names an unregistered
    /// kind, [`EcsError::UnknownEntity`] if `id` is not live.
    pub fn get_matching_entity(&self, id: EntityId, aspect: &Aspect) -> Result<Option<EntityView>, EcsError> {
        self.check_aspect(aspect)?;
        let attached = self.ensure_alive(id)?;
        if aspect.is_matched(attached) {
            Ok(Some(self.aspect_view(id, attached, aspect)))
        } else {
            Ok(None)
        }
    }

    /// A view of every component attached to `id`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownEntity`] if `id` is not live.
    pub fn get_entity(&self, id: EntityId) -> Result<EntityView, EcsError> {
        let attached = self.ensure_alive(id)?;
        Ok(self.build_view(id, attached, |_| true))
    }

    /// The kinds currently attached to `id`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownEntity`] if `id` is not live.
    pub fn attached(&self, id: EntityId) -> Result<&BTreeSet<ComponentName>, EcsError> {
        self.ensure_alive(id)
    }

    // -- Introspection --

    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Live entity IDs, ascending.
    pub fn live_entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// The ID the next created entity will receive.
    #[must_use]
    pub fn next_entity_id(&self) -> EntityId {
        self.allocator.peek()
    }

    #[must_use]
    pub fn pending_removals(&self) -> &BTreeSet<EntityId> {
        &self.pending_removal
    }

    /// Number of stored instances of `kind` (0 for an unregistered kind).
    #[must_use]
    pub fn instance_count(&self, kind: &str) -> usize {
        self.components.get(kind).map_or(0, HashMap::len)
    }

    #[must_use]
    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventQueue {
        &mut self.events
    }

    /// Drain the lifecycle event queue.
    #[must_use]
    pub fn drain_events(&mut self) -> Vec<EntityEvent> {
        self.events.get()
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Position {
        x: f32,
        y: f32,
    }

    impl Component for Position {
        fn type_name() -> &'static str {
            "Position"
        }
    }

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Velocity {
        x: f32,
        y: f32,
    }

    impl Component for Velocity {
        fn type_name() -> &'static str {
            "Velocity"
        }
    }

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Marker;

    impl Component for Marker {
        fn type_name() -> &'static str {
            "Marker"
        }
    }

    fn make_manager() -> EntityManager {
        let mut manager = EntityManager::new();
        manager.register_component::<Position>("Pos");
        manager.register_component::<Velocity>("Vel");
        manager.register_component::<Marker>("Left");
        manager.register_component::<Marker>("Right");
        manager
    }

    fn pos(x: f32, y: f32) -> ComponentArgs {
        json!({ "x": x, "y": y })
    }

    #[test]
    fn test_create_assigns_monotonic_ids_and_emits_event() {
        let mut manager = make_manager();
        let a = manager.create_entity([("Pos", pos(0.0, 0.0))]).unwrap();
        let b = manager.create_entity([("Vel", pos(1.0, 1.0))]).unwrap();
        assert_eq!(a, EntityId(0));
        assert_eq!(b, EntityId(1));
        assert_eq!(
            manager.drain_events(),
            vec![EntityEvent::EntityAdded(a), EntityEvent::EntityAdded(b)]
        );
    }

    #[test]
    fn test_create_builds_through_factory() {
        let mut manager = make_manager();
        let id = manager.create_entity([("Pos", pos(3.0, 4.0))]).unwrap();
        let view = manager.get_entity(id).unwrap();
        assert_eq!(view.get::<Position>("Pos").map(|p| (*p).clone()), Some(Position { x: 3.0, y: 4.0 }));
    }

    #[test]
    fn test_create_with_unregistered_kind_creates_nothing() {
        let mut manager = make_manager();
        let before = manager.next_entity_id();
        let result = manager.create_entity([("Pos", pos(0.0, 0.0)), ("Unregistered", json!({}))]);
        assert!(matches!(result, Err(EcsError::UnknownComponent { ref kind }) if kind == "Unregistered"));
        assert_eq!(manager.next_entity_id(), before);
        assert_eq!(manager.entity_count(), 0);
        assert_eq!(manager.instance_count("Pos"), 0);
        assert!(manager.events().is_empty());
    }

    #[test]
    fn test_create_with_incomplete_args_creates_nothing() {
        let mut manager = make_manager();
        let result = manager.create_entity([("Pos", pos(0.0, 0.0)), ("Vel", json!({ "x": 1.0 }))]);
        assert!(matches!(result, Err(EcsError::IncompleteComponentArgs { ref kind, .. }) if kind == "Vel"));
        assert_eq!(manager.next_entity_id(), EntityId(0));
        assert_eq!(manager.instance_count("Pos"), 0);
    }

    #[test]
    fn test_instantiated_round_trip_preserves_identity() {
        let mut manager = make_manager();
        let handle = ComponentHandle::new(Position { x: 1.0, y: 2.0 });
        let id = manager
            .create_entity_instantiated([("Pos", handle.clone())])
            .unwrap();

        let view = manager.get_entity(id).unwrap();
        assert_eq!(view.len(), 1);
        assert!(view.handle("Pos").unwrap().ptr_eq(&handle));
    }

    #[test]
    fn test_instantiated_type_mismatch_creates_nothing() {
        let mut manager = make_manager();
        let result = manager.create_entity_instantiated([
            ("Pos", ComponentHandle::new(Position { x: 0.0, y: 0.0 })),
            ("Vel", ComponentHandle::new(Position { x: 0.0, y: 0.0 })),
        ]);
        match result {
            Err(EcsError::ComponentTypeMismatch { kind, expected, found }) => {
                assert_eq!(kind, "Vel");
                assert_eq!(expected, "Velocity");
                assert_eq!(found, "Position");
            }
            other => panic!("expected type mismatch, got {other:?}"),
        }
        assert_eq!(manager.entity_count(), 0);
        assert_eq!(manager.next_entity_id(), EntityId(0));
    }

    #[test]
    fn test_writes_through_view_reach_the_store() {
        let mut manager = make_manager();
        let id = manager.create_entity([("Pos", pos(0.0, 0.0))]).unwrap();

        let view = manager
            .get_matching_entity(id, &Aspect::with(["Pos"]))
            .unwrap()
            .unwrap();
        if let Some(mut p) = view.get_mut::<Position>("Pos") {
            p.x = 9.0;
        }

        let fresh = manager.get_entity(id).unwrap();
        assert_eq!(fresh.get::<Position>("Pos").map(|p| p.x), Some(9.0));
    }

    #[test]
    fn test_add_component_updates_attached_kinds() {
        let mut manager = make_manager();
        let id = manager.create_entity([("Pos", pos(0.0, 0.0))]).unwrap();
        let _ = manager.drain_events();

        manager
            .add_component_to_entity(id, "Vel", &pos(1.0, 0.0))
            .unwrap();

        assert!(manager.attached(id).unwrap().contains("Vel"));
        assert_eq!(manager.instance_count("Vel"), 1);
        assert!(manager.events().is_empty());
        let matched = manager
            .get_matching_entity(id, &Aspect::with(["Pos", "Vel"]))
            .unwrap();
        assert!(matched.is_some());
    }

    #[test]
    fn test_add_component_overwrites_instance() {
        let mut manager = make_manager();
        let id = manager.create_entity([("Pos", pos(0.0, 0.0))]).unwrap();
        manager
            .add_component_to_entity(id, "Pos", &pos(5.0, 5.0))
            .unwrap();
        let view = manager.get_entity(id).unwrap();
        assert_eq!(view.get::<Position>("Pos").map(|p| p.x), Some(5.0));
        assert_eq!(manager.instance_count("Pos"), 1);
    }

    #[test]
    fn test_add_component_errors() {
        let mut manager = make_manager();
        let id = manager.create_entity([("Pos", pos(0.0, 0.0))]).unwrap();

        assert!(matches!(
            manager.add_component_to_entity(EntityId(42), "Vel", &pos(0.0, 0.0)),
            Err(EcsError::UnknownEntity(EntityId(42)))
        ));
        assert!(matches!(
            manager.add_component_to_entity(id, "Nope", &json!({})),
            Err(EcsError::UnknownComponent { .. })
        ));
        assert!(matches!(
            manager.add_component_to_entity(id, "Vel", &json!({ "y": 1.0 })),
            Err(EcsError::IncompleteComponentArgs { .. })
        ));
        assert!(matches!(
            manager.add_instantiated_component(id, "Vel", ComponentHandle::new(Marker)),
            Err(EcsError::ComponentTypeMismatch { .. })
        ));
        assert_eq!(manager.attached(id).unwrap().len(), 1);
    }

    #[test]
    fn test_matching_entities_resolve_either_or() {
        let mut manager = make_manager();
        let left = manager
            .create_entity([("Pos", pos(0.0, 0.0)), ("Left", json!(null)), ("Vel", pos(0.0, 0.0))])
            .unwrap();
        let right = manager
            .create_entity([("Pos", pos(0.0, 0.0)), ("Right", json!(null))])
            .unwrap();
        let _both = manager
            .create_entity([("Pos", pos(0.0, 0.0)), ("Left", json!(null)), ("Right", json!(null))])
            .unwrap();
        let _neither = manager.create_entity([("Pos", pos(0.0, 0.0))]).unwrap();

        let aspect = Aspect::with(["Pos"]).one_of(["Left", "Right"]);
        let matched = manager.get_matching_entities(&aspect).unwrap();

        assert_eq!(matched.keys().copied().collect::<Vec<_>>(), vec![left, right]);
        let left_kinds: Vec<_> = matched[&left].kinds().cloned().collect();
        assert_eq!(left_kinds, vec!["Left", "Pos"]);
        let right_kinds: Vec<_> = matched[&right].kinds().cloned().collect();
        assert_eq!(right_kinds, vec!["Pos", "Right"]);
    }

    #[test]
    fn test_optional_kinds_shape_the_view() {
        let mut manager = make_manager();
        let with_vel = manager
            .create_entity([("Pos", pos(0.0, 0.0)), ("Vel", pos(1.0, 1.0))])
            .unwrap();
        let without_vel = manager.create_entity([("Pos", pos(0.0, 0.0))]).unwrap();

        let aspect = Aspect::with(["Pos"]).optional(["Vel"]);
        let matched = manager.get_matching_entities(&aspect).unwrap();
        assert!(matched[&with_vel].contains("Vel"));
        assert!(!matched[&without_vel].contains("Vel"));
        assert!(matched[&without_vel].contains("Pos"));
    }

    #[test]
    fn test_query_with_unregistered_kind_fails() {
        let manager = make_manager();
        let aspect = Aspect::with(["Pos"]).optional(["Ghost"]);
        assert!(matches!(
            manager.get_matching_entities(&aspect),
            Err(EcsError::UnknownComponent { ref kind }) if kind == "Ghost"
        ));
    }

    #[test]
    fn test_matching_entity_no_match_vs_unknown() {
        let mut manager = make_manager();
        let id = manager.create_entity([("Pos", pos(0.0, 0.0))]).unwrap();
        let aspect = Aspect::with(["Vel"]);
        assert!(manager.get_matching_entity(id, &aspect).unwrap().is_none());
        assert!(matches!(
            manager.get_matching_entity(EntityId(99), &aspect),
            Err(EcsError::UnknownEntity(EntityId(99)))
        ));
    }

    #[test]
    fn test_get_entity_unknown() {
        let manager = make_manager();
        assert!(matches!(
            manager.get_entity(EntityId(0)),
            Err(EcsError::UnknownEntity(_))
        ));
    }

    #[test]
    fn test_immediate_removal_is_atomic() {
        let mut manager = make_manager();
        let id = manager
            .create_entity([("Pos", pos(0.0, 0.0)), ("Vel", pos(0.0, 0.0))])
            .unwrap();
        let keep = manager.create_entity([("Pos", pos(1.0, 1.0))]).unwrap();
        let _ = manager.drain_events();

        manager.remove_entity(id).unwrap();

        assert!(!manager.is_alive(id));
        assert!(manager.live_entities().all(|e| e != id));
        assert_eq!(manager.instance_count("Pos"), 1);
        assert_eq!(manager.instance_count("Vel"), 0);
        assert!(manager.is_alive(keep));
        assert_eq!(manager.drain_events(), vec![EntityEvent::RemoveEntity(id)]);
    }

    #[test]
    fn test_remove_unknown_entity_fails() {
        let mut manager = make_manager();
        assert!(matches!(
            manager.remove_entity(EntityId(3)),
            Err(EcsError::UnknownEntity(EntityId(3)))
        ));
        assert!(matches!(
            manager.queue_removal(EntityId(3)),
            Err(EcsError::UnknownEntity(EntityId(3)))
        ));
        assert!(manager.events().is_empty());
    }

    #[test]
    fn test_ids_are_not_reused_after_removal() {
        let mut manager = make_manager();
        let a = manager.create_entity([("Pos", pos(0.0, 0.0))]).unwrap();
        manager.remove_entity(a).unwrap();
        let b = manager.create_entity([("Pos", pos(0.0, 0.0))]).unwrap();
        assert_ne!(a, b);
        assert_eq!(b, EntityId(1));
    }

    #[test]
    fn test_deferred_removal_waits_for_flush() {
        let mut manager = make_manager();
        let a = manager.create_entity([("Pos", pos(0.0, 0.0))]).unwrap();
        let b = manager.create_entity([("Vel", pos(0.0, 0.0))]).unwrap();
        let _ = manager.drain_events();

        manager.queue_removal(b).unwrap();
        manager.queue_removal(a).unwrap();
        manager.queue_removal(a).unwrap();

        assert!(manager.is_alive(a));
        assert!(manager.is_alive(b));
        assert_eq!(manager.instance_count("Pos"), 1);
        assert!(manager.events().is_empty());

        let removed = manager.remove_queued_entities();
        assert_eq!(removed, vec![a, b]);
        assert!(manager.pending_removals().is_empty());
        assert_eq!(manager.entity_count(), 0);
        assert_eq!(manager.instance_count("Pos"), 0);
        assert_eq!(manager.instance_count("Vel"), 0);
        assert_eq!(
            manager.drain_events(),
            vec![EntityEvent::RemoveEntity(a), EntityEvent::RemoveEntity(b)]
        );
    }

    #[test]
    fn test_queued_entity_removed_immediately_is_processed_once() {
        let mut manager = make_manager();
        let a = manager.create_entity([("Pos", pos(0.0, 0.0))]).unwrap();
        let _ = manager.drain_events();

        manager.queue_removal(a).unwrap();
        manager.remove_entity(a).unwrap();

        assert!(manager.remove_queued_entities().is_empty());
        assert_eq!(manager.drain_events(), vec![EntityEvent::RemoveEntity(a)]);
    }

    #[test]
    fn test_reregistering_keeps_first_registration() {
        let mut manager = make_manager();
        let id = manager.create_entity([("Pos", pos(0.0, 0.0))]).unwrap();
        assert!(!manager.register_component::<Velocity>("Pos"));
        assert_eq!(manager.instance_count("Pos"), 1);
        assert!(manager.get_entity(id).unwrap().get::<Position>("Pos").is_some());
        assert_eq!(manager.registered_components().len(), 4);
    }

    #[test]
    fn test_custom_factory() {
        let mut manager = EntityManager::new();
        manager.register_factory(
            "Origin",
            ComponentFactory::from_fn(|_: &ComponentArgs| Ok(Position { x: 0.0, y: 0.0 })),
        );
        let id = manager.create_entity([("Origin", json!(null))]).unwrap();
        let view = manager.get_entity(id).unwrap();
        assert_eq!(view.get::<Position>("Origin").map(|p| p.y), Some(0.0));
    }
}
