//! Core [`Component`] trait, shared component handles, and factories.
//!
//! Component kinds are identified by a string name registered with the entity
//! store. Each kind is bound to a [`ComponentFactory`], which knows the Rust
//! type the kind stores and how to build an instance from construction
//! arguments.
//!
//! Instances are held behind a [`ComponentHandle`]: a cheap, clonable,
//! reference-counted cell. The store keeps one clone and every entity view
//! handed to a system holds another, so mutating through a view mutates the
//! entity's real component.

use std::any::{Any, TypeId};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde_json::Value;

/// The name a component kind is registered under (e.g. `"Position"`).
pub type ComponentName = String;

/// Construction arguments for a component, as a JSON document.
pub type ComponentArgs = Value;

/// Error returned by a factory when construction arguments are unusable.
pub type FactoryError = Box<dyn std::error::Error + Send + Sync>;

/// The core component trait.
///
/// Any `'static` type can be a component; the trait only names it.
///
/// # Examples
///
/// ```rust
/// use engine_component::Component;
///
/// #[derive(Debug, Clone, serde::Deserialize)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Component for Health {
///     fn type_name() -> &'static str { "Health" }
/// }
/// ```
pub trait Component: Any {
    /// A human-readable name for this component type. Used as the default
    /// kind name at registration and in type-mismatch errors.
    fn type_name() -> &'static str;
}

/// A shared, type-erased component instance.
///
/// Cloning a handle clones the reference, never the component.
#[derive(Clone)]
pub struct ComponentHandle {
    type_id: TypeId,
    type_name: &'static str,
    cell: Rc<dyn Any>,
}

impl ComponentHandle {
    /// Wrap an already-built component value.
    #[must_use]
    pub fn new<T: Component>(value: T) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: T::type_name(),
            cell: Rc::new(RefCell::new(value)),
        }
    }

    /// The [`TypeId`] of the wrapped component type.
    #[must_use]
    pub fn component_type_id(&self) -> TypeId {
        self.type_id
    }

    /// The [`Component::type_name`] of the wrapped component type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns `true` if the handle wraps a `T`.
    #[must_use]
    pub fn is<T: Component>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Immutably borrow the component as a `T`.
    ///
    /// Returns `None` if the handle wraps a different type. Panics if the
    /// component is currently mutably borrowed, as [`RefCell::borrow`] does.
    #[must_use]
    pub fn get<T: Component>(&self) -> Option<Ref<'_, T>> {
        self.cell.downcast_ref::<RefCell<T>>().map(RefCell::borrow)
    }

    /// Mutably borrow the component as a `T`.
    ///
    /// Returns `None` if the handle wraps a different type. Panics if the
    /// component is already borrowed, as [`RefCell::borrow_mut`] does.
    #[must_use]
    pub fn get_mut<T: Component>(&self) -> Option<RefMut<'_, T>> {
        self.cell.downcast_ref::<RefCell<T>>().map(RefCell::borrow_mut)
    }

    /// Returns `true` if both handles point at the same instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &ComponentHandle) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }
}

impl fmt::Debug for ComponentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentHandle")
            .field("type_name", &self.type_name)
            .field("refs", &Rc::strong_count(&self.cell))
            .finish()
    }
}

type BuildFn = dyn Fn(&ComponentArgs) -> Result<ComponentHandle, FactoryError>;

/// Builds instances of one component type from [`ComponentArgs`].
///
/// The factory also records which Rust type it produces so instantiated
/// values can be checked against the registered kind.
pub struct ComponentFactory {
    type_id: TypeId,
    type_name: &'static str,
    build: Box<BuildFn>,
}

impl ComponentFactory {
    /// A factory that deserializes the arguments straight into `T`.
    ///
    /// Missing or mistyped fields surface as a [`FactoryError`].
    #[must_use]
    pub fn deserialize<T: Component + DeserializeOwned>() -> Self {
        Self::from_fn(|args: &ComponentArgs| Ok(serde_json::from_value::<T>(args.clone())?))
    }

    /// A factory backed by an arbitrary constructor closure.
    #[must_use]
    pub fn from_fn<T, F>(f: F) -> Self
    where
        T: Component,
        F: Fn(&ComponentArgs) -> Result<T, FactoryError> + 'static,
    {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: T::type_name(),
            build: Box::new(move |args| f(args).map(ComponentHandle::new)),
        }
    }

    /// Construct a new instance from `args`.
    ///
    /// # Errors
    ///
    /// Returns the constructor's error if `args` lack required data.
    pub fn build(&self, args: &ComponentArgs) -> Result<ComponentHandle, FactoryError> {
        (self.build)(args)
    }

    /// Returns `true` if `handle` wraps the type this factory produces.
    #[must_use]
    pub fn accepts(&self, handle: &ComponentHandle) -> bool {
        handle.component_type_id() == self.type_id
    }

    /// The [`Component::type_name`] of the produced type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for ComponentFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentFactory")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}
