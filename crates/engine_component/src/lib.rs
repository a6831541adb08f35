//! # engine_component
//!
//! The "C" in ECS: what a component is, how instances are shared, and how
//! systems describe the components they are interested in.
//!
//! This crate provides:
//!
//! - [`Component`] trait: names a Rust type usable as component data.
//! - [`ComponentHandle`]: shared, type-erased component instance.
//! - [`ComponentFactory`]: builds instances of a registered kind from
//!   [`ComponentArgs`].
//! - [`EntityId`] / [`EntityAllocator`]: monotonically increasing entity IDs.
//! - [`Aspect`]: mandatory / optional / either-or query predicate.

pub mod aspect;
pub mod component;
pub mod entity;

pub use aspect::Aspect;
pub use component::{
    Component, ComponentArgs, ComponentFactory, ComponentHandle, ComponentName, FactoryError,
};
pub use entity::{EntityAllocator, EntityId};
