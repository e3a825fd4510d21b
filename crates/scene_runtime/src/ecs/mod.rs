//! Entity and behavior model
//!
//! Entities own a transform node and a set of behavior units, one per
//! concrete type. Behavior types are resolved by name through the
//! [`TypeRegistry`] so gameplay libraries can be swapped at runtime.

pub mod behavior;
pub mod entity;
pub mod registry;
pub mod inspector;
pub mod components;

pub use behavior::{canonical_type_name, downcast_mut, downcast_ref, AsAny, Behavior};
pub use entity::{BehaviorSelection, Entity, EntityFlags, EntityId, LifecycleStage};
pub use registry::{Registration, TypeRegistry};
pub use inspector::{InspectorUi, TextInspector};
pub use components::{MissingBehaviorRecord, TransformNode};
