//! Behavior units: polymorphic logic/data attached to an entity
//!
//! A behavior is any `'static` type implementing [`Behavior`]. Every hook has an
//! empty default so a unit only overrides what it needs. Hooks receive a
//! [`BehaviorContext`] scoped to the owning entity; structural changes issued
//! through it are deferred to the scene's maintenance pass.

use std::any::{Any, TypeId};

use serde_json::{Map, Value};

use crate::ecs::entity::EntityId;
use crate::ecs::inspector::InspectorUi;
use crate::foundation::math::Vec3;
use crate::scene::context::BehaviorContext;
use crate::scene::persistence::ResolveContext;
use crate::scene::render_hooks::{RenderSink, RenderView, UniformData};

/// Upcast helper so trait objects can be downcast to their concrete type
pub trait AsAny: Any {
    /// Borrow as `&dyn Any`
    fn as_any(&self) -> &dyn Any;

    /// Borrow as `&mut dyn Any`
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A unit of logic and data attached to exactly one entity
#[allow(unused_variables)]
pub trait Behavior: AsAny {
    /// Called once when the unit joins a created entity
    fn on_create(&mut self, ctx: &mut BehaviorContext<'_>) {}

    /// Called once after every unit of the entity received `on_create`
    fn on_create_late(&mut self, ctx: &mut BehaviorContext<'_>) {}

    /// Called once when the scene starts (or on join if it already has)
    fn on_start(&mut self, ctx: &mut BehaviorContext<'_>) {}

    /// Called once after `on_start` has reached every entity
    fn on_late_start(&mut self, ctx: &mut BehaviorContext<'_>) {}

    /// Variable-rate update
    fn on_update(&mut self, ctx: &mut BehaviorContext<'_>, delta_time: f32) {}

    /// Fixed-rate update
    fn on_fixed_update(&mut self, ctx: &mut BehaviorContext<'_>, fixed_delta_time: f32) {}

    /// Runs after every entity's `on_update`
    fn on_late_update(&mut self, ctx: &mut BehaviorContext<'_>, delta_time: f32) {}

    /// Called once right before the unit is dropped
    fn on_destroy(&mut self, ctx: &mut BehaviorContext<'_>) {}

    /// A trigger volume started overlapping `other`
    fn on_trigger_enter(&mut self, ctx: &mut BehaviorContext<'_>, other: EntityId) {}

    /// A trigger volume stopped overlapping `other`
    fn on_trigger_exit(&mut self, ctx: &mut BehaviorContext<'_>, other: EntityId) {}

    /// A physical contact with `other` began
    fn on_collision_enter(&mut self, ctx: &mut BehaviorContext<'_>, other: EntityId) {}

    /// A physical contact with `other` ended
    fn on_collision_exit(&mut self, ctx: &mut BehaviorContext<'_>, other: EntityId) {}

    /// The owner's local scale changed from `previous_scale`
    fn on_rescale(&mut self, ctx: &mut BehaviorContext<'_>, previous_scale: Vec3) {}

    /// Push draw requests for this frame
    fn on_render(&self, view: &RenderView, uniforms: &UniformData, sink: &mut dyn RenderSink) {}

    /// Type-specific persisted fields; the entity adds the `type` key
    fn serialize(&self) -> Map<String, Value> {
        Map::new()
    }

    /// Apply persisted fields. Absent or malformed keys keep their current value.
    fn deserialize(&mut self, data: &Map<String, Value>, resolve: &ResolveContext) {}

    /// Draw editable fields. The default lists the persisted fields read-only.
    fn render_inspector(&mut self, ui: &mut dyn InspectorUi) {
        for (key, value) in &self.serialize() {
            ui.value(key, value);
        }
    }
}

/// Concrete type tag of a boxed unit
pub(crate) fn behavior_type_id(unit: &dyn Behavior) -> TypeId {
    AsAny::as_any(unit).type_id()
}

/// Downcast a unit to its concrete type
pub fn downcast_ref<T: Behavior>(unit: &dyn Behavior) -> Option<&T> {
    AsAny::as_any(unit).downcast_ref::<T>()
}

/// Mutable downcast of a unit to its concrete type
pub fn downcast_mut<T: Behavior>(unit: &mut dyn Behavior) -> Option<&mut T> {
    AsAny::as_any_mut(unit).downcast_mut::<T>()
}

/// Canonical registry name of a concrete type: its path's last segment without generics
pub fn canonical_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics.rsplit("::").next().unwrap_or(without_generics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Spin {
        speed: f32,
    }

    impl Behavior for Spin {}

    #[derive(Default)]
    struct Other;

    impl Behavior for Other {}

    #[test]
    fn test_canonical_name_strips_path() {
        assert_eq!(canonical_type_name::<Spin>(), "Spin");
        assert_eq!(canonical_type_name::<Vec<u8>>(), "Vec");
    }

    #[test]
    fn test_downcast_through_trait_object() {
        let boxed: Box<dyn Behavior> = Box::new(Spin { speed: 2.0 });
        assert_eq!(behavior_type_id(boxed.as_ref()), TypeId::of::<Spin>());
        assert_eq!(downcast_ref::<Spin>(boxed.as_ref()).map(|s| s.speed), Some(2.0));
        assert!(downcast_ref::<Other>(boxed.as_ref()).is_none());
    }
}
