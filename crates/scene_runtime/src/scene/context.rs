//! Scene access handed to behavior hooks
//!
//! A hook's own unit is checked out of its entity while it runs, so looking
//! up the calling type on the owner returns `None`. Removals requested here
//! are deferred to the next maintenance pass.

use std::any::TypeId;

use serde_json::{Map, Value};

use super::error::SceneResult;
use super::scene_index::SceneIndex;
use super::template::Template;
use crate::assets::ResourceCatalog;
use crate::ecs::behavior::Behavior;
use crate::ecs::entity::{Entity, EntityId};
use crate::foundation::math::{Quat, Vec3};
use crate::foundation::time::FrameTime;
use crate::physics::PhysicsWorldKind;

/// Scene view scoped to the entity owning the running behavior
pub struct BehaviorContext<'a> {
    scene: &'a mut SceneIndex,
    owner: EntityId,
}

impl<'a> BehaviorContext<'a> {
    pub(crate) fn new(scene: &'a mut SceneIndex, owner: EntityId) -> Self {
        Self { scene, owner }
    }

    /// Entity running the hook
    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// Owning entity
    pub fn entity(&self) -> Option<&Entity> {
        self.scene.entity(self.owner)
    }

    /// Mutable owning entity
    pub fn entity_mut(&mut self) -> Option<&mut Entity> {
        self.scene.entity_mut(self.owner)
    }

    /// Read-only view of the whole scene
    pub fn scene(&self) -> &SceneIndex {
        &*self.scene
    }

    /// Frame timing
    pub fn time(&self) -> &FrameTime {
        self.scene.time()
    }

    /// Physics world of the owning scene
    pub fn physics_world(&self) -> PhysicsWorldKind {
        self.scene.physics_world()
    }

    /// Resource catalog of the owning scene
    pub fn resources(&self) -> &ResourceCatalog {
        self.scene.resources()
    }

    /// Move the owner
    pub fn set_local_position(&mut self, position: Vec3) -> SceneResult<()> {
        self.scene.set_local_position(self.owner, position)
    }

    /// Rotate the owner
    pub fn set_local_rotation(&mut self, rotation: Quat) -> SceneResult<()> {
        self.scene.set_local_rotation(self.owner, rotation)
    }

    /// Rescale the owner
    pub fn set_local_scale(&mut self, scale: Vec3) -> SceneResult<()> {
        self.scene.set_local_scale(self.owner, scale)
    }

    /// Reparent any entity
    pub fn set_parent(&mut self, child: EntityId, parent: Option<EntityId>, preserve_world: bool) -> SceneResult<()> {
        self.scene.set_parent(child, parent, preserve_world)
    }

    /// Create an entity; it is not visited by the pass currently running
    pub fn create_entity(&mut self, name: &str) -> EntityId {
        self.scene.create_entity(name)
    }

    /// Spawn a copy of a template
    pub fn instantiate_template(
        &mut self,
        template: &Template,
        parent: Option<EntityId>,
        position_offset: Vec3,
        rotation_offset: Quat,
        has_started: bool,
    ) -> SceneResult<EntityId> {
        self.scene
            .instantiate_template(template, parent, position_offset, rotation_offset, has_started)
    }

    /// Mark an entity for destruction
    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        self.scene.remove_entity(id)
    }

    /// Editor-style delete of an entity and its children
    pub fn delete_entity(&mut self, id: EntityId, delete_self: bool) -> bool {
        self.scene.delete_entity(id, delete_self)
    }

    /// Attach a `T` to the owner
    pub fn add_behavior<T: Behavior + Default>(&mut self) -> SceneResult<&mut T> {
        self.scene.add_behavior::<T>(self.owner)
    }

    /// Attach a `T` to another entity
    pub fn add_behavior_to<T: Behavior + Default>(&mut self, id: EntityId) -> SceneResult<&mut T> {
        self.scene.add_behavior::<T>(id)
    }

    /// Attach a behavior to the owner by registered name
    pub fn add_behavior_by_name(&mut self, type_name: &str, data: Option<&Map<String, Value>>) -> Option<TypeId> {
        self.scene.add_behavior_by_name(self.owner, type_name, data)
    }

    /// Queue removal of the owner's `T`
    pub fn remove_behavior<T: Behavior>(&mut self) -> bool {
        self.scene.remove_behavior::<T>(self.owner)
    }

    /// Sibling unit of type `T` on the owner
    pub fn get_behavior<T: Behavior>(&self) -> Option<&T> {
        self.scene.get_behavior::<T>(self.owner)
    }

    /// Mutable sibling unit of type `T` on the owner
    pub fn get_behavior_mut<T: Behavior>(&mut self) -> Option<&mut T> {
        self.scene.get_behavior_mut::<T>(self.owner)
    }

    /// Unit of type `T` on any entity
    pub fn get_behavior_on<T: Behavior>(&self, id: EntityId) -> Option<&T> {
        self.scene.get_behavior::<T>(id)
    }

    /// Mutable unit of type `T` on any entity
    pub fn get_behavior_on_mut<T: Behavior>(&mut self, id: EntityId) -> Option<&mut T> {
        self.scene.get_behavior_mut::<T>(id)
    }

    /// First unit of type `T` in the scene
    pub fn find_first_of_type<T: Behavior>(&self) -> Option<(EntityId, &T)> {
        self.scene.find_first_of_type::<T>()
    }
}
