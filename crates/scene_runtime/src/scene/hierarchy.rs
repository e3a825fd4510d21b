//! Parent/child links and world transform propagation
//!
//! Links are stored on both ends (`parent` on the child's node, the child id in
//! the parent's list) and only ever edited here so they cannot drift apart.
//! Reparenting under a descendant is rejected with
//! [`SceneError::HierarchyCycle`].

use log::{trace, warn};

use super::error::{SceneError, SceneResult};
use super::scene_index::SceneIndex;
use crate::ecs::behavior::Behavior;
use crate::ecs::entity::{EntityId, LifecycleStage};
use crate::foundation::math::{Mat4, Pose, Quat, Vec3};

impl SceneIndex {
    /// Parent of an entity
    pub fn parent_of(&self, id: EntityId) -> Option<EntityId> {
        self.entity(id)?.transform().parent()
    }

    /// Direct children of an entity in attach order
    pub fn children_of(&self, id: EntityId) -> Vec<EntityId> {
        self.entity(id)
            .map(|e| e.transform().children().to_vec())
            .unwrap_or_default()
    }

    /// Root-level entities in id order
    pub fn root_ids(&self) -> Vec<EntityId> {
        self.iter()
            .filter(|e| e.transform().parent().is_none())
            .map(|e| e.id())
            .collect()
    }

    /// Every descendant of an entity, depth-first preorder, excluding itself
    pub fn descendants_of(&self, id: EntityId) -> Vec<EntityId> {
        let mut out = Vec::new();
        let mut stack: Vec<EntityId> = self.children_of(id).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children_of(next).into_iter().rev());
        }
        out
    }

    /// Whether `ancestor` is `id` or lies on its parent chain
    pub fn is_ancestor_or_self(&self, ancestor: EntityId, id: EntityId) -> bool {
        let mut current = Some(id);
        let mut hops = 0;
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            hops += 1;
            if hops > self.len() {
                warn!("Parent chain of {} does not terminate", id);
                return false;
            }
            current = self.parent_of(node);
        }
        false
    }

    /// Reparent `child` under `parent` (or make it a root).
    ///
    /// With `preserve_world` the local pose is recomputed so the world pose
    /// stays put; otherwise the local pose is kept and the world pose follows
    /// the new parent.
    pub fn set_parent(&mut self, child: EntityId, parent: Option<EntityId>, preserve_world: bool) -> SceneResult<()> {
        self.live_entity(child)?;
        if let Some(parent) = parent {
            self.live_entity(parent)?;
            if parent == child {
                return Err(SceneError::SelfParent(child));
            }
            if self.is_ancestor_or_self(child, parent) {
                return Err(SceneError::HierarchyCycle { child, parent });
            }
        }
        if self.parent_of(child) == parent {
            return Ok(());
        }

        let world_before = preserve_world.then(|| self.world_matrix(child)).flatten();

        self.detach_link(child);
        if let Some(parent_id) = parent {
            if let Some(entity) = self.entity_mut(child) {
                entity.transform_mut().set_parent_link(Some(parent_id));
            }
            if let Some(entity) = self.entity_mut(parent_id) {
                entity.transform_mut().add_child(child);
            }
        }
        trace!("Parent of {} is now {:?}", child, parent);

        if let Some(world) = world_before {
            let local = match parent.and_then(|p| self.world_matrix(p)) {
                Some(parent_world) => Pose::relative_to(&world, &parent_world),
                None => Some(Pose::from_matrix(&world)),
            };
            match (local, self.entity_mut(child)) {
                (Some(local), Some(entity)) => entity.transform_mut().set_local_pose(local),
                (None, _) => warn!("Parent of {} has a singular transform; keeping local pose", child),
                _ => {}
            }
            self.flush_rescale(child);
        }

        self.update_subtree(child);
        Ok(())
    }

    /// Make an entity a root, keeping its world pose
    pub(crate) fn detach(&mut self, id: EntityId) {
        if self.parent_of(id).is_some() {
            if let Err(e) = self.set_parent(id, None, true) {
                warn!("Failed to detach {}: {}", id, e);
            }
        }
    }

    fn detach_link(&mut self, child: EntityId) {
        let Some(old_parent) = self.parent_of(child) else {
            return;
        };
        if let Some(entity) = self.entity_mut(old_parent) {
            entity.transform_mut().remove_child(child);
        }
        if let Some(entity) = self.entity_mut(child) {
            entity.transform_mut().set_parent_link(None);
        }
    }

    /// Composed parent-then-self matrix, computed from local poses
    pub fn world_matrix(&self, id: EntityId) -> Option<Mat4> {
        let mut matrix = self.entity(id)?.transform().local_matrix();
        let mut current = self.parent_of(id);
        let mut hops = 0;
        while let Some(parent) = current {
            hops += 1;
            if hops > self.len() {
                warn!("Parent chain of {} does not terminate", id);
                break;
            }
            let Some(entity) = self.entity(parent) else {
                break;
            };
            matrix = entity.transform().local_matrix() * matrix;
            current = entity.transform().parent();
        }
        Some(matrix)
    }

    /// Recompute every cached world pose, roots first, and deliver pending
    /// rescale notifications
    pub fn update_world_transforms(&mut self) {
        for id in self.entity_ids() {
            self.flush_rescale(id);
        }
        for root in self.root_ids() {
            self.propagate_from(root, Mat4::identity());
        }
    }

    /// Recompute the cached world poses of one subtree
    pub(crate) fn update_subtree(&mut self, id: EntityId) {
        let parent_world = self
            .parent_of(id)
            .and_then(|p| self.world_matrix(p))
            .unwrap_or_else(Mat4::identity);
        self.propagate_from(id, parent_world);
    }

    fn propagate_from(&mut self, root: EntityId, parent_world: Mat4) {
        let mut stack = vec![(root, parent_world)];
        let mut visited = 0;
        while let Some((id, parent_world)) = stack.pop() {
            visited += 1;
            if visited > self.len() {
                warn!("World transform update of {} revisited nodes; stopping", root);
                return;
            }
            let Some(entity) = self.entity_mut(id) else {
                continue;
            };
            let world = parent_world * entity.transform().local_matrix();
            entity.transform_mut().set_world(Pose::from_matrix(&world));
            for child in entity.transform().children().iter().rev() {
                stack.push((*child, world));
            }
        }
    }

    /// Deliver `on_rescale` for a scale change recorded on the node
    fn flush_rescale(&mut self, id: EntityId) {
        let Some(previous) = self.entity_mut(id).and_then(|e| e.transform_mut().take_pending_rescale()) else {
            return;
        };
        let Some(entity) = self.entity(id) else {
            return;
        };
        let units: Vec<_> = entity
            .slot_type_ids()
            .into_iter()
            .filter(|type_id| {
                entity
                    .slot(*type_id)
                    .is_some_and(|slot| slot.stage >= LifecycleStage::Created && slot.stage < LifecycleStage::Destroyed)
            })
            .collect();
        for type_id in units {
            self.with_unit(id, type_id, |unit, ctx| unit.on_rescale(ctx, previous));
        }
    }

    /// Set an entity's local position and refresh its subtree
    pub fn set_local_position(&mut self, id: EntityId, position: Vec3) -> SceneResult<()> {
        self.live_entity_mut(id)?.transform_mut().set_local_position(position);
        self.update_subtree(id);
        Ok(())
    }

    /// Set an entity's local rotation and refresh its subtree
    pub fn set_local_rotation(&mut self, id: EntityId, rotation: Quat) -> SceneResult<()> {
        self.live_entity_mut(id)?.transform_mut().set_local_rotation(rotation);
        self.update_subtree(id);
        Ok(())
    }

    /// Set an entity's local scale, notify its behaviors and refresh its subtree
    pub fn set_local_scale(&mut self, id: EntityId, scale: Vec3) -> SceneResult<()> {
        self.live_entity_mut(id)?.transform_mut().set_local_scale(scale);
        self.flush_rescale(id);
        self.update_subtree(id);
        Ok(())
    }

    /// First unit of type `T` on the entity or its descendants, depth-first
    pub fn get_behavior_in_children<T: Behavior>(&self, id: EntityId) -> Option<&T> {
        std::iter::once(id)
            .chain(self.descendants_of(id))
            .find_map(|node| self.get_behavior::<T>(node))
    }

    /// First unit of type `T` on the entity or up its parent chain
    pub fn get_behavior_in_parent<T: Behavior>(&self, id: EntityId) -> Option<&T> {
        let mut current = Some(id);
        let mut hops = 0;
        while let Some(node) = current {
            if let Some(unit) = self.get_behavior::<T>(node) {
                return Some(unit);
            }
            hops += 1;
            if hops > self.len() {
                return None;
            }
            current = self.parent_of(node);
        }
        None
    }
}
