//! Hierarchical transform node
//!
//! Every entity owns exactly one node. Local pose is authored data; the world
//! pose is a cache rebuilt top-down by
//! [`SceneIndex::update_world_transforms`](crate::scene::SceneIndex::update_world_transforms).
//! Parent and children are plain entity ids: the hierarchy never owns an
//! entity, the scene does.
//!
//! Structural edits (parenting) go through the scene so both ends of a link
//! stay in sync; this type only exposes them crate-internally.

use log::warn;
use serde_json::{Map, Value};

use crate::ecs::entity::EntityId;
use crate::foundation::math::{Mat4, Pose, Quat, Vec3};
use crate::scene::persistence::{quat_from_value, quat_to_value, vec3_from_value, vec3_to_value};

/// Spatial node of an entity
#[derive(Debug, Clone, PartialEq)]
pub struct TransformNode {
    owner: EntityId,
    local: Pose,
    world: Pose,
    parent: Option<EntityId>,
    children: Vec<EntityId>,
    pending_rescale: Option<Vec3>,
}

impl TransformNode {
    /// Identity node owned by `owner`
    pub fn new(owner: EntityId) -> Self {
        Self {
            owner,
            local: Pose::identity(),
            world: Pose::identity(),
            parent: None,
            children: Vec::new(),
            pending_rescale: None,
        }
    }

    /// Entity this node belongs to
    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// Parent entity, if any
    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    /// Child entities in attach order
    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    /// Local pose relative to the parent
    pub fn local(&self) -> &Pose {
        &self.local
    }

    /// Cached world pose as of the last world-transform update
    pub fn world(&self) -> &Pose {
        &self.world
    }

    /// Local position
    pub fn local_position(&self) -> Vec3 {
        self.local.position
    }

    /// Local rotation
    pub fn local_rotation(&self) -> Quat {
        self.local.rotation
    }

    /// Local scale
    pub fn local_scale(&self) -> Vec3 {
        self.local.scale
    }

    /// World position
    pub fn world_position(&self) -> Vec3 {
        self.world.position
    }

    /// World rotation
    pub fn world_rotation(&self) -> Quat {
        self.world.rotation
    }

    /// World scale
    pub fn world_scale(&self) -> Vec3 {
        self.world.scale
    }

    /// Set the local position
    pub fn set_local_position(&mut self, position: Vec3) {
        self.local.position = position;
    }

    /// Set the local rotation
    pub fn set_local_rotation(&mut self, rotation: Quat) {
        self.local.rotation = rotation;
    }

    /// Set the local scale. Owning behaviors get `on_rescale` with the
    /// previous value at the next notification point.
    pub fn set_local_scale(&mut self, scale: Vec3) {
        if scale == self.local.scale {
            return;
        }
        if self.pending_rescale.is_none() {
            self.pending_rescale = Some(self.local.scale);
        }
        self.local.scale = scale;
    }

    /// Replace the whole local pose
    pub fn set_local_pose(&mut self, pose: Pose) {
        self.set_local_position(pose.position);
        self.set_local_rotation(pose.rotation);
        self.set_local_scale(pose.scale);
    }

    /// Move by `delta` in parent space
    pub fn translate(&mut self, delta: Vec3) {
        self.local.position += delta;
    }

    /// Apply `delta` on top of the current local rotation
    pub fn rotate(&mut self, delta: Quat) {
        self.local.rotation = delta * self.local.rotation;
    }

    /// Local T * R * S matrix
    pub fn local_matrix(&self) -> Mat4 {
        self.local.to_matrix()
    }

    /// World forward direction (-Z)
    pub fn forward(&self) -> Vec3 {
        self.world.rotation * Vec3::new(0.0, 0.0, -1.0)
    }

    /// World right direction (+X)
    pub fn right(&self) -> Vec3 {
        self.world.rotation * Vec3::new(1.0, 0.0, 0.0)
    }

    /// World up direction (+Y)
    pub fn up(&self) -> Vec3 {
        self.world.rotation * Vec3::new(0.0, 1.0, 0.0)
    }

    pub(crate) fn set_owner(&mut self, owner: EntityId) {
        self.owner = owner;
    }

    pub(crate) fn set_parent_link(&mut self, parent: Option<EntityId>) {
        self.parent = parent;
    }

    pub(crate) fn add_child(&mut self, child: EntityId) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    pub(crate) fn remove_child(&mut self, child: EntityId) {
        self.children.retain(|c| *c != child);
    }

    pub(crate) fn set_world(&mut self, world: Pose) {
        self.world = world;
    }

    pub(crate) fn take_pending_rescale(&mut self) -> Option<Vec3> {
        self.pending_rescale.take()
    }

    /// Persisted form: world and local pose plus the parent id (`0` for none)
    pub fn serialize(&self) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert("position".into(), vec3_to_value(&self.world.position));
        data.insert("rotation".into(), quat_to_value(&self.world.rotation));
        data.insert("scale".into(), vec3_to_value(&self.world.scale));
        data.insert("localPosition".into(), vec3_to_value(&self.local.position));
        data.insert("localRotation".into(), quat_to_value(&self.local.rotation));
        data.insert("localScale".into(), vec3_to_value(&self.local.scale));
        data.insert("parent".into(), Value::from(self.parent.map_or(0, EntityId::raw)));
        data
    }

    /// Apply persisted pose fields, skipping any that are absent or malformed.
    ///
    /// Returns the raw persisted parent id (`0` or absent means none); linking
    /// is left to the scene, which owns id resolution. Does not queue a
    /// rescale notification.
    pub fn deserialize(&mut self, data: &Map<String, Value>) -> u64 {
        fn field<T>(data: &Map<String, Value>, key: &str, parse: fn(&Value) -> Option<T>) -> Option<T> {
            let value = data.get(key)?;
            let parsed = parse(value);
            if parsed.is_none() {
                warn!("Ignoring malformed transform field '{}': {}", key, value);
            }
            parsed
        }

        if let Some(v) = field(data, "position", vec3_from_value) {
            self.world.position = v;
        }
        if let Some(q) = field(data, "rotation", quat_from_value) {
            self.world.rotation = q;
        }
        if let Some(v) = field(data, "scale", vec3_from_value) {
            self.world.scale = v;
        }
        if let Some(v) = field(data, "localPosition", vec3_from_value) {
            self.local.position = v;
        }
        if let Some(q) = field(data, "localRotation", quat_from_value) {
            self.local.rotation = q;
        }
        if let Some(v) = field(data, "localScale", vec3_from_value) {
            self.local.scale = v;
        }

        data.get("parent").and_then(Value::as_u64).unwrap_or(0)
    }
}
