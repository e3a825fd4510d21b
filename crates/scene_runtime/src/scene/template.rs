//! Templates (reusable entity hierarchies)
//!
//! A template is an entity hierarchy kept in its own preview scene, outside of
//! any runtime id space, and stored as one nested record:
//!
//! ```text
//! { "id": 1, "name": "Crate", ..., "components": [...],
//!   "children": [ { "id": 2, "name": "Lid", ..., "children": [] } ] }
//! ```
//!
//! Instantiation serializes the template and spawns the record into the target
//! scene with fresh ids, so instances never share state with the template or
//! with each other. References between entities inside the template are
//! remapped to the new ids.

use std::collections::HashMap;
use std::path::Path;

use log::{debug, error, warn};
use serde_json::{Map, Value};

use super::error::{SceneError, SceneResult};
use super::persistence::{json_kind, write_document, ResolveContext};
use super::scene_index::SceneIndex;
use crate::assets::ResourceCatalog;
use crate::config::SceneConfig;
use crate::ecs::components::TransformNode;
use crate::ecs::entity::{Entity, EntityId, LifecycleStage};
use crate::ecs::registry::TypeRegistry;
use crate::foundation::math::{Quat, Vec3};

/// Persisted, reusable entity hierarchy
pub struct Template {
    resource_id: String,
    graph: SceneIndex,
    root: EntityId,
}

impl Template {
    /// Template with a single empty root entity named after the resource id
    pub fn new(resource_id: &str, registry: &TypeRegistry, resources: &ResourceCatalog) -> Self {
        let mut graph = Self::preview_graph(registry, resources);
        let root = graph.create_entity(resource_id);
        Self {
            resource_id: resource_id.to_string(),
            graph,
            root,
        }
    }

    /// Capture an entity and its descendants from a scene
    pub fn from_entity(resource_id: &str, scene: &SceneIndex, id: EntityId) -> SceneResult<Self> {
        scene.live_entity(id)?;
        let record = nested_record(scene, id);
        Ok(Self::deserialize(resource_id, &record, scene.registry(), scene.resources()))
    }

    /// Rebuild a template from its nested record
    pub fn deserialize(
        resource_id: &str,
        data: &Map<String, Value>,
        registry: &TypeRegistry,
        resources: &ResourceCatalog,
    ) -> Self {
        let mut graph = Self::preview_graph(registry, resources);
        let spawned = spawn_nested(&mut graph, data, None);
        graph.update_world_transforms();
        finish_spawn(&mut graph, &spawned, false);
        let root = spawned.first().copied().unwrap_or(EntityId::NONE);
        Self {
            resource_id: resource_id.to_string(),
            graph,
            root,
        }
    }

    fn preview_graph(registry: &TypeRegistry, resources: &ResourceCatalog) -> SceneIndex {
        SceneIndex::preview(registry.clone(), resources.detached_copy(), SceneConfig::default())
    }

    /// Stable resource id
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// Root entity inside the template graph
    pub fn root(&self) -> EntityId {
        self.root
    }

    /// Root entity
    pub fn root_entity(&self) -> Option<&Entity> {
        self.graph.entity(self.root)
    }

    /// Template graph
    pub fn graph(&self) -> &SceneIndex {
        &self.graph
    }

    /// Editable template graph
    pub fn graph_mut(&mut self) -> &mut SceneIndex {
        &mut self.graph
    }

    /// Nested record of the root and its descendants
    pub fn serialize(&self) -> Map<String, Value> {
        nested_record(&self.graph, self.root)
    }

    /// Load a template file; the resource id is the file stem
    pub fn load_from_file(
        path: impl AsRef<Path>,
        registry: &TypeRegistry,
        resources: &ResourceCatalog,
    ) -> SceneResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            error!("Failed to open template file {}: {}", path.display(), e);
            SceneError::Io(e)
        })?;
        let document: Value = serde_json::from_str(&text).map_err(|e| {
            error!("Failed to parse template file {}: {}", path.display(), e);
            SceneError::Json(e)
        })?;
        let Value::Object(record) = &document else {
            let e = SceneError::MalformedDocument(format!("template root is {}", json_kind(&document)));
            error!("{}: {}", path.display(), e);
            return Err(e);
        };

        let resource_id = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default();
        Ok(Self::deserialize(resource_id, record, registry, resources))
    }

    /// Write the nested record to `path`
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> SceneResult<()> {
        let path = path.as_ref();
        let text = write_document(&Value::Object(self.serialize()), self.graph.config().pretty_files)?;
        std::fs::write(path, text).map_err(|e| {
            error!("Failed to write template file {}: {}", path.display(), e);
            SceneError::Io(e)
        })
    }

    /// Spawn a copy into `scene`.
    ///
    /// The copy's root gets `position_offset` added to its local position and
    /// `rotation_offset` applied on top of its local rotation, and is parented
    /// under `parent` if given. With `has_started` the spawned entities also
    /// receive `on_start` and `on_late_start`.
    pub fn instantiate_into(
        &self,
        scene: &mut SceneIndex,
        parent: Option<EntityId>,
        position_offset: Vec3,
        rotation_offset: Quat,
        has_started: bool,
    ) -> SceneResult<EntityId> {
        self.spawn_into(scene, parent, has_started, |node| {
            node.translate(position_offset);
            node.rotate(rotation_offset);
        })
    }

    fn spawn_into(
        &self,
        scene: &mut SceneIndex,
        parent: Option<EntityId>,
        has_started: bool,
        place: impl FnOnce(&mut TransformNode),
    ) -> SceneResult<EntityId> {
        if let Some(parent) = parent {
            scene.live_entity(parent)?;
        }
        let record = self.serialize();
        let spawned = spawn_nested(scene, &record, parent);
        let Some(root) = spawned.first().copied() else {
            return Err(SceneError::MalformedDocument(format!("template '{}' is empty", self.resource_id)));
        };

        if let Some(entity) = scene.entity_mut(root) {
            place(entity.transform_mut());
        }
        if parent.is_none() {
            scene.disambiguate_name(root);
        }
        scene.update_subtree(root);

        finish_spawn(scene, &spawned, has_started);
        debug!("Instantiated template '{}' as {} ({} entities)", self.resource_id, root, spawned.len());
        Ok(root)
    }
}

impl SceneIndex {
    /// Spawn a copy of `template`; see [`Template::instantiate_into`]
    pub fn instantiate_template(
        &mut self,
        template: &Template,
        parent: Option<EntityId>,
        position_offset: Vec3,
        rotation_offset: Quat,
        has_started: bool,
    ) -> SceneResult<EntityId> {
        template.instantiate_into(self, parent, position_offset, rotation_offset, has_started)
    }

    /// Spawn a root-level copy of `template` placed exactly at `position`
    /// and `rotation`
    pub fn instantiate_at(
        &mut self,
        template: &Template,
        position: Vec3,
        rotation: Quat,
        has_started: bool,
    ) -> SceneResult<EntityId> {
        template.spawn_into(self, None, has_started, |node| {
            node.set_local_position(position);
            node.set_local_rotation(rotation);
        })
    }

    /// Spawn a catalog template by resource id
    pub fn instantiate_by_id(
        &mut self,
        resource_id: &str,
        parent: Option<EntityId>,
        has_started: bool,
    ) -> SceneResult<EntityId> {
        let Some(template) = self.resources.template(resource_id) else {
            return Err(SceneError::UnknownResource(resource_id.to_string()));
        };
        template.instantiate_into(self, parent, Vec3::zeros(), Quat::identity(), has_started)
    }
}

/// Entity record with its descendants nested under `children`
fn nested_record(scene: &SceneIndex, id: EntityId) -> Map<String, Value> {
    let Some(entity) = scene.entity(id) else {
        return Map::new();
    };
    let mut record = entity.serialize();
    let children = entity
        .transform()
        .children()
        .iter()
        .map(|child| Value::Object(nested_record(scene, *child)))
        .collect();
    record.insert("children".into(), Value::Array(children));
    record
}

/// Create entities for a nested record with fresh ids.
///
/// Returns the spawned ids in depth-first preorder, root first. Lifecycle
/// calls are left to [`finish_spawn`] so the caller can place the root first.
fn spawn_nested(scene: &mut SceneIndex, record: &Map<String, Value>, parent: Option<EntityId>) -> Vec<EntityId> {
    // Pass 1: flatten and reserve ids
    let mut flat: Vec<(&Map<String, Value>, Option<usize>)> = Vec::new();
    let mut stack = vec![(record, None)];
    while let Some((node, nesting_parent)) = stack.pop() {
        let index = flat.len();
        flat.push((node, nesting_parent));
        if let Some(children) = node.get("children") {
            match children.as_array() {
                Some(children) => {
                    for child in children.iter().rev() {
                        match child.as_object() {
                            Some(child) => stack.push((child, Some(index))),
                            None => warn!("Skipping template child that is {}", json_kind(child)),
                        }
                    }
                }
                None => warn!("Ignoring malformed 'children' in template record"),
            }
        }
    }

    let mut remap = HashMap::new();
    let mut ids = Vec::with_capacity(flat.len());
    for (node, _) in &flat {
        let id = scene.allocate_id();
        if let Some(saved) = node.get("id").and_then(Value::as_u64).filter(|saved| *saved != 0) {
            remap.entry(saved).or_insert(id);
        }
        let entity = Entity::new(id, scene.config().default_entity_name.clone(), scene.config());
        scene.insert_entity(entity);
        ids.push(id);
    }

    // Pass 2: data, then nesting links
    let resolve = ResolveContext::new(remap, scene.live_id_set(), false, Some(scene.resources().clone()));
    let registry = scene.registry().clone();
    for ((node, _), id) in flat.iter().zip(&ids) {
        if let Some(entity) = scene.entity_mut(*id) {
            entity.deserialize(node, &registry, &resolve);
        }
    }

    for ((_, nesting_parent), id) in flat.iter().zip(&ids) {
        let target = match nesting_parent {
            Some(index) => Some(ids[*index]),
            None => parent,
        };
        if let Some(target) = target {
            if let Err(e) = scene.set_parent(*id, Some(target), false) {
                warn!("Spawned entity {} left at root: {}", id, e);
            }
        }
    }
    ids
}

/// Run the creation lifecycle (and optionally start) for spawned entities
fn finish_spawn(scene: &mut SceneIndex, spawned: &[EntityId], has_started: bool) {
    for id in spawned {
        scene.advance_entity(*id, LifecycleStage::Created);
        scene.advance_entity(*id, LifecycleStage::CreatedLate);
    }
    if has_started {
        for id in spawned {
            scene.advance_entity(*id, LifecycleStage::Started);
        }
        for id in spawned {
            scene.advance_entity(*id, LifecycleStage::LateStarted);
        }
    }
}
