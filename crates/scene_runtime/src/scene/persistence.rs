//! Scene persistence
//!
//! Scenes are stored as JSON: a top-level array of entity records. Loading is
//! two-pass so records may reference entities written later in the file:
//!
//! 1. every record gets a bare entity and a final id (saved ids are kept when
//!    free, otherwise replaced), building a saved-id to final-id remap table;
//! 2. every record is deserialized against that table, parents are linked,
//!    world transforms are rebuilt and the creation lifecycle runs.
//!
//! Field-level problems are logged and skipped. A document whose root is not
//! a scene is rejected before anything is touched.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::error::{SceneError, SceneResult};
use super::scene_index::SceneIndex;
use crate::assets::{ResourceCatalog, ResourceHandle};
use crate::ecs::entity::{Entity, EntityId, LifecycleStage};
use crate::foundation::math::{Quat, Quaternion, Vec3};
use crate::foundation::time::Stopwatch;

/// Norm below which a persisted quaternion is rejected
const MIN_QUAT_NORM: f32 = 1e-6;

/// Encode a vector as `[x, y, z]`
pub fn vec3_to_value(v: &Vec3) -> Value {
    Value::Array(vec![Value::from(v.x), Value::from(v.y), Value::from(v.z)])
}

/// Decode `[x, y, z]`
pub fn vec3_from_value(value: &Value) -> Option<Vec3> {
    match value.as_array()?.as_slice() {
        [x, y, z] => Some(Vec3::new(x.as_f64()? as f32, y.as_f64()? as f32, z.as_f64()? as f32)),
        _ => None,
    }
}

/// Encode a rotation as `[x, y, z, w]`
pub fn quat_to_value(q: &Quat) -> Value {
    Value::Array(vec![
        Value::from(q.i),
        Value::from(q.j),
        Value::from(q.k),
        Value::from(q.w),
    ])
}

/// Decode `[x, y, z, w]`, normalizing; a zero quaternion is rejected
pub fn quat_from_value(value: &Value) -> Option<Quat> {
    match value.as_array()?.as_slice() {
        [x, y, z, w] => {
            let raw = Quaternion::new(
                w.as_f64()? as f32,
                x.as_f64()? as f32,
                y.as_f64()? as f32,
                z.as_f64()? as f32,
            );
            Quat::try_new(raw, MIN_QUAT_NORM)
        }
        _ => None,
    }
}

/// Serialize any serde type into a behavior record body
pub fn to_record<T: Serialize>(value: &T) -> Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            warn!("Behavior state did not serialize to an object: {}", other);
            Map::new()
        }
        Err(e) => {
            warn!("Failed to serialize behavior state: {}", e);
            Map::new()
        }
    }
}

/// Overlay persisted keys onto serde-derived state one key at a time.
///
/// Keys `T` does not serialize are ignored; a key whose value does not decode
/// is skipped with a warning and the current value is kept.
pub fn merge_fields<T>(target: &mut T, data: &Map<String, Value>)
where
    T: Serialize + DeserializeOwned,
{
    let mut current = match serde_json::to_value(&*target) {
        Ok(Value::Object(map)) => map,
        _ => {
            warn!("Cannot merge fields into a non-object type");
            return;
        }
    };

    let mut changed = false;
    for (key, value) in data {
        if key == "type" || !current.contains_key(key) {
            continue;
        }
        let mut candidate = current.clone();
        candidate.insert(key.clone(), value.clone());
        match serde_json::from_value::<T>(Value::Object(candidate.clone())) {
            Ok(_) => {
                current = candidate;
                changed = true;
            }
            Err(e) => warn!("Skipping malformed field '{}': {}", key, e),
        }
    }

    if changed {
        match serde_json::from_value(Value::Object(current)) {
            Ok(merged) => *target = merged,
            Err(e) => warn!("Failed to apply merged fields: {}", e),
        }
    }
}

/// Reference resolver handed to behaviors during deserialization
///
/// Persisted entity ids are first looked up in the load's remap table; ids not
/// written by the same load resolve only if a live entity in the target scene
/// already carries them (and the load allows that). Anything else is `None`.
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    remap: HashMap<u64, EntityId>,
    live: HashSet<EntityId>,
    allow_existing: bool,
    resources: Option<ResourceCatalog>,
}

impl ResolveContext {
    /// A context that resolves nothing
    pub fn detached() -> Self {
        Self::default()
    }

    pub(crate) fn new(
        remap: HashMap<u64, EntityId>,
        live: HashSet<EntityId>,
        allow_existing: bool,
        resources: Option<ResourceCatalog>,
    ) -> Self {
        Self {
            remap,
            live,
            allow_existing,
            resources,
        }
    }

    /// Final id for a persisted entity id
    pub fn entity(&self, saved: u64) -> Option<EntityId> {
        if saved == 0 {
            return None;
        }
        if let Some(id) = self.remap.get(&saved) {
            return Some(*id);
        }
        let existing = EntityId::new(saved);
        (self.allow_existing && self.live.contains(&existing)).then_some(existing)
    }

    /// Resolve an entity reference stored as an integer or numeric string
    pub fn entity_from_value(&self, value: &Value) -> Option<EntityId> {
        let saved = match value {
            Value::Number(n) => n.as_u64()?,
            Value::String(s) => s.parse().ok()?,
            _ => return None,
        };
        self.entity(saved)
    }

    /// Resolve an asset reference against the resource catalog
    pub fn resource(&self, id: &str) -> Option<ResourceHandle> {
        self.resources.as_ref()?.get(id)
    }
}

/// Entity records of a scene document.
///
/// Accepts a top-level array or an object with a `gameobjects` (or
/// `entities`) array.
pub(crate) fn scene_records(document: &Value) -> SceneResult<&[Value]> {
    match document {
        Value::Array(records) => Ok(records),
        Value::Object(root) => ["gameobjects", "entities"]
            .iter()
            .find_map(|key| root.get(*key).and_then(Value::as_array))
            .map(Vec::as_slice)
            .ok_or_else(|| SceneError::MalformedDocument("object root has no 'gameobjects' array".into())),
        other => Err(SceneError::MalformedDocument(format!(
            "expected an array of entity records, found {}",
            json_kind(other)
        ))),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Render a document honoring the pretty-print setting
pub(crate) fn write_document(document: &Value, pretty: bool) -> SceneResult<String> {
    let text = if pretty {
        serde_json::to_string_pretty(document)?
    } else {
        serde_json::to_string(document)?
    };
    Ok(text)
}

impl SceneIndex {
    /// One record per live entity, in id order
    pub fn save_to_records(&self) -> Vec<Value> {
        self.iter().map(|entity| Value::Object(entity.serialize())).collect()
    }

    /// Scene document as a JSON string
    pub fn save_to_string(&self) -> SceneResult<String> {
        write_document(&Value::Array(self.save_to_records()), self.config().pretty_files)
    }

    /// Write the scene document to `path`
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> SceneResult<()> {
        let path = path.as_ref();
        let timer = Stopwatch::start_new();
        let text = self.save_to_string()?;
        std::fs::write(path, text).map_err(|e| {
            error!("Failed to write scene file {}: {}", path.display(), e);
            SceneError::Io(e)
        })?;
        info!("Saved {} entities to {} in {:.2} ms", self.len(), path.display(), timer.elapsed_millis());
        Ok(())
    }

    /// Load a scene document from `path`, adding its entities to this scene
    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> SceneResult<Vec<EntityId>> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            error!("Failed to open scene file {}: {}", path.display(), e);
            SceneError::Io(e)
        })?;
        let timer = Stopwatch::start_new();
        let loaded = self.load_from_str(&text)?;
        info!("Loaded {} entities from {} in {:.2} ms", loaded.len(), path.display(), timer.elapsed_millis());
        Ok(loaded)
    }

    /// Load a scene document from JSON text
    pub fn load_from_str(&mut self, text: &str) -> SceneResult<Vec<EntityId>> {
        let document: Value = serde_json::from_str(text).map_err(|e| {
            error!("Failed to parse scene document: {}", e);
            SceneError::Json(e)
        })?;
        self.load_from_value(&document)
    }

    /// Load a parsed scene document
    pub fn load_from_value(&mut self, document: &Value) -> SceneResult<Vec<EntityId>> {
        let records = scene_records(document).map_err(|e| {
            error!("{}", e);
            e
        })?;
        Ok(self.load_from_records(records))
    }

    /// Add every record to the scene; returns the new ids in record order.
    ///
    /// Records that are not objects are skipped.
    pub fn load_from_records(&mut self, records: &[Value]) -> Vec<EntityId> {
        let records: Vec<&Map<String, Value>> = records
            .iter()
            .filter_map(|record| {
                let object = record.as_object();
                if object.is_none() {
                    warn!("Skipping entity record that is {}", json_kind(record));
                }
                object
            })
            .collect();

        // Pass 1: reserve ids
        let mut remap = HashMap::new();
        let mut loaded = Vec::with_capacity(records.len());
        for record in &records {
            let saved = record.get("id").and_then(Value::as_u64).unwrap_or(0);
            let id = self.reserve_id(saved);
            if saved != 0 {
                if remap.contains_key(&saved) {
                    warn!("Duplicate entity id {} in document; references resolve to the first", saved);
                } else {
                    remap.insert(saved, id);
                }
            }
            if saved != id.raw() {
                debug!("Entity id {} remapped to {}", saved, id);
            }
            let entity = Entity::new(id, self.config().default_entity_name.clone(), self.config());
            self.insert_entity(entity);
            loaded.push(id);
        }

        // Pass 2: full data and references
        let resolve = ResolveContext::new(remap, self.live_id_set(), true, Some(self.resources().clone()));
        let registry = self.registry().clone();
        let mut parents = Vec::with_capacity(loaded.len());
        for (record, id) in records.iter().zip(&loaded) {
            let Some(entity) = self.entity_mut(*id) else {
                continue;
            };
            let load = entity.deserialize(record, &registry, &resolve);
            parents.push((*id, load.parent));
        }

        for (id, saved_parent) in parents {
            if saved_parent == 0 {
                continue;
            }
            match resolve.entity(saved_parent) {
                Some(parent) => {
                    if let Err(e) = self.set_parent(id, Some(parent), false) {
                        warn!("Entity {} keeps no parent: {}", id, e);
                    }
                }
                None => warn!("Entity {} references missing parent {}; loaded as root", id, saved_parent),
            }
        }

        self.update_world_transforms();

        for id in &loaded {
            self.advance_entity(*id, LifecycleStage::Created);
            self.advance_entity(*id, LifecycleStage::CreatedLate);
        }
        loaded
    }

    /// Final id for a persisted id.
    ///
    /// A saved id is kept only when it is at or above the next id to
    /// allocate, so ids stay monotonic. Zero, ids below that mark (even free
    /// ones) and `u64::MAX` get a fresh id.
    fn reserve_id(&mut self, saved: u64) -> EntityId {
        if saved == 0 || saved < self.next_id {
            return self.allocate_id();
        }
        let Some(next) = saved.checked_add(1) else {
            warn!("Saved entity id {} is out of range; assigning a fresh id", saved);
            return self.allocate_id();
        };
        self.next_id = next;
        EntityId::new(saved)
    }
}
