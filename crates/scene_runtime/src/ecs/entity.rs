//! Entity implementation
//!
//! An entity is a named scene object that owns one [`TransformNode`] and at
//! most one behavior unit per concrete type. Lifecycle calls, parenting and
//! destruction are driven by the owning [`SceneIndex`](crate::scene::SceneIndex);
//! this type holds the state and the persistence format.

use std::any::TypeId;
use std::fmt;

use bitflags::bitflags;
use log::{debug, warn};
use serde_json::{Map, Value};

use super::behavior::{behavior_type_id, downcast_mut, downcast_ref, Behavior};
use super::components::{MissingBehaviorRecord, TransformNode};
use super::registry::TypeRegistry;
use crate::config::SceneConfig;
use crate::scene::persistence::ResolveContext;

/// Scene-scoped entity identifier; `0` means unassigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct EntityId(u64);

impl EntityId {
    /// The unassigned id
    pub const NONE: Self = Self(0);

    /// Wrap a raw id
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Whether a scene has assigned this id
    pub const fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

bitflags! {
    /// Entity state flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EntityFlags: u8 {
        /// Receives update, fixed-update, late-update and render calls
        const ACTIVE = 1 << 0;
        /// Queued for the next maintenance sweep
        const PENDING_DESTROY = 1 << 1;
        /// `on_destroy` has run
        const DESTROYED = 1 << 2;
    }
}

/// Monotonic lifecycle stage of an entity or of one of its behavior units
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleStage {
    /// Constructed, not yet known to a scene's lifecycle
    Unregistered,
    /// `on_create` delivered
    Created,
    /// `on_create_late` delivered; creation is finished
    CreatedLate,
    /// `on_start` delivered
    Started,
    /// `on_late_start` delivered
    LateStarted,
    /// `on_destroy` delivered
    Destroyed,
}

impl LifecycleStage {
    /// Stage that follows this one in the creation/start sequence
    pub(crate) const fn next(self) -> Option<Self> {
        match self {
            Self::Unregistered => Some(Self::Created),
            Self::Created => Some(Self::CreatedLate),
            Self::CreatedLate => Some(Self::Started),
            Self::Started => Some(Self::LateStarted),
            Self::LateStarted | Self::Destroyed => None,
        }
    }
}

/// Editor selection inside an entity, consulted by delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BehaviorSelection {
    /// A live unit, by concrete type
    Unit(TypeId),
    /// A placeholder record, by declared type name
    Missing(String),
}

/// Storage for one behavior unit.
///
/// `unit` is `None` only while the unit is checked out to run one of its own
/// hooks.
pub(crate) struct BehaviorSlot {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: String,
    pub(crate) stage: LifecycleStage,
    pub(crate) unit: Option<Box<dyn Behavior>>,
}

/// What a deserialize pass produced that the scene still has to act on
#[derive(Debug, Default)]
pub(crate) struct EntityLoad {
    /// Raw persisted parent id, `0` for none
    pub(crate) parent: u64,
}

/// A scene object
pub struct Entity {
    id: EntityId,
    name: String,
    tag: String,
    layer: String,
    flags: EntityFlags,
    stage: LifecycleStage,
    transform: TransformNode,
    slots: Vec<BehaviorSlot>,
    missing: Vec<MissingBehaviorRecord>,
    pending_unit_removals: Vec<TypeId>,
    pending_missing_removals: Vec<String>,
    selected: Option<BehaviorSelection>,
}

impl Entity {
    pub(crate) fn new(id: EntityId, name: impl Into<String>, config: &SceneConfig) -> Self {
        Self {
            id,
            name: name.into(),
            tag: config.default_tag.clone(),
            layer: config.default_layer.clone(),
            flags: EntityFlags::ACTIVE,
            stage: LifecycleStage::Unregistered,
            transform: TransformNode::new(id),
            slots: Vec::new(),
            missing: Vec::new(),
            pending_unit_removals: Vec::new(),
            pending_missing_removals: Vec::new(),
            selected: None,
        }
    }

    /// Scene-assigned id
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename without disambiguation
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Tag string
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Set the tag
    pub fn set_tag(&mut self, tag: impl Into<String>) {
        self.tag = tag.into();
    }

    /// Layer name
    pub fn layer(&self) -> &str {
        &self.layer
    }

    /// Set the layer
    pub fn set_layer(&mut self, layer: impl Into<String>) {
        self.layer = layer.into();
    }

    /// Whether per-frame fan-outs reach this entity
    pub fn is_active(&self) -> bool {
        self.flags.contains(EntityFlags::ACTIVE)
    }

    /// Enable or disable per-frame fan-outs
    pub fn set_active(&mut self, active: bool) {
        self.flags.set(EntityFlags::ACTIVE, active);
    }

    /// Current flags
    pub fn flags(&self) -> EntityFlags {
        self.flags
    }

    /// Current lifecycle stage
    pub fn stage(&self) -> LifecycleStage {
        self.stage
    }

    /// `on_create_late` has been delivered
    pub fn finished_creation(&self) -> bool {
        self.stage >= LifecycleStage::CreatedLate
    }

    /// `on_start` has been delivered
    pub fn has_started(&self) -> bool {
        self.stage >= LifecycleStage::Started
    }

    /// Queued for destruction in the next maintenance pass
    pub fn is_pending_destroy(&self) -> bool {
        self.flags.contains(EntityFlags::PENDING_DESTROY)
    }

    /// `on_destroy` has run
    pub fn is_destroyed(&self) -> bool {
        self.flags.contains(EntityFlags::DESTROYED)
    }

    /// Spatial node
    pub fn transform(&self) -> &TransformNode {
        &self.transform
    }

    /// Mutable spatial node (local pose only; parent links go through the scene)
    pub fn transform_mut(&mut self) -> &mut TransformNode {
        &mut self.transform
    }

    /// Unit of exact type `T`
    pub fn get_behavior<T: Behavior>(&self) -> Option<&T> {
        self.slot(TypeId::of::<T>())
            .and_then(|slot| slot.unit.as_deref())
            .and_then(downcast_ref::<T>)
    }

    /// Mutable unit of exact type `T`
    pub fn get_behavior_mut<T: Behavior>(&mut self) -> Option<&mut T> {
        self.slot_mut(TypeId::of::<T>())
            .and_then(|slot| slot.unit.as_deref_mut())
            .and_then(downcast_mut::<T>)
    }

    /// Whether a unit of type `T` is attached
    pub fn has_behavior<T: Behavior>(&self) -> bool {
        self.slot(TypeId::of::<T>()).is_some()
    }

    /// Attached units with their persisted type names, in attach order
    pub fn behaviors(&self) -> impl Iterator<Item = (&str, &dyn Behavior)> + '_ {
        self.slots
            .iter()
            .filter_map(|slot| slot.unit.as_deref().map(|unit| (slot.type_name.as_str(), unit)))
    }

    /// Persisted type names of attached units
    pub fn behavior_type_names(&self) -> Vec<&str> {
        self.slots.iter().map(|slot| slot.type_name.as_str()).collect()
    }

    /// Number of attached units (placeholders excluded)
    pub fn behavior_count(&self) -> usize {
        self.slots.len()
    }

    /// Placeholders for unresolved persisted behaviors
    pub fn missing_behaviors(&self) -> &[MissingBehaviorRecord] {
        &self.missing
    }

    /// Lifecycle stage a unit has reached
    pub fn behavior_stage<T: Behavior>(&self) -> Option<LifecycleStage> {
        self.slot(TypeId::of::<T>()).map(|slot| slot.stage)
    }

    /// Whether removal of the unit of type `type_id` is queued
    pub fn is_removal_pending(&self, type_id: TypeId) -> bool {
        self.pending_unit_removals.contains(&type_id)
    }

    /// Editor selection
    pub fn selected_behavior(&self) -> Option<&BehaviorSelection> {
        self.selected.as_ref()
    }

    /// Set or clear the editor selection
    pub fn select_behavior(&mut self, selection: Option<BehaviorSelection>) {
        self.selected = selection;
    }

    pub(crate) fn set_id(&mut self, id: EntityId) {
        self.id = id;
        self.transform.set_owner(id);
    }

    pub(crate) fn set_stage(&mut self, stage: LifecycleStage) {
        if stage > self.stage {
            self.stage = stage;
        }
    }

    pub(crate) fn set_flag(&mut self, flag: EntityFlags, value: bool) {
        self.flags.set(flag, value);
    }

    pub(crate) fn slot(&self, type_id: TypeId) -> Option<&BehaviorSlot> {
        self.slots.iter().find(|slot| slot.type_id == type_id)
    }

    pub(crate) fn slot_mut(&mut self, type_id: TypeId) -> Option<&mut BehaviorSlot> {
        self.slots.iter_mut().find(|slot| slot.type_id == type_id)
    }

    pub(crate) fn slot_type_ids(&self) -> Vec<TypeId> {
        self.slots.iter().map(|slot| slot.type_id).collect()
    }

    /// Attach a unit; hands it back if its concrete type is already present
    pub(crate) fn insert_slot(
        &mut self,
        type_name: impl Into<String>,
        unit: Box<dyn Behavior>,
    ) -> Result<TypeId, Box<dyn Behavior>> {
        let type_id = behavior_type_id(unit.as_ref());
        if self.slot(type_id).is_some() {
            return Err(unit);
        }
        self.slots.push(BehaviorSlot {
            type_id,
            type_name: type_name.into(),
            stage: LifecycleStage::Unregistered,
            unit: Some(unit),
        });
        Ok(type_id)
    }

    pub(crate) fn remove_slot(&mut self, type_id: TypeId) -> Option<BehaviorSlot> {
        let index = self.slots.iter().position(|slot| slot.type_id == type_id)?;
        if self.selected == Some(BehaviorSelection::Unit(type_id)) {
            self.selected = None;
        }
        Some(self.slots.remove(index))
    }

    pub(crate) fn queue_unit_removal(&mut self, type_id: TypeId) -> bool {
        if self.slot(type_id).is_none() || self.pending_unit_removals.contains(&type_id) {
            return false;
        }
        self.pending_unit_removals.push(type_id);
        true
    }

    pub(crate) fn take_pending_unit_removals(&mut self) -> Vec<TypeId> {
        std::mem::take(&mut self.pending_unit_removals)
    }

    pub(crate) fn queue_missing_removal(&mut self, type_name: &str) -> bool {
        let present = self.missing.iter().any(|m| m.type_name() == type_name);
        let queued = self.pending_missing_removals.iter().filter(|n| *n == type_name).count();
        let available = self.missing.iter().filter(|m| m.type_name() == type_name).count();
        if !present || queued >= available {
            return false;
        }
        self.pending_missing_removals.push(type_name.to_string());
        true
    }

    /// Drop queued placeholders, first match per queued name
    pub(crate) fn flush_missing_removals(&mut self) -> usize {
        let queued = std::mem::take(&mut self.pending_missing_removals);
        let mut removed = 0;
        for type_name in queued {
            if let Some(index) = self.missing.iter().position(|m| m.type_name() == type_name) {
                self.missing.remove(index);
                removed += 1;
                if self.selected == Some(BehaviorSelection::Missing(type_name)) {
                    self.selected = None;
                }
            }
        }
        removed
    }

    pub(crate) fn push_missing(&mut self, record: MissingBehaviorRecord) {
        self.missing.push(record);
    }

    /// Take out every placeholder whose type the registry now knows
    pub(crate) fn take_resolvable_missing(&mut self, registry: &TypeRegistry) -> Vec<MissingBehaviorRecord> {
        let pending = &self.pending_missing_removals;
        let (resolvable, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.missing)
            .into_iter()
            .partition(|m| registry.is_registered(m.type_name()) && !pending.iter().any(|n| n == m.type_name()));
        self.missing = kept;
        resolvable
    }

    /// Persisted record: identity, transform and one record per unit/placeholder
    pub fn serialize(&self) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert("id".into(), Value::from(self.id.raw()));
        data.insert("name".into(), Value::String(self.name.clone()));
        data.insert("isActive".into(), Value::Bool(self.is_active()));
        data.insert("layer".into(), Value::String(self.layer.clone()));
        data.insert("tag".into(), Value::String(self.tag.clone()));
        data.insert("transform".into(), Value::Object(self.transform.serialize()));

        let mut components = Vec::with_capacity(self.slots.len() + self.missing.len());
        for slot in &self.slots {
            let Some(unit) = slot.unit.as_deref() else {
                warn!("Behavior '{}' on {} is busy and was not serialized", slot.type_name, self.id);
                continue;
            };
            let mut record = Map::new();
            record.insert("type".into(), Value::String(slot.type_name.clone()));
            for (key, value) in unit.serialize() {
                if key != "type" {
                    record.insert(key, value);
                }
            }
            components.push(Value::Object(record));
        }
        components.extend(self.missing.iter().map(|m| Value::Object(m.serialize())));
        data.insert("components".into(), Value::Array(components));
        data
    }

    /// Apply a persisted record. Every field is optional; unregistered behavior
    /// types become placeholders. The persisted `id` is ignored: ids belong to
    /// the scene.
    pub(crate) fn deserialize(
        &mut self,
        data: &Map<String, Value>,
        registry: &TypeRegistry,
        resolve: &ResolveContext,
    ) -> EntityLoad {
        let mut load = EntityLoad::default();

        if let Some(name) = string_field(data, "name") {
            self.name = name.to_string();
        }
        if let Some(active) = data.get("isActive") {
            match active.as_bool() {
                Some(active) => self.set_active(active),
                None => warn!("Ignoring malformed 'isActive' on {}: {}", self.id, active),
            }
        }
        if let Some(layer) = string_field(data, "layer") {
            self.layer = layer.to_string();
        }
        if let Some(tag) = string_field(data, "tag") {
            self.tag = tag.to_string();
        }
        if let Some(transform) = data.get("transform") {
            match transform.as_object() {
                Some(transform) => load.parent = self.transform.deserialize(transform),
                None => warn!("Ignoring malformed 'transform' on {}", self.id),
            }
        }

        let Some(components) = data.get("components") else {
            return load;
        };
        let Some(components) = components.as_array() else {
            warn!("Ignoring malformed 'components' on {}", self.id);
            return load;
        };

        for component in components {
            let Some(record) = component.as_object() else {
                warn!("Skipping non-object behavior record on {}", self.id);
                continue;
            };
            let Some(type_name) = string_field(record, "type") else {
                warn!("Skipping behavior record without a 'type' on {}", self.id);
                continue;
            };
            self.deserialize_behavior(type_name, record, registry, resolve);
        }
        load
    }

    fn deserialize_behavior(
        &mut self,
        type_name: &str,
        record: &Map<String, Value>,
        registry: &TypeRegistry,
        resolve: &ResolveContext,
    ) {
        let Some(mut unit) = registry.create(type_name) else {
            debug!("Behavior type '{}' is not registered; keeping placeholder on {}", type_name, self.id);
            self.push_missing(MissingBehaviorRecord::new(type_name, record.clone()));
            return;
        };

        let type_id = behavior_type_id(unit.as_ref());
        if let Some(slot) = self.slot_mut(type_id) {
            match slot.unit.as_deref_mut() {
                Some(existing) => existing.deserialize(record, resolve),
                None => warn!("Behavior '{}' is busy; skipping its data", type_name),
            }
            return;
        }

        unit.deserialize(record, resolve);
        if self.insert_slot(type_name, unit).is_err() {
            warn!("Could not attach behavior '{}' to {}", type_name, self.id);
        }
    }
}

fn string_field<'a>(data: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    let value = data.get(key)?;
    let text = value.as_str();
    if text.is_none() {
        warn!("Ignoring malformed '{}': {}", key, value);
    }
    text
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("layer", &self.layer)
            .field("flags", &self.flags)
            .field("stage", &self.stage)
            .field("behaviors", &self.behavior_type_names())
            .field("missing", &self.missing.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Health {
        points: i64,
    }

    impl Behavior for Health {
        fn serialize(&self) -> Map<String, Value> {
            let mut data = Map::new();
            data.insert("points".into(), json!(self.points));
            data
        }

        fn deserialize(&mut self, data: &Map<String, Value>, _resolve: &ResolveContext) {
            if let Some(points) = data.get("points").and_then(Value::as_i64) {
                self.points = points;
            }
        }
    }

    fn entity(id: u64) -> Entity {
        Entity::new(EntityId::new(id), "Crate", &SceneConfig::default())
    }

    #[test]
    fn test_one_unit_per_type() {
        let mut e = entity(1);
        assert!(e.insert_slot("Health", Box::new(Health::default())).is_ok());
        assert!(e.insert_slot("Health", Box::new(Health { points: 3 })).is_err());
        assert_eq!(e.behavior_count(), 1);
        assert_eq!(e.get_behavior::<Health>().map(|h| h.points), Some(0));
    }

    #[test]
    fn test_serialize_shape() {
        let mut e = entity(7);
        e.set_tag("Player");
        e.insert_slot("Health", Box::new(Health { points: 12 })).ok();

        let data = Value::Object(e.serialize());
        assert_eq!(data["id"], json!(7));
        assert_eq!(data["name"], json!("Crate"));
        assert_eq!(data["isActive"], json!(true));
        assert_eq!(data["layer"], json!("Default"));
        assert_eq!(data["tag"], json!("Player"));
        assert_eq!(data["transform"]["parent"], json!(0));
        assert_eq!(data["components"], json!([{"type": "Health", "points": 12}]));
    }

    #[test]
    fn test_unknown_type_becomes_placeholder() {
        let registry = TypeRegistry::new();
        registry.register::<Health>();
        let mut e = entity(1);

        let data = json!({
            "name": "Loaded",
            "components": [
                {"type": "Health", "points": 40},
                {"type": "UnknownScript", "x": 5},
                {"points": 1},
                17
            ]
        });
        let load = e.deserialize(data.as_object().unwrap(), &registry, &ResolveContext::detached());

        assert_eq!(load.parent, 0);
        assert_eq!(e.behavior_count(), 1);
        assert_eq!(e.name(), "Loaded");
        assert_eq!(e.get_behavior::<Health>().map(|h| h.points), Some(40));
        assert_eq!(e.missing_behaviors().len(), 1);
        assert_eq!(
            Value::Object(e.missing_behaviors()[0].serialize()),
            json!({"type": "UnknownScript", "x": 5})
        );
    }

    #[test]
    fn test_malformed_fields_keep_defaults() {
        let registry = TypeRegistry::new();
        let mut e = entity(1);
        let data = json!({"name": 4, "isActive": "yes", "tag": "Enemy", "components": {}});
        e.deserialize(data.as_object().unwrap(), &registry, &ResolveContext::detached());

        assert_eq!(e.name(), "Crate");
        assert!(e.is_active());
        assert_eq!(e.tag(), "Enemy");
    }

    #[test]
    fn test_missing_removal_queue_is_bounded() {
        let mut e = entity(1);
        e.push_missing(MissingBehaviorRecord::new("Ghost", Map::new()));

        assert!(e.queue_missing_removal("Ghost"));
        assert!(!e.queue_missing_removal("Ghost"));
        assert!(!e.queue_missing_removal("Other"));
        assert_eq!(e.missing_behaviors().len(), 1);

        assert_eq!(e.flush_missing_removals(), 1);
        assert!(e.missing_behaviors().is_empty());
    }

    #[test]
    fn test_stage_is_monotonic() {
        let mut e = entity(1);
        e.set_stage(LifecycleStage::Started);
        e.set_stage(LifecycleStage::Created);
        assert_eq!(e.stage(), LifecycleStage::Started);
        assert!(e.finished_creation());
        assert!(e.has_started());
    }
}
