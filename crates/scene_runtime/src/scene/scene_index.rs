//! Scene index
//!
//! Owns every entity of one scene, assigns ids and drives the per-frame
//! fan-outs. Entities live in a slot arena; an id-ordered index maps ids to
//! slots so every fan-out visits entities in id order.
//!
//! ## Deferred destruction
//!
//! Nothing is destroyed while a fan-out runs. `remove_entity` and
//! `remove_behavior` only mark; [`SceneIndex::on_update_internal`] first flushes
//! each entity's queued behavior removals, then sweeps the marked entities in
//! the order they were marked (`on_destroy`, unlink, erase). Behavior code can
//! therefore remove itself or anything else mid-update.
//!
//! ## Behavior checkout
//!
//! While a hook runs, its unit is taken out of its slot and handed a
//! [`BehaviorContext`] borrowing the whole scene. Passes iterate over a
//! snapshot of `(entity, unit type)` pairs taken before the pass, so units
//! added mid-pass, on any entity, are not visited until the next pass and a
//! checked-out slot is skipped.

use std::any::TypeId;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use log::{debug, error, trace, warn};
use serde_json::{Map, Value};

use super::context::BehaviorContext;
use super::error::{SceneError, SceneResult};
use super::persistence::ResolveContext;
use super::render_hooks::{RenderSink, RenderView, UniformData};
use crate::assets::ResourceCatalog;
use crate::config::SceneConfig;
use crate::ecs::behavior::{canonical_type_name, Behavior};
use crate::ecs::entity::{BehaviorSelection, Entity, EntityFlags, EntityId, LifecycleStage};
use crate::ecs::registry::TypeRegistry;
use crate::foundation::collections::{EntityArena, EntitySlot};
use crate::foundation::time::{FixedStep, FrameTime};
use crate::physics::{ContactEvent, ContactKind, PhysicsWorldKind};

/// All entities of one scene
pub struct SceneIndex {
    pub(super) entities: EntityArena<Entity>,
    pub(super) index: BTreeMap<EntityId, EntitySlot>,
    pub(super) next_id: u64,
    /// Marked entities in mark order
    pub(super) pending_destroy: Vec<EntityId>,
    pending_destroy_set: HashSet<EntityId>,
    pub(super) config: SceneConfig,
    pub(super) registry: TypeRegistry,
    pub(super) resources: ResourceCatalog,
    pub(super) physics_world: PhysicsWorldKind,
    fixed_step: FixedStep,
    time: FrameTime,
    started: bool,
}

impl SceneIndex {
    /// Empty scene with default configuration
    pub fn new(registry: TypeRegistry, resources: ResourceCatalog) -> Self {
        Self::with_config(registry, resources, SceneConfig::default())
    }

    /// Empty scene with explicit configuration
    pub fn with_config(registry: TypeRegistry, resources: ResourceCatalog, config: SceneConfig) -> Self {
        let fixed_step = FixedStep::new(config.fixed_timestep, config.max_fixed_steps);
        Self {
            entities: EntityArena::with_key(),
            index: BTreeMap::new(),
            next_id: 1,
            pending_destroy: Vec::new(),
            pending_destroy_set: HashSet::new(),
            time: FrameTime {
                fixed_delta: fixed_step.step(),
                ..FrameTime::default()
            },
            fixed_step,
            config,
            registry,
            resources,
            physics_world: PhysicsWorldKind::Simulated,
            started: false,
        }
    }

    /// Scene backed by the non-simulated preview physics world
    pub fn preview(registry: TypeRegistry, resources: ResourceCatalog, config: SceneConfig) -> Self {
        let mut scene = Self::with_config(registry, resources, config);
        scene.physics_world = PhysicsWorldKind::Preview;
        scene
    }

    /// Active configuration
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Behavior type registry shared with this scene
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Resource catalog used to resolve persisted asset references
    pub fn resources(&self) -> &ResourceCatalog {
        &self.resources
    }

    /// Physics world entities of this scene belong to
    pub fn physics_world(&self) -> PhysicsWorldKind {
        self.physics_world
    }

    /// Timing of the current frame
    pub fn time(&self) -> &FrameTime {
        &self.time
    }

    /// Whether `on_start` has been fanned out
    pub fn has_started(&self) -> bool {
        self.started
    }

    // --- Entity table ------------------------------------------------------

    /// Live entity by id (including ones marked for destruction)
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.index.get(&id).and_then(|slot| self.entities.get(*slot))
    }

    /// Mutable live entity by id
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let slot = *self.index.get(&id)?;
        self.entities.get_mut(slot)
    }

    /// Whether `id` names a live entity
    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    /// Whether `id` was issued by this scene and is no longer live
    pub fn is_destroyed(&self, id: EntityId) -> bool {
        id.is_assigned() && id.raw() < self.next_id && !self.contains(id)
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the scene holds no entity
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Live ids in ascending order
    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.index.keys().copied().collect()
    }

    /// Live entities in id order
    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.index.values().filter_map(|slot| self.entities.get(*slot))
    }

    /// Id the next created entity will receive
    pub fn next_id(&self) -> EntityId {
        EntityId::new(self.next_id)
    }

    pub(crate) fn live_entity(&self, id: EntityId) -> SceneResult<&Entity> {
        self.entity(id).ok_or_else(|| self.missing_entity_error(id))
    }

    pub(crate) fn live_entity_mut(&mut self, id: EntityId) -> SceneResult<&mut Entity> {
        let error = self.missing_entity_error(id);
        self.entity_mut(id).ok_or(error)
    }

    fn missing_entity_error(&self, id: EntityId) -> SceneError {
        if self.is_destroyed(id) {
            SceneError::EntityDestroyed(id)
        } else {
            SceneError::UnknownEntity(id)
        }
    }

    pub(crate) fn live_id_set(&self) -> HashSet<EntityId> {
        self.index.keys().copied().collect()
    }

    pub(crate) fn allocate_id(&mut self) -> EntityId {
        let id = EntityId::new(self.next_id);
        match self.next_id.checked_add(1) {
            Some(next) => self.next_id = next,
            None => error!("Entity id space exhausted; id {} will be handed out again", id),
        }
        id
    }

    pub(crate) fn insert_entity(&mut self, entity: Entity) -> EntityId {
        let id = entity.id();
        let slot = self.entities.insert(entity);
        if let Some(previous) = self.index.insert(id, slot) {
            warn!("Entity id {} was reused; dropping the previous entity", id);
            self.entities.remove(previous);
        }
        id
    }

    // --- Creation ----------------------------------------------------------

    /// Create an entity and run its creation lifecycle.
    ///
    /// An empty name becomes the configured default; a name already used by a
    /// root-level entity gets a `" (n)"` suffix.
    pub fn create_entity(&mut self, name: &str) -> EntityId {
        self.create_entity_from(name, None)
    }

    /// Create an entity and apply a persisted record before its creation
    /// lifecycle runs. A `parent` in the record resolves against live ids.
    pub fn create_entity_from(&mut self, name: &str, data: Option<&Map<String, Value>>) -> EntityId {
        let base = if name.is_empty() {
            self.config.default_entity_name.clone()
        } else {
            name.to_string()
        };
        let unique = self.available_root_name(&base, None);
        let id = self.allocate_id();
        self.insert_entity(Entity::new(id, unique, &self.config));

        if let Some(data) = data {
            let resolve = self.resolve_context();
            let registry = self.registry.clone();
            let parent = self
                .entity_mut(id)
                .map(|entity| entity.deserialize(data, &registry, &resolve).parent)
                .unwrap_or(0);

            match resolve.entity(parent) {
                Some(parent) => {
                    if let Err(e) = self.set_parent(id, Some(parent), false) {
                        warn!("Entity {} keeps no parent: {}", id, e);
                    }
                }
                None if parent != 0 => warn!("Entity {} references missing parent {}", id, parent),
                None => {}
            }
            self.disambiguate_name(id);
            self.update_subtree(id);
        }

        self.advance_entity(id, LifecycleStage::Created);
        self.advance_entity(id, LifecycleStage::CreatedLate);
        debug!("Created entity {} '{}'", id, self.entity(id).map_or("", Entity::name));
        id
    }

    /// Name not used by any root-level entity other than `exclude`
    pub fn available_root_name(&self, name: &str, exclude: Option<EntityId>) -> String {
        let taken: HashSet<&str> = self
            .iter()
            .filter(|e| e.transform().parent().is_none() && Some(e.id()) != exclude)
            .map(Entity::name)
            .collect();
        if !taken.contains(name) {
            return name.to_string();
        }
        (1..)
            .map(|n| format!("{name} ({n})"))
            .find(|candidate| !taken.contains(candidate.as_str()))
            .unwrap_or_else(|| name.to_string())
    }

    /// Rename an entity, disambiguating against root-level siblings
    pub fn rename_entity(&mut self, id: EntityId, name: &str) -> SceneResult<()> {
        self.live_entity_mut(id)?.set_name(name);
        self.disambiguate_name(id);
        Ok(())
    }

    pub(crate) fn disambiguate_name(&mut self, id: EntityId) {
        let Some(entity) = self.entity(id) else {
            return;
        };
        if entity.transform().parent().is_some() {
            return;
        }
        let unique = self.available_root_name(entity.name(), Some(id));
        if let Some(entity) = self.entity_mut(id) {
            if entity.name() != unique {
                entity.set_name(unique);
            }
        }
    }

    /// Enable or disable per-frame fan-outs for an entity
    pub fn set_active(&mut self, id: EntityId, active: bool) -> SceneResult<()> {
        self.live_entity_mut(id)?.set_active(active);
        Ok(())
    }

    pub(crate) fn resolve_context(&self) -> ResolveContext {
        ResolveContext::new(Default::default(), self.live_id_set(), true, Some(self.resources.clone()))
    }

    // --- Behaviors ---------------------------------------------------------

    /// Attach a default-constructed `T`, fast-forwarded to the entity's stage
    pub fn add_behavior<T: Behavior + Default>(&mut self, id: EntityId) -> SceneResult<&mut T> {
        let type_name = self
            .registry
            .name_of(TypeId::of::<T>())
            .unwrap_or_else(|| canonical_type_name::<T>().to_string());
        self.attach_behavior(id, type_name, Box::new(T::default()))?;
        self.live_entity_mut(id)?
            .get_behavior_mut::<T>()
            .ok_or_else(|| SceneError::EntityDestroyed(id))
    }

    /// Attach a behavior by registered name, optionally applying a record.
    ///
    /// Unregistered names and duplicates are logged and yield `None`.
    pub fn add_behavior_by_name(
        &mut self,
        id: EntityId,
        type_name: &str,
        data: Option<&Map<String, Value>>,
    ) -> Option<TypeId> {
        if !self.contains(id) {
            warn!("Cannot add '{}' to unknown entity {}", type_name, id);
            return None;
        }
        let Some(mut unit) = self.registry.create(type_name) else {
            warn!("Behavior type '{}' is not registered", type_name);
            return None;
        };
        if let Some(data) = data {
            unit.deserialize(data, &self.resolve_context());
        }
        match self.attach_behavior(id, type_name.to_string(), unit) {
            Ok(type_id) => Some(type_id),
            Err(e) => {
                warn!("Cannot add '{}' to {}: {}", type_name, id, e);
                None
            }
        }
    }

    pub(crate) fn attach_behavior(
        &mut self,
        id: EntityId,
        type_name: String,
        unit: Box<dyn Behavior>,
    ) -> SceneResult<TypeId> {
        let entity = self.live_entity_mut(id)?;
        if entity.stage() == LifecycleStage::Destroyed {
            return Err(SceneError::EntityDestroyed(id));
        }
        let type_id = entity
            .insert_slot(type_name.clone(), unit)
            .map_err(|_| SceneError::DuplicateBehavior(type_name.clone()))?;
        let target = entity.stage().min(LifecycleStage::LateStarted);
        trace!("Attached '{}' to {} (fast-forward to {:?})", type_name, id, target);
        self.advance_unit(id, type_id, target);
        Ok(type_id)
    }

    /// Unit of type `T` on an entity
    pub fn get_behavior<T: Behavior>(&self, id: EntityId) -> Option<&T> {
        self.entity(id)?.get_behavior::<T>()
    }

    /// Mutable unit of type `T` on an entity
    pub fn get_behavior_mut<T: Behavior>(&mut self, id: EntityId) -> Option<&mut T> {
        self.entity_mut(id)?.get_behavior_mut::<T>()
    }

    /// Queue removal of the unit of type `T`; it is destroyed in the next
    /// maintenance pass
    pub fn remove_behavior<T: Behavior>(&mut self, id: EntityId) -> bool {
        self.remove_behavior_by_type_id(id, TypeId::of::<T>())
    }

    /// Queue removal of the unit registered under `type_name`
    pub fn remove_behavior_by_name(&mut self, id: EntityId, type_name: &str) -> bool {
        let type_id = self.entity(id).and_then(|entity| {
            entity
                .behaviors()
                .find(|(name, _)| *name == type_name)
                .map(|(_, unit)| crate::ecs::behavior::behavior_type_id(unit))
        });
        type_id.is_some_and(|type_id| self.remove_behavior_by_type_id(id, type_id))
    }

    pub(crate) fn remove_behavior_by_type_id(&mut self, id: EntityId, type_id: TypeId) -> bool {
        let queued = self
            .entity_mut(id)
            .is_some_and(|entity| entity.queue_unit_removal(type_id));
        if queued {
            trace!("Queued behavior removal on {}", id);
        }
        queued
    }

    /// Queue deletion of a placeholder record
    pub fn remove_missing_behavior(&mut self, id: EntityId, type_name: &str) -> bool {
        self.entity_mut(id)
            .is_some_and(|entity| entity.queue_missing_removal(type_name))
    }

    /// Turn placeholders whose type has since been registered back into live
    /// behaviors. Returns how many were restored.
    pub fn resolve_missing_behaviors(&mut self) -> usize {
        let registry = self.registry.clone();
        let resolve = self.resolve_context();
        let mut restored = 0;

        for id in self.entity_ids() {
            let Some(records) = self.entity_mut(id).map(|e| e.take_resolvable_missing(&registry)) else {
                continue;
            };
            for record in records {
                let Some(mut unit) = registry.create(record.type_name()) else {
                    if let Some(entity) = self.entity_mut(id) {
                        entity.push_missing(record);
                    }
                    continue;
                };
                unit.deserialize(record.payload(), &resolve);
                match self.attach_behavior(id, record.type_name().to_string(), unit) {
                    Ok(_) => {
                        debug!("Restored behavior '{}' on {}", record.type_name(), id);
                        restored += 1;
                    }
                    Err(e) => {
                        warn!("Keeping placeholder '{}' on {}: {}", record.type_name(), id, e);
                        if let Some(entity) = self.entity_mut(id) {
                            entity.push_missing(record);
                        }
                    }
                }
            }
        }
        restored
    }

    /// Run `f` with the unit checked out of its slot
    pub(crate) fn with_unit<R>(
        &mut self,
        id: EntityId,
        type_id: TypeId,
        f: impl FnOnce(&mut dyn Behavior, &mut BehaviorContext<'_>) -> R,
    ) -> Option<R> {
        let mut unit = self.entity_mut(id)?.slot_mut(type_id)?.unit.take()?;
        let result = {
            let mut ctx = BehaviorContext::new(self, id);
            f(&mut *unit, &mut ctx)
        };
        match self.entity_mut(id).and_then(|entity| entity.slot_mut(type_id)) {
            Some(slot) => slot.unit = Some(unit),
            None => debug!("Behavior slot on {} vanished during its own callback", id),
        }
        Some(result)
    }

    fn unit_ids(&self, id: EntityId) -> Vec<TypeId> {
        self.entity(id).map(Entity::slot_type_ids).unwrap_or_default()
    }

    /// Every unit of every active entity, captured before a pass begins
    fn active_units(&self) -> Vec<(EntityId, TypeId)> {
        self.iter()
            .filter(|e| e.is_active())
            .flat_map(|e| e.slot_type_ids().into_iter().map(move |type_id| (e.id(), type_id)))
            .collect()
    }

    // --- Lifecycle ---------------------------------------------------------

    /// Move an entity forward one stage at a time up to `target`, delivering
    /// each stage to all of its units before the next stage begins
    pub(crate) fn advance_entity(&mut self, id: EntityId, target: LifecycleStage) {
        loop {
            let Some(entity) = self.entity_mut(id) else {
                return;
            };
            let current = entity.stage();
            if current >= target {
                return;
            }
            let Some(next) = current.next() else {
                return;
            };
            entity.set_stage(next);
            for type_id in self.unit_ids(id) {
                self.advance_unit(id, type_id, next);
            }
        }
    }

    /// Deliver every stage a unit missed up to `target`, once each
    pub(crate) fn advance_unit(&mut self, id: EntityId, type_id: TypeId, target: LifecycleStage) {
        loop {
            let Some(slot) = self.entity_mut(id).and_then(|e| e.slot_mut(type_id)) else {
                return;
            };
            if slot.stage >= target || slot.unit.is_none() {
                return;
            }
            let Some(next) = slot.stage.next() else {
                return;
            };
            slot.stage = next;
            self.with_unit(id, type_id, |unit, ctx| match next {
                LifecycleStage::Created => unit.on_create(ctx),
                LifecycleStage::CreatedLate => unit.on_create_late(ctx),
                LifecycleStage::Started => unit.on_start(ctx),
                LifecycleStage::LateStarted => unit.on_late_start(ctx),
                LifecycleStage::Unregistered | LifecycleStage::Destroyed => {}
            });
        }
    }

    /// Deliver `on_destroy` to a created unit that has not been destroyed yet
    fn destroy_unit(&mut self, id: EntityId, type_id: TypeId) {
        let Some(slot) = self.entity_mut(id).and_then(|e| e.slot_mut(type_id)) else {
            return;
        };
        if slot.stage < LifecycleStage::Created || slot.stage == LifecycleStage::Destroyed {
            slot.stage = LifecycleStage::Destroyed;
            return;
        }
        slot.stage = LifecycleStage::Destroyed;
        self.with_unit(id, type_id, |unit, ctx| unit.on_destroy(ctx));
    }

    /// Fan out `on_start` to every entity
    pub fn on_start(&mut self) {
        self.started = true;
        for id in self.entity_ids() {
            self.advance_entity(id, LifecycleStage::Started);
        }
    }

    /// Fan out `on_late_start` to every entity
    pub fn on_late_start(&mut self) {
        for id in self.entity_ids() {
            self.advance_entity(id, LifecycleStage::LateStarted);
        }
    }

    /// `on_start` followed by `on_late_start`
    pub fn start(&mut self) {
        self.on_start();
        self.on_late_start();
    }

    /// Fan out `on_update` to active entities
    pub fn on_update(&mut self, delta_time: f32) {
        for (id, type_id) in self.active_units() {
            self.with_unit(id, type_id, |unit, ctx| unit.on_update(ctx, delta_time));
        }
    }

    /// Fan out `on_fixed_update` to active entities
    pub fn on_fixed_update(&mut self, fixed_delta_time: f32) {
        for (id, type_id) in self.active_units() {
            self.with_unit(id, type_id, |unit, ctx| unit.on_fixed_update(ctx, fixed_delta_time));
        }
    }

    /// Fan out `on_late_update` to active entities
    pub fn on_late_update(&mut self, delta_time: f32) {
        for (id, type_id) in self.active_units() {
            self.with_unit(id, type_id, |unit, ctx| unit.on_late_update(ctx, delta_time));
        }
    }

    /// Maintenance pass: flush queued behavior and placeholder removals, then
    /// destroy every entity marked for destruction
    pub fn on_update_internal(&mut self) {
        for id in self.entity_ids() {
            let removals = self
                .entity_mut(id)
                .map(Entity::take_pending_unit_removals)
                .unwrap_or_default();
            for type_id in removals {
                self.destroy_unit(id, type_id);
                if let Some(entity) = self.entity_mut(id) {
                    if let Some(slot) = entity.remove_slot(type_id) {
                        trace!("Removed behavior '{}' from {}", slot.type_name, id);
                    }
                }
            }
            if let Some(entity) = self.entity_mut(id) {
                entity.flush_missing_removals();
            }
        }

        // Destroy hooks may mark more entities; keep sweeping until settled
        loop {
            let pending = std::mem::take(&mut self.pending_destroy);
            if pending.is_empty() {
                break;
            }
            self.pending_destroy_set.clear();
            for id in pending {
                self.destroy_now(id);
            }
        }
    }

    /// Run one frame: world transforms, fixed steps, update, late update,
    /// maintenance
    pub fn tick(&mut self, delta_time: f32) {
        self.time.delta = delta_time;
        self.time.elapsed += f64::from(delta_time);
        self.time.frame += 1;

        self.update_world_transforms();

        let steps = self.fixed_step.advance(delta_time);
        let step = self.fixed_step.step();
        for _ in 0..steps {
            self.on_fixed_update(step);
        }

        self.on_update(delta_time);
        self.on_late_update(delta_time);
        self.on_update_internal();
    }

    // --- Destruction -------------------------------------------------------

    /// Mark an entity for destruction in the next maintenance pass.
    ///
    /// Returns false if it is unknown, already marked or already destroyed.
    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        let Some(entity) = self.entity_mut(id) else {
            debug!("Ignoring removal of {}: not live", id);
            return false;
        };
        if entity.is_pending_destroy() {
            return false;
        }
        entity.set_flag(EntityFlags::PENDING_DESTROY, true);
        if self.pending_destroy_set.insert(id) {
            self.pending_destroy.push(id);
        }
        true
    }

    /// Editor-style delete.
    ///
    /// With `delete_self` false and a behavior selected on the entity, only
    /// that behavior is removed. Otherwise the entity is detached, its
    /// children are deleted first and the entity itself is marked.
    pub fn delete_entity(&mut self, id: EntityId, delete_self: bool) -> bool {
        let Some(entity) = self.entity(id) else {
            return false;
        };
        if entity.is_pending_destroy() {
            return false;
        }

        if !delete_self {
            match entity.selected_behavior().cloned() {
                Some(BehaviorSelection::Unit(type_id)) => return self.remove_behavior_by_type_id(id, type_id),
                Some(BehaviorSelection::Missing(type_name)) => return self.remove_missing_behavior(id, &type_name),
                None => {}
            }
        }

        self.detach(id);
        for child in self.children_of(id) {
            self.delete_entity(child, true);
        }
        self.remove_entity(id)
    }

    /// Destroy every entity now, running `on_destroy`
    pub fn clear(&mut self) {
        for id in self.entity_ids() {
            self.remove_entity(id);
        }
        self.on_update_internal();
    }

    fn destroy_now(&mut self, id: EntityId) {
        let Some(entity) = self.entity_mut(id) else {
            return;
        };
        let created = entity.stage() >= LifecycleStage::Created;
        entity.set_stage(LifecycleStage::Destroyed);
        if created {
            for type_id in self.unit_ids(id) {
                self.destroy_unit(id, type_id);
            }
        }

        let Some(entity) = self.entity_mut(id) else {
            return;
        };
        entity.set_flag(EntityFlags::PENDING_DESTROY, false);
        entity.set_flag(EntityFlags::DESTROYED, true);
        let parent = entity.transform().parent();
        let children = entity.transform().children().to_vec();

        if let Some(parent) = parent.and_then(|p| self.entity_mut(p)) {
            parent.transform_mut().remove_child(id);
        }
        for child in children {
            if let Some(child) = self.entity_mut(child) {
                let world = *child.transform().world();
                child.transform_mut().set_parent_link(None);
                child.transform_mut().set_local_pose(world);
                warn!("Entity {} orphaned by destruction of {}; promoted to root", child.id(), id);
            }
        }

        if let Some(slot) = self.index.remove(&id) {
            self.entities.remove(slot);
        }
        debug!("Destroyed entity {}", id);
    }

    // --- Queries -----------------------------------------------------------

    /// First unit of type `T` in id order, with its owner
    pub fn find_first_of_type<T: Behavior>(&self) -> Option<(EntityId, &T)> {
        self.iter()
            .find_map(|entity| entity.get_behavior::<T>().map(|unit| (entity.id(), unit)))
    }

    /// Every unit of type `T` in id order, with its owner
    pub fn find_all_of_type<T: Behavior>(&self) -> Vec<(EntityId, &T)> {
        self.iter()
            .filter_map(|entity| entity.get_behavior::<T>().map(|unit| (entity.id(), unit)))
            .collect()
    }

    /// First entity with this exact name
    pub fn find_by_name(&self, name: &str) -> Option<EntityId> {
        self.iter().find(|e| e.name() == name).map(Entity::id)
    }

    /// Every entity carrying `tag`
    pub fn find_all_with_tag(&self, tag: &str) -> Vec<EntityId> {
        self.iter().filter(|e| e.tag() == tag).map(Entity::id).collect()
    }

    // --- Collaborators -----------------------------------------------------

    /// Let every active entity's behaviors push render requests
    pub fn render(&self, uniforms: &UniformData, sink: &mut dyn RenderSink) {
        for entity in self.iter().filter(|e| e.is_active()) {
            let view = RenderView {
                entity: entity.id(),
                world: entity.transform().world().to_matrix(),
            };
            for (_, unit) in entity.behaviors() {
                unit.on_render(&view, uniforms, sink);
            }
        }
    }

    /// Deliver a physics contact to both participants
    pub fn dispatch_contact(&mut self, event: ContactEvent) {
        let targets: Vec<_> = [(event.a, event.b), (event.b, event.a)]
            .into_iter()
            .map(|(me, other)| (me, other, self.unit_ids(me)))
            .collect();
        for (me, other, type_ids) in targets {
            if !self.contains(me) {
                continue;
            }
            for type_id in type_ids {
                self.with_unit(me, type_id, |unit, ctx| match event.kind {
                    ContactKind::TriggerEnter => unit.on_trigger_enter(ctx, other),
                    ContactKind::TriggerExit => unit.on_trigger_exit(ctx, other),
                    ContactKind::CollisionEnter => unit.on_collision_enter(ctx, other),
                    ContactKind::CollisionExit => unit.on_collision_exit(ctx, other),
                });
            }
        }
    }
}

impl fmt::Debug for SceneIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneIndex")
            .field("entities", &self.len())
            .field("next_id", &self.next_id)
            .field("pending_destroy", &self.pending_destroy)
            .field("physics_world", &self.physics_world)
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}
