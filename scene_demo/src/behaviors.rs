//! Demo behaviors

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use scene_runtime::prelude::*;
use scene_runtime::scene::{merge_fields, to_record, RenderRequest, RenderView};

/// Spins its entity around the vertical axis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spinner {
    /// Radians per second
    pub speed: f32,
}

impl Default for Spinner {
    fn default() -> Self {
        Self { speed: 1.0 }
    }
}

impl Behavior for Spinner {
    fn on_update(&mut self, ctx: &mut BehaviorContext<'_>, delta_time: f32) {
        let spin = yaw(self.speed * delta_time);
        if let Some(entity) = ctx.entity_mut() {
            entity.transform_mut().rotate(spin);
        }
    }

    fn serialize(&self) -> Map<String, Value> {
        to_record(self)
    }

    fn deserialize(&mut self, data: &Map<String, Value>, _resolve: &ResolveContext) {
        merge_fields(self, data);
    }

    fn render_inspector(&mut self, ui: &mut dyn InspectorUi) {
        ui.drag_float("speed", &mut self.speed);
    }
}

/// Copies a target's world position each late update
#[derive(Debug, Default)]
pub struct Tracker {
    /// Entity to follow
    pub target: Option<EntityId>,
    /// Offset from the target's world position
    pub offset: Vec3,
}

impl Behavior for Tracker {
    fn on_late_update(&mut self, ctx: &mut BehaviorContext<'_>, _delta_time: f32) {
        let Some(target) = self.target else {
            return;
        };
        let Some(position) = ctx.scene().world_matrix(target).map(|m| Pose::from_matrix(&m).position) else {
            log::warn!("Tracker on {} lost its target {}", ctx.owner(), target);
            self.target = None;
            return;
        };
        if let Err(e) = ctx.set_local_position(position + self.offset) {
            log::warn!("Tracker could not move {}: {}", ctx.owner(), e);
        }
    }

    fn serialize(&self) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert("target".into(), Value::from(self.target.map_or(0, EntityId::raw)));
        data.insert(
            "offset".into(),
            Value::from(vec![self.offset.x, self.offset.y, self.offset.z]),
        );
        data
    }

    fn deserialize(&mut self, data: &Map<String, Value>, resolve: &ResolveContext) {
        if let Some(target) = data.get("target") {
            self.target = resolve.entity_from_value(target);
        }
        if let Some(offset) = data.get("offset").and_then(Value::as_array) {
            if let [x, y, z] = offset.as_slice() {
                if let (Some(x), Some(y), Some(z)) = (x.as_f64(), y.as_f64(), z.as_f64()) {
                    self.offset = Vec3::new(x as f32, y as f32, z as f32);
                }
            }
        }
    }
}

/// Removes its entity once its lifetime runs out
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lifetime {
    /// Seconds left
    pub remaining: f32,
}

impl Behavior for Lifetime {
    fn on_fixed_update(&mut self, ctx: &mut BehaviorContext<'_>, fixed_delta_time: f32) {
        if self.remaining <= 0.0 {
            return;
        }
        self.remaining -= fixed_delta_time;
        if self.remaining <= 0.0 {
            let owner = ctx.owner();
            log::info!("Lifetime of {} expired", owner);
            ctx.remove_entity(owner);
        }
    }

    fn on_destroy(&mut self, ctx: &mut BehaviorContext<'_>) {
        log::debug!("{} destroyed", ctx.owner());
    }

    fn serialize(&self) -> Map<String, Value> {
        to_record(self)
    }

    fn deserialize(&mut self, data: &Map<String, Value>, _resolve: &ResolveContext) {
        merge_fields(self, data);
    }
}

/// Draws a mesh at the entity's world transform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    /// Mesh resource id
    pub mesh: String,
    /// Material resource id
    pub material: String,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            mesh: "sphere".into(),
            material: "default".into(),
        }
    }
}

impl Behavior for Model {
    fn on_start(&mut self, ctx: &mut BehaviorContext<'_>) {
        if ctx.resources().get(&self.mesh).is_none() {
            log::warn!("{} draws unknown mesh '{}'", ctx.owner(), self.mesh);
        }
    }

    fn on_render(&self, view: &RenderView, _uniforms: &UniformData, sink: &mut dyn RenderSink) {
        sink.submit(RenderRequest {
            entity: view.entity,
            mesh: self.mesh.clone(),
            material: self.material.clone(),
            transform: view.world,
        });
    }

    fn serialize(&self) -> Map<String, Value> {
        to_record(self)
    }

    fn deserialize(&mut self, data: &Map<String, Value>, _resolve: &ResolveContext) {
        merge_fields(self, data);
    }
}

/// Register every demo behavior
pub fn register_all(registry: &TypeRegistry) {
    registry.register::<Spinner>();
    registry.register::<Tracker>();
    registry.register::<Lifetime>();
    registry.register::<Model>();
}
