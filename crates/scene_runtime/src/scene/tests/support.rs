//! Shared test behaviors and the lifecycle journal

use std::cell::RefCell;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::prelude::*;
use crate::scene::{merge_fields, to_record, RenderRequest, RenderView};

thread_local! {
    static JOURNAL: RefCell<Vec<String>> = RefCell::new(Vec::new());
}

/// Append an entry to this thread's journal
pub fn record(entry: String) {
    JOURNAL.with(|journal| journal.borrow_mut().push(entry));
}

/// Drain this thread's journal
pub fn take_journal() -> Vec<String> {
    JOURNAL.with(|journal| std::mem::take(&mut *journal.borrow_mut()))
}

/// Journal entries for one entity and label, hook names only
pub fn hooks_of(journal: &[String], prefix: &str) -> Vec<String> {
    let prefix = format!("{prefix}:");
    journal
        .iter()
        .filter_map(|entry| entry.strip_prefix(&prefix).map(str::to_string))
        .collect()
}

fn note(ctx: &BehaviorContext<'_>, label: &str, hook: &str) {
    let name = ctx.entity().map(|e| e.name().to_string()).unwrap_or_default();
    record(format!("{name}/{label}:{hook}"));
}

macro_rules! recorder {
    ($name:ident, $label:literal) => {
        /// Records every lifecycle hook it receives
        #[derive(Default)]
        pub struct $name;

        impl Behavior for $name {
            fn on_create(&mut self, ctx: &mut BehaviorContext<'_>) {
                note(ctx, $label, "create");
            }

            fn on_create_late(&mut self, ctx: &mut BehaviorContext<'_>) {
                note(ctx, $label, "create_late");
            }

            fn on_start(&mut self, ctx: &mut BehaviorContext<'_>) {
                note(ctx, $label, "start");
            }

            fn on_late_start(&mut self, ctx: &mut BehaviorContext<'_>) {
                note(ctx, $label, "late_start");
            }

            fn on_update(&mut self, ctx: &mut BehaviorContext<'_>, _delta_time: f32) {
                note(ctx, $label, "update");
            }

            fn on_destroy(&mut self, ctx: &mut BehaviorContext<'_>) {
                note(ctx, $label, "destroy");
            }
        }
    };
}

recorder!(Probe, "probe");
recorder!(Echo, "echo");

/// Marks its own entity for destruction on its first update
#[derive(Default)]
pub struct SelfDestruct;

impl Behavior for SelfDestruct {
    fn on_update(&mut self, ctx: &mut BehaviorContext<'_>, _delta_time: f32) {
        let owner = ctx.owner();
        ctx.remove_entity(owner);
        note(ctx, "self_destruct", "update");
    }
}

/// Queues its own removal on update
#[derive(Default)]
pub struct Remover;

impl Behavior for Remover {
    fn on_update(&mut self, ctx: &mut BehaviorContext<'_>, _delta_time: f32) {
        ctx.remove_behavior::<Self>();
        note(ctx, "remover", "update");
    }

    fn on_destroy(&mut self, ctx: &mut BehaviorContext<'_>) {
        note(ctx, "remover", "destroy");
    }
}

/// Counts per-frame calls; persisted through serde
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Counter {
    pub updates: u32,
    pub fixed_updates: u32,
    pub late_updates: u32,
}

impl Behavior for Counter {
    fn on_update(&mut self, _ctx: &mut BehaviorContext<'_>, _delta_time: f32) {
        self.updates += 1;
    }

    fn on_fixed_update(&mut self, _ctx: &mut BehaviorContext<'_>, _fixed_delta_time: f32) {
        self.fixed_updates += 1;
    }

    fn on_late_update(&mut self, _ctx: &mut BehaviorContext<'_>, _delta_time: f32) {
        self.late_updates += 1;
    }

    fn serialize(&self) -> Map<String, Value> {
        to_record(self)
    }

    fn deserialize(&mut self, data: &Map<String, Value>, _resolve: &ResolveContext) {
        merge_fields(self, data);
    }
}

/// Remembers the previous scales it was notified about
#[derive(Default)]
pub struct Sizer {
    pub previous: Vec<Vec3>,
}

impl Behavior for Sizer {
    fn on_rescale(&mut self, _ctx: &mut BehaviorContext<'_>, previous_scale: Vec3) {
        self.previous.push(previous_scale);
    }
}

/// Holds a reference to another entity
#[derive(Default)]
pub struct Follower {
    pub target: Option<EntityId>,
}

impl Behavior for Follower {
    fn serialize(&self) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert("target".into(), Value::from(self.target.map_or(0, EntityId::raw)));
        data
    }

    fn deserialize(&mut self, data: &Map<String, Value>, resolve: &ResolveContext) {
        if let Some(target) = data.get("target") {
            self.target = resolve.entity_from_value(target);
        }
    }
}

/// Submits one render request per frame
pub struct Painter {
    pub mesh: String,
}

impl Default for Painter {
    fn default() -> Self {
        Self { mesh: "cube".into() }
    }
}

impl Behavior for Painter {
    fn on_render(&self, view: &RenderView, _uniforms: &UniformData, sink: &mut dyn RenderSink) {
        sink.submit(RenderRequest {
            entity: view.entity,
            mesh: self.mesh.clone(),
            material: "default".into(),
            transform: view.world,
        });
    }
}

/// Records contact callbacks
#[derive(Default)]
pub struct Toucher;

impl Behavior for Toucher {
    fn on_trigger_enter(&mut self, ctx: &mut BehaviorContext<'_>, other: EntityId) {
        note(ctx, "touch", &format!("trigger_enter {other}"));
    }

    fn on_trigger_exit(&mut self, ctx: &mut BehaviorContext<'_>, other: EntityId) {
        note(ctx, "touch", &format!("trigger_exit {other}"));
    }

    fn on_collision_enter(&mut self, ctx: &mut BehaviorContext<'_>, other: EntityId) {
        note(ctx, "touch", &format!("collision_enter {other}"));
    }

    fn on_collision_exit(&mut self, ctx: &mut BehaviorContext<'_>, other: EntityId) {
        note(ctx, "touch", &format!("collision_exit {other}"));
    }
}

/// Creates an entity and attaches an `Echo` to its owner during update
#[derive(Default)]
pub struct Spawner {
    pub spawned: Vec<EntityId>,
}

impl Behavior for Spawner {
    fn on_update(&mut self, ctx: &mut BehaviorContext<'_>, _delta_time: f32) {
        let id = ctx.create_entity("Spawned");
        self.spawned.push(id);
        if ctx.get_behavior::<Echo>().is_none() {
            ctx.add_behavior::<Echo>().ok();
        }
    }
}

/// Attaches a `Counter` to another entity during update
#[derive(Default)]
pub struct Recruiter {
    pub target: Option<EntityId>,
}

impl Behavior for Recruiter {
    fn on_update(&mut self, ctx: &mut BehaviorContext<'_>, _delta_time: f32) {
        if let Some(target) = self.target.take() {
            ctx.add_behavior_to::<Counter>(target).ok();
        }
    }
}

/// Registry with every test behavior
pub fn test_registry() -> TypeRegistry {
    crate::foundation::logging::init_for_tests();
    let registry = TypeRegistry::new();
    registry.register::<Probe>();
    registry.register::<Echo>();
    registry.register::<SelfDestruct>();
    registry.register::<Remover>();
    registry.register::<Counter>();
    registry.register::<Sizer>();
    registry.register::<Follower>();
    registry.register::<Painter>();
    registry.register::<Toucher>();
    registry.register::<Spawner>();
    registry.register::<Recruiter>();
    registry
}

/// Empty scene over [`test_registry`]
pub fn test_scene() -> SceneIndex {
    SceneIndex::new(test_registry(), ResourceCatalog::new())
}
