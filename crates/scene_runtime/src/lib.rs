//! # Scene Runtime
//!
//! Entity, scene-graph and behavior runtime for a real-time engine.
//!
//! ## Features
//!
//! - **Entities**: named scene objects owning a transform node and at most one
//!   behavior unit per concrete type
//! - **Hierarchy**: parent/child transforms with root-to-leaf world updates and
//!   cycle rejection
//! - **Type Registry**: behaviors constructed by name, replaceable at runtime
//!   for hot reloading
//! - **Deferred Destruction**: mark-then-sweep so behaviors can remove anything
//!   mid-update
//! - **Persistence**: JSON scenes and templates with id remapping and lossless
//!   placeholders for unknown behavior types
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_runtime::prelude::*;
//!
//! #[derive(Default)]
//! struct Spinner {
//!     speed: f32,
//! }
//!
//! impl Behavior for Spinner {
//!     fn on_update(&mut self, ctx: &mut BehaviorContext<'_>, delta_time: f32) {
//!         let spin = yaw(self.speed * delta_time);
//!         if let Some(entity) = ctx.entity_mut() {
//!             entity.transform_mut().rotate(spin);
//!         }
//!     }
//! }
//!
//! fn main() -> Result<(), SceneError> {
//!     let registry = TypeRegistry::new();
//!     registry.register::<Spinner>();
//!
//!     let mut scene = SceneIndex::new(registry, ResourceCatalog::new());
//!     let cube = scene.create_entity("Cube");
//!     scene.add_behavior::<Spinner>(cube)?.speed = 1.5;
//!
//!     scene.start();
//!     scene.tick(1.0 / 60.0);
//!     scene.save_to_file("level.json")?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod ecs;
pub mod scene;
pub mod assets;
pub mod physics;

/// Common imports for runtime users
pub mod prelude {
    pub use crate::{
        assets::{ResourceCatalog, ResourceHandle, ResourceKind},
        config::{Config, SceneConfig},
        ecs::{
            Behavior, BehaviorSelection, Entity, EntityId, InspectorUi, LifecycleStage,
            MissingBehaviorRecord, TransformNode, TypeRegistry,
        },
        foundation::{
            math::{utils::yaw, Pose, Quat, Vec3, Mat4},
            time::{FrameClock, Stopwatch},
        },
        physics::{ContactEvent, ContactKind, PhysicsWorldKind},
        scene::{
            BehaviorContext, RenderSink, ResolveContext, SceneError, SceneIndex, SceneResult,
            Template, UniformData,
        },
    };
}
