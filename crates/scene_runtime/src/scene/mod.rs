//! Scene management
//!
//! ## Architecture
//!
//! ```text
//! SceneIndex (ids, fan-outs, deferred destruction)
//!      ↓
//! Entity (transform node + behavior units)
//!      ↓
//! Behavior (user logic, sees the scene through BehaviorContext)
//! ```
//!
//! The scene index:
//! - Assigns monotonically increasing ids and disambiguates root-level names
//! - Fans out lifecycle and per-frame calls in id order
//! - Defers every destruction to its maintenance pass
//! - Loads and saves scenes, and instantiates templates, with id remapping

mod scene_index;
mod hierarchy;
mod error;
pub mod context;
pub mod persistence;
pub mod render_hooks;
pub mod template;

#[cfg(test)]
mod tests;

pub use scene_index::SceneIndex;
pub use error::{SceneError, SceneResult};
pub use context::BehaviorContext;
pub use persistence::{merge_fields, to_record, ResolveContext};
pub use render_hooks::{RenderRequest, RenderSink, RenderView, UniformData};
pub use template::Template;
