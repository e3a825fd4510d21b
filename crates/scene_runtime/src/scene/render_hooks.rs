//! Render pull surface
//!
//! The runtime does not render. Once per frame the embedding renderer calls
//! [`SceneIndex::render`](crate::scene::SceneIndex::render), which hands every
//! active entity's behaviors the camera uniforms and a sink to push requests
//! into.

use crate::ecs::EntityId;
use crate::foundation::math::{Mat4, Vec3};

/// Camera-relative per-frame uniforms
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformData {
    /// View matrix
    pub view: Mat4,
    /// Projection matrix
    pub projection: Mat4,
    /// Camera position in world space
    pub camera_position: Vec3,
    /// Seconds since the scene started
    pub time: f32,
}

impl Default for UniformData {
    fn default() -> Self {
        Self {
            view: Mat4::identity(),
            projection: Mat4::identity(),
            camera_position: Vec3::zeros(),
            time: 0.0,
        }
    }
}

/// What a behavior sees of its owner while rendering
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderView {
    /// Owning entity
    pub entity: EntityId,
    /// Owner's world matrix
    pub world: Mat4,
}

/// One draw submitted by a behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    /// Submitting entity
    pub entity: EntityId,
    /// Mesh resource id
    pub mesh: String,
    /// Material resource id
    pub material: String,
    /// Model matrix
    pub transform: Mat4,
}

/// Receiver of render requests, implemented by the renderer
pub trait RenderSink {
    /// Queue a draw for this frame
    fn submit(&mut self, request: RenderRequest);
}

impl RenderSink for Vec<RenderRequest> {
    fn submit(&mut self, request: RenderRequest) {
        self.push(request);
    }
}
