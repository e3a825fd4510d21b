//! Physics collaborator surface
//!
//! The runtime does not simulate anything. It records which physics world a
//! scene belongs to and forwards contact events reported by the physics
//! engine to the behaviors of both participants.

use crate::ecs::EntityId;

/// Physics world a scene's entities live in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PhysicsWorldKind {
    /// The running simulation
    #[default]
    Simulated,
    /// Non-simulated world used by templates and editor previews
    Preview,
}

impl PhysicsWorldKind {
    /// Whether bodies in this world are stepped
    pub fn is_simulated(self) -> bool {
        matches!(self, Self::Simulated)
    }
}

/// Kind of contact transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactKind {
    /// A trigger started overlapping
    TriggerEnter,
    /// A trigger stopped overlapping
    TriggerExit,
    /// A collision began
    CollisionEnter,
    /// A collision ended
    CollisionExit,
}

/// Contact between two entities reported by the physics engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEvent {
    /// Transition
    pub kind: ContactKind,
    /// First participant
    pub a: EntityId,
    /// Second participant
    pub b: EntityId,
}

impl ContactEvent {
    /// Build an event
    pub fn new(kind: ContactKind, a: EntityId, b: EntityId) -> Self {
        Self { kind, a, b }
    }
}
