//! Scene error types

use crate::config::ConfigError;
use crate::ecs::EntityId;

/// Errors surfaced by structural and persistence operations
#[derive(thiserror::Error, Debug)]
pub enum SceneError {
    /// No live entity has this id
    #[error("Unknown entity {0}")]
    UnknownEntity(EntityId),

    /// The entity has been destroyed or is about to be
    #[error("Entity {0} is destroyed")]
    EntityDestroyed(EntityId),

    /// An entity cannot be its own parent
    #[error("Entity {0} cannot be parented to itself")]
    SelfParent(EntityId),

    /// The requested parent is a descendant of the child
    #[error("Parenting {child} under {parent} would create a cycle")]
    HierarchyCycle {
        /// Entity being reparented
        child: EntityId,
        /// Requested parent
        parent: EntityId,
    },

    /// The entity already carries a behavior of this type
    #[error("Entity already has a '{0}' behavior")]
    DuplicateBehavior(String),

    /// No resource with this id is cataloged
    #[error("Unknown resource '{0}'")]
    UnknownResource(String),

    /// The document root is not a scene or template
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result alias for scene operations
pub type SceneResult<T> = Result<T, SceneError>;
