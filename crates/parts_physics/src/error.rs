//! Error types for the physics world

use parts_core::EntityId;
use thiserror::Error;

/// Physics world errors
#[derive(Debug, Error)]
pub enum PhysicsError {
    /// Entity not registered in the world
    #[error("Entity has no collider: {0}")]
    EntityNotFound(EntityId),

    /// Entity registered twice
    #[error("Entity already has a collider: {0}")]
    DuplicateEntity(EntityId),

    /// Shape with non-positive size
    #[error("Invalid collision shape: {0}")]
    InvalidShape(String),

    /// Entity has a collider but no rigid body
    #[error("Entity has no rigid body: {0}")]
    NoBody(EntityId),
}

/// Result type for physics operations
pub type Result<T> = std::result::Result<T, PhysicsError>;
