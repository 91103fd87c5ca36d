//! Error type for the physics integration layer.
//!
//! Only configuration mistakes are errors. Lifecycle races (double frees after a world teardown)
//! and lookups of handles nobody subscribed to are expected traffic and never surface here.

use thiserror::Error;

use crate::scene::NodeId;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PhysicsError {
    /// A body type string did not name one of the supported body kinds.
    #[error("unsupported body type `{0}`")]
    UnsupportedBodyType(String),

    /// Shape scale must be finite and non-zero on every axis.
    #[error("shape scale must be finite and non-zero, got [{0}, {1}, {2}]")]
    InvalidScale(f32, f32, f32),

    /// Shape arguments could not produce a collision shape.
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// The world has not been initialized yet (or was shut down).
    #[error("physics world is not initialized")]
    NotReady,

    /// A scene node was referenced after removal, or never existed.
    #[error("unknown scene node {0:?}")]
    UnknownNode(NodeId),

    /// A rigid-body handle does not refer to a live body.
    #[error("rigid body is not live")]
    UnknownBody,

    /// Settings failed validation.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Settings file could not be parsed.
    #[error("settings parse error: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, PhysicsError>;
