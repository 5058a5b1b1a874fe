//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! The main error type [`SceneError`] covers every failure a host call can
//! report:
//! - Invalid references (unknown node, material, mesh, light or texture)
//! - Malformed input (mesh buffers, light type codes, shader sockets)
//! - Resource failures (image decoding, file I/O, configuration parsing)
//! - Session and graphics-context failures
//!
//! Numeric degeneracies (zero-length basis vectors, near-identity rotations,
//! degenerate UV triangles) are never errors; they are substituted with safe
//! defaults at the point where they occur.
//!
//! # Usage
//!
//! All fallible APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, SceneError>`.
//!
//! ```rust,ignore
//! use pathscene::errors::{Result, SceneError};
//!
//! fn lookup() -> Result<()> {
//!     Err(SceneError::NodeNotFound)
//! }
//! ```

use thiserror::Error;

/// The main error type for the crate.
#[derive(Error, Debug)]
pub enum SceneError {
    // ========================================================================
    // Invalid References
    // ========================================================================
    /// The node handle does not refer to a live node.
    #[error("Node not found")]
    NodeNotFound,

    /// The material handle does not refer to a tracked material.
    #[error("Material not found")]
    MaterialNotFound,

    /// The mesh handle does not refer to live renderer geometry.
    #[error("Mesh not found")]
    MeshNotFound,

    /// The light handle does not refer to a live renderer light.
    #[error("Light not found")]
    LightNotFound,

    /// The light exists but is not attached to the given node.
    #[error("Light is not attached to this node")]
    LightNotOnNode,

    /// The texture handle does not refer to a tracked image.
    #[error("Texture not found")]
    TextureNotFound,

    // ========================================================================
    // Malformed Input
    // ========================================================================
    /// The host passed a light type code outside the known set.
    #[error("Unknown light type code: {0}")]
    UnknownLightType(i32),

    /// Vertex or index buffers are inconsistent.
    #[error("Invalid mesh data: {0}")]
    InvalidMeshData(String),

    /// A shader graph connection named a socket the node does not have.
    #[error("Unknown socket '{socket}' on shader node '{node}'")]
    UnknownSocket {
        /// Node kind the socket was looked up on
        node: &'static str,
        /// The requested socket name
        socket: String,
    },

    // ========================================================================
    // Resource Errors
    // ========================================================================
    /// Encoded texture bytes could not be decoded.
    #[error("Image decode error: {0}")]
    ImageDecode(String),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parsing error.
    #[error("Config parse error: {0}")]
    Config(#[from] serde_json::Error),

    // ========================================================================
    // Session & Context Errors
    // ========================================================================
    /// The operation needs an initialised session.
    #[error("Session is not initialized")]
    SessionNotInitialized,

    /// The graphics context could not be made current.
    #[error("Graphics context error: {0}")]
    GraphicsContext(String),
}

impl From<image::ImageError> for SceneError {
    fn from(err: image::ImageError) -> Self {
        SceneError::ImageDecode(err.to_string())
    }
}

/// Alias for `Result<T, SceneError>`.
pub type Result<T> = std::result::Result<T, SceneError>;
