//! Scene graph layer
//!
//! Tracks the host's object model and mirrors it into the renderer scene:
//! - `SceneGraph`: node arena, id map, material and texture registries
//! - `SceneNode`: a placed node with transform, mesh and lights
//! - `Transform`: local TRS plus composed matrix
//! - `LightDesc`: photometric light parameters
//! - `clean_scene`: reachability-based garbage collection

pub mod gc;
pub mod graph;
pub mod light;
pub mod material;
pub mod node;
pub mod texture;
pub mod transform;

pub use gc::GcReport;
pub use graph::{SceneGraph, DEFAULT_MAX_DEPTH};
pub use light::{LightDesc, LightKind};
pub use material::{Material, MaterialKey};
pub use node::SceneNode;
pub use transform::Transform;

use slotmap::new_key_type;

/// Host-side node identifier.
pub type ObjectId = u64;

new_key_type! {
    /// Handle of a node in the scene graph arena.
    pub struct NodeKey;
}
