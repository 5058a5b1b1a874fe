//! Scene graph and material model over an external path-tracing renderer.
//!
//! The host describes its world as nodes with ids and transforms, flat PBR
//! materials, indexed meshes, encoded textures and photometric lights. This
//! crate mirrors that model into the renderer's native scene:
//!
//! - [`scene`]: node hierarchy, transform propagation, visibility, lights,
//!   material/texture registries and garbage collection
//! - [`shader`]: shader graphs for the PBR/depth/normal/albedo variants,
//!   backgrounds and the shared per-scene shaders
//! - [`mesh`]: triangle assembly, normals, UVs and tangents
//! - [`renderer`]: the renderer's interface boundary (scene container,
//!   shader graphs, sessions, output and display)
//! - [`engine`], [`interactive`], [`offline`]: the host-facing facade

pub mod config;
pub mod engine;
pub mod errors;
pub mod interactive;
pub mod logging;
pub mod mesh;
pub mod offline;
pub mod renderer;
pub mod scene;
pub mod shader;

pub use config::EngineConfig;
pub use engine::{CameraParams, CameraState, CameraType, Engine};
pub use errors::{Result, SceneError};
pub use interactive::InteractiveRenderer;
pub use mesh::MeshDesc;
pub use offline::OfflineRenderer;
pub use renderer::{HeadlessSession, RenderScene, Session};
pub use scene::{
    GcReport, LightDesc, LightKind, MaterialKey, NodeKey, ObjectId, SceneGraph, SceneNode,
};
pub use shader::{BackgroundSettings, MaterialDesc, RenderMode, TextureTransform};
