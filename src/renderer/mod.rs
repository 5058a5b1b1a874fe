//! The path-tracing renderer's interface boundary.
//!
//! The renderer itself (integration loop, devices, display drawing) lives
//! outside this crate. This module models the surface the scene layer
//! talks to:
//!
//! - [`scene::RenderScene`]: the renderer-owned object/light/shader/geometry/image arenas
//! - [`shader_graph::ShaderGraph`]: typed shader node graphs
//! - [`session::Session`]: render session lifecycle and progress
//! - [`output::OutputDriver`]: finished-frame sink, with a file writer
//! - [`display::ContextLock`]: graphics-context locking for interactive draws
//! - [`headless::HeadlessSession`]: a session that renders nothing

pub mod display;
pub mod headless;
pub mod output;
pub mod scene;
pub mod session;
pub mod shader_graph;
pub mod version_tracker;

pub use display::{ContextGuard, ContextLock, GraphicsContext};
pub use headless::{HeadlessSession, SessionEvent};
pub use output::{FileOutputDriver, FileOutputSettings, OutputDriver, RenderTile};
pub use scene::{
    Camera, CameraKind, Geometry, GeometryKey, ImageKey, ImageParams, ImageResource, Light,
    LightKey, LightType, Object, ObjectKey, PassType, RayVisibility, RenderScene, Shader,
    ShaderKey, TransformId,
};
pub use session::{BufferParams, DrawParams, Progress, ProgressCallback, Session, SessionParams};
pub use shader_graph::{GraphNodeId, ShaderGraph, ShaderNode};
