//! Shader graph builders.
//!
//! Turns flat material, background and light parameters into renderer
//! [`ShaderGraph`](crate::renderer::ShaderGraph)s.

pub mod background;
pub mod material;
pub mod registry;
pub mod texture;

pub use background::{BackgroundKind, BackgroundSettings};
pub use material::{
    build_variants, MaterialDesc, MaterialDescBuilder, RenderMode, ShaderVariants,
    VolumeAttenuation, MAX_DEPTH_NODE,
};
pub use registry::ShaderRegistry;
pub use texture::{TextureBinding, TextureTransform};
