use glam::Vec3;

use super::background::{build_color_background, build_sky_background, BackgroundKind};
use crate::errors::Result;
use crate::renderer::scene::{RenderScene, Shader, ShaderKey};
use crate::renderer::shader_graph::{PrincipledBsdf, ShaderGraph, ShaderNode};

pub const DEFAULT_SURFACE: &str = "default_surface";
pub const LIGHT: &str = "light";
pub const LIGHT_DISABLED: &str = "light_disabled";
pub const BACKGROUND_COLOR: &str = "background_color";
pub const BACKGROUND_SKY: &str = "background_sky";

/// Shared shaders every scene starts with.
///
/// Built once per [`RenderScene`] by [`ShaderRegistry::install`], so two
/// scenes never share (or clobber) each other's entries.
#[derive(Debug, Clone)]
pub struct ShaderRegistry {
    default_surface: ShaderKey,
    light: ShaderKey,
    light_disabled: ShaderKey,
    background_color: ShaderKey,
    background_sky: ShaderKey,
}

fn emission_graph(strength: f32) -> Result<ShaderGraph> {
    let mut graph = ShaderGraph::new();
    let emission = graph.add(ShaderNode::Emission {
        color: Vec3::ONE,
        strength,
    });
    graph.connect_surface(emission, "Emission")?;
    Ok(graph)
}

fn default_surface_graph() -> Result<ShaderGraph> {
    let mut graph = ShaderGraph::new();
    let color = graph.add(ShaderNode::Color { value: Vec3::ONE });
    let bsdf = graph.add(ShaderNode::PrincipledBsdf(PrincipledBsdf::default()));
    graph.connect(color, "Color", bsdf, "Base Color")?;
    graph.connect_surface(bsdf, "BSDF")?;
    Ok(graph)
}

impl ShaderRegistry {
    /// Builds the shared shaders into `scene` and makes the colour background
    /// (black) the default background.
    pub fn install(scene: &mut RenderScene) -> Result<Self> {
        let mut add = |name: &str, graph: ShaderGraph| scene.add_shader(Shader::new(name, graph));

        let default_surface = add(DEFAULT_SURFACE, default_surface_graph()?);
        let light = add(LIGHT, emission_graph(1.0)?);
        let light_disabled = add(LIGHT_DISABLED, emission_graph(0.0)?);
        let background_color = add(BACKGROUND_COLOR, build_color_background(Vec3::ZERO)?);
        let background_sky = add(BACKGROUND_SKY, build_sky_background(Vec3::Y)?);

        scene.set_default_background(Some(background_color));
        log::debug!("Installed shared shaders into scene");

        Ok(Self {
            default_surface,
            light,
            light_disabled,
            background_color,
            background_sky,
        })
    }

    #[must_use]
    pub fn default_surface(&self) -> ShaderKey {
        self.default_surface
    }

    /// Emission shader for a light, by visibility.
    #[must_use]
    pub fn light(&self, visible: bool) -> ShaderKey {
        if visible {
            self.light
        } else {
            self.light_disabled
        }
    }

    #[must_use]
    pub fn background(&self, kind: BackgroundKind) -> ShaderKey {
        match kind {
            BackgroundKind::Color => self.background_color,
            BackgroundKind::Sky => self.background_sky,
        }
    }
}
