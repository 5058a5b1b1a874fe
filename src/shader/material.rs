//! Material descriptions and the four shader variants built from them.
//!
//! A [`MaterialDesc`] is the flat PBR parameter set the host supplies. From
//! it, [`build_variants`] produces one graph per [`RenderMode`]:
//!
//! | Mode | Output |
//! |---|---|
//! | `Pbr` | principled BSDF with base colour, metallic/roughness, normal map, emission |
//! | `Depth` | camera distance, clamped by the shared max-depth constant |
//! | `Normal` | shading normal in camera space |
//! | `Albedo` | base colour only |
//!
//! Builds are pure: the same description always yields the same topology.

use glam::{Vec3, Vec4};

use super::texture::{TextureBinding, TextureTransform};
use crate::errors::Result;
use crate::renderer::scene::ImageKey;
use crate::renderer::shader_graph::{
    GraphNodeId, MathOp, NormalMapSpace, PrincipledBsdf, ShaderGraph, ShaderNode, TransformSpace,
    VectorMathOp, VectorTransformType,
};

/// Name of the clamp node patched by [`set_max_depth`].
pub const MAX_DEPTH_NODE: &str = "max_depth_node";

/// Smallest IOR handed to the BSDF.
pub const MIN_IOR: f32 = 1.00001;

const DEFAULT_SPECULAR: f32 = 0.5;

// ============================================================================
// Render modes and the per-material variant table
// ============================================================================

/// Which shader variant mesh submeshes are bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderMode {
    #[default]
    Pbr,
    Depth,
    Normal,
    Albedo,
}

impl RenderMode {
    pub const ALL: [RenderMode; 4] = [Self::Pbr, Self::Depth, Self::Normal, Self::Albedo];

    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Pbr => "pbr",
            Self::Depth => "depth",
            Self::Normal => "normal",
            Self::Albedo => "albedo",
        }
    }
}

/// One value per [`RenderMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderVariants<T> {
    pub pbr: T,
    pub depth: T,
    pub normal: T,
    pub albedo: T,
}

impl<T> ShaderVariants<T> {
    #[must_use]
    pub fn get(&self, mode: RenderMode) -> &T {
        match mode {
            RenderMode::Pbr => &self.pbr,
            RenderMode::Depth => &self.depth,
            RenderMode::Normal => &self.normal,
            RenderMode::Albedo => &self.albedo,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (RenderMode, &T)> {
        RenderMode::ALL.into_iter().map(move |m| (m, self.get(m)))
    }

    pub fn map<U>(self, mut f: impl FnMut(RenderMode, T) -> U) -> ShaderVariants<U> {
        ShaderVariants {
            pbr: f(RenderMode::Pbr, self.pbr),
            depth: f(RenderMode::Depth, self.depth),
            normal: f(RenderMode::Normal, self.normal),
            albedo: f(RenderMode::Albedo, self.albedo),
        }
    }
}

// ============================================================================
// Material description
// ============================================================================

/// Volume attenuation (KHR_materials_volume). Carried along but not wired
/// into any graph yet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeAttenuation {
    pub color: Vec3,
    pub thickness: f32,
    pub distance: f32,
}

impl Default for VolumeAttenuation {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            thickness: 0.0,
            distance: f32::INFINITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDesc {
    pub name: String,
    /// RGB base colour plus alpha.
    pub albedo_color: Vec4,
    pub albedo_texture: Option<TextureBinding>,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    /// Metallic in blue, roughness in green.
    pub metallic_roughness_texture: Option<TextureBinding>,
    pub normal_texture: Option<TextureBinding>,
    pub normal_strength: f32,
    pub emissive_factor: Vec3,
    pub emissive_strength: f32,
    pub emissive_texture: Option<TextureBinding>,
    pub transmission: f32,
    pub ior: f32,
    pub volume: VolumeAttenuation,
}

impl Default for MaterialDesc {
    fn default() -> Self {
        Self {
            name: String::new(),
            albedo_color: Vec4::ONE,
            albedo_texture: None,
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            metallic_roughness_texture: None,
            normal_texture: None,
            normal_strength: 1.0,
            emissive_factor: Vec3::ZERO,
            emissive_strength: 1.0,
            emissive_texture: None,
            transmission: 0.0,
            ior: 1.5,
            volume: VolumeAttenuation::default(),
        }
    }
}

impl MaterialDesc {
    #[must_use]
    pub fn builder(name: &str) -> MaterialDescBuilder {
        MaterialDescBuilder::new(name)
    }

    /// Every texture the description references, once each.
    #[must_use]
    pub fn used_images(&self) -> Vec<ImageKey> {
        let mut images: Vec<ImageKey> = [
            self.albedo_texture,
            self.metallic_roughness_texture,
            self.normal_texture,
            self.emissive_texture,
        ]
        .into_iter()
        .flatten()
        .map(|b| b.texture)
        .collect();
        images.sort_unstable();
        images.dedup();
        images
    }
}

/// Builder for [`MaterialDesc`].
pub struct MaterialDescBuilder {
    desc: MaterialDesc,
}

impl MaterialDescBuilder {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            desc: MaterialDesc {
                name: name.to_string(),
                ..MaterialDesc::default()
            },
        }
    }

    #[must_use]
    pub fn albedo(mut self, color: Vec4) -> Self {
        self.desc.albedo_color = color;
        self
    }

    #[must_use]
    pub fn albedo_texture(mut self, texture: ImageKey, transform: TextureTransform) -> Self {
        self.desc.albedo_texture = Some(TextureBinding::new(texture, transform));
        self
    }

    #[must_use]
    pub fn metallic(mut self, factor: f32) -> Self {
        self.desc.metallic_factor = factor;
        self
    }

    #[must_use]
    pub fn roughness(mut self, factor: f32) -> Self {
        self.desc.roughness_factor = factor;
        self
    }

    #[must_use]
    pub fn metallic_roughness_texture(mut self, texture: ImageKey, transform: TextureTransform) -> Self {
        self.desc.metallic_roughness_texture = Some(TextureBinding::new(texture, transform));
        self
    }

    #[must_use]
    pub fn normal_texture(mut self, texture: ImageKey, transform: TextureTransform, strength: f32) -> Self {
        self.desc.normal_texture = Some(TextureBinding::new(texture, transform));
        self.desc.normal_strength = strength;
        self
    }

    #[must_use]
    pub fn emissive(mut self, factor: Vec3, strength: f32) -> Self {
        self.desc.emissive_factor = factor;
        self.desc.emissive_strength = strength;
        self
    }

    #[must_use]
    pub fn emissive_texture(mut self, texture: ImageKey, transform: TextureTransform) -> Self {
        self.desc.emissive_texture = Some(TextureBinding::new(texture, transform));
        self
    }

    #[must_use]
    pub fn transmission(mut self, factor: f32) -> Self {
        self.desc.transmission = factor;
        self
    }

    #[must_use]
    pub fn ior(mut self, ior: f32) -> Self {
        self.desc.ior = ior;
        self
    }

    #[must_use]
    pub fn volume(mut self, volume: VolumeAttenuation) -> Self {
        self.desc.volume = volume;
        self
    }

    #[must_use]
    pub fn build(self) -> MaterialDesc {
        self.desc
    }
}

// ============================================================================
// Graph builders
// ============================================================================

type Output = (GraphNodeId, &'static str);

/// `Color(rgb)` or `Color(rgb) × texture`.
fn tinted_texture(
    graph: &mut ShaderGraph,
    color: Vec3,
    texture: Option<&TextureBinding>,
) -> Result<Output> {
    let color_node = graph.add(ShaderNode::Color { value: color });

    let Some(binding) = texture else {
        return Ok((color_node, "Color"));
    };

    let image = binding.add_to(graph);
    let multiply = graph.add(ShaderNode::VectorMath {
        op: VectorMathOp::Multiply,
    });
    graph.connect(color_node, "Color", multiply, "Vector1")?;
    graph.connect(image, "Color", multiply, "Vector2")?;
    Ok((multiply, "Vector"))
}

/// Tangent-space normal map node, or `None` without a normal texture.
fn normal_map(graph: &mut ShaderGraph, desc: &MaterialDesc) -> Result<Option<Output>> {
    let Some(binding) = desc.normal_texture.as_ref() else {
        return Ok(None);
    };

    let image = binding.add_to(graph);
    let map = graph.add(ShaderNode::NormalMap {
        space: NormalMapSpace::Tangent,
        strength: desc.normal_strength,
    });
    graph.connect(image, "Color", map, "Color")?;
    Ok(Some((map, "Normal")))
}

/// Builds the physically based surface variant.
pub fn build_pbr(desc: &MaterialDesc) -> Result<ShaderGraph> {
    let mut graph = ShaderGraph::new();

    let albedo = tinted_texture(
        &mut graph,
        desc.albedo_color.truncate(),
        desc.albedo_texture.as_ref(),
    )?;
    let normal = normal_map(&mut graph, desc)?;

    // Metallic and roughness
    let metallic_value = graph.add(ShaderNode::Value {
        value: desc.metallic_factor,
    });
    let roughness_value = graph.add(ShaderNode::Value {
        value: desc.roughness_factor,
    });

    let (metallic, roughness): (Output, Output) = match desc.metallic_roughness_texture.as_ref() {
        Some(binding) => {
            let image = binding.add_to(&mut graph);
            let separate = graph.add(ShaderNode::SeparateColor);
            graph.connect(image, "Color", separate, "Color")?;

            let metallic_mul = graph.add(ShaderNode::Math {
                op: MathOp::Multiply,
                value1: 0.0,
                value2: 0.0,
            });
            graph.connect(separate, "Blue", metallic_mul, "Value1")?;
            graph.connect(metallic_value, "Value", metallic_mul, "Value2")?;

            let roughness_mul = graph.add(ShaderNode::Math {
                op: MathOp::Multiply,
                value1: 0.0,
                value2: 0.0,
            });
            graph.connect(separate, "Green", roughness_mul, "Value1")?;
            graph.connect(roughness_value, "Value", roughness_mul, "Value2")?;

            ((metallic_mul, "Value"), (roughness_mul, "Value"))
        }
        None => ((metallic_value, "Value"), (roughness_value, "Value")),
    };

    let emission = tinted_texture(
        &mut graph,
        desc.emissive_factor,
        desc.emissive_texture.as_ref(),
    )?;

    let bsdf = graph.add(ShaderNode::PrincipledBsdf(PrincipledBsdf {
        transmission: desc.transmission,
        subsurface: 0.0,
        alpha: desc.albedo_color.w,
        ior: desc.ior.max(MIN_IOR),
        specular: DEFAULT_SPECULAR,
        emission_strength: desc.emissive_strength,
        ..PrincipledBsdf::default()
    }));

    graph.connect(albedo.0, albedo.1, bsdf, "Base Color")?;
    graph.connect(albedo.0, albedo.1, bsdf, "Subsurface Color")?;
    graph.connect(metallic.0, metallic.1, bsdf, "Metallic")?;
    graph.connect(roughness.0, roughness.1, bsdf, "Roughness")?;
    graph.connect(roughness.0, roughness.1, bsdf, "Transmission Roughness")?;
    graph.connect(emission.0, emission.1, bsdf, "Emission")?;
    if let Some((node, socket)) = normal {
        graph.connect(node, socket, bsdf, "Normal")?;
    }
    graph.connect_surface(bsdf, "BSDF")?;

    Ok(graph)
}

/// Builds the depth variant: `min(max_depth, |P - camera origin|)`.
pub fn build_depth(max_depth: f32) -> Result<ShaderGraph> {
    let mut graph = ShaderGraph::new();

    let geometry = graph.add(ShaderNode::Geometry);
    let camera_origin = graph.add(ShaderNode::VectorTransform {
        kind: VectorTransformType::Point,
        from: TransformSpace::Camera,
        to: TransformSpace::World,
        vector: Vec3::ZERO,
    });
    let distance = graph.add(ShaderNode::VectorMath {
        op: VectorMathOp::Distance,
    });
    let clamp = graph.add_named(
        MAX_DEPTH_NODE,
        ShaderNode::Math {
            op: MathOp::Minimum,
            value1: max_depth,
            value2: 0.0,
        },
    );

    graph.connect(geometry, "Position", distance, "Vector1")?;
    graph.connect(camera_origin, "Vector", distance, "Vector2")?;
    graph.connect(distance, "Value", clamp, "Value2")?;
    graph.connect_surface(clamp, "Value")?;

    Ok(graph)
}

/// Builds the normal variant: the (mapped) shading normal in camera space.
pub fn build_normal(desc: &MaterialDesc) -> Result<ShaderGraph> {
    let mut graph = ShaderGraph::new();

    let normal = match normal_map(&mut graph, desc)? {
        Some(output) => output,
        None => (graph.add(ShaderNode::Geometry), "Normal"),
    };

    let to_camera = graph.add(ShaderNode::VectorTransform {
        kind: VectorTransformType::Normal,
        from: TransformSpace::World,
        to: TransformSpace::Camera,
        vector: Vec3::ZERO,
    });
    graph.connect(normal.0, normal.1, to_camera, "Vector")?;
    graph.connect_surface(to_camera, "Vector")?;

    Ok(graph)
}

/// Builds the albedo variant: base colour only.
pub fn build_albedo(desc: &MaterialDesc) -> Result<ShaderGraph> {
    let mut graph = ShaderGraph::new();
    let albedo = tinted_texture(
        &mut graph,
        desc.albedo_color.truncate(),
        desc.albedo_texture.as_ref(),
    )?;
    graph.connect_surface(albedo.0, albedo.1)?;
    Ok(graph)
}

/// Builds all four variants of `desc`.
pub fn build_variants(desc: &MaterialDesc, max_depth: f32) -> Result<ShaderVariants<ShaderGraph>> {
    Ok(ShaderVariants {
        pbr: build_pbr(desc)?,
        depth: build_depth(max_depth)?,
        normal: build_normal(desc)?,
        albedo: build_albedo(desc)?,
    })
}

/// Patches the max-depth constant of a depth graph in place.
///
/// Returns `true` when the value changed.
pub fn set_max_depth(graph: &mut ShaderGraph, max_depth: f32) -> bool {
    let Some(id) = graph.find_named(MAX_DEPTH_NODE) else {
        return false;
    };
    match graph.node_mut(id).map(|n| &mut n.kind) {
        Some(ShaderNode::Math { value1, .. }) if *value1 != max_depth => {
            *value1 = max_depth;
            true
        }
        _ => false,
    }
}

/// Reads back the max-depth constant of a depth graph.
#[must_use]
pub fn max_depth_of(graph: &ShaderGraph) -> Option<f32> {
    let id = graph.find_named(MAX_DEPTH_NODE)?;
    match graph.node(id).map(|n| &n.kind) {
        Some(ShaderNode::Math { value1, .. }) => Some(*value1),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ior_is_clamped() {
        let desc = MaterialDesc::builder("glass").ior(0.5).build();
        let graph = build_pbr(&desc).unwrap();
        let ior = graph.nodes().find_map(|(_, n)| match &n.kind {
            ShaderNode::PrincipledBsdf(bsdf) => Some(bsdf.ior),
            _ => None,
        });
        assert_eq!(ior, Some(MIN_IOR));
    }

    #[test]
    fn max_depth_patch_reports_change() {
        let mut graph = build_depth(10.0).unwrap();
        assert!(set_max_depth(&mut graph, 20.0));
        assert!(!set_max_depth(&mut graph, 20.0));
        assert_eq!(max_depth_of(&graph), Some(20.0));
    }
}
