//! Renderer-native shader graphs.
//!
//! A [`ShaderGraph`] is a small DAG of typed [`ShaderNode`]s joined by links
//! between named sockets. Each node kind declares its socket names, and
//! [`ShaderGraph::connect`] refuses names the kind does not have. Every
//! graph owns exactly one `Output` node; its `Surface` input is the port the
//! renderer evaluates.

use glam::Vec3;

use super::scene::ImageKey;
use crate::errors::{Result, SceneError};

/// Index of a node within one [`ShaderGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphNodeId(u32);

impl GraphNodeId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A resolved socket: a node plus one of its declared socket names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Socket {
    pub node: GraphNodeId,
    pub name: &'static str,
}

/// A directed connection from an output socket to an input socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub from: Socket,
    pub to: Socket,
}

// ============================================================================
// Node parameter types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorMathOp {
    Add,
    Subtract,
    Multiply,
    Distance,
    Normalize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathOp {
    Add,
    Multiply,
    Minimum,
    Maximum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalMapSpace {
    Tangent,
    Object,
    World,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorTransformType {
    Vector,
    Point,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformSpace {
    World,
    Object,
    Camera,
}

/// Sampler-side placement of a texture (translation/rotation/scale applied
/// to the lookup coordinate, not to the image).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureMapping {
    pub translation: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for TextureMapping {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkyType {
    Preetham,
    HosekWilkie,
    #[default]
    Nishita,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyTexture {
    pub sky_type: SkyType,
    pub sun_elevation: f32,
    pub sun_azimuth: f32,
    pub sun_disc: bool,
    /// Pre-baked sky image, dropped whenever the background kind changes.
    pub cached_image: Option<ImageKey>,
}

impl Default for SkyTexture {
    fn default() -> Self {
        Self {
            sky_type: SkyType::Nishita,
            sun_elevation: std::f32::consts::FRAC_PI_2,
            sun_azimuth: 0.0,
            sun_disc: true,
            cached_image: None,
        }
    }
}

/// Constant inputs of the principled surface node. Linked sockets override
/// the corresponding constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrincipledBsdf {
    pub base_color: Vec3,
    pub subsurface_color: Vec3,
    pub metallic: f32,
    pub roughness: f32,
    pub transmission_roughness: f32,
    pub specular: f32,
    pub subsurface: f32,
    pub transmission: f32,
    pub ior: f32,
    pub alpha: f32,
    pub emission: Vec3,
    pub emission_strength: f32,
}

impl Default for PrincipledBsdf {
    fn default() -> Self {
        Self {
            base_color: Vec3::splat(0.8),
            subsurface_color: Vec3::splat(0.8),
            metallic: 0.0,
            roughness: 0.5,
            transmission_roughness: 0.0,
            specular: 0.5,
            subsurface: 0.0,
            transmission: 0.0,
            ior: 1.45,
            alpha: 1.0,
            emission: Vec3::ZERO,
            emission_strength: 1.0,
        }
    }
}

// ============================================================================
// Node kinds
// ============================================================================

/// One node of a shader graph, with its constant parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderNode {
    Output,
    Color {
        value: Vec3,
    },
    Value {
        value: f32,
    },
    ImageTexture {
        image: Option<ImageKey>,
        mapping: TextureMapping,
    },
    VectorMath {
        op: VectorMathOp,
    },
    Math {
        op: MathOp,
        value1: f32,
        value2: f32,
    },
    SeparateColor,
    NormalMap {
        space: NormalMapSpace,
        strength: f32,
    },
    PrincipledBsdf(PrincipledBsdf),
    Emission {
        color: Vec3,
        strength: f32,
    },
    Background {
        color: Vec3,
        strength: f32,
    },
    Geometry,
    VectorTransform {
        kind: VectorTransformType,
        from: TransformSpace,
        to: TransformSpace,
        vector: Vec3,
    },
    SkyTexture(SkyTexture),
}

const PRINCIPLED_INPUTS: &[&str] = &[
    "Base Color",
    "Subsurface Color",
    "Metallic",
    "Roughness",
    "Transmission Roughness",
    "Specular",
    "Subsurface",
    "Transmission",
    "IOR",
    "Alpha",
    "Normal",
    "Emission",
    "Emission Strength",
];

impl ShaderNode {
    /// Short kind name, used in diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Output => "Output",
            Self::Color { .. } => "Color",
            Self::Value { .. } => "Value",
            Self::ImageTexture { .. } => "ImageTexture",
            Self::VectorMath { .. } => "VectorMath",
            Self::Math { .. } => "Math",
            Self::SeparateColor => "SeparateColor",
            Self::NormalMap { .. } => "NormalMap",
            Self::PrincipledBsdf(_) => "PrincipledBsdf",
            Self::Emission { .. } => "Emission",
            Self::Background { .. } => "Background",
            Self::Geometry => "Geometry",
            Self::VectorTransform { .. } => "VectorTransform",
            Self::SkyTexture(_) => "SkyTexture",
        }
    }

    #[must_use]
    pub fn inputs(&self) -> &'static [&'static str] {
        match self {
            Self::Output => &["Surface", "Volume", "Displacement"],
            Self::Color { .. } | Self::Value { .. } | Self::Geometry => &[],
            Self::ImageTexture { .. } | Self::VectorTransform { .. } | Self::SkyTexture(_) => {
                &["Vector"]
            }
            Self::VectorMath { .. } => &["Vector1", "Vector2"],
            Self::Math { .. } => &["Value1", "Value2"],
            Self::SeparateColor => &["Color"],
            Self::NormalMap { .. } => &["Strength", "Color"],
            Self::PrincipledBsdf(_) => PRINCIPLED_INPUTS,
            Self::Emission { .. } | Self::Background { .. } => &["Color", "Strength"],
        }
    }

    #[must_use]
    pub fn outputs(&self) -> &'static [&'static str] {
        match self {
            Self::Output => &[],
            Self::Color { .. } | Self::SkyTexture(_) => &["Color"],
            Self::Value { .. } | Self::Math { .. } => &["Value"],
            Self::ImageTexture { .. } => &["Color", "Alpha"],
            Self::VectorMath { .. } => &["Vector", "Value"],
            Self::SeparateColor => &["Red", "Green", "Blue"],
            Self::NormalMap { .. } => &["Normal"],
            Self::PrincipledBsdf(_) => &["BSDF"],
            Self::Emission { .. } => &["Emission"],
            Self::Background { .. } => &["Background"],
            Self::Geometry => &[
                "Position",
                "Normal",
                "Tangent",
                "True Normal",
                "Incoming",
                "Parametric",
            ],
            Self::VectorTransform { .. } => &["Vector"],
        }
    }
}

/// A node slot: kind plus an optional name for targeted patching.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub name: Option<String>,
    pub kind: ShaderNode,
}

// ============================================================================
// Graph
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ShaderGraph {
    nodes: Vec<GraphNode>,
    links: Vec<Link>,
    output: GraphNodeId,
}

impl Default for ShaderGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ShaderGraph {
    /// Creates a graph holding only its `Output` node.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![GraphNode {
                name: None,
                kind: ShaderNode::Output,
            }],
            links: Vec::new(),
            output: GraphNodeId(0),
        }
    }

    pub fn add(&mut self, kind: ShaderNode) -> GraphNodeId {
        let id = GraphNodeId(self.nodes.len() as u32);
        self.nodes.push(GraphNode { name: None, kind });
        id
    }

    pub fn add_named(&mut self, name: impl Into<String>, kind: ShaderNode) -> GraphNodeId {
        let id = self.add(kind);
        self.nodes[id.index()].name = Some(name.into());
        id
    }

    #[inline]
    #[must_use]
    pub fn output_node(&self) -> GraphNodeId {
        self.output
    }

    #[must_use]
    pub fn node(&self, id: GraphNodeId) -> Option<&GraphNode> {
        self.nodes.get(id.index())
    }

    pub fn node_mut(&mut self, id: GraphNodeId) -> Option<&mut GraphNode> {
        self.nodes.get_mut(id.index())
    }

    pub fn nodes(&self) -> impl Iterator<Item = (GraphNodeId, &GraphNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (GraphNodeId(i as u32), n))
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut GraphNode> {
        self.nodes.iter_mut()
    }

    #[must_use]
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Resolves an output socket by name.
    pub fn output(&self, node: GraphNodeId, name: &str) -> Result<Socket> {
        self.resolve(node, name, ShaderNode::outputs)
    }

    /// Resolves an input socket by name.
    pub fn input(&self, node: GraphNodeId, name: &str) -> Result<Socket> {
        self.resolve(node, name, ShaderNode::inputs)
    }

    fn resolve(
        &self,
        node: GraphNodeId,
        name: &str,
        sockets: fn(&ShaderNode) -> &'static [&'static str],
    ) -> Result<Socket> {
        let kind = &self
            .node(node)
            .ok_or_else(|| SceneError::UnknownSocket {
                node: "<missing>",
                socket: name.to_string(),
            })?
            .kind;

        sockets(kind)
            .iter()
            .find(|s| **s == name)
            .map(|s| Socket { node, name: *s })
            .ok_or_else(|| SceneError::UnknownSocket {
                node: kind.kind_name(),
                socket: name.to_string(),
            })
    }

    /// Links `from_node.from_socket` into `to_node.to_socket`.
    ///
    /// An input holds at most one link; connecting into an already linked
    /// input replaces the previous link.
    pub fn connect(
        &mut self,
        from_node: GraphNodeId,
        from_socket: &str,
        to_node: GraphNodeId,
        to_socket: &str,
    ) -> Result<()> {
        let from = self.output(from_node, from_socket)?;
        let to = self.input(to_node, to_socket)?;

        self.links.retain(|l| l.to != to);
        self.links.push(Link { from, to });
        Ok(())
    }

    /// Connects `from_node.from_socket` into the output's `Surface` port.
    pub fn connect_surface(&mut self, from_node: GraphNodeId, from_socket: &str) -> Result<()> {
        self.connect(from_node, from_socket, self.output, "Surface")
    }

    /// The socket currently linked into `node.input`, if any.
    #[must_use]
    pub fn link_into(&self, node: GraphNodeId, input: &str) -> Option<Socket> {
        self.links
            .iter()
            .find(|l| l.to.node == node && l.to.name == input)
            .map(|l| l.from)
    }

    /// The socket feeding the designated output port.
    #[must_use]
    pub fn surface_source(&self) -> Option<Socket> {
        self.link_into(self.output, "Surface")
    }

    /// First node carrying `name`.
    #[must_use]
    pub fn find_named(&self, name: &str) -> Option<GraphNodeId> {
        self.nodes()
            .find(|(_, n)| n.name.as_deref() == Some(name))
            .map(|(id, _)| id)
    }

    /// All nodes whose kind satisfies `pred`.
    pub fn nodes_of<'a>(
        &'a self,
        pred: impl Fn(&ShaderNode) -> bool + 'a,
    ) -> impl Iterator<Item = GraphNodeId> + 'a {
        self.nodes()
            .filter(move |(_, n)| pred(&n.kind))
            .map(|(id, _)| id)
    }

    /// Images sampled anywhere in this graph.
    pub fn images(&self) -> impl Iterator<Item = ImageKey> + '_ {
        self.nodes.iter().filter_map(|n| match &n.kind {
            ShaderNode::ImageTexture { image, .. } => *image,
            ShaderNode::SkyTexture(sky) => sky.cached_image,
            _ => None,
        })
    }
}
