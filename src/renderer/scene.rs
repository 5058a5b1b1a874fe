//! The renderer-side scene container.
//!
//! [`RenderScene`] owns every renderer object in slot-map arenas. The
//! wrapper layers ([`crate::scene`], [`crate::mesh`], [`crate::shader`])
//! only hold keys into it. Every mutation bumps the scene's
//! [`UpdateTag`], which is how a [`Session`](super::session::Session)
//! learns that its device copy is stale.

use bitflags::bitflags;
use glam::{Affine3A, Vec2, Vec3};
use slotmap::{new_key_type, SlotMap};

use super::shader_graph::{ShaderGraph, ShaderNode};
use super::version_tracker::{TaggedMut, UpdateTag};

new_key_type! {
    /// Handle of a placed mesh instance.
    pub struct ObjectKey;
    /// Handle of a light.
    pub struct LightKey;
    /// Handle of a compiled shader.
    pub struct ShaderKey;
    /// Handle of a geometry buffer.
    pub struct GeometryKey;
    /// Handle of a decoded image.
    pub struct ImageKey;
}

/// Tags a renderer-side transform copy with the wrapper transform it came
/// from. Reachability in the garbage collector is keyed on this.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransformId(u64);

bitflags! {
    /// Ray types an object is visible to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RayVisibility: u32 {
        const CAMERA       = 1 << 0;
        const DIFFUSE      = 1 << 1;
        const GLOSSY       = 1 << 2;
        const TRANSMISSION = 1 << 3;
        const SHADOW       = 1 << 4;
        const SCATTER      = 1 << 5;
    }
}

// ============================================================================
// Scene items
// ============================================================================

#[derive(Debug, Clone)]
pub struct Object {
    pub name: String,
    pub geometry: GeometryKey,
    pub tfm: Affine3A,
    pub transform_id: TransformId,
    pub visibility: RayVisibility,
    pub is_caustics_receiver: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightType {
    Distant,
    Spot,
    Point,
}

#[derive(Debug, Clone)]
pub struct Light {
    pub kind: LightType,
    /// Radiometric strength (W, or W/m² for distant lights), per channel.
    pub strength: Vec3,
    pub dir: Vec3,
    pub co: Vec3,
    pub axisu: Vec3,
    pub axisv: Vec3,
    pub tfm: Affine3A,
    pub transform_id: TransformId,
    pub shader: Option<ShaderKey>,
    /// Angular diameter of a distant light.
    pub angle: f32,
    pub size: f32,
    pub spot_angle: f32,
    pub spot_smooth: f32,
    pub cast_shadow: bool,
    pub use_transmission: bool,
    pub use_caustics: bool,
    pub normalize: bool,
}

#[derive(Debug, Clone)]
pub struct Shader {
    pub name: String,
    pub graph: ShaderGraph,
}

impl Shader {
    pub fn new(name: impl Into<String>, graph: ShaderGraph) -> Self {
        Self {
            name: name.into(),
            graph,
        }
    }
}

/// Triangle geometry with per-corner attributes.
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    pub name: String,
    pub verts: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    /// Index into `used_shaders`, one per triangle.
    pub shader_slots: Vec<u32>,
    pub smooth: Vec<bool>,
    pub used_shaders: Vec<ShaderKey>,
    pub face_normals: Vec<Vec3>,
    pub vertex_normals: Vec<Vec3>,
    pub corner_uvs: Option<Vec<Vec2>>,
    pub corner_tangents: Option<Vec<Vec3>>,
    pub corner_tangent_signs: Option<Vec<f32>>,
}

impl Geometry {
    #[must_use]
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    #[default]
    Linear,
    Closest,
    Cubic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Extension {
    #[default]
    Repeat,
    Extend,
    Clip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaType {
    #[default]
    Auto,
    Unassociated,
    Associated,
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageParams {
    pub interpolation: Interpolation,
    pub extension: Extension,
    pub alpha: AlphaType,
    /// Texels are sRGB encoded. Pixels are still handed to the renderer raw.
    pub srgb: bool,
}

#[derive(Debug, Clone)]
pub struct ImageResource {
    pub name: String,
    pub params: ImageParams,
    pub pixels: image::DynamicImage,
}

impl ImageResource {
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

// ============================================================================
// Camera
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraKind {
    #[default]
    Perspective,
    Orthographic,
    /// Equirectangular panorama.
    Panorama,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewplane {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Columns are `(right, up, dir, position)`.
    pub matrix: Affine3A,
    pub kind: CameraKind,
    pub fov: f32,
    pub nearclip: f32,
    pub farclip: f32,
    pub full_width: u32,
    pub full_height: u32,
    pub viewplane: Viewplane,
}

impl Default for Camera {
    fn default() -> Self {
        let mut camera = Self {
            matrix: Affine3A::IDENTITY,
            kind: CameraKind::Perspective,
            fov: std::f32::consts::FRAC_PI_4,
            nearclip: 1e-5,
            farclip: 1e5,
            full_width: 1024,
            full_height: 512,
            viewplane: Viewplane {
                left: -1.0,
                right: 1.0,
                bottom: -1.0,
                top: 1.0,
            },
        };
        camera.compute_auto_viewplane();
        camera
    }
}

impl Camera {
    /// Sets the viewplane from the frame aspect ratio so the shorter side
    /// spans `[-1, 1]`. Panoramas use the unit square.
    pub fn compute_auto_viewplane(&mut self) {
        self.viewplane = if self.kind == CameraKind::Panorama {
            Viewplane {
                left: 0.0,
                right: 1.0,
                bottom: 0.0,
                top: 1.0,
            }
        } else {
            let aspect = self.full_width as f32 / self.full_height.max(1) as f32;
            if self.full_width >= self.full_height {
                Viewplane {
                    left: -aspect,
                    right: aspect,
                    bottom: -1.0,
                    top: 1.0,
                }
            } else {
                Viewplane {
                    left: -1.0,
                    right: 1.0,
                    bottom: -1.0 / aspect,
                    top: 1.0 / aspect,
                }
            }
        };
    }

    #[must_use]
    pub fn aspect(&self) -> f32 {
        self.full_width as f32 / self.full_height.max(1) as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassType {
    Combined,
    Depth,
    Normal,
    Albedo,
}

impl PassType {
    /// Looks a pass type up by its film name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "combined" => Some(Self::Combined),
            "depth" => Some(Self::Depth),
            "normal" => Some(Self::Normal),
            "albedo" => Some(Self::Albedo),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pass {
    pub name: String,
    pub kind: PassType,
}

// ============================================================================
// Scene container
// ============================================================================

#[derive(Debug, Default)]
pub struct RenderScene {
    objects: SlotMap<ObjectKey, Object>,
    lights: SlotMap<LightKey, Light>,
    shaders: SlotMap<ShaderKey, Shader>,
    geometry: SlotMap<GeometryKey, Geometry>,
    images: SlotMap<ImageKey, ImageResource>,
    camera: Camera,
    default_background: Option<ShaderKey>,
    passes: Vec<Pass>,
    next_transform_id: u64,
    tracker: UpdateTag,
}

impl RenderScene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current modification version.
    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.tracker.version()
    }

    /// Flags the scene as modified.
    pub fn tag_update(&mut self) {
        self.tracker.tag();
    }

    /// Hands out a fresh transform tag.
    pub fn allocate_transform_id(&mut self) -> TransformId {
        self.next_transform_id += 1;
        TransformId(self.next_transform_id)
    }

    /// Drops every renderer object. Transform tags keep counting so that tags
    /// from before the clear never alias new ones.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.lights.clear();
        self.shaders.clear();
        self.geometry.clear();
        self.images.clear();
        self.default_background = None;
        self.passes.clear();
        self.tracker.tag();
    }

    // --- objects -----------------------------------------------------------

    pub fn add_object(&mut self, object: Object) -> ObjectKey {
        self.tracker.tag();
        self.objects.insert(object)
    }

    #[must_use]
    pub fn object(&self, key: ObjectKey) -> Option<&Object> {
        self.objects.get(key)
    }

    pub fn object_mut(&mut self, key: ObjectKey) -> Option<TaggedMut<'_, Object>> {
        let tracker = &mut self.tracker;
        self.objects.get_mut(key).map(|o| TaggedMut::new(o, tracker))
    }

    pub fn delete_object(&mut self, key: ObjectKey) -> Option<Object> {
        let removed = self.objects.remove(key);
        if removed.is_some() {
            self.tracker.tag();
        }
        removed
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectKey, &Object)> {
        self.objects.iter()
    }

    // --- lights ------------------------------------------------------------

    pub fn add_light(&mut self, light: Light) -> LightKey {
        self.tracker.tag();
        self.lights.insert(light)
    }

    #[must_use]
    pub fn light(&self, key: LightKey) -> Option<&Light> {
        self.lights.get(key)
    }

    pub fn light_mut(&mut self, key: LightKey) -> Option<TaggedMut<'_, Light>> {
        let tracker = &mut self.tracker;
        self.lights.get_mut(key).map(|l| TaggedMut::new(l, tracker))
    }

    pub fn delete_light(&mut self, key: LightKey) -> Option<Light> {
        let removed = self.lights.remove(key);
        if removed.is_some() {
            self.tracker.tag();
        }
        removed
    }

    pub fn lights(&self) -> impl Iterator<Item = (LightKey, &Light)> {
        self.lights.iter()
    }

    // --- shaders -----------------------------------------------------------

    pub fn add_shader(&mut self, shader: Shader) -> ShaderKey {
        self.tracker.tag();
        self.shaders.insert(shader)
    }

    #[must_use]
    pub fn shader(&self, key: ShaderKey) -> Option<&Shader> {
        self.shaders.get(key)
    }

    pub fn shader_mut(&mut self, key: ShaderKey) -> Option<TaggedMut<'_, Shader>> {
        let tracker = &mut self.tracker;
        self.shaders.get_mut(key).map(|s| TaggedMut::new(s, tracker))
    }

    /// Deletes a shader and clears the background slot and any light still
    /// pointing at it.
    pub fn delete_shader(&mut self, key: ShaderKey) -> Option<Shader> {
        let removed = self.shaders.remove(key)?;

        if self.default_background == Some(key) {
            self.default_background = None;
        }
        for light in self.lights.values_mut() {
            if light.shader == Some(key) {
                light.shader = None;
            }
        }

        self.tracker.tag();
        Some(removed)
    }

    pub fn shaders(&self) -> impl Iterator<Item = (ShaderKey, &Shader)> {
        self.shaders.iter()
    }

    #[must_use]
    pub fn default_background(&self) -> Option<ShaderKey> {
        self.default_background
    }

    pub fn set_default_background(&mut self, key: Option<ShaderKey>) {
        if self.default_background != key {
            self.default_background = key;
            self.tracker.tag();
        }
    }

    // --- geometry ----------------------------------------------------------

    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryKey {
        self.tracker.tag();
        self.geometry.insert(geometry)
    }

    #[must_use]
    pub fn geometry(&self, key: GeometryKey) -> Option<&Geometry> {
        self.geometry.get(key)
    }

    pub fn geometry_mut(&mut self, key: GeometryKey) -> Option<TaggedMut<'_, Geometry>> {
        let tracker = &mut self.tracker;
        self.geometry.get_mut(key).map(|g| TaggedMut::new(g, tracker))
    }

    pub fn geometries(&self) -> impl Iterator<Item = (GeometryKey, &Geometry)> {
        self.geometry.iter()
    }

    // --- images ------------------------------------------------------------

    pub fn add_image(&mut self, image: ImageResource) -> ImageKey {
        self.tracker.tag();
        self.images.insert(image)
    }

    #[must_use]
    pub fn image(&self, key: ImageKey) -> Option<&ImageResource> {
        self.images.get(key)
    }

    /// Deletes an image and unbinds it from every texture node sampling it.
    pub fn delete_image(&mut self, key: ImageKey) -> Option<ImageResource> {
        let removed = self.images.remove(key)?;

        for shader in self.shaders.values_mut() {
            for node in shader.graph.nodes_mut() {
                match &mut node.kind {
                    ShaderNode::ImageTexture { image, .. } if *image == Some(key) => *image = None,
                    ShaderNode::SkyTexture(sky) if sky.cached_image == Some(key) => {
                        sky.cached_image = None;
                    }
                    _ => {}
                }
            }
        }

        self.tracker.tag();
        Some(removed)
    }

    pub fn images(&self) -> impl Iterator<Item = (ImageKey, &ImageResource)> {
        self.images.iter()
    }

    // --- camera & film -----------------------------------------------------

    #[must_use]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> TaggedMut<'_, Camera> {
        TaggedMut::new(&mut self.camera, &mut self.tracker)
    }

    /// Adds an output pass unless one with the same name exists.
    pub fn add_pass(&mut self, name: impl Into<String>, kind: PassType) {
        let name = name.into();
        if !self.passes.iter().any(|p| p.name == name) {
            self.passes.push(Pass { name, kind });
            self.tracker.tag();
        }
    }

    #[must_use]
    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    // --- counts ------------------------------------------------------------

    #[must_use]
    pub fn num_objects(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn num_lights(&self) -> usize {
        self.lights.len()
    }

    #[must_use]
    pub fn num_shaders(&self) -> usize {
        self.shaders.len()
    }

    #[must_use]
    pub fn num_geometry(&self) -> usize {
        self.geometry.len()
    }

    #[must_use]
    pub fn num_images(&self) -> usize {
        self.images.len()
    }
}
