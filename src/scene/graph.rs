use glam::{Affine3A, Quat, Vec3};
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;

use super::light::{place_light, LightDesc};
use super::material::{Material, MaterialKey};
use super::node::SceneNode;
use super::texture::decode_texture;
use super::transform::Transform;
use super::{NodeKey, ObjectId};
use crate::errors::{Result, SceneError};
use crate::mesh::{build_geometry, MeshDesc};
use crate::renderer::scene::{
    GeometryKey, ImageKey, LightKey, Object, ObjectKey, RayVisibility, RenderScene, Shader,
    ShaderKey,
};
use crate::shader::background::{apply_color, apply_sky, take_sky_cache};
use crate::shader::material::{max_depth_of, set_max_depth};
use crate::shader::{
    build_variants, BackgroundKind, BackgroundSettings, MaterialDesc, RenderMode, ShaderRegistry,
};

/// Default clamp distance of the depth render mode.
pub const DEFAULT_MAX_DEPTH: f32 = 100.0;

fn visibility_mask(visible: bool) -> RayVisibility {
    if visible {
        RayVisibility::all()
    } else {
        RayVisibility::empty()
    }
}

/// The host-facing scene graph.
///
/// Owns the node arena and the material and texture registries, and keeps
/// the renderer scene in sync with them. Every method that touches renderer
/// objects takes the [`RenderScene`] explicitly: the session owns it, the
/// graph only holds keys.
///
/// # Node lifecycle
///
/// A node is created by [`add_node`](Self::add_node), stays live while
/// transforms, visibility and attachments are updated, and is gone for good
/// after [`remove_node`](Self::remove_node) (or a garbage-collection pass
/// that finds it unreachable). Keys of removed nodes are never reused.
#[derive(Debug)]
pub struct SceneGraph {
    pub(crate) nodes: SlotMap<NodeKey, SceneNode>,
    pub(crate) roots: Vec<NodeKey>,
    pub(crate) ids: FxHashMap<ObjectId, NodeKey>,

    pub(crate) materials: SlotMap<MaterialKey, Material>,
    pub(crate) textures: FxHashSet<ImageKey>,

    pub(crate) registry: ShaderRegistry,
    pub(crate) max_depth: f32,
    pub(crate) background: BackgroundSettings,
    pub(crate) render_mode: RenderMode,
}

impl SceneGraph {
    /// Creates an empty graph and installs the shared shaders into `scene`.
    pub fn new(scene: &mut RenderScene, max_depth: f32) -> Result<Self> {
        Ok(Self {
            nodes: SlotMap::with_key(),
            roots: Vec::new(),
            ids: FxHashMap::default(),
            materials: SlotMap::with_key(),
            textures: FxHashSet::default(),
            registry: ShaderRegistry::install(scene)?,
            max_depth,
            background: BackgroundSettings::default(),
            render_mode: RenderMode::default(),
        })
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &ShaderRegistry {
        &self.registry
    }

    #[inline]
    #[must_use]
    pub fn max_depth(&self) -> f32 {
        self.max_depth
    }

    #[inline]
    #[must_use]
    pub fn background(&self) -> BackgroundSettings {
        self.background
    }

    /// The shader currently serving as the world background.
    #[must_use]
    pub fn background_shader(&self) -> ShaderKey {
        self.registry.background(self.background.kind())
    }

    #[inline]
    #[must_use]
    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    /// Variant that meshes added from now on bind to.
    pub fn set_render_mode(&mut self, mode: RenderMode) {
        self.render_mode = mode;
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Creates a node under `parent` (a root if `None`).
    ///
    /// Its composed matrix is `parent.world · T · R · S`. Reusing an `id`
    /// points the id map at the new node.
    #[allow(clippy::too_many_arguments)]
    pub fn add_node(
        &mut self,
        scene: &mut RenderScene,
        parent: Option<NodeKey>,
        id: ObjectId,
        name: &str,
        translation: Vec3,
        rotation: Quat,
        scale: Vec3,
    ) -> Result<NodeKey> {
        let parent_world = match parent {
            Some(p) => Some(*self.nodes.get(p).ok_or(SceneError::NodeNotFound)?.world_matrix()),
            None => None,
        };

        let mut transform = Transform::new(translation, rotation, scale);
        transform.recompose(parent_world.as_ref());

        let transform_id = scene.allocate_transform_id();
        let key = self
            .nodes
            .insert(SceneNode::new(id, name, parent, transform, transform_id));

        match parent.and_then(|p| self.nodes.get_mut(p)) {
            Some(parent) => parent.children.push(key),
            None => self.roots.push(key),
        }

        if let Some(previous) = self.ids.insert(id, key) {
            log::warn!("Node id {id} registered twice, replacing {previous:?} in the id map");
        }
        Ok(key)
    }

    /// Looks a node up by host id.
    #[must_use]
    pub fn get_node(&self, id: ObjectId) -> Option<NodeKey> {
        self.ids.get(&id).copied()
    }

    #[must_use]
    pub fn node(&self, key: NodeKey) -> Option<&SceneNode> {
        self.nodes.get(key)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeKey, &SceneNode)> {
        self.nodes.iter()
    }

    #[must_use]
    pub fn roots(&self) -> &[NodeKey] {
        &self.roots
    }

    #[inline]
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn world_matrix(&self, key: NodeKey) -> Option<Affine3A> {
        self.nodes.get(key).map(|n| *n.world_matrix())
    }

    /// Removes `key` and its whole subtree, deleting their mesh instances
    /// and lights from the renderer.
    pub fn remove_node(&mut self, scene: &mut RenderScene, key: NodeKey) -> Result<()> {
        let parent = self.nodes.get(key).ok_or(SceneError::NodeNotFound)?.parent;
        match parent.and_then(|p| self.nodes.get_mut(p)) {
            Some(parent) => parent.children.retain(|&c| c != key),
            None => self.roots.retain(|&r| r != key),
        }

        let removed = self.remove_subtree(scene, key);
        log::debug!("Removed {removed} node(s)");
        Ok(())
    }

    fn remove_subtree(&mut self, scene: &mut RenderScene, key: NodeKey) -> usize {
        let Some(node) = self.nodes.remove(key) else {
            return 0;
        };

        let mut removed = 1;
        for &child in &node.children {
            removed += self.remove_subtree(scene, child);
        }

        if let Some(object) = node.mesh_object {
            scene.delete_object(object);
        }
        for &light in &node.lights {
            scene.delete_light(light);
        }

        if self.ids.get(&node.id) == Some(&key) {
            self.ids.remove(&node.id);
        }
        removed
    }

    /// Replaces the local TRS of `key` and re-composes it and its subtree.
    pub fn update_transform(
        &mut self,
        scene: &mut RenderScene,
        key: NodeKey,
        translation: Vec3,
        rotation: Quat,
        scale: Vec3,
    ) -> Result<()> {
        let node = self.nodes.get_mut(key).ok_or(SceneError::NodeNotFound)?;
        node.transform.translation = translation;
        node.transform.rotation = rotation;
        node.transform.scale = scale;

        self.propagate_transform(scene, key);
        Ok(())
    }

    /// Re-composes `key` against its parent, pushes the result to its mesh
    /// instance and lights, then recurses into children.
    fn propagate_transform(&mut self, scene: &mut RenderScene, key: NodeKey) {
        let parent_world = self
            .nodes
            .get(key)
            .and_then(|n| n.parent)
            .and_then(|p| self.nodes.get(p))
            .map(|p| *p.world_matrix());

        let Some(node) = self.nodes.get_mut(key) else {
            return;
        };
        node.transform.recompose(parent_world.as_ref());
        let world = *node.world_matrix();

        if let Some(mut object) = node.mesh_object.and_then(|o| scene.object_mut(o)) {
            object.tfm = world;
        }
        for &light in &node.lights {
            if let Some(mut light) = scene.light_mut(light) {
                place_light(&mut light, &world);
            }
        }

        let children = node.children.clone();
        for child in children {
            self.propagate_transform(scene, child);
        }
    }

    /// Shows or hides `key` and every descendant.
    ///
    /// Descendants take the same flag. Renderer state follows the effective
    /// visibility, so nothing under a hidden ancestor is ever shown.
    pub fn update_visibility(
        &mut self,
        scene: &mut RenderScene,
        key: NodeKey,
        visible: bool,
    ) -> Result<()> {
        if !self.nodes.contains_key(key) {
            return Err(SceneError::NodeNotFound);
        }
        let ancestors_visible = self.ancestors_visible(key);
        self.apply_visibility(scene, key, visible, ancestors_visible);
        Ok(())
    }

    fn apply_visibility(
        &mut self,
        scene: &mut RenderScene,
        key: NodeKey,
        visible: bool,
        ancestors_visible: bool,
    ) {
        let Some(node) = self.nodes.get_mut(key) else {
            return;
        };
        node.visible = visible;
        let effective = visible && ancestors_visible;

        if let Some(mut object) = node.mesh_object.and_then(|o| scene.object_mut(o)) {
            object.visibility = visibility_mask(effective);
        }
        let shader = self.registry.light(effective);
        for &light in &node.lights {
            if let Some(mut light) = scene.light_mut(light) {
                light.shader = Some(shader);
            }
        }

        let children = node.children.clone();
        for child in children {
            self.apply_visibility(scene, child, visible, effective);
        }
    }

    fn ancestors_visible(&self, key: NodeKey) -> bool {
        let mut cursor = self.nodes.get(key).and_then(|n| n.parent);
        while let Some(parent) = cursor.and_then(|p| self.nodes.get(p)) {
            if !parent.visible {
                return false;
            }
            cursor = parent.parent;
        }
        true
    }

    /// Whether `key` is actually shown: its own flag and every ancestor's.
    #[must_use]
    pub fn effective_visibility(&self, key: NodeKey) -> Option<bool> {
        let node = self.nodes.get(key)?;
        Some(node.visible && self.ancestors_visible(key))
    }

    // ========================================================================
    // Attachments
    // ========================================================================

    /// Instances `mesh` at `key`, replacing any mesh it already carried.
    pub fn assign_mesh_to_node(
        &mut self,
        scene: &mut RenderScene,
        key: NodeKey,
        mesh: GeometryKey,
    ) -> Result<ObjectKey> {
        if scene.geometry(mesh).is_none() {
            return Err(SceneError::MeshNotFound);
        }
        let visible = self
            .effective_visibility(key)
            .ok_or(SceneError::NodeNotFound)?;
        let node = self.nodes.get_mut(key).ok_or(SceneError::NodeNotFound)?;

        let object = scene.add_object(Object {
            name: node.name.clone(),
            geometry: mesh,
            tfm: *node.world_matrix(),
            transform_id: node.transform_id,
            visibility: visibility_mask(visible),
            is_caustics_receiver: true,
        });
        if let Some(previous) = node.mesh_object.replace(object) {
            scene.delete_object(previous);
        }
        Ok(object)
    }

    /// Attaches a new light to `key`, placed by the node's world matrix.
    pub fn add_light_to_node(
        &mut self,
        scene: &mut RenderScene,
        key: NodeKey,
        desc: &LightDesc,
    ) -> Result<LightKey> {
        let visible = self
            .effective_visibility(key)
            .ok_or(SceneError::NodeNotFound)?;
        let shader = self.registry.light(visible);
        let node = self.nodes.get_mut(key).ok_or(SceneError::NodeNotFound)?;

        let light = scene.add_light(desc.to_light(node.world_matrix(), node.transform_id, shader));
        node.lights.push(light);
        Ok(light)
    }

    /// Detaches `light` from `key` and deletes it.
    pub fn remove_light_from_node(
        &mut self,
        scene: &mut RenderScene,
        key: NodeKey,
        light: LightKey,
    ) -> Result<()> {
        let node = self.nodes.get_mut(key).ok_or(SceneError::NodeNotFound)?;
        let pos = node
            .lights
            .iter()
            .position(|&l| l == light)
            .ok_or(SceneError::LightNotOnNode)?;
        node.lights.remove(pos);

        scene.delete_light(light).ok_or(SceneError::LightNotFound)?;
        Ok(())
    }

    // ========================================================================
    // Textures and materials
    // ========================================================================

    /// Decodes an encoded texture and uploads it to the renderer.
    pub fn add_texture(
        &mut self,
        scene: &mut RenderScene,
        name: &str,
        bytes: &[u8],
        mime_type: &str,
        srgb: bool,
    ) -> Result<ImageKey> {
        let image = decode_texture(name, bytes, mime_type, srgb)?;
        let key = scene.add_image(image);
        self.textures.insert(key);
        Ok(key)
    }

    #[must_use]
    pub fn has_texture(&self, key: ImageKey) -> bool {
        self.textures.contains(&key)
    }

    #[inline]
    #[must_use]
    pub fn num_textures(&self) -> usize {
        self.textures.len()
    }

    /// Builds and registers the four shader variants of `desc`.
    pub fn add_material(&mut self, scene: &mut RenderScene, desc: &MaterialDesc) -> Result<MaterialKey> {
        let used_images = desc.used_images();
        if used_images.iter().any(|k| !self.textures.contains(k)) {
            return Err(SceneError::TextureNotFound);
        }

        let graphs = build_variants(desc, self.max_depth)?;
        let shaders = graphs.map(|mode, graph| {
            let name = format!("{}_{}", desc.name, mode.suffix());
            scene.add_shader(Shader::new(name, graph))
        });

        let key = self.materials.insert(Material {
            name: desc.name.clone(),
            shaders,
            used_images: used_images.into_iter().collect(),
        });
        log::debug!("Added material '{}'", desc.name);
        Ok(key)
    }

    #[must_use]
    pub fn material(&self, key: MaterialKey) -> Option<&Material> {
        self.materials.get(key)
    }

    pub fn materials(&self) -> impl Iterator<Item = (MaterialKey, &Material)> {
        self.materials.iter()
    }

    #[inline]
    #[must_use]
    pub fn num_materials(&self) -> usize {
        self.materials.len()
    }

    // ========================================================================
    // Meshes
    // ========================================================================

    /// Builds renderer geometry from `desc`, binding each submesh to the
    /// current render mode's variant of its material.
    pub fn add_mesh(&mut self, scene: &mut RenderScene, desc: &MeshDesc<'_>) -> Result<GeometryKey> {
        desc.validate()?;
        let used_shaders = self.resolve_shaders(&desc.materials[..desc.submesh_count()], self.render_mode)?;
        if self.render_mode == RenderMode::Depth {
            for &shader in &used_shaders {
                self.refresh_max_depth(scene, shader);
            }
        }
        let geometry = build_geometry(desc, used_shaders)?;
        Ok(scene.add_geometry(geometry))
    }

    /// Rebinds every submesh of `mesh` to the `mode` variant of the given
    /// materials. `None` binds the default surface.
    pub fn update_mesh_materials(
        &mut self,
        scene: &mut RenderScene,
        mesh: GeometryKey,
        materials: &[Option<MaterialKey>],
        mode: RenderMode,
    ) -> Result<()> {
        let submeshes = scene
            .geometry(mesh)
            .ok_or(SceneError::MeshNotFound)?
            .used_shaders
            .len();
        if materials.len() < submeshes {
            return Err(SceneError::InvalidMeshData(format!(
                "{} materials for {submeshes} submeshes",
                materials.len()
            )));
        }

        let used_shaders = self.resolve_shaders(&materials[..submeshes], mode)?;
        if mode == RenderMode::Depth {
            for &shader in &used_shaders {
                self.refresh_max_depth(scene, shader);
            }
        }

        if let Some(mut geometry) = scene.geometry_mut(mesh) {
            geometry.used_shaders = used_shaders;
        }
        Ok(())
    }

    fn resolve_shaders(
        &self,
        materials: &[Option<MaterialKey>],
        mode: RenderMode,
    ) -> Result<Vec<ShaderKey>> {
        materials
            .iter()
            .map(|material| match material {
                Some(key) => self
                    .materials
                    .get(*key)
                    .map(|m| m.shader(mode))
                    .ok_or(SceneError::MaterialNotFound),
                None => Ok(self.registry.default_surface()),
            })
            .collect()
    }

    // ========================================================================
    // Depth clamp and background
    // ========================================================================

    /// Patches the max-depth constant of `shader` if it is stale. Shaders
    /// without a clamp node are left alone.
    fn refresh_max_depth(&self, scene: &mut RenderScene, shader: ShaderKey) -> bool {
        let stale = scene
            .shader(shader)
            .and_then(|s| max_depth_of(&s.graph))
            .is_some_and(|depth| depth != self.max_depth);
        if !stale {
            return false;
        }
        scene
            .shader_mut(shader)
            .is_some_and(|mut s| set_max_depth(&mut s.graph, self.max_depth))
    }

    /// Sets the depth clamp and patches every material's depth variant.
    /// Returns how many shaders changed.
    pub fn set_max_depth(&mut self, scene: &mut RenderScene, max_depth: f32) -> usize {
        self.max_depth = max_depth;
        let depth_shaders: Vec<ShaderKey> = self.materials.values().map(|m| m.shaders.depth).collect();
        depth_shaders
            .into_iter()
            .filter(|&shader| self.refresh_max_depth(scene, shader))
            .count()
    }

    /// Switches or re-parameterises the world background.
    ///
    /// Any baked sky image is dropped. Switching kind repoints the scene's
    /// background slot.
    pub fn set_background(&mut self, scene: &mut RenderScene, settings: BackgroundSettings) {
        let sky = self.registry.background(BackgroundKind::Sky);
        let cached = scene
            .shader_mut(sky)
            .map(|mut s| take_sky_cache(&mut s.graph))
            .unwrap_or_default();
        for image in cached {
            scene.delete_image(image);
        }

        let target = self.registry.background(settings.kind());
        match scene.shader_mut(target) {
            Some(mut shader) => {
                match settings {
                    BackgroundSettings::Color(color) => apply_color(&mut shader.graph, color),
                    BackgroundSettings::Sky { sun_direction } => {
                        apply_sky(&mut shader.graph, sun_direction)
                    }
                };
            }
            None => log::warn!("Background shader is missing from the scene"),
        }

        if scene.default_background() != Some(target) {
            scene.set_default_background(Some(target));
        }
        self.background = settings;
    }

    /// Drops every node, material and texture, wipes the renderer scene and
    /// re-installs the shared shaders.
    pub fn clear(&mut self, scene: &mut RenderScene) -> Result<()> {
        scene.clear();
        self.registry = ShaderRegistry::install(scene)?;

        self.nodes.clear();
        self.roots.clear();
        self.ids.clear();
        self.materials.clear();
        self.textures.clear();
        self.background = BackgroundSettings::default();

        log::debug!("Cleared scene graph");
        Ok(())
    }
}
