//! Engine Core Module
//!
//! [`Engine`] ties a renderer [`Session`] to the [`SceneGraph`] that mirrors
//! the host's object model into it. It owns no window or display; the
//! interactive and offline front-ends ([`crate::interactive`],
//! [`crate::offline`]) wrap it with their output handling.
//!
//! # Lifecycle
//!
//! 1. Create with [`Engine::new`]
//! 2. [`Engine::session_init`] installs the shared shaders and the camera
//! 3. Build the scene through the node/material/mesh/light calls
//! 4. [`Engine::post_scene_update`] resets the session and starts rendering
//! 5. [`Engine::session_exit`] cancels and drops all scene state
//!
//! Scene mutations must come from the thread that drives the session. Any
//! change to geometry, materials, camera or background needs a reset before
//! the next render.
//!
//! # Example
//!
//! ```rust,ignore
//! use pathscene::{Engine, EngineConfig, HeadlessSession};
//!
//! let mut engine = Engine::new(EngineConfig::default(), HeadlessSession::new());
//! engine.session_init()?;
//! let root = engine.add_node(None, 1, "root", Vec3::ZERO, Quat::IDENTITY, Vec3::ONE)?;
//! engine.post_scene_update()?;
//! ```

use glam::{Affine3A, Mat3, Quat, Vec3};

use crate::config::EngineConfig;
use crate::errors::{Result, SceneError};
use crate::mesh::MeshDesc;
use crate::renderer::scene::{
    CameraKind, GeometryKey, ImageKey, LightKey, ObjectKey, RenderScene,
};
use crate::renderer::session::{BufferParams, Session};
use crate::scene::transform::orthonormal_basis;
use crate::scene::{
    GcReport, LightDesc, MaterialKey, NodeKey, ObjectId, SceneGraph, SceneNode,
};
use crate::shader::{BackgroundSettings, MaterialDesc, RenderMode};

/// Host camera projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraType {
    #[default]
    Perspective,
    Orthographic,
    /// Equirectangular panorama.
    Panoramic,
}

impl From<CameraType> for CameraKind {
    fn from(kind: CameraType) -> Self {
        match kind {
            CameraType::Perspective => CameraKind::Perspective,
            CameraType::Orthographic => CameraKind::Orthographic,
            CameraType::Panoramic => CameraKind::Panorama,
        }
    }
}

impl From<CameraKind> for CameraType {
    fn from(kind: CameraKind) -> Self {
        match kind {
            CameraKind::Perspective => CameraType::Perspective,
            CameraKind::Orthographic => CameraType::Orthographic,
            CameraKind::Panorama => CameraType::Panoramic,
        }
    }
}

/// Camera placement as the host describes it.
///
/// `direction` and `up` need not be orthogonal or unit length. `fov` is the
/// vertical field of view in radians and only applies to perspective
/// cameras.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraParams {
    pub position: Vec3,
    pub direction: Vec3,
    pub up: Vec3,
    pub near: f32,
    pub far: f32,
    pub fov: f32,
    pub kind: CameraType,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            direction: Vec3::Z,
            up: Vec3::Y,
            near: 1e-5,
            far: 1e5,
            fov: std::f32::consts::FRAC_PI_4,
            kind: CameraType::Perspective,
        }
    }
}

/// Camera as read back from the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub position: Vec3,
    pub direction: Vec3,
    pub up: Vec3,
    pub near: f32,
    pub far: f32,
    pub fov: f32,
    pub aspect: f32,
    pub kind: CameraType,
}

/// The core engine: one renderer session plus the scene graph driving it.
pub struct Engine<S: Session> {
    config: EngineConfig,
    session: S,
    graph: Option<SceneGraph>,
    width: u32,
    height: u32,
}

impl<S: Session> Engine<S> {
    #[must_use]
    pub fn new(config: EngineConfig, session: S) -> Self {
        let (width, height) = (config.width, config.height);
        Self {
            config,
            session,
            graph: None,
            width,
            height,
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn config_mut(&mut self) -> &mut EngineConfig {
        &mut self.config
    }

    #[inline]
    #[must_use]
    pub fn session(&self) -> &S {
        &self.session
    }

    #[inline]
    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    #[inline]
    #[must_use]
    pub fn scene(&self) -> &RenderScene {
        self.session.scene()
    }

    /// The scene graph, once the session is initialised.
    #[inline]
    #[must_use]
    pub fn graph(&self) -> Option<&SceneGraph> {
        self.graph.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.graph.is_some()
    }

    fn parts(&mut self) -> Result<(&mut SceneGraph, &mut RenderScene)> {
        let graph = self.graph.as_mut().ok_or(SceneError::SessionNotInitialized)?;
        Ok((graph, self.session.scene_mut()))
    }

    fn graph_ref(&self) -> Result<&SceneGraph> {
        self.graph.as_ref().ok_or(SceneError::SessionNotInitialized)
    }

    // ========================================================================
    // Session lifecycle
    // ========================================================================

    /// Installs the shared shaders and sizes the camera to the viewport.
    pub fn session_init(&mut self) -> Result<()> {
        if self.graph.is_some() {
            log::warn!("Session already initialised, re-initialising");
            self.session_exit();
        }

        let graph = SceneGraph::new(self.session.scene_mut(), self.config.max_depth)?;
        self.graph = Some(graph);
        self.sync_camera_film();

        log::info!(
            "Session initialised ({}x{}, {} samples)",
            self.width,
            self.height,
            self.config.samples
        );
        Ok(())
    }

    /// Stops rendering and drops every scene resource.
    pub fn session_exit(&mut self) {
        self.session.cancel(true);
        self.session.set_output_driver(None);
        self.session.set_progress_callback(None);
        self.session.scene_mut().clear();
        self.graph = None;
        log::info!("Session closed");
    }

    /// Discards accumulated samples and re-applies the configured
    /// parameters at the current viewport size.
    pub fn reset_session(&mut self) {
        let params = self.config.session_params();
        let buffer = BufferParams::full_frame(self.width, self.height);
        self.session.reset(&params, &buffer);
    }

    /// Resets and starts rendering the current scene.
    pub fn post_scene_update(&mut self) -> Result<()> {
        if self.graph.is_none() {
            return Err(SceneError::SessionNotInitialized);
        }
        self.reset_session();
        self.session.start();
        Ok(())
    }

    pub fn cancel_session(&mut self, blocking: bool) {
        self.session.cancel(blocking);
    }

    /// Resizes the film and camera. Resets a running session.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.config.width = width;
        self.config.height = height;

        self.sync_camera_film();
        if self.graph.is_some() {
            self.reset_session();
        }
    }

    /// Matches the camera film to the viewport and recomputes its
    /// viewplane.
    pub(crate) fn sync_camera_film(&mut self) {
        let (width, height) = (self.width, self.height);
        let mut camera = self.session.scene_mut().camera_mut();
        camera.full_width = width;
        camera.full_height = height;
        camera.compute_auto_viewplane();
    }

    #[must_use]
    pub fn viewport_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Drops every node, material and texture and starts from an empty
    /// scene with fresh shared shaders.
    pub fn clear_scene(&mut self) -> Result<()> {
        self.session.cancel(true);
        let (graph, scene) = self.parts()?;
        graph.clear(scene)?;
        log::info!("Scene cleared");
        Ok(())
    }

    /// Runs a garbage-collection pass. The session must not be rendering.
    pub fn clean_scene(&mut self) -> Result<GcReport> {
        let (graph, scene) = self.parts()?;
        Ok(graph.clean_scene(scene))
    }

    // ========================================================================
    // Camera
    // ========================================================================

    /// Places the camera and resets the session.
    pub fn set_camera(&mut self, params: &CameraParams) -> Result<()> {
        if self.graph.is_none() {
            return Err(SceneError::SessionNotInitialized);
        }
        let (right, up, dir) = orthonormal_basis(params.direction, params.up);

        {
            let mut camera = self.session.scene_mut().camera_mut();
            camera.matrix = Affine3A::from_mat3_translation(Mat3::from_cols(right, up, dir), params.position);
            camera.kind = params.kind.into();
            camera.nearclip = params.near;
            camera.farclip = params.far;
            if params.kind == CameraType::Perspective {
                camera.fov = params.fov;
            }
            camera.compute_auto_viewplane();
        }

        self.reset_session();
        Ok(())
    }

    #[must_use]
    pub fn camera(&self) -> CameraState {
        let camera = self.session.scene().camera();
        let axes = camera.matrix.matrix3;
        CameraState {
            position: camera.matrix.translation.into(),
            direction: axes.z_axis.into(),
            up: axes.y_axis.into(),
            near: camera.nearclip,
            far: camera.farclip,
            fov: camera.fov,
            aspect: camera.aspect(),
            kind: camera.kind.into(),
        }
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    pub fn add_node(
        &mut self,
        parent: Option<NodeKey>,
        id: ObjectId,
        name: &str,
        translation: Vec3,
        rotation: Quat,
        scale: Vec3,
    ) -> Result<NodeKey> {
        let (graph, scene) = self.parts()?;
        graph.add_node(scene, parent, id, name, translation, rotation, scale)
    }

    #[must_use]
    pub fn get_node(&self, id: ObjectId) -> Option<NodeKey> {
        self.graph.as_ref()?.get_node(id)
    }

    #[must_use]
    pub fn node(&self, key: NodeKey) -> Option<&SceneNode> {
        self.graph.as_ref()?.node(key)
    }

    pub fn remove_node(&mut self, node: NodeKey) -> Result<()> {
        let (graph, scene) = self.parts()?;
        graph.remove_node(scene, node)
    }

    pub fn update_node_transform(
        &mut self,
        node: NodeKey,
        translation: Vec3,
        rotation: Quat,
        scale: Vec3,
    ) -> Result<()> {
        let (graph, scene) = self.parts()?;
        graph.update_transform(scene, node, translation, rotation, scale)
    }

    pub fn update_node_visibility(&mut self, node: NodeKey, visible: bool) -> Result<()> {
        let (graph, scene) = self.parts()?;
        graph.update_visibility(scene, node, visible)
    }

    #[must_use]
    pub fn effective_visibility(&self, node: NodeKey) -> Option<bool> {
        self.graph.as_ref()?.effective_visibility(node)
    }

    // ========================================================================
    // Resources
    // ========================================================================

    pub fn add_texture(&mut self, name: &str, bytes: &[u8], mime_type: &str, srgb: bool) -> Result<ImageKey> {
        let (graph, scene) = self.parts()?;
        graph.add_texture(scene, name, bytes, mime_type, srgb)
    }

    pub fn add_material(&mut self, desc: &MaterialDesc) -> Result<MaterialKey> {
        let (graph, scene) = self.parts()?;
        graph.add_material(scene, desc)
    }

    pub fn add_mesh(&mut self, desc: &MeshDesc<'_>) -> Result<GeometryKey> {
        let (graph, scene) = self.parts()?;
        graph.add_mesh(scene, desc)
    }

    pub fn update_mesh_materials(
        &mut self,
        mesh: GeometryKey,
        materials: &[Option<MaterialKey>],
        mode: RenderMode,
    ) -> Result<()> {
        let (graph, scene) = self.parts()?;
        graph.update_mesh_materials(scene, mesh, materials, mode)
    }

    pub fn assign_mesh_to_node(&mut self, node: NodeKey, mesh: GeometryKey) -> Result<ObjectKey> {
        let (graph, scene) = self.parts()?;
        graph.assign_mesh_to_node(scene, node, mesh)
    }

    pub fn add_light_to_node(&mut self, node: NodeKey, desc: &LightDesc) -> Result<LightKey> {
        let (graph, scene) = self.parts()?;
        graph.add_light_to_node(scene, node, desc)
    }

    pub fn remove_light_from_node(&mut self, node: NodeKey, light: LightKey) -> Result<()> {
        let (graph, scene) = self.parts()?;
        graph.remove_light_from_node(scene, node, light)
    }

    // ========================================================================
    // World
    // ========================================================================

    pub fn set_background(&mut self, settings: BackgroundSettings) -> Result<()> {
        let (graph, scene) = self.parts()?;
        graph.set_background(scene, settings);
        Ok(())
    }

    /// Sets the depth render mode's clamp distance.
    pub fn set_max_depth(&mut self, max_depth: f32) -> Result<()> {
        self.config.max_depth = max_depth;
        let (graph, scene) = self.parts()?;
        let patched = graph.set_max_depth(scene, max_depth);
        log::debug!("Max depth set to {max_depth}, {patched} shader(s) patched");
        Ok(())
    }

    /// Points the scene's background slot at the active background shader.
    pub(crate) fn sync_background(&mut self) -> Result<()> {
        let shader = self.graph_ref()?.background_shader();
        self.session.scene_mut().set_default_background(Some(shader));
        Ok(())
    }
}
