use glam::Affine3A;
use smallvec::SmallVec;

use super::transform::Transform;
use super::{NodeKey, ObjectId};
use crate::renderer::scene::{LightKey, ObjectKey, TransformId};

/// One placed object in the scene graph.
///
/// # Hierarchy
///
/// Nodes form a tree through `parent`/`children` keys into the owning
/// [`SceneGraph`](super::SceneGraph) arena. The arena is the only owner; a
/// parent key is a plain lookup, never a strong reference.
///
/// # Attachments
///
/// A node carries at most one mesh instance and any number of lights. Both
/// live in the renderer scene and are keyed here; their transform copies
/// are tagged with this node's [`TransformId`].
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub(crate) id: ObjectId,
    pub(crate) name: String,

    // === Hierarchy ===
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,

    // === Spatial ===
    pub(crate) transform: Transform,
    pub(crate) transform_id: TransformId,

    // === State ===
    /// Last visibility set on this node (or pushed down by an ancestor).
    pub(crate) visible: bool,

    // === Attachments ===
    pub(crate) mesh_object: Option<ObjectKey>,
    pub(crate) lights: SmallVec<[LightKey; 1]>,
}

impl SceneNode {
    pub(crate) fn new(
        id: ObjectId,
        name: &str,
        parent: Option<NodeKey>,
        transform: Transform,
        transform_id: TransformId,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            parent,
            children: Vec::new(),
            transform,
            transform_id,
            visible: true,
            mesh_object: None,
            lights: SmallVec::new(),
        }
    }

    /// Host-supplied identifier.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    #[inline]
    #[must_use]
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Composed `parent · T · R · S` matrix.
    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine3A {
        self.transform.world_matrix()
    }

    #[inline]
    #[must_use]
    pub fn transform_id(&self) -> TransformId {
        self.transform_id
    }

    /// The node's own flag. See
    /// [`SceneGraph::effective_visibility`](super::SceneGraph::effective_visibility)
    /// for the value that accounts for ancestors.
    #[inline]
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    #[inline]
    #[must_use]
    pub fn mesh_object(&self) -> Option<ObjectKey> {
        self.mesh_object
    }

    #[inline]
    #[must_use]
    pub fn lights(&self) -> &[LightKey] {
        &self.lights
    }
}
