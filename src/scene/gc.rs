//! Mark-and-sweep over the wrapper registries.
//!
//! Roots are the renderer's live objects and lights. From them the pass
//! marks reachable transforms, geometry and shaders, then sweeps:
//!
//! 1. materials whose four variants are all unmarked (all four shaders are
//!    deleted together),
//! 2. textures no surviving material samples,
//! 3. nodes whose transform is unmarked and that are not an ancestor of a
//!    marked node.
//!
//! Geometry no object instances is only reported. The pass mutates renderer
//! lists directly and must not overlap a running render.

use rustc_hash::FxHashSet;

use super::graph::SceneGraph;
use super::NodeKey;
use crate::renderer::scene::{GeometryKey, ImageKey, RenderScene, ShaderKey, TransformId};

/// What a [`SceneGraph::clean_scene`] pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcReport {
    pub materials_deleted: usize,
    pub images_deleted: usize,
    pub nodes_dropped: usize,
    /// Geometry buffers no object instances. Left in place.
    pub unreferenced_geometry: usize,
}

impl GcReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.materials_deleted == 0 && self.images_deleted == 0 && self.nodes_dropped == 0
    }
}

#[derive(Default)]
struct Reachable {
    transforms: FxHashSet<TransformId>,
    geometry: FxHashSet<GeometryKey>,
    shaders: FxHashSet<ShaderKey>,
}

fn mark(scene: &RenderScene) -> Reachable {
    let mut reachable = Reachable::default();

    for (_, object) in scene.objects() {
        reachable.transforms.insert(object.transform_id);
        reachable.geometry.insert(object.geometry);
    }
    for (_, light) in scene.lights() {
        reachable.transforms.insert(light.transform_id);
    }

    for &geometry in &reachable.geometry {
        if let Some(geometry) = scene.geometry(geometry) {
            reachable.shaders.extend(geometry.used_shaders.iter().copied());
        }
    }
    reachable
}

impl SceneGraph {
    /// Deletes every wrapper-tracked resource the live scene no longer
    /// reaches. Running it twice in a row deletes nothing the second time.
    ///
    /// A node survives when its own transform is reachable *or* when it is an
    /// ancestor of such a node. Grouping nodes with no mesh or light of their
    /// own are therefore kept as long as a live descendant composes its world
    /// matrix through them; only whole unreachable branches are dropped.
    /// Geometry is counted in [`GcReport::unreferenced_geometry`] and left
    /// for the renderer to delete.
    pub fn clean_scene(&mut self, scene: &mut RenderScene) -> GcReport {
        let reachable = mark(scene);
        let mut report = GcReport::default();

        // === Materials ===
        let dead: Vec<_> = self
            .materials
            .iter()
            .filter(|(_, m)| !m.shaders.iter().any(|(_, s)| reachable.shaders.contains(s)))
            .map(|(key, _)| key)
            .collect();
        for key in dead {
            if let Some(material) = self.materials.remove(key) {
                for (_, &shader) in material.shaders.iter() {
                    scene.delete_shader(shader);
                }
                log::debug!("GC: deleted material '{}'", material.name);
                report.materials_deleted += 1;
            }
        }

        // === Textures ===
        let live_images: FxHashSet<ImageKey> = self
            .materials
            .values()
            .flat_map(|m| m.used_images())
            .collect();
        let dead: Vec<ImageKey> = self
            .textures
            .iter()
            .filter(|k| !live_images.contains(k))
            .copied()
            .collect();
        for key in dead {
            self.textures.remove(&key);
            scene.delete_image(key);
            report.images_deleted += 1;
        }

        // === Nodes ===
        let mut keep: FxHashSet<NodeKey> = FxHashSet::default();
        for (key, node) in &self.nodes {
            if !reachable.transforms.contains(&node.transform_id) {
                continue;
            }
            let mut cursor = Some(key);
            while let Some(k) = cursor {
                if !keep.insert(k) {
                    break;
                }
                cursor = self.nodes.get(k).and_then(|n| n.parent);
            }
        }

        let dropped: Vec<NodeKey> = self.nodes.keys().filter(|k| !keep.contains(k)).collect();
        for key in dropped {
            let Some(node) = self.nodes.remove(key) else {
                continue;
            };
            match node.parent.and_then(|p| self.nodes.get_mut(p)) {
                Some(parent) => parent.children.retain(|&c| c != key),
                None => self.roots.retain(|&r| r != key),
            }
            if self.ids.get(&node.id) == Some(&key) {
                self.ids.remove(&node.id);
            }
            report.nodes_dropped += 1;
        }

        report.unreferenced_geometry = scene
            .geometries()
            .filter(|(key, _)| !reachable.geometry.contains(key))
            .count();

        log::debug!("GC: {report:?}");
        report
    }
}
