use glam::{Affine3A, Vec2, Vec3};

use crate::renderer::scene::ImageKey;
use crate::renderer::shader_graph::{GraphNodeId, ShaderGraph, ShaderNode, TextureMapping};

/// Placement of a texture on the UV plane, as the host authors it.
///
/// The transform describes where the texture *appears*: offset moves it,
/// rotation turns it about its placed corner, scale stretches it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureTransform {
    pub offset: Vec2,
    /// Radians, counter-clockwise.
    pub rotation: f32,
    pub scale: Vec2,
}

impl Default for TextureTransform {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            rotation: 0.0,
            scale: Vec2::ONE,
        }
    }
}

impl TextureTransform {
    #[must_use]
    pub fn new(offset: Vec2, rotation: f32, scale: Vec2) -> Self {
        Self {
            offset,
            rotation,
            scale,
        }
    }

    /// The scale with zero components replaced by one.
    fn safe_scale(&self) -> Vec2 {
        let fix = |v: f32, axis: &str| {
            if v == 0.0 {
                log::debug!("Zero texture scale on {axis}, substituting 1");
                1.0
            } else {
                v
            }
        };
        Vec2::new(fix(self.scale.x, "u"), fix(self.scale.y, "v"))
    }

    /// Derives the sampler-side mapping that makes the texture appear as
    /// described.
    ///
    /// The placement matrix is `M = T · P⁻¹ · R · P · S`, where the pivot
    /// `P` moves the rotation centre to the texture's placed corner (UVs are
    /// flipped vertically on ingestion). The sampler applies the inverse:
    /// translation `M⁻¹ · 0`, rotation `-θ` about Z, scale `1/s`.
    #[must_use]
    pub fn sampler_mapping(&self) -> TextureMapping {
        let scale = self.safe_scale();

        let s = Affine3A::from_scale(Vec3::new(scale.x, scale.y, 1.0));
        let r = Affine3A::from_rotation_z(self.rotation);
        let t = Affine3A::from_translation(Vec3::new(
            self.offset.x,
            1.0 - self.offset.y - scale.y,
            0.0,
        ));
        let p = Affine3A::from_translation(Vec3::new(0.0, -scale.y, 0.0));

        let m = t * p.inverse() * r * p * s;

        TextureMapping {
            translation: m.inverse().transform_point3(Vec3::ZERO),
            rotation: Vec3::new(0.0, 0.0, -self.rotation),
            scale: Vec3::new(1.0 / scale.x, 1.0 / scale.y, 1.0),
        }
    }
}

/// A texture reference plus its placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureBinding {
    pub texture: ImageKey,
    pub transform: TextureTransform,
}

impl TextureBinding {
    #[must_use]
    pub fn new(texture: ImageKey, transform: TextureTransform) -> Self {
        Self { texture, transform }
    }

    /// Adds an image-texture node sampling this binding.
    pub fn add_to(&self, graph: &mut ShaderGraph) -> GraphNodeId {
        graph.add(ShaderNode::ImageTexture {
            image: Some(self.texture),
            mapping: self.transform.sampler_mapping(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_placement_maps_to_identity() {
        let mapping = TextureTransform::default().sampler_mapping();
        assert!(mapping.translation.length() < 1e-6);
        assert_eq!(mapping.rotation, Vec3::ZERO);
        assert_eq!(mapping.scale, Vec3::ONE);
    }

    #[test]
    fn zero_scale_is_substituted() {
        let tt = TextureTransform::new(Vec2::ZERO, 0.0, Vec2::new(0.0, 2.0));
        let mapping = tt.sampler_mapping();
        assert_eq!(mapping.scale, Vec3::new(1.0, 0.5, 1.0));
        assert!(mapping.translation.is_finite());
    }
}
