use rustc_hash::FxHashSet;
use slotmap::new_key_type;

use crate::renderer::scene::{ImageKey, ShaderKey};
use crate::shader::{RenderMode, ShaderVariants};

new_key_type! {
    /// Opaque material handle handed to the host.
    pub struct MaterialKey;
}

/// A host material as registered in the scene: its four compiled shader
/// variants plus the textures they sample.
#[derive(Debug, Clone)]
pub struct Material {
    pub(crate) name: String,
    pub(crate) shaders: ShaderVariants<ShaderKey>,
    pub(crate) used_images: FxHashSet<ImageKey>,
}

impl Material {
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn shader(&self, mode: RenderMode) -> ShaderKey {
        *self.shaders.get(mode)
    }

    #[inline]
    #[must_use]
    pub fn shaders(&self) -> &ShaderVariants<ShaderKey> {
        &self.shaders
    }

    #[inline]
    #[must_use]
    pub fn uses_image(&self, image: ImageKey) -> bool {
        self.used_images.contains(&image)
    }

    pub fn used_images(&self) -> impl Iterator<Item = ImageKey> + '_ {
        self.used_images.iter().copied()
    }
}
