//! Scene update tagging.
//!
//! A renderer session only re-syncs scene data that was tagged since the
//! last reset. Every `RenderScene` insert, delete and in-place edit bumps
//! one shared [`UpdateTag`], so comparing `RenderScene::version` before and
//! after a call tells whether the scene needs a reset.
//!
//! In-place edits go through [`TaggedMut`], which bumps the tag when the
//! edit ends. Patching a max-depth constant or a sky sun angle inside a
//! live shader graph therefore marks the scene dirty without a separate
//! call.

/// The scene's update counter. Only ever grows (wrapping).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateTag {
    version: u64,
}

impl UpdateTag {
    /// Marks the scene dirty.
    #[inline]
    pub fn tag(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }
}

/// Write access to one object, light, shader, geometry buffer or the camera
/// inside a `RenderScene`.
///
/// Obtained from the scene's `*_mut` accessors. The scene's [`UpdateTag`]
/// is bumped exactly once per borrow, when this value is dropped, however
/// many fields were touched.
pub struct TaggedMut<'a, T> {
    item: &'a mut T,
    tag: &'a mut UpdateTag,
}

impl<'a, T> TaggedMut<'a, T> {
    pub(crate) fn new(item: &'a mut T, tag: &'a mut UpdateTag) -> Self {
        Self { item, tag }
    }
}

impl<T> std::ops::Deref for TaggedMut<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.item
    }
}

impl<T> std::ops::DerefMut for TaggedMut<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.item
    }
}

impl<T> Drop for TaggedMut<'_, T> {
    fn drop(&mut self) {
        self.tag.tag();
    }
}
