//! Graphics-context locking for interactive display.
//!
//! Drawing needs the host's graphics context to be current on the drawing
//! thread, and the host may share that context with other components. Every
//! draw holds a [`ContextLock`] for its whole duration.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::errors::{Result, SceneError};

/// A host-owned graphics context the display can make current.
pub trait GraphicsContext {
    /// Makes the context current on this thread.
    fn enable(&mut self) -> bool;
    /// Releases the context from this thread.
    fn disable(&mut self) -> bool;
    fn set_viewport(&mut self, width: u32, height: u32);
}

/// Exclusive lock around a shared graphics context.
///
/// Clones share the same underlying mutex, so the host can hand one clone to
/// each component that touches the context.
#[derive(Debug, Clone, Default)]
pub struct ContextLock {
    mutex: Arc<Mutex<()>>,
}

impl ContextLock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks and makes `context` current.
    ///
    /// The returned guard disables the context and releases the lock when it
    /// goes out of scope. If the context cannot be made current the lock is
    /// released before returning the error.
    pub fn acquire<'a, C: GraphicsContext + ?Sized>(
        &'a self,
        context: &'a mut C,
    ) -> Result<ContextGuard<'a, C>> {
        let lock = self.mutex.lock();
        if !context.enable() {
            context.disable();
            drop(lock);
            log::error!("Failed to make the graphics context current");
            return Err(SceneError::GraphicsContext(
                "failed to make the graphics context current".into(),
            ));
        }
        Ok(ContextGuard {
            context,
            _lock: lock,
        })
    }

    /// Whether some guard currently holds the lock.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.mutex.is_locked()
    }
}

/// RAII guard returned by [`ContextLock::acquire`].
pub struct ContextGuard<'a, C: GraphicsContext + ?Sized> {
    context: &'a mut C,
    _lock: MutexGuard<'a, ()>,
}

impl<C: GraphicsContext + ?Sized> std::ops::Deref for ContextGuard<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.context
    }
}

impl<C: GraphicsContext + ?Sized> std::ops::DerefMut for ContextGuard<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.context
    }
}

impl<C: GraphicsContext + ?Sized> Drop for ContextGuard<'_, C> {
    fn drop(&mut self) {
        if !self.context.disable() {
            log::warn!("Failed to release the graphics context");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeContext {
        fail_enable: bool,
        current: bool,
    }

    impl GraphicsContext for FakeContext {
        fn enable(&mut self) -> bool {
            self.current = !self.fail_enable;
            self.current
        }

        fn disable(&mut self) -> bool {
            self.current = false;
            true
        }

        fn set_viewport(&mut self, _width: u32, _height: u32) {}
    }

    #[test]
    fn guard_releases_on_drop() {
        let lock = ContextLock::new();
        let mut ctx = FakeContext::default();
        {
            let guard = lock.acquire(&mut ctx).unwrap();
            assert!(guard.current);
            assert!(lock.is_locked());
        }
        assert!(!lock.is_locked());
        assert!(!ctx.current);
    }

    #[test]
    fn failed_enable_releases_lock() {
        let lock = ContextLock::new();
        let mut ctx = FakeContext {
            fail_enable: true,
            ..Default::default()
        };
        assert!(lock.acquire(&mut ctx).is_err());
        assert!(!lock.is_locked());
    }
}
