//! Interactive front-end: progressive rendering into a host display.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::errors::Result;
use crate::renderer::display::{ContextLock, GraphicsContext};
use crate::renderer::output::{OutputDriver, RenderTile};
use crate::renderer::session::{DrawParams, Progress, Session};

/// Status lines reported for a progress update.
///
/// While sampling, a `PROGRESS n/N` line precedes the status. Once the frame
/// has been fully delivered the sample count is pinned to the total.
#[must_use]
pub fn interactive_status(progress: &Progress, frame_finished: bool) -> Vec<String> {
    if progress.status.starts_with("Sample ") {
        let total = progress.total_samples;
        let sample = if frame_finished {
            total
        } else {
            progress.current_sample
        };
        return vec![
            format!("INTERACTIVE_CYCLES_PROGRESS: {sample}/{total}"),
            "INTERACTIVE_CYCLES_STATUS: Pathtracing...".to_string(),
        ];
    }

    let mut status = if progress.status == "Rendering Done" {
        "Ready".to_string()
    } else {
        progress.status.clone()
    };
    if !progress.substatus.is_empty() {
        status.push_str(": ");
        status.push_str(&progress.substatus);
    }
    vec![format!("INTERACTIVE_CYCLES_STATUS: {status}")]
}

/// Flags the frame as finished once the renderer hands over a tile.
struct FrameSignal {
    finished: Arc<AtomicBool>,
}

impl OutputDriver for FrameSignal {
    fn write_render_tile(&mut self, _tile: &RenderTile) {
        self.finished.store(true, Ordering::Release);
    }
}

pub struct InteractiveRenderer<S: Session> {
    engine: Engine<S>,
    suspended: bool,
    frame_finished: Arc<AtomicBool>,
    lock: ContextLock,
}

impl<S: Session> InteractiveRenderer<S> {
    #[must_use]
    pub fn new(config: EngineConfig, session: S) -> Self {
        Self::with_lock(config, session, ContextLock::new())
    }

    /// Shares `lock` with other users of the host graphics context.
    #[must_use]
    pub fn with_lock(config: EngineConfig, session: S, lock: ContextLock) -> Self {
        Self {
            engine: Engine::new(config, session),
            suspended: false,
            frame_finished: Arc::new(AtomicBool::new(false)),
            lock,
        }
    }

    #[inline]
    #[must_use]
    pub fn engine(&self) -> &Engine<S> {
        &self.engine
    }

    #[inline]
    pub fn engine_mut(&mut self) -> &mut Engine<S> {
        &mut self.engine
    }

    #[inline]
    #[must_use]
    pub fn context_lock(&self) -> &ContextLock {
        &self.lock
    }

    #[must_use]
    pub fn frame_finished(&self) -> bool {
        self.frame_finished.load(Ordering::Acquire)
    }

    #[inline]
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn session_init(&mut self) -> Result<()> {
        self.engine.session_init()?;

        let session = self.engine.session_mut();
        session.set_output_driver(Some(Box::new(FrameSignal {
            finished: Arc::clone(&self.frame_finished),
        })));

        let finished = Arc::clone(&self.frame_finished);
        let quiet = self.engine.config().quiet;
        self.engine
            .session_mut()
            .set_progress_callback(Some(Box::new(move |progress: &Progress| {
                if quiet {
                    return;
                }
                for line in interactive_status(progress, finished.load(Ordering::Acquire)) {
                    log::info!("{line}");
                }
            })));
        Ok(())
    }

    pub fn session_exit(&mut self) {
        self.engine.session_exit();
        log::info!("Finished Rendering.");
    }

    pub fn reset_session(&mut self) {
        self.frame_finished.store(false, Ordering::Release);
        self.engine.reset_session();
    }

    /// Re-syncs the camera film size and restarts progressive rendering.
    pub fn post_scene_update(&mut self) -> Result<()> {
        self.engine.sync_camera_film();
        self.frame_finished.store(false, Ordering::Release);
        self.engine.post_scene_update()
    }

    /// Suspending cancels the render; resuming restarts it.
    pub fn set_suspended(&mut self, suspended: bool) -> Result<()> {
        self.suspended = suspended;
        if suspended {
            self.engine.cancel_session(true);
            Ok(())
        } else {
            self.post_scene_update()
        }
    }

    /// Draws the current display buffer into `context`.
    ///
    /// Holds the context lock for the whole draw. Returns `Ok(false)` when
    /// suspended or when the session had nothing to draw.
    pub fn draw<C: GraphicsContext + ?Sized>(&mut self, context: &mut C) -> Result<bool> {
        if self.suspended {
            return Ok(false);
        }

        let (width, height) = self.engine.viewport_size();
        let mut guard = self.lock.acquire(context)?;
        guard.set_viewport(width, height);

        let drawn = self.engine.session_mut().draw(&DrawParams {
            width,
            height,
            full_width: width,
            full_height: height,
        });
        Ok(drawn)
    }
}
