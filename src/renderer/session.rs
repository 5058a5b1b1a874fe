use super::output::OutputDriver;
use super::scene::RenderScene;

/// Render-loop parameters handed to [`Session::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionParams {
    pub samples: u32,
    /// Offline (batch) rendering without a display.
    pub background: bool,
    /// Worker thread count; zero lets the renderer decide.
    pub threads: usize,
    pub use_auto_tile: bool,
    pub tile_size: u32,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            samples: 128,
            background: false,
            threads: 0,
            use_auto_tile: false,
            tile_size: 0,
        }
    }
}

/// Render-buffer dimensions handed to [`Session::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferParams {
    pub width: u32,
    pub height: u32,
    pub full_width: u32,
    pub full_height: u32,
}

impl BufferParams {
    #[must_use]
    pub fn full_frame(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            full_width: width,
            full_height: height,
        }
    }
}

/// Snapshot of a session's progress channel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Progress {
    pub current_sample: u32,
    pub total_samples: u32,
    /// Completion in `[0, 1]`.
    pub progress: f64,
    pub status: String,
    pub substatus: String,
}

pub type ProgressCallback = Box<dyn FnMut(&Progress) + Send>;

/// Viewport a session draws its display buffer into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawParams {
    pub width: u32,
    pub height: u32,
    pub full_width: u32,
    pub full_height: u32,
}

/// The external renderer's session handle.
///
/// Calls are opaque, non-reentrant requests. Progress comes back through
/// the callback installed with [`Session::set_progress_callback`], possibly
/// from the renderer's own worker threads.
pub trait Session {
    fn scene(&self) -> &RenderScene;
    fn scene_mut(&mut self) -> &mut RenderScene;

    /// Discards accumulated samples and adopts new parameters.
    fn reset(&mut self, params: &SessionParams, buffer: &BufferParams);
    fn cancel(&mut self, blocking: bool);
    fn start(&mut self);
    /// Blocks until the running render finishes.
    fn wait(&mut self);

    fn progress(&self) -> Progress;
    fn set_progress_callback(&mut self, callback: Option<ProgressCallback>);
    fn set_output_driver(&mut self, driver: Option<Box<dyn OutputDriver>>);

    /// Draws the display buffer. Returns `false` when nothing was drawn.
    fn draw(&mut self, params: &DrawParams) -> bool;
}
