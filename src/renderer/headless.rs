//! A [`Session`] that renders nothing.
//!
//! `HeadlessSession` keeps a real [`RenderScene`] and honours the session
//! protocol, but instead of path tracing it records every lifecycle call
//! and, on `wait()` after `start()`, delivers one blank full-frame tile to
//! the output driver. It backs tests and hosts that only need the scene
//! bookkeeping.

use super::output::{OutputDriver, RenderTile};
use super::scene::RenderScene;
use super::session::{BufferParams, DrawParams, Progress, ProgressCallback, Session, SessionParams};

/// One recorded session call.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Reset {
        samples: u32,
        width: u32,
        height: u32,
    },
    Cancel {
        blocking: bool,
    },
    Start,
    Wait,
    Draw {
        width: u32,
        height: u32,
    },
}

pub struct HeadlessSession {
    scene: RenderScene,
    params: SessionParams,
    buffer: BufferParams,
    running: bool,
    progress: Progress,
    callback: Option<ProgressCallback>,
    driver: Option<Box<dyn OutputDriver>>,
    events: Vec<SessionEvent>,
    /// Value written to every pixel of the delivered frame.
    clear_color: [f32; 4],
}

impl Default for HeadlessSession {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessSession {
    #[must_use]
    pub fn new() -> Self {
        Self {
            scene: RenderScene::new(),
            params: SessionParams::default(),
            buffer: BufferParams::full_frame(0, 0),
            running: false,
            progress: Progress::default(),
            callback: None,
            driver: None,
            events: Vec::new(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }

    /// Sets the colour of the frames handed to the output driver.
    #[must_use]
    pub fn with_clear_color(mut self, rgba: [f32; 4]) -> Self {
        self.clear_color = rgba;
        self
    }

    #[must_use]
    pub fn events(&self) -> &[SessionEvent] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn params(&self) -> &SessionParams {
        &self.params
    }

    #[must_use]
    pub fn buffer(&self) -> &BufferParams {
        &self.buffer
    }

    fn set_status(&mut self, status: &str, substatus: &str) {
        self.progress.status = status.to_string();
        self.progress.substatus = substatus.to_string();
        if let Some(callback) = self.callback.as_mut() {
            callback(&self.progress);
        }
    }
}

impl Session for HeadlessSession {
    fn scene(&self) -> &RenderScene {
        &self.scene
    }

    fn scene_mut(&mut self) -> &mut RenderScene {
        &mut self.scene
    }

    fn reset(&mut self, params: &SessionParams, buffer: &BufferParams) {
        self.events.push(SessionEvent::Reset {
            samples: params.samples,
            width: buffer.width,
            height: buffer.height,
        });
        self.params = *params;
        self.buffer = *buffer;
        self.running = false;
        self.progress = Progress {
            total_samples: params.samples,
            ..Progress::default()
        };
    }

    fn cancel(&mut self, blocking: bool) {
        self.events.push(SessionEvent::Cancel { blocking });
        if self.running {
            self.running = false;
            self.set_status("Cancel", "");
        }
    }

    fn start(&mut self) {
        self.events.push(SessionEvent::Start);
        self.running = true;
        self.set_status("Initializing", "");
    }

    fn wait(&mut self) {
        self.events.push(SessionEvent::Wait);
        if !self.running {
            return;
        }

        let total = self.params.samples;
        self.progress.current_sample = total;
        self.progress.progress = 1.0;
        self.set_status(&format!("Sample {total}/{total}"), "");

        let width = self.buffer.full_width;
        let height = self.buffer.full_height;
        if width > 0 && height > 0 {
            if let Some(driver) = self.driver.as_mut() {
                // Every pass registered on the film gets a frame; a scene
                // with no passes still produces the combined one.
                let mut passes: Vec<String> =
                    self.scene.passes().iter().map(|p| p.name.clone()).collect();
                if passes.is_empty() {
                    passes.push("combined".to_string());
                }
                for pass in passes {
                    driver.write_render_tile(&RenderTile::filled(
                        &pass,
                        width,
                        height,
                        self.clear_color,
                    ));
                }
            }
        }

        self.running = false;
        self.set_status("Rendering Done", "");
    }

    fn progress(&self) -> Progress {
        self.progress.clone()
    }

    fn set_progress_callback(&mut self, callback: Option<ProgressCallback>) {
        self.callback = callback;
    }

    fn set_output_driver(&mut self, driver: Option<Box<dyn OutputDriver>>) {
        self.driver = driver;
    }

    fn draw(&mut self, params: &DrawParams) -> bool {
        self.events.push(SessionEvent::Draw {
            width: params.width,
            height: params.height,
        });
        self.progress.current_sample > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct Collect(Arc<Mutex<Vec<RenderTile>>>);

    impl OutputDriver for Collect {
        fn write_render_tile(&mut self, tile: &RenderTile) {
            self.0.lock().push(tile.clone());
        }
    }

    #[test]
    fn wait_after_start_delivers_one_frame() {
        let tiles = Arc::new(Mutex::new(Vec::new()));
        let mut session = HeadlessSession::new();
        session.set_output_driver(Some(Box::new(Collect(Arc::clone(&tiles)))));

        session.reset(&SessionParams::default(), &BufferParams::full_frame(4, 2));
        session.start();
        session.wait();

        let tiles = tiles.lock();
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].pixels.len(), 4 * 2 * 4);
        assert_eq!(session.progress().status, "Rendering Done");
    }

    #[test]
    fn wait_without_start_is_a_no_op() {
        let tiles = Arc::new(Mutex::new(Vec::new()));
        let mut session = HeadlessSession::new();
        session.set_output_driver(Some(Box::new(Collect(Arc::clone(&tiles)))));
        session.reset(&SessionParams::default(), &BufferParams::full_frame(4, 2));
        session.wait();
        assert!(tiles.lock().is_empty());
    }
}
