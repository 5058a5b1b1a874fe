//! Offline front-end: render one frame and write it to disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::errors::{Result, SceneError};
use crate::renderer::output::{FileOutputDriver, FileOutputSettings};
use crate::renderer::scene::{CameraKind, PassType};
use crate::renderer::session::{Progress, Session};

/// Status line reported for a progress update.
#[must_use]
pub fn offline_status(progress: &Progress) -> String {
    let mut status = progress.status.clone();
    if !progress.substatus.is_empty() {
        status.push_str(": ");
        status.push_str(&progress.substatus);
    }
    format!(
        "OFFLINE_CYCLES_STATUS: Progress {:05.2}   {status}",
        progress.progress * 100.0
    )
}

pub struct OfflineRenderer<S: Session> {
    engine: Engine<S>,
    output: Option<Arc<Mutex<FileOutputSettings>>>,
    single_channel_float: bool,
}

impl<S: Session> OfflineRenderer<S> {
    #[must_use]
    pub fn new(mut config: EngineConfig, session: S) -> Self {
        config.background = true;
        Self {
            engine: Engine::new(config, session),
            output: None,
            single_channel_float: false,
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

    /// Samples per pixel for subsequent renders.
    pub fn set_samples(&mut self, samples: u32) {
        self.engine.config_mut().samples = samples;
    }

    /// Write only the red channel, as float, in subsequent renders.
    pub fn set_single_channel_float(&mut self, enabled: bool) {
        self.single_channel_float = enabled;
        if let Some(output) = &self.output {
            output.lock().single_channel_float = enabled;
        }
    }

    /// Initialises the session and registers the configured output pass
    /// with a file writer for it.
    pub fn session_init(&mut self) -> Result<()> {
        self.engine.session_init()?;

        let pass = self.engine.config().output_pass.clone();
        let kind = PassType::from_name(&pass).unwrap_or_else(|| {
            log::warn!("Unknown output pass '{pass}', treating it as combined");
            PassType::Combined
        });
        self.engine.session_mut().scene_mut().add_pass(pass.clone(), kind);

        let (driver, settings) = FileOutputDriver::new(
            pass,
            FileOutputSettings {
                single_channel_float: self.single_channel_float,
                ..FileOutputSettings::default()
            },
        );
        self.output = Some(settings);

        let quiet = self.engine.config().quiet;
        let session = self.engine.session_mut();
        session.set_output_driver(Some(Box::new(driver)));
        session.set_progress_callback(Some(Box::new(move |progress: &Progress| {
            if !quiet {
                log::debug!("{}", offline_status(progress));
            }
        })));
        Ok(())
    }

    pub fn session_exit(&mut self) {
        self.engine.session_exit();
        self.output = None;
        log::info!("OFFLINE_CYCLES_STATUS: Finished");
    }

    /// Makes the active background current and restarts rendering.
    pub fn post_scene_update(&mut self) -> Result<()> {
        self.engine.sync_background()?;
        self.engine.post_scene_update()
    }

    /// Renders one frame and blocks until it is written to `path`.
    ///
    /// The output format follows the file extension.
    pub fn render_to_file(&mut self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let output = self
            .output
            .clone()
            .ok_or(SceneError::SessionNotInitialized)?;

        {
            let mut settings = output.lock();
            settings.path = path.as_ref().to_path_buf();
            settings.flip_horizontally = self.engine.scene().camera().kind != CameraKind::Panorama;
            settings.single_channel_float = self.single_channel_float;
            settings.last_result = None;
        }

        self.engine.sync_background()?;
        self.engine.post_scene_update()?;
        self.engine.session_mut().wait();

        let outcome = output.lock().last_result.take();
        match outcome {
            Some(Ok(path)) => Ok(path),
            Some(Err(msg)) => Err(SceneError::Io(std::io::Error::other(msg))),
            None => Err(SceneError::Io(std::io::Error::other(
                "the renderer delivered no full frame",
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_format() {
        let progress = Progress {
            current_sample: 4,
            total_samples: 16,
            progress: 0.25,
            status: "Rendering".to_string(),
            substatus: "Sample 4/16".to_string(),
        };
        assert_eq!(
            offline_status(&progress),
            "OFFLINE_CYCLES_STATUS: Progress 25.00   Rendering: Sample 4/16"
        );

        let progress = Progress {
            progress: 0.05,
            status: "Loading".to_string(),
            ..Progress::default()
        };
        assert_eq!(
            offline_status(&progress),
            "OFFLINE_CYCLES_STATUS: Progress 05.00   Loading"
        );
    }
}
