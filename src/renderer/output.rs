//! Output drivers: where finished render tiles go.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{DynamicImage, ImageFormat, Rgba32FImage};
use parking_lot::Mutex;

use crate::errors::{Result, SceneError};

/// Gamma applied to colour channels written to non-float formats.
const DISPLAY_GAMMA: f32 = 1.0 / 2.2;

/// A block of rendered pixels for one pass.
///
/// Pixels are RGBA `f32`, rows ordered bottom-up.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTile {
    pub pass: String,
    pub width: u32,
    pub height: u32,
    pub full_width: u32,
    pub full_height: u32,
    pub pixels: Vec<f32>,
}

impl RenderTile {
    /// A full-frame tile filled with one colour.
    #[must_use]
    pub fn filled(pass: &str, width: u32, height: u32, rgba: [f32; 4]) -> Self {
        let count = width as usize * height as usize;
        Self {
            pass: pass.to_string(),
            width,
            height,
            full_width: width,
            full_height: height,
            pixels: rgba.repeat(count),
        }
    }

    #[must_use]
    pub fn is_full_frame(&self) -> bool {
        self.width == self.full_width && self.height == self.full_height
    }
}

/// Receives tiles from a [`Session`](super::session::Session).
pub trait OutputDriver: Send {
    fn write_render_tile(&mut self, tile: &RenderTile);
}

// ============================================================================
// File output
// ============================================================================

/// Settings shared between a [`FileOutputDriver`] installed in a session
/// and the front-end that configures it.
#[derive(Debug, Clone, Default)]
pub struct FileOutputSettings {
    pub path: PathBuf,
    /// Mirror rows to account for the host's handedness.
    pub flip_horizontally: bool,
    /// Keep only the red channel.
    pub single_channel_float: bool,
    /// Apply display gamma even to float formats.
    pub force_srgb: bool,
    /// Outcome of the last full-frame write.
    pub last_result: Option<std::result::Result<PathBuf, String>>,
}

/// Writes full-frame tiles of one pass to disk. Partial tiles are ignored.
pub struct FileOutputDriver {
    pass: String,
    settings: Arc<Mutex<FileOutputSettings>>,
}

impl FileOutputDriver {
    /// Creates a driver and the handle used to reconfigure it later.
    #[must_use]
    pub fn new(
        pass: impl Into<String>,
        settings: FileOutputSettings,
    ) -> (Self, Arc<Mutex<FileOutputSettings>>) {
        let settings = Arc::new(Mutex::new(settings));
        (
            Self {
                pass: pass.into(),
                settings: Arc::clone(&settings),
            },
            settings,
        )
    }
}

impl OutputDriver for FileOutputDriver {
    fn write_render_tile(&mut self, tile: &RenderTile) {
        if !tile.is_full_frame() || tile.pass != self.pass {
            return;
        }

        let mut settings = self.settings.lock();
        log::info!(
            "OFFLINE_CYCLES_STATUS: Writing image {}",
            settings.path.display()
        );

        let outcome = write_frame(tile, &settings);
        if let Err(err) = &outcome {
            log::error!("OFFLINE_CYCLES_STATUS: Failed to write image: {err}");
        }
        settings.last_result = Some(outcome.map_err(|e| e.to_string()));
    }
}

fn is_float_format(format: ImageFormat) -> bool {
    matches!(format, ImageFormat::OpenExr | ImageFormat::Hdr)
}

/// Converts a bottom-up RGBA tile into a top-down image ready for `format`.
///
/// Single-channel output replicates the red channel into a grey image.
pub fn encode_frame(
    tile: &RenderTile,
    format: ImageFormat,
    settings: &FileOutputSettings,
) -> Result<DynamicImage> {
    let width = tile.width as usize;
    let height = tile.height as usize;
    if width == 0 || height == 0 {
        return Err(SceneError::ImageDecode("empty frame".into()));
    }
    if tile.pixels.len() != width * height * 4 {
        return Err(SceneError::ImageDecode(format!(
            "tile holds {} floats, expected {}",
            tile.pixels.len(),
            width * height * 4
        )));
    }

    let mut texels: Vec<[f32; 4]> = bytemuck::cast_slice::<f32, [f32; 4]>(&tile.pixels).to_vec();

    if settings.flip_horizontally {
        for row in texels.chunks_exact_mut(width) {
            row.reverse();
        }
    }

    if settings.single_channel_float {
        for texel in &mut texels {
            *texel = [texel[0], texel[0], texel[0], 1.0];
        }
    } else if settings.force_srgb || !is_float_format(format) {
        for texel in &mut texels {
            for channel in &mut texel[..3] {
                *channel = channel.max(0.0).powf(DISPLAY_GAMMA);
            }
        }
    }

    // Bottom-up to top-down.
    let top_down: Vec<f32> = texels
        .chunks_exact(width)
        .rev()
        .flat_map(|row| row.iter().flatten().copied())
        .collect();

    let rgba = Rgba32FImage::from_raw(tile.width, tile.height, top_down)
        .ok_or_else(|| SceneError::ImageDecode("frame buffer size mismatch".into()))?;
    let image = DynamicImage::ImageRgba32F(rgba);

    Ok(match format {
        ImageFormat::OpenExr if !settings.single_channel_float => image,
        ImageFormat::OpenExr | ImageFormat::Hdr => {
            DynamicImage::ImageRgb32F(image.to_rgb32f())
        }
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()),
        _ if settings.single_channel_float => DynamicImage::ImageLuma8(image.to_luma8()),
        _ => DynamicImage::ImageRgba8(image.to_rgba8()),
    })
}

/// Encodes `tile` and saves it to `settings.path`, picking the format from
/// the file extension.
pub fn write_frame(tile: &RenderTile, settings: &FileOutputSettings) -> Result<PathBuf> {
    let path: &Path = &settings.path;
    let format = ImageFormat::from_path(path)?;
    let image = encode_frame(tile, format, settings)?;
    image.save_with_format(path, format)?;
    Ok(path.to_path_buf())
}
