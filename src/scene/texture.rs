//! Texture decoding.
//!
//! Host textures arrive as encoded bytes plus a MIME type. They are decoded
//! on the CPU to 8-bit RGBA and handed to the renderer as-is; the sRGB flag
//! travels with the image parameters.

use image::{DynamicImage, ImageFormat};

use crate::errors::{Result, SceneError};
use crate::renderer::scene::{AlphaType, Extension, ImageParams, ImageResource, Interpolation};

/// Sampling parameters every host texture gets.
#[must_use]
pub fn texture_params(srgb: bool) -> ImageParams {
    ImageParams {
        interpolation: Interpolation::Linear,
        extension: Extension::Repeat,
        alpha: AlphaType::Auto,
        srgb,
    }
}

/// Decodes `bytes` into an RGBA8 image resource.
///
/// The MIME type selects the decoder. An unrecognised type falls back to
/// sniffing the byte stream.
pub fn decode_texture(name: &str, bytes: &[u8], mime_type: &str, srgb: bool) -> Result<ImageResource> {
    if bytes.is_empty() {
        return Err(SceneError::ImageDecode(format!(
            "Failed to decode image {name}: no data"
        )));
    }

    let decoded = match ImageFormat::from_mime_type(mime_type) {
        Some(format) => image::load_from_memory_with_format(bytes, format),
        None => {
            log::debug!("Unknown MIME type '{mime_type}' for texture '{name}', guessing the format");
            image::load_from_memory(bytes)
        }
    };
    let img = decoded
        .map_err(|e| SceneError::ImageDecode(format!("Failed to decode image {name}: {e}")))?;

    log::debug!(
        "Decoded texture '{name}' ({}x{}, srgb: {srgb})",
        img.width(),
        img.height()
    );

    Ok(ImageResource {
        name: name.to_string(),
        params: texture_params(srgb),
        pixels: DynamicImage::ImageRgba8(img.to_rgba8()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(2, 3, image::Rgb([255, 0, 0]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn decodes_by_mime_type() {
        let res = decode_texture("red", &png_bytes(), "image/png", true).unwrap();
        assert_eq!((res.width(), res.height()), (2, 3));
        assert!(res.params.srgb);
        assert_eq!(res.params.extension, Extension::Repeat);
        assert_eq!(res.pixels.to_rgba8().get_pixel(0, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn unknown_mime_type_sniffs_format() {
        let res = decode_texture("red", &png_bytes(), "application/x-unknown", false).unwrap();
        assert!(!res.params.srgb);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(matches!(
            decode_texture("bad", &[1, 2, 3], "image/png", false),
            Err(SceneError::ImageDecode(_))
        ));
        assert!(decode_texture("empty", &[], "image/png", false).is_err());
    }
}
