//! Background (world) shaders.
//!
//! Two background graphs exist per scene: a constant colour and a
//! procedural sky. [`BackgroundSettings`] describes which one is active and
//! with what parameters; switching kind repoints the scene's background slot
//! rather than rebuilding graphs.

use std::f32::consts::{FRAC_PI_2, TAU};

use glam::Vec3;

use crate::errors::Result;
use crate::renderer::scene::ImageKey;
use crate::renderer::shader_graph::{ShaderGraph, ShaderNode, SkyTexture};

/// World up axis for sun elevation.
pub const SKY_UP: Vec3 = Vec3::Y;
/// Zero-azimuth reference axis.
pub const SKY_AZIMUTH_REFERENCE: Vec3 = Vec3::X;

/// Active background.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackgroundSettings {
    /// Solid colour (linear RGB).
    Color(Vec3),
    /// Procedural sky lit by a sun coming from `sun_direction`.
    Sky { sun_direction: Vec3 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundKind {
    Color,
    Sky,
}

impl BackgroundSettings {
    #[must_use]
    pub fn kind(&self) -> BackgroundKind {
        match self {
            Self::Color(_) => BackgroundKind::Color,
            Self::Sky { .. } => BackgroundKind::Sky,
        }
    }
}

impl Default for BackgroundSettings {
    fn default() -> Self {
        Self::Color(Vec3::ZERO)
    }
}

/// Converts a sun direction into sky `(elevation, azimuth)` in radians.
///
/// Elevation is `π/2 − angle(sun, up)`. Azimuth is the signed angle about
/// the up axis from the reference axis to the sun direction flattened onto
/// the ground plane, wrapped into `[0, 2π)`. A sun straight overhead (or a
/// zero vector) has azimuth 0.
#[must_use]
pub fn sun_angles(sun_direction: Vec3) -> (f32, f32) {
    let Some(sun) = sun_direction.try_normalize() else {
        log::debug!("Zero-length sun direction, placing the sun at the zenith");
        return (FRAC_PI_2, 0.0);
    };

    let elevation = FRAC_PI_2 - sun.angle_between(SKY_UP);

    let flat = sun - SKY_UP * sun.dot(SKY_UP);
    let azimuth = match flat.try_normalize() {
        Some(flat) => {
            let sin = SKY_AZIMUTH_REFERENCE.cross(flat).dot(SKY_UP);
            let cos = SKY_AZIMUTH_REFERENCE.dot(flat);
            sin.atan2(cos).rem_euclid(TAU)
        }
        None => 0.0,
    };

    // rem_euclid can round up to exactly TAU for tiny negative inputs.
    let azimuth = if azimuth >= TAU { 0.0 } else { azimuth };
    (elevation, azimuth)
}

/// `Color → Surface`.
pub fn build_color_background(color: Vec3) -> Result<ShaderGraph> {
    let mut graph = ShaderGraph::new();
    let node = graph.add(ShaderNode::Color { value: color });
    graph.connect_surface(node, "Color")?;
    Ok(graph)
}

/// `Sky → Background → Surface`.
pub fn build_sky_background(sun_direction: Vec3) -> Result<ShaderGraph> {
    let (sun_elevation, sun_azimuth) = sun_angles(sun_direction);

    let mut graph = ShaderGraph::new();
    let sky = graph.add(ShaderNode::SkyTexture(SkyTexture {
        sun_elevation,
        sun_azimuth,
        ..SkyTexture::default()
    }));
    let background = graph.add(ShaderNode::Background {
        color: Vec3::ONE,
        strength: 1.0,
    });
    graph.connect(sky, "Color", background, "Color")?;
    graph.connect_surface(background, "Background")?;
    Ok(graph)
}

/// Sets the colour of the first colour node. Returns `false` if the graph
/// has none.
pub fn apply_color(graph: &mut ShaderGraph, color: Vec3) -> bool {
    let target = graph.nodes_mut().find_map(|n| match &mut n.kind {
        ShaderNode::Color { value } => Some(value),
        _ => None,
    });
    match target {
        Some(value) => {
            *value = color;
            true
        }
        None => {
            log::warn!("Failed updating the background shader: colour node not found");
            false
        }
    }
}

/// Re-aims the sun of every sky node. Returns `false` if the graph has none.
pub fn apply_sky(graph: &mut ShaderGraph, sun_direction: Vec3) -> bool {
    let (elevation, azimuth) = sun_angles(sun_direction);
    let mut found = false;
    for node in graph.nodes_mut() {
        if let ShaderNode::SkyTexture(sky) = &mut node.kind {
            sky.sun_elevation = elevation;
            sky.sun_azimuth = azimuth;
            found = true;
        }
    }
    if !found {
        log::warn!("Failed updating the background shader: sky node not found");
    }
    found
}

/// Detaches any baked sky image from the graph's sky nodes and returns it so
/// the caller can free it.
pub fn take_sky_cache(graph: &mut ShaderGraph) -> Vec<ImageKey> {
    graph
        .nodes_mut()
        .filter_map(|n| match &mut n.kind {
            ShaderNode::SkyTexture(sky) => sky.cached_image.take(),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn zenith_sun_has_full_elevation() {
        let (elevation, azimuth) = sun_angles(Vec3::Y);
        assert!((elevation - FRAC_PI_2).abs() < 1e-5);
        assert_eq!(azimuth, 0.0);
    }

    #[test]
    fn azimuth_wraps_into_positive_range() {
        // +Z is a quarter turn clockwise from +X when looking down +Y.
        let (elevation, azimuth) = sun_angles(Vec3::Z);
        assert!(elevation.abs() < 1e-5);
        assert!((azimuth - 1.5 * PI).abs() < 1e-5);

        let (_, azimuth) = sun_angles(-Vec3::Z);
        assert!((azimuth - FRAC_PI_2).abs() < 1e-5);
    }
}
