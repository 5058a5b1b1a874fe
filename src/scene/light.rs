use std::f32::consts::PI;

use glam::{Affine3A, Vec3};

use super::transform::orthonormal_basis;
use crate::errors::{Result, SceneError};
use crate::renderer::scene::{Light, LightType, ShaderKey, TransformId};

/// Luminous efficacy of 555 nm light, in lm/W.
pub const LUMENS_PER_WATT: f32 = 683.002;

/// Angular diameter given to directional lights (radians).
pub const DIRECTIONAL_ANGLE: f32 = 0.009_180;
/// Emitter radius given to spot and point lights.
pub const PUNCTUAL_SIZE: f32 = 0.01;

/// Light kinds as the host encodes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Directional,
    Spot,
    Point,
}

impl TryFrom<i32> for LightKind {
    type Error = SceneError;

    fn try_from(code: i32) -> Result<Self> {
        match code {
            0 => Ok(Self::Directional),
            1 => Ok(Self::Spot),
            2 => Ok(Self::Point),
            other => Err(SceneError::UnknownLightType(other)),
        }
    }
}

impl From<LightKind> for LightType {
    fn from(kind: LightKind) -> Self {
        match kind {
            LightKind::Directional => LightType::Distant,
            LightKind::Spot => LightType::Spot,
            LightKind::Point => LightType::Point,
        }
    }
}

/// Photometric light description.
///
/// `intensity` is in lux for directional lights and candela otherwise. Cone
/// angles are half-angles in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightDesc {
    pub kind: LightKind,
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
    pub inner_cone_angle: f32,
    pub outer_cone_angle: f32,
}

impl LightDesc {
    #[must_use]
    pub fn directional(color: Vec3, lux: f32) -> Self {
        Self {
            kind: LightKind::Directional,
            color,
            intensity: lux,
            range: 0.0,
            inner_cone_angle: 0.0,
            outer_cone_angle: 0.0,
        }
    }

    #[must_use]
    pub fn point(color: Vec3, candela: f32, range: f32) -> Self {
        Self {
            kind: LightKind::Point,
            color,
            intensity: candela,
            range,
            inner_cone_angle: 0.0,
            outer_cone_angle: 0.0,
        }
    }

    #[must_use]
    pub fn spot(color: Vec3, candela: f32, range: f32, inner: f32, outer: f32) -> Self {
        Self {
            kind: LightKind::Spot,
            color,
            intensity: candela,
            range,
            inner_cone_angle: inner,
            outer_cone_angle: outer,
        }
    }

    /// Builds a description from the host's numeric light type.
    pub fn from_code(
        code: i32,
        color: Vec3,
        intensity: f32,
        range: f32,
        inner_cone_angle: f32,
        outer_cone_angle: f32,
    ) -> Result<Self> {
        Ok(Self {
            kind: LightKind::try_from(code)?,
            color,
            intensity,
            range,
            inner_cone_angle,
            outer_cone_angle,
        })
    }

    /// Radiometric strength per channel.
    #[must_use]
    pub fn strength(&self) -> Vec3 {
        let watts = match self.kind {
            LightKind::Directional => self.intensity / LUMENS_PER_WATT,
            LightKind::Spot | LightKind::Point => self.intensity * 4.0 * PI / LUMENS_PER_WATT,
        };
        self.color * watts
    }

    /// Full cone angle and edge softness of a spot light.
    #[must_use]
    pub fn spot_cone(&self) -> (f32, f32) {
        let outer = self.outer_cone_angle;
        let smooth = if outer > 0.0 {
            ((outer - self.inner_cone_angle) / outer).clamp(0.0, 1.0)
        } else {
            log::debug!("Spot light with a zero outer cone, using a hard edge");
            0.0
        };
        (outer * 2.0, smooth)
    }

    /// Builds the renderer light placed by `world`.
    pub(crate) fn to_light(
        &self,
        world: &Affine3A,
        transform_id: TransformId,
        shader: ShaderKey,
    ) -> Light {
        let mut light = Light {
            kind: self.kind.into(),
            strength: self.strength(),
            dir: Vec3::NEG_Z,
            co: Vec3::ZERO,
            axisu: Vec3::X,
            axisv: Vec3::Y,
            tfm: *world,
            transform_id,
            shader: Some(shader),
            angle: 0.0,
            size: 0.0,
            spot_angle: 0.0,
            spot_smooth: 0.0,
            cast_shadow: true,
            use_transmission: true,
            use_caustics: true,
            normalize: true,
        };

        match self.kind {
            LightKind::Directional => light.angle = DIRECTIONAL_ANGLE,
            LightKind::Spot => {
                let (angle, smooth) = self.spot_cone();
                light.size = PUNCTUAL_SIZE;
                light.spot_angle = angle;
                light.spot_smooth = smooth;
            }
            LightKind::Point => light.size = PUNCTUAL_SIZE,
        }

        place_light(&mut light, world);
        light
    }
}

/// Re-derives a light's frame from the node's world matrix.
///
/// The light looks down its local `-Z`. `dir` keeps the matrix's scale;
/// the `axisu`/`axisv` pair is orthonormal.
pub(crate) fn place_light(light: &mut Light, world: &Affine3A) {
    let dir = world.transform_vector3(Vec3::NEG_Z);
    let (right, up, _) = orthonormal_basis(dir, Vec3::Y);

    light.tfm = *world;
    light.dir = dir;
    light.co = world.transform_point3(Vec3::ZERO);
    light.axisu = right;
    light.axisv = up;
}
