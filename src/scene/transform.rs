use glam::{Affine3A, Quat, Vec3};

/// Sine threshold below which a rotation is treated as the identity and the
/// axis is substituted.
const AXIS_EPSILON: f32 = 1e-4;

/// Cross-product length below which two basis inputs count as parallel.
const BASIS_EPSILON: f32 = 1e-6;

/// Local TRS of a scene node plus its cached composed matrix.
///
/// The rotation is kept exactly as the host supplied it (it may be a
/// non-unit quaternion); [`compose_trs`] handles normalisation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,

    /// `parent.world_matrix * local`, maintained by the scene graph.
    pub(crate) world_matrix: Affine3A,
}

impl Transform {
    #[must_use]
    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
            world_matrix: compose_trs(translation, rotation, scale),
        }
    }

    /// The local `T * R * S` matrix.
    #[inline]
    #[must_use]
    pub fn local_matrix(&self) -> Affine3A {
        compose_trs(self.translation, self.rotation, self.scale)
    }

    /// The composed (world) matrix.
    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine3A {
        &self.world_matrix
    }

    /// Recomposes the world matrix against `parent` (identity for roots).
    pub fn recompose(&mut self, parent: Option<&Affine3A>) {
        let local = self.local_matrix();
        self.world_matrix = match parent {
            Some(parent) => *parent * local,
            None => local,
        };
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Quat::IDENTITY, Vec3::ONE)
    }
}

/// Converts a quaternion to an `(axis, angle)` pair.
///
/// Any non-unit, non-zero quaternion is normalised first, so a scaled
/// rotation yields the same pair as its unit form. When the sine term
/// `sqrt(1 - w²)` is at most `1e-4` the rotation is (nearly) the identity
/// and the axis is the fixed `+X`.
#[must_use]
pub fn quat_to_axis_angle(q: Quat) -> (Vec3, f32) {
    let len = q.length();
    let q = if len > 0.0 && (len - 1.0).abs() > f32::EPSILON {
        q.normalize()
    } else {
        q
    };

    let w = q.w.clamp(-1.0, 1.0);
    let angle = 2.0 * w.acos();
    let s = (1.0 - w * w).sqrt();

    if s <= AXIS_EPSILON {
        (Vec3::X, angle)
    } else {
        (Vec3::new(q.x / s, q.y / s, q.z / s), angle)
    }
}

/// Composes `Translate(t) * Rotate(r) * Scale(s)`.
///
/// Applied to column vectors this scales first, then rotates, then
/// translates.
#[must_use]
pub fn compose_trs(translation: Vec3, rotation: Quat, scale: Vec3) -> Affine3A {
    let (axis, angle) = quat_to_axis_angle(rotation);
    let axis = axis.normalize_or(Vec3::X);

    Affine3A::from_translation(translation)
        * Affine3A::from_axis_angle(axis, angle)
        * Affine3A::from_scale(scale)
}

/// Builds a right-handed orthonormal `(right, up, dir)` triple.
///
/// `right = normalize(up × dir)`, `up' = normalize(dir × right)`. The inputs
/// need not be orthogonal. A zero `dir` falls back to `+Z`; when `up` is
/// parallel to `dir` an arbitrary axis orthogonal to `dir` stands in for
/// `right`.
#[must_use]
pub fn orthonormal_basis(dir: Vec3, up: Vec3) -> (Vec3, Vec3, Vec3) {
    let dir = dir.try_normalize().unwrap_or_else(|| {
        log::debug!("Zero-length basis direction, substituting +Z");
        Vec3::Z
    });

    let cross = up.cross(dir);
    let right = if cross.length() > BASIS_EPSILON {
        cross.normalize()
    } else {
        log::debug!("Basis up vector is parallel to direction, substituting an orthogonal axis");
        dir.any_orthonormal_vector()
    };

    let up = dir.cross(right).normalize();
    (right, up, dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn identity_quaternion_uses_fixed_axis() {
        let (axis, angle) = quat_to_axis_angle(Quat::IDENTITY);
        assert_eq!(axis, Vec3::X);
        assert!(angle.abs() < 1e-6);
    }

    #[test]
    fn oversized_quaternion_is_normalized() {
        let q = Quat::from_xyzw(0.0, 0.0, 2.0, 2.0);
        let (axis, angle) = quat_to_axis_angle(q);
        assert!((axis - Vec3::Z).length() < 1e-5);
        assert!((angle - FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn compose_scales_before_translating() {
        let m = compose_trs(Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY, Vec3::splat(2.0));
        let p = m.transform_point3(Vec3::new(1.0, 0.0, 0.0));
        assert!((p - Vec3::new(3.0, 0.0, 0.0)).length() < 1e-6);
    }
}
