//! Transform Utility Tests
//!
//! Tests for:
//! - Quaternion to axis-angle conversion and its round trip
//! - TRS composition order
//! - Orthonormal basis construction and its degenerate inputs
//! - Transform recomposition against a parent

use std::f32::consts::{FRAC_PI_2, PI};

use glam::{Affine3A, Quat, Vec3};

use pathscene::scene::transform::{compose_trs, orthonormal_basis, quat_to_axis_angle};
use pathscene::scene::Transform;

const EPSILON: f32 = 1e-4;

fn approx_vec3(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < EPSILON
}

fn approx_affine(a: &Affine3A, b: &Affine3A) -> bool {
    a.to_cols_array()
        .iter()
        .zip(b.to_cols_array().iter())
        .all(|(x, y)| (x - y).abs() < EPSILON)
}

// ============================================================================
// Axis-angle
// ============================================================================

#[test]
fn axis_angle_round_trip() {
    let rotations = [
        Quat::from_rotation_x(0.3),
        Quat::from_rotation_y(-1.2),
        Quat::from_rotation_z(PI * 0.75),
        Quat::from_axis_angle(Vec3::new(1.0, 2.0, -0.5).normalize(), 2.1),
        Quat::from_euler(glam::EulerRot::XYZ, 0.4, -0.9, 1.7),
    ];

    for q in rotations {
        let (axis, angle) = quat_to_axis_angle(q);
        let rebuilt = Affine3A::from_axis_angle(axis.normalize(), angle);
        let expected = Affine3A::from_quat(q);
        assert!(
            approx_affine(&rebuilt, &expected),
            "rotation {q:?} did not survive the round trip"
        );
    }
}

#[test]
fn identity_rotation_substitutes_x_axis() {
    let (axis, angle) = quat_to_axis_angle(Quat::IDENTITY);
    assert_eq!(axis, Vec3::X);
    assert!(angle.abs() < EPSILON);
}

#[test]
fn non_unit_quaternion_is_normalised() {
    let q = Quat::from_rotation_y(FRAC_PI_2);
    let scaled = Quat::from_xyzw(q.x * 3.0, q.y * 3.0, q.z * 3.0, q.w * 3.0);
    let (axis, angle) = quat_to_axis_angle(scaled);
    assert!(approx_vec3(axis, Vec3::Y));
    assert!((angle - FRAC_PI_2).abs() < EPSILON);
}

#[test]
fn undersized_quaternion_is_normalised() {
    let q = Quat::from_rotation_x(1.0);
    let shrunk = Quat::from_xyzw(q.x * 0.25, q.y * 0.25, q.z * 0.25, q.w * 0.25);
    let (axis, angle) = quat_to_axis_angle(shrunk);
    assert!(approx_vec3(axis, Vec3::X));
    assert!((angle - 1.0).abs() < EPSILON);
}

// ============================================================================
// Composition
// ============================================================================

#[test]
fn trs_scales_then_rotates_then_translates() {
    let m = compose_trs(
        Vec3::new(1.0, 0.0, 0.0),
        Quat::from_rotation_z(FRAC_PI_2),
        Vec3::splat(2.0),
    );
    // (1,0,0) -> scale (2,0,0) -> rotate (0,2,0) -> translate (1,2,0)
    assert!(approx_vec3(m.transform_point3(Vec3::X), Vec3::new(1.0, 2.0, 0.0)));
}

#[test]
fn recompose_chains_parent() {
    let parent = compose_trs(Vec3::new(0.0, 5.0, 0.0), Quat::IDENTITY, Vec3::ONE);
    let mut child = Transform::new(Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE);
    child.recompose(Some(&parent));
    assert!(approx_vec3(
        child.world_matrix().translation.into(),
        Vec3::new(1.0, 5.0, 0.0)
    ));

    child.recompose(None);
    assert!(approx_affine(child.world_matrix(), &child.local_matrix()));
}

// ============================================================================
// Basis
// ============================================================================

#[test]
fn basis_is_orthonormal_for_skewed_up() {
    let (right, up, dir) = orthonormal_basis(Vec3::new(0.0, 0.0, 2.0), Vec3::new(0.3, 1.0, 0.4));
    assert!(approx_vec3(dir, Vec3::Z));
    assert!((right.length() - 1.0).abs() < EPSILON);
    assert!((up.length() - 1.0).abs() < EPSILON);
    assert!(right.dot(up).abs() < EPSILON);
    assert!(right.dot(dir).abs() < EPSILON);
    assert!(up.dot(dir).abs() < EPSILON);
    // up keeps the side of the requested up vector
    assert!(up.y > 0.0);
}

#[test]
fn basis_survives_parallel_up() {
    let (right, up, dir) = orthonormal_basis(Vec3::Y, Vec3::Y);
    assert!(right.is_finite() && up.is_finite());
    assert!(right.dot(dir).abs() < EPSILON);
    assert!(up.dot(dir).abs() < EPSILON);
}

#[test]
fn basis_survives_zero_direction() {
    let (right, up, dir) = orthonormal_basis(Vec3::ZERO, Vec3::Y);
    assert_eq!(dir, Vec3::Z);
    assert!(right.is_finite() && up.is_finite());
}
