use mmath::quaternion::Quatd;
use mmath::transform::Transfd;
use mmath::vector::Vec3;

use approx::assert_relative_eq;

use std::f64::consts::FRAC_PI_2;

#[test]
fn test_camera_style_placement() {
    // An offset plus a quarter turn around y, the way a camera uses it:
    // rotate the view direction, then stand at the offset.
    let transform = Transfd::new(
        Vec3::new(0.0, 0.0, -5.0),
        Quatd::from_axis_angle(Vec3::new(0.0, 1.0, 0.0), FRAC_PI_2),
    );

    let forward = Vec3::new(0.0, 0.0, 1.0);
    let rotated = transform.rotation.rotate(forward);

    // +z turns onto +x.
    assert_relative_eq!(rotated.x, 1.0, epsilon = 1e-12);
    assert_relative_eq!(rotated.y, 0.0, epsilon = 1e-12);
    assert_relative_eq!(rotated.z, 0.0, epsilon = 1e-12);
    assert_eq!(transform.offset, Vec3::new(0.0, 0.0, -5.0));
}

#[test]
fn test_identity_round_trip() {
    let transform = Transfd::identity();
    let v = Vec3::new(0.3, -0.7, 2.1);
    let moved = transform.rotation.rotate(v) + transform.offset;
    assert_relative_eq!(moved.x, v.x, epsilon = 1e-12);
    assert_relative_eq!(moved.y, v.y, epsilon = 1e-12);
    assert_relative_eq!(moved.z, v.z, epsilon = 1e-12);
}

#[test]
fn test_translate_composes_with_rotation() {
    // A pure translation leaves directions alone but moves positions.
    let transform = Transfd::new_translate(Vec3::new(1.0, 2.0, 3.0));
    let direction = Vec3::new(0.0, 0.0, 1.0);

    let rotated = transform.rotation.rotate(direction);
    assert_relative_eq!(rotated.z, 1.0, epsilon = 1e-12);

    let position = transform.rotation.rotate(Vec3::new(0.0, 0.0, 0.0)) + transform.offset;
    assert_eq!(position, Vec3::new(1.0, 2.0, 3.0));
}
