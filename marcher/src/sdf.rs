// The signed distance field tree. A closed enum covers every node kind;
// the variant discriminator doubles as the type key the scene orders its
// objects by.

use mmath::quaternion::Quatd;
use mmath::vector::Vec3d;

/// Distance reported by nodes that stand in for a line the deserializer
/// could not make sense of.
const PLACEHOLDER_DISTANCE: f64 = 1e9;

#[derive(Clone, Debug, PartialEq)]
pub enum SdfObject {
    Sphere {
        radius: f64,
    },
    Box3 {
        size: Vec3d,
    },
    /// The locus where `dot(normal, p) = 0`. Note that this is two-sided: the
    /// distance is the absolute plane distance, so the "plane" is a
    /// zero-thickness wall, not a half space.
    Plane {
        normal: Vec3d,
    },
    Hollow {
        target: Box<SdfObject>,
    },
    Rounded {
        target: Box<SdfObject>,
        radius: f64,
    },
    Onion {
        target: Box<SdfObject>,
        thickness: f64,
    },
    Union {
        first: Box<SdfObject>,
        second: Box<SdfObject>,
    },
    Difference {
        first: Box<SdfObject>,
        second: Box<SdfObject>,
    },
    Intersection {
        first: Box<SdfObject>,
        second: Box<SdfObject>,
    },
    Translate {
        target: Box<SdfObject>,
        offset: Vec3d,
    },
    Rotate {
        target: Box<SdfObject>,
        rotation: Quatd,
    },
    /// Inserted wherever deserialization fails so the object and material
    /// lists stay aligned. Evaluates to a large constant distance.
    DeserializationError,
}

/// Discriminates the node variants. The scene keeps its objects grouped by
/// kind, ordered by this enum's declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SdfKind {
    Sphere,
    Box3,
    Plane,
    Hollow,
    Rounded,
    Onion,
    Union,
    Difference,
    Intersection,
    Translate,
    Rotate,
    DeserializationError,
}

impl SdfObject {
    pub fn sphere(radius: f64) -> Self {
        SdfObject::Sphere { radius }
    }

    pub fn box3(size: Vec3d) -> Self {
        SdfObject::Box3 { size }
    }

    pub fn plane(normal: Vec3d) -> Self {
        SdfObject::Plane {
            normal: normal.normalize(),
        }
    }

    pub fn hollow(target: SdfObject) -> Self {
        SdfObject::Hollow {
            target: Box::new(target),
        }
    }

    pub fn rounded(target: SdfObject, radius: f64) -> Self {
        SdfObject::Rounded {
            target: Box::new(target),
            radius,
        }
    }

    pub fn onion(target: SdfObject, thickness: f64) -> Self {
        SdfObject::Onion {
            target: Box::new(target),
            thickness,
        }
    }

    pub fn union(first: SdfObject, second: SdfObject) -> Self {
        SdfObject::Union {
            first: Box::new(first),
            second: Box::new(second),
        }
    }

    pub fn difference(first: SdfObject, second: SdfObject) -> Self {
        SdfObject::Difference {
            first: Box::new(first),
            second: Box::new(second),
        }
    }

    pub fn intersection(first: SdfObject, second: SdfObject) -> Self {
        SdfObject::Intersection {
            first: Box::new(first),
            second: Box::new(second),
        }
    }

    pub fn translate(target: SdfObject, offset: Vec3d) -> Self {
        SdfObject::Translate {
            target: Box::new(target),
            offset,
        }
    }

    pub fn rotate(target: SdfObject, rotation: Quatd) -> Self {
        SdfObject::Rotate {
            target: Box::new(target),
            rotation,
        }
    }

    pub fn kind(&self) -> SdfKind {
        match self {
            SdfObject::Sphere { .. } => SdfKind::Sphere,
            SdfObject::Box3 { .. } => SdfKind::Box3,
            SdfObject::Plane { .. } => SdfKind::Plane,
            SdfObject::Hollow { .. } => SdfKind::Hollow,
            SdfObject::Rounded { .. } => SdfKind::Rounded,
            SdfObject::Onion { .. } => SdfKind::Onion,
            SdfObject::Union { .. } => SdfKind::Union,
            SdfObject::Difference { .. } => SdfKind::Difference,
            SdfObject::Intersection { .. } => SdfKind::Intersection,
            SdfObject::Translate { .. } => SdfKind::Translate,
            SdfObject::Rotate { .. } => SdfKind::Rotate,
            SdfObject::DeserializationError => SdfKind::DeserializationError,
        }
    }

    /// Evaluates the signed distance from `p` to this tree's surface.
    pub fn evaluate(&self, p: Vec3d) -> f64 {
        match self {
            SdfObject::Sphere { radius } => p.length() - radius,
            SdfObject::Box3 { size } => {
                // Inigo Quilez' exact box distance.
                let q = p.abs() - *size;
                q.max_scalar(0.0).length() + q.max_component().min(0.0)
            }
            SdfObject::Plane { normal } => normal.dot(p).abs(),
            SdfObject::Hollow { target } => target.evaluate(p).abs(),
            SdfObject::Rounded { target, radius } => target.evaluate(p) - radius,
            SdfObject::Onion { target, thickness } => target.evaluate(p).abs() - thickness,
            SdfObject::Union { first, second } => first.evaluate(p).min(second.evaluate(p)),
            SdfObject::Difference { first, second } => {
                (-first.evaluate(p)).max(second.evaluate(p))
            }
            SdfObject::Intersection { first, second } => {
                first.evaluate(p).max(second.evaluate(p))
            }
            SdfObject::Translate { target, offset } => target.evaluate(p - *offset),
            SdfObject::Rotate { target, rotation } => {
                target.evaluate(rotation.inverse().rotate(p))
            }
            SdfObject::DeserializationError => PLACEHOLDER_DISTANCE,
        }
    }

    /// The analytic surface normal for nodes that have a cheap one. Everyone
    /// else gets the numeric tetrahedron estimate in the raymarcher.
    pub fn analytic_normal(&self, p: Vec3d) -> Option<Vec3d> {
        match self {
            SdfObject::Sphere { .. } => Some(p.normalize()),
            SdfObject::Plane { normal } => Some(*normal),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::Xoroshiro128;
    use approx::assert_relative_eq;
    use mmath::vector::Vec3;
    use std::f64::consts::FRAC_PI_2;

    fn random_point(rng: &mut Xoroshiro128) -> Vec3d {
        let mut component = || (rng.next() >> 11) as f64 / (1u64 << 53) as f64 * 8.0 - 4.0;
        Vec3::new(component(), component(), component())
    }

    #[test]
    fn sphere_distance_matches_analytic() {
        let sphere = SdfObject::sphere(1.5);
        let mut rng = Xoroshiro128::from_seed_u64(1);
        for _ in 0..10_000 {
            let p = random_point(&mut rng);
            assert_relative_eq!(sphere.evaluate(p), p.length() - 1.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn plane_distance_is_two_sided() {
        let plane = SdfObject::plane(Vec3::new(0.0, 1.0, 0.0));
        let mut rng = Xoroshiro128::from_seed_u64(2);
        for _ in 0..10_000 {
            let p = random_point(&mut rng);
            assert_relative_eq!(plane.evaluate(p), p.y.abs(), epsilon = 1e-12);
            assert!(plane.evaluate(p) >= 0.0);
        }
    }

    #[test]
    fn box_distance_on_axes() {
        let cube = SdfObject::box3(Vec3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(cube.evaluate(Vec3::new(3.0, 0.0, 0.0)), 2.0, epsilon = 1e-12);
        assert_relative_eq!(cube.evaluate(Vec3::new(0.0, 0.0, 0.0)), -1.0, epsilon = 1e-12);
        // Distance to a corner:
        assert_relative_eq!(
            cube.evaluate(Vec3::new(2.0, 2.0, 2.0)),
            3.0f64.sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn modifiers_shift_the_surface() {
        let sphere = SdfObject::sphere(1.0);
        let rounded = SdfObject::rounded(sphere.clone(), 0.25);
        let onion = SdfObject::onion(sphere.clone(), 0.1);
        let hollow = SdfObject::hollow(sphere);

        let p = Vec3::new(2.0, 0.0, 0.0);
        assert_relative_eq!(rounded.evaluate(p), 0.75, epsilon = 1e-12);
        assert_relative_eq!(onion.evaluate(p), 0.9, epsilon = 1e-12);
        // Inside the sphere the hollow version reports positive distance to the shell.
        assert_relative_eq!(hollow.evaluate(Vec3::new(0.25, 0.0, 0.0)), 0.75, epsilon = 1e-12);
    }

    #[test]
    fn booleans_combine_distances() {
        let a = SdfObject::sphere(1.0);
        let b = SdfObject::translate(SdfObject::sphere(1.0), Vec3::new(1.0, 0.0, 0.0));
        let p = Vec3::new(-2.0, 0.0, 0.0);

        let da: f64 = 1.0;
        let db: f64 = 2.0;
        assert_relative_eq!(
            SdfObject::union(a.clone(), b.clone()).evaluate(p),
            da.min(db),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            SdfObject::intersection(a.clone(), b.clone()).evaluate(p),
            da.max(db),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            SdfObject::difference(a, b).evaluate(p),
            (-da).max(db),
            epsilon = 1e-12
        );
    }

    #[test]
    fn transforms_compose() {
        let rotated = SdfObject::rotate(
            SdfObject::translate(SdfObject::sphere(0.5), Vec3::new(1.0, 0.0, 0.0)),
            Quatd::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), FRAC_PI_2),
        );
        // The translated sphere center (1, 0, 0) rotates onto the y axis.
        assert_relative_eq!(
            rotated.evaluate(Vec3::new(0.0, 1.0, 0.0)),
            -0.5,
            epsilon = 1e-12
        );
    }

    #[test]
    fn placeholder_is_far_away() {
        assert_eq!(SdfObject::DeserializationError.evaluate(Vec3::zero()), 1e9);
    }

    #[test]
    fn analytic_normals() {
        let sphere = SdfObject::sphere(2.0);
        let n = sphere.analytic_normal(Vec3::new(0.0, 3.0, 0.0)).unwrap();
        assert_relative_eq!(n.y, 1.0, epsilon = 1e-12);

        let plane = SdfObject::plane(Vec3::new(0.0, 0.0, 2.0));
        let n = plane.analytic_normal(Vec3::new(1.0, 1.0, 1.0)).unwrap();
        assert_relative_eq!(n.z, 1.0, epsilon = 1e-12);

        assert!(SdfObject::box3(Vec3::new(1.0, 1.0, 1.0))
            .analytic_normal(Vec3::zero())
            .is_none());
    }
}
