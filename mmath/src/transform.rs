use crate::quaternion::Quat;
use crate::vector::Vec3;

use num_traits::Float;

/// An offset plus a rotation. This is all the camera needs, so no scaling
/// or full matrices here.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transf<T: Copy + Float> {
    pub offset: Vec3<T>,
    pub rotation: Quat<T>,
}

pub type Transfd = Transf<f64>;

impl<T: Copy + Float> Transf<T> {
    pub fn new(offset: Vec3<T>, rotation: Quat<T>) -> Self {
        Transf { offset, rotation }
    }

    pub fn identity() -> Self {
        Transf {
            offset: Vec3::zero(),
            rotation: Quat::identity(),
        }
    }

    pub fn new_translate(offset: Vec3<T>) -> Self {
        Transf {
            offset,
            rotation: Quat::identity(),
        }
    }
}
