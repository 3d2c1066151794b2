use crate::vector::Vec3;

use num_traits::Float;

use std::ops::{Add, Mul, Sub};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quat<T: Copy + Float> {
    pub xyz: Vec3<T>,
    pub w: T,
}

pub type Quatd = Quat<f64>;

impl<T: Copy + Float> Quat<T> {
    pub fn new(w: T, x: T, y: T, z: T) -> Self {
        Quat {
            xyz: Vec3 { x, y, z },
            w,
        }
    }

    pub fn identity() -> Self {
        Quat {
            xyz: Vec3::zero(),
            w: T::one(),
        }
    }

    /// Constructs the rotation of `angle` radians around `axis`.
    pub fn from_axis_angle(axis: Vec3<T>, angle: T) -> Self {
        let two = T::one() + T::one();
        let half = angle / two;
        Quat {
            xyz: axis.normalize().scale(half.sin()),
            w: half.cos(),
        }
    }

    pub fn dot(self, o: Quat<T>) -> T {
        self.xyz.dot(o.xyz) + self.w * o.w
    }

    pub fn length2(self) -> T {
        self.dot(self)
    }

    pub fn length(self) -> T {
        self.length2().sqrt()
    }

    pub fn normalize(self) -> Self {
        let inv_len = T::one() / self.length();
        self.scale(inv_len)
    }

    pub fn scale(self, s: T) -> Self {
        Quat {
            xyz: self.xyz.scale(s),
            w: self.w * s,
        }
    }

    pub fn conjugate(self) -> Self {
        Quat {
            xyz: -self.xyz,
            w: self.w,
        }
    }

    pub fn inverse(self) -> Self {
        let inv_len2 = T::one() / self.length2();
        self.conjugate().scale(inv_len2)
    }

    /// Rotates the vector `v` by this quaternion (`q v q*`). The quaternion
    /// is expected to be normalized.
    pub fn rotate(self, v: Vec3<T>) -> Vec3<T> {
        let p = Quat {
            xyz: v,
            w: T::zero(),
        };
        (self * p * self.conjugate()).xyz
    }
}

impl<T: Copy + Float> Mul for Quat<T> {
    type Output = Self;

    fn mul(self, o: Quat<T>) -> Self {
        Quat {
            xyz: self.xyz.cross(o.xyz) + o.xyz.scale(self.w) + self.xyz.scale(o.w),
            w: self.w * o.w - self.xyz.dot(o.xyz),
        }
    }
}

impl<T: Copy + Float> Add for Quat<T> {
    type Output = Self;

    fn add(self, o: Quat<T>) -> Self {
        Quat {
            xyz: self.xyz + o.xyz,
            w: self.w + o.w,
        }
    }
}

impl<T: Copy + Float> Sub for Quat<T> {
    type Output = Self;

    fn sub(self, o: Quat<T>) -> Self {
        Quat {
            xyz: self.xyz - o.xyz,
            w: self.w - o.w,
        }
    }
}
