//! Math primitives for the artic simulator.
//!
//! Rigid poses, 6D spatial vectors, Plücker transforms and spatial inertia
//! following Featherstone's conventions, plus a small quaternion type used by
//! the free-joint integrator.

pub mod pose;
pub mod quaternion;
pub mod spatial;

pub use pose::Pose;
pub use quaternion::Quat;
pub use spatial::{SpatialInertia, SpatialMat, SpatialTransform, SpatialVec};

use nalgebra as na;

/// 3D vector alias.
pub type Vec3 = na::Vector3<f64>;
/// 3x3 matrix alias.
pub type Mat3 = na::Matrix3<f64>;
/// 6D vector alias.
pub type Vec6 = na::Vector6<f64>;
/// 6x6 matrix alias.
pub type Mat6 = na::Matrix6<f64>;

/// Cross-product matrix: [v]× such that [v]× w = v × w.
#[inline]
pub fn skew(v: &Vec3) -> Mat3 {
    Mat3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}

/// Active rotation of `angle` radians about the unit vector `axis`.
pub fn rodrigues(axis: &Vec3, angle: f64) -> Mat3 {
    let (s, c) = angle.sin_cos();
    let k = skew(axis);
    Mat3::identity() + k * s + k * k * (1.0 - c)
}

/// Returns two unit vectors completing `n` into a right-handed basis `(t1, t2, n)`.
pub fn tangent_basis(n: &Vec3) -> (Vec3, Vec3) {
    let helper = if n.x.abs() < 0.9 {
        Vec3::x()
    } else {
        Vec3::y()
    };
    let t1 = n.cross(&helper).normalize();
    let t2 = n.cross(&t1);
    (t1, t2)
}

/// Standard gravity (m/s²).
pub const GRAVITY: f64 = 9.81;
