//! Unit quaternions, used to integrate free-floating orientations.
//!
//! Convention: q = [w; x; y; z] where w is the scalar part.

use crate::{Mat3, Vec3};

/// A unit quaternion representing a 3D rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quat {
    pub w: f64,
    pub v: Vec3,
}

impl Quat {
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self {
            w,
            v: Vec3::new(x, y, z),
        }
    }

    pub fn identity() -> Self {
        Self {
            w: 1.0,
            v: Vec3::zeros(),
        }
    }

    /// `axis` must be a unit vector, `angle` in radians.
    pub fn from_axis_angle(axis: &Vec3, angle: f64) -> Self {
        let (s, c) = (angle * 0.5).sin_cos();
        Self { w: c, v: axis * s }
    }

    /// Rotation by the rotation vector `omega` (axis times angle).
    pub fn exp(omega: &Vec3) -> Self {
        let angle = omega.norm();
        if angle < 1e-12 {
            // First-order expansion keeps tiny rotations exact to O(|ω|²).
            return Self {
                w: 1.0,
                v: omega * 0.5,
            }
            .normalize();
        }
        Self::from_axis_angle(&(omega / angle), angle)
    }

    pub fn normalize(&self) -> Self {
        let norm = (self.w * self.w + self.v.norm_squared()).sqrt();
        if norm < 1e-12 {
            return Self::identity();
        }
        Self {
            w: self.w / norm,
            v: self.v / norm,
        }
    }

    /// Hamilton product `self * other`.
    pub fn mul(&self, other: &Quat) -> Quat {
        Quat {
            w: self.w * other.w - self.v.dot(&other.v),
            v: self.v.cross(&other.v) + other.v * self.w + self.v * other.w,
        }
    }

    pub fn conjugate(&self) -> Quat {
        Quat {
            w: self.w,
            v: -self.v,
        }
    }

    pub fn to_matrix(&self) -> Mat3 {
        let (w, x, y, z) = (self.w, self.v.x, self.v.y, self.v.z);
        Mat3::new(
            1.0 - 2.0 * (y * y + z * z),
            2.0 * (x * y - w * z),
            2.0 * (x * z + w * y),
            2.0 * (x * y + w * z),
            1.0 - 2.0 * (x * x + z * z),
            2.0 * (y * z - w * x),
            2.0 * (x * z - w * y),
            2.0 * (y * z + w * x),
            1.0 - 2.0 * (x * x + y * y),
        )
    }

    /// Shepperd's method; stable for every rotation matrix.
    pub fn from_matrix(m: &Mat3) -> Quat {
        let trace = m[(0, 0)] + m[(1, 1)] + m[(2, 2)];
        if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0;
            Quat::new(
                0.25 * s,
                (m[(2, 1)] - m[(1, 2)]) / s,
                (m[(0, 2)] - m[(2, 0)]) / s,
                (m[(1, 0)] - m[(0, 1)]) / s,
            )
        } else if m[(0, 0)] > m[(1, 1)] && m[(0, 0)] > m[(2, 2)] {
            let s = (1.0 + m[(0, 0)] - m[(1, 1)] - m[(2, 2)]).sqrt() * 2.0;
            Quat::new(
                (m[(2, 1)] - m[(1, 2)]) / s,
                0.25 * s,
                (m[(0, 1)] + m[(1, 0)]) / s,
                (m[(0, 2)] + m[(2, 0)]) / s,
            )
        } else if m[(1, 1)] > m[(2, 2)] {
            let s = (1.0 + m[(1, 1)] - m[(0, 0)] - m[(2, 2)]).sqrt() * 2.0;
            Quat::new(
                (m[(0, 2)] - m[(2, 0)]) / s,
                (m[(0, 1)] + m[(1, 0)]) / s,
                0.25 * s,
                (m[(1, 2)] + m[(2, 1)]) / s,
            )
        } else {
            let s = (1.0 + m[(2, 2)] - m[(0, 0)] - m[(1, 1)]).sqrt() * 2.0;
            Quat::new(
                (m[(1, 0)] - m[(0, 1)]) / s,
                (m[(0, 2)] + m[(2, 0)]) / s,
                (m[(1, 2)] + m[(2, 1)]) / s,
                0.25 * s,
            )
        }
    }

    /// Re-orthonormalize a rotation matrix that drifted through integration.
    pub fn orthonormalize(m: &Mat3) -> Mat3 {
        Quat::from_matrix(m).normalize().to_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rodrigues;
    use approx::assert_relative_eq;

    #[test]
    fn exp_matches_rodrigues() {
        let omega = Vec3::new(0.3, -0.2, 0.9);
        let angle = omega.norm();
        let expected = rodrigues(&(omega / angle), angle);
        assert_relative_eq!(Quat::exp(&omega).to_matrix(), expected, epsilon = 1e-12);
    }

    #[test]
    fn exp_of_zero_is_identity() {
        assert_relative_eq!(Quat::exp(&Vec3::zeros()).to_matrix(), Mat3::identity());
    }
}
