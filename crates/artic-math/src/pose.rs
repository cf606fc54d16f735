//! Rigid placement of a frame in its parent (usually the world).

use crate::{Mat3, Vec3, rodrigues};
use serde::{Deserialize, Serialize};

/// Rigid transform `x_parent = rot * x_local + pos`.
///
/// Unlike [`SpatialTransform`](crate::SpatialTransform), which is a passive
/// coordinate change, a pose is active: it places a child frame in its parent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Orientation of the local frame, columns are its axes in parent coordinates.
    pub rot: Mat3,
    /// Origin of the local frame in parent coordinates.
    pub pos: Vec3,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    pub fn new(rot: Mat3, pos: Vec3) -> Self {
        Self { rot, pos }
    }

    pub fn identity() -> Self {
        Self {
            rot: Mat3::identity(),
            pos: Vec3::zeros(),
        }
    }

    pub fn from_translation(pos: Vec3) -> Self {
        Self {
            rot: Mat3::identity(),
            pos,
        }
    }

    /// Rotation of `angle` about the unit `axis`, then translation by `pos`.
    pub fn from_axis_angle(axis: &Vec3, angle: f64, pos: Vec3) -> Self {
        Self {
            rot: rodrigues(axis, angle),
            pos,
        }
    }

    #[inline]
    pub fn transform_point(&self, p: &Vec3) -> Vec3 {
        self.rot * p + self.pos
    }

    #[inline]
    pub fn transform_vector(&self, v: &Vec3) -> Vec3 {
        self.rot * v
    }

    #[inline]
    pub fn inverse_transform_point(&self, p: &Vec3) -> Vec3 {
        self.rot.transpose() * (p - self.pos)
    }

    pub fn inverse(&self) -> Pose {
        let rt = self.rot.transpose();
        Pose {
            rot: rt,
            pos: -(rt * self.pos),
        }
    }

    /// `self * other`: places `other`'s frame through `self`.
    pub fn compose(&self, other: &Pose) -> Pose {
        Pose {
            rot: self.rot * other.rot,
            pos: self.rot * other.pos + self.pos,
        }
    }

    /// Pose of `other` expressed in this frame.
    pub fn relative(&self, other: &Pose) -> Pose {
        self.inverse().compose(other)
    }
}

impl std::ops::Mul for Pose {
    type Output = Pose;
    fn mul(self, rhs: Pose) -> Pose {
        self.compose(&rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn relative_then_compose_recovers_pose() {
        let a = Pose::from_axis_angle(&Vec3::z(), 0.3, Vec3::new(1.0, 0.0, 2.0));
        let b = Pose::from_axis_angle(&Vec3::x(), -1.1, Vec3::new(-0.5, 4.0, 0.0));
        let b_in_a = a.relative(&b);
        let back = a * b_in_a;
        assert_relative_eq!(back.rot, b.rot, epsilon = 1e-12);
        assert_relative_eq!(back.pos, b.pos, epsilon = 1e-12);
    }

    #[test]
    fn inverse_point_roundtrip() {
        let p = Pose::from_axis_angle(&Vec3::y(), 0.7, Vec3::new(0.0, 1.0, -1.0));
        let x = Vec3::new(0.2, -0.4, 3.0);
        assert_relative_eq!(p.inverse_transform_point(&p.transform_point(&x)), x, epsilon = 1e-12);
    }
}
