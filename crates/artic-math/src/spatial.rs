//! 6D spatial algebra following Featherstone's "Rigid Body Dynamics Algorithms".
//!
//! Convention: spatial vectors are [angular; linear].
//! A motion vector (twist) is [ω; v], a force vector (wrench) is [τ; f].

use crate::{Mat3, Mat6, Pose, Vec3, Vec6, skew};

/// 6D spatial vector, either a motion vector or a force vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialVec {
    /// [angular(3); linear(3)].
    pub data: Vec6,
}

impl SpatialVec {
    #[inline]
    pub fn new(angular: Vec3, linear: Vec3) -> Self {
        Self {
            data: Vec6::new(
                angular.x, angular.y, angular.z, linear.x, linear.y, linear.z,
            ),
        }
    }

    #[inline]
    pub fn zero() -> Self {
        Self {
            data: Vec6::zeros(),
        }
    }

    #[inline]
    pub fn from_vec6(data: Vec6) -> Self {
        Self { data }
    }

    /// Angular (top 3) component.
    #[inline]
    pub fn angular(&self) -> Vec3 {
        self.data.fixed_rows::<3>(0).into_owned()
    }

    /// Linear (bottom 3) component.
    #[inline]
    pub fn linear(&self) -> Vec3 {
        self.data.fixed_rows::<3>(3).into_owned()
    }

    /// Motion cross product `self ×ₘ other` (velocity-product terms).
    pub fn cross_motion(&self, other: &SpatialVec) -> SpatialVec {
        let w = self.angular();
        let v = self.linear();
        SpatialVec::new(
            w.cross(&other.angular()),
            w.cross(&other.linear()) + v.cross(&other.angular()),
        )
    }

    /// Force cross product `self ×f other` (gyroscopic bias terms).
    pub fn cross_force(&self, other: &SpatialVec) -> SpatialVec {
        let w = self.angular();
        let v = self.linear();
        SpatialVec::new(
            w.cross(&other.angular()) + v.cross(&other.linear()),
            w.cross(&other.linear()),
        )
    }

    #[inline]
    pub fn dot(&self, other: &SpatialVec) -> f64 {
        self.data.dot(&other.data)
    }
}

impl std::ops::Add for SpatialVec {
    type Output = SpatialVec;
    #[inline]
    fn add(self, rhs: SpatialVec) -> SpatialVec {
        SpatialVec {
            data: self.data + rhs.data,
        }
    }
}

impl std::ops::AddAssign for SpatialVec {
    #[inline]
    fn add_assign(&mut self, rhs: SpatialVec) {
        self.data += rhs.data;
    }
}

impl std::ops::Sub for SpatialVec {
    type Output = SpatialVec;
    #[inline]
    fn sub(self, rhs: SpatialVec) -> SpatialVec {
        SpatialVec {
            data: self.data - rhs.data,
        }
    }
}

impl std::ops::SubAssign for SpatialVec {
    #[inline]
    fn sub_assign(&mut self, rhs: SpatialVec) {
        self.data -= rhs.data;
    }
}

impl std::ops::Mul<f64> for SpatialVec {
    type Output = SpatialVec;
    #[inline]
    fn mul(self, rhs: f64) -> SpatialVec {
        SpatialVec {
            data: self.data * rhs,
        }
    }
}

impl std::ops::Neg for SpatialVec {
    type Output = SpatialVec;
    #[inline]
    fn neg(self) -> SpatialVec {
        SpatialVec { data: -self.data }
    }
}

/// 6x6 spatial matrix (articulated inertias).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialMat {
    pub data: Mat6,
}

impl SpatialMat {
    #[inline]
    pub fn from_mat6(data: Mat6) -> Self {
        Self { data }
    }

    #[inline]
    pub fn zero() -> Self {
        Self {
            data: Mat6::zeros(),
        }
    }

    #[inline]
    pub fn mul_vec(&self, v: &SpatialVec) -> SpatialVec {
        SpatialVec {
            data: self.data * v.data,
        }
    }

    /// `a bᵀ`.
    #[inline]
    pub fn outer(a: &SpatialVec, b: &SpatialVec) -> SpatialMat {
        SpatialMat {
            data: a.data * b.data.transpose(),
        }
    }

    pub fn try_inverse(&self) -> Option<SpatialMat> {
        self.data.try_inverse().map(SpatialMat::from_mat6)
    }
}

impl std::ops::Add for SpatialMat {
    type Output = SpatialMat;
    #[inline]
    fn add(self, rhs: SpatialMat) -> SpatialMat {
        SpatialMat {
            data: self.data + rhs.data,
        }
    }
}

impl std::ops::AddAssign for SpatialMat {
    #[inline]
    fn add_assign(&mut self, rhs: SpatialMat) {
        self.data += rhs.data;
    }
}

impl std::ops::Sub for SpatialMat {
    type Output = SpatialMat;
    #[inline]
    fn sub(self, rhs: SpatialMat) -> SpatialMat {
        SpatialMat {
            data: self.data - rhs.data,
        }
    }
}

impl std::ops::Mul<f64> for SpatialMat {
    type Output = SpatialMat;
    #[inline]
    fn mul(self, rhs: f64) -> SpatialMat {
        SpatialMat {
            data: self.data * rhs,
        }
    }
}

/// Plücker transform: coordinate change from frame A to frame B.
///
/// Stored as rotation R (A coordinates to B coordinates) and the position of
/// B's origin expressed in A.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialTransform {
    pub rot: Mat3,
    pub pos: Vec3,
}

impl SpatialTransform {
    pub fn new(rot: Mat3, pos: Vec3) -> Self {
        Self { rot, pos }
    }

    pub fn identity() -> Self {
        Self {
            rot: Mat3::identity(),
            pos: Vec3::zeros(),
        }
    }

    /// Coordinate change from the frame placed at `from` to the frame placed
    /// at `to`, both poses given in a common (world) frame.
    pub fn between(from: &Pose, to: &Pose) -> Self {
        let from_t = from.rot.transpose();
        Self {
            rot: to.rot.transpose() * from.rot,
            pos: from_t * (to.pos - from.pos),
        }
    }

    /// Coordinate change from world coordinates to the frame placed at `pose`.
    pub fn from_world(pose: &Pose) -> Self {
        Self {
            rot: pose.rot.transpose(),
            pos: pose.pos,
        }
    }

    /// 6x6 motion transform:
    ///
    /// X = |   R      0 |
    ///     | -R[p]×   R |
    pub fn to_motion_matrix(&self) -> Mat6 {
        let r = self.rot;
        let mut m = Mat6::zeros();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&r);
        m.fixed_view_mut::<3, 3>(3, 0).copy_from(&(-r * skew(&self.pos)));
        m.fixed_view_mut::<3, 3>(3, 3).copy_from(&r);
        m
    }

    /// 6x6 force transform (inverse transpose of the motion transform):
    ///
    /// X* = | R  -R[p]× |
    ///      | 0    R    |
    pub fn to_force_matrix(&self) -> Mat6 {
        let r = self.rot;
        let mut m = Mat6::zeros();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&r);
        m.fixed_view_mut::<3, 3>(0, 3).copy_from(&(-r * skew(&self.pos)));
        m.fixed_view_mut::<3, 3>(3, 3).copy_from(&r);
        m
    }

    /// Motion vector from A coordinates to B coordinates.
    pub fn apply_motion(&self, v: &SpatialVec) -> SpatialVec {
        let w = v.angular();
        SpatialVec::new(self.rot * w, self.rot * (v.linear() - self.pos.cross(&w)))
    }

    /// Force vector from A coordinates to B coordinates.
    pub fn apply_force(&self, f: &SpatialVec) -> SpatialVec {
        let force = f.linear();
        SpatialVec::new(
            self.rot * (f.angular() - self.pos.cross(&force)),
            self.rot * force,
        )
    }

    /// Motion vector from B coordinates back to A coordinates.
    pub fn inv_apply_motion(&self, v: &SpatialVec) -> SpatialVec {
        let rt = self.rot.transpose();
        let w = rt * v.angular();
        SpatialVec::new(w, rt * v.linear() + self.pos.cross(&w))
    }

    /// Force vector from B coordinates back to A coordinates.
    pub fn inv_apply_force(&self, f: &SpatialVec) -> SpatialVec {
        let rt = self.rot.transpose();
        let force = rt * f.linear();
        SpatialVec::new(rt * f.angular() + self.pos.cross(&force), force)
    }

    /// Articulated inertia expressed in B coordinates, moved to A: `Xᵀ I X`.
    pub fn inv_apply_inertia(&self, inertia: &SpatialMat) -> SpatialMat {
        let x = self.to_motion_matrix();
        SpatialMat::from_mat6(x.transpose() * inertia.data * x)
    }

    /// Compose `self ∘ other`, where `other` maps A→B and `self` maps B→C.
    pub fn compose(&self, other: &SpatialTransform) -> SpatialTransform {
        SpatialTransform {
            rot: self.rot * other.rot,
            pos: other.pos + other.rot.transpose() * self.pos,
        }
    }

    pub fn inverse(&self) -> SpatialTransform {
        SpatialTransform {
            rot: self.rot.transpose(),
            pos: -(self.rot * self.pos),
        }
    }
}

/// Rigid-body inertia: mass, center of mass and rotational inertia about the
/// center of mass, all in the body frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialInertia {
    pub mass: f64,
    pub com: Vec3,
    pub inertia: Mat3,
}

impl SpatialInertia {
    pub fn new(mass: f64, com: Vec3, inertia: Mat3) -> Self {
        Self { mass, com, inertia }
    }

    pub fn point_mass(mass: f64, pos: Vec3) -> Self {
        Self {
            mass,
            com: pos,
            inertia: Mat3::zeros(),
        }
    }

    /// Uniform solid box centered on the origin.
    pub fn solid_box(mass: f64, size: Vec3) -> Self {
        let k = mass / 12.0;
        let (x2, y2, z2) = (size.x * size.x, size.y * size.y, size.z * size.z);
        Self {
            mass,
            com: Vec3::zeros(),
            inertia: Mat3::from_diagonal(&Vec3::new(k * (y2 + z2), k * (x2 + z2), k * (x2 + y2))),
        }
    }

    /// Uniform solid cylinder centered on the origin, axis along local Y.
    pub fn solid_cylinder(mass: f64, radius: f64, height: f64) -> Self {
        let axial = 0.5 * mass * radius * radius;
        let radial = mass * (3.0 * radius * radius + height * height) / 12.0;
        Self {
            mass,
            com: Vec3::zeros(),
            inertia: Mat3::from_diagonal(&Vec3::new(radial, axial, radial)),
        }
    }

    /// 6x6 spatial inertia about the body frame origin:
    ///
    /// | I + m[c]×[c]×ᵀ   m[c]× |
    /// | m[c]×ᵀ            m·1  |
    pub fn to_matrix(&self) -> SpatialMat {
        let cx = skew(&self.com);
        let m = self.mass;
        let mut mat = Mat6::zeros();
        mat.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&(self.inertia + cx * cx.transpose() * m));
        mat.fixed_view_mut::<3, 3>(0, 3).copy_from(&(cx * m));
        mat.fixed_view_mut::<3, 3>(3, 0).copy_from(&(cx.transpose() * m));
        mat.fixed_view_mut::<3, 3>(3, 3)
            .copy_from(&(Mat3::identity() * m));
        SpatialMat::from_mat6(mat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cross_motion_of_unit_axes() {
        let v1 = SpatialVec::new(Vec3::z(), Vec3::zeros());
        let v2 = SpatialVec::new(Vec3::x(), Vec3::zeros());
        assert_relative_eq!(v1.cross_motion(&v2).angular(), Vec3::y(), epsilon = 1e-12);
    }

    #[test]
    fn test_between_matches_world_composition() {
        let a = Pose::from_axis_angle(&Vec3::z(), 0.4, Vec3::new(1.0, 2.0, 0.0));
        let b = Pose::from_axis_angle(&Vec3::x(), -0.9, Vec3::new(0.0, 1.0, 3.0));
        let xa = SpatialTransform::from_world(&a);
        let xb = SpatialTransform::from_world(&b);
        let x_ab = SpatialTransform::between(&a, &b);
        let composed = x_ab.compose(&xa);
        assert_relative_eq!(composed.rot, xb.rot, epsilon = 1e-12);
        assert_relative_eq!(composed.pos, xb.pos, epsilon = 1e-12);
    }

    #[test]
    fn test_point_mass_linear_block() {
        let mat = SpatialInertia::point_mass(2.0, Vec3::new(0.0, 1.0, 0.0)).to_matrix();
        for i in 3..6 {
            assert_relative_eq!(mat.data[(i, i)], 2.0, epsilon = 1e-12);
        }
        // Rotation about x through the origin sees m·y².
        assert_relative_eq!(mat.data[(0, 0)], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_solid_box_diagonal() {
        let si = SpatialInertia::solid_box(12.0, Vec3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(si.inertia[(0, 0)], 13.0, epsilon = 1e-12);
        assert_relative_eq!(si.inertia[(1, 1)], 10.0, epsilon = 1e-12);
        assert_relative_eq!(si.inertia[(2, 2)], 5.0, epsilon = 1e-12);
    }
}
