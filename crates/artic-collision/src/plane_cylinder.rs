//! Closed-form contact between a plane and a capped cylinder.

use artic_math::{Pose, Vec3};

use crate::detector::ContactPoint;

/// Contacts of a cylinder (axis along local +Y, centered) with a plane (local
/// XY, normal +Z), both given by world poses.
///
/// Each cap disc contributes at most one point, the bottom disc first. All
/// points share the plane normal, which points from the plane toward the
/// cylinder.
pub fn plane_cylinder(
    plane: &Pose,
    cylinder: &Pose,
    radius: f64,
    height: f64,
) -> Vec<ContactPoint> {
    let n = plane.rot * Vec3::z();
    let d = n.dot(&plane.pos);

    let half = height * 0.5;
    let p_top = cylinder.transform_point(&Vec3::new(0.0, half, 0.0));
    let p_bottom = cylinder.transform_point(&Vec3::new(0.0, -half, 0.0));
    let d_top = p_top.dot(&n) - d;
    let d_bottom = p_bottom.dot(&n) - d;

    if d_top > radius && d_bottom > radius {
        return Vec::new();
    }

    let ratio = if height > 0.0 {
        ((d_top - d_bottom) / height).clamp(-1.0, 1.0)
    } else {
        0.0
    };
    let theta = ratio.asin();
    let rcos = radius * theta.cos();
    let tan = theta.tan();

    // In-plane direction toward the lowest rim point. Zero when the axis is
    // parallel to the normal.
    let w = (p_top - p_bottom).cross(&n).cross(&n);
    let w = w.try_normalize(1e-12).unwrap_or_else(Vec3::zeros);
    // Half the extent of a cap disc's footprint along `w`. A submerged
    // center would otherwise push the point off the disc.
    let reach = radius * ratio.abs();

    let mut contacts = Vec::with_capacity(2);
    for (center, dist) in [(p_bottom, d_bottom), (p_top, d_top)] {
        if rcos >= dist {
            contacts.push(ContactPoint {
                position: center - n * dist - w * (dist * tan).clamp(-reach, reach),
                normal: n,
                depth: rcos - dist,
                is_new: true,
            });
        }
    }
    contacts
}
