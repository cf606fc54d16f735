//! Mechanical energy of a body tree, from the current kinematic state.

use artic_math::Vec3;
use artic_model::BodyTree;

/// Σ ½ m |v_com|² + ½ ωᵀ I ω over attached links.
pub fn kinetic_energy(tree: &BodyTree) -> f64 {
    tree.preorder()
        .into_iter()
        .map(|id| {
            let link = &tree[id];
            let com = link.pose.transform_point(&link.com);
            let v = link.point_velocity(&com);
            let w = link.angular_velocity;
            let inertia_world = link.pose.rot * link.inertia * link.pose.rot.transpose();
            0.5 * link.mass * v.norm_squared() + 0.5 * w.dot(&(inertia_world * w))
        })
        .sum()
}

/// -Σ m gᵀ c over attached links.
pub fn potential_energy(tree: &BodyTree, gravity: &Vec3) -> f64 {
    tree.preorder()
        .into_iter()
        .map(|id| {
            let link = &tree[id];
            -link.mass * gravity.dot(&link.pose.transform_point(&link.com))
        })
        .sum()
}

pub fn total_energy(tree: &BodyTree, gravity: &Vec3) -> f64 {
    kinetic_energy(tree) + potential_energy(tree, gravity)
}
