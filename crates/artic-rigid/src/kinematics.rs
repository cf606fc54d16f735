//! Forward kinematics: world poses and velocities of every link.

use artic_math::{Pose, Vec3};
use artic_model::{BodyTree, JointKind, Link};

/// Updates `pose`, `linear_velocity` and `angular_velocity` of every attached
/// link from the joint state, root first.
///
/// A free root keeps its pose and velocity (they are its state). Any other
/// root is placed by `offset` in the world, as if hinged to a static base.
/// Free joints below the root are treated as rigid.
pub fn forward_kinematics(tree: &mut BodyTree) {
    for id in tree.preorder() {
        let base = match tree.parent(id) {
            Some(p) => {
                let parent = &tree[p];
                Some((parent.pose, parent.linear_velocity, parent.angular_velocity))
            }
            None => None,
        };
        let link = &mut tree[id];
        match base {
            Some((pose, v, w)) => propagate(link, &pose, &v, &w),
            None if link.joint.kind == JointKind::Free => {}
            None => propagate(link, &Pose::identity(), &Vec3::zeros(), &Vec3::zeros()),
        }
    }
}

fn propagate(link: &mut Link, parent: &Pose, parent_v: &Vec3, parent_w: &Vec3) {
    let joint_frame = parent.compose(&link.offset);
    link.pose = joint_frame.compose(&link.joint.local_transform(link.q));

    let mut w = *parent_w;
    let mut v = parent_v + parent_w.cross(&(link.pose.pos - parent.pos));
    match link.joint.kind {
        JointKind::Rotational { axis } => w += link.pose.rot * axis * link.dq,
        JointKind::Prismatic { axis } => v += link.pose.rot * axis * link.dq,
        JointKind::Free | JointKind::Fixed => {}
    }
    link.linear_velocity = v;
    link.angular_velocity = w;
}
