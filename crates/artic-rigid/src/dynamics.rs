//! Articulated Body Algorithm (ABA), O(n) forward dynamics.
//!
//! Three passes over the tree in preorder:
//! 1. Forward: link velocities, velocity-product and bias forces
//! 2. Backward: articulated inertias and bias forces
//! 3. Forward: accelerations
//!
//! Quantities are expressed in link coordinates. Link poses must be current,
//! so run [`forward_kinematics`](crate::forward_kinematics) first.

use std::collections::HashMap;

use artic_math::{SpatialMat, SpatialTransform, SpatialVec, Vec3};
use artic_model::{BodyTree, JointKind, LinkId};

use crate::error::{Result, RigidError};

/// Below this joint-space inertia a single-DOF joint is treated as locked.
const MIN_JOINT_INERTIA: f64 = 1e-20;

#[derive(Debug, Clone, Copy)]
enum Dof {
    Locked,
    Single {
        s: SpatialVec,
        tau: f64,
        armature: f64,
    },
    Floating,
}

/// Factorization of a single-DOF joint from the backward pass.
#[derive(Debug, Clone, Copy)]
struct Projected {
    u_vec: SpatialVec,
    d: f64,
    u: f64,
}

/// Computes joint accelerations and stores them in each link's `ddq`.
///
/// Inputs are joint efforts `u`, joint damping, `gravity` and the external
/// force/torque accumulated on each link. Returns the body-frame acceleration
/// `[ω̇; v̇]` of a free root, `None` for a fixed or hinged root.
pub fn forward_dynamics(tree: &mut BodyTree, gravity: &Vec3) -> Result<Option<SpatialVec>> {
    let order = tree.preorder();
    let n = order.len();
    let index: HashMap<LinkId, usize> = order.iter().enumerate().map(|(i, &id)| (id, i)).collect();
    let parent: Vec<Option<usize>> = order
        .iter()
        .map(|&id| tree.parent(id).and_then(|p| index.get(&p).copied()))
        .collect();

    let mut x = vec![SpatialTransform::identity(); n];
    let mut dof = vec![Dof::Locked; n];
    let mut vel = vec![SpatialVec::zero(); n];
    let mut c_bias = vec![SpatialVec::zero(); n];
    let mut i_a = vec![SpatialMat::zero(); n];
    let mut p_a = vec![SpatialVec::zero(); n];
    let mut projected: Vec<Option<Projected>> = vec![None; n];

    // Gravity enters as an upward base acceleration.
    let a0 = SpatialVec::new(Vec3::zeros(), -gravity);

    // -- Pass 1: velocities and bias forces --
    for i in 0..n {
        let link = &tree[order[i]];
        let rot_t = link.pose.rot.transpose();
        x[i] = match parent[i] {
            Some(p) => SpatialTransform::between(&tree[order[p]].pose, &link.pose),
            None => SpatialTransform::from_world(&link.pose),
        };

        dof[i] = match (link.joint.kind, link.joint.motion_subspace()) {
            (JointKind::Free, _) if parent[i].is_none() => Dof::Floating,
            (_, Some(s)) => Dof::Single {
                s,
                tau: link.u - link.joint.damping * link.dq,
                armature: link.actuator.reflected_inertia(),
            },
            _ => Dof::Locked,
        };

        let v_joint = match dof[i] {
            Dof::Floating => {
                SpatialVec::new(rot_t * link.angular_velocity, rot_t * link.linear_velocity)
            }
            Dof::Single { s, .. } => s * link.dq,
            Dof::Locked => SpatialVec::zero(),
        };

        match parent[i] {
            Some(p) => {
                vel[i] = x[i].apply_motion(&vel[p]) + v_joint;
                c_bias[i] = vel[i].cross_motion(&v_joint);
            }
            None => vel[i] = v_joint,
        }

        i_a[i] = link.spatial_inertia().to_matrix();
        let external = SpatialVec::new(rot_t * link.ext_torque, rot_t * link.ext_force);
        p_a[i] = vel[i].cross_force(&i_a[i].mul_vec(&vel[i])) - external;
    }

    // -- Pass 2: articulated inertias, leaves first --
    for i in (0..n).rev() {
        let (ia_up, pa_up) = match dof[i] {
            Dof::Floating => continue,
            Dof::Single { s, tau, armature } => {
                let u_vec = i_a[i].mul_vec(&s);
                let d = s.dot(&u_vec) + armature;
                if d.abs() < MIN_JOINT_INERTIA {
                    (i_a[i], p_a[i] + i_a[i].mul_vec(&c_bias[i]))
                } else {
                    let u = tau - s.dot(&p_a[i]);
                    projected[i] = Some(Projected { u_vec, d, u });
                    let ia = i_a[i] - SpatialMat::outer(&u_vec, &u_vec) * (1.0 / d);
                    let pa = p_a[i] + ia.mul_vec(&c_bias[i]) + u_vec * (u / d);
                    (ia, pa)
                }
            }
            Dof::Locked => (i_a[i], p_a[i] + i_a[i].mul_vec(&c_bias[i])),
        };
        if let Some(p) = parent[i] {
            let ia_parent = x[i].inv_apply_inertia(&ia_up);
            let pa_parent = x[i].inv_apply_force(&pa_up);
            i_a[p] += ia_parent;
            p_a[p] += pa_parent;
        }
    }

    // -- Pass 3: accelerations, root first --
    let mut acc = vec![SpatialVec::zero(); n];
    let mut root_acc = None;
    for i in 0..n {
        let a_parent = match parent[i] {
            Some(p) => x[i].apply_motion(&acc[p]),
            None => x[i].apply_motion(&a0),
        };
        let a = a_parent + c_bias[i];
        match (dof[i], projected[i]) {
            (Dof::Single { s, .. }, Some(pj)) => {
                let qdd = (pj.u - pj.u_vec.dot(&a)) / pj.d;
                tree[order[i]].ddq = qdd;
                acc[i] = a + s * qdd;
            }
            (Dof::Floating, _) => {
                let inv = i_a[i].try_inverse().ok_or_else(|| RigidError::SingularInertia {
                    link: tree[order[i]].name.clone(),
                })?;
                acc[i] = -inv.mul_vec(&p_a[i]);
                root_acc = Some(acc[i] - a);
            }
            _ => {
                tree[order[i]].ddq = 0.0;
                acc[i] = a;
            }
        }
    }

    Ok(root_acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forward_kinematics;
    use approx::assert_relative_eq;
    use artic_math::{Mat3, Pose, SpatialInertia};
    use artic_model::{Actuator, Joint, Link};

    fn g() -> Vec3 {
        Vec3::new(0.0, 0.0, -9.81)
    }

    fn pendulum(length: f64, mass: f64) -> BodyTree {
        let bob = Link::new("bob", Joint::rotational(Vec3::y()))
            .with_spatial_inertia(SpatialInertia::point_mass(mass, Vec3::new(length, 0.0, 0.0)));
        BodyTree::new("pendulum", bob)
    }

    #[test]
    fn test_horizontal_pendulum_acceleration() {
        let mut tree = pendulum(0.5, 2.0);
        forward_kinematics(&mut tree);
        let root_acc = forward_dynamics(&mut tree, &g()).unwrap();
        assert!(root_acc.is_none());
        // Gravity torque m g l over m l².
        assert_relative_eq!(tree[tree.root()].ddq, 9.81 / 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_hanging_pendulum_is_at_rest() {
        let mut tree = pendulum(1.0, 1.0);
        let root = tree.root();
        tree[root].q = std::f64::consts::FRAC_PI_2;
        forward_kinematics(&mut tree);
        forward_dynamics(&mut tree, &g()).unwrap();
        assert_relative_eq!(tree[root].ddq, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rotor_inertia_slows_joint() {
        let mut tree = pendulum(1.0, 1.0);
        let root = tree.root();
        tree[root].actuator = Actuator {
            gear_ratio: 10.0,
            rotor_inertia: 0.01,
            ..Actuator::default()
        };
        forward_kinematics(&mut tree);
        forward_dynamics(&mut tree, &g()).unwrap();
        assert_relative_eq!(tree[root].ddq, 9.81 / 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_joint_effort_balances_gravity() {
        let mut tree = pendulum(1.0, 3.0);
        let root = tree.root();
        // Torque about +Y opposing the gravity moment.
        tree[root].u = -3.0 * 9.81;
        forward_kinematics(&mut tree);
        forward_dynamics(&mut tree, &g()).unwrap();
        assert_relative_eq!(tree[root].ddq, 0.0, epsilon = 1e-9);
    }

    fn free_box() -> BodyTree {
        let body = Link::new("body", Joint::free())
            .with_spatial_inertia(SpatialInertia::solid_box(2.0, Vec3::new(0.2, 0.4, 0.6)));
        let mut tree = BodyTree::new("box", body);
        let root = tree.root();
        tree[root].pose = Pose::from_axis_angle(&Vec3::new(1.0, 1.0, 0.0).normalize(), 0.7, Vec3::new(0.0, 0.0, 1.0));
        tree
    }

    #[test]
    fn test_free_body_falls_with_gravity() {
        let mut tree = free_box();
        let root = tree.root();
        forward_kinematics(&mut tree);
        let acc = forward_dynamics(&mut tree, &g()).unwrap().unwrap();
        let rot = tree[root].pose.rot;
        assert_relative_eq!(acc.angular(), Vec3::zeros(), epsilon = 1e-9);
        assert_relative_eq!(rot * acc.linear(), g(), epsilon = 1e-9);
    }

    #[test]
    fn test_external_force_cancels_gravity() {
        let mut tree = free_box();
        let root = tree.root();
        tree[root].ext_force = Vec3::new(0.0, 0.0, 2.0 * 9.81);
        forward_kinematics(&mut tree);
        let acc = forward_dynamics(&mut tree, &g()).unwrap().unwrap();
        assert_relative_eq!(acc.data, SpatialVec::zero().data, epsilon = 1e-9);
    }

    #[test]
    fn test_fixed_child_falls_with_root() {
        let mut tree = free_box();
        let root = tree.root();
        tree.push_child(
            root,
            Link::new("payload", Joint::fixed())
                .with_offset(Pose::from_translation(Vec3::new(0.5, 0.0, 0.0)))
                .with_inertia(1.0, Vec3::zeros(), Mat3::identity() * 0.01),
        )
        .unwrap();
        forward_kinematics(&mut tree);
        let acc = forward_dynamics(&mut tree, &g()).unwrap().unwrap();
        let rot = tree[root].pose.rot;
        assert_relative_eq!(acc.angular(), Vec3::zeros(), epsilon = 1e-9);
        assert_relative_eq!(rot * acc.linear(), g(), epsilon = 1e-9);
    }

    #[test]
    fn test_massless_free_root_is_singular() {
        let mut tree = BodyTree::new("ghost", Link::new("body", Joint::free()));
        forward_kinematics(&mut tree);
        assert!(matches!(
            forward_dynamics(&mut tree, &g()),
            Err(RigidError::SingularInertia { .. })
        ));
    }
}
