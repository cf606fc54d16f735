//! Fixed-step time integration of joint state.

use artic_math::{Quat, SpatialVec};
use artic_model::{BodyTree, JointKind, Link};
use serde::{Deserialize, Serialize};

/// Advances a tree's joint state by one timestep from accelerations already
/// stored in the links (`ddq`) and, for a free root, `root_acc`.
pub trait Integrator: Send + Sync {
    fn advance(&self, tree: &mut BodyTree, root_acc: Option<&SpatialVec>, dt: f64);
}

/// Velocity first, then position with the updated velocity.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemiImplicitEuler;

/// Position with the old velocity, then velocity.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplicitEuler;

impl Integrator for SemiImplicitEuler {
    fn advance(&self, tree: &mut BodyTree, root_acc: Option<&SpatialVec>, dt: f64) {
        advance_tree(tree, root_acc, dt, true);
    }
}

impl Integrator for ExplicitEuler {
    fn advance(&self, tree: &mut BodyTree, root_acc: Option<&SpatialVec>, dt: f64) {
        advance_tree(tree, root_acc, dt, false);
    }
}

/// Integrator selection, as it appears in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationMethod {
    #[default]
    SemiImplicitEuler,
    ExplicitEuler,
}

impl IntegrationMethod {
    pub fn integrator(self) -> Box<dyn Integrator> {
        match self {
            IntegrationMethod::SemiImplicitEuler => Box::new(SemiImplicitEuler),
            IntegrationMethod::ExplicitEuler => Box::new(ExplicitEuler),
        }
    }
}

fn advance_tree(tree: &mut BodyTree, root_acc: Option<&SpatialVec>, dt: f64, semi_implicit: bool) {
    let root = tree.root();
    for id in tree.preorder() {
        let link = &mut tree[id];
        match link.joint.kind {
            JointKind::Rotational { .. } | JointKind::Prismatic { .. } => {
                advance_joint(link, dt, semi_implicit);
            }
            JointKind::Free if id == root => {
                if let Some(acc) = root_acc {
                    advance_floating(link, acc, dt, semi_implicit);
                }
            }
            JointKind::Free | JointKind::Fixed => {}
        }
    }
}

fn advance_joint(link: &mut Link, dt: f64, semi_implicit: bool) {
    let limits = link.joint.limits;
    let dq_next = limits.clamp_velocity(link.dq + link.ddq * dt);
    let dq_used = if semi_implicit { dq_next } else { link.dq };
    let (q, hit) = limits.clamp_position(link.q + dq_used * dt);
    let outward = (q <= limits.lower && dq_next < 0.0) || (q >= limits.upper && dq_next > 0.0);
    link.q = q;
    link.dq = if hit || outward { 0.0 } else { dq_next };
}

fn advance_floating(link: &mut Link, acc: &SpatialVec, dt: f64, semi_implicit: bool) {
    let rot_t = link.pose.rot.transpose();
    let body_vel = SpatialVec::new(rot_t * link.angular_velocity, rot_t * link.linear_velocity);
    let next = body_vel + *acc * dt;
    let used = if semi_implicit { next } else { body_vel };

    link.pose.pos += link.pose.rot * used.linear() * dt;
    let q = Quat::from_matrix(&link.pose.rot).mul(&Quat::exp(&(used.angular() * dt)));
    link.pose.rot = q.normalize().to_matrix();

    link.angular_velocity = link.pose.rot * next.angular();
    link.linear_velocity = link.pose.rot * next.linear();
}
