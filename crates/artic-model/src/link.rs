//! Rigid link: joint, inertial and actuator parameters plus kinematic state.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use artic_math::{Mat3, Pose, SpatialInertia, Vec3};
use serde::{Deserialize, Serialize};

use crate::joint::Joint;

slotmap::new_key_type! {
    /// Stable handle of a link inside its tree's arena.
    pub struct LinkId;
}

/// Identity of a [`BodyTree`](crate::BodyTree). Every tree, clones included,
/// gets a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(u64);

static NEXT_BODY_ID: AtomicU64 = AtomicU64::new(1);

impl BodyId {
    pub(crate) fn fresh() -> Self {
        BodyId(NEXT_BODY_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

/// Motor and transmission parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Actuator {
    pub gear_ratio: f64,
    pub torque_const: f64,
    pub rotor_inertia: f64,
}

impl Default for Actuator {
    fn default() -> Self {
        Self {
            gear_ratio: 1.0,
            torque_const: 1.0,
            rotor_inertia: 0.0,
        }
    }
}

impl Actuator {
    /// Rotor inertia seen at the joint side of the transmission.
    pub fn reflected_inertia(&self) -> f64 {
        self.rotor_inertia * self.gear_ratio * self.gear_ratio
    }
}

/// One rigid link of an articulated body.
///
/// Topology (parent, children, owning body) is managed by the tree and only
/// readable here.
#[derive(Debug, Clone)]
pub struct Link {
    pub name: String,
    /// External joint numbering, `None` for unnumbered links.
    pub joint_id: Option<usize>,
    pub joint: Joint,
    /// Placement of the joint frame in the parent link frame, or in the world
    /// for a root. A free root is placed by `pose` instead.
    pub offset: Pose,

    pub q: f64,
    pub dq: f64,
    pub ddq: f64,
    /// Applied joint effort (torque or force).
    pub u: f64,

    pub mass: f64,
    /// Center of mass in the link frame.
    pub com: Vec3,
    /// Inertia about the center of mass, link frame.
    pub inertia: Mat3,
    pub actuator: Actuator,

    /// World placement, updated by forward kinematics.
    pub pose: Pose,
    /// World velocity of the link origin.
    pub linear_velocity: Vec3,
    /// World angular velocity.
    pub angular_velocity: Vec3,

    /// Accumulated external force, world frame.
    pub ext_force: Vec3,
    /// Accumulated external torque about the link origin, world frame.
    pub ext_torque: Vec3,

    pub(crate) parent: Option<LinkId>,
    pub(crate) first_child: Option<LinkId>,
    pub(crate) next_sibling: Option<LinkId>,
    pub(crate) owner: Option<BodyId>,
}

impl Link {
    pub fn new(name: impl Into<String>, joint: Joint) -> Self {
        Self {
            name: name.into(),
            joint_id: None,
            joint,
            offset: Pose::identity(),
            q: 0.0,
            dq: 0.0,
            ddq: 0.0,
            u: 0.0,
            mass: 0.0,
            com: Vec3::zeros(),
            inertia: Mat3::zeros(),
            actuator: Actuator::default(),
            pose: Pose::identity(),
            linear_velocity: Vec3::zeros(),
            angular_velocity: Vec3::zeros(),
            ext_force: Vec3::zeros(),
            ext_torque: Vec3::zeros(),
            parent: None,
            first_child: None,
            next_sibling: None,
            owner: None,
        }
    }

    pub fn with_offset(mut self, offset: Pose) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_inertia(mut self, mass: f64, com: Vec3, inertia: Mat3) -> Self {
        self.mass = mass;
        self.com = com;
        self.inertia = inertia;
        self
    }

    pub fn with_spatial_inertia(self, si: SpatialInertia) -> Self {
        self.with_inertia(si.mass, si.com, si.inertia)
    }

    pub fn spatial_inertia(&self) -> SpatialInertia {
        SpatialInertia::new(self.mass, self.com, self.inertia)
    }

    pub fn parent(&self) -> Option<LinkId> {
        self.parent
    }

    /// Body owning this link, `None` while detached.
    pub fn owner(&self) -> Option<BodyId> {
        self.owner
    }

    /// World velocity of a point given in world coordinates.
    pub fn point_velocity(&self, point: &Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(&(point - self.pose.pos))
    }

    /// Adds a world-frame force acting at a world point.
    pub fn apply_force_at(&mut self, force: &Vec3, point: &Vec3) {
        self.ext_force += force;
        self.ext_torque += (point - self.pose.pos).cross(force);
    }

    pub fn clear_external(&mut self) {
        self.ext_force = Vec3::zeros();
        self.ext_torque = Vec3::zeros();
    }

    /// Detached copy without topology.
    pub(crate) fn orphaned(&self, owner: Option<BodyId>) -> Link {
        Link {
            parent: None,
            first_child: None,
            next_sibling: None,
            owner,
            ..self.clone()
        }
    }
}

fn fmt_vec(v: &Vec3) -> String {
    format!("{} {} {}", v.x, v.y, v.z)
}

fn fmt_mat(m: &Mat3) -> String {
    (0..3)
        .map(|r| fmt_vec(&m.row(r).transpose()))
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Link {}", self.name)?;
        match self.joint_id {
            Some(id) => writeln!(f, "  joint id: {id}")?,
            None => writeln!(f, "  joint id: -")?,
        }
        write!(f, "  joint type: {}", self.joint.kind.label())?;
        match self.joint.axis() {
            Some(axis) => writeln!(f, ", axis: {}", fmt_vec(&axis))?,
            None => writeln!(f)?,
        }
        writeln!(f, "  b: {}", fmt_vec(&self.offset.pos))?;
        writeln!(f, "  c: {}", fmt_vec(&self.com))?;
        writeln!(f, "  m: {}", self.mass)?;
        writeln!(f, "  I: {}", fmt_mat(&self.inertia))?;
        writeln!(f, "  Ir: {}", self.actuator.rotor_inertia)?;
        writeln!(f, "  gear ratio: {}", self.actuator.gear_ratio)?;
        writeln!(f, "  torque const: {}", self.actuator.torque_const)?;
        writeln!(f, "  Jm2: {}", self.actuator.reflected_inertia())?;
        let l = &self.joint.limits;
        writeln!(f, "  llimit: {}, ulimit: {}", l.lower, l.upper)?;
        writeln!(f, "  lvlimit: {}, uvlimit: {}", l.velocity_lower, l.velocity_upper)?;
        writeln!(f, "  q: {}, dq: {}, u: {}", self.q, self.dq, self.u)
    }
}
