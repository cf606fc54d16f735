//! Serializable body description, the already-parsed form of a model file.

use std::collections::HashMap;

use artic_math::{Mat3, Pose, Vec3, rodrigues};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::joint::{Joint, JointKind, JointLimits};
use crate::link::{Actuator, Link, LinkId};
use crate::tree::BodyTree;

/// A body as a flat list of links; parents must be declared before children.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BodyDescription {
    #[serde(default)]
    pub name: String,
    pub links: Vec<LinkDescription>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkDescription {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    pub joint: JointKind,
    #[serde(default)]
    pub joint_id: Option<usize>,
    /// Joint frame origin in the parent frame (world placement for the root).
    #[serde(default = "zero_vec")]
    pub translation: Vec3,
    /// Joint frame orientation as `[axis_x, axis_y, axis_z, angle]`.
    #[serde(default = "no_rotation")]
    pub rotation: [f64; 4],
    #[serde(default)]
    pub mass: f64,
    #[serde(default = "zero_vec")]
    pub com: Vec3,
    /// Row-major inertia about the center of mass.
    #[serde(default)]
    pub inertia: [f64; 9],
    #[serde(default)]
    pub limits: JointLimits,
    #[serde(default)]
    pub damping: f64,
    #[serde(default)]
    pub actuator: Actuator,
}

fn zero_vec() -> Vec3 {
    Vec3::zeros()
}

fn no_rotation() -> [f64; 4] {
    [0.0, 0.0, 1.0, 0.0]
}

impl LinkDescription {
    pub fn new(name: impl Into<String>, parent: Option<&str>, joint: JointKind) -> Self {
        Self {
            name: name.into(),
            parent: parent.map(str::to_owned),
            joint,
            joint_id: None,
            translation: Vec3::zeros(),
            rotation: no_rotation(),
            mass: 0.0,
            com: Vec3::zeros(),
            inertia: [0.0; 9],
            limits: JointLimits::default(),
            damping: 0.0,
            actuator: Actuator::default(),
        }
    }

    fn offset(&self) -> Pose {
        let [x, y, z, angle] = self.rotation;
        let axis = Vec3::new(x, y, z);
        let rot = if angle == 0.0 || axis.norm() < 1e-12 {
            Mat3::identity()
        } else {
            rodrigues(&axis.normalize(), angle)
        };
        Pose::new(rot, self.translation)
    }

    fn to_link(&self, is_root: bool) -> Result<Link> {
        match self.joint {
            JointKind::Rotational { axis } | JointKind::Prismatic { axis }
                if axis.norm() < 1e-12 =>
            {
                return Err(ModelError::ZeroAxis(self.name.clone()));
            }
            JointKind::Free if !is_root => {
                return Err(ModelError::FreeJointNotAtRoot(self.name.clone()));
            }
            _ => {}
        }
        if !(self.mass.is_finite() && self.mass >= 0.0) {
            return Err(ModelError::InvalidMass {
                link: self.name.clone(),
                mass: self.mass,
            });
        }
        // A free root's own inertia keeps its articulated inertia invertible.
        if self.joint == JointKind::Free
            && (self.mass <= 0.0 || Mat3::from_row_slice(&self.inertia).cholesky().is_none())
        {
            return Err(ModelError::SingularFreeRoot(self.name.clone()));
        }

        let joint = Joint::new(self.joint)
            .with_limits(self.limits)
            .with_damping(self.damping);
        let mut link = Link::new(self.name.clone(), joint).with_inertia(
            self.mass,
            self.com,
            Mat3::from_row_slice(&self.inertia),
        );
        link.joint_id = self.joint_id;
        link.actuator = self.actuator;
        link.offset = self.offset();
        if is_root {
            link.pose = link.offset;
        }
        Ok(link)
    }
}

impl BodyTree {
    /// Builds a tree from a description, validating the whole description
    /// before anything is returned.
    pub fn from_description(desc: &BodyDescription) -> Result<BodyTree> {
        let (first, rest) = desc.links.split_first().ok_or(ModelError::Empty)?;
        if first.parent.is_some() {
            return Err(ModelError::NoRoot(first.name.clone()));
        }

        let mut tree = BodyTree::new(desc.name.clone(), first.to_link(true)?);
        let mut by_name: HashMap<&str, LinkId> = HashMap::new();
        by_name.insert(first.name.as_str(), tree.root());

        for ld in rest {
            if by_name.contains_key(ld.name.as_str()) {
                return Err(ModelError::DuplicateName(ld.name.clone()));
            }
            let parent_name = ld
                .parent
                .as_deref()
                .ok_or_else(|| ModelError::MultipleRoots(ld.name.clone(), first.name.clone()))?;
            let parent = *by_name
                .get(parent_name)
                .ok_or_else(|| ModelError::UnknownParent {
                    link: ld.name.clone(),
                    parent: parent_name.to_owned(),
                })?;
            let id = tree.push_child(parent, ld.to_link(false)?)?;
            by_name.insert(ld.name.as_str(), id);
        }
        Ok(tree)
    }
}
