//! Joint kinds, limits and the joint-local motion they produce.

use artic_math::{Pose, SpatialVec, Vec3, rodrigues};
use serde::{Deserialize, Serialize};

/// How a link moves relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JointKind {
    /// 6 DOF floating base; only valid on a root link.
    Free,
    /// Rigid attachment, no DOF.
    Fixed,
    /// Rotation about a unit axis expressed in the joint frame.
    Rotational { axis: Vec3 },
    /// Translation along a unit axis expressed in the joint frame.
    Prismatic { axis: Vec3 },
}

impl JointKind {
    pub fn label(&self) -> &'static str {
        match self {
            JointKind::Free => "free",
            JointKind::Fixed => "fixed",
            JointKind::Rotational { .. } => "rotational",
            JointKind::Prismatic { .. } => "prismatic",
        }
    }
}

/// Position and velocity bounds of a single-DOF joint. Unbounded by default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JointLimits {
    pub lower: f64,
    pub upper: f64,
    pub velocity_lower: f64,
    pub velocity_upper: f64,
}

impl Default for JointLimits {
    fn default() -> Self {
        Self {
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
            velocity_lower: f64::NEG_INFINITY,
            velocity_upper: f64::INFINITY,
        }
    }
}

impl JointLimits {
    pub fn position(lower: f64, upper: f64) -> Self {
        Self {
            lower,
            upper,
            ..Self::default()
        }
    }

    /// Clamps `q`, reporting whether a bound was hit.
    pub fn clamp_position(&self, q: f64) -> (f64, bool) {
        if q < self.lower {
            (self.lower, true)
        } else if q > self.upper {
            (self.upper, true)
        } else {
            (q, false)
        }
    }

    pub fn clamp_velocity(&self, dq: f64) -> f64 {
        dq.clamp(self.velocity_lower, self.velocity_upper)
    }
}

/// A joint connecting a link to its parent.
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub kind: JointKind,
    pub limits: JointLimits,
    /// Viscous damping coefficient.
    pub damping: f64,
}

impl Joint {
    pub fn new(kind: JointKind) -> Self {
        let kind = match kind {
            JointKind::Rotational { axis } => JointKind::Rotational {
                axis: axis.normalize(),
            },
            JointKind::Prismatic { axis } => JointKind::Prismatic {
                axis: axis.normalize(),
            },
            other => other,
        };
        Self {
            kind,
            limits: JointLimits::default(),
            damping: 0.0,
        }
    }

    pub fn free() -> Self {
        Self::new(JointKind::Free)
    }

    pub fn fixed() -> Self {
        Self::new(JointKind::Fixed)
    }

    pub fn rotational(axis: Vec3) -> Self {
        Self::new(JointKind::Rotational { axis })
    }

    pub fn prismatic(axis: Vec3) -> Self {
        Self::new(JointKind::Prismatic { axis })
    }

    pub fn with_limits(mut self, limits: JointLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    pub fn ndof(&self) -> usize {
        match self.kind {
            JointKind::Free => 6,
            JointKind::Fixed => 0,
            JointKind::Rotational { .. } | JointKind::Prismatic { .. } => 1,
        }
    }

    pub fn axis(&self) -> Option<Vec3> {
        match self.kind {
            JointKind::Rotational { axis } | JointKind::Prismatic { axis } => Some(axis),
            JointKind::Free | JointKind::Fixed => None,
        }
    }

    /// Placement of the moving frame in the joint frame at position `q`.
    pub fn local_transform(&self, q: f64) -> Pose {
        match self.kind {
            JointKind::Rotational { axis } => Pose::new(rodrigues(&axis, q), Vec3::zeros()),
            JointKind::Prismatic { axis } => Pose::from_translation(axis * q),
            JointKind::Free | JointKind::Fixed => Pose::identity(),
        }
    }

    /// Motion subspace of a single-DOF joint, in the moving frame.
    ///
    /// The axis is invariant under its own rotation, so the subspace is
    /// constant in link coordinates.
    pub fn motion_subspace(&self) -> Option<SpatialVec> {
        match self.kind {
            JointKind::Rotational { axis } => Some(SpatialVec::new(axis, Vec3::zeros())),
            JointKind::Prismatic { axis } => Some(SpatialVec::new(Vec3::zeros(), axis)),
            JointKind::Free | JointKind::Fixed => None,
        }
    }
}
