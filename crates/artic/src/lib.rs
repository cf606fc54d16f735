//! artic — articulated rigid-body simulation with mesh and primitive contact.
//!
//! This is the umbrella crate: it re-exports the sub-crates and the types
//! most programs need to build a [`World`], register characters and
//! collision check pairs, and step it.

pub use artic_collision::{
    self, ContactPoint, GeometryStore, NormalConvention, PairDetector, ShapeData,
};
pub use artic_contact::{self, ContactParams, PairKey, RegistrationPolicy};
pub use artic_math::{self, Pose, Vec3, GRAVITY};
pub use artic_model::{self, BodyDescription, BodyTree, JointKind, Link, LinkDescription, LinkId};
pub use artic_rigid::{self, forward_dynamics, forward_kinematics, IntegrationMethod};
pub use artic_world::{
    self, BodyModel, LinkPair, LinkPose, PairContacts, SensorKind, SensorSpec, SharedWorld,
    StepReport, World, WorldConfig, WorldError, WorldState,
};
