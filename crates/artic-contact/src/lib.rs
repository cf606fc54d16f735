//! Collision check pairs and penalty contact forces.
//!
//! The [`ContactRegistry`] holds the link pairs tested every step together
//! with their friction, stiffness and damping. [`resolve_pair`] turns the
//! contact points of one pair into a wrench using spring-damper penalty
//! forces with Coulomb friction.

pub mod error;
pub mod penalty;
pub mod registry;

pub use error::{ContactError, Result};
pub use penalty::{resolve_pair, PairForces, PointForce};
pub use registry::{
    CheckPair, ContactParams, ContactRegistry, ContactState, LinkRef, LinkResolver, PairKey,
    RegistrationPolicy, ResolvedLink, TrackedPoint,
};
