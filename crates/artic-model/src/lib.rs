//! Articulated body model.
//!
//! A [`BodyTree`] owns its [`Link`]s in an arena and addresses them through
//! stable [`LinkId`]s. Trees are built programmatically or from a
//! [`BodyDescription`].

pub mod description;
pub mod error;
pub mod joint;
pub mod link;
pub mod tree;

pub use description::{BodyDescription, LinkDescription};
pub use error::{ModelError, Result, TreeError};
pub use joint::{Joint, JointKind, JointLimits};
pub use link::{Actuator, BodyId, Link, LinkId};
pub use tree::{BodyTree, Children};
