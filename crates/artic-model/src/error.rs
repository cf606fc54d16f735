use thiserror::Error;

use crate::link::LinkId;

/// Rejected structural edits of a [`BodyTree`](crate::BodyTree).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("link {0:?} is not in this tree's arena")]
    UnknownLink(LinkId),

    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    WouldCycle { parent: LinkId, child: LinkId },

    #[error("the root link cannot be given a parent")]
    RootReparent,

    #[error("link {0:?} is still attached to the tree")]
    StillAttached(LinkId),
}

/// Errors while turning a [`BodyDescription`](crate::BodyDescription) into a tree.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("body description has no links")]
    Empty,

    #[error("first link '{0}' must be the root (no parent)")]
    NoRoot(String),

    #[error("link '{0}' has no parent but '{1}' is already the root")]
    MultipleRoots(String, String),

    #[error("link '{link}' names unknown or later-declared parent '{parent}'")]
    UnknownParent { link: String, parent: String },

    #[error("duplicate link name '{0}'")]
    DuplicateName(String),

    #[error("link '{0}' has a zero-length joint axis")]
    ZeroAxis(String),

    #[error("free joint on non-root link '{0}'")]
    FreeJointNotAtRoot(String),

    #[error("link '{link}' has invalid mass {mass}")]
    InvalidMass { link: String, mass: f64 },

    #[error("free root link '{0}' needs positive mass and positive-definite inertia")]
    SingularFreeRoot(String),

    #[error(transparent)]
    Tree(#[from] TreeError),
}

pub type Result<T> = std::result::Result<T, ModelError>;
