use thiserror::Error;

use artic_collision::GeometryError;
use artic_contact::ContactError;
use artic_model::ModelError;
use artic_rigid::RigidError;

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("contact error: {0}")]
    Contact(#[from] ContactError),

    #[error("dynamics error: {0}")]
    Rigid(#[from] RigidError),

    #[error("unknown character '{0}'")]
    UnknownCharacter(String),

    #[error("character '{0}' is already registered")]
    DuplicateCharacter(String),

    #[error("character '{character}' has {links} links but {shapes} shape lists")]
    ShapeMismatch {
        character: String,
        links: usize,
        shapes: usize,
    },

    #[error("unknown link '{link}' of character '{character}'")]
    UnknownLink { character: String, link: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("a step is already in progress")]
    StepInProgress,
}

pub type Result<T> = std::result::Result<T, WorldError>;
