use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RigidError {
    #[error("articulated inertia of free link '{link}' is singular")]
    SingularInertia { link: String },
}

pub type Result<T> = std::result::Result<T, RigidError>;
