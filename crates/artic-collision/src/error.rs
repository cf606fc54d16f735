use thiserror::Error;

use crate::shape::PrimitiveKind;

/// Problems found while turning shape data into collision geometry.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("triangle index count {count} is not a multiple of 3")]
    MalformedTriangles { count: usize },

    #[error("vertex coordinate count {count} is not a multiple of 3")]
    MalformedVertices { count: usize },

    #[error("triangle index {index} out of range for {vertices} vertices")]
    IndexOutOfRange { index: u32, vertices: usize },

    #[error("{kind:?} primitive expects {expected} parameters, got {got}")]
    PrimitiveParameters {
        kind: PrimitiveKind,
        expected: usize,
        got: usize,
    },

    #[error("shape data contains a non-finite value")]
    NonFinite,

    #[error("cannot stat geometry source '{path}': {message}")]
    Source { path: String, message: String },
}

impl GeometryError {
    /// Whether the offending shape can be dropped while the rest of the
    /// model still loads.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, GeometryError::MalformedTriangles { .. })
    }
}

pub type Result<T> = std::result::Result<T, GeometryError>;
