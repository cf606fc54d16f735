//! Collision geometry and contact detection.
//!
//! Shapes arrive as raw triangle soup or analytic primitives ([`ShapeData`]),
//! become immutable [`CollisionGeometry`] with a BVH, and are cached per model
//! source in a [`GeometryStore`]. [`PairDetector`] finds contact points
//! between two placed geometries.

pub mod aabb;
pub mod bvh;
pub mod detector;
pub mod error;
pub mod geometry;
pub mod mesh;
pub mod plane_cylinder;
pub mod shape;
pub mod store;
pub mod triangle;

pub use aabb::Aabb;
pub use bvh::Bvh;
pub use detector::{ContactPoint, DetectMode, NormalConvention, PairDetector};
pub use error::{GeometryError, Result};
pub use geometry::{build_link, CollisionGeometry, LinkGeometry};
pub use mesh::TriMesh;
pub use shape::{Primitive, PrimitiveKind, ShapeData};
pub use store::{stamp_of, GeometryStore, ModelGeometry};
