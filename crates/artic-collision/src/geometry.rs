//! Immutable collision geometry built from shape data.

use std::sync::Arc;

use artic_math::Vec3;
use tracing::warn;

use crate::bvh::Bvh;
use crate::error::{GeometryError, Result};
use crate::mesh::TriMesh;
use crate::shape::{Primitive, ShapeData};

/// Triangle mesh in link coordinates, its BVH, and the analytic primitive it
/// came from when there is exactly one.
#[derive(Debug, Clone)]
pub struct CollisionGeometry {
    pub mesh: TriMesh,
    pub primitive: Option<Primitive>,
    pub bvh: Bvh,
}

impl CollisionGeometry {
    /// Validates `shape` and builds its geometry.
    ///
    /// A primitive without triangles is tessellated; its (empty) index list
    /// is not validated.
    pub fn build(shape: &ShapeData) -> Result<Self> {
        if shape.parameters.iter().chain(&shape.vertices).any(|v| !v.is_finite()) {
            return Err(GeometryError::NonFinite);
        }
        let primitive = Primitive::from_shape(shape)?;
        let mesh = match primitive {
            Some(p) if shape.triangles.is_empty() => TriMesh::tessellate(&p),
            _ => mesh_from_raw(&shape.vertices, &shape.triangles)?,
        };
        Ok(Self::with_primitive(mesh, primitive))
    }

    pub fn from_mesh(mesh: TriMesh) -> Self {
        Self::with_primitive(mesh, None)
    }

    fn with_primitive(mesh: TriMesh, primitive: Option<Primitive>) -> Self {
        let bvh = Bvh::build(&mesh);
        Self { mesh, primitive, bvh }
    }
}

fn mesh_from_raw(vertices: &[f64], triangles: &[u32]) -> Result<TriMesh> {
    if vertices.len() % 3 != 0 {
        return Err(GeometryError::MalformedVertices { count: vertices.len() });
    }
    if triangles.len() % 3 != 0 {
        return Err(GeometryError::MalformedTriangles {
            count: triangles.len(),
        });
    }
    let n = vertices.len() / 3;
    if let Some(&index) = triangles.iter().find(|&&i| i as usize >= n) {
        return Err(GeometryError::IndexOutOfRange { index, vertices: n });
    }
    Ok(TriMesh {
        vertices: vertices
            .chunks_exact(3)
            .map(|c| Vec3::new(c[0], c[1], c[2]))
            .collect(),
        triangles: triangles.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect(),
    })
}

/// Geometry of one link plus the shapes that were left out of it.
#[derive(Debug, Clone, Default)]
pub struct LinkGeometry {
    pub geometry: Option<Arc<CollisionGeometry>>,
    /// Index within the link's shape list and the reason, per dropped shape.
    pub dropped: Vec<(usize, GeometryError)>,
}

/// Builds the merged geometry of a link from all of its shapes.
///
/// A shape with a malformed triangle list is dropped with a warning and the
/// rest of the link still loads. Any other build error is returned.
pub fn build_link(shapes: &[ShapeData]) -> Result<LinkGeometry> {
    let mut built = Vec::with_capacity(shapes.len());
    let mut dropped = Vec::new();
    for (index, shape) in shapes.iter().enumerate() {
        match CollisionGeometry::build(shape) {
            Ok(g) => built.push(g),
            Err(e) if e.is_recoverable() => {
                warn!(shape = index, error = %e, "dropping malformed shape");
                dropped.push((index, e));
            }
            Err(e) => return Err(e),
        }
    }

    let geometry = match built.len() {
        0 => None,
        1 => built.pop(),
        _ => {
            let mut mesh = TriMesh::default();
            for g in &built {
                mesh.append(&g.mesh);
            }
            Some(CollisionGeometry::from_mesh(mesh))
        }
    };
    Ok(LinkGeometry {
        geometry: geometry.filter(|g| !g.mesh.is_empty()).map(Arc::new),
        dropped,
    })
}
