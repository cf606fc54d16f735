//! Raw shape input and the analytic primitives it may describe.

use artic_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, Result};

/// Primitive tag carried by shape data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    #[default]
    Mesh,
    Box,
    Cone,
    Cylinder,
    Sphere,
    Plane,
}

impl PrimitiveKind {
    /// Number of closed-form parameters, `None` for meshes.
    pub fn parameter_count(self) -> Option<usize> {
        match self {
            PrimitiveKind::Mesh => None,
            PrimitiveKind::Box => Some(3),
            PrimitiveKind::Cone => Some(4),
            PrimitiveKind::Cylinder => Some(5),
            PrimitiveKind::Sphere => Some(1),
            PrimitiveKind::Plane => Some(0),
        }
    }
}

/// One shape of a link as delivered by a model loader, in link coordinates.
///
/// `vertices` holds flat xyz triples, `triangles` flat vertex-index triples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapeData {
    #[serde(default)]
    pub primitive: PrimitiveKind,
    #[serde(default)]
    pub parameters: Vec<f64>,
    #[serde(default)]
    pub vertices: Vec<f64>,
    #[serde(default)]
    pub triangles: Vec<u32>,
}

impl ShapeData {
    pub fn mesh(vertices: Vec<f64>, triangles: Vec<u32>) -> Self {
        Self {
            primitive: PrimitiveKind::Mesh,
            parameters: Vec::new(),
            vertices,
            triangles,
        }
    }

    pub fn primitive(kind: PrimitiveKind, parameters: Vec<f64>) -> Self {
        Self {
            primitive: kind,
            parameters,
            vertices: Vec::new(),
            triangles: Vec::new(),
        }
    }

    pub fn plane() -> Self {
        Self::primitive(PrimitiveKind::Plane, Vec::new())
    }

    pub fn cuboid(size: Vec3) -> Self {
        Self::primitive(PrimitiveKind::Box, vec![size.x, size.y, size.z])
    }

    /// Capped cylinder along local +Y with both caps and the side present.
    pub fn cylinder(radius: f64, height: f64) -> Self {
        Self::primitive(PrimitiveKind::Cylinder, vec![radius, height, 1.0, 1.0, 1.0])
    }

    pub fn sphere(radius: f64) -> Self {
        Self::primitive(PrimitiveKind::Sphere, vec![radius])
    }
}

/// Analytic shape parameters. Cylinders and cones are centered on the link
/// origin with their axis along local +Y; the plane is the local XY plane
/// with normal +Z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    Plane,
    Box {
        size: Vec3,
    },
    Cone {
        bottom_radius: f64,
        height: f64,
        bottom: bool,
        side: bool,
    },
    Cylinder {
        radius: f64,
        height: f64,
        top: bool,
        bottom: bool,
        side: bool,
    },
    Sphere {
        radius: f64,
    },
}

impl Primitive {
    /// Resolves the primitive described by `shape`, `None` for meshes.
    pub fn from_shape(shape: &ShapeData) -> Result<Option<Primitive>> {
        let kind = shape.primitive;
        let Some(expected) = kind.parameter_count() else {
            return Ok(None);
        };
        let p = &shape.parameters;
        if p.len() != expected {
            return Err(GeometryError::PrimitiveParameters {
                kind,
                expected,
                got: p.len(),
            });
        }
        let flag = |v: f64| v != 0.0;
        let primitive = match kind {
            PrimitiveKind::Plane => Primitive::Plane,
            PrimitiveKind::Box => Primitive::Box {
                size: Vec3::new(p[0], p[1], p[2]),
            },
            PrimitiveKind::Cone => Primitive::Cone {
                bottom_radius: p[0],
                height: p[1],
                bottom: flag(p[2]),
                side: flag(p[3]),
            },
            PrimitiveKind::Cylinder => Primitive::Cylinder {
                radius: p[0],
                height: p[1],
                top: flag(p[2]),
                bottom: flag(p[3]),
                side: flag(p[4]),
            },
            PrimitiveKind::Sphere => Primitive::Sphere { radius: p[0] },
            PrimitiveKind::Mesh => return Ok(None),
        };
        Ok(Some(primitive))
    }

    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Primitive::Plane => PrimitiveKind::Plane,
            Primitive::Box { .. } => PrimitiveKind::Box,
            Primitive::Cone { .. } => PrimitiveKind::Cone,
            Primitive::Cylinder { .. } => PrimitiveKind::Cylinder,
            Primitive::Sphere { .. } => PrimitiveKind::Sphere,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_counts() {
        for (kind, n) in [
            (PrimitiveKind::Box, 3),
            (PrimitiveKind::Cone, 4),
            (PrimitiveKind::Cylinder, 5),
            (PrimitiveKind::Sphere, 1),
            (PrimitiveKind::Plane, 0),
        ] {
            assert_eq!(kind.parameter_count(), Some(n));
        }
        assert_eq!(PrimitiveKind::Mesh.parameter_count(), None);
    }

    #[test]
    fn test_cylinder_flags() {
        let shape = ShapeData::primitive(PrimitiveKind::Cylinder, vec![0.1, 0.5, 1.0, 0.0, 1.0]);
        assert_eq!(
            Primitive::from_shape(&shape).unwrap(),
            Some(Primitive::Cylinder {
                radius: 0.1,
                height: 0.5,
                top: true,
                bottom: false,
                side: true
            })
        );
    }

    #[test]
    fn test_wrong_parameter_count() {
        let shape = ShapeData::primitive(PrimitiveKind::Sphere, vec![1.0, 2.0]);
        assert_eq!(
            Primitive::from_shape(&shape),
            Err(GeometryError::PrimitiveParameters {
                kind: PrimitiveKind::Sphere,
                expected: 1,
                got: 2
            })
        );
    }

    #[test]
    fn test_shape_json_defaults_to_mesh() {
        let shape: ShapeData =
            serde_json::from_str(r#"{"vertices":[0,0,0, 1,0,0, 0,1,0], "triangles":[0,1,2]}"#).unwrap();
        assert_eq!(shape.primitive, PrimitiveKind::Mesh);
        assert_eq!(shape.triangles.len(), 3);
    }
}
