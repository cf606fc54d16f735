//! Indexed triangle meshes and tessellation of analytic primitives.

use std::f64::consts::TAU;

use artic_math::Vec3;

use crate::shape::Primitive;

/// Half side length of the finite quad standing in for an infinite plane.
pub const PLANE_HALF_EXTENT: f64 = 1.0e3;

const SEGMENTS: u32 = 16;
const STACKS: u32 = 8;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriMesh {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
}

impl TriMesh {
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Corner positions of triangle `t`.
    pub fn triangle(&self, t: usize) -> [Vec3; 3] {
        let [a, b, c] = self.triangles[t];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }

    /// Appends `other`, re-basing its indices.
    pub fn append(&mut self, other: &TriMesh) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.triangles
            .extend(other.triangles.iter().map(|[a, b, c]| [a + base, b + base, c + base]));
    }

    fn push_quad(&mut self, a: u32, b: u32, c: u32, d: u32) {
        self.triangles.push([a, b, c]);
        self.triangles.push([a, c, d]);
    }

    /// Surface triangles approximating `primitive`.
    pub fn tessellate(primitive: &Primitive) -> TriMesh {
        match *primitive {
            Primitive::Plane => plane(),
            Primitive::Box { size } => cuboid(&(size * 0.5)),
            Primitive::Sphere { radius } => sphere(radius),
            Primitive::Cylinder {
                radius,
                height,
                top,
                bottom,
                side,
            } => frustum(radius, radius, height, top, bottom, side),
            Primitive::Cone {
                bottom_radius,
                height,
                bottom,
                side,
            } => frustum(bottom_radius, 0.0, height, false, bottom, side),
        }
    }
}

fn plane() -> TriMesh {
    let l = PLANE_HALF_EXTENT;
    let mut mesh = TriMesh {
        vertices: vec![
            Vec3::new(-l, -l, 0.0),
            Vec3::new(l, -l, 0.0),
            Vec3::new(l, l, 0.0),
            Vec3::new(-l, l, 0.0),
        ],
        triangles: Vec::new(),
    };
    mesh.push_quad(0, 1, 2, 3);
    mesh
}

fn cuboid(half: &Vec3) -> TriMesh {
    let mut mesh = TriMesh::default();
    for i in 0..8 {
        mesh.vertices.push(Vec3::new(
            if i & 1 == 0 { -half.x } else { half.x },
            if i & 2 == 0 { -half.y } else { half.y },
            if i & 4 == 0 { -half.z } else { half.z },
        ));
    }
    // Outward winding, one quad per face.
    for [a, b, c, d] in [
        [0, 4, 6, 2],
        [1, 3, 7, 5],
        [0, 1, 5, 4],
        [2, 6, 7, 3],
        [0, 2, 3, 1],
        [4, 5, 7, 6],
    ] {
        mesh.push_quad(a, b, c, d);
    }
    mesh
}

fn sphere(radius: f64) -> TriMesh {
    let mut mesh = TriMesh::default();
    for stack in 0..=STACKS {
        let phi = std::f64::consts::PI * f64::from(stack) / f64::from(STACKS);
        for seg in 0..SEGMENTS {
            let theta = TAU * f64::from(seg) / f64::from(SEGMENTS);
            mesh.vertices.push(
                Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin()) * radius,
            );
        }
    }
    for stack in 0..STACKS {
        for seg in 0..SEGMENTS {
            let next = (seg + 1) % SEGMENTS;
            let a = stack * SEGMENTS + seg;
            let b = stack * SEGMENTS + next;
            let c = (stack + 1) * SEGMENTS + next;
            let d = (stack + 1) * SEGMENTS + seg;
            mesh.push_quad(a, b, c, d);
        }
    }
    mesh
}

/// Truncated cone along Y from `r_bottom` at -h/2 to `r_top` at +h/2.
fn frustum(r_bottom: f64, r_top: f64, height: f64, top: bool, bottom: bool, side: bool) -> TriMesh {
    let mut mesh = TriMesh::default();
    let y = height * 0.5;
    for (r, h) in [(r_bottom, -y), (r_top, y)] {
        for seg in 0..SEGMENTS {
            let theta = TAU * f64::from(seg) / f64::from(SEGMENTS);
            mesh.vertices.push(Vec3::new(r * theta.cos(), h, r * theta.sin()));
        }
    }
    let bottom_center = mesh.vertices.len() as u32;
    mesh.vertices.push(Vec3::new(0.0, -y, 0.0));
    let top_center = bottom_center + 1;
    mesh.vertices.push(Vec3::new(0.0, y, 0.0));

    for seg in 0..SEGMENTS {
        let next = (seg + 1) % SEGMENTS;
        if side {
            mesh.push_quad(seg, SEGMENTS + seg, SEGMENTS + next, next);
        }
        if bottom {
            mesh.triangles.push([bottom_center, seg, next]);
        }
        if top && r_top > 0.0 {
            mesh.triangles.push([top_center, SEGMENTS + next, SEGMENTS + seg]);
        }
    }
    mesh
}
