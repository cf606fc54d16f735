//! Contact points between two pieces of collision geometry.

use std::ops::ControlFlow;

use artic_math::{Pose, Vec3};
use serde::{Deserialize, Serialize};

use crate::geometry::CollisionGeometry;
use crate::plane_cylinder::plane_cylinder;
use crate::shape::Primitive;
use crate::triangle::triangle_contact;

/// A single contact point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactPoint {
    pub position: Vec3,
    /// Unit contact normal, oriented by the detector's [`NormalConvention`].
    pub normal: Vec3,
    /// Penetration depth, never negative.
    pub depth: f64,
    /// `false` when the point persisted from the previous step.
    pub is_new: bool,
}

impl ContactPoint {
    fn flipped(mut self) -> Self {
        self.normal = -self.normal;
        self
    }

    fn placed(mut self, frame: &Pose) -> Self {
        self.position = frame.transform_point(&self.position);
        self.normal = frame.transform_vector(&self.normal);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectMode {
    /// Stop at the first confirmed intersection.
    FirstContactOnly,
    #[default]
    AllContacts,
}

/// Orientation of reported normals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalConvention {
    /// From the first geometry toward the second: the direction the second
    /// must move to separate.
    #[default]
    FirstToSecond,
    SecondToFirst,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PairDetector {
    pub convention: NormalConvention,
}

impl PairDetector {
    pub fn new(convention: NormalConvention) -> Self {
        Self { convention }
    }

    /// Contacts between `a` placed at `pose_a` and `b` placed at `pose_b`,
    /// in world coordinates.
    ///
    /// Output order is the fixed traversal order, so repeated queries on the
    /// same inputs return identical lists.
    pub fn detect(
        &self,
        a: &CollisionGeometry,
        pose_a: &Pose,
        b: &CollisionGeometry,
        pose_b: &Pose,
        mode: DetectMode,
    ) -> Vec<ContactPoint> {
        let mut contacts = match (a.primitive, b.primitive) {
            (Some(Primitive::Plane), Some(Primitive::Cylinder { radius, height, .. })) => {
                plane_cylinder(pose_a, pose_b, radius, height)
            }
            (Some(Primitive::Cylinder { radius, height, .. }), Some(Primitive::Plane)) => {
                plane_cylinder(pose_b, pose_a, radius, height)
                    .into_iter()
                    .map(ContactPoint::flipped)
                    .collect()
            }
            _ => mesh_contacts(a, pose_a, b, pose_b, mode),
        };
        if mode == DetectMode::FirstContactOnly {
            contacts.truncate(1);
        }
        if self.convention == NormalConvention::SecondToFirst {
            contacts.iter_mut().for_each(|c| c.normal = -c.normal);
        }
        contacts
    }

    /// Contacts with `b` placed at `b_in_a` relative to `a`, in `a`'s frame.
    pub fn detect_relative(
        &self,
        a: &CollisionGeometry,
        b: &CollisionGeometry,
        b_in_a: &Pose,
        mode: DetectMode,
    ) -> Vec<ContactPoint> {
        self.detect(a, &Pose::identity(), b, b_in_a, mode)
    }

    /// Whether the two geometries touch at all.
    pub fn intersects(
        &self,
        a: &CollisionGeometry,
        pose_a: &Pose,
        b: &CollisionGeometry,
        pose_b: &Pose,
    ) -> bool {
        !self
            .detect(a, pose_a, b, pose_b, DetectMode::FirstContactOnly)
            .is_empty()
    }

    /// Like [`detect`](Self::detect), with contacts re-expressed in `frame`.
    pub fn detect_in(
        &self,
        frame: &Pose,
        a: &CollisionGeometry,
        pose_a: &Pose,
        b: &CollisionGeometry,
        pose_b: &Pose,
        mode: DetectMode,
    ) -> Vec<ContactPoint> {
        let inv = frame.inverse();
        self.detect(a, pose_a, b, pose_b, mode)
            .into_iter()
            .map(|c| c.placed(&inv))
            .collect()
    }
}

fn world_vertices(geometry: &CollisionGeometry, pose: &Pose) -> Vec<Vec3> {
    geometry
        .mesh
        .vertices
        .iter()
        .map(|v| pose.transform_point(v))
        .collect()
}

fn corners(vertices: &[Vec3], tri: [u32; 3]) -> [Vec3; 3] {
    tri.map(|i| vertices[i as usize])
}

fn mesh_contacts(
    a: &CollisionGeometry,
    pose_a: &Pose,
    b: &CollisionGeometry,
    pose_b: &Pose,
    mode: DetectMode,
) -> Vec<ContactPoint> {
    let boxes_a = a.bvh.world_boxes(pose_a);
    let boxes_b = b.bvh.world_boxes(pose_b);
    // Cheap reject before transforming any vertices.
    match (boxes_a.first(), boxes_b.first()) {
        (Some(ra), Some(rb)) if ra.overlaps(rb) => {}
        _ => return Vec::new(),
    }

    let verts_a = world_vertices(a, pose_a);
    let verts_b = world_vertices(b, pose_b);
    let mut contacts = Vec::new();
    a.bvh.visit_pairs(&boxes_a, &b.bvh, &boxes_b, |ta, tb| {
        let ca = corners(&verts_a, a.mesh.triangles[ta]);
        let cb = corners(&verts_b, b.mesh.triangles[tb]);
        if let Some(hit) = triangle_contact(&ca, &cb) {
            contacts.push(ContactPoint {
                position: hit.position,
                normal: hit.normal,
                depth: hit.depth,
                is_new: true,
            });
            if mode == DetectMode::FirstContactOnly {
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    });
    contacts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::ShapeData;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn geometry(shape: ShapeData) -> CollisionGeometry {
        CollisionGeometry::build(&shape).unwrap()
    }

    fn lying_cylinder() -> Pose {
        Pose::from_axis_angle(&Vec3::z(), FRAC_PI_2, Vec3::zeros())
    }

    #[test]
    fn test_plane_cylinder_no_contact_when_far() {
        let plane = geometry(ShapeData::plane());
        let cyl = geometry(ShapeData::cylinder(0.1, 1.0));
        let far = Pose::from_axis_angle(&Vec3::x(), FRAC_PI_2, Vec3::new(0.0, 0.0, 5.0));
        let d = PairDetector::default();
        let contacts = d.detect(&plane, &Pose::identity(), &cyl, &far, DetectMode::AllContacts);
        assert!(contacts.is_empty());
    }

    #[test]
    fn test_plane_cylinder_lying_on_plane() {
        let plane = geometry(ShapeData::plane());
        let cyl = geometry(ShapeData::cylinder(0.2, 1.0));
        let contacts = PairDetector::default().detect(
            &plane,
            &Pose::identity(),
            &cyl,
            &lying_cylinder(),
            DetectMode::AllContacts,
        );
        assert_eq!(contacts.len(), 2);
        for c in &contacts {
            assert_relative_eq!(c.depth, 0.2, epsilon = 1e-12);
            assert_relative_eq!(c.normal, Vec3::z(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_cylinder_plane_order_negates_normals() {
        let plane = geometry(ShapeData::plane());
        let cyl = geometry(ShapeData::cylinder(0.2, 1.0));
        let d = PairDetector::default();
        let all = DetectMode::AllContacts;
        let ab = d.detect(&plane, &Pose::identity(), &cyl, &lying_cylinder(), all);
        let ba = d.detect(&cyl, &lying_cylinder(), &plane, &Pose::identity(), all);
        assert_eq!(ab.len(), ba.len());
        for (x, y) in ab.iter().zip(&ba) {
            assert_relative_eq!(x.position, y.position, epsilon = 1e-12);
            assert_relative_eq!(x.normal, -y.normal, epsilon = 1e-12);
            assert_relative_eq!(x.depth, y.depth);
        }
    }

    #[test]
    fn test_second_to_first_convention() {
        let plane = geometry(ShapeData::plane());
        let cyl = geometry(ShapeData::cylinder(0.2, 1.0));
        let d = PairDetector::new(NormalConvention::SecondToFirst);
        let contacts =
            d.detect(&plane, &Pose::identity(), &cyl, &lying_cylinder(), DetectMode::AllContacts);
        assert_relative_eq!(contacts[0].normal, -Vec3::z(), epsilon = 1e-12);
    }

    #[test]
    fn test_mesh_contacts_symmetric_under_swap() {
        let cube = geometry(ShapeData::cuboid(Vec3::repeat(1.0)));
        let ball = geometry(ShapeData::sphere(0.4));
        let axis = Vec3::new(0.3, 0.5, 0.8).normalize();
        let pose_cube = Pose::from_axis_angle(&axis, 0.4, Vec3::zeros());
        let pose_ball = Pose::from_translation(Vec3::new(0.71, 0.13, 0.07));
        let d = PairDetector::default();
        let ab = d.detect(&cube, &pose_cube, &ball, &pose_ball, DetectMode::AllContacts);
        let ba = d.detect(&ball, &pose_ball, &cube, &pose_cube, DetectMode::AllContacts);
        assert!(!ab.is_empty());
        assert_eq!(ab.len(), ba.len());

        // Every contact reappears at the same point with the same depth and
        // an exactly negated normal.
        for x in &ab {
            let y = ba
                .iter()
                .find(|y| {
                    (x.position - y.position).norm() < 1e-9 && (x.depth - y.depth).abs() < 1e-9
                })
                .unwrap_or_else(|| panic!("no swapped contact for {x:?}"));
            assert_relative_eq!(x.normal, -y.normal, epsilon = 1e-9);
        }
        let depth = |c: &[ContactPoint]| c.iter().map(|p| p.depth).sum::<f64>();
        assert_relative_eq!(depth(&ab), depth(&ba), epsilon = 1e-9);
    }

    #[test]
    fn test_repeated_queries_are_identical() {
        let cube = geometry(ShapeData::cuboid(Vec3::repeat(1.0)));
        let ball = geometry(ShapeData::sphere(0.4));
        let pose_ball = Pose::from_translation(Vec3::new(0.6, 0.2, 0.1));
        let d = PairDetector::default();
        let first = d.detect(&cube, &Pose::identity(), &ball, &pose_ball, DetectMode::AllContacts);
        for _ in 0..5 {
            let again =
                d.detect(&cube, &Pose::identity(), &ball, &pose_ball, DetectMode::AllContacts);
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_first_contact_only() {
        let cube = geometry(ShapeData::cuboid(Vec3::repeat(1.0)));
        let ball = geometry(ShapeData::sphere(0.4));
        let pose_ball = Pose::from_translation(Vec3::new(0.6, 0.2, 0.1));
        let d = PairDetector::default();
        let all = d.detect(&cube, &Pose::identity(), &ball, &pose_ball, DetectMode::AllContacts);
        let one =
            d.detect(&cube, &Pose::identity(), &ball, &pose_ball, DetectMode::FirstContactOnly);
        assert!(all.len() > 1);
        assert_eq!(one.len(), 1);
        assert!(d.intersects(&cube, &Pose::identity(), &ball, &pose_ball));
        let far = Pose::from_translation(Vec3::new(3.0, 0.0, 0.0));
        assert!(!d.intersects(&cube, &Pose::identity(), &ball, &far));
    }

    #[test]
    fn test_box_resting_on_plane_mesh_path() {
        let plane = geometry(ShapeData::plane());
        let cube = geometry(ShapeData::cuboid(Vec3::new(0.4, 0.4, 0.2)));
        // Well inside one of the two plane triangles.
        let pose = Pose::from_translation(Vec3::new(3.0, -5.0, 0.09));
        let d = PairDetector::default();
        let contacts = d.detect(&plane, &Pose::identity(), &cube, &pose, DetectMode::AllContacts);
        assert!(!contacts.is_empty());
        for c in &contacts {
            assert_relative_eq!(c.depth, 0.01, epsilon = 1e-9);
            assert_relative_eq!(c.normal, Vec3::z(), epsilon = 1e-9);
            assert_relative_eq!(c.position.z, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_stacked_aligned_cubes_report_overlap() {
        let cube = geometry(ShapeData::cuboid(Vec3::repeat(1.0)));
        let d = PairDetector::default();
        for overlap in [0.01, 0.1, 0.3] {
            let upper = Pose::from_translation(Vec3::new(0.0, 0.0, 1.0 - overlap));
            let contacts =
                d.detect(&cube, &Pose::identity(), &cube, &upper, DetectMode::AllContacts);
            assert!(!contacts.is_empty(), "overlap {overlap}");
            assert!(d.intersects(&cube, &Pose::identity(), &cube, &upper));
            for c in &contacts {
                assert!(c.depth >= 0.0 && c.depth <= overlap + 1e-9, "depth {}", c.depth);
            }
            assert!(contacts
                .iter()
                .any(|c| (c.depth - overlap).abs() < 1e-9 && (c.normal - Vec3::z()).norm() < 1e-9));
        }
    }

    #[test]
    fn test_box_exactly_on_plane_touches_without_depth() {
        let plane = geometry(ShapeData::plane());
        let cube = geometry(ShapeData::cuboid(Vec3::new(0.4, 0.4, 0.2)));
        let pose = Pose::from_translation(Vec3::new(3.0, -5.0, 0.1));
        let d = PairDetector::default();
        let contacts = d.detect(&plane, &Pose::identity(), &cube, &pose, DetectMode::AllContacts);
        assert!(!contacts.is_empty());
        for c in &contacts {
            assert_relative_eq!(c.depth, 0.0, epsilon = 1e-9);
            assert_relative_eq!(c.normal, Vec3::z(), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_relative_detection_matches_world() {
        let plane = geometry(ShapeData::plane());
        let cyl = geometry(ShapeData::cylinder(0.2, 1.0));
        let pose_a = Pose::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let pose_b = pose_a * lying_cylinder();
        let d = PairDetector::default();
        let rel = d.detect_relative(&plane, &cyl, &lying_cylinder(), DetectMode::AllContacts);
        let world = d.detect_in(&pose_a, &plane, &pose_a, &cyl, &pose_b, DetectMode::AllContacts);
        assert_eq!(rel.len(), world.len());
        for (x, y) in rel.iter().zip(&world) {
            assert_relative_eq!(x.position, y.position, epsilon = 1e-9);
            assert_relative_eq!(x.normal, y.normal, epsilon = 1e-9);
        }
    }
}
