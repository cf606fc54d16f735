//! Triangle/triangle contact by separating axes.

use artic_math::Vec3;

const AXIS_EPS: f64 = 1e-12;
/// Projection overlap below which two triangles only touch.
const TOUCH_EPS: f64 = 1e-9;

/// Contact between two intersecting triangles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleContact {
    pub position: Vec3,
    /// Unit direction in which `b` must move to separate from `a`.
    pub normal: Vec3,
    pub depth: f64,
}

#[derive(Debug, Clone, Copy)]
enum AxisKind {
    /// Outward face normal of `a`.
    FaceA,
    /// Outward face normal of `b`.
    FaceB,
    Edge,
}

impl AxisKind {
    /// Whether a touching overlap along `axis` resolved in direction `dir`
    /// is a surface contact, i.e. the other triangle rests on the outer side
    /// of the face.
    fn is_surface_touch(self, axis: &Vec3, dir: &Vec3) -> bool {
        match self {
            AxisKind::FaceA => dir.dot(axis) > 0.0,
            AxisKind::FaceB => dir.dot(axis) < 0.0,
            AxisKind::Edge => false,
        }
    }
}

fn project(t: &[Vec3; 3], axis: &Vec3) -> (f64, f64) {
    let p0 = t[0].dot(axis);
    let p1 = t[1].dot(axis);
    let p2 = t[2].dot(axis);
    (p0.min(p1).min(p2), p0.max(p1).max(p2))
}

fn edges(t: &[Vec3; 3]) -> [Vec3; 3] {
    [t[1] - t[0], t[2] - t[1], t[0] - t[2]]
}

/// Signed overlap of the projections onto `axis` and the unit direction that
/// resolves it, or `None` for a degenerate axis.
fn overlap_along(a: &[Vec3; 3], b: &[Vec3; 3], axis: &Vec3) -> Option<(f64, Vec3)> {
    let len = axis.norm();
    if len < AXIS_EPS {
        return None;
    }
    let axis = axis / len;
    let (amin, amax) = project(a, &axis);
    let (bmin, bmax) = project(b, &axis);
    let push_pos = amax - bmin;
    let push_neg = bmax - amin;
    Some(if push_pos <= push_neg {
        (push_pos, axis)
    } else {
        (push_neg, -axis)
    })
}

fn is_coplanar(a: &[Vec3; 3], na: &Vec3, b: &[Vec3; 3], nb: &Vec3) -> bool {
    let (la, lb) = (na.norm(), nb.norm());
    if la < AXIS_EPS || lb < AXIS_EPS {
        return false;
    }
    let n = na / la;
    n.cross(&(nb / lb)).norm() < TOUCH_EPS
        && b.iter().all(|p| n.dot(&(p - a[0])).abs() <= TOUCH_EPS)
}

/// Tests the face normals of both triangles and the nine edge cross products.
///
/// An axis separates the pair only when the projections are apart by more
/// than a small tolerance. A touching axis counts as a zero-depth contact
/// when it is a face normal with the other triangle on its outer side, and
/// is ignored otherwise, so faces that coincide inside overlapping meshes do
/// not hide the penetration. Windings are assumed outward. Coplanar pairs
/// are tested in their shared plane.
pub fn triangle_contact(a: &[Vec3; 3], b: &[Vec3; 3]) -> Option<TriangleContact> {
    let ea = edges(a);
    let eb = edges(b);
    let na = ea[0].cross(&ea[1]);
    let nb = eb[0].cross(&eb[1]);
    if is_coplanar(a, &na, b, &nb) {
        return coplanar_contact(a, &na, b, &nb);
    }

    let mut axes = Vec::with_capacity(11);
    axes.push((na, AxisKind::FaceA));
    axes.push((nb, AxisKind::FaceB));
    for e in &ea {
        for f in &eb {
            axes.push((e.cross(f), AxisKind::Edge));
        }
    }

    let mut best: Option<(f64, Vec3)> = None;
    for (axis, kind) in axes {
        let Some((overlap, dir)) = overlap_along(a, b, &axis) else {
            continue;
        };
        if overlap < -TOUCH_EPS {
            return None;
        }
        let depth = if overlap > TOUCH_EPS {
            overlap
        } else if kind.is_surface_touch(&axis, &dir) {
            0.0
        } else {
            continue;
        };
        if best.map_or(true, |(d, _)| depth < d) {
            best = Some((depth, dir));
        }
    }
    let (depth, normal) = best?;
    Some(TriangleContact {
        position: contact_position(a, b),
        normal,
        depth,
    })
}

/// Coplanar pair: separating axes in the shared plane. Faces meeting front
/// to front only touch; faces pointing the same way lie inside each other's
/// mesh and report the in-plane overlap.
fn coplanar_contact(a: &[Vec3; 3], na: &Vec3, b: &[Vec3; 3], nb: &Vec3) -> Option<TriangleContact> {
    let mut best: Option<(f64, Vec3)> = None;
    for (t, n) in [(a, na), (b, nb)] {
        for e in edges(t) {
            let Some((overlap, dir)) = overlap_along(a, b, &n.cross(&e)) else {
                continue;
            };
            if overlap <= TOUCH_EPS {
                return None;
            }
            if best.map_or(true, |(d, _)| overlap < d) {
                best = Some((overlap, dir));
            }
        }
    }
    let (slide, dir) = best?;
    let (depth, normal) = if na.dot(nb) < 0.0 {
        (0.0, na.normalize())
    } else {
        (slide, dir)
    };

    let mut sum = Vec3::zeros();
    let mut count = 0usize;
    for (points, face, n) in [(a, b, nb), (b, a, na)] {
        for p in points.iter().filter(|p| point_in_triangle(p, face, n)) {
            sum += p;
            count += 1;
        }
    }
    let position = if count == 0 {
        centroid_midpoint(a, b)
    } else {
        sum / count as f64
    };
    Some(TriangleContact {
        position,
        normal,
        depth,
    })
}

fn centroid_midpoint(a: &[Vec3; 3], b: &[Vec3; 3]) -> Vec3 {
    let ca = (a[0] + a[1] + a[2]) / 3.0;
    let cb = (b[0] + b[1] + b[2]) / 3.0;
    (ca + cb) * 0.5
}

/// Whether `x`, taken to lie in the plane of `t`, is inside it or on its
/// boundary. `n` is the winding normal of `t`.
fn point_in_triangle(x: &Vec3, t: &[Vec3; 3], n: &Vec3) -> bool {
    (0..3).all(|i| {
        let e = t[(i + 1) % 3] - t[i];
        n.dot(&e.cross(&(x - t[i]))) >= 0.0
    })
}

/// Mean of the points where edges of either triangle pierce the other.
fn contact_position(a: &[Vec3; 3], b: &[Vec3; 3]) -> Vec3 {
    let mut sum = Vec3::zeros();
    let mut count = 0usize;
    for (edges_of, face) in [(a, b), (b, a)] {
        for i in 0..3 {
            if let Some(p) = segment_triangle(&edges_of[i], &edges_of[(i + 1) % 3], face) {
                sum += p;
                count += 1;
            }
        }
    }
    if count == 0 {
        centroid_midpoint(a, b)
    } else {
        sum / count as f64
    }
}

/// Point where segment `p`→`q` crosses triangle `t`, if it does.
pub fn segment_triangle(p: &Vec3, q: &Vec3, t: &[Vec3; 3]) -> Option<Vec3> {
    let n = (t[1] - t[0]).cross(&(t[2] - t[0]));
    let dp = n.dot(&(p - t[0]));
    let dq = n.dot(&(q - t[0]));
    if dp * dq > 0.0 || dp == dq {
        return None;
    }
    let x = p + (q - p) * (dp / (dp - dq));
    point_in_triangle(&x, t, &n).then_some(x)
}
