//! Penalty contact forces with tangential springs and Coulomb friction.

use artic_collision::ContactPoint;
use artic_math::{Vec3, tangent_basis};
use artic_model::Link;

use crate::registry::{CheckPair, TrackedPoint};

/// Force acting on the second link at a world point. The first link receives
/// the opposite force at the same point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointForce {
    pub point: Vec3,
    pub force: Vec3,
    /// Whether the tangential force saturated at the slip limit.
    pub slipping: bool,
}

/// Resolved wrench of a pair, acting on the second link.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairForces {
    pub points: Vec<PointForce>,
    /// Pure torque from the rotational spring-damper.
    pub torque: Vec3,
}

impl PairForces {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.torque == Vec3::zeros()
    }

    pub fn total_force(&self) -> Vec3 {
        self.points.iter().map(|p| p.force).sum()
    }

    pub fn apply_to_first(&self, link: &mut Link) {
        for p in &self.points {
            link.apply_force_at(&-p.force, &p.point);
        }
        link.ext_torque -= self.torque;
    }

    pub fn apply_to_second(&self, link: &mut Link) {
        for p in &self.points {
            link.apply_force_at(&p.force, &p.point);
        }
        link.ext_torque += self.torque;
    }
}

const MIN_SLIP_SPEED: f64 = 1e-9;

/// Turns this step's contacts of `pair` into forces and updates the pair's
/// continuity state.
///
/// Contact normals must point from `first` toward `second`. A contact lying
/// within `tolerance` of a point from the previous step is marked persistent
/// (`is_new = false`) and keeps that point's tangential anchor.
pub fn resolve_pair(
    pair: &mut CheckPair,
    contacts: &mut [ContactPoint],
    first: &Link,
    second: &Link,
    dt: f64,
    tolerance: f64,
) -> PairForces {
    if contacts.is_empty() {
        pair.state.reset();
        return PairForces::default();
    }

    let params = pair.params;
    let (k, c) = (params.stiffness, params.damping);
    let previous = std::mem::take(&mut pair.state.points);
    let mut tracked = Vec::with_capacity(contacts.len());
    let mut forces = PairForces::default();
    let mut mean_normal = Vec3::zeros();

    for contact in contacts.iter_mut() {
        let n = contact.normal;
        let p = contact.position;
        mean_normal += n;

        let carried = previous
            .iter()
            .filter(|t| (t.position - p).norm() <= tolerance)
            .min_by(|a, b| (a.position - p).norm().total_cmp(&(b.position - p).norm()));
        contact.is_new = carried.is_none();
        let mut point = match carried {
            Some(t) => TrackedPoint { position: p, ..*t },
            None => anchored_at(&p, first, second),
        };

        let v_rel = second.point_velocity(&p) - first.point_velocity(&p);
        let v_n = v_rel.dot(&n);
        let f_n = (k[2] * contact.depth - c[2] * v_n).max(0.0);

        // Tangential spring between the two anchored material points.
        let (t1, t2) = tangent_basis(&n);
        let stretch = second.pose.transform_point(&point.anchor_second)
            - first.pose.transform_point(&point.anchor_first);
        let f_t = -t1 * (k[0] * stretch.dot(&t1) + c[0] * v_rel.dot(&t1))
            - t2 * (k[1] * stretch.dot(&t2) + c[1] * v_rel.dot(&t2));

        let stick_limit = params.static_friction * f_n;
        let (f_t, slipping) = if f_t.norm() <= stick_limit {
            (f_t, false)
        } else {
            let v_t = v_rel - n * v_n;
            let dir = if v_t.norm() > MIN_SLIP_SPEED {
                -v_t.normalize()
            } else {
                f_t.try_normalize(0.0).unwrap_or_else(Vec3::zeros)
            };
            point = anchored_at(&p, first, second);
            (dir * (params.slip_friction * f_n), true)
        };

        forces.points.push(PointForce {
            point: p,
            force: n * f_n + f_t,
            slipping,
        });
        tracked.push(point);
    }

    // Rotational spring-damper about the pair's mean contact frame.
    let w_rel = second.angular_velocity - first.angular_velocity;
    pair.state.twist += w_rel * dt;
    if let Some(n) = mean_normal.try_normalize(1e-12) {
        let (t1, t2) = tangent_basis(&n);
        let twist = pair.state.twist;
        forces.torque = [t1, t2, n]
            .iter()
            .zip(3..6)
            .map(|(axis, i)| -axis * (k[i] * twist.dot(axis) + c[i] * w_rel.dot(axis)))
            .sum();
    }

    pair.state.points = tracked;
    forces
}

fn anchored_at(p: &Vec3, first: &Link, second: &Link) -> TrackedPoint {
    TrackedPoint {
        position: *p,
        anchor_first: first.pose.inverse_transform_point(p),
        anchor_second: second.pose.inverse_transform_point(p),
    }
}
