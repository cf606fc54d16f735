//! Sensors attached to links, sampled after every step.

use artic_math::Vec3;
use artic_model::{Link, LinkId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// `[q, dq, ddq, u]` of the link's joint.
    JointState,
    /// External force and torque on the link in link coordinates, `[f; τ]`.
    ForceTorque,
    /// Angular velocity in link coordinates.
    RateGyro,
    /// Specific force at the link origin in link coordinates.
    Accelerometer,
}

impl SensorKind {
    pub fn output_dim(self) -> usize {
        match self {
            SensorKind::JointState => 4,
            SensorKind::ForceTorque => 6,
            SensorKind::RateGyro | SensorKind::Accelerometer => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSpec {
    pub name: String,
    pub kind: SensorKind,
    pub character: String,
    pub link: String,
}

impl SensorSpec {
    pub fn new(
        name: impl Into<String>,
        kind: SensorKind,
        character: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            character: character.into(),
            link: link.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub name: String,
    pub time: f64,
    pub data: Vec<f64>,
}

#[derive(Debug, Clone)]
pub(crate) struct SensorSlot {
    pub spec: SensorSpec,
    pub character: usize,
    pub link: LinkId,
    prev_velocity: Option<Vec3>,
    pub reading: SensorReading,
}

impl SensorSlot {
    pub fn new(spec: SensorSpec, character: usize, link: LinkId) -> Self {
        let reading = SensorReading {
            name: spec.name.clone(),
            time: 0.0,
            data: vec![0.0; spec.kind.output_dim()],
        };
        Self {
            spec,
            character,
            link,
            prev_velocity: None,
            reading,
        }
    }

    pub fn reset(&mut self) {
        self.prev_velocity = None;
    }

    pub fn sample(&mut self, link: &Link, gravity: &Vec3, dt: f64, time: f64) {
        let rot_t = link.pose.rot.transpose();
        let data = match self.spec.kind {
            SensorKind::JointState => vec![link.q, link.dq, link.ddq, link.u],
            SensorKind::ForceTorque => {
                let f = rot_t * link.ext_force;
                let t = rot_t * link.ext_torque;
                vec![f.x, f.y, f.z, t.x, t.y, t.z]
            }
            SensorKind::RateGyro => (rot_t * link.angular_velocity).as_slice().to_vec(),
            SensorKind::Accelerometer => {
                let accel = match self.prev_velocity {
                    Some(prev) if dt > 0.0 => (link.linear_velocity - prev) / dt,
                    _ => Vec3::zeros(),
                };
                self.prev_velocity = Some(link.linear_velocity);
                (rot_t * (accel - gravity)).as_slice().to_vec()
            }
        };
        self.reading.time = time;
        self.reading.data = data;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use artic_math::Pose;
    use artic_model::Joint;

    fn slot(kind: SensorKind) -> SensorSlot {
        SensorSlot::new(SensorSpec::new("s", kind, "robot", "body"), 0, LinkId::default())
    }

    #[test]
    fn test_accelerometer_at_rest_reads_minus_gravity() {
        let mut s = slot(SensorKind::Accelerometer);
        let link = Link::new("body", Joint::free());
        let g = Vec3::new(0.0, 0.0, -9.81);
        s.sample(&link, &g, 1e-3, 0.0);
        s.sample(&link, &g, 1e-3, 1e-3);
        assert_relative_eq!(s.reading.data.as_slice(), [0.0, 0.0, 9.81].as_slice());
    }

    #[test]
    fn test_free_fall_reads_zero() {
        let mut s = slot(SensorKind::Accelerometer);
        let mut link = Link::new("body", Joint::free());
        let g = Vec3::new(0.0, 0.0, -9.81);
        s.sample(&link, &g, 0.01, 0.0);
        link.linear_velocity = g * 0.01;
        s.sample(&link, &g, 0.01, 0.01);
        assert_relative_eq!(s.reading.data.as_slice(), [0.0, 0.0, 0.0].as_slice(), epsilon = 1e-12);
    }

    #[test]
    fn test_gyro_in_link_frame() {
        let mut s = slot(SensorKind::RateGyro);
        let mut link = Link::new("body", Joint::free());
        link.pose = Pose::from_axis_angle(&Vec3::z(), std::f64::consts::FRAC_PI_2, Vec3::zeros());
        link.angular_velocity = Vec3::new(1.0, 0.0, 0.0);
        s.sample(&link, &Vec3::zeros(), 1e-3, 0.0);
        assert_relative_eq!(s.reading.data.as_slice(), [0.0, -1.0, 0.0].as_slice(), epsilon = 1e-12);
    }

    #[test]
    fn test_output_dims() {
        let link = Link::new("body", Joint::free());
        for kind in [
            SensorKind::JointState,
            SensorKind::ForceTorque,
            SensorKind::RateGyro,
            SensorKind::Accelerometer,
        ] {
            let mut s = slot(kind);
            s.sample(&link, &Vec3::zeros(), 1e-3, 0.0);
            assert_eq!(s.reading.data.len(), kind.output_dim());
        }
    }
}
