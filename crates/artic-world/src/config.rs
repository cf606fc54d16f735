//! World configuration, loadable from JSON.

use std::path::Path;

use artic_collision::NormalConvention;
use artic_contact::RegistrationPolicy;
use artic_math::Vec3;
use artic_rigid::IntegrationMethod;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WorldError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Evaluate collision pairs on the rayon pool.
    pub enabled: bool,
    /// Below this many pairs, evaluate sequentially.
    pub min_pairs: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_pairs: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Fixed timestep in seconds.
    pub timestep: f64,
    pub gravity: Vec3,
    pub integration: IntegrationMethod,
    pub parallel: ParallelConfig,
    pub registration: RegistrationPolicy,
    /// Distance within which a contact point counts as the same point as one
    /// from the previous step.
    pub persistence_tolerance: f64,
    /// Orientation of normals in reported contacts.
    pub normal_convention: NormalConvention,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            timestep: 0.001,
            gravity: Vec3::new(0.0, 0.0, -artic_math::GRAVITY),
            integration: IntegrationMethod::default(),
            parallel: ParallelConfig::default(),
            registration: RegistrationPolicy::default(),
            persistence_tolerance: 1.0e-3,
            normal_convention: NormalConvention::default(),
        }
    }
}

impl WorldConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: WorldConfig =
            serde_json::from_str(json).map_err(|e| WorldError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| WorldError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.timestep.is_finite() && self.timestep > 0.0) {
            return Err(WorldError::Config(format!(
                "timestep must be positive, got {}",
                self.timestep
            )));
        }
        if !self.gravity.iter().all(|g| g.is_finite()) {
            return Err(WorldError::Config("gravity must be finite".into()));
        }
        if !(self.persistence_tolerance.is_finite() && self.persistence_tolerance >= 0.0) {
            return Err(WorldError::Config(format!(
                "persistence_tolerance must be non-negative, got {}",
                self.persistence_tolerance
            )));
        }
        Ok(())
    }
}
