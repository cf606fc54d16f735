//! The simulation world: registered characters, collision check pairs,
//! fixed-step integration with penalty contact, queries and sensors.

mod config;
mod error;
mod model;
mod sensor;
mod shared;
mod state;
mod world;

pub use config::{ParallelConfig, WorldConfig};
pub use error::{Result, WorldError};
pub use model::{BodyModel, Character, GeometrySource};
pub use sensor::{SensorKind, SensorReading, SensorSpec};
pub use shared::SharedWorld;
pub use state::{CharacterState, LinkState, WorldState};
pub use world::{LinkName, LinkPair, LinkPose, PairContacts, StepPhase, StepReport, World};
