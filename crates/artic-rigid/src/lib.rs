//! Rigid-body kinematics and dynamics over a [`BodyTree`](artic_model::BodyTree).
//!
//! - [`forward_kinematics`]: world poses and velocities of every link
//! - [`forward_dynamics`]: joint accelerations via the articulated-body algorithm
//! - [`Integrator`]: fixed-step advancement of joint state

pub mod dynamics;
pub mod energy;
pub mod error;
pub mod integrator;
pub mod kinematics;

pub use dynamics::forward_dynamics;
pub use energy::{kinetic_energy, potential_energy, total_energy};
pub use error::{Result, RigidError};
pub use integrator::{ExplicitEuler, IntegrationMethod, Integrator, SemiImplicitEuler};
pub use kinematics::forward_kinematics;
