//! A world shared between threads, stepped by one caller at a time.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use crate::error::{Result, WorldError};
use crate::world::{StepReport, World};

#[derive(Clone)]
pub struct SharedWorld(Arc<Mutex<World>>);

impl SharedWorld {
    pub fn new(world: World) -> Self {
        Self(Arc::new(Mutex::new(world)))
    }

    fn lock(&self) -> MutexGuard<'_, World> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Steps once, waiting for any step already running.
    pub fn step(&self) -> Result<StepReport> {
        self.lock().step_simulation()
    }

    /// Steps once, or fails with [`WorldError::StepInProgress`] if another
    /// caller holds the world.
    pub fn try_step(&self) -> Result<StepReport> {
        let mut world = match self.0.try_lock() {
            Ok(world) => world,
            Err(TryLockError::Poisoned(e)) => e.into_inner(),
            Err(TryLockError::WouldBlock) => return Err(WorldError::StepInProgress),
        };
        world.step_simulation()
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut World) -> R) -> R {
        f(&mut self.lock())
    }
}
