//! Geometry cache keyed by source identifier and modification stamp.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use std::time::SystemTime;

use tracing::debug;

use crate::error::{GeometryError, Result};
use crate::geometry::{build_link, LinkGeometry};
use crate::shape::ShapeData;

/// Process-wide store, created on first use.
static GEOMETRY_STORE: OnceLock<Arc<GeometryStore>> = OnceLock::new();

/// Collision geometry of every link of one model, in link order.
#[derive(Debug)]
pub struct ModelGeometry {
    pub source_id: String,
    pub stamp: SystemTime,
    pub links: Vec<LinkGeometry>,
}

impl ModelGeometry {
    /// Total number of shapes dropped across all links.
    pub fn dropped_count(&self) -> usize {
        self.links.iter().map(|l| l.dropped.len()).sum()
    }
}

/// Readers get `Arc`s to fully built entries; a rebuild replaces the entry
/// atomically and never exposes partial geometry.
#[derive(Debug, Default)]
pub struct GeometryStore {
    entries: RwLock<HashMap<String, Arc<ModelGeometry>>>,
}

impl GeometryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> Arc<GeometryStore> {
        GEOMETRY_STORE.get_or_init(|| Arc::new(GeometryStore::new())).clone()
    }

    /// Returns the entry for `source_id` if its stamp equals `stamp`,
    /// otherwise runs `build` and replaces the entry with the result.
    ///
    /// `build` runs without holding the lock. A failed build leaves the
    /// previous entry in place. If another thread stored the same stamp in
    /// the meantime, that entry is returned instead. A newer stamp stored in
    /// the meantime is never replaced; the caller still gets the geometry it
    /// asked for.
    pub fn lookup<F>(
        &self,
        source_id: &str,
        stamp: SystemTime,
        build: F,
    ) -> Result<Arc<ModelGeometry>>
    where
        F: FnOnce() -> Result<Vec<LinkGeometry>>,
    {
        if let Some(hit) = self.cached(source_id).filter(|e| e.stamp == stamp) {
            debug!(source = source_id, "geometry cache hit");
            return Ok(hit);
        }

        debug!(source = source_id, "building geometry");
        let entry = Arc::new(ModelGeometry {
            source_id: source_id.to_owned(),
            stamp,
            links: build()?,
        });
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.entry(source_id.to_owned()) {
            Entry::Vacant(slot) => {
                slot.insert(entry.clone());
            }
            Entry::Occupied(slot) if slot.get().stamp == stamp => return Ok(slot.get().clone()),
            Entry::Occupied(slot) if slot.get().stamp > stamp => {
                debug!(source = source_id, "newer geometry already cached");
            }
            Entry::Occupied(mut slot) => {
                slot.insert(entry.clone());
            }
        }
        Ok(entry)
    }

    /// [`lookup`](Self::lookup) building each link from its shape list.
    pub fn load(
        &self,
        source_id: &str,
        stamp: SystemTime,
        shapes: &[Vec<ShapeData>],
    ) -> Result<Arc<ModelGeometry>> {
        self.lookup(source_id, stamp, || shapes.iter().map(|s| build_link(s)).collect())
    }

    pub fn cached(&self, source_id: &str) -> Option<Arc<ModelGeometry>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(source_id)
            .cloned()
    }

    pub fn clear(&self, source_id: &str) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(source_id)
            .is_some()
    }

    pub fn clear_all(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Last-modification time of a geometry source file.
pub fn stamp_of(path: impl AsRef<Path>) -> Result<SystemTime> {
    let path = path.as_ref();
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| GeometryError::Source {
            path: path.display().to_string(),
            message: e.to_string(),
        })
}
