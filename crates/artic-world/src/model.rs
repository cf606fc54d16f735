//! Characters: registered body trees with their collision geometry.

use std::sync::Arc;
use std::time::SystemTime;

use artic_collision::{CollisionGeometry, ShapeData};
use artic_model::{BodyDescription, BodyTree, LinkId};
use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;

/// Identity of a geometry source for the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometrySource {
    pub id: String,
    pub stamp: SystemTime,
}

/// Everything needed to register a character.
///
/// `shapes[i]` holds the shapes of `description.links[i]`; missing trailing
/// entries mean the link has no geometry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BodyModel {
    pub description: BodyDescription,
    #[serde(default)]
    pub shapes: Vec<Vec<ShapeData>>,
    /// When set, geometry is taken from the store and rebuilt only if the
    /// stamp changed.
    #[serde(default)]
    pub source: Option<GeometrySource>,
}

impl BodyModel {
    pub fn new(description: BodyDescription) -> Self {
        Self {
            description,
            shapes: Vec::new(),
            source: None,
        }
    }

    pub fn with_shapes(mut self, link: usize, shapes: Vec<ShapeData>) -> Self {
        if self.shapes.len() <= link {
            self.shapes.resize(link + 1, Vec::new());
        }
        self.shapes[link] = shapes;
        self
    }

    pub fn with_source(mut self, id: impl Into<String>, stamp: SystemTime) -> Self {
        self.source = Some(GeometrySource { id: id.into(), stamp });
        self
    }
}

/// A body tree registered under a name.
#[derive(Debug, Clone)]
pub struct Character {
    pub name: String,
    pub tree: BodyTree,
    pub(crate) geometry: SecondaryMap<LinkId, Arc<CollisionGeometry>>,
}

impl Character {
    pub fn geometry(&self, link: LinkId) -> Option<&Arc<CollisionGeometry>> {
        self.geometry.get(link)
    }

    /// Links that carry collision geometry.
    pub fn collidable_links(&self) -> usize {
        self.geometry.len()
    }
}
