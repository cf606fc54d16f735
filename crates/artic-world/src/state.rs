//! Snapshot of link placements after the last completed step.

use artic_math::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkState {
    pub name: String,
    pub position: Vec3,
    pub rotation: Mat3,
    pub q: f64,
    pub dq: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterState {
    pub name: String,
    /// Attached links in preorder.
    pub links: Vec<LinkState>,
}

impl CharacterState {
    pub fn link(&self, name: &str) -> Option<&LinkState> {
        self.links.iter().find(|l| l.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    pub time: f64,
    pub characters: Vec<CharacterState>,
}

impl WorldState {
    pub fn character(&self, name: &str) -> Option<&CharacterState> {
        self.characters.iter().find(|c| c.name == name)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
