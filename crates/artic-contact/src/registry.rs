//! Registered collision check pairs.

use std::fmt;

use artic_math::Vec3;
use artic_model::{BodyId, LinkId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ContactError, Result};

/// Maps a character name and link name to a live link.
pub trait LinkResolver {
    fn resolve(&self, character: &str, link: &str) -> Option<ResolvedLink>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolvedLink {
    pub body: BodyId,
    pub link: LinkId,
}

/// One side of a pair, by name, with the link it resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkRef {
    pub character: String,
    pub link: String,
    pub resolved: Option<ResolvedLink>,
}

impl LinkRef {
    fn resolve(character: &str, link: &str, resolver: &dyn LinkResolver) -> Self {
        Self {
            character: character.to_owned(),
            link: link.to_owned(),
            resolved: resolver.resolve(character, link),
        }
    }
}

impl fmt::Display for LinkRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.character, self.link)
    }
}

/// Physical parameters of a pair.
///
/// `stiffness` and `damping` are given in the contact frame
/// `[t1, t2, n, rot_t1, rot_t2, rot_n]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactParams {
    pub static_friction: f64,
    pub slip_friction: f64,
    pub stiffness: [f64; 6],
    pub damping: [f64; 6],
}

impl Default for ContactParams {
    fn default() -> Self {
        Self {
            static_friction: 0.5,
            slip_friction: 0.5,
            stiffness: [1.0e4, 1.0e4, 1.0e4, 0.0, 0.0, 0.0],
            damping: [1.0e2, 1.0e2, 1.0e2, 0.0, 0.0, 0.0],
        }
    }
}

impl ContactParams {
    pub fn new(
        static_friction: f64,
        slip_friction: f64,
        stiffness: [f64; 6],
        damping: [f64; 6],
    ) -> Self {
        Self {
            static_friction,
            slip_friction,
            stiffness,
            damping,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let named = [
            ("static_friction", self.static_friction),
            ("slip_friction", self.slip_friction),
        ];
        let gains = self.stiffness.iter().chain(&self.damping).map(|&v| ("gain", v));
        for (name, value) in named.into_iter().chain(gains) {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ContactError::InvalidParameter { name, value });
            }
        }
        Ok(())
    }
}

/// Handle of a registered pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey(u64);

impl PairKey {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pair#{}", self.0)
    }
}

/// A contact point carried over between steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedPoint {
    /// World position when last detected.
    pub position: Vec3,
    /// Material point of the first link that coincided with the contact when
    /// the tangential spring was anchored, in that link's frame.
    pub anchor_first: Vec3,
    /// Same for the second link.
    pub anchor_second: Vec3,
}

/// Contact continuity of a pair across steps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactState {
    pub points: Vec<TrackedPoint>,
    /// Relative rotation of the second link w.r.t. the first accumulated
    /// while in contact, as a world rotation vector.
    pub twist: Vec3,
}

impl ContactState {
    pub fn in_contact(&self) -> bool {
        !self.points.is_empty()
    }

    pub fn reset(&mut self) {
        self.points.clear();
        self.twist = Vec3::zeros();
    }
}

#[derive(Debug, Clone)]
pub struct CheckPair {
    pub key: PairKey,
    pub first: LinkRef,
    pub second: LinkRef,
    pub params: ContactParams,
    pub state: ContactState,
}

impl CheckPair {
    /// Both sides, if both resolved.
    pub fn resolved(&self) -> Option<(ResolvedLink, ResolvedLink)> {
        Some((self.first.resolved?, self.second.resolved?))
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved().is_some()
    }
}

/// What to do when a side of a new pair cannot be resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationPolicy {
    /// Reject with [`ContactError::UnresolvedLink`].
    #[default]
    Strict,
    /// Record the pair with the side unresolved; stepping skips it.
    Tolerant,
}

/// Pairs in registration order. Identical registrations are kept as
/// independent pairs.
#[derive(Debug, Clone)]
pub struct ContactRegistry {
    pairs: Vec<CheckPair>,
    next_key: u64,
    policy: RegistrationPolicy,
}

impl Default for ContactRegistry {
    fn default() -> Self {
        Self::new(RegistrationPolicy::default())
    }
}

impl ContactRegistry {
    pub fn new(policy: RegistrationPolicy) -> Self {
        Self {
            pairs: Vec::new(),
            next_key: 1,
            policy,
        }
    }

    pub fn policy(&self) -> RegistrationPolicy {
        self.policy
    }

    pub fn register(
        &mut self,
        resolver: &dyn LinkResolver,
        first: (&str, &str),
        second: (&str, &str),
        params: ContactParams,
    ) -> Result<PairKey> {
        params.validate()?;
        let first = LinkRef::resolve(first.0, first.1, resolver);
        let second = LinkRef::resolve(second.0, second.1, resolver);

        for side in [&first, &second] {
            if side.resolved.is_none() {
                match self.policy {
                    RegistrationPolicy::Strict => {
                        warn!(link = %side, "rejecting collision pair with unresolved link");
                        return Err(ContactError::UnresolvedLink {
                            character: side.character.clone(),
                            link: side.link.clone(),
                        });
                    }
                    RegistrationPolicy::Tolerant => {
                        warn!(link = %side, "registering collision pair with unresolved link");
                    }
                }
            }
        }

        let key = PairKey(self.next_key);
        self.next_key += 1;
        debug!(%key, first = %first, second = %second, "registered collision pair");
        self.pairs.push(CheckPair {
            key,
            first,
            second,
            params,
            state: ContactState::default(),
        });
        Ok(key)
    }

    pub fn remove(&mut self, key: PairKey) -> bool {
        let before = self.pairs.len();
        self.pairs.retain(|p| p.key != key);
        self.pairs.len() != before
    }

    pub fn get(&self, key: PairKey) -> Option<&CheckPair> {
        self.pairs.iter().find(|p| p.key == key)
    }

    pub fn get_mut(&mut self, key: PairKey) -> Option<&mut CheckPair> {
        self.pairs.iter_mut().find(|p| p.key == key)
    }

    pub fn pairs(&self) -> &[CheckPair] {
        &self.pairs
    }

    pub fn pairs_mut(&mut self) -> &mut [CheckPair] {
        &mut self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Retries resolution of every unresolved side, e.g. after a character
    /// was registered. Returns how many sides became resolved.
    pub fn resolve_pending(&mut self, resolver: &dyn LinkResolver) -> usize {
        let mut fixed = 0;
        for pair in &mut self.pairs {
            for side in [&mut pair.first, &mut pair.second] {
                if side.resolved.is_none() {
                    side.resolved = resolver.resolve(&side.character, &side.link);
                    fixed += usize::from(side.resolved.is_some());
                }
            }
        }
        fixed
    }

    /// Drops all contact continuity, as at the start of a simulation.
    pub fn reset_states(&mut self) {
        self.pairs.iter_mut().for_each(|p| p.state.reset());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use artic_model::{BodyTree, Joint, Link};

    struct Trees(HashMap<String, BodyTree>);

    impl LinkResolver for Trees {
        fn resolve(&self, character: &str, link: &str) -> Option<ResolvedLink> {
            let tree = self.0.get(character)?;
            Some(ResolvedLink {
                body: tree.id(),
                link: tree.find(link)?,
            })
        }
    }

    fn world() -> Trees {
        let mut trees = HashMap::new();
        trees.insert("floor".to_owned(), BodyTree::new("floor", Link::new("plane", Joint::fixed())));
        trees.insert("ball".to_owned(), BodyTree::new("ball", Link::new("body", Joint::free())));
        Trees(trees)
    }

    #[test]
    fn test_strict_rejects_unknown_link() {
        let mut reg = ContactRegistry::new(RegistrationPolicy::Strict);
        let err = reg
            .register(&world(), ("floor", "plane"), ("ball", "nope"), ContactParams::default())
            .unwrap_err();
        assert_eq!(
            err,
            ContactError::UnresolvedLink {
                character: "ball".into(),
                link: "nope".into()
            }
        );
        assert!(reg.is_empty());
    }

    #[test]
    fn test_tolerant_keeps_unresolved_pair() {
        let mut reg = ContactRegistry::new(RegistrationPolicy::Tolerant);
        let key = reg
            .register(&world(), ("floor", "plane"), ("robot", "foot"), ContactParams::default())
            .unwrap();
        let pair = reg.get(key).unwrap();
        assert!(pair.first.resolved.is_some());
        assert!(pair.second.resolved.is_none());
        assert!(!pair.is_resolved());
    }

    #[test]
    fn test_duplicates_are_independent() {
        let mut reg = ContactRegistry::default();
        let w = world();
        let a = reg
            .register(&w, ("floor", "plane"), ("ball", "body"), ContactParams::default())
            .unwrap();
        let b = reg
            .register(&w, ("floor", "plane"), ("ball", "body"), ContactParams::default())
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(reg.len(), 2);
        assert!(reg.remove(a));
        assert!(!reg.remove(a));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.pairs()[0].key, b);
    }

    #[test]
    fn test_resolve_pending_after_character_appears() {
        let mut reg = ContactRegistry::new(RegistrationPolicy::Tolerant);
        let mut w = world();
        reg.register(&w, ("floor", "plane"), ("robot", "foot"), ContactParams::default())
            .unwrap();
        w.0.insert("robot".into(), BodyTree::new("robot", Link::new("foot", Joint::free())));
        assert_eq!(reg.resolve_pending(&w), 1);
        assert!(reg.pairs()[0].is_resolved());
    }

    #[test]
    fn test_negative_friction_rejected() {
        let mut reg = ContactRegistry::default();
        let params = ContactParams {
            slip_friction: -0.1,
            ..ContactParams::default()
        };
        assert!(matches!(
            reg.register(&world(), ("floor", "plane"), ("ball", "body"), params),
            Err(ContactError::InvalidParameter { name: "slip_friction", .. })
        ));
    }
}
