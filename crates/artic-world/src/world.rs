//! The simulation world: characters, collision pairs and the step pipeline.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use artic_collision::{
    build_link, CollisionGeometry, ContactPoint, DetectMode, GeometryStore, LinkGeometry,
    NormalConvention, PairDetector,
};
use artic_contact::{
    resolve_pair, ContactParams, ContactRegistry, ContactState, LinkResolver, PairKey, ResolvedLink,
};
use artic_math::{Pose, Vec3};
use artic_model::{BodyId, BodyTree, LinkId};
use artic_rigid::{forward_dynamics, forward_kinematics, Integrator};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;
use tracing::{debug, trace, warn};

use crate::config::{ParallelConfig, WorldConfig};
use crate::error::{Result, WorldError};
use crate::model::{BodyModel, Character};
use crate::sensor::{SensorReading, SensorSlot, SensorSpec};
use crate::state::{CharacterState, LinkState, WorldState};

/// Stage of the step pipeline the world is in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StepPhase {
    #[default]
    Idle,
    PoseUpdated,
    CollisionsDetected,
    ForcesResolved,
    Integrated,
}

/// A link named by character and link name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkName {
    pub character: String,
    pub link: String,
}

impl fmt::Display for LinkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.character, self.link)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkPair {
    pub key: PairKey,
    pub first: LinkName,
    pub second: LinkName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairContacts {
    pub pair: LinkPair,
    pub contacts: Vec<ContactPoint>,
}

/// Placement of one link used by the queries instead of its current pose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkPose {
    pub character: String,
    pub link: String,
    pub pose: Pose,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    /// Number of completed steps, this one included.
    pub step: u64,
    pub time: f64,
    pub pairs_evaluated: usize,
    pub contact_count: usize,
    /// Pairs left out because a side is unresolved or has no geometry.
    pub skipped: Vec<PairKey>,
}

struct Job {
    index: usize,
    a: Arc<CollisionGeometry>,
    pose_a: Pose,
    b: Arc<CollisionGeometry>,
    pose_b: Pose,
}

struct Roster<'a> {
    characters: &'a [Character],
    by_name: &'a HashMap<String, usize>,
}

impl LinkResolver for Roster<'_> {
    fn resolve(&self, character: &str, link: &str) -> Option<ResolvedLink> {
        let c = &self.characters[*self.by_name.get(character)?];
        Some(ResolvedLink {
            body: c.tree.id(),
            link: c.tree.find(link)?,
        })
    }
}

fn evaluate<T, F>(jobs: &[Job], parallel: &ParallelConfig, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(&Job) -> T + Sync + Send,
{
    if parallel.enabled && jobs.len() >= parallel.min_pairs {
        jobs.par_iter().map(f).collect()
    } else {
        jobs.iter().map(f).collect()
    }
}

pub struct World {
    config: WorldConfig,
    integrator: Box<dyn Integrator>,
    detector: PairDetector,
    store: Arc<GeometryStore>,
    characters: Vec<Character>,
    by_name: HashMap<String, usize>,
    by_body: HashMap<BodyId, usize>,
    registry: ContactRegistry,
    sensors: Vec<SensorSlot>,
    phase: StepPhase,
    time: f64,
    steps: u64,
    state: WorldState,
    last_contacts: Vec<PairContacts>,
}

impl World {
    /// A world using the process-wide geometry store.
    pub fn new(config: WorldConfig) -> Result<Self> {
        Self::with_store(config, GeometryStore::global())
    }

    pub fn with_store(config: WorldConfig, store: Arc<GeometryStore>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            integrator: config.integration.integrator(),
            registry: ContactRegistry::new(config.registration),
            config,
            detector: PairDetector::new(NormalConvention::FirstToSecond),
            store,
            characters: Vec::new(),
            by_name: HashMap::new(),
            by_body: HashMap::new(),
            sensors: Vec::new(),
            phase: StepPhase::Idle,
            time: 0.0,
            steps: 0,
            state: WorldState::default(),
            last_contacts: Vec::new(),
        })
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn phase(&self) -> StepPhase {
        self.phase
    }

    pub fn gravity(&self) -> Vec3 {
        self.config.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.config.gravity = gravity;
    }

    pub fn store(&self) -> &Arc<GeometryStore> {
        &self.store
    }

    pub fn registry(&self) -> &ContactRegistry {
        &self.registry
    }

    pub fn character(&self, name: &str) -> Option<&Character> {
        self.by_name.get(name).map(|&i| &self.characters[i])
    }

    /// Mutable access for setting joint state and efforts. Replacing the tree
    /// itself detaches it from registered pairs.
    pub fn character_mut(&mut self, name: &str) -> Option<&mut Character> {
        self.by_name.get(name).map(|&i| &mut self.characters[i])
    }

    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.iter()
    }

    fn roster(&self) -> Roster<'_> {
        Roster {
            characters: &self.characters,
            by_name: &self.by_name,
        }
    }

    /// Builds the character's tree and geometry and adds it to the world.
    ///
    /// Any model or fatal geometry error leaves the world unchanged. Pairs
    /// registered earlier that name this character are resolved now.
    pub fn register_character(&mut self, name: &str, model: &BodyModel) -> Result<()> {
        if self.by_name.contains_key(name) {
            return Err(WorldError::DuplicateCharacter(name.to_owned()));
        }
        let mut tree = BodyTree::from_description(&model.description)?;
        let links = &model.description.links;
        if model.shapes.len() > links.len() {
            return Err(WorldError::ShapeMismatch {
                character: name.to_owned(),
                links: links.len(),
                shapes: model.shapes.len(),
            });
        }

        let cached;
        let built: Vec<LinkGeometry>;
        let link_geometry: &[LinkGeometry] = match &model.source {
            Some(source) => {
                cached = self.store.load(&source.id, source.stamp, &model.shapes)?;
                &cached.links
            }
            None => {
                built = model
                    .shapes
                    .iter()
                    .map(|s| build_link(s))
                    .collect::<artic_collision::Result<_>>()?;
                &built
            }
        };

        let mut geometry = SecondaryMap::new();
        for (ld, lg) in links.iter().zip(link_geometry) {
            if let (Some(id), Some(g)) = (tree.find(&ld.name), &lg.geometry) {
                geometry.insert(id, g.clone());
            }
        }
        forward_kinematics(&mut tree);

        let index = self.characters.len();
        debug!(
            character = name,
            links = tree.link_count(),
            collidable = geometry.len(),
            "registered character"
        );
        self.by_body.insert(tree.id(), index);
        self.by_name.insert(name.to_owned(), index);
        self.characters.push(Character {
            name: name.to_owned(),
            tree,
            geometry,
        });

        let roster = Roster {
            characters: &self.characters,
            by_name: &self.by_name,
        };
        let resolved = self.registry.resolve_pending(&roster);
        if resolved > 0 {
            debug!(character = name, resolved, "resolved pending pair links");
        }
        self.refresh_state();
        Ok(())
    }

    /// Registers a pair checked every step. Identical pairs may be registered
    /// more than once and are then evaluated independently.
    pub fn register_collision_check_pair(
        &mut self,
        first: (&str, &str),
        second: (&str, &str),
        params: ContactParams,
    ) -> Result<PairKey> {
        let roster = Roster {
            characters: &self.characters,
            by_name: &self.by_name,
        };
        Ok(self.registry.register(&roster, first, second, params)?)
    }

    pub fn remove_collision_check_pair(&mut self, key: PairKey) -> bool {
        self.registry.remove(key)
    }

    pub fn add_sensor(&mut self, spec: SensorSpec) -> Result<()> {
        let index = *self
            .by_name
            .get(&spec.character)
            .ok_or_else(|| WorldError::UnknownCharacter(spec.character.clone()))?;
        let link = self.characters[index]
            .tree
            .find(&spec.link)
            .ok_or_else(|| WorldError::UnknownLink {
                character: spec.character.clone(),
                link: spec.link.clone(),
            })?;
        self.sensors.push(SensorSlot::new(spec, index, link));
        Ok(())
    }

    pub fn sensor_readings(&self) -> impl Iterator<Item = &SensorReading> {
        self.sensors.iter().map(|s| &s.reading)
    }

    pub fn sensor_state(&self, name: &str) -> Option<&SensorReading> {
        self.sensors.iter().find(|s| s.spec.name == name).map(|s| &s.reading)
    }

    /// Link placements as of the last completed step.
    pub fn world_state(&self) -> &WorldState {
        &self.state
    }

    /// Contacts found in the last completed step, in pair order.
    pub fn last_contacts(&self) -> &[PairContacts] {
        &self.last_contacts
    }

    /// Resets time and contact history and recomputes link placements from
    /// the current joint state.
    pub fn init_simulation(&mut self) {
        self.time = 0.0;
        self.steps = 0;
        self.phase = StepPhase::Idle;
        self.registry.reset_states();
        self.last_contacts.clear();
        for c in &mut self.characters {
            forward_kinematics(&mut c.tree);
            for id in c.tree.preorder() {
                c.tree[id].clear_external();
            }
        }
        for s in &mut self.sensors {
            s.reset();
        }
        self.refresh_state();
        self.sample_sensors();
        debug!(
            characters = self.characters.len(),
            pairs = self.registry.len(),
            "simulation initialized"
        );
    }

    fn enter(&mut self, phase: StepPhase) {
        trace!(?phase, step = self.steps + 1, "step phase");
        self.phase = phase;
    }

    /// Advances the world by one timestep.
    ///
    /// A pair that cannot be evaluated is skipped and reported; only a
    /// dynamics failure aborts the step. Dynamics runs for every character
    /// before any of them is integrated, so an aborted step leaves time,
    /// link states and contact history as they were.
    pub fn step_simulation(&mut self) -> Result<StepReport> {
        let dt = self.config.timestep;

        for c in &mut self.characters {
            forward_kinematics(&mut c.tree);
        }
        self.enter(StepPhase::PoseUpdated);

        let (jobs, skipped) = self.collect_jobs(None, &HashMap::new());
        let detector = self.detector;
        let mut detected = evaluate(&jobs, &self.config.parallel, |job| {
            detector.detect(&job.a, &job.pose_a, &job.b, &job.pose_b, DetectMode::AllContacts)
        });
        self.enter(StepPhase::CollisionsDetected);

        for c in &mut self.characters {
            for id in c.tree.preorder() {
                c.tree[id].clear_external();
            }
        }
        let tolerance = self.config.persistence_tolerance;
        let convention = self.config.normal_convention;
        let mut reported = Vec::with_capacity(jobs.len());
        let mut contact_count = 0;
        let mut previous: Vec<(usize, ContactState)> = Vec::with_capacity(jobs.len());
        for (job, contacts) in jobs.iter().zip(detected.iter_mut()) {
            let pair = &mut self.registry.pairs_mut()[job.index];
            let Some((ra, rb)) = pair.resolved() else {
                continue;
            };
            let (Some(&ca), Some(&cb)) = (self.by_body.get(&ra.body), self.by_body.get(&rb.body))
            else {
                continue;
            };
            previous.push((job.index, pair.state.clone()));
            let forces = resolve_pair(
                pair,
                contacts,
                &self.characters[ca].tree[ra.link],
                &self.characters[cb].tree[rb.link],
                dt,
                tolerance,
            );
            forces.apply_to_first(&mut self.characters[ca].tree[ra.link]);
            forces.apply_to_second(&mut self.characters[cb].tree[rb.link]);

            contact_count += contacts.len();
            reported.push(PairContacts {
                pair: link_pair(pair),
                contacts: oriented(contacts, convention),
            });
        }
        self.enter(StepPhase::ForcesResolved);

        let gravity = self.config.gravity;
        let mut root_accs = Vec::with_capacity(self.characters.len());
        for c in &mut self.characters {
            match forward_dynamics(&mut c.tree, &gravity) {
                Ok(acc) => root_accs.push(acc),
                Err(e) => {
                    warn!(character = %c.name, error = %e, "dynamics failed, step discarded");
                    let pairs = self.registry.pairs_mut();
                    for (index, state) in previous {
                        pairs[index].state = state;
                    }
                    self.phase = StepPhase::Idle;
                    return Err(e.into());
                }
            }
        }
        for (c, root_acc) in self.characters.iter_mut().zip(&root_accs) {
            self.integrator.advance(&mut c.tree, root_acc.as_ref(), dt);
            forward_kinematics(&mut c.tree);
        }
        self.enter(StepPhase::Integrated);

        self.time += dt;
        self.steps += 1;
        self.last_contacts = reported;
        self.refresh_state();
        self.sample_sensors();
        self.phase = StepPhase::Idle;

        Ok(StepReport {
            step: self.steps,
            time: self.time,
            pairs_evaluated: jobs.len(),
            contact_count,
            skipped,
        })
    }

    /// Contacts of the selected pairs (all when `None`) with the current link
    /// placements, except for links listed in `poses`.
    ///
    /// Does not advance time or touch contact history.
    pub fn query_contact_determination_for_pairs(
        &self,
        pairs: Option<&[PairKey]>,
        poses: &[LinkPose],
    ) -> Result<Vec<PairContacts>> {
        let overrides = self.overrides(poses)?;
        let (jobs, _) = self.collect_jobs(pairs, &overrides);
        let detector = self.detector;
        let convention = self.config.normal_convention;
        let contacts = evaluate(&jobs, &self.config.parallel, |job| {
            detector.detect(&job.a, &job.pose_a, &job.b, &job.pose_b, DetectMode::AllContacts)
        });
        let pairs = self.registry.pairs();
        Ok(jobs
            .iter()
            .zip(contacts)
            .map(|(job, contacts)| PairContacts {
                pair: link_pair(&pairs[job.index]),
                contacts: oriented(&contacts, convention),
            })
            .collect())
    }

    /// Selected pairs that intersect, in pair order. Stops at the first
    /// intersecting pair unless `exhaustive`.
    pub fn query_intersection_for_pairs(
        &self,
        pairs: Option<&[PairKey]>,
        poses: &[LinkPose],
        exhaustive: bool,
    ) -> Result<Vec<LinkPair>> {
        let overrides = self.overrides(poses)?;
        let (jobs, _) = self.collect_jobs(pairs, &overrides);
        let all = self.registry.pairs();
        let hit = |job: &Job| self.detector.intersects(&job.a, &job.pose_a, &job.b, &job.pose_b);
        if exhaustive {
            let hits = evaluate(&jobs, &self.config.parallel, hit);
            Ok(jobs
                .iter()
                .zip(hits)
                .filter(|(_, h)| *h)
                .map(|(job, _)| link_pair(&all[job.index]))
                .collect())
        } else {
            Ok(jobs
                .iter()
                .find(|&job| hit(job))
                .map(|job| link_pair(&all[job.index]))
                .into_iter()
                .collect())
        }
    }

    fn overrides(&self, poses: &[LinkPose]) -> Result<HashMap<(usize, LinkId), Pose>> {
        poses
            .iter()
            .map(|p| -> Result<((usize, LinkId), Pose)> {
                let ci = *self
                    .by_name
                    .get(&p.character)
                    .ok_or_else(|| WorldError::UnknownCharacter(p.character.clone()))?;
                let link = self.characters[ci]
                    .tree
                    .find(&p.link)
                    .ok_or_else(|| WorldError::UnknownLink {
                        character: p.character.clone(),
                        link: p.link.clone(),
                    })?;
                Ok(((ci, link), p.pose))
            })
            .collect()
    }

    fn placed(
        &self,
        r: ResolvedLink,
        overrides: &HashMap<(usize, LinkId), Pose>,
    ) -> Option<(Arc<CollisionGeometry>, Pose)> {
        let ci = *self.by_body.get(&r.body)?;
        let c = &self.characters[ci];
        let link = c.tree.link(r.link)?;
        let geometry = c.geometry(r.link)?.clone();
        let pose = overrides.get(&(ci, r.link)).copied().unwrap_or(link.pose);
        Some((geometry, pose))
    }

    fn collect_jobs(
        &self,
        selection: Option<&[PairKey]>,
        overrides: &HashMap<(usize, LinkId), Pose>,
    ) -> (Vec<Job>, Vec<PairKey>) {
        let mut jobs = Vec::new();
        let mut skipped = Vec::new();
        for (index, pair) in self.registry.pairs().iter().enumerate() {
            if selection.is_some_and(|keys| !keys.contains(&pair.key)) {
                continue;
            }
            let Some((ra, rb)) = pair.resolved() else {
                debug!(
                    pair = %pair.key,
                    first = %pair.first,
                    second = %pair.second,
                    "skipping unresolved pair"
                );
                skipped.push(pair.key);
                continue;
            };
            let (Some((a, pose_a)), Some((b, pose_b))) =
                (self.placed(ra, overrides), self.placed(rb, overrides))
            else {
                debug!(pair = %pair.key, "skipping pair without collision geometry");
                skipped.push(pair.key);
                continue;
            };
            jobs.push(Job {
                index,
                a,
                pose_a,
                b,
                pose_b,
            });
        }
        (jobs, skipped)
    }

    fn refresh_state(&mut self) {
        self.state = WorldState {
            time: self.time,
            characters: self
                .characters
                .iter()
                .map(|c| CharacterState {
                    name: c.name.clone(),
                    links: c
                        .tree
                        .preorder()
                        .into_iter()
                        .map(|id| {
                            let l = &c.tree[id];
                            LinkState {
                                name: l.name.clone(),
                                position: l.pose.pos,
                                rotation: l.pose.rot,
                                q: l.q,
                                dq: l.dq,
                            }
                        })
                        .collect(),
                })
                .collect(),
        };
    }

    fn sample_sensors(&mut self) {
        let gravity = self.config.gravity;
        let dt = self.config.timestep;
        for s in &mut self.sensors {
            let link = self.characters.get(s.character).and_then(|c| c.tree.link(s.link));
            if let Some(link) = link {
                s.sample(link, &gravity, dt, self.time);
            }
        }
    }
}

impl LinkResolver for World {
    fn resolve(&self, character: &str, link: &str) -> Option<ResolvedLink> {
        self.roster().resolve(character, link)
    }
}

fn link_pair(pair: &artic_contact::CheckPair) -> LinkPair {
    let name = |r: &artic_contact::LinkRef| LinkName {
        character: r.character.clone(),
        link: r.link.clone(),
    };
    LinkPair {
        key: pair.key,
        first: name(&pair.first),
        second: name(&pair.second),
    }
}

fn oriented(contacts: &[ContactPoint], convention: NormalConvention) -> Vec<ContactPoint> {
    contacts
        .iter()
        .map(|c| match convention {
            NormalConvention::FirstToSecond => *c,
            NormalConvention::SecondToFirst => ContactPoint {
                normal: -c.normal,
                ..*c
            },
        })
        .collect()
}
