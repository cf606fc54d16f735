//! Integration tests for the artic simulation stack.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use approx::assert_relative_eq;
use artic::{
    artic_contact::ContactError,
    artic_rigid::total_energy,
    BodyDescription, BodyModel, ContactParams, GeometryStore, JointKind, LinkDescription, LinkPose,
    Pose, RegistrationPolicy, ShapeData, SharedWorld, Vec3, World, WorldConfig, WorldError,
};

fn world_with(config: WorldConfig) -> World {
    World::with_store(config, Arc::new(GeometryStore::new())).unwrap()
}

fn floor() -> BodyModel {
    BodyModel::new(BodyDescription {
        name: "floor".into(),
        links: vec![LinkDescription::new("plane", None, JointKind::Fixed)],
    })
    .with_shapes(0, vec![ShapeData::plane()])
}

fn free_body(
    name: &str,
    mass: f64,
    inertia: f64,
    pos: Vec3,
    rotation: [f64; 4],
    shape: ShapeData,
) -> BodyModel {
    let mut body = LinkDescription::new("body", None, JointKind::Free);
    body.mass = mass;
    body.inertia = [inertia, 0.0, 0.0, 0.0, inertia, 0.0, 0.0, 0.0, inertia];
    body.translation = pos;
    body.rotation = rotation;
    BodyModel::new(BodyDescription {
        name: name.into(),
        links: vec![body],
    })
    .with_shapes(0, vec![shape])
}

/// Cylinder of radius 0.1 and length 0.4 with its axis along world X.
fn roller(z: f64) -> BodyModel {
    free_body(
        "roller",
        1.0,
        0.01,
        Vec3::new(0.0, 0.0, z),
        [0.0, 0.0, 1.0, std::f64::consts::FRAC_PI_2],
        ShapeData::cylinder(0.1, 0.4),
    )
}

/// Two 1 m links hanging from a fixed base at height 3, swinging about Y.
fn double_pendulum() -> BodyModel {
    double_pendulum_at(3.0)
}

/// Two 1 m links swinging about Y, with a sphere of radius 0.1 at the elbow.
fn double_pendulum_at(base_height: f64) -> BodyModel {
    let rod = |name: &str, parent: &str, drop: f64| {
        let joint = JointKind::Rotational { axis: Vec3::y() };
        let mut l = LinkDescription::new(name, Some(parent), joint);
        l.translation = Vec3::new(0.0, 0.0, -drop);
        l.mass = 1.0;
        l.com = Vec3::new(0.0, 0.0, -0.5);
        l.inertia = [1.0 / 12.0, 0.0, 0.0, 0.0, 1.0 / 12.0, 0.0, 0.0, 0.0, 1.0e-4];
        l
    };
    let mut base = LinkDescription::new("base", None, JointKind::Fixed);
    base.translation = Vec3::new(0.0, 0.0, base_height);
    BodyModel::new(BodyDescription {
        name: "pendulum".into(),
        links: vec![base, rod("upper", "base", 0.0), rod("lower", "upper", 1.0)],
    })
    .with_shapes(2, vec![ShapeData::sphere(0.1)])
}

fn pair(world: &mut World, character: &str) -> artic::PairKey {
    world
        .register_collision_check_pair(
            ("floor", "plane"),
            (character, "body"),
            ContactParams::default(),
        )
        .unwrap()
}

#[test]
fn test_double_pendulum_conserves_energy_above_floor() {
    let mut world = world_with(WorldConfig::default());
    world.register_character("floor", &floor()).unwrap();
    world.register_character("pendulum", &double_pendulum()).unwrap();
    world
        .register_collision_check_pair(
            ("floor", "plane"),
            ("pendulum", "lower"),
            ContactParams::default(),
        )
        .unwrap();

    let upper = world.character("pendulum").unwrap().tree.find("upper").unwrap();
    world.character_mut("pendulum").unwrap().tree[upper].q = 0.5;
    world.init_simulation();

    let gravity = world.gravity();
    let e0 = total_energy(&world.character("pendulum").unwrap().tree, &gravity);
    for _ in 0..1000 {
        let report = world.step_simulation().unwrap();
        assert_eq!(report.contact_count, 0);
    }
    let e1 = total_energy(&world.character("pendulum").unwrap().tree, &gravity);
    assert_relative_eq!(e1, e0, epsilon = 0.1);

    let state = world.world_state().character("pendulum").unwrap();
    let lower = state.link("lower").unwrap();
    // The tip stays clear of the floor.
    assert!(lower.position.z > 0.5);
    assert_relative_eq!(world.time(), 1.0, epsilon = 1e-9);
}

#[test]
fn test_double_pendulum_comes_to_rest_on_floor() {
    // Elbow sphere starts 1 mm above the floor and swings down onto it.
    let lean: f64 = 0.4;
    let base_height = lean.cos() + 0.1 + 1.0e-3;
    let mut world = world_with(WorldConfig::default());
    world.register_character("floor", &floor()).unwrap();
    world
        .register_character("pendulum", &double_pendulum_at(base_height))
        .unwrap();
    world
        .register_collision_check_pair(
            ("floor", "plane"),
            ("pendulum", "lower"),
            ContactParams::default(),
        )
        .unwrap();

    let character = world.character_mut("pendulum").unwrap();
    let upper = character.tree.find("upper").unwrap();
    let lower = character.tree.find("lower").unwrap();
    character.tree[upper].q = lean;
    // Lower rod hangs plumb.
    character.tree[lower].q = -lean;
    world.init_simulation();

    let mut steps_in_contact = 0;
    for step in 0..2000 {
        let report = world.step_simulation().unwrap();
        if report.contact_count > 0 {
            steps_in_contact += 1;
        }
        for c in &world.last_contacts()[0].contacts {
            assert!(c.depth.is_finite() && c.depth >= 0.0);
            assert!(c.depth < 5.0e-3, "step {step}: depth {}", c.depth);
        }
    }
    assert!(steps_in_contact > 1000, "in contact for {steps_in_contact} steps");
    assert!(!world.last_contacts()[0].contacts.is_empty());

    let state = world.world_state().character("pendulum").unwrap();
    let elbow = state.link("lower").unwrap().position;
    assert!(elbow.iter().all(|v| v.is_finite()));
    assert!(elbow.z > 0.095 && elbow.z < 0.102, "elbow z = {}", elbow.z);
}

#[test]
fn test_cylinder_settles_on_floor() {
    let mut world = world_with(WorldConfig::default());
    world.register_character("floor", &floor()).unwrap();
    world.register_character("roller", &roller(0.12)).unwrap();
    pair(&mut world, "roller");
    world.init_simulation();

    for _ in 0..500 {
        world.step_simulation().unwrap();
    }
    let z = world.world_state().character("roller").unwrap().links[0].position.z;
    assert!(z > 0.098 && z < 0.1005, "z = {z}");

    let contacts = &world.last_contacts()[0].contacts;
    assert_eq!(contacts.len(), 2);
    for c in contacts {
        assert_relative_eq!(c.normal, Vec3::z(), epsilon = 1e-9);
        assert!(c.depth < 2.0e-3);
        assert!(!c.is_new);
    }
}

#[test]
fn test_box_penetration_stays_bounded() {
    let mut world = world_with(WorldConfig::default());
    world.register_character("floor", &floor()).unwrap();
    let cube = free_body(
        "cube",
        5.0,
        5.0 * 0.08 / 12.0,
        Vec3::new(3.0, -5.0, 0.105),
        [0.0, 0.0, 1.0, 0.0],
        ShapeData::cuboid(Vec3::new(0.2, 0.2, 0.2)),
    );
    world.register_character("cube", &cube).unwrap();
    pair(&mut world, "cube");
    world.init_simulation();

    let mut touched = false;
    for _ in 0..1000 {
        let report = world.step_simulation().unwrap();
        touched |= report.contact_count > 0;
        for c in &world.last_contacts()[0].contacts {
            assert!(c.depth < 0.02, "depth {}", c.depth);
        }
    }
    assert!(touched);
    let p = world.world_state().character("cube").unwrap().links[0].position;
    assert!(p.iter().all(|v| v.is_finite()));
    assert!(p.z > 0.05 && p.z < 0.12, "z = {}", p.z);
}

#[test]
fn test_strict_and_tolerant_registration() {
    let mut strict = world_with(WorldConfig::default());
    strict.register_character("floor", &floor()).unwrap();
    let err = strict
        .register_collision_check_pair(
            ("floor", "plane"),
            ("ghost", "body"),
            ContactParams::default(),
        )
        .unwrap_err();
    assert!(matches!(err, WorldError::Contact(ContactError::UnresolvedLink { .. })));
    assert!(strict.registry().is_empty());

    let mut tolerant = world_with(WorldConfig {
        registration: RegistrationPolicy::Tolerant,
        ..WorldConfig::default()
    });
    tolerant.register_character("floor", &floor()).unwrap();
    let key = pair(&mut tolerant, "ghost");
    assert_eq!(tolerant.step_simulation().unwrap().skipped, vec![key]);
}

#[test]
fn test_duplicate_pairs_are_evaluated_twice() {
    let setup = |pairs: usize| {
        let mut world = world_with(WorldConfig::default());
        world.register_character("floor", &floor()).unwrap();
        world.register_character("roller", &roller(0.095)).unwrap();
        for _ in 0..pairs {
            pair(&mut world, "roller");
        }
        world.init_simulation();
        let report = world.step_simulation().unwrap();
        let roller = world.character("roller").unwrap();
        (report, roller.tree[roller.tree.root()].ext_force.z)
    };
    let (once, f1) = setup(1);
    let (twice, f2) = setup(2);
    assert_eq!(once.pairs_evaluated, 1);
    assert_eq!(twice.pairs_evaluated, 2);
    assert_eq!(twice.contact_count, 2 * once.contact_count);
    assert!(f1 > 0.0);
    assert_relative_eq!(f2, 2.0 * f1, max_relative = 1e-12);
}

#[test]
fn test_stepping_is_deterministic_with_parallel_pairs() {
    let run = || {
        let mut config = WorldConfig::default();
        config.parallel.min_pairs = 1;
        let mut world = world_with(config);
        world.register_character("floor", &floor()).unwrap();
        world.register_character("roller", &roller(0.11)).unwrap();
        for _ in 0..3 {
            pair(&mut world, "roller");
        }
        world.init_simulation();
        for _ in 0..200 {
            world.step_simulation().unwrap();
        }
        world.world_state().clone()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_queries_do_not_disturb_the_simulation() {
    let mut world = world_with(WorldConfig::default());
    world.register_character("floor", &floor()).unwrap();
    world.register_character("roller", &roller(0.5)).unwrap();
    let key = pair(&mut world, "roller");
    world.init_simulation();

    assert!(world.query_intersection_for_pairs(None, &[], true).unwrap().is_empty());
    let sunk = LinkPose {
        character: "roller".into(),
        link: "body".into(),
        pose: Pose::from_axis_angle(
            &Vec3::z(),
            std::f64::consts::FRAC_PI_2,
            Vec3::new(0.0, 0.0, 0.09),
        ),
    };
    let hits = world
        .query_intersection_for_pairs(Some(&[key]), std::slice::from_ref(&sunk), false)
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].second.character, "roller");

    let found = world.query_contact_determination_for_pairs(None, &[sunk]).unwrap();
    assert_eq!(found[0].contacts.len(), 2);
    assert_relative_eq!(found[0].contacts[0].depth, 0.01, epsilon = 1e-9);

    // The stored placement is untouched.
    let z = world.world_state().character("roller").unwrap().links[0].position.z;
    assert_relative_eq!(z, 0.5);
    assert_eq!(world.steps(), 0);
}

#[test]
fn test_geometry_cache_hit_and_rebuild() {
    let store = Arc::new(GeometryStore::new());
    let mut world = World::with_store(WorldConfig::default(), store.clone()).unwrap();
    let t0 = SystemTime::UNIX_EPOCH;
    let t1 = t0 + Duration::from_secs(60);

    world.register_character("a", &roller(1.0).with_source("roller.wrl", t0)).unwrap();
    world.register_character("b", &roller(2.0).with_source("roller.wrl", t0)).unwrap();
    world.register_character("c", &roller(3.0).with_source("roller.wrl", t1)).unwrap();
    assert_eq!(store.len(), 1);

    let geometry = |name: &str| {
        let c = world.character(name).unwrap();
        c.geometry(c.tree.root()).unwrap().clone()
    };
    assert!(Arc::ptr_eq(&geometry("a"), &geometry("b")));
    assert!(!Arc::ptr_eq(&geometry("a"), &geometry("c")));
    assert_eq!(store.cached("roller.wrl").unwrap().stamp, t1);
}

#[test]
fn test_config_from_json_drives_the_step() {
    let config = WorldConfig::from_json_str(
        r#"{
            "timestep": 0.005,
            "gravity": [0.0, 0.0, -1.62],
            "integration": "explicit_euler",
            "parallel": { "enabled": false }
        }"#,
    )
    .unwrap();
    let mut world = world_with(config);
    world.register_character("roller", &roller(1.0)).unwrap();
    world.init_simulation();
    let report = world.step_simulation().unwrap();
    assert_relative_eq!(report.time, 0.005);
    assert_relative_eq!(world.gravity().z, -1.62);

    let json = world.world_state().to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["characters"][0]["name"], "roller");
}

#[test]
fn test_shared_world_rejects_concurrent_step() {
    let mut world = world_with(WorldConfig::default());
    world.register_character("floor", &floor()).unwrap();
    let shared = SharedWorld::new(world);
    let other = shared.clone();
    shared.with(|w| {
        assert_eq!(w.steps(), 0);
        assert!(matches!(other.try_step(), Err(WorldError::StepInProgress)));
    });
    assert_eq!(other.try_step().unwrap().step, 1);
}

#[test]
fn test_deep_clone_is_disjoint() {
    let mut world = world_with(WorldConfig::default());
    world.register_character("pendulum", &double_pendulum()).unwrap();
    let original = &world.character("pendulum").unwrap().tree;
    let mut copy = original.deep_clone();
    assert_ne!(copy.id(), original.id());
    assert_eq!(copy.link_count(), original.link_count());

    let upper = copy.find("upper").unwrap();
    copy[upper].q = 1.0;
    let original = &world.character("pendulum").unwrap().tree;
    assert_eq!(original[original.find("upper").unwrap()].q, 0.0);

    let character = world.character_mut("pendulum").unwrap();
    let original_upper = character.tree.find("upper").unwrap();
    character.tree[original_upper].q = 0.25;
    assert_eq!(copy[upper].q, 1.0);
}
