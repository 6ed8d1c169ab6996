use placeweave_common::{Direction, EcosystemId};
use placeweave_fractal::{FractalKind, RiverDelta};
use placeweave_kernel::Components;
use placeweave_worldgen::{
    WorldGenerationConfig, WorldGenerationResult, WorldShape, generate, generate_batch,
    map_ecosystems,
};

fn config(seed: u32, bands: usize, min_places: usize) -> WorldGenerationConfig {
    WorldGenerationConfig {
        seed,
        shape: WorldShape::Bands { count: bands },
        min_places,
        ..WorldGenerationConfig::default()
    }
}

fn fingerprint(result: &WorldGenerationResult) -> (u64, usize, usize) {
    (
        result.graph().state_hash(),
        result.connection_stats.total,
        result.vertices.len(),
    )
}

fn assert_world_invariants(result: &WorldGenerationResult) {
    let graph = result.graph();
    assert!(result.is_complete());
    assert!(
        Components::of(&graph).is_connected(),
        "world splits into {} components",
        Components::of(&graph).count()
    );
    assert!(graph.one_way_exits().is_empty(), "all exits are reciprocal");
    for place in graph.places() {
        assert!(place.compass_degree() <= 8);
        assert!(!place.exits.contains_key(&Direction::Unknown));
        for (dir, exit) in &place.exits {
            assert_eq!(exit.direction, *dir);
            assert_ne!(exit.to, place.id, "no self loops");
        }
    }
    assert_eq!(result.connection_stats.total, result.connection_stats.reciprocal);
}

#[test]
fn same_seed_same_world() {
    let a = generate(&config(3, 4, 40)).unwrap();
    let b = generate(&config(3, 4, 40)).unwrap();
    assert_eq!(a.places, b.places);
    assert_eq!(a.vertices, b.vertices);
    assert_eq!(fingerprint(&a), fingerprint(&b));
}

#[test]
fn different_seeds_differ() {
    let a = generate(&config(3, 4, 40)).unwrap();
    let b = generate(&config(4, 4, 40)).unwrap();
    assert_ne!(a.vertices, b.vertices);
}

#[test]
fn seed_seven_five_bands() {
    let result = generate(&config(7, 5, 30)).unwrap();
    let n = result.places.len();
    assert!((30..=60).contains(&n), "{n} places");
    assert_world_invariants(&result);
}

#[test]
fn worlds_hold_invariants_across_seeds_and_sizes() {
    for (seed, bands, min) in [(1, 1, 30), (2, 3, 60), (5, 7, 120), (99, 2, 45)] {
        let result = generate(&config(seed, bands, min)).unwrap();
        assert_eq!(result.places.len(), result.diagnostics.target_places);
        assert_world_invariants(&result);
    }
}

#[test]
fn river_delta_world_is_connected() {
    let cfg = WorldGenerationConfig {
        generator: FractalKind::RiverDelta(RiverDelta::default()),
        ..config(21, 4, 80)
    };
    assert_world_invariants(&generate(&cfg).unwrap());
}

#[test]
fn explicit_dimensions_are_respected() {
    let cfg = WorldGenerationConfig {
        shape: WorldShape::Dimensions {
            width: 900.0,
            height: 300.0,
        },
        ..config(8, 1, 30)
    };
    let result = generate(&cfg).unwrap();
    assert_world_invariants(&result);
    for v in &result.vertices {
        assert!((0.0..=900.0).contains(&v.x));
        assert!((0.0..=300.0).contains(&v.y));
    }
}

#[test]
fn ecosystems_follow_bands() {
    let cfg = WorldGenerationConfig {
        dithering_strength: 0.0,
        ..config(12, 3, 60)
    };
    let result = generate(&cfg).unwrap();
    let layout = cfg.band_layout();
    let mut seen = Vec::new();
    for v in &result.vertices {
        assert_eq!(v.ecosystem, layout.determine_ecosystem(v.x, v.y));
        if !seen.contains(&v.ecosystem) {
            seen.push(v.ecosystem);
        }
    }
    assert!(!seen.contains(&EcosystemId::Marsh));
}

#[test]
fn ecosystem_mapping_is_idempotent() {
    let result = generate(&config(17, 5, 50)).unwrap();
    let layout = result.config.band_layout();
    let mut vertices = result.vertices.clone();
    let mut connections = Vec::new();
    map_ecosystems(&layout, &mut vertices, &mut connections);
    let once = vertices.clone();
    map_ecosystems(&layout, &mut vertices, &mut connections);
    assert_eq!(vertices, once);
}

#[test]
fn batch_matches_sequential_runs() {
    let configs: Vec<_> = (0..4).map(|s| config(s + 40, 3, 40)).collect();
    let batch = generate_batch(&configs);
    for (cfg, result) in configs.iter().zip(batch) {
        let single = generate(cfg).unwrap();
        let batched = result.unwrap();
        assert_eq!(batched.places, single.places);
        assert_eq!(batched.vertices, single.vertices);
    }
}

#[test]
fn invalid_config_is_rejected() {
    let cfg = WorldGenerationConfig {
        min_places: 100,
        max_places: 10,
        ..WorldGenerationConfig::default()
    };
    assert!(generate(&cfg).is_err());
}
