use placeweave_common::{Connection, Direction, EcosystemId, PlaceId, SeededRandom, Vertex};
use placeweave_kernel::{EcosystemProfile, PlaceGraph};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Exit assignment settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitConfig {
    /// Relay places considered per failed direct connection.
    pub relay_candidates: usize,
    /// Degree at which capacity fill and relays stop using a place.
    pub fill_degree_cap: usize,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            relay_candidates: 6,
            fill_degree_cap: 6,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitStats {
    /// Undirected edges considered after collapsing reciprocal pairs.
    pub edges: usize,
    pub transition_edges: usize,
    pub direct_phase1: usize,
    pub relayed_phase1: usize,
    pub direct_phase2: usize,
    pub relayed_phase2: usize,
    pub already_connected: usize,
    pub skipped: usize,
    pub missing_references: usize,
}

impl ExitStats {
    pub fn placed(&self) -> usize {
        self.direct_phase1 + self.relayed_phase1 + self.direct_phase2 + self.relayed_phase2
    }
}

const ADJECTIVES: [&str; 8] = [
    "Quiet", "Old", "Broken", "Windswept", "Hidden", "Lonely", "Bright", "Sunken",
];

fn nouns(ecosystem: EcosystemId) -> &'static [&'static str] {
    match ecosystem {
        EcosystemId::Steppe => &["Plain", "Barrow", "Waystone", "Rise", "Camp"],
        EcosystemId::Grassland => &["Meadow", "Field", "Pasture", "Hill", "Crossing"],
        EcosystemId::Forest => &["Glade", "Thicket", "Hollow", "Grove", "Clearing"],
        EcosystemId::Mountains => &["Pass", "Ridge", "Crag", "Ledge", "Summit"],
        EcosystemId::Jungle => &["Canopy", "Ruin", "Vinewall", "Falls", "Den"],
        EcosystemId::Tundra => &["Drift", "Floe", "Cairn", "Waste", "Shelf"],
        EcosystemId::Desert => &["Dune", "Oasis", "Mesa", "Wash", "Flat"],
        EcosystemId::Marsh => &["Fen", "Bog", "Mire", "Reedbed", "Pool"],
    }
}

fn describe(ecosystem: EcosystemId, rng: &mut SeededRandom) -> (String, String) {
    let adjective = ADJECTIVES[rng.next_int(ADJECTIVES.len() as u32) as usize];
    let pool = nouns(ecosystem);
    let noun = pool[rng.next_int(pool.len() as u32) as usize];
    let name = format!("{adjective} {noun}");
    let description = format!("A {} {} in the {ecosystem}.", adjective.to_lowercase(), noun.to_lowercase());
    (name, description)
}

/// One exit-less place per vertex, in vertex order, so place `i` stands on
/// vertex `i`. Names and descriptions are drawn from `rng`.
pub fn build_places(vertices: &[Vertex], rng: &mut SeededRandom) -> PlaceGraph {
    let _span = tracing::info_span!("build_places", vertices = vertices.len()).entered();
    let mut graph = PlaceGraph::new();
    for v in vertices {
        let (name, description) = describe(v.ecosystem, rng);
        graph.add_place(
            v.id,
            v.position(),
            EcosystemProfile::for_ecosystem(v.ecosystem),
            name,
            description,
        );
    }
    graph
}

/// Two-phase exit assignment over `connections`.
///
/// Reciprocal pairs collapse to one undirected edge. Transition edges go
/// first. Phase 1 serves edges touching an exit-less place; phase 2 fills
/// the rest up to `fill_degree_cap`. An edge that gets neither a direct
/// nor a relayed link is skipped and counted.
pub fn assign_exits(graph: &mut PlaceGraph, connections: &[Connection], cfg: &ExitConfig) -> ExitStats {
    let _span = tracing::info_span!("assign_exits", connections = connections.len()).entered();
    let mut stats = ExitStats::default();

    let mut seen = BTreeSet::new();
    let mut edges: Vec<(PlaceId, PlaceId, bool)> = Vec::new();
    for c in connections {
        let (a, b) = (PlaceId(c.from.0), PlaceId(c.to.0));
        if graph.get(a).is_none() || graph.get(b).is_none() {
            stats.missing_references += 1;
            tracing::debug!(from = %c.from, to = %c.to, "connection references a missing vertex");
            continue;
        }
        if a == b || !seen.insert((a.min(b), a.max(b))) {
            continue;
        }
        edges.push((a, b, c.is_transition()));
    }
    // stable: growth order is kept within each class
    edges.sort_by_key(|(_, _, transition)| !transition);
    stats.edges = edges.len();
    stats.transition_edges = edges.iter().filter(|e| e.2).count();

    let pools = relay_pools(graph);
    let mut handled = vec![false; edges.len()];

    for (i, &(a, b, _)) in edges.iter().enumerate() {
        if graph.degree(a) != 0 && graph.degree(b) != 0 {
            continue;
        }
        handled[i] = true;
        match connect_pair(graph, a, b, &pools, cfg, usize::MAX) {
            Outcome::Linked => stats.direct_phase1 += 1,
            Outcome::Relayed => stats.relayed_phase1 += 1,
            Outcome::AlreadyConnected => stats.already_connected += 1,
            Outcome::Skipped => stats.skipped += 1,
        }
    }

    for (i, &(a, b, _)) in edges.iter().enumerate() {
        if handled[i] {
            continue;
        }
        match connect_pair(graph, a, b, &pools, cfg, cfg.fill_degree_cap) {
            Outcome::Linked => stats.direct_phase2 += 1,
            Outcome::Relayed => stats.relayed_phase2 += 1,
            Outcome::AlreadyConnected => stats.already_connected += 1,
            Outcome::Skipped => stats.skipped += 1,
        }
    }

    tracing::debug!(
        placed = stats.placed(),
        skipped = stats.skipped,
        missing = stats.missing_references,
        "exits assigned"
    );
    stats
}

enum Outcome {
    Linked,
    Relayed,
    AlreadyConnected,
    Skipped,
}

/// Places grouped by ecosystem, in id order.
fn relay_pools(graph: &PlaceGraph) -> BTreeMap<EcosystemId, Vec<PlaceId>> {
    let mut pools: BTreeMap<EcosystemId, Vec<PlaceId>> = BTreeMap::new();
    for place in graph.places() {
        pools.entry(place.ecology.ecosystem).or_default().push(place.id);
    }
    pools
}

fn connect_pair(
    graph: &mut PlaceGraph,
    a: PlaceId,
    b: PlaceId,
    pools: &BTreeMap<EcosystemId, Vec<PlaceId>>,
    cfg: &ExitConfig,
    cap: usize,
) -> Outcome {
    if graph.is_linked(a, b) {
        return Outcome::AlreadyConnected;
    }
    if graph.degree(a) >= cap || graph.degree(b) >= cap {
        tracing::trace!(%a, %b, "edge skipped at degree cap");
        return Outcome::Skipped;
    }
    if let Some(dir) = graph.find_compass_slot(a, b) {
        if graph.link(a, dir, b) {
            return Outcome::Linked;
        }
    }
    if relay(graph, a, b, pools, cfg) {
        return Outcome::Relayed;
    }
    tracing::trace!(%a, %b, "edge skipped, no slot or relay");
    Outcome::Skipped
}

/// Join `a` and `b` through an intermediate place `a <-> r <-> b`.
fn relay(
    graph: &mut PlaceGraph,
    a: PlaceId,
    b: PlaceId,
    pools: &BTreeMap<EcosystemId, Vec<PlaceId>>,
    cfg: &ExitConfig,
) -> bool {
    let (Some(pa), Some(pb)) = (graph.position(a), graph.position(b)) else {
        return false;
    };
    let midpoint = (pa + pb) * 0.5;
    let mut ecosystems = Vec::new();
    for id in [a, b] {
        if let Some(place) = graph.get(id) {
            if !ecosystems.contains(&place.ecology.ecosystem) {
                ecosystems.push(place.ecology.ecosystem);
            }
        }
    }

    let mut candidates: Vec<(f64, PlaceId)> = ecosystems
        .iter()
        .filter_map(|e| pools.get(e))
        .flatten()
        .copied()
        .filter(|&r| r != a && r != b && graph.degree(r) + 2 <= cfg.fill_degree_cap)
        .filter_map(|r| graph.position(r).map(|p| (p.distance(midpoint), r)))
        .collect();
    candidates.sort_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)));
    candidates.truncate(cfg.relay_candidates);

    for (_, r) in candidates {
        if let Some((to_relay, from_relay)) = relay_slots(graph, a, r, b) {
            let first = to_relay.is_none_or(|d| graph.link(a, d, r));
            let second = first && from_relay.is_none_or(|d| graph.link(r, d, b));
            if first && second {
                tracing::trace!(%a, %b, relay = %r, "relayed");
                return true;
            }
        }
    }
    false
}

/// Directions for `a -> r` and `r -> b`; `None` where the pair is already
/// linked. The two directions never collide at `r`.
fn relay_slots(
    graph: &PlaceGraph,
    a: PlaceId,
    r: PlaceId,
    b: PlaceId,
) -> Option<(Option<Direction>, Option<Direction>)> {
    let need_first = !graph.is_linked(a, r);
    let need_second = !graph.is_linked(r, b);
    if !need_first && !need_second {
        return None;
    }
    let first = if need_first {
        Some(graph.find_compass_slot(a, r)?)
    } else {
        None
    };
    let taken_at_relay = first.map(Direction::opposite);
    let second = if need_second {
        let fan = graph.heading(r, b).compass_fan();
        Some(graph.find_slot(r, b, fan.into_iter().filter(|d| Some(*d) != taken_at_relay))?)
    } else {
        None
    };
    Some((first, second))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;
    use placeweave_common::VertexId;
    use placeweave_kernel::fixtures::line_graph;

    fn vertex(id: u32, x: f64, y: f64, ecosystem: EcosystemId) -> Vertex {
        Vertex {
            id: VertexId(id),
            x,
            y,
            ecosystem,
            depth: 0,
            parent: None,
        }
    }

    fn edge(a: u32, b: u32) -> Connection {
        Connection::growth(VertexId(a), VertexId(b), 10.0)
    }

    #[test]
    fn one_place_per_vertex_with_names() {
        let vertices = vec![
            vertex(0, 0.0, 0.0, EcosystemId::Forest),
            vertex(1, 10.0, 0.0, EcosystemId::Marsh),
        ];
        let g = build_places(&vertices, &mut SeededRandom::new(5));
        assert_eq!(g.len(), 2);
        assert_eq!(g.get(PlaceId(1)).unwrap().vertex, VertexId(1));
        assert_eq!(g.get(PlaceId(1)).unwrap().ecology.ecosystem, EcosystemId::Marsh);
        assert!(!g.get(PlaceId(0)).unwrap().name.is_empty());
        assert_eq!(g.position(PlaceId(1)), Some(DVec2::new(10.0, 0.0)));
    }

    #[test]
    fn names_are_deterministic() {
        let vertices: Vec<Vertex> = (0..10)
            .map(|i| vertex(i, f64::from(i), 0.0, EcosystemId::Desert))
            .collect();
        let a = build_places(&vertices, &mut SeededRandom::new(9));
        let b = build_places(&vertices, &mut SeededRandom::new(9));
        let names = |g: &PlaceGraph| g.places().iter().map(|p| p.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(&a), names(&b));
    }

    #[test]
    fn chain_edges_become_east_west_exits() {
        let mut g = line_graph(4);
        let stats = assign_exits(&mut g, &[edge(0, 1), edge(1, 2), edge(2, 3)], &ExitConfig::default());
        assert_eq!(stats.direct_phase1, 3);
        assert_eq!(stats.skipped, 0);
        let p1 = g.get(PlaceId(1)).unwrap();
        assert_eq!(p1.exits[&Direction::East].to, PlaceId(2));
        assert_eq!(p1.exits[&Direction::West].to, PlaceId(0));
        assert!(g.one_way_exits().is_empty());
    }

    #[test]
    fn reciprocal_pairs_collapse_to_one_edge() {
        let mut g = line_graph(2);
        let forward = Connection::artificial(VertexId(0), VertexId(1), 10.0);
        let stats = assign_exits(&mut g, &[forward.reversed(), forward], &ExitConfig::default());
        assert_eq!(stats.edges, 1);
        assert_eq!(g.exit_count(), 2);
    }

    #[test]
    fn missing_references_are_counted_and_skipped() {
        let mut g = line_graph(2);
        let stats = assign_exits(&mut g, &[edge(0, 1), edge(1, 7)], &ExitConfig::default());
        assert_eq!(stats.missing_references, 1);
        assert_eq!(stats.direct_phase1, 1);
    }

    #[test]
    fn transition_edges_are_processed_first() {
        let mut g = line_graph(3);
        let plain = edge(0, 1);
        let mut transition = edge(2, 1);
        transition.ecosystem_transition = Some((EcosystemId::Forest, EcosystemId::Desert));
        assign_exits(&mut g, &[plain, transition], &ExitConfig::default());
        // 2 -> 1 is westwards, so place 1 got its east exit from the transition edge
        assert_eq!(g.get(PlaceId(1)).unwrap().exits[&Direction::East].to, PlaceId(2));
        assert_eq!(g.get(PlaceId(1)).unwrap().exits[&Direction::West].to, PlaceId(0));
    }

    #[test]
    fn saturated_hub_routes_through_a_relay() {
        // hub at the origin with all eight compass slots taken
        let mut vertices = vec![vertex(0, 0.0, 0.0, EcosystemId::Grassland)];
        for (k, dir) in Direction::COMPASS.iter().enumerate() {
            let d = match dir {
                Direction::North => DVec2::new(0.0, -10.0),
                Direction::Northeast => DVec2::new(10.0, -10.0),
                Direction::East => DVec2::new(10.0, 0.0),
                Direction::Southeast => DVec2::new(10.0, 10.0),
                Direction::South => DVec2::new(0.0, 10.0),
                Direction::Southwest => DVec2::new(-10.0, 10.0),
                Direction::West => DVec2::new(-10.0, 0.0),
                _ => DVec2::new(-10.0, -10.0),
            };
            vertices.push(vertex(k as u32 + 1, d.x, d.y, EcosystemId::Grassland));
        }
        vertices.push(vertex(9, 25.0, 2.0, EcosystemId::Grassland));
        let mut g = build_places(&vertices, &mut SeededRandom::new(1));
        let mut connections: Vec<Connection> = (1..=8).map(|k| edge(0, k)).collect();
        connections.push(edge(0, 9));
        let stats = assign_exits(&mut g, &connections, &ExitConfig::default());
        assert_eq!(g.get(PlaceId(0)).unwrap().compass_degree(), 8);
        assert_eq!(stats.relayed_phase1, 1);
        assert!(g.degree(PlaceId(9)) >= 1);
        assert!(g.one_way_exits().is_empty());
    }

    #[test]
    fn capacity_fill_stops_at_the_cap() {
        // the chain runs in phase 1; the shortcuts from place 0 are left for
        // phase 2 because both their endpoints already have exits
        let mut g = line_graph(6);
        let mut connections: Vec<Connection> = (0..5).map(|k| edge(k, k + 1)).collect();
        connections.extend((2..6).map(|k| edge(0, k)));
        let cfg = ExitConfig {
            relay_candidates: 0,
            fill_degree_cap: 3,
        };
        let stats = assign_exits(&mut g, &connections, &cfg);

        assert_eq!(stats.direct_phase1, 5);
        assert_eq!(stats.direct_phase2, 2);
        assert_eq!(stats.relayed_phase2, 0);
        assert_eq!(stats.skipped, 2);
        assert_eq!(g.degree(PlaceId(0)), 3);
        assert!(g.is_linked(PlaceId(0), PlaceId(2)));
        assert!(g.is_linked(PlaceId(0), PlaceId(3)));
        assert!(!g.is_linked(PlaceId(0), PlaceId(4)));
        assert!(!g.is_linked(PlaceId(0), PlaceId(5)));
        assert!(g.places().iter().all(|p| p.degree() <= cfg.fill_degree_cap));
        assert!(g.one_way_exits().is_empty());
    }
}
