use glam::DVec2;
use placeweave_common::{Direction, PlaceId};
use placeweave_kernel::{Components, PlaceGraph, reachable_without_edge};
use serde::{Deserialize, Serialize};

/// Connectivity repair settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    pub max_rounds: u32,
    /// Above this many components a round bridges in star mode.
    pub star_threshold: usize,
    /// Low-degree candidates taken from each side of a bridge.
    pub candidates_per_component: usize,
    /// Candidate pairs tried per component per round.
    pub max_attempts: usize,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            max_rounds: 32,
            star_threshold: 50,
            candidates_per_component: 4,
            max_attempts: 12,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairStats {
    pub initial_components: usize,
    pub final_components: usize,
    pub rounds: u32,
    pub star_rounds: u32,
    pub bridges: usize,
    /// Bridges that first removed a redundant exit pair.
    pub freed_slots: usize,
    /// Bridges that fell back to relative directions.
    pub relative_links: usize,
    /// One-way exits completed or removed before repair.
    pub reciprocity_fixes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeKind {
    Direct,
    FreedSlot,
    Relative,
}

/// Make every exit reciprocal: complete a one-way exit when the opposite
/// slot is free at the far side, otherwise drop it. Returns the number of
/// exits touched.
pub fn normalize_reciprocity(graph: &mut PlaceGraph) -> usize {
    let mut fixes = 0;
    loop {
        let pending = graph.one_way_exits();
        let Some(&(a, dir, b)) = pending.first() else {
            break;
        };
        let completes = graph.get(b).is_some_and(|far| far.exit_to(a).is_none())
            && graph.is_free(b, dir.opposite());
        if completes {
            graph.insert_one_way(b, dir.opposite(), a);
        } else {
            graph.remove_one_way(a, dir);
        }
        fixes += 1;
    }
    if fixes > 0 {
        tracing::debug!(fixes, "reciprocity normalized");
    }
    fixes
}

/// Bridge components until the graph is connected or the round budget runs
/// out. A residual multi-component graph is logged, never an error.
pub fn repair_connectivity(graph: &mut PlaceGraph, cfg: &RepairConfig) -> RepairStats {
    let _span = tracing::info_span!("repair_connectivity", places = graph.len()).entered();
    let mut stats = RepairStats {
        reciprocity_fixes: normalize_reciprocity(graph),
        ..RepairStats::default()
    };

    let mut components = Components::of(graph);
    stats.initial_components = components.count();

    while !components.is_connected() && stats.rounds < cfg.max_rounds {
        stats.rounds += 1;
        let Some(anchor) = components.largest() else {
            break;
        };
        let before = stats.bridges;
        if components.count() > cfg.star_threshold {
            stats.star_rounds += 1;
            star_round(graph, &components, anchor, cfg, &mut stats);
        } else {
            general_round(graph, &components, anchor, cfg, &mut stats);
        }
        components = Components::of(graph);
        tracing::debug!(
            round = stats.rounds,
            components = components.count(),
            bridged = stats.bridges - before,
            "repair round"
        );
        if stats.bridges == before {
            break;
        }
    }

    stats.final_components = components.count();
    if stats.final_components > 1 {
        tracing::warn!(
            components = stats.final_components,
            rounds = stats.rounds,
            "connectivity repair stopped with multiple components"
        );
    }
    stats
}

fn centroid(graph: &PlaceGraph, members: &[PlaceId]) -> DVec2 {
    let mut sum = DVec2::ZERO;
    let mut n = 0.0;
    for p in members.iter().filter_map(|id| graph.position(*id)) {
        sum += p;
        n += 1.0;
    }
    if n > 0.0 { sum / n } else { DVec2::ZERO }
}

/// Members ordered by (degree, distance to `towards`, id), truncated to `k`.
fn candidates(graph: &PlaceGraph, members: &[PlaceId], towards: DVec2, k: usize) -> Vec<PlaceId> {
    let mut ranked: Vec<(usize, f64, PlaceId)> = members
        .iter()
        .map(|&id| {
            let d = graph.position(id).map_or(f64::INFINITY, |p| p.distance(towards));
            (graph.degree(id), d, id)
        })
        .collect();
    ranked.sort_by(|x, y| x.0.cmp(&y.0).then(x.1.total_cmp(&y.1)).then(x.2.cmp(&y.2)));
    ranked.into_iter().take(k.max(1)).map(|(_, _, id)| id).collect()
}

/// Try candidate pairs nearest-first until one bridge succeeds.
fn bridge_any(
    graph: &mut PlaceGraph,
    left: &[PlaceId],
    right: &[PlaceId],
    max_attempts: usize,
    stats: &mut RepairStats,
) -> bool {
    let mut pairs: Vec<(f64, PlaceId, PlaceId)> = left
        .iter()
        .flat_map(|&a| right.iter().map(move |&b| (a, b)))
        .map(|(a, b)| (graph.distance(a, b), a, b))
        .collect();
    pairs.sort_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)).then(x.2.cmp(&y.2)));
    for (_, a, b) in pairs.into_iter().take(max_attempts.max(1)) {
        if let Some(kind) = bridge(graph, a, b) {
            stats.bridges += 1;
            match kind {
                BridgeKind::Direct => {}
                BridgeKind::FreedSlot => stats.freed_slots += 1,
                BridgeKind::Relative => stats.relative_links += 1,
            }
            return true;
        }
    }
    false
}

fn general_round(
    graph: &mut PlaceGraph,
    components: &Components,
    anchor: usize,
    cfg: &RepairConfig,
    stats: &mut RepairStats,
) {
    let anchor_members = components.members(anchor);
    let anchor_center = centroid(graph, anchor_members);
    for (index, members) in components.all().iter().enumerate() {
        if index == anchor {
            continue;
        }
        let center = centroid(graph, members);
        let left = candidates(graph, members, anchor_center, cfg.candidates_per_component);
        let right = candidates(graph, anchor_members, center, cfg.candidates_per_component);
        if !bridge_any(graph, &left, &right, cfg.max_attempts, stats) {
            tracing::debug!(component = index, size = members.len(), "component not bridged this round");
        }
    }
}

/// Every component is bridged straight to the anchor. Anchor candidates
/// come from one degree-sorted list shared by the whole round.
fn star_round(
    graph: &mut PlaceGraph,
    components: &Components,
    anchor: usize,
    cfg: &RepairConfig,
    stats: &mut RepairStats,
) {
    let anchor_members = components.members(anchor);
    let anchor_center = centroid(graph, anchor_members);
    let mut hubs: Vec<PlaceId> = anchor_members.to_vec();
    hubs.sort_by_key(|id| (graph.degree(*id), *id));

    for (index, members) in components.all().iter().enumerate() {
        if index == anchor {
            continue;
        }
        let left = candidates(graph, members, anchor_center, 1);
        let Some(&from) = left.first() else {
            continue;
        };
        let pos = graph.position(from).unwrap_or(DVec2::ZERO);
        let right = candidates(graph, &hubs, pos, cfg.candidates_per_component);
        bridge_any(graph, &[from], &right, cfg.max_attempts, stats);
    }
}

/// Create a reciprocal exit pair between `a` and `b`, which must lie in
/// different components.
///
/// Tries a compass slot, then a compass slot freed by removing one exit
/// pair whose endpoints stay connected without it, then a relative
/// direction pair.
pub fn bridge(graph: &mut PlaceGraph, a: PlaceId, b: PlaceId) -> Option<BridgeKind> {
    if let Some(dir) = graph.find_compass_slot(a, b) {
        if graph.link(a, dir, b) {
            tracing::trace!(%a, %b, %dir, "bridged");
            return Some(BridgeKind::Direct);
        }
    }
    if free_slot_and_link(graph, a, b) {
        return Some(BridgeKind::FreedSlot);
    }
    let dir = graph.find_slot(a, b, Direction::RELATIVE)?;
    graph.link(a, dir, b).then(|| {
        tracing::trace!(%a, %b, %dir, "bridged with a relative exit");
        BridgeKind::Relative
    })
}

fn free_slot_and_link(graph: &mut PlaceGraph, a: PlaceId, b: PlaceId) -> bool {
    for dir in graph.heading(a, b).compass_fan() {
        let back = dir.opposite();
        let a_exit = graph.get(a).and_then(|p| p.exits.get(&dir)).map(|e| e.to);
        let b_exit = graph.get(b).and_then(|p| p.exits.get(&back)).map(|e| e.to);
        let (owner, slot, target) = match (a_exit, b_exit) {
            (Some(t), None) => (a, dir, t),
            (None, Some(t)) => (b, back, t),
            _ => continue,
        };
        if !reachable_without_edge(graph, owner, target) {
            continue;
        }
        graph.unlink(owner, slot);
        if graph.link(a, dir, b) {
            tracing::trace!(%a, %b, %dir, removed_to = %target, "bridged after freeing a slot");
            return true;
        }
        // restore; the slot and its far side were just vacated
        graph.link(owner, slot, target);
    }
    false
}
