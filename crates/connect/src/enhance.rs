use placeweave_common::PlaceId;
use placeweave_kernel::{BandLayout, PlaceGraph, bfs_within};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhanceStats {
    /// Places below their ecosystem's target degree.
    pub places_below_target: usize,
    pub exits_added: usize,
    /// Candidates rejected for lack of a compass slot or capacity.
    pub rejected: usize,
}

/// Add short-cut exits between places a few hops apart.
///
/// Each place below its profile's target degree collects candidates at
/// 2..=`max_hop_radius` hops: all same-ecosystem places plus at most
/// `adjacent_sample_cap` from band-adjacent ecosystems. Candidates are
/// tried by (hops, distance, id). Existing exits are never removed, and
/// no place is pushed past `degree_cap`.
pub fn enhance_connectivity(graph: &mut PlaceGraph, layout: &BandLayout, degree_cap: usize) -> EnhanceStats {
    let _span = tracing::info_span!("enhance_connectivity", places = graph.len()).entered();
    let mut stats = EnhanceStats::default();
    let ids: Vec<PlaceId> = graph.ids().collect();

    for id in ids {
        let Some(profile) = graph.get(id).map(|p| p.ecology) else {
            continue;
        };
        let target = profile.target_degree().min(degree_cap);
        if graph.degree(id) >= target {
            continue;
        }
        stats.places_below_target += 1;

        let mut same = Vec::new();
        let mut adjacent = Vec::new();
        for (other, hops) in bfs_within(graph, id, profile.max_hop_radius) {
            if hops < 2 {
                continue;
            }
            let Some(eco) = graph.get(other).map(|p| p.ecology.ecosystem) else {
                continue;
            };
            let entry = (hops, graph.distance(id, other), other);
            if eco == profile.ecosystem {
                same.push(entry);
            } else if layout.are_adjacent(profile.ecosystem, eco) {
                adjacent.push(entry);
            }
        }
        let by_rank = |x: &(u32, f64, PlaceId), y: &(u32, f64, PlaceId)| {
            x.0.cmp(&y.0).then(x.1.total_cmp(&y.1)).then(x.2.cmp(&y.2))
        };
        adjacent.sort_by(by_rank);
        adjacent.truncate(profile.adjacent_sample_cap as usize);
        same.extend(adjacent);
        same.sort_by(by_rank);

        let mut added = 0;
        for (_, _, other) in same {
            if added >= profile.max_new_exits_per_place || graph.degree(id) >= target {
                break;
            }
            if graph.degree(other) >= degree_cap || graph.is_linked(id, other) {
                stats.rejected += 1;
                continue;
            }
            match graph.find_compass_slot(id, other) {
                Some(dir) if graph.link(id, dir, other) => {
                    added += 1;
                    stats.exits_added += 1;
                }
                _ => stats.rejected += 1,
            }
        }
    }

    tracing::debug!(
        below_target = stats.places_below_target,
        added = stats.exits_added,
        "connectivity enhanced"
    );
    stats
}
