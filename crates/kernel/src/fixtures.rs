//! Small hand-built graphs for tests and benchmarks across the workspace.

use glam::DVec2;
use placeweave_common::{Direction, EcosystemId, PlaceId, VertexId};

use crate::ecology::EcosystemProfile;
use crate::graph::PlaceGraph;

/// `n` exit-less grassland places spaced 10 units apart along x.
pub fn line_graph(n: u32) -> PlaceGraph {
    let mut g = PlaceGraph::new();
    for i in 0..n {
        g.add_place(
            VertexId(i),
            DVec2::new(f64::from(i) * 10.0, 0.0),
            EcosystemProfile::for_ecosystem(EcosystemId::Grassland),
            format!("Place {i}"),
            String::new(),
        );
    }
    g
}

/// `clusters` disconnected east-west chains of `per_cluster` places each,
/// laid out on a square grid of cluster origins.
pub fn fragmented_graph(clusters: u32, per_cluster: u32) -> PlaceGraph {
    let mut g = PlaceGraph::new();
    let side = f64::from(clusters).sqrt().ceil().max(1.0) as u32;
    for c in 0..clusters {
        let origin = DVec2::new(f64::from(c % side) * 100.0, f64::from(c / side) * 100.0);
        let mut prev: Option<PlaceId> = None;
        for k in 0..per_cluster {
            let id = g.add_place(
                VertexId(c * per_cluster + k),
                origin + DVec2::new(f64::from(k) * 12.0, 0.0),
                EcosystemProfile::for_ecosystem(EcosystemId::Forest),
                format!("Cluster {c} place {k}"),
                String::new(),
            );
            if let Some(p) = prev {
                g.link(p, Direction::East, id);
            }
            prev = Some(id);
        }
    }
    g
}
