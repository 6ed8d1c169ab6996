use placeweave_common::{Connection, Vertex, VertexId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::grid::SpatialGrid;

/// Area of one default band (200 x 400); thresholds are scaled relative to it.
pub const REFERENCE_BAND_AREA: f64 = 80_000.0;

/// One independently grown fractal tree, with ids local to the projection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    pub vertices: Vec<Vertex>,
    pub connections: Vec<Connection>,
}

/// Collision-detection parameters for one merge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeParams {
    /// Vertices closer than this are bridged.
    pub threshold: f64,
    /// No vertex may exceed this many distinct neighbors through merging.
    pub degree_cap: usize,
}

impl MergeParams {
    /// Parameters scaled to the world: the threshold grows with
    /// `sqrt(band_area)` and shrinks with `sqrt(density)`; the degree cap
    /// grows with the number of places and the density.
    pub fn adaptive(
        band_area: f64,
        density: f64,
        total_places: usize,
        base_distance: f64,
        base_cap: usize,
    ) -> Self {
        let density = density.max(0.01);
        let threshold =
            (base_distance * (band_area.max(1.0) / REFERENCE_BAND_AREA).sqrt() / density.sqrt())
                .clamp(4.0, 120.0);
        let size_bonus = (total_places.max(1) as f64 / 25.0).log2().floor().max(0.0) as usize;
        let density_bonus = density.sqrt().floor() as usize;
        let degree_cap = (base_cap + size_bonus + density_bonus).clamp(2, 8);
        Self {
            threshold,
            degree_cap,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    pub projections: usize,
    pub pairs_tested: usize,
    /// Reciprocal pairs added by collision detection.
    pub edges_added: usize,
    /// Pairs within threshold rejected by the degree cap.
    pub capped: usize,
}

/// Vertices and connections of all projections in one id space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedGraph {
    pub vertices: Vec<Vertex>,
    pub connections: Vec<Connection>,
    pub stats: MergeStats,
}

impl MergedGraph {
    /// Distinct neighbors per vertex, treating connections as undirected.
    pub fn adjacency(&self) -> Vec<BTreeSet<usize>> {
        let mut adj = vec![BTreeSet::new(); self.vertices.len()];
        for c in &self.connections {
            let (a, b) = (c.from.index(), c.to.index());
            if a < adj.len() && b < adj.len() && a != b {
                adj[a].insert(b);
                adj[b].insert(a);
            }
        }
        adj
    }

    fn push_pair(&mut self, a: usize, b: usize) {
        let length = self.vertices[a].position().distance(self.vertices[b].position());
        let forward = Connection::artificial(VertexId(a as u32), VertexId(b as u32), length);
        self.connections.push(forward.reversed());
        self.connections.push(forward);
    }
}

/// Concatenate projections into one id space and bridge close vertices.
pub fn merge_projections(projections: Vec<Projection>, params: &MergeParams) -> MergedGraph {
    let _span = tracing::info_span!("merge_projections", projections = projections.len()).entered();
    let mut merged = MergedGraph {
        stats: MergeStats {
            projections: projections.len(),
            ..MergeStats::default()
        },
        ..MergedGraph::default()
    };

    for projection in projections {
        let offset = merged.vertices.len() as u32;
        let shift = |id: VertexId| VertexId(id.0 + offset);
        for mut v in projection.vertices {
            v.id = shift(v.id);
            v.parent = v.parent.map(shift);
            merged.vertices.push(v);
        }
        for mut c in projection.connections {
            c.from = shift(c.from);
            c.to = shift(c.to);
            merged.connections.push(c);
        }
    }

    let positions: Vec<_> = merged.vertices.iter().map(Vertex::position).collect();
    let mut grid = SpatialGrid::new(params.threshold);
    grid.rebuild(&positions);
    let mut adj = merged.adjacency();

    for (a, b) in grid.candidate_pairs() {
        merged.stats.pairs_tested += 1;
        if adj[a].contains(&b) || positions[a].distance(positions[b]) > params.threshold {
            continue;
        }
        if adj[a].len() >= params.degree_cap || adj[b].len() >= params.degree_cap {
            merged.stats.capped += 1;
            continue;
        }
        adj[a].insert(b);
        adj[b].insert(a);
        merged.push_pair(a, b);
        merged.stats.edges_added += 1;
    }

    tracing::debug!(
        vertices = merged.vertices.len(),
        added = merged.stats.edges_added,
        capped = merged.stats.capped,
        "projections merged"
    );
    merged
}

/// Join every pair of neighboring bands that has no connection yet through
/// its closest cross-seam vertex pair. `band_of[i]` is the band of vertex
/// `i`. Returns the number of reciprocal pairs added.
pub fn stitch_bands(merged: &mut MergedGraph, band_of: &[usize], band_count: usize) -> usize {
    let n = merged.vertices.len().min(band_of.len());
    let adj = merged.adjacency();
    let mut added = 0;

    for seam in 0..band_count.saturating_sub(1) {
        let west: Vec<usize> = (0..n).filter(|&i| band_of[i] == seam).collect();
        let east: Vec<usize> = (0..n).filter(|&i| band_of[i] == seam + 1).collect();
        if west.is_empty() || east.is_empty() {
            continue;
        }
        let joined = west
            .iter()
            .any(|&a| adj[a].iter().any(|&b| band_of.get(b) == Some(&(seam + 1))));
        if joined {
            continue;
        }
        let mut best: Option<(f64, usize, usize)> = None;
        for &a in &west {
            let pa = merged.vertices[a].position();
            for &b in &east {
                let d = pa.distance(merged.vertices[b].position());
                if best.is_none_or(|(bd, _, _)| d < bd) {
                    best = Some((d, a, b));
                }
            }
        }
        if let Some((_, a, b)) = best {
            merged.push_pair(a, b);
            added += 1;
            tracing::trace!(seam, a, b, "band seam stitched");
        }
    }
    added
}
