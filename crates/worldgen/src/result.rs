use glam::DVec2;
use placeweave_common::Vertex;
use placeweave_connect::{EnhanceStats, ExitStats, RepairStats};
use placeweave_kernel::{Place, PlaceGraph};
use placeweave_spatial::{LayoutReport, MergeStats};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::WorldGenerationConfig;
use crate::progress::Stage;

/// Exit totals of the finished graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStats {
    /// Every exit, counted once per direction.
    pub total: usize,
    /// Exits whose reverse exit exists.
    pub reciprocal: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationStatus {
    Complete,
    /// Stopped by a cancellation token; `after` is the last finished stage.
    Cancelled { after: Option<Stage> },
}

/// Layout pass over one band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandLayoutRun {
    pub band: usize,
    pub vertices: usize,
    pub report: LayoutReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTiming {
    pub stage: Stage,
    pub elapsed: Duration,
}

/// Counters from every stage, returned next to the world.
///
/// Timings are wall-clock and therefore excluded from serialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub target_places: usize,
    pub projections: usize,
    pub merge: MergeStats,
    pub seams_stitched: usize,
    pub ecosystem_transitions: usize,
    pub exits: ExitStats,
    pub repair: RepairStats,
    pub enhance: EnhanceStats,
    pub layout: Vec<BandLayoutRun>,
    #[serde(skip)]
    pub timings: Vec<StageTiming>,
}

impl Diagnostics {
    pub fn total_time(&self) -> Duration {
        self.timings.iter().map(|t| t.elapsed).sum()
    }
}

/// A generated world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldGenerationResult {
    pub places: Vec<Place>,
    pub vertices: Vec<Vertex>,
    pub connection_stats: ConnectionStats,
    pub config: WorldGenerationConfig,
    pub status: GenerationStatus,
    pub diagnostics: Diagnostics,
}

impl WorldGenerationResult {
    pub fn is_complete(&self) -> bool {
        self.status == GenerationStatus::Complete
    }

    /// Rebuild the place graph, positioning each place at its vertex.
    pub fn graph(&self) -> PlaceGraph {
        let positions: Vec<DVec2> = self
            .places
            .iter()
            .map(|p| {
                self.vertices
                    .get(p.vertex.index())
                    .map_or(DVec2::ZERO, Vertex::position)
            })
            .collect();
        PlaceGraph::from_parts(self.places.clone(), &positions)
    }
}

impl ConnectionStats {
    pub fn of(graph: &PlaceGraph) -> Self {
        Self {
            total: graph.exit_count(),
            reciprocal: graph.reciprocal_exit_count(),
        }
    }
}
