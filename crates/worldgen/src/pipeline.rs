use glam::DVec2;
use placeweave_common::{Connection, PlaceId, SeededRandom, Vertex, VertexId};
use placeweave_connect::{assign_exits, build_places, enhance_connectivity, repair_connectivity};
use placeweave_fractal::{FractalGenerator, GrowthConstraints};
use placeweave_kernel::{BAND_ORDER, BandLayout, PlaceGraph};
use placeweave_spatial::{MergeParams, Projection, apply_layout, merge_projections, stitch_bands};
use rayon::prelude::*;
use std::time::Instant;

use crate::config::{ConfigError, WorldGenerationConfig};
use crate::progress::{CancellationToken, GenerationObserver, NoopObserver, Stage};
use crate::result::{
    BandLayoutRun, ConnectionStats, Diagnostics, GenerationStatus, StageTiming, WorldGenerationResult,
};

/// Generate a world. Fails only on an invalid config.
pub fn generate(config: &WorldGenerationConfig) -> Result<WorldGenerationResult, ConfigError> {
    generate_with(config, &mut NoopObserver, &CancellationToken::new())
}

/// Generate several worlds in parallel. Runs share nothing, so each result
/// equals what [`generate`] returns for the same config.
pub fn generate_batch(
    configs: &[WorldGenerationConfig],
) -> Vec<Result<WorldGenerationResult, ConfigError>> {
    configs.par_iter().map(generate).collect()
}

/// Generate a world, reporting stage boundaries to `observer` and stopping
/// early once `cancel` is set.
pub fn generate_with(
    config: &WorldGenerationConfig,
    observer: &mut dyn GenerationObserver,
    cancel: &CancellationToken,
) -> Result<WorldGenerationResult, ConfigError> {
    config.validate()?;
    let _span = tracing::info_span!(
        "generate",
        seed = config.seed,
        generator = config.generator.name()
    )
    .entered();

    let mut run = Run::new(config);
    let mut stage = Stage::GenerateFractals;
    let mut last_done = None;

    while stage != Stage::Done {
        if cancel.is_cancelled() {
            tracing::info!(after = ?last_done, "generation cancelled");
            return Ok(run.finish(GenerationStatus::Cancelled { after: last_done }));
        }
        observer.stage_started(stage);
        let started = Instant::now();
        {
            let _stage_span = tracing::info_span!("stage", name = stage.name()).entered();
            run.step(stage);
        }
        let elapsed = started.elapsed();
        run.diagnostics.timings.push(StageTiming { stage, elapsed });
        observer.stage_finished(stage, elapsed);
        last_done = Some(stage);
        stage = stage.next();
    }

    tracing::info!(
        places = run.graph.len(),
        exits = run.graph.exit_count(),
        elapsed_ms = run.diagnostics.total_time().as_millis() as u64,
        "world generated"
    );
    Ok(run.finish(GenerationStatus::Complete))
}

/// Ecosystem at every vertex position, plus transition tags on edges whose
/// endpoints differ. Applying it twice changes nothing.
pub fn map_ecosystems(layout: &BandLayout, vertices: &mut [Vertex], connections: &mut [Connection]) -> usize {
    for v in vertices.iter_mut() {
        v.ecosystem = layout.determine_ecosystem(v.x, v.y);
    }
    let mut transitions = 0;
    for c in connections.iter_mut() {
        let from = vertices.get(c.from.index()).map(|v| v.ecosystem);
        let to = vertices.get(c.to.index()).map(|v| v.ecosystem);
        c.ecosystem_transition = match (from, to) {
            (Some(a), Some(b)) if a != b => {
                transitions += 1;
                Some((a, b))
            }
            _ => None,
        };
    }
    transitions
}

/// State threaded through the stages of one run.
struct Run<'a> {
    config: &'a WorldGenerationConfig,
    layout: BandLayout,
    rng: SeededRandom,
    projections: Vec<Projection>,
    /// Band each vertex was grown in, indexed like `vertices`.
    band_of: Vec<usize>,
    vertices: Vec<Vertex>,
    connections: Vec<Connection>,
    graph: PlaceGraph,
    diagnostics: Diagnostics,
}

impl<'a> Run<'a> {
    fn new(config: &'a WorldGenerationConfig) -> Self {
        Self {
            config,
            layout: config.band_layout(),
            rng: SeededRandom::new(config.seed),
            projections: Vec::new(),
            band_of: Vec::new(),
            vertices: Vec::new(),
            connections: Vec::new(),
            graph: PlaceGraph::new(),
            diagnostics: Diagnostics {
                target_places: config.target_places(),
                ..Diagnostics::default()
            },
        }
    }

    fn step(&mut self, stage: Stage) {
        match stage {
            Stage::GenerateFractals => self.generate_fractals(),
            Stage::MergeProjections => self.merge(),
            Stage::MapEcosystems => {
                self.diagnostics.ecosystem_transitions =
                    map_ecosystems(&self.layout, &mut self.vertices, &mut self.connections);
            }
            Stage::BuildPlaces => self.graph = build_places(&self.vertices, &mut self.rng),
            Stage::AssignExits => {
                self.diagnostics.exits =
                    assign_exits(&mut self.graph, &self.connections, &self.config.tuning.exits);
            }
            Stage::RepairConnectivity => {
                self.diagnostics.repair = repair_connectivity(&mut self.graph, &self.config.tuning.repair);
            }
            Stage::EnhanceConnectivity => {
                self.diagnostics.enhance = enhance_connectivity(
                    &mut self.graph,
                    &self.layout,
                    self.config.tuning.exits.fill_degree_cap,
                );
            }
            Stage::LayoutOptimize => self.optimize_layout(),
            Stage::Done => {}
        }
    }

    /// Grow projections band by band until each band holds its share of
    /// the target place count. Every projection yields at least its origin,
    /// so the loop always terminates on the exact quota.
    fn generate_fractals(&mut self) {
        let target = self.diagnostics.target_places;
        let bands = self.layout.band_count();
        let growth = self.config.effective_growth();
        let height = self.layout.height();
        let per_projection_floor = self.config.tuning.projections_per_band;

        for band in 0..bands {
            let quota = target / bands + usize::from(band < target % bands);
            let (x0, x1) = self.layout.band_span(band);
            let width = x1 - x0;
            let sparks = self
                .config
                .tuning
                .spark_positions
                .iter()
                .map(|f| x0 + f * width)
                .collect();
            let constraints =
                GrowthConstraints::new(DVec2::new(x0, 0.0), DVec2::new(x1, height)).with_sparks(sparks);
            let share = quota.div_ceil(per_projection_floor).max(1);

            let mut remaining = quota;
            while remaining > 0 {
                let budget = growth.max_vertices.min(share).min(remaining);
                let band_growth = placeweave_fractal::GrowthParams {
                    max_vertices: budget,
                    ..growth.clone()
                };
                let start = DVec2::new(
                    x0 + self.rng.next_float(0.0, 0.1) * width,
                    self.rng.next_float(0.15, 0.85) * height,
                );
                let direction = self.rng.next_float(-0.35, 0.35);
                let segments = self.config.generator.generate(
                    start,
                    direction,
                    &band_growth,
                    &mut self.rng,
                    &constraints,
                );

                let ecosystem = self.layout.band_ecosystem(band).unwrap_or(BAND_ORDER[0]);
                let vertices: Vec<Vertex> = segments
                    .iter()
                    .map(|s| Vertex {
                        id: VertexId(s.index as u32),
                        x: s.end.x,
                        y: s.end.y,
                        ecosystem,
                        depth: s.depth,
                        parent: s.parent.map(|p| VertexId(p as u32)),
                    })
                    .collect();
                let connections = segments
                    .iter()
                    .filter_map(|s| {
                        s.parent
                            .map(|p| Connection::growth(VertexId(p as u32), VertexId(s.index as u32), s.length()))
                    })
                    .collect();

                remaining = remaining.saturating_sub(vertices.len());
                self.band_of.extend(std::iter::repeat_n(band, vertices.len()));
                self.projections.push(Projection {
                    vertices,
                    connections,
                });
            }
        }
        self.diagnostics.projections = self.projections.len();
        tracing::debug!(
            projections = self.projections.len(),
            vertices = self.band_of.len(),
            "fractals grown"
        );
    }

    fn merge(&mut self) {
        let (width, height) = self.config.shape.dimensions();
        let band_area = width * height / self.layout.band_count() as f64;
        let params = MergeParams::adaptive(
            band_area,
            self.config.place_density,
            self.diagnostics.target_places,
            self.config.tuning.merge_base_distance,
            self.config.tuning.merge_base_degree_cap,
        );
        let mut merged = merge_projections(std::mem::take(&mut self.projections), &params);
        self.diagnostics.seams_stitched = stitch_bands(&mut merged, &self.band_of, self.layout.band_count());
        self.diagnostics.merge = merged.stats;
        self.vertices = merged.vertices;
        self.connections = merged.connections;
    }

    /// Force-directed relaxation of each band large enough to need it.
    /// Only discharge-pattern worlds are relaxed.
    fn optimize_layout(&mut self) {
        let config = self.config;
        let cfg = &config.layout;
        if !cfg.enabled || !config.generator.is_lichtenberg() {
            return;
        }
        let height = self.layout.height();
        for band in 0..self.layout.band_count() {
            let members: Vec<usize> = (0..self.vertices.len())
                .filter(|&i| self.band_of.get(i) == Some(&band))
                .collect();
            if !cfg.applies_to(members.len()) {
                continue;
            }
            let mut local = vec![usize::MAX; self.vertices.len()];
            for (k, &i) in members.iter().enumerate() {
                local[i] = k;
            }
            let mut edges = Vec::new();
            for &i in &members {
                let Some(place) = self.graph.places().get(i) else {
                    continue;
                };
                for exit in place.exits.values() {
                    let j = exit.to.index();
                    if j > i && local.get(j).is_some_and(|l| *l != usize::MAX) {
                        edges.push((local[i], local[j]));
                    }
                }
            }

            let (x0, x1) = self.layout.band_span(band);
            let center = DVec2::new((x0 + x1) * 0.5, height * 0.5);
            let radii = DVec2::new((x1 - x0) * 0.5, height * 0.5);
            let mut positions: Vec<DVec2> = members.iter().map(|&i| self.vertices[i].position()).collect();
            let report = apply_layout(&mut positions, &edges, center, radii, cfg);

            for (&i, p) in members.iter().zip(&positions) {
                self.vertices[i].set_position(*p);
                self.graph.set_position(PlaceId(i as u32), *p);
            }
            self.diagnostics.layout.push(BandLayoutRun {
                band,
                vertices: members.len(),
                report,
            });
        }
        for c in &mut self.connections {
            if let (Some(a), Some(b)) = (self.vertices.get(c.from.index()), self.vertices.get(c.to.index())) {
                c.length = a.position().distance(b.position());
            }
        }
    }

    fn finish(self, status: GenerationStatus) -> WorldGenerationResult {
        WorldGenerationResult {
            connection_stats: ConnectionStats::of(&self.graph),
            places: self.graph.into_places(),
            vertices: self.vertices,
            config: self.config.clone(),
            status,
            diagnostics: self.diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldShape;
    use placeweave_kernel::Components;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        started: Vec<Stage>,
        finished: Vec<Stage>,
        cancel_at: Option<(Stage, CancellationToken)>,
    }

    impl GenerationObserver for Recorder {
        fn stage_started(&mut self, stage: Stage) {
            self.started.push(stage);
        }

        fn stage_finished(&mut self, stage: Stage, _elapsed: Duration) {
            self.finished.push(stage);
            if let Some((at, token)) = &self.cancel_at {
                if *at == stage {
                    token.cancel();
                }
            }
        }
    }

    fn small() -> WorldGenerationConfig {
        WorldGenerationConfig {
            seed: 11,
            shape: WorldShape::Bands { count: 3 },
            ..WorldGenerationConfig::default()
        }
    }

    #[test]
    fn invalid_config_fails_before_any_stage() {
        let cfg = WorldGenerationConfig {
            shape: WorldShape::Bands { count: 0 },
            ..WorldGenerationConfig::default()
        };
        let mut rec = Recorder::default();
        let err = generate_with(&cfg, &mut rec, &CancellationToken::new()).unwrap_err();
        assert_eq!(err, ConfigError::ZeroBands);
        assert!(rec.started.is_empty());
    }

    #[test]
    fn observer_sees_every_stage_in_order() {
        let mut rec = Recorder::default();
        let result = generate_with(&small(), &mut rec, &CancellationToken::new()).unwrap();
        assert!(result.is_complete());
        assert_eq!(rec.started, Stage::ORDER[..8].to_vec());
        assert_eq!(rec.finished, rec.started);
        assert_eq!(result.diagnostics.timings.len(), 8);
    }

    #[test]
    fn cancellation_stops_between_stages() {
        let token = CancellationToken::new();
        let mut rec = Recorder {
            cancel_at: Some((Stage::MapEcosystems, token.clone())),
            ..Recorder::default()
        };
        let result = generate_with(&small(), &mut rec, &token).unwrap();
        assert_eq!(
            result.status,
            GenerationStatus::Cancelled {
                after: Some(Stage::MapEcosystems)
            }
        );
        assert!(result.places.is_empty());
        assert!(!result.vertices.is_empty());
        assert_eq!(rec.finished.last(), Some(&Stage::MapEcosystems));
    }

    #[test]
    fn cancelled_before_start_returns_empty_world() {
        let token = CancellationToken::new();
        token.cancel();
        let result = generate_with(&small(), &mut NoopObserver, &token).unwrap();
        assert_eq!(result.status, GenerationStatus::Cancelled { after: None });
        assert!(result.vertices.is_empty());
    }

    #[test]
    fn vertex_count_matches_target() {
        let result = generate(&small()).unwrap();
        assert_eq!(result.vertices.len(), result.diagnostics.target_places);
        assert_eq!(result.places.len(), result.vertices.len());
    }

    #[test]
    fn river_delta_worlds_skip_layout() {
        let cfg = WorldGenerationConfig {
            generator: placeweave_fractal::FractalKind::RiverDelta(Default::default()),
            min_places: 200,
            ..small()
        };
        let result = generate(&cfg).unwrap();
        assert!(result.diagnostics.layout.is_empty());
        assert!(Components::of(&result.graph()).is_connected());
    }

    #[test]
    fn large_lichtenberg_bands_are_relaxed() {
        let cfg = WorldGenerationConfig {
            min_places: 180,
            ..small()
        };
        let result = generate(&cfg).unwrap();
        assert_eq!(result.diagnostics.layout.len(), 3);
        let layout = cfg.band_layout();
        for v in &result.vertices {
            assert!(v.x >= 0.0 && v.x <= layout.width());
            assert!(v.y >= 0.0 && v.y <= layout.height());
        }
    }

    #[test]
    fn mapping_tags_transitions() {
        let layout = BandLayout::new(2, 400.0, 400.0, 0.0, 1);
        let mut vertices = vec![
            Vertex {
                id: VertexId(0),
                x: 150.0,
                y: 10.0,
                ecosystem: placeweave_common::EcosystemId::Desert,
                depth: 0,
                parent: None,
            },
            Vertex {
                id: VertexId(1),
                x: 250.0,
                y: 10.0,
                ecosystem: placeweave_common::EcosystemId::Desert,
                depth: 1,
                parent: Some(VertexId(0)),
            },
        ];
        let mut connections = vec![Connection::growth(VertexId(0), VertexId(1), 100.0)];
        let n = map_ecosystems(&layout, &mut vertices, &mut connections);
        assert_eq!(n, 1);
        assert_eq!(
            connections[0].ecosystem_transition,
            Some((placeweave_common::EcosystemId::Steppe, placeweave_common::EcosystemId::Grassland))
        );
    }
}
