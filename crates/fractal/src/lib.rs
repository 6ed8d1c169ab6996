//! Fractal branch growth: seeded trees of segments that become the raw
//! vertices of a world.
//!
//! # Invariants
//! - Every random draw comes from the supplied [`SeededRandom`].
//! - Segment 0 is the origin (zero length, no parent); every other segment
//!   has exactly one parent with `depth = parent.depth + 1`.
//! - Growth is breadth-first, so a vertex budget trims the deepest layer
//!   first and never leaves a gap in the tree.

mod delta;
mod growth;
mod lichtenberg;

use glam::DVec2;
use placeweave_common::SeededRandom;
use serde::{Deserialize, Serialize};

pub use delta::RiverDelta;
pub use growth::{Segment, grow};
pub use lichtenberg::Lichtenberg;

/// Parameters shared by every generator variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthParams {
    pub max_depth: u32,
    /// Length of a depth-1 segment.
    pub base_length: f64,
    /// Multiplier applied to the segment length per depth level.
    pub length_decay: f64,
    /// Expected extra children per node, in `[0, 1]`.
    pub branching_factor: f64,
    /// Hard cap on segments produced by one call, origin included.
    pub max_vertices: usize,
}

impl Default for GrowthParams {
    fn default() -> Self {
        Self {
            max_depth: 12,
            base_length: 40.0,
            length_decay: 0.92,
            branching_factor: 0.45,
            max_vertices: 256,
        }
    }
}

impl GrowthParams {
    pub fn length_at(&self, depth: u32) -> f64 {
        self.base_length * self.length_decay.powi(depth.saturating_sub(1) as i32)
    }
}

/// Spatial limits for one growth call.
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthConstraints {
    pub min: DVec2,
    pub max: DVec2,
    /// Absolute x positions where crossing growth must branch.
    pub sparks: Vec<f64>,
}

impl GrowthConstraints {
    pub fn new(min: DVec2, max: DVec2) -> Self {
        Self {
            min,
            max,
            sparks: Vec::new(),
        }
    }

    pub fn with_sparks(mut self, sparks: Vec<f64>) -> Self {
        self.sparks = sparks;
        self
    }

    pub fn clamp(&self, p: DVec2) -> DVec2 {
        p.clamp(self.min, self.max)
    }
}

/// A fractal growth algorithm.
pub trait FractalGenerator {
    /// Grow a tree from `start`, heading `direction` (radians, 0 = east,
    /// y grows southwards).
    fn generate(
        &self,
        start: DVec2,
        direction: f64,
        growth: &GrowthParams,
        rng: &mut SeededRandom,
        constraints: &GrowthConstraints,
    ) -> Vec<Segment>;
}

/// Per-node branching policy plugged into the shared growth engine.
pub trait BranchPolicy {
    /// Headings of the children of a node whose incoming heading is
    /// `heading`. `base` is the overall growth direction.
    fn child_headings(
        &self,
        heading: f64,
        base: f64,
        growth: &GrowthParams,
        rng: &mut SeededRandom,
    ) -> Vec<f64>;

    /// Heading of an extra branch forced by sparking.
    fn spark_heading(&self, heading: f64, rng: &mut SeededRandom) -> f64;

    /// Relative length jitter in `[0, 1)`.
    fn length_jitter(&self) -> f64;
}

/// Generator variants, each carrying its own configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FractalKind {
    Lichtenberg(Lichtenberg),
    RiverDelta(RiverDelta),
}

impl Default for FractalKind {
    fn default() -> Self {
        FractalKind::Lichtenberg(Lichtenberg::default())
    }
}

impl FractalKind {
    pub fn name(&self) -> &'static str {
        match self {
            FractalKind::Lichtenberg(_) => "lichtenberg",
            FractalKind::RiverDelta(_) => "river_delta",
        }
    }

    pub fn is_lichtenberg(&self) -> bool {
        matches!(self, FractalKind::Lichtenberg(_))
    }
}

impl FractalGenerator for FractalKind {
    fn generate(
        &self,
        start: DVec2,
        direction: f64,
        growth: &GrowthParams,
        rng: &mut SeededRandom,
        constraints: &GrowthConstraints,
    ) -> Vec<Segment> {
        match self {
            FractalKind::Lichtenberg(g) => g.generate(start, direction, growth, rng, constraints),
            FractalKind::RiverDelta(g) => g.generate(start, direction, growth, rng, constraints),
        }
    }
}

/// Signed smallest difference `to - from`, in `(-PI, PI]`.
pub(crate) fn angle_delta(from: f64, to: f64) -> f64 {
    use std::f64::consts::{PI, TAU};
    let d = (to - from).rem_euclid(TAU);
    if d > PI { d - TAU } else { d }
}
