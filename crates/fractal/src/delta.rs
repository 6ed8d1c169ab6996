use glam::DVec2;
use placeweave_common::SeededRandom;
use serde::{Deserialize, Serialize};

use crate::{
    BranchPolicy, FractalGenerator, GrowthConstraints, GrowthParams, Segment, angle_delta, grow,
};

/// River-delta pattern: a gently meandering trunk that bifurcates into
/// symmetric distributaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiverDelta {
    /// Maximum meander per segment, radians.
    pub meander: f64,
    /// Half-angle range of a bifurcation, radians.
    pub split_min: f64,
    pub split_max: f64,
    pub bias: f64,
    pub length_jitter: f64,
}

impl Default for RiverDelta {
    fn default() -> Self {
        Self {
            meander: 0.25,
            split_min: 0.3,
            split_max: 0.55,
            bias: 0.3,
            length_jitter: 0.15,
        }
    }
}

impl RiverDelta {
    fn settle(&self, heading: f64, base: f64) -> f64 {
        heading + angle_delta(heading, base) * self.bias
    }
}

impl BranchPolicy for RiverDelta {
    fn child_headings(
        &self,
        heading: f64,
        base: f64,
        growth: &GrowthParams,
        rng: &mut SeededRandom,
    ) -> Vec<f64> {
        if rng.chance(growth.branching_factor) {
            let half = rng.next_float(self.split_min, self.split_max);
            vec![
                self.settle(heading - half, base),
                self.settle(heading + half, base),
            ]
        } else {
            let turn = rng.next_float(-self.meander, self.meander);
            vec![self.settle(heading + turn, base)]
        }
    }

    fn spark_heading(&self, heading: f64, rng: &mut SeededRandom) -> f64 {
        heading + rng.next_float(self.split_min, self.split_max)
    }

    fn length_jitter(&self) -> f64 {
        self.length_jitter
    }
}

impl FractalGenerator for RiverDelta {
    fn generate(
        &self,
        start: DVec2,
        direction: f64,
        growth: &GrowthParams,
        rng: &mut SeededRandom,
        constraints: &GrowthConstraints,
    ) -> Vec<Segment> {
        grow(self, start, direction, growth, rng, constraints)
    }
}
