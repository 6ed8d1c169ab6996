use glam::DVec2;
use placeweave_common::SeededRandom;
use serde::{Deserialize, Serialize};

use crate::{
    BranchPolicy, FractalGenerator, GrowthConstraints, GrowthParams, Segment, angle_delta, grow,
};

/// Electrical-discharge pattern: jagged leaders with irregular side
/// branches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lichtenberg {
    /// Maximum random turn per segment, radians.
    pub dispersion: f64,
    /// Fraction of the drift from the base direction removed per segment.
    pub bias: f64,
    pub length_jitter: f64,
    /// Probability scale of a second side branch relative to the first.
    pub second_branch_scale: f64,
}

impl Default for Lichtenberg {
    fn default() -> Self {
        Self {
            dispersion: 0.7,
            bias: 0.35,
            length_jitter: 0.3,
            second_branch_scale: 0.35,
        }
    }
}

impl Lichtenberg {
    fn perturb(&self, heading: f64, base: f64, rng: &mut SeededRandom) -> f64 {
        let turned = heading + rng.next_float(-self.dispersion, self.dispersion);
        turned + angle_delta(turned, base) * self.bias
    }
}

impl BranchPolicy for Lichtenberg {
    fn child_headings(
        &self,
        heading: f64,
        base: f64,
        growth: &GrowthParams,
        rng: &mut SeededRandom,
    ) -> Vec<f64> {
        let mut out = vec![self.perturb(heading, base, rng)];
        if rng.chance(growth.branching_factor) {
            out.push(self.perturb(heading, base, rng));
            if rng.chance(growth.branching_factor * self.second_branch_scale) {
                out.push(self.perturb(heading, base, rng));
            }
        }
        out
    }

    fn spark_heading(&self, heading: f64, rng: &mut SeededRandom) -> f64 {
        let side = if rng.chance(0.5) { 1.0 } else { -1.0 };
        heading + side * (self.dispersion.max(0.3))
    }

    fn length_jitter(&self) -> f64 {
        self.length_jitter
    }
}

impl FractalGenerator for Lichtenberg {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> GrowthConstraints {
        GrowthConstraints::new(DVec2::ZERO, DVec2::new(400.0, 400.0))
    }

    fn straight() -> Lichtenberg {
        Lichtenberg {
            dispersion: 0.0,
            length_jitter: 0.0,
            ..Lichtenberg::default()
        }
    }

    #[test]
    fn depth_zero_yields_only_the_origin() {
        let growth = GrowthParams {
            max_depth: 0,
            ..GrowthParams::default()
        };
        let segs = Lichtenberg::default().generate(
            DVec2::new(5.0, 5.0),
            0.0,
            &growth,
            &mut SeededRandom::new(1),
            &bounds(),
        );
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].parent, None);
        assert_eq!(segs[0].depth, 0);
        assert_eq!(segs[0].length(), 0.0);
    }

    #[test]
    fn same_seed_same_tree() {
        let growth = GrowthParams::default();
        let a = Lichtenberg::default().generate(
            DVec2::new(0.0, 200.0),
            0.0,
            &growth,
            &mut SeededRandom::new(99),
            &bounds(),
        );
        let b = Lichtenberg::default().generate(
            DVec2::new(0.0, 200.0),
            0.0,
            &growth,
            &mut SeededRandom::new(99),
            &bounds(),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn tree_structure_is_well_formed() {
        let growth = GrowthParams {
            branching_factor: 0.8,
            ..GrowthParams::default()
        };
        let segs = Lichtenberg::default().generate(
            DVec2::new(0.0, 200.0),
            0.0,
            &growth,
            &mut SeededRandom::new(3),
            &bounds(),
        );
        assert!(segs.len() > 1);
        assert!(segs.len() <= growth.max_vertices);
        for seg in &segs[1..] {
            let parent = &segs[seg.parent.unwrap()];
            assert!(parent.index < seg.index);
            assert_eq!(seg.depth, parent.depth + 1);
            assert_eq!(seg.start, parent.end);
            assert!(seg.end.x >= 0.0 && seg.end.x <= 400.0);
            assert!(seg.end.y >= 0.0 && seg.end.y <= 400.0);
        }
    }

    #[test]
    fn budget_caps_segment_count() {
        let growth = GrowthParams {
            branching_factor: 1.0,
            max_vertices: 17,
            ..GrowthParams::default()
        };
        let segs = Lichtenberg::default().generate(
            DVec2::new(0.0, 200.0),
            0.0,
            &growth,
            &mut SeededRandom::new(8),
            &bounds(),
        );
        assert_eq!(segs.len(), 17);
    }

    #[test]
    fn zero_branching_grows_a_single_chain() {
        let growth = GrowthParams {
            branching_factor: 0.0,
            max_depth: 6,
            ..GrowthParams::default()
        };
        let segs = straight().generate(
            DVec2::new(0.0, 200.0),
            0.0,
            &growth,
            &mut SeededRandom::new(4),
            &bounds(),
        );
        assert_eq!(segs.len(), 7);
        assert!(segs.windows(2).all(|w| w[1].end.x > w[0].end.x));
    }

    #[test]
    fn sparking_forces_a_branch_at_the_crossing() {
        let growth = GrowthParams {
            branching_factor: 0.0,
            max_depth: 6,
            ..GrowthParams::default()
        };
        let constraints = bounds().with_sparks(vec![100.0]);
        let segs = straight().generate(
            DVec2::new(0.0, 200.0),
            0.0,
            &growth,
            &mut SeededRandom::new(4),
            &constraints,
        );
        assert!(segs.len() > 7);
        let mut children = vec![0; segs.len()];
        for seg in &segs[1..] {
            children[seg.parent.unwrap()] += 1;
        }
        let forked = children.iter().filter(|c| **c >= 2).count();
        assert!(forked >= 1);
    }
}
