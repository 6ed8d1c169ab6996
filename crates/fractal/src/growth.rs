use glam::DVec2;
use placeweave_common::SeededRandom;
use std::collections::VecDeque;

use crate::{BranchPolicy, GrowthConstraints, GrowthParams};

/// One grown segment. Its end point becomes a vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub index: usize,
    pub parent: Option<usize>,
    pub start: DVec2,
    pub end: DVec2,
    pub depth: u32,
}

impl Segment {
    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }
}

/// Breadth-first growth engine shared by all generator variants.
pub fn grow<P: BranchPolicy + ?Sized>(
    policy: &P,
    start: DVec2,
    direction: f64,
    growth: &GrowthParams,
    rng: &mut SeededRandom,
    constraints: &GrowthConstraints,
) -> Vec<Segment> {
    let origin = constraints.clamp(start);
    let mut segments = vec![Segment {
        index: 0,
        parent: None,
        start: origin,
        end: origin,
        depth: 0,
    }];
    let budget = growth.max_vertices.max(1);
    let mut sparked = vec![false; constraints.sparks.len()];
    // (segment index, incoming heading)
    let mut frontier = VecDeque::from([(0usize, direction)]);

    while let Some((parent, heading)) = frontier.pop_front() {
        if segments.len() >= budget {
            break;
        }
        let depth = segments[parent].depth;
        if depth >= growth.max_depth {
            continue;
        }

        let mut headings = policy.child_headings(heading, direction, growth, rng);
        if spark_crossed(&segments[parent], &constraints.sparks, &mut sparked) && headings.len() < 2 {
            let forced = policy.spark_heading(heading, rng);
            headings.push(forced);
        }

        let from = segments[parent].end;
        for child_heading in headings {
            if segments.len() >= budget {
                break;
            }
            let jitter = policy.length_jitter();
            let scale = if jitter > 0.0 {
                rng.next_float(1.0 - jitter, 1.0 + jitter)
            } else {
                1.0
            };
            let length = growth.length_at(depth + 1) * scale;
            let step = DVec2::new(child_heading.cos(), child_heading.sin()) * length;
            let end = constraints.clamp(from + step);
            let index = segments.len();
            segments.push(Segment {
                index,
                parent: Some(parent),
                start: from,
                end,
                depth: depth + 1,
            });
            frontier.push_back((index, child_heading));
        }
    }

    tracing::trace!(segments = segments.len(), "fractal growth complete");
    segments
}

/// Marks and reports the first crossing of any not-yet-used spark line by
/// the segment ending at `segment.end`.
fn spark_crossed(segment: &Segment, sparks: &[f64], used: &mut [bool]) -> bool {
    let (lo, hi) = if segment.start.x <= segment.end.x {
        (segment.start.x, segment.end.x)
    } else {
        (segment.end.x, segment.start.x)
    };
    for (x, flag) in sparks.iter().zip(used.iter_mut()) {
        if !*flag && lo < *x && *x <= hi {
            *flag = true;
            return true;
        }
    }
    false
}
