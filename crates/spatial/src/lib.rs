//! Spatial stages: uniform-grid collision detection for merging fractal
//! projections, band seam stitching, and the optional force-directed layout.
//!
//! # Invariants
//! - Every edge added here is a reciprocal pair of artificial connections.
//! - Merging never pushes a vertex past the degree cap; seam stitches are
//!   the only edges exempt from it.
//! - Grid cells iterate in coordinate order, so results depend only on input.

mod grid;
mod layout;
mod merge;

pub use grid::{CellCoord, SpatialGrid};
pub use layout::{LayoutConfig, LayoutReport, apply_layout};
pub use merge::{
    MergeParams, MergeStats, MergedGraph, Projection, REFERENCE_BAND_AREA, merge_projections,
    stitch_bands,
};
