//! World kernel: the authoritative place graph of a generation run, its
//! component analysis, and the ecosystem layout places are tagged with.
//!
//! # Invariants
//! - Exits are created and removed in reciprocal pairs through [`PlaceGraph::link`]
//!   and [`PlaceGraph::unlink`].
//! - A place has at most one exit per [`placeweave_common::Direction`].
//! - Iteration order is index order everywhere, so identical inputs produce
//!   identical graphs.

pub mod components;
pub mod ecology;
#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;
pub mod graph;

pub use components::{Components, bfs_within, reachable_without_edge};
pub use ecology::{BAND_ORDER, BandLayout, EcosystemProfile, SECONDARY_ECOSYSTEM};
pub use graph::{Exit, Place, PlaceGraph};
