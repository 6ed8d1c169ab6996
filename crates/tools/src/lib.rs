//! Developer tooling: place graph inspection and invariant validation.
//!
//! # Invariants
//! - Inspection never mutates the graph.
//! - Validation reports every broken invariant instead of stopping at the first.

mod inspector;

pub use inspector::{EcosystemTally, GraphInspector, GraphSummary, Issue, ValidationReport};
