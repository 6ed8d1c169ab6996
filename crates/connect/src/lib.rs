//! Turn a merged vertex graph into a navigable place graph.
//!
//! Stages run in order on one `&mut PlaceGraph`:
//! [`build_places`] and [`assign_exits`], then [`repair_connectivity`],
//! then [`enhance_connectivity`].
//!
//! # Invariants
//! - Exits are only added through reciprocal links.
//! - Repair ends with one component unless its round budget runs out.
//! - Enhancement never removes an exit.

mod builder;
mod enhance;
mod repair;

pub use builder::{ExitConfig, ExitStats, assign_exits, build_places};
pub use enhance::{EnhanceStats, enhance_connectivity};
pub use repair::{
    BridgeKind, RepairConfig, RepairStats, bridge, normalize_reciprocity, repair_connectivity,
};
