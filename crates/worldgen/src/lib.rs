//! World generation pipeline: config, stage driver, and results.
//!
//! ```text
//! GenerateFractals -> MergeProjections -> MapEcosystems -> BuildPlaces
//!   -> AssignExits -> RepairConnectivity -> EnhanceConnectivity
//!   -> LayoutOptimize -> Done
//! ```
//!
//! # Invariants
//! - Same config, same result. All randomness comes from one
//!   [`placeweave_common::SeededRandom`] seeded from the config.
//! - Only [`WorldGenerationConfig::validate`] produces an error; anomalies
//!   inside stages end up in [`Diagnostics`] and the log.
//! - A completed world forms a single component unless repair ran out of
//!   rounds, which is logged as a warning.

mod config;
mod pipeline;
mod progress;
mod result;

pub use config::{
    AREA_PER_PLACE, BAND_WIDTH, ConfigError, GenerationTuning, WORLD_HEIGHT, WorldGenerationConfig,
    WorldShape,
};
pub use pipeline::{generate, generate_batch, generate_with, map_ecosystems};
pub use progress::{CancellationToken, GenerationObserver, NoopObserver, Stage};
pub use result::{
    BandLayoutRun, ConnectionStats, Diagnostics, GenerationStatus, StageTiming,
    WorldGenerationResult,
};
