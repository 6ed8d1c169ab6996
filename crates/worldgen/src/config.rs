use placeweave_connect::{ExitConfig, RepairConfig};
use placeweave_fractal::{FractalKind, GrowthParams};
use placeweave_kernel::{BAND_ORDER, BandLayout};
use placeweave_spatial::LayoutConfig;
use serde::{Deserialize, Serialize};

/// Width of one band when the world is sized by band count.
pub const BAND_WIDTH: f64 = 200.0;
/// World height when the world is sized by band count.
pub const WORLD_HEIGHT: f64 = 400.0;
/// World area that yields one place per unit of density.
pub const AREA_PER_PLACE: f64 = 10_000.0;

/// Errors raised by [`WorldGenerationConfig::validate`] before any stage runs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("world needs at least one ecosystem band")]
    ZeroBands,
    #[error("{count} bands requested, at most {max} ecosystems are available")]
    TooManyBands { count: usize, max: usize },
    #[error("world dimensions must be positive and finite, got {width} x {height}")]
    InvalidDimensions { width: f64, height: f64 },
    #[error("{field} must lie in [0, 1], got {value}")]
    FractionOutOfRange { field: &'static str, value: f64 },
    #[error("{field} must be positive and finite, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must be at least 1")]
    ZeroCount { field: &'static str },
    #[error("min_places ({min}) exceeds max_places ({max})")]
    PlaceBounds { min: usize, max: usize },
}

/// How the world's extent is specified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorldShape {
    /// Explicit size; the band count follows from the width.
    Dimensions { width: f64, height: f64 },
    /// `count` bands of [`BAND_WIDTH`], [`WORLD_HEIGHT`] tall.
    Bands { count: usize },
}

impl Default for WorldShape {
    fn default() -> Self {
        WorldShape::Bands { count: 5 }
    }
}

impl WorldShape {
    pub fn band_count(&self) -> usize {
        match self {
            WorldShape::Bands { count } => *count,
            WorldShape::Dimensions { width, .. } => {
                ((width / BAND_WIDTH).round() as usize).clamp(1, BAND_ORDER.len())
            }
        }
    }

    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            WorldShape::Bands { count } => (*count as f64 * BAND_WIDTH, WORLD_HEIGHT),
            WorldShape::Dimensions { width, height } => (*width, *height),
        }
    }
}

/// Tuning constants of the merge and connection stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationTuning {
    /// Fractal projections grown per band, at least.
    pub projections_per_band: usize,
    /// Fractions of a band's width where growth is forced to branch.
    pub spark_positions: Vec<f64>,
    /// Merge distance for a reference-sized band at density 1.
    pub merge_base_distance: f64,
    pub merge_base_degree_cap: usize,
    pub exits: ExitConfig,
    pub repair: RepairConfig,
}

impl Default for GenerationTuning {
    fn default() -> Self {
        Self {
            projections_per_band: 2,
            spark_positions: vec![0.33, 0.66],
            merge_base_distance: 22.0,
            merge_base_degree_cap: 3,
            exits: ExitConfig::default(),
            repair: RepairConfig::default(),
        }
    }
}

/// Everything a generation run depends on. Same config, same world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldGenerationConfig {
    pub seed: u32,
    pub shape: WorldShape,
    /// Overrides `growth.branching_factor`.
    pub branching_factor: f64,
    /// Places per [`AREA_PER_PLACE`] units of area.
    pub place_density: f64,
    /// Share of the final band given to the secondary ecosystem.
    pub dithering_strength: f64,
    pub min_places: usize,
    pub max_places: usize,
    pub generator: FractalKind,
    pub growth: GrowthParams,
    pub tuning: GenerationTuning,
    pub layout: LayoutConfig,
}

impl Default for WorldGenerationConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            shape: WorldShape::default(),
            branching_factor: 0.45,
            place_density: 1.0,
            dithering_strength: 0.3,
            min_places: 30,
            max_places: 400,
            generator: FractalKind::default(),
            growth: GrowthParams::default(),
            tuning: GenerationTuning::default(),
            layout: LayoutConfig::default(),
        }
    }
}

fn fraction(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::FractionOutOfRange { field, value })
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

impl WorldGenerationConfig {
    /// Check every field a stage relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.shape {
            WorldShape::Bands { count: 0 } => return Err(ConfigError::ZeroBands),
            WorldShape::Bands { count } if count > BAND_ORDER.len() => {
                return Err(ConfigError::TooManyBands {
                    count,
                    max: BAND_ORDER.len(),
                });
            }
            WorldShape::Dimensions { width, height }
                if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) =>
            {
                return Err(ConfigError::InvalidDimensions { width, height });
            }
            _ => {}
        }
        fraction("branching_factor", self.branching_factor)?;
        fraction("dithering_strength", self.dithering_strength)?;
        positive("place_density", self.place_density)?;
        positive("growth.base_length", self.growth.base_length)?;
        positive("growth.length_decay", self.growth.length_decay)?;
        positive("tuning.merge_base_distance", self.tuning.merge_base_distance)?;
        for &spark in &self.tuning.spark_positions {
            fraction("tuning.spark_positions", spark)?;
        }
        if self.min_places == 0 {
            return Err(ConfigError::ZeroCount { field: "min_places" });
        }
        if self.min_places > self.max_places {
            return Err(ConfigError::PlaceBounds {
                min: self.min_places,
                max: self.max_places,
            });
        }
        if self.growth.max_vertices == 0 {
            return Err(ConfigError::ZeroCount {
                field: "growth.max_vertices",
            });
        }
        if self.tuning.projections_per_band == 0 {
            return Err(ConfigError::ZeroCount {
                field: "tuning.projections_per_band",
            });
        }
        Ok(())
    }

    /// Band layout of this world.
    pub fn band_layout(&self) -> BandLayout {
        let (width, height) = self.shape.dimensions();
        BandLayout::new(
            self.shape.band_count(),
            width,
            height,
            self.dithering_strength,
            self.seed,
        )
    }

    /// Number of places the run aims for: area times density, clamped to
    /// `[min_places, max_places]`.
    pub fn target_places(&self) -> usize {
        let (width, height) = self.shape.dimensions();
        let raw = (width * height / AREA_PER_PLACE * self.place_density).round();
        (raw.max(0.0) as usize).clamp(self.min_places, self.max_places.max(self.min_places))
    }

    /// Growth parameters with the top-level branching factor applied.
    pub fn effective_growth(&self) -> GrowthParams {
        GrowthParams {
            branching_factor: self.branching_factor,
            ..self.growth.clone()
        }
    }
}
