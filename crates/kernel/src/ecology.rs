//! Ecosystem profiles and the band layout that maps positions to ecosystems.

use placeweave_common::EcosystemId;
use serde::{Deserialize, Serialize};

/// Per-ecosystem tuning read by the enhancement stage and by consumers of
/// the finished graph.
///
/// Open terrain is more traversable and receives denser enhancement than
/// rugged or waterlogged terrain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EcosystemProfile {
    pub ecosystem: EcosystemId,
    pub target_avg_degree: f64,
    /// Maximum graph-hop distance for enhancement edges.
    pub max_hop_radius: u32,
    pub max_new_exits_per_place: u32,
    /// How many candidates may come from adjacent ecosystems.
    pub adjacent_sample_cap: u32,
}

impl EcosystemProfile {
    pub fn for_ecosystem(ecosystem: EcosystemId) -> Self {
        let (target_avg_degree, max_hop_radius, max_new_exits_per_place, adjacent_sample_cap) =
            match ecosystem {
                EcosystemId::Steppe => (3.2, 3, 2, 2),
                EcosystemId::Grassland => (3.0, 3, 2, 2),
                EcosystemId::Desert => (2.8, 3, 2, 1),
                EcosystemId::Tundra => (2.8, 3, 2, 1),
                EcosystemId::Forest => (2.6, 2, 2, 1),
                EcosystemId::Jungle => (2.4, 2, 1, 1),
                EcosystemId::Mountains => (2.2, 2, 1, 1),
                EcosystemId::Marsh => (2.0, 2, 1, 1),
            };
        Self {
            ecosystem,
            target_avg_degree,
            max_hop_radius,
            max_new_exits_per_place,
            adjacent_sample_cap,
        }
    }

    /// Degree a single place should reach during enhancement.
    pub fn target_degree(&self) -> usize {
        self.target_avg_degree.ceil() as usize
    }
}

/// West-to-east order in which bands are assigned ecosystems.
pub const BAND_ORDER: [EcosystemId; 7] = [
    EcosystemId::Steppe,
    EcosystemId::Grassland,
    EcosystemId::Forest,
    EcosystemId::Mountains,
    EcosystemId::Jungle,
    EcosystemId::Tundra,
    EcosystemId::Desert,
];

/// Ecosystem dithered into the final band.
pub const SECONDARY_ECOSYSTEM: EcosystemId = EcosystemId::Marsh;

/// Partition of the world into contiguous vertical bands along x.
#[derive(Debug, Clone, PartialEq)]
pub struct BandLayout {
    bands: Vec<EcosystemId>,
    width: f64,
    height: f64,
    dithering_strength: f64,
    seed: u32,
}

impl BandLayout {
    /// Build a layout with `band_count` bands taken from [`BAND_ORDER`].
    ///
    /// `band_count` is clamped to `1..=BAND_ORDER.len()`; callers validate
    /// it beforehand.
    pub fn new(band_count: usize, width: f64, height: f64, dithering_strength: f64, seed: u32) -> Self {
        let count = band_count.clamp(1, BAND_ORDER.len());
        Self {
            bands: BAND_ORDER[..count].to_vec(),
            width,
            height,
            dithering_strength: dithering_strength.clamp(0.0, 1.0),
            seed,
        }
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn band_width(&self) -> f64 {
        self.width / self.bands.len() as f64
    }

    /// Base ecosystem of band `index`.
    pub fn band_ecosystem(&self, index: usize) -> Option<EcosystemId> {
        self.bands.get(index).copied()
    }

    /// `[x_min, x_max)` of band `index`.
    pub fn band_span(&self, index: usize) -> (f64, f64) {
        let w = self.band_width();
        (index as f64 * w, (index + 1) as f64 * w)
    }

    /// Band containing `x`, clamped into the world.
    pub fn band_index(&self, x: f64) -> usize {
        let last = self.bands.len() - 1;
        if !x.is_finite() || x <= 0.0 {
            return 0;
        }
        ((x / self.band_width()).floor() as usize).min(last)
    }

    /// Ecosystem at `(x, y)`.
    ///
    /// Pure: depends only on the position and the layout. In the final band
    /// a positional hash substitutes [`SECONDARY_ECOSYSTEM`] for roughly
    /// `dithering_strength` of all positions.
    pub fn determine_ecosystem(&self, x: f64, y: f64) -> EcosystemId {
        let index = self.band_index(x);
        let base = self.bands[index];
        if index + 1 == self.bands.len() && self.dithering_strength > 0.0 {
            let threshold = (self.dithering_strength * 100.0).round() as u32;
            if position_hash(x, y, self.seed) % 100 < threshold {
                return SECONDARY_ECOSYSTEM;
            }
        }
        base
    }

    /// Band-neighbor ecosystems of `ecosystem`.
    ///
    /// Bands neighbor the bands directly west and east of them; the
    /// secondary ecosystem neighbors the final band it is dithered into.
    pub fn adjacent(&self, ecosystem: EcosystemId) -> Vec<EcosystemId> {
        let mut out = Vec::new();
        if let Some(i) = self.bands.iter().position(|e| *e == ecosystem) {
            if i > 0 {
                out.push(self.bands[i - 1]);
            }
            if let Some(next) = self.bands.get(i + 1) {
                out.push(*next);
            }
        }
        let dithered = self.dithering_strength > 0.0;
        let last = self.bands[self.bands.len() - 1];
        if dithered && ecosystem == last && ecosystem != SECONDARY_ECOSYSTEM {
            out.push(SECONDARY_ECOSYSTEM);
        }
        if dithered && ecosystem == SECONDARY_ECOSYSTEM && last != SECONDARY_ECOSYSTEM {
            out.push(last);
        }
        out
    }

    pub fn are_adjacent(&self, a: EcosystemId, b: EcosystemId) -> bool {
        self.adjacent(a).contains(&b)
    }
}

/// Stable 32-bit hash of a quantized position and seed.
fn position_hash(x: f64, y: f64, seed: u32) -> u32 {
    let qx = (x * 4.0).floor() as i64 as u32;
    let qy = (y * 4.0).floor() as i64 as u32;
    let mut h = seed ^ 0x9e37_79b9;
    for word in [qx, qy] {
        h ^= word;
        h = h.wrapping_mul(0x85eb_ca6b);
        h ^= h >> 13;
        h = h.wrapping_mul(0xc2b2_ae35);
        h ^= h >> 16;
    }
    h
}
