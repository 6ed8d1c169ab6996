use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Arena index of a vertex produced by fractal growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VertexId(pub u32);

impl VertexId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Arena index of a place in the place graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceId(pub u32);

impl PlaceId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PlaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Terrain/ecology type of a region of the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EcosystemId {
    Steppe,
    Grassland,
    Forest,
    Mountains,
    Jungle,
    Tundra,
    Desert,
    Marsh,
}

impl EcosystemId {
    /// Every ecosystem, in declaration order.
    pub const ALL: [EcosystemId; 8] = [
        EcosystemId::Steppe,
        EcosystemId::Grassland,
        EcosystemId::Forest,
        EcosystemId::Mountains,
        EcosystemId::Jungle,
        EcosystemId::Tundra,
        EcosystemId::Desert,
        EcosystemId::Marsh,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EcosystemId::Steppe => "steppe",
            EcosystemId::Grassland => "grassland",
            EcosystemId::Forest => "forest",
            EcosystemId::Mountains => "mountains",
            EcosystemId::Jungle => "jungle",
            EcosystemId::Tundra => "tundra",
            EcosystemId::Desert => "desert",
            EcosystemId::Marsh => "marsh",
        }
    }
}

impl fmt::Display for EcosystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A point produced by fractal growth, later turned into a place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    pub x: f64,
    pub y: f64,
    pub ecosystem: EcosystemId,
    pub depth: u32,
    pub parent: Option<VertexId>,
}

impl Vertex {
    pub fn position(&self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }

    pub fn set_position(&mut self, p: DVec2) {
        self.x = p.x;
        self.y = p.y;
    }
}

/// An edge between two vertices.
///
/// Growth edges point parent -> child. Everything added afterwards is
/// `artificial` and is inserted as a reciprocal pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub from: VertexId,
    pub to: VertexId,
    pub length: f64,
    pub artificial: bool,
    pub ecosystem_transition: Option<(EcosystemId, EcosystemId)>,
}

impl Connection {
    /// A parent -> child edge from fractal growth.
    pub fn growth(from: VertexId, to: VertexId, length: f64) -> Self {
        Self {
            from,
            to,
            length,
            artificial: false,
            ecosystem_transition: None,
        }
    }

    /// An edge added after growth. Callers push it together with `reversed()`.
    pub fn artificial(from: VertexId, to: VertexId, length: f64) -> Self {
        Self {
            from,
            to,
            length,
            artificial: true,
            ecosystem_transition: None,
        }
    }

    pub fn reversed(&self) -> Self {
        Self {
            from: self.to,
            to: self.from,
            length: self.length,
            artificial: self.artificial,
            ecosystem_transition: self.ecosystem_transition.map(|(a, b)| (b, a)),
        }
    }

    pub fn is_transition(&self) -> bool {
        self.ecosystem_transition.is_some()
    }
}
