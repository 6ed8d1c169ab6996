use glam::DVec2;
use placeweave_common::{Direction, PlaceId, VertexId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ecology::EcosystemProfile;

/// A one-way exit from a place. Exits exist in reciprocal pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exit {
    pub direction: Direction,
    pub label: String,
    pub to: PlaceId,
}

/// A navigable location in the generated world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: PlaceId,
    pub vertex: VertexId,
    pub name: String,
    pub description: String,
    pub ecology: EcosystemProfile,
    /// BTreeMap for deterministic iteration; one exit per direction.
    pub exits: BTreeMap<Direction, Exit>,
}

impl Place {
    pub fn degree(&self) -> usize {
        self.exits.len()
    }

    pub fn compass_degree(&self) -> usize {
        self.exits.keys().filter(|d| d.is_compass()).count()
    }

    pub fn exit_to(&self, target: PlaceId) -> Option<&Exit> {
        self.exits.values().find(|e| e.to == target)
    }
}

/// The authoritative place graph of one generation run.
///
/// Places live in an arena indexed by [`PlaceId`]; exits refer to places by
/// index only. Exactly one pipeline stage holds `&mut PlaceGraph` at a time.
#[derive(Debug, Clone, Default)]
pub struct PlaceGraph {
    places: Vec<Place>,
    positions: Vec<DVec2>,
}

impl PlaceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an exit-less place at `position`. Returns its id.
    pub fn add_place(
        &mut self,
        vertex: VertexId,
        position: DVec2,
        ecology: EcosystemProfile,
        name: String,
        description: String,
    ) -> PlaceId {
        let id = PlaceId(self.places.len() as u32);
        self.places.push(Place {
            id,
            vertex,
            name,
            description,
            ecology,
            exits: BTreeMap::new(),
        });
        self.positions.push(position);
        id
    }

    /// Rebuild a graph from exported places and their positions.
    ///
    /// Places are re-indexed by their position in `places`; a missing
    /// position defaults to the origin.
    pub fn from_parts(places: Vec<Place>, positions: &[DVec2]) -> Self {
        let positions = (0..places.len())
            .map(|i| positions.get(i).copied().unwrap_or(DVec2::ZERO))
            .collect();
        Self { places, positions }
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    pub fn places(&self) -> &[Place] {
        &self.places
    }

    pub fn ids(&self) -> impl Iterator<Item = PlaceId> + '_ {
        self.places.iter().map(|p| p.id)
    }

    pub fn get(&self, id: PlaceId) -> Option<&Place> {
        self.places.get(id.index())
    }

    pub fn position(&self, id: PlaceId) -> Option<DVec2> {
        self.positions.get(id.index()).copied()
    }

    /// Euclidean distance between two places; infinite if either is missing.
    pub fn distance(&self, a: PlaceId, b: PlaceId) -> f64 {
        match (self.position(a), self.position(b)) {
            (Some(pa), Some(pb)) => pa.distance(pb),
            _ => f64::INFINITY,
        }
    }

    pub fn degree(&self, id: PlaceId) -> usize {
        self.get(id).map_or(0, Place::degree)
    }

    pub fn compass_degree(&self, id: PlaceId) -> usize {
        self.get(id).map_or(0, Place::compass_degree)
    }

    /// Exit targets of `id`, in direction order.
    pub fn neighbors(&self, id: PlaceId) -> impl Iterator<Item = PlaceId> + '_ {
        self.get(id)
            .into_iter()
            .flat_map(|p| p.exits.values().map(|e| e.to))
    }

    pub fn is_linked(&self, a: PlaceId, b: PlaceId) -> bool {
        let forward = self.get(a).is_some_and(|p| p.exit_to(b).is_some());
        let backward = self.get(b).is_some_and(|p| p.exit_to(a).is_some());
        forward || backward
    }

    pub fn is_free(&self, id: PlaceId, direction: Direction) -> bool {
        self.get(id)
            .is_some_and(|p| !p.exits.contains_key(&direction))
    }

    /// First direction from `order` that is free at `a` with its opposite
    /// free at `b`.
    pub fn find_slot(
        &self,
        a: PlaceId,
        b: PlaceId,
        order: impl IntoIterator<Item = Direction>,
    ) -> Option<Direction> {
        order
            .into_iter()
            .find(|d| self.is_free(a, *d) && self.is_free(b, d.opposite()))
    }

    /// Compass direction pointing from `a` towards `b`.
    pub fn heading(&self, a: PlaceId, b: PlaceId) -> Direction {
        match (self.position(a), self.position(b)) {
            (Some(pa), Some(pb)) => Direction::from_delta(pb - pa),
            _ => Direction::North,
        }
    }

    /// Compass slot for `a -> b`, preferring the geometric heading and
    /// fanning out from it.
    pub fn find_compass_slot(&self, a: PlaceId, b: PlaceId) -> Option<Direction> {
        self.find_slot(a, b, self.heading(a, b).compass_fan())
    }

    /// Insert the reciprocal pair `a --dir--> b` / `b --opposite--> a`.
    ///
    /// Returns false without touching the graph if either slot is taken,
    /// the places are already linked, or `a == b`.
    pub fn link(&mut self, a: PlaceId, direction: Direction, b: PlaceId) -> bool {
        if a == b
            || direction == Direction::Unknown
            || !self.is_free(a, direction)
            || !self.is_free(b, direction.opposite())
            || self.is_linked(a, b)
        {
            return false;
        }
        let label_ab = self.exit_label(direction, b);
        let label_ba = self.exit_label(direction.opposite(), a);
        self.places[a.index()].exits.insert(
            direction,
            Exit {
                direction,
                label: label_ab,
                to: b,
            },
        );
        self.places[b.index()].exits.insert(
            direction.opposite(),
            Exit {
                direction: direction.opposite(),
                label: label_ba,
                to: a,
            },
        );
        tracing::trace!(%a, %b, %direction, "linked");
        true
    }

    /// Remove the exit of `a` in `direction` and its reciprocal on the far
    /// side. Returns the former target.
    pub fn unlink(&mut self, a: PlaceId, direction: Direction) -> Option<PlaceId> {
        let exit = self.places.get_mut(a.index())?.exits.remove(&direction)?;
        if let Some(far) = self.places.get_mut(exit.to.index()) {
            let back = far
                .exits
                .iter()
                .find(|(_, e)| e.to == a)
                .map(|(d, _)| *d);
            if let Some(d) = back {
                far.exits.remove(&d);
            }
        }
        tracing::trace!(%a, to = %exit.to, %direction, "unlinked");
        Some(exit.to)
    }

    /// Insert a single one-way exit without its reciprocal.
    ///
    /// Only for fixtures and reciprocity repair; pipeline stages use [`link`].
    ///
    /// [`link`]: PlaceGraph::link
    pub fn insert_one_way(&mut self, a: PlaceId, direction: Direction, b: PlaceId) -> bool {
        if !self.is_free(a, direction) || self.get(b).is_none() {
            return false;
        }
        let label = self.exit_label(direction, b);
        self.places[a.index()].exits.insert(
            direction,
            Exit {
                direction,
                label,
                to: b,
            },
        );
        true
    }

    /// Remove a single exit without touching the far side.
    pub fn remove_one_way(&mut self, a: PlaceId, direction: Direction) -> Option<Exit> {
        self.places.get_mut(a.index())?.exits.remove(&direction)
    }

    /// Exits `a --dir--> b` where `b` has no exit back to `a` (or `b` is missing).
    pub fn one_way_exits(&self) -> Vec<(PlaceId, Direction, PlaceId)> {
        let mut out = Vec::new();
        for place in &self.places {
            for (dir, exit) in &place.exits {
                let reciprocal = self
                    .get(exit.to)
                    .and_then(|far| far.exits.get(&dir.opposite()))
                    .is_some_and(|back| back.to == place.id);
                if !reciprocal {
                    out.push((place.id, *dir, exit.to));
                }
            }
        }
        out
    }

    /// Total number of exits across all places.
    pub fn exit_count(&self) -> usize {
        self.places.iter().map(Place::degree).sum()
    }

    /// Number of exits whose reciprocal is present.
    pub fn reciprocal_exit_count(&self) -> usize {
        self.exit_count() - self.one_way_exits().len()
    }

    /// Replace the stored position of a place (used after layout).
    pub fn set_position(&mut self, id: PlaceId, position: DVec2) {
        if let Some(p) = self.positions.get_mut(id.index()) {
            *p = position;
        }
    }

    /// Consume the graph, returning its places.
    pub fn into_places(self) -> Vec<Place> {
        self.places
    }

    /// Deterministic FNV-1a hash over places and exits, for comparing runs.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325;
        let mix = |h: &mut u64, bytes: &[u8]| {
            for &b in bytes {
                *h ^= u64::from(b);
                *h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        for (place, pos) in self.places.iter().zip(&self.positions) {
            mix(&mut h, &place.id.0.to_le_bytes());
            mix(&mut h, &pos.x.to_le_bytes());
            mix(&mut h, &pos.y.to_le_bytes());
            mix(&mut h, place.name.as_bytes());
            for exit in place.exits.values() {
                mix(&mut h, exit.direction.label().as_bytes());
                mix(&mut h, &exit.to.0.to_le_bytes());
            }
        }
        h
    }

    fn exit_label(&self, direction: Direction, to: PlaceId) -> String {
        match self.get(to) {
            Some(p) => format!("{direction} to {}", p.name),
            None => direction.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::line_graph;

    #[test]
    fn link_creates_reciprocal_pair() {
        let mut g = line_graph(2);
        assert!(g.link(PlaceId(0), Direction::East, PlaceId(1)));
        let a = g.get(PlaceId(0)).unwrap();
        let b = g.get(PlaceId(1)).unwrap();
        assert_eq!(a.exits[&Direction::East].to, PlaceId(1));
        assert_eq!(b.exits[&Direction::West].to, PlaceId(0));
        assert_eq!(a.exits[&Direction::East].label, "east to Place 1");
        assert!(g.one_way_exits().is_empty());
    }

    #[test]
    fn link_refuses_taken_slots_and_duplicates() {
        let mut g = line_graph(3);
        assert!(g.link(PlaceId(0), Direction::East, PlaceId(1)));
        assert!(!g.link(PlaceId(0), Direction::East, PlaceId(2)));
        assert!(!g.link(PlaceId(0), Direction::North, PlaceId(1)));
        assert!(!g.link(PlaceId(2), Direction::East, PlaceId(1)));
        assert!(!g.link(PlaceId(2), Direction::North, PlaceId(2)));
        assert_eq!(g.exit_count(), 2);
    }

    #[test]
    fn unlink_removes_both_sides() {
        let mut g = line_graph(2);
        g.link(PlaceId(0), Direction::East, PlaceId(1));
        assert_eq!(g.unlink(PlaceId(1), Direction::West), Some(PlaceId(0)));
        assert_eq!(g.exit_count(), 0);
        assert!(!g.is_linked(PlaceId(0), PlaceId(1)));
    }

    #[test]
    fn compass_slot_prefers_heading() {
        let g = line_graph(2);
        assert_eq!(
            g.find_compass_slot(PlaceId(0), PlaceId(1)),
            Some(Direction::East)
        );
    }

    #[test]
    fn compass_slot_fans_out_when_heading_taken() {
        let mut g = line_graph(3);
        g.link(PlaceId(0), Direction::East, PlaceId(2));
        assert_eq!(
            g.find_compass_slot(PlaceId(0), PlaceId(1)),
            Some(Direction::Southeast)
        );
    }

    #[test]
    fn one_way_exits_are_reported() {
        let mut g = line_graph(2);
        assert!(g.insert_one_way(PlaceId(0), Direction::East, PlaceId(1)));
        assert_eq!(
            g.one_way_exits(),
            vec![(PlaceId(0), Direction::East, PlaceId(1))]
        );
        assert_eq!(g.reciprocal_exit_count(), 0);
    }

    #[test]
    fn state_hash_tracks_exits() {
        let mut a = line_graph(3);
        let mut b = line_graph(3);
        assert_eq!(a.state_hash(), b.state_hash());
        a.link(PlaceId(0), Direction::East, PlaceId(1));
        assert_ne!(a.state_hash(), b.state_hash());
        b.link(PlaceId(0), Direction::East, PlaceId(1));
        assert_eq!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn missing_places_degrade_gracefully() {
        let mut g = line_graph(1);
        assert_eq!(g.degree(PlaceId(9)), 0);
        assert!(!g.link(PlaceId(0), Direction::East, PlaceId(9)));
        assert_eq!(g.unlink(PlaceId(9), Direction::East), None);
        assert!(g.distance(PlaceId(0), PlaceId(9)).is_infinite());
    }
}
