use glam::DVec2;
use std::collections::BTreeMap;

/// A 2D cell coordinate in the spatial grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    pub x: i32,
    pub y: i32,
}

impl CellCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Neighbor cells that come "after" this one, so every unordered pair
    /// of adjacent cells is visited exactly once.
    pub fn forward_neighbors(self) -> [CellCoord; 4] {
        [
            CellCoord::new(self.x + 1, self.y - 1),
            CellCoord::new(self.x + 1, self.y),
            CellCoord::new(self.x + 1, self.y + 1),
            CellCoord::new(self.x, self.y + 1),
        ]
    }
}

/// Uniform spatial hash over point indices.
///
/// Cells are kept in a BTreeMap and each cell lists its points in insertion
/// order, so iteration is deterministic.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f64,
    cells: BTreeMap<CellCoord, Vec<usize>>,
}

impl SpatialGrid {
    /// Create an empty grid. Non-positive or non-finite sizes fall back to 1.
    pub fn new(cell_size: f64) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            1.0
        };
        Self {
            cell_size,
            cells: BTreeMap::new(),
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Rebuild the grid from point positions; point `i` is stored as `i`.
    pub fn rebuild(&mut self, positions: &[DVec2]) {
        self.cells.clear();
        for (i, p) in positions.iter().enumerate() {
            let coord = self.position_to_cell(*p);
            self.cells.entry(coord).or_default().push(i);
        }
    }

    pub fn position_to_cell(&self, pos: DVec2) -> CellCoord {
        CellCoord {
            x: (pos.x / self.cell_size).floor() as i32,
            y: (pos.y / self.cell_size).floor() as i32,
        }
    }

    pub fn points_in_cell(&self, coord: CellCoord) -> &[usize] {
        self.cells.get(&coord).map_or(&[], Vec::as_slice)
    }

    /// Occupied cells in ascending coordinate order.
    pub fn cells(&self) -> impl Iterator<Item = (CellCoord, &[usize])> {
        self.cells.iter().map(|(c, v)| (*c, v.as_slice()))
    }

    /// Every unordered pair of points in the same or adjacent cells,
    /// visited once each: same-cell pairs `i < j` first, then each forward
    /// neighbor cell.
    pub fn candidate_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (coord, points) in self.cells() {
            for (k, &a) in points.iter().enumerate() {
                for &b in &points[k + 1..] {
                    pairs.push((a, b));
                }
            }
            for neighbor in coord.forward_neighbors() {
                for &a in points {
                    for &b in self.points_in_cell(neighbor) {
                        pairs.push((a, b));
                    }
                }
            }
        }
        pairs
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_to_cell_basic() {
        let grid = SpatialGrid::new(16.0);
        assert_eq!(grid.position_to_cell(DVec2::new(10.0, 10.0)), CellCoord::new(0, 0));
        assert_eq!(grid.position_to_cell(DVec2::new(20.0, -5.0)), CellCoord::new(1, -1));
    }

    #[test]
    fn rebuild_from_positions() {
        let mut grid = SpatialGrid::new(16.0);
        grid.rebuild(&[DVec2::ZERO, DVec2::new(20.0, 0.0), DVec2::new(1.0, 1.0)]);
        assert_eq!(grid.cell_count(), 2);
        assert_eq!(grid.points_in_cell(CellCoord::new(0, 0)), &[0, 2]);
    }

    #[test]
    fn candidate_pairs_cover_adjacent_cells_once() {
        let mut grid = SpatialGrid::new(10.0);
        // (0,0), (0,0), (1,0), (0,1), (1,-1), (5,5)
        grid.rebuild(&[
            DVec2::new(1.0, 1.0),
            DVec2::new(2.0, 2.0),
            DVec2::new(12.0, 1.0),
            DVec2::new(1.0, 12.0),
            DVec2::new(12.0, -3.0),
            DVec2::new(55.0, 55.0),
        ]);
        let mut pairs: Vec<(usize, usize)> = grid
            .candidate_pairs()
            .into_iter()
            .map(|(a, b)| (a.min(b), a.max(b)))
            .collect();
        let total = pairs.len();
        pairs.sort();
        pairs.dedup();
        assert_eq!(pairs.len(), total, "no pair visited twice");
        assert!(pairs.contains(&(0, 1)));
        assert!(pairs.contains(&(0, 2)));
        assert!(pairs.contains(&(2, 3)));
        assert!(!pairs.contains(&(3, 4)));
        assert!(pairs.iter().all(|&(a, b)| a != 5 && b != 5));
    }

    #[test]
    fn invalid_cell_size_falls_back() {
        assert_eq!(SpatialGrid::new(0.0).cell_size(), 1.0);
        assert_eq!(SpatialGrid::new(f64::NAN).cell_size(), 1.0);
    }

    #[test]
    fn empty_cell_returns_empty_slice() {
        let grid = SpatialGrid::new(16.0);
        assert!(grid.points_in_cell(CellCoord::new(99, 99)).is_empty());
    }
}
