use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Exit direction of a place.
///
/// The eight compass points are the only directions assigned during normal
/// graph building. Relative directions are reserved for connectivity repair
/// when every compass slot on a place is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    Northeast,
    East,
    Southeast,
    South,
    Southwest,
    West,
    Northwest,
    Up,
    Down,
    In,
    Out,
    Forward,
    Backward,
    Left,
    Right,
    Unknown,
}

impl Direction {
    /// Compass points, clockwise from north.
    pub const COMPASS: [Direction; 8] = [
        Direction::North,
        Direction::Northeast,
        Direction::East,
        Direction::Southeast,
        Direction::South,
        Direction::Southwest,
        Direction::West,
        Direction::Northwest,
    ];

    /// Relative directions usable as exits, in opposite pairs.
    pub const RELATIVE: [Direction; 8] = [
        Direction::Up,
        Direction::Down,
        Direction::In,
        Direction::Out,
        Direction::Forward,
        Direction::Backward,
        Direction::Left,
        Direction::Right,
    ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::Northeast => Direction::Southwest,
            Direction::East => Direction::West,
            Direction::Southeast => Direction::Northwest,
            Direction::South => Direction::North,
            Direction::Southwest => Direction::Northeast,
            Direction::West => Direction::East,
            Direction::Northwest => Direction::Southeast,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::In => Direction::Out,
            Direction::Out => Direction::In,
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Unknown => Direction::Unknown,
        }
    }

    pub fn is_compass(self) -> bool {
        self.compass_index().is_some()
    }

    fn compass_index(self) -> Option<usize> {
        Direction::COMPASS.iter().position(|d| *d == self)
    }

    /// Compass point closest to the heading of `delta`.
    ///
    /// World y grows southwards, so north is negative y.
    pub fn from_delta(delta: DVec2) -> Direction {
        if delta.length_squared() == 0.0 {
            return Direction::North;
        }
        // Bearing measured clockwise from north.
        let bearing = delta.x.atan2(-delta.y).to_degrees();
        let sector = ((bearing.rem_euclid(360.0) + 22.5) / 45.0).floor() as usize % 8;
        Direction::COMPASS[sector]
    }

    /// Compass points ordered by angular distance from `self`, starting with
    /// `self`, alternating clockwise and counter-clockwise.
    ///
    /// Relative directions yield the plain compass order.
    pub fn compass_fan(self) -> [Direction; 8] {
        let Some(start) = self.compass_index() else {
            return Direction::COMPASS;
        };
        let offsets = [0, 1, 7, 2, 6, 3, 5, 4];
        offsets.map(|o| Direction::COMPASS[(start + o) % 8])
    }

    pub fn label(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::Northeast => "northeast",
            Direction::East => "east",
            Direction::Southeast => "southeast",
            Direction::South => "south",
            Direction::Southwest => "southwest",
            Direction::West => "west",
            Direction::Northwest => "northwest",
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::In => "in",
            Direction::Out => "out",
            Direction::Forward => "forward",
            Direction::Backward => "backward",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
