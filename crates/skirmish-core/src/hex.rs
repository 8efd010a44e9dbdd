//! Hex grid geometry using offset coordinates (col, row).
//!
//! The battlefield is stored as a rectangular array where every odd column is
//! visually shifted by half a tile. Neighbor offsets therefore depend on the
//! parity of the column:
//!
//! | Direction | even column | odd column |
//! |-----------|-------------|------------|
//! | North     | (0, +1)     | (0, +1)    |
//! | NorthEast | (+1, 0)     | (+1, +1)   |
//! | SouthEast | (+1, -1)    | (+1, 0)    |
//! | South     | (0, -1)     | (0, -1)    |
//! | SouthWest | (-1, -1)    | (-1, 0)    |
//! | NorthWest | (-1, 0)     | (-1, +1)   |

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the six directions leaving a hex tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    NorthEast,
    SouthEast,
    South,
    SouthWest,
    NorthWest,
}

impl Direction {
    /// All directions in clockwise order starting from North
    pub const ALL: [Direction; 6] = [
        Direction::North,
        Direction::NorthEast,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::NorthWest,
    ];

    /// Column/row delta for this direction from a column of the given parity
    pub const fn offset(self, odd_column: bool) -> (i32, i32) {
        match (self, odd_column) {
            (Direction::North, _) => (0, 1),
            (Direction::NorthEast, false) => (1, 0),
            (Direction::NorthEast, true) => (1, 1),
            (Direction::SouthEast, false) => (1, -1),
            (Direction::SouthEast, true) => (1, 0),
            (Direction::South, _) => (0, -1),
            (Direction::SouthWest, false) => (-1, -1),
            (Direction::SouthWest, true) => (-1, 0),
            (Direction::NorthWest, false) => (-1, 0),
            (Direction::NorthWest, true) => (-1, 1),
        }
    }

    /// The direction pointing back the way we came
    pub const fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::NorthEast => Direction::SouthWest,
            Direction::SouthEast => Direction::NorthWest,
            Direction::South => Direction::North,
            Direction::SouthWest => Direction::NorthEast,
            Direction::NorthWest => Direction::SouthEast,
        }
    }
}

/// Position of a tile in the rectangular tile array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct GridPosition {
    /// Column (x)
    pub col: i32,
    /// Row (y)
    pub row: i32,
}

impl GridPosition {
    /// Create a new grid position
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Whether this position sits in an odd (shifted) column
    pub const fn is_odd_column(&self) -> bool {
        self.col.rem_euclid(2) == 1
    }

    /// Get the neighbor in a specific direction, ignoring board bounds
    pub fn neighbor(&self, direction: Direction) -> GridPosition {
        let (dc, dr) = direction.offset(self.is_odd_column());
        GridPosition::new(self.col + dc, self.row + dr)
    }

    /// The six neighboring positions in clockwise order starting from North
    pub fn neighbors(&self) -> [GridPosition; 6] {
        Direction::ALL.map(|dir| self.neighbor(dir))
    }

    /// Neighbors that fall inside a `width` x `height` board
    pub fn neighbors_within(&self, width: i32, height: i32) -> Vec<GridPosition> {
        self.neighbors()
            .into_iter()
            .filter(|pos| pos.is_within(width, height))
            .collect()
    }

    /// Whether this position lies on a `width` x `height` board
    pub const fn is_within(&self, width: i32, height: i32) -> bool {
        self.col >= 0 && self.row >= 0 && self.col < width && self.row < height
    }

    /// Sum of the absolute column and row deltas.
    ///
    /// This is a cheap approximation used for every range check in the engine.
    /// It is not the true hex step count: diagonal neighbors such as
    /// `(0, 0)` and `(1, -1)` are one step apart on the grid but report 2 here.
    pub fn distance_to(&self, other: &GridPosition) -> u32 {
        self.col.abs_diff(other.col) + self.row.abs_diff(other.row)
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

impl From<(i32, i32)> for GridPosition {
    fn from((col, row): (i32, i32)) -> Self {
        GridPosition::new(col, row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_even_column_neighbors() {
        let center = GridPosition::new(2, 2);
        let neighbors: HashSet<_> = center.neighbors().into_iter().collect();

        let expected: HashSet<_> = [(2, 3), (3, 2), (3, 1), (2, 1), (1, 1), (1, 2)]
            .into_iter()
            .map(GridPosition::from)
            .collect();
        assert_eq!(neighbors, expected);
    }

    #[test]
    fn test_odd_column_neighbors() {
        let center = GridPosition::new(3, 2);
        let neighbors: HashSet<_> = center.neighbors().into_iter().collect();

        let expected: HashSet<_> = [(3, 3), (4, 3), (4, 2), (3, 1), (2, 2), (2, 3)]
            .into_iter()
            .map(GridPosition::from)
            .collect();
        assert_eq!(neighbors, expected);
    }

    #[test]
    fn test_neighbors_within_clips_to_board() {
        let corner = GridPosition::new(0, 0);
        let neighbors = corner.neighbors_within(4, 4);

        // Only North (0,1) and NorthEast (1,0) survive at the origin
        assert_eq!(neighbors.len(), 2);
        assert!(neighbors.contains(&GridPosition::new(0, 1)));
        assert!(neighbors.contains(&GridPosition::new(1, 0)));
    }

    #[test]
    fn test_adjacency_is_symmetric() {
        let (width, height) = (7, 6);
        for col in 0..width {
            for row in 0..height {
                let p = GridPosition::new(col, row);
                for q in p.neighbors_within(width, height) {
                    assert!(
                        q.neighbors_within(width, height).contains(&p),
                        "{} lists {} as neighbor but not the reverse",
                        p,
                        q
                    );
                }
            }
        }
    }

    #[test]
    fn test_opposite_direction_returns_home() {
        for col in -3..3 {
            for row in -3..3 {
                let p = GridPosition::new(col, row);
                for dir in Direction::ALL {
                    assert_eq!(p.neighbor(dir).neighbor(dir.opposite()), p);
                }
            }
        }
    }

    #[test]
    fn test_manhattan_distance() {
        let a = GridPosition::new(0, 0);
        assert_eq!(a.distance_to(&GridPosition::new(0, 1)), 1);
        assert_eq!(a.distance_to(&GridPosition::new(3, -2)), 5);
        assert_eq!(a.distance_to(&a), 0);
    }

    #[test]
    fn test_distance_overestimates_diagonal_neighbors() {
        // Known limitation: (1, -1) is the SouthEast neighbor of (0, 0) but the
        // Manhattan approximation puts it two steps away.
        let a = GridPosition::new(0, 0);
        let b = GridPosition::new(1, -1);
        assert!(a.neighbors().contains(&b));
        assert_eq!(a.distance_to(&b), 2);
    }
}
