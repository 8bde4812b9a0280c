use std::fmt;

/// Axial directions, in the order neighbours are enumerated.
pub const DIRECTIONS: [(i32, i32); 6] = [(1, 0), (-1, 0), (0, 1), (0, -1), (1, -1), (-1, 1)];

/// Axial hex coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HexCoord {
    pub q: i32,
    pub r: i32,
}

impl HexCoord {
    /// The cell the first piece of every game is placed on.
    pub const ORIGIN: HexCoord = HexCoord { q: 0, r: 0 };

    pub const fn new(q: i32, r: i32) -> Self {
        HexCoord { q, r }
    }

    /// Step once in direction `(dq, dr)`.
    pub fn offset(self, (dq, dr): (i32, i32)) -> HexCoord {
        HexCoord::new(self.q + dq, self.r + dr)
    }

    /// The six adjacent cells.
    pub fn neighbors(self) -> [HexCoord; 6] {
        DIRECTIONS.map(|d| self.offset(d))
    }

    pub fn is_adjacent(self, other: HexCoord) -> bool {
        self.neighbors().contains(&other)
    }

    /// Cells adjacent to both `self` and `other` (two when they are neighbours).
    pub fn common_neighbors(self, other: HexCoord) -> Vec<HexCoord> {
        let theirs = other.neighbors();
        self.neighbors()
            .into_iter()
            .filter(|c| theirs.contains(c))
            .collect()
    }

    /// Euclidean length of the raw axial vector, used by the centre-control term.
    pub fn axial_length(self) -> f64 {
        ((self.q * self.q + self.r * self.r) as f64).sqrt()
    }
}

impl fmt::Display for HexCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.q, self.r)
    }
}
