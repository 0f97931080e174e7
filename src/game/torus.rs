//! Wraparound grid geometry.
//!
//! Every distance in the engine is a *squared* distance. Radii from the game
//! options (`viewradius2`, `attackradius2`, `spawnradius2`) are compared
//! against squared distances directly and are never square-rooted.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A cell on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Loc {
    /// Row (0 at the top).
    pub row: usize,
    /// Column (0 at the left).
    pub col: usize,
}

impl Loc {
    /// Create a new location.
    #[must_use]
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// A relative displacement, always applied modulo the grid dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Offset {
    /// Row displacement.
    pub d_row: i32,
    /// Column displacement.
    pub d_col: i32,
}

impl Offset {
    /// The zero offset.
    pub const ORIGIN: Self = Self::new(0, 0);

    /// Create a new offset.
    #[must_use]
    pub const fn new(d_row: i32, d_col: i32) -> Self {
        Self { d_row, d_col }
    }

    /// Squared length of the offset (no wrapping).
    #[must_use]
    pub const fn length2(self) -> u32 {
        (self.d_row * self.d_row + self.d_col * self.d_col).unsigned_abs()
    }
}

impl std::ops::Add for Offset {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.d_row + rhs.d_row, self.d_col + rhs.d_col)
    }
}

impl std::ops::Neg for Offset {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.d_row, -self.d_col)
    }
}

/// One of the four compass moves an ant can make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Up (row - 1).
    North,
    /// Right (col + 1).
    East,
    /// Down (row + 1).
    South,
    /// Left (col - 1).
    West,
}

impl Direction {
    /// All directions in protocol order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Parse the single-letter protocol form (`n`, `e`, `s`, `w`).
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "n" => Some(Self::North),
            "e" => Some(Self::East),
            "s" => Some(Self::South),
            "w" => Some(Self::West),
            _ => None,
        }
    }

    /// Single-letter protocol form.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::North => 'n',
            Self::East => 'e',
            Self::South => 's',
            Self::West => 'w',
        }
    }

    /// Unit offset for this direction.
    #[must_use]
    pub const fn offset(self) -> Offset {
        match self {
            Self::North => Offset::new(-1, 0),
            Self::East => Offset::new(0, 1),
            Self::South => Offset::new(1, 0),
            Self::West => Offset::new(0, -1),
        }
    }

    /// Dense index (0..4) for lookup tables.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::North => 0,
            Self::East => 1,
            Self::South => 2,
            Self::West => 3,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Render a per-turn order history the way replays store it (`-` = stayed).
#[must_use]
pub fn order_string(orders: &[Option<Direction>]) -> String {
    orders
        .iter()
        .map(|order| order.map_or('-', Direction::as_char))
        .collect()
}

/// Dimensions of a toroidal grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Torus {
    rows: usize,
    cols: usize,
}

impl Torus {
    /// Create the geometry for a `rows × cols` grid.
    ///
    /// Returns `None` if either dimension is zero.
    #[must_use]
    pub fn new(rows: usize, cols: usize) -> Option<Self> {
        if rows == 0 || cols == 0 {
            return None;
        }
        Some(Self { rows, cols })
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of cells.
    #[must_use]
    pub const fn area(&self) -> usize {
        self.rows * self.cols
    }

    /// Row-major index of a location.
    #[must_use]
    #[inline]
    pub const fn index(&self, loc: Loc) -> usize {
        loc.row * self.cols + loc.col
    }

    /// Location for a row-major index.
    #[must_use]
    #[inline]
    pub const fn loc(&self, index: usize) -> Loc {
        Loc::new(index / self.cols, index % self.cols)
    }

    /// Check if a location lies within the grid.
    #[must_use]
    pub const fn contains(&self, loc: Loc) -> bool {
        loc.row < self.rows && loc.col < self.cols
    }

    /// Iterate every location in row-major order.
    pub fn locs(&self) -> impl Iterator<Item = Loc> + use<> {
        let torus = *self;
        (0..torus.area()).map(move |idx| torus.loc(idx))
    }

    /// Squared toroidal distance between two locations.
    #[must_use]
    pub fn distance(&self, a: Loc, b: Loc) -> u32 {
        let d_row = a.row.abs_diff(b.row);
        let d_row = d_row.min(self.rows - d_row);
        let d_col = a.col.abs_diff(b.col);
        let d_col = d_col.min(self.cols - d_col);
        u32::try_from(d_row * d_row + d_col * d_col).unwrap_or(u32::MAX)
    }

    /// Apply an offset, wrapping around both axes.
    #[must_use]
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub fn offset(&self, loc: Loc, offset: Offset) -> Loc {
        let rows = self.rows as i64;
        let cols = self.cols as i64;
        let row = (loc.row as i64 + i64::from(offset.d_row)).rem_euclid(rows);
        let col = (loc.col as i64 + i64::from(offset.d_col)).rem_euclid(cols);
        Loc::new(row as usize, col as usize)
    }

    /// The cell reached by stepping once in `direction`.
    #[must_use]
    pub fn destination(&self, loc: Loc, direction: Direction) -> Loc {
        self.offset(loc, direction.offset())
    }

    /// Offsets `(dr, dc)` with `0 < dr² + dc² <= radius2`, origin excluded.
    ///
    /// Enumerated with `dr` then `dc` ascending so that every consumer sees
    /// neighbours in the same order.
    #[must_use]
    pub fn neighbourhood(radius2: u32) -> Vec<Offset> {
        let reach = isqrt(radius2);
        let mut offsets = Vec::new();
        for d_row in -reach..=reach {
            for d_col in -reach..=reach {
                let offset = Offset::new(d_row, d_col);
                let d = offset.length2();
                if d > 0 && d <= radius2 {
                    offsets.push(offset);
                }
            }
        }
        offsets
    }

    /// Reduce an offset into `0..rows × 0..cols`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn normalize(&self, offset: Offset) -> Offset {
        Offset::new(
            offset.d_row.rem_euclid(self.rows as i32),
            offset.d_col.rem_euclid(self.cols as i32),
        )
    }

    /// Distinct cells at toroidal distance `0 < d <= radius2`, as normalized
    /// offsets in [`neighbourhood`](Self::neighbourhood) order.
    ///
    /// On grids smaller than the radius several raw offsets land on the same
    /// cell; only the first is kept so no cell is counted twice.
    #[must_use]
    pub fn offsets_within(&self, radius2: u32) -> Vec<Offset> {
        let mut seen = vec![false; self.area()];
        let mut offsets = Vec::new();
        for offset in Self::neighbourhood(radius2) {
            let normal = self.normalize(offset);
            if normal == Offset::ORIGIN {
                continue;
            }
            let idx = self.index(self.offset(Loc::new(0, 0), normal));
            if !seen[idx] {
                seen[idx] = true;
                offsets.push(normal);
            }
        }
        offsets
    }
}

/// Integer square root (floor).
#[allow(clippy::cast_possible_wrap)]
fn isqrt(n: u32) -> i32 {
    let mut r: u32 = 0;
    while (r + 1) * (r + 1) <= n {
        r += 1;
    }
    r as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_wraps() {
        let torus = Torus::new(10, 10).unwrap();
        assert_eq!(torus.distance(Loc::new(0, 0), Loc::new(9, 9)), 2);
        assert_eq!(torus.distance(Loc::new(0, 0), Loc::new(5, 0)), 25);
        assert_eq!(torus.distance(Loc::new(1, 1), Loc::new(1, 1)), 0);
    }

    #[test]
    fn test_destination_wraps() {
        let torus = Torus::new(4, 6).unwrap();
        assert_eq!(torus.destination(Loc::new(0, 0), Direction::North), Loc::new(3, 0));
        assert_eq!(torus.destination(Loc::new(0, 0), Direction::West), Loc::new(0, 5));
        assert_eq!(torus.destination(Loc::new(3, 5), Direction::South), Loc::new(0, 5));
        assert_eq!(torus.destination(Loc::new(3, 5), Direction::East), Loc::new(3, 0));
    }

    #[test]
    fn test_neighbourhood_radius_five() {
        let offsets = Torus::neighbourhood(5);
        // 3x3 block minus origin plus the four (±2, ±1) / (±1, ±2) knights
        // plus (±2, 0) / (0, ±2).
        assert_eq!(offsets.len(), 20);
        assert!(!offsets.contains(&Offset::ORIGIN));
        assert!(offsets.contains(&Offset::new(-2, 1)));
        assert!(!offsets.contains(&Offset::new(2, 2)));
    }

    #[test]
    fn test_neighbourhood_is_ordered() {
        let offsets = Torus::neighbourhood(2);
        assert_eq!(offsets.first(), Some(&Offset::new(-1, -1)));
        assert_eq!(offsets.last(), Some(&Offset::new(1, 1)));
    }

    #[test]
    fn test_offsets_within_small_grid_dedups() {
        let torus = Torus::new(3, 3).unwrap();
        let offsets = torus.offsets_within(8);
        // Every other cell exactly once.
        assert_eq!(offsets.len(), 8);
        let large = Torus::new(10, 10).unwrap();
        assert_eq!(large.offsets_within(5).len(), 20);
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(Torus::new(0, 3).is_none());
        assert!(Torus::new(3, 0).is_none());
    }

    #[test]
    fn test_order_string() {
        let orders = [Some(Direction::North), None, Some(Direction::West)];
        assert_eq!(order_string(&orders), "n-w");
    }
}
