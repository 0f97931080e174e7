//! Cell contents, the content grid and the map file format.

use crate::error::MapFormatError;
use crate::game::PlayerId;
use crate::game::torus::{Loc, Torus};

/// Characters used for player ants, indexed by player id.
pub const PLAYER_CHARS: &[u8; 26] = b"abcdefghijklmnopqrstuvwxyz";

/// Rendered form of a cell the viewer cannot currently see.
pub const UNSEEN_CHAR: char = '?';
/// Rendered form of a contested cell.
pub const CONFLICT_CHAR: char = '!';
/// Rendered form of water.
pub const WATER_CHAR: char = '%';
/// Rendered form of food.
pub const FOOD_CHAR: char = '*';
/// Rendered form of open land.
pub const LAND_CHAR: char = '.';

/// Content of a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    /// Open land.
    Land,
    /// Impassable water.
    Water,
    /// A food item waiting to be claimed.
    Food,
    /// A live ant of the given player.
    Ant(PlayerId),
}

impl Cell {
    /// Ants may enter every cell except water.
    #[must_use]
    pub const fn passable(self) -> bool {
        !matches!(self, Cell::Water)
    }

    /// Empty land, free for food or a spawning ant.
    #[must_use]
    pub const fn unoccupied(self) -> bool {
        matches!(self, Cell::Land)
    }

    /// Owner if the cell holds an ant.
    #[must_use]
    pub const fn owner(self) -> Option<PlayerId> {
        match self {
            Cell::Ant(owner) => Some(owner),
            _ => None,
        }
    }

    /// Render the cell, with the ant owner already translated by the caller.
    #[must_use]
    pub fn render(self) -> char {
        match self {
            Cell::Land => LAND_CHAR,
            Cell::Water => WATER_CHAR,
            Cell::Food => FOOD_CHAR,
            Cell::Ant(owner) => PLAYER_CHARS
                .get(usize::from(owner))
                .map_or(CONFLICT_CHAR, |&c| char::from(c)),
        }
    }
}

/// The authoritative content grid, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    torus: Torus,
    cells: Vec<Cell>,
}

impl Grid {
    /// An all-land grid.
    #[must_use]
    pub fn new(torus: Torus) -> Self {
        Self {
            torus,
            cells: vec![Cell::Land; torus.area()],
        }
    }

    /// Grid geometry.
    #[must_use]
    pub const fn torus(&self) -> Torus {
        self.torus
    }

    /// Content at `loc`.
    #[must_use]
    #[inline]
    pub fn get(&self, loc: Loc) -> Cell {
        self.cells[self.torus.index(loc)]
    }

    /// Content at `loc`, or `None` outside the grid.
    #[must_use]
    pub fn try_get(&self, loc: Loc) -> Option<Cell> {
        self.torus.contains(loc).then(|| self.get(loc))
    }

    /// Overwrite the content at `loc`.
    #[inline]
    pub fn place(&mut self, loc: Loc, cell: Cell) {
        let idx = self.torus.index(loc);
        self.cells[idx] = cell;
    }

    /// Raw cells in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Iterate `(loc, cell)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Loc, Cell)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(idx, &cell)| (self.torus.loc(idx), cell))
    }

    /// Number of non-water cells.
    #[must_use]
    pub fn land_area(&self) -> usize {
        self.cells.iter().filter(|cell| cell.passable()).count()
    }

    /// Render every row with the default characters.
    #[must_use]
    pub fn render_rows(&self) -> Vec<String> {
        self.cells
            .chunks(self.torus.cols())
            .map(|row| row.iter().map(|cell| cell.render()).collect())
            .collect()
    }
}

/// A parsed map file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapData {
    /// Grid geometry from the `rows` and `cols` headers.
    pub torus: Torus,
    /// Starting ants per player, row-major.
    pub ants: Vec<Vec<Loc>>,
    /// Initial food, row-major.
    pub food: Vec<Loc>,
    /// Water cells, row-major.
    pub water: Vec<Loc>,
    /// Value of the `players` header, if given.
    pub declared_players: Option<usize>,
}

impl MapData {
    /// Number of players (distinct ant letters on the map).
    #[must_use]
    pub fn num_players(&self) -> usize {
        self.ants.len()
    }

    /// Grid holding only the terrain (water and land).
    #[must_use]
    pub fn terrain(&self) -> Grid {
        let mut grid = Grid::new(self.torus);
        for &loc in &self.water {
            grid.place(loc, Cell::Water);
        }
        grid
    }
}

fn parse_dimension(line: &str, value: &str) -> Result<usize, MapFormatError> {
    value.trim().parse().map_err(|_| MapFormatError::BadHeader {
        line: line.to_string(),
    })
}

/// Parse a map file.
///
/// Blank lines and `#` comments are skipped and keys are case-insensitive.
/// Players are numbered in the order their letter first appears.
///
/// # Errors
///
/// Returns a [`MapFormatError`] for a malformed header, a row of the wrong
/// width, a character outside `a-z * % .`, a row-count mismatch or a map
/// without any ants.
pub fn parse_map(text: &str) -> Result<MapData, MapFormatError> {
    let mut rows: Option<usize> = None;
    let mut cols: Option<usize> = None;
    let mut declared_players = None;
    let mut letters: Vec<char> = Vec::new();
    let mut ants: Vec<Vec<Loc>> = Vec::new();
    let mut food = Vec::new();
    let mut water = Vec::new();
    let mut row = 0usize;

    for raw in text.lines() {
        let line = raw.trim().to_lowercase();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once(' ') else {
            return Err(MapFormatError::BadHeader { line });
        };
        match key {
            "rows" => rows = Some(parse_dimension(&line, value)?),
            "cols" => cols = Some(parse_dimension(&line, value)?),
            "players" => declared_players = Some(parse_dimension(&line, value)?),
            "m" => {
                let width = cols.ok_or(MapFormatError::MissingHeader("cols"))?;
                let actual = value.chars().count();
                if actual != width {
                    return Err(MapFormatError::RowWidth {
                        row,
                        expected: width,
                        actual,
                    });
                }
                for (col, ch) in value.chars().enumerate() {
                    let loc = Loc::new(row, col);
                    match ch {
                        'a'..='z' => {
                            let player = match letters.iter().position(|&c| c == ch) {
                                Some(player) => player,
                                None => {
                                    letters.push(ch);
                                    ants.push(Vec::new());
                                    letters.len() - 1
                                }
                            };
                            ants[player].push(loc);
                        }
                        FOOD_CHAR => food.push(loc),
                        WATER_CHAR => water.push(loc),
                        LAND_CHAR => {}
                        _ => return Err(MapFormatError::InvalidCharacter { row, col, ch }),
                    }
                }
                row += 1;
            }
            _ => {}
        }
    }

    let expected = rows.ok_or(MapFormatError::MissingHeader("rows"))?;
    if expected != row {
        return Err(MapFormatError::RowCount {
            expected,
            actual: row,
        });
    }
    let width = cols.ok_or(MapFormatError::MissingHeader("cols"))?;
    let torus = Torus::new(expected, width).ok_or(MapFormatError::MissingHeader("rows"))?;
    if ants.is_empty() {
        return Err(MapFormatError::NoPlayers);
    }
    if let Some(declared) = declared_players {
        if declared != ants.len() {
            tracing::warn!(declared, found = ants.len(), "players header disagrees with map");
        }
    }

    Ok(MapData {
        torus,
        ants,
        food,
        water,
        declared_players,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = "\
# a tiny map
rows 3
cols 4
players 2
m b.*.
m .%%.
m ...a
";

    #[test]
    fn test_parse_assigns_players_in_first_seen_order() {
        let data = parse_map(SMALL).unwrap();
        assert_eq!(data.num_players(), 2);
        // 'b' appears first so it becomes player 0.
        assert_eq!(data.ants[0], vec![Loc::new(0, 0)]);
        assert_eq!(data.ants[1], vec![Loc::new(2, 3)]);
        assert_eq!(data.food, vec![Loc::new(0, 2)]);
        assert_eq!(data.water, vec![Loc::new(1, 1), Loc::new(1, 2)]);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let data = parse_map("ROWS 1\nCOLS 2\nM A.\n").unwrap();
        assert_eq!(data.torus.cols(), 2);
        assert_eq!(data.ants[0], vec![Loc::new(0, 0)]);
    }

    #[test]
    fn test_wrong_row_width() {
        let err = parse_map("rows 2\ncols 3\nm a..\nm ..\n").unwrap_err();
        assert_eq!(
            err,
            MapFormatError::RowWidth {
                row: 1,
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_invalid_character() {
        let err = parse_map("rows 1\ncols 3\nm a.x\n").unwrap_err();
        assert!(matches!(err, MapFormatError::InvalidCharacter { ch: 'x', col: 2, .. }));
    }

    #[test]
    fn test_row_count_mismatch() {
        let err = parse_map("rows 3\ncols 2\nm a.\n").unwrap_err();
        assert_eq!(err, MapFormatError::RowCount { expected: 3, actual: 1 });
    }

    #[test]
    fn test_row_before_cols() {
        let err = parse_map("rows 1\nm a.\ncols 2\n").unwrap_err();
        assert_eq!(err, MapFormatError::MissingHeader("cols"));
    }

    #[test]
    fn test_no_players() {
        let err = parse_map("rows 1\ncols 2\nm ..\n").unwrap_err();
        assert_eq!(err, MapFormatError::NoPlayers);
    }

    #[test]
    fn test_bad_header_value() {
        let err = parse_map("rows many\ncols 2\nm a.\n").unwrap_err();
        assert!(matches!(err, MapFormatError::BadHeader { .. }));
    }

    #[test]
    fn test_render_round_trip() {
        let data = parse_map(SMALL).unwrap();
        let mut grid = data.terrain();
        grid.place(Loc::new(0, 0), Cell::Ant(1));
        grid.place(Loc::new(0, 2), Cell::Food);
        assert_eq!(grid.render_rows(), vec!["b.*.", ".%%.", "...."]);
        assert_eq!(grid.land_area(), 10);
    }

    #[test]
    fn test_cell_predicates() {
        assert!(Cell::Land.passable());
        assert!(Cell::Food.passable());
        assert!(Cell::Ant(0).passable());
        assert!(!Cell::Water.passable());
        assert!(Cell::Land.unoccupied());
        assert!(!Cell::Food.unoccupied());
    }
}
