//! Static puzzle definition: a rectangular grid of blank cells and numbered
//! waypoints, plus the order in which the waypoints must be visited.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// A cell coordinate (zero based)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Manhattan distance to another position
    pub fn distance(&self, other: Position) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }

    /// Whether the two positions share an edge
    pub fn is_adjacent(&self, other: Position) -> bool {
        self.distance(other) == 1
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}c{}", self.row + 1, self.col + 1)
    }
}

/// Axis-aligned neighbour offsets, in search order
pub const DIRECTIONS: [(isize, isize); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Reasons a puzzle definition is rejected at construction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("grid has no cells")]
    Empty,
    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("waypoint order is empty")]
    EmptyOrder,
    #[error("waypoint order contains 0, which marks a blank cell")]
    ZeroInOrder,
    #[error("waypoint {0} is listed more than once in the order")]
    DuplicateOrder(u8),
    #[error("waypoint {0} appears in more than one cell")]
    DuplicateWaypoint(u8),
    #[error("waypoint {0} is in the order but not on the grid")]
    MissingWaypoint(u8),
    #[error("waypoint {0} is on the grid but not in the order")]
    UnorderedWaypoint(u8),
    #[error("invalid cell value {token:?} on line {line}")]
    InvalidCell { line: usize, token: String },
}

/// Serialized shape of a definition: `{ "grid": [[..]], "order": [..] }`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawDefinition {
    grid: Vec<Vec<u8>>,
    order: Vec<u8>,
}

/// An immutable puzzle: blank cells are 0, waypoints are 1..=255
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDefinition", into = "RawDefinition")]
pub struct PuzzleDefinition {
    rows: usize,
    cols: usize,
    cells: Vec<u8>,
    order: Vec<u8>,
    /// Position of `order[i]`, parallel to `order`
    waypoints: Vec<Position>,
}

impl TryFrom<RawDefinition> for PuzzleDefinition {
    type Error = DefinitionError;

    fn try_from(raw: RawDefinition) -> Result<Self, Self::Error> {
        Self::new(raw.grid, raw.order)
    }
}

impl From<PuzzleDefinition> for RawDefinition {
    fn from(def: PuzzleDefinition) -> Self {
        RawDefinition {
            grid: def.rows_vec(),
            order: def.order,
        }
    }
}

impl PuzzleDefinition {
    /// Build a definition from grid rows and a waypoint order
    pub fn new(grid: Vec<Vec<u8>>, order: Vec<u8>) -> Result<Self, DefinitionError> {
        let rows = grid.len();
        let cols = grid.first().map_or(0, Vec::len);
        if rows == 0 || cols == 0 {
            return Err(DefinitionError::Empty);
        }
        for (row, cells) in grid.iter().enumerate() {
            if cells.len() != cols {
                return Err(DefinitionError::Ragged {
                    row,
                    expected: cols,
                    found: cells.len(),
                });
            }
        }
        if order.is_empty() {
            return Err(DefinitionError::EmptyOrder);
        }

        let mut seen_order = HashSet::new();
        for &value in &order {
            if value == 0 {
                return Err(DefinitionError::ZeroInOrder);
            }
            if !seen_order.insert(value) {
                return Err(DefinitionError::DuplicateOrder(value));
            }
        }

        let cells: Vec<u8> = grid.into_iter().flatten().collect();
        let mut seen_cells = HashSet::new();
        for &value in cells.iter().filter(|&&v| v > 0) {
            if !seen_cells.insert(value) {
                return Err(DefinitionError::DuplicateWaypoint(value));
            }
            if !seen_order.contains(&value) {
                return Err(DefinitionError::UnorderedWaypoint(value));
            }
        }

        let waypoints = order
            .iter()
            .map(|&value| {
                cells
                    .iter()
                    .position(|&v| v == value)
                    .map(|idx| Position::new(idx / cols, idx % cols))
                    .ok_or(DefinitionError::MissingWaypoint(value))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            rows,
            cols,
            cells,
            order,
            waypoints,
        })
    }

    /// Parse the text form: one row per line, whitespace separated values,
    /// `.` or `0` for blanks, and an optional `order: 1 2 3` line. Without an
    /// order line the waypoints are visited in ascending order.
    pub fn from_string(s: &str) -> Result<Self, DefinitionError> {
        let mut grid = Vec::new();
        let mut order = None;

        for (idx, line) in s.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(rest) = line.strip_prefix("order:") {
                order = Some(parse_values(rest, idx + 1)?);
                continue;
            }
            grid.push(parse_values(line, idx + 1)?);
        }

        let order = order.unwrap_or_else(|| {
            let mut values: Vec<u8> = grid.iter().flatten().copied().filter(|&v| v > 0).collect();
            values.sort_unstable();
            values
        });

        Self::new(grid, order)
    }

    /// The shipped 7x7 daily puzzle, waypoints 1 through 7
    pub fn daily() -> Self {
        Self {
            rows: 7,
            cols: 7,
            cells: vec![
                0, 0, 0, 0, 0, 0, 0,
                0, 0, 5, 0, 0, 7, 0,
                0, 0, 0, 2, 0, 0, 0,
                0, 0, 3, 0, 0, 0, 0,
                0, 0, 4, 0, 0, 0, 0,
                0, 0, 0, 0, 1, 0, 0,
                0, 0, 6, 0, 0, 0, 0,
            ],
            order: vec![1, 2, 3, 4, 5, 6, 7],
            waypoints: vec![
                Position::new(5, 4),
                Position::new(2, 3),
                Position::new(3, 2),
                Position::new(4, 2),
                Position::new(1, 2),
                Position::new(6, 2),
                Position::new(1, 5),
            ],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Waypoint values in visiting order
    pub fn order(&self) -> &[u8] {
        &self.order
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    /// Cell value at a position (0 for blank), `None` outside the grid
    pub fn get(&self, pos: Position) -> Option<u8> {
        self.index(pos).map(|idx| self.cells[idx])
    }

    /// Cell value at a position that is known to be on the grid
    pub fn value(&self, pos: Position) -> u8 {
        self.get(pos).unwrap_or(0)
    }

    pub fn is_waypoint(&self, pos: Position) -> bool {
        self.value(pos) > 0
    }

    /// Row-major index of a position
    pub fn index(&self, pos: Position) -> Option<usize> {
        self.contains(pos).then(|| pos.row * self.cols + pos.col)
    }

    /// Where the `i`-th waypoint of the order sits
    pub fn waypoint_position(&self, order_index: usize) -> Option<Position> {
        self.waypoints.get(order_index).copied()
    }

    /// The cell one step away in direction `(dr, dc)`, if on the grid
    pub fn step(&self, pos: Position, (dr, dc): (isize, isize)) -> Option<Position> {
        let row = pos.row.checked_add_signed(dr)?;
        let col = pos.col.checked_add_signed(dc)?;
        let next = Position::new(row, col);
        self.contains(next).then_some(next)
    }

    fn rows_vec(&self) -> Vec<Vec<u8>> {
        self.cells.chunks(self.cols).map(<[u8]>::to_vec).collect()
    }
}

impl Default for PuzzleDefinition {
    fn default() -> Self {
        Self::daily()
    }
}

impl fmt::Display for PuzzleDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.cols) {
            let line: Vec<String> = row
                .iter()
                .map(|&v| if v == 0 { ".".to_string() } else { v.to_string() })
                .collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        let order: Vec<String> = self.order.iter().map(u8::to_string).collect();
        write!(f, "order: {}", order.join(" "))
    }
}

fn parse_values(line: &str, line_no: usize) -> Result<Vec<u8>, DefinitionError> {
    line.split_whitespace()
        .map(|token| match token {
            "." => Ok(0),
            _ => token.parse::<u8>().map_err(|_| DefinitionError::InvalidCell {
                line: line_no,
                token: token.to_string(),
            }),
        })
        .collect()
}
