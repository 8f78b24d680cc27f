//! `Grid`: a weighted 4-connected grid parsed from an ASCII map.
//!
//! ```text
//! S..#....
//! .9.#.##.
//! .9...#.G
//! ```
//!
//! `S` start, `G` goal, `.` a cell costing 1 to enter, `1`-`9` a cell with
//! that entry cost, `#` a wall. The grid serves A* (edge cost and Manhattan
//! heuristic) and R* (pairwise heuristic and distant-successor sampling).

use arbor_kernel::{ExpansionDescription, GraphGenerator, Successors};
use arbor_search::strategy::astar::{EdgeCost, Heuristic};
use arbor_search::strategy::rstar::{DistantSuccessors, PairHeuristic};
use rand::{Rng, RngCore};

/// `(x, y)`, origin at the top left.
pub type Cell = (i64, i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Move {
    North,
    South,
    East,
    West,
}

impl Move {
    pub const ALL: [Move; 4] = [Move::North, Move::South, Move::East, Move::West];

    #[must_use]
    pub fn apply(self, (x, y): Cell) -> Cell {
        match self {
            Move::North => (x, y - 1),
            Move::South => (x, y + 1),
            Move::East => (x + 1, y),
            Move::West => (x - 1, y),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("map is empty")]
    Empty,
    #[error("row {row} has width {found}, expected {expected}")]
    Ragged { row: usize, found: usize, expected: usize },
    #[error("unknown cell {found:?} at ({x}, {y})")]
    UnknownCell { found: char, x: usize, y: usize },
    #[error("map needs exactly one {0:?}")]
    Marker(char),
}

#[derive(Debug, Clone)]
pub struct Grid {
    width: i64,
    height: i64,
    /// Row-major entry costs; `None` is a wall.
    cells: Vec<Option<u32>>,
    start: Cell,
    goal: Cell,
    min_cost: u32,
}

#[must_use]
pub fn manhattan(a: Cell, b: Cell) -> i64 {
    (a.0 - b.0).abs() + (a.1 - b.1).abs()
}

impl Grid {
    /// # Errors
    ///
    /// [`GridError`] for an empty or ragged map, an unknown character, or a
    /// missing or repeated `S`/`G`.
    pub fn parse(map: &str) -> Result<Self, GridError> {
        let rows: Vec<&str> = map.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        let Some(first) = rows.first() else {
            return Err(GridError::Empty);
        };
        let expected = first.chars().count();
        let mut cells = Vec::with_capacity(expected * rows.len());
        let (mut start, mut goal) = (Vec::new(), Vec::new());

        for (y, row) in rows.iter().enumerate() {
            let found = row.chars().count();
            if found != expected {
                return Err(GridError::Ragged { row: y, found, expected });
            }
            for (x, c) in row.chars().enumerate() {
                let here = (coord(x), coord(y));
                let cost = match c {
                    '#' => None,
                    '.' => Some(1),
                    'S' => {
                        start.push(here);
                        Some(1)
                    }
                    'G' => {
                        goal.push(here);
                        Some(1)
                    }
                    '1'..='9' => c.to_digit(10),
                    _ => return Err(GridError::UnknownCell { found: c, x, y }),
                };
                cells.push(cost);
            }
        }
        let [start] = start[..] else {
            return Err(GridError::Marker('S'));
        };
        let [goal] = goal[..] else {
            return Err(GridError::Marker('G'));
        };
        let min_cost = cells.iter().flatten().copied().min().unwrap_or(1);
        Ok(Self {
            width: coord(expected),
            height: coord(rows.len()),
            cells,
            start,
            goal,
            min_cost,
        })
    }

    /// An open `size × size` grid of cost-1 cells, start and goal in
    /// opposite corners.
    #[must_use]
    pub fn open(size: usize) -> Self {
        let side = coord(size.max(2));
        Self {
            width: side,
            height: side,
            cells: vec![Some(1); size.max(2) * size.max(2)],
            start: (0, 0),
            goal: (side - 1, side - 1),
            min_cost: 1,
        }
    }

    #[must_use]
    pub fn start(&self) -> Cell {
        self.start
    }

    #[must_use]
    pub fn goal(&self) -> Cell {
        self.goal
    }

    /// Entry cost of `cell`, `None` for walls and cells off the grid.
    #[must_use]
    pub fn entry_cost(&self, (x, y): Cell) -> Option<u32> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        let index = usize::try_from(y * self.width + x).ok()?;
        self.cells.get(index).copied().flatten()
    }

    fn clamp(&self, (x, y): Cell) -> Cell {
        (x.clamp(0, self.width - 1), y.clamp(0, self.height - 1))
    }
}

fn coord(v: usize) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

impl GraphGenerator for Grid {
    type State = Cell;
    type Label = Move;

    fn roots(&self) -> Vec<Cell> {
        vec![self.start]
    }

    fn successors(&self, &cell: &Cell) -> Successors<'_, Cell, Move> {
        Move::ALL
            .into_iter()
            .map(|m| (m, m.apply(cell)))
            .filter(|&(_, next)| self.entry_cost(next).is_some())
            .map(|(m, next)| ExpansionDescription::new(next, m))
            .collect::<Vec<_>>()
            .into()
    }

    fn is_goal(&self, cell: &Cell) -> bool {
        *cell == self.goal
    }
}

impl EdgeCost<Cell, Move> for Grid {
    fn cost(&self, _from: &Cell, _label: &Move, to: &Cell) -> f64 {
        f64::from(self.entry_cost(*to).unwrap_or(u32::MAX))
    }
}

#[allow(clippy::cast_precision_loss)]
impl PairHeuristic<Cell> for Grid {
    /// Manhattan distance times the cheapest cell: admissible and consistent.
    fn between(&self, from: &Cell, to: &Cell) -> f64 {
        manhattan(*from, *to) as f64 * f64::from(self.min_cost)
    }
}

impl Heuristic<Cell> for Grid {
    fn estimate(&self, cell: &Cell) -> f64 {
        self.between(cell, &self.goal)
    }
}

impl DistantSuccessors<Cell> for Grid {
    /// Up to `k` open cells about `delta` steps away, the goal first when it
    /// lies within `delta`.
    #[allow(clippy::cast_possible_truncation)]
    fn distant_successors(&self, &cell: &Cell, k: usize, delta: f64, rng: &mut dyn RngCore) -> Vec<Cell> {
        let reach = (delta.round() as i64).max(1);
        let mut out = Vec::with_capacity(k);
        if manhattan(cell, self.goal) <= reach {
            out.push(self.goal);
        }
        for _ in 0..k.saturating_mul(4) {
            if out.len() >= k {
                break;
            }
            let dx = rng.gen_range(-reach..=reach);
            let dy = (reach - dx.abs()) * if rng.gen::<bool>() { 1 } else { -1 };
            let target = self.clamp((cell.0 + dx, cell.1 + dy));
            if target != cell && self.entry_cost(target).is_some() && !out.contains(&target) {
                out.push(target);
            }
        }
        out
    }
}
