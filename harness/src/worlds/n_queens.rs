//! `NQueens`: place one queen per row on an `n × n` board.
//!
//! A state is the list of queen columns for the rows filled so far. Only
//! non-attacking placements are generated, so every full board is a solution.
//! Exhaustive runs find 2 boards for `n = 4`, 10 for `n = 5` and 92 for `n = 8`.

use arbor_kernel::{
    EvaluationError, ExpansionDescription, GraphGenerator, Interrupt, NodeEvaluator, Path,
    Successors,
};

/// Queen columns, one per filled row.
pub type Board = Vec<usize>;

#[derive(Debug, Clone, Copy)]
pub struct NQueens {
    n: usize,
    lazy: bool,
}

impl NQueens {
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self { n, lazy: false }
    }

    /// Same board, successors produced as a lazy stream.
    #[must_use]
    pub fn lazy(n: usize) -> Self {
        Self { n, lazy: true }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.n
    }

    /// Evaluator matching this board size.
    #[must_use]
    pub fn evaluator(&self) -> AttackedCells {
        AttackedCells { n: self.n }
    }
}

/// Whether a queen at (`row`, `col`) is attacked by any queen on `board`.
///
/// `row` must lie below every filled row.
#[must_use]
pub fn attacked(board: &[usize], row: usize, col: usize) -> bool {
    board
        .iter()
        .enumerate()
        .any(|(r, &c)| c == col || row - r == c.abs_diff(col))
}

impl GraphGenerator for NQueens {
    type State = Board;
    type Label = usize;

    fn roots(&self) -> Vec<Board> {
        vec![Vec::new()]
    }

    fn successors(&self, board: &Board) -> Successors<'_, Board, usize> {
        let row = board.len();
        if row >= self.n {
            return Successors::Materialized(Vec::new());
        }
        let parent = board.clone();
        let children = (0..self.n).filter_map(move |col| {
            if attacked(&parent, row, col) {
                return None;
            }
            let mut next = parent.clone();
            next.push(col);
            Some(ExpansionDescription::new(next, col))
        });
        if self.lazy {
            Successors::lazy(children)
        } else {
            children.collect::<Vec<_>>().into()
        }
    }

    fn is_goal(&self, board: &Board) -> bool {
        board.len() == self.n
    }
}

/// Number of attacked cells in the first empty row. Lower is better; a full
/// board scores zero.
#[derive(Debug, Clone, Copy)]
pub struct AttackedCells {
    n: usize,
}

impl NodeEvaluator<Board, usize> for AttackedCells {
    type Value = usize;

    fn evaluate(&self, path: &Path<Board, usize>, _interrupt: &Interrupt) -> Result<usize, EvaluationError> {
        let board = path.head();
        let row = board.len();
        if row >= self.n {
            return Ok(0);
        }
        Ok((0..self.n).filter(|&col| attacked(board, row, col)).count())
    }
}
