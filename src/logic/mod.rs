use rand::Rng;
use tracing::{debug, info, instrument, warn};

use crate::{
    data::{Board, Cell, CellContent, GameStatus, Pos},
    error::SessionError,
    model::GameParams,
};

pub mod render;
pub mod session;

pub use render::render;
pub use session::{RetentionPolicy, Session, SessionRegistry};

// Draws per cell before placement gives up.
const PLACEMENT_ATTEMPTS_PER_CELL: usize = 10_000;

// Up, down, left, right.
const ORTHOGONAL: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    Ignored,
    HitMine,
    Revealed,
    Won,
}

impl Board {
    #[instrument(level = "trace", skip(rng))]
    pub fn new<R: Rng + ?Sized>(params: GameParams, rng: &mut R) -> Result<Self, SessionError> {
        params.validate()?;
        let mut board = Self::empty(params);
        board.place_mines(rng)?;
        board.count_adjacent_mines();
        debug!(
            "Built {}x{} board with {} mines",
            board.width, board.height, board.mine_count
        );
        Ok(board)
    }

    pub fn with_mines(width: usize, height: usize, mines: &[Pos]) -> Result<Self, SessionError> {
        GameParams::new(width, height, 0).validate()?;
        let mut board = Self::empty(GameParams::new(width, height, 0));
        for &pos in mines {
            let index = board.index_of(pos)?;
            if let Some(cell) = board.cells.get_mut(index)
                && !cell.is_mine()
            {
                cell.content = CellContent::Mine;
                board.mine_count += 1;
            }
        }
        GameParams::new(width, height, board.mine_count).validate()?;
        board.count_adjacent_mines();
        Ok(board)
    }

    fn empty(params: GameParams) -> Self {
        Self {
            width: params.width,
            height: params.height,
            mine_count: params.mine_count,
            revealed: 0,
            status: GameStatus::InProgress,
            cells: vec![Cell::hidden(); params.width * params.height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn mine_count(&self) -> usize {
        self.mine_count
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn revealed_count(&self) -> usize {
        self.revealed
    }

    pub fn cell(&self, pos: Pos) -> Option<&Cell> {
        self.index_of(pos).ok().and_then(|index| self.cells.get(index))
    }

    pub fn cells(&self) -> impl Iterator<Item = (Pos, &Cell)> {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .map(move |(index, cell)| (Pos::new(index / width, index % width), cell))
    }

    fn index_of(&self, pos: Pos) -> Result<usize, SessionError> {
        if pos.row < self.height && pos.col < self.width {
            Ok(pos.col + pos.row * self.width)
        } else {
            Err(SessionError::InvalidCoordinate {
                row: pos.row,
                col: pos.col,
                width: self.width,
                height: self.height,
            })
        }
    }

    fn neighbors(&self, pos: Pos) -> impl Iterator<Item = Pos> + use<> {
        let (width, height) = (self.width, self.height);
        ORTHOGONAL.into_iter().filter_map(move |(dr, dc)| {
            let row = pos.row.checked_add_signed(dr)?;
            let col = pos.col.checked_add_signed(dc)?;
            (row < height && col < width).then_some(Pos { row, col })
        })
    }

    // Reject-and-retry: a draw landing on an existing mine does not count.
    fn place_mines<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), SessionError> {
        let max_attempts = self.cells.len() * PLACEMENT_ATTEMPTS_PER_CELL;
        let mut placed = 0;
        let mut attempts = 0;

        while placed < self.mine_count {
            if attempts == max_attempts {
                warn!(
                    "Gave up placing mines after {} draws ({} of {} placed)",
                    attempts, placed, self.mine_count
                );
                return Err(SessionError::PlacementExhausted {
                    placed,
                    requested: self.mine_count,
                });
            }
            attempts += 1;

            let index = rng.random_range(0..self.height) * self.width
                + rng.random_range(0..self.width);
            if let Some(cell) = self.cells.get_mut(index)
                && !cell.is_mine()
            {
                cell.content = CellContent::Mine;
                placed += 1;
            }
        }

        Ok(())
    }

    fn count_adjacent_mines(&mut self) {
        let mines: Vec<Pos> = self
            .cells()
            .filter(|(_, cell)| cell.is_mine())
            .map(|(pos, _)| pos)
            .collect();

        for mine in mines {
            for neighbor in self.neighbors(mine) {
                let index = neighbor.col + neighbor.row * self.width;
                if let Some(Cell {
                    content: CellContent::Safe(count),
                    ..
                }) = self.cells.get_mut(index)
                {
                    *count += 1;
                }
            }
        }
    }

    fn mark_revealed(&mut self, index: usize) -> Option<Cell> {
        let cell = self.cells.get_mut(index)?;
        if !cell.revealed {
            cell.revealed = true;
            if !cell.is_mine() {
                self.revealed += 1;
            }
        }
        Some(*cell)
    }

    /// Reveals `pos`, cascading through zero-count cells.
    ///
    /// Finished boards are left untouched and report [`RevealOutcome::Ignored`],
    /// whatever the coordinates.
    #[instrument(level = "trace", skip(self), fields(row = pos.row, col = pos.col))]
    pub fn reveal(&mut self, pos: Pos) -> Result<RevealOutcome, SessionError> {
        if self.status.is_terminal() {
            debug!(
                "Ignoring reveal on finished board at ({}, {})",
                pos.row, pos.col
            );
            return Ok(RevealOutcome::Ignored);
        }

        let index = self.index_of(pos)?;
        let before = self.revealed;
        let Some(cell) = self.mark_revealed(index) else {
            return Ok(RevealOutcome::Revealed);
        };

        match cell.content {
            CellContent::Mine => {
                info!("Mine hit at ({}, {}), game lost", pos.row, pos.col);
                self.status = GameStatus::Lost;
                return Ok(RevealOutcome::HitMine);
            }
            CellContent::Safe(0) => self.cascade(pos),
            CellContent::Safe(_) => {}
        }

        if self.revealed + self.mine_count == self.cells.len() {
            info!("All safe cells revealed, game won");
            self.status = GameStatus::Won;
            return Ok(RevealOutcome::Won);
        }

        debug!("Revealed {} cells", self.revealed - before);
        Ok(RevealOutcome::Revealed)
    }

    // Worklist flood fill. Only zero cells propagate; the nonzero ring around
    // them is revealed and stops there.
    fn cascade(&mut self, origin: Pos) {
        let mut pending = vec![origin];

        while let Some(pos) = pending.pop() {
            for neighbor in self.neighbors(pos) {
                let index = neighbor.col + neighbor.row * self.width;
                let was_revealed = self.cells.get(index).is_some_and(|cell| cell.revealed);
                if let Some(cell) = self.mark_revealed(index)
                    && !was_revealed
                    && cell.content == CellContent::Safe(0)
                {
                    pending.push(neighbor);
                }
            }
        }
    }
}
