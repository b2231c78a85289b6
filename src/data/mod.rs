use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellContent {
    Mine,
    /// Number of orthogonally adjacent mines.
    Safe(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub content: CellContent,
    pub revealed: bool,
}

impl Cell {
    pub const fn hidden() -> Self {
        Self {
            content: CellContent::Safe(0),
            revealed: false,
        }
    }

    pub const fn is_mine(&self) -> bool {
        matches!(self.content, CellContent::Mine)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    InProgress,
    Won,
    Lost,
}

impl GameStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pos {
    pub row: usize,
    pub col: usize,
}

impl Pos {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Row-major grid of cells plus the game state machine.
#[derive(Debug, Clone)]
pub struct Board {
    pub(crate) width: usize,
    pub(crate) height: usize,
    pub(crate) mine_count: usize,
    pub(crate) revealed: usize,
    pub(crate) status: GameStatus,
    pub(crate) cells: Vec<Cell>,
}
