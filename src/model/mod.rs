use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{data::GameStatus, error::ValidationError};

pub const MIN_SIDE: usize = 2;
pub const MAX_SIDE: usize = 30;
pub const MAX_MINES: usize = 899;
/// Static bound on turn coordinates, independent of the board they target.
pub const MAX_COORD: usize = 29;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct GameParams {
    pub width: usize,
    pub height: usize,
    #[serde(rename = "mines_count")]
    pub mine_count: usize,
}

impl GameParams {
    pub const fn new(width: usize, height: usize, mine_count: usize) -> Self {
        Self {
            width,
            height,
            mine_count,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let side = MIN_SIDE..=MAX_SIDE;
        if !side.contains(&self.width) || !side.contains(&self.height) {
            return Err(ValidationError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.mine_count > MAX_MINES {
            return Err(ValidationError::MineCountOutOfRange {
                mine_count: self.mine_count,
            });
        }
        let cells = self.width * self.height;
        if self.mine_count >= cells {
            return Err(ValidationError::TooManyMines {
                mine_count: self.mine_count,
                cells,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct TurnRequest {
    pub game_id: Uuid,
    pub row: usize,
    pub col: usize,
}

impl TurnRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.row > MAX_COORD || self.col > MAX_COORD {
            return Err(ValidationError::TurnOutOfRange {
                row: self.row,
                col: self.col,
            });
        }
        Ok(())
    }
}

/// Response body of both `/new` and `/turn`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameInfo {
    pub game_id: Uuid,
    pub width: usize,
    pub height: usize,
    #[serde(rename = "mines_count")]
    pub mine_count: usize,
    pub completed: bool,
    pub status: GameStatus,
    pub field: Vec<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub title: String,
    pub description: String,
}
