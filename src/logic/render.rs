use uuid::Uuid;

use crate::{
    data::{Board, Cell, CellContent, GameStatus},
    model::GameInfo,
};

const BLANK: char = ' ';
const MINE_WON: char = 'M';
const MINE_LOST: char = 'X';

fn token(cell: &Cell, status: GameStatus) -> char {
    match (cell.content, status) {
        (CellContent::Mine, GameStatus::Won) => MINE_WON,
        (CellContent::Mine, GameStatus::Lost) => MINE_LOST,
        (CellContent::Mine, GameStatus::InProgress) => BLANK,
        (CellContent::Safe(count), GameStatus::Won) => digit(count),
        (CellContent::Safe(count), _) if cell.revealed => digit(count),
        (CellContent::Safe(_), _) => BLANK,
    }
}

fn digit(count: u8) -> char {
    char::from_digit(u32::from(count), 10).unwrap_or('?')
}

/// Projects the board into `height` rows of `width` one-character tokens.
pub fn render(board: &Board) -> Vec<Vec<String>> {
    board
        .cells
        .iter()
        .map(|cell| token(cell, board.status).to_string())
        .collect::<Vec<_>>()
        .chunks(board.width)
        .map(|chunk| chunk.to_vec())
        .collect()
}

impl GameInfo {
    pub fn from_board(game_id: Uuid, board: &Board) -> Self {
        Self {
            game_id,
            width: board.width,
            height: board.height,
            mine_count: board.mine_count,
            completed: board.status == GameStatus::Won,
            status: board.status,
            field: render(board),
        }
    }
}
