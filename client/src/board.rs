//! Sparse occupancy map to dense grid conversion.
//!
//! The server never transmits the grid extent; it is inferred from the label
//! set of a snapshot's board map. Legitimate snapshots cover the full grid,
//! so absent labels are treated as plain empty cells, not as information.

use std::collections::BTreeMap;

use landgrab_protocol::{CompanyId, Tile, EMPTY_CELL};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("board map cannot yield a grid: {0}")]
    MalformedBoard(String),
}

/// Row-major dense rendering of one board snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBoard {
    pub rows: usize,
    pub cols: usize,
    pub matrix: Vec<Vec<CompanyId>>,
}

impl DecodedBoard {
    pub fn occupant(&self, row: usize, col: usize) -> Option<CompanyId> {
        self.matrix.get(row)?.get(col).copied()
    }
}

/// Reconstructs the rectangular grid from a sparse label→occupant map.
/// Extent is the maximum observed row/column; an empty map has no extent and
/// fails, as does an off-grid label such as the skip token.
pub fn decode(board: &BTreeMap<Tile, CompanyId>) -> Result<DecodedBoard, BoardError> {
    if board.is_empty() {
        return Err(BoardError::MalformedBoard("empty board map".into()));
    }

    let mut rows = 0usize;
    let mut cols = 0usize;
    for tile in board.keys() {
        let (row, col) = tile
            .grid_pos()
            .ok_or_else(|| BoardError::MalformedBoard(format!("off-grid label {tile}")))?;
        rows = rows.max(row + 1);
        cols = cols.max(col + 1);
    }

    let mut matrix = vec![vec![EMPTY_CELL; cols]; rows];
    for (row, cells) in matrix.iter_mut().enumerate() {
        for (col, cell) in cells.iter_mut().enumerate() {
            if let Some(&occupant) = board.get(&Tile::from_grid(row, col)) {
                *cell = occupant;
            }
        }
    }

    Ok(DecodedBoard { rows, cols, matrix })
}

#[cfg(test)]
mod tests {
    use super::*;
    use landgrab_protocol::UNINCORPORATED;

    fn full_board(rows: usize, cols: usize) -> BTreeMap<Tile, CompanyId> {
        let mut board = BTreeMap::new();
        for row in 0..rows {
            for col in 0..cols {
                let marker = (row * cols + col) as CompanyId;
                board.insert(Tile::from_grid(row, col), marker);
            }
        }
        board
    }

    #[test]
    fn infers_extent_and_round_trips_every_cell() {
        let board = full_board(9, 12);
        let decoded = decode(&board).unwrap();
        assert_eq!((decoded.rows, decoded.cols), (9, 12));
        for row in 0..9 {
            for col in 0..12 {
                assert_eq!(
                    decoded.matrix[row][col],
                    board[&Tile::from_grid(row, col)],
                    "cell {}",
                    Tile::from_grid(row, col)
                );
            }
        }
    }

    #[test]
    fn empty_map_is_malformed() {
        assert!(matches!(
            decode(&BTreeMap::new()),
            Err(BoardError::MalformedBoard(_))
        ));
    }

    #[test]
    fn holes_decode_as_empty_cells() {
        let mut board = BTreeMap::new();
        board.insert("3C".parse::<Tile>().unwrap(), UNINCORPORATED);
        let decoded = decode(&board).unwrap();
        assert_eq!((decoded.rows, decoded.cols), (3, 3));
        assert_eq!(decoded.occupant(0, 0), Some(EMPTY_CELL));
        assert_eq!(decoded.occupant(2, 2), Some(UNINCORPORATED));
        assert_eq!(decoded.occupant(3, 0), None);
    }

    #[test]
    fn skip_token_is_rejected() {
        let mut board = BTreeMap::new();
        board.insert(Tile::SKIP, EMPTY_CELL);
        assert!(matches!(
            decode(&board),
            Err(BoardError::MalformedBoard(_))
        ));
    }
}
