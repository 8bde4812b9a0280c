//! Hive game adapter: hex geometry, pieces, board stacks, positions and the
//! rules contract the decision engine plays through.

mod board;
mod hex;
mod piece;
mod rules;
mod state;

pub use board::HiveBoard;
pub use hex::{HexCoord, DIRECTIONS};
pub use piece::{Piece, PieceType, Side, PIECES_PER_SIDE};
pub use rules::{GameRules, HiveRules};
pub use state::{GameState, Move, MoveKind, Outcome};

/// Position builders shared by unit tests across the crate.
#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Build a position by dropping pieces straight onto the board.
    ///
    /// Pieces come out of the owner's reserve when one of that type is left,
    /// so queen flags and reserve counts stay consistent. Turn counters are
    /// derived from how many pieces each side has on the board.
    pub fn position(cells: &[(PieceType, Side, (i32, i32))], to_move: Side) -> GameState {
        let mut state = GameState::initial();
        for &(kind, side, (q, r)) in cells {
            let coord = HexCoord::new(q, r);
            let probe = Piece::new(kind, side, 1);
            let piece = match state.find_reserve_index(&probe) {
                Some(idx) if state.reserve(side)[idx].kind == kind => {
                    state.take_from_reserve(idx, side)
                }
                _ => probe,
            };
            state.board.place(piece, coord);
            state.turns_taken[side.index()] += 1;
            state.ply += 1;
        }
        state.side_to_move = to_move;
        state
    }
}
