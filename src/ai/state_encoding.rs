use crate::game::{GameState, PieceType, Side, PIECES_PER_SIDE};

/// Cells span q, r ∈ [-WINDOW_RADIUS, WINDOW_RADIUS].
pub const WINDOW_RADIUS: i32 = 5;
const WINDOW_SIDE: usize = (2 * WINDOW_RADIUS + 1) as usize;
const SLOTS_PER_CELL: usize = 2 * PieceType::ALL.len();
/// Number of board indicator slots.
pub const BOARD_SLOTS: usize = WINDOW_SIDE * WINDOW_SIDE * SLOTS_PER_CELL;
const SCALAR_SLOTS: usize = 10;
/// Total feature vector length.
pub const FEATURE_LEN: usize = BOARD_SLOTS + SCALAR_SLOTS;

const PLY_SCALE: f64 = 30.0;
const BOARD_SCALE: f64 = 22.0;

/// Projects a position into a fixed-length feature vector.
pub trait StateEncoder {
    fn feature_len(&self) -> usize;

    /// Encode `state` as seen by `perspective`. Deterministic.
    fn encode(&self, state: &GameState, perspective: Side) -> Vec<f64>;
}

/// Perspective-relative one-hot board encoding plus phase scalars.
///
/// Layout: for every cell in the window, five "own" slots then five
/// "opponent" slots indexed by piece type. Only the top of each stack is
/// visible. Trailing scalars:
///
/// | index  | value                         |
/// |--------|-------------------------------|
/// | 1210   | ply / 30                      |
/// | 1211   | own queen placed              |
/// | 1212   | opponent queen placed         |
/// | 1213   | own reserve / 11              |
/// | 1214   | occupied cells / 22           |
/// | 1215.. | unused, always zero           |
#[derive(Debug, Clone, Copy, Default)]
pub struct BoardEncoder;

impl BoardEncoder {
    pub fn new() -> Self {
        BoardEncoder
    }

    /// Slot index for a top piece at `(q, r)`, or `None` outside the window.
    fn slot(q: i32, r: i32, own: bool, kind: PieceType) -> Option<usize> {
        if q.abs() > WINDOW_RADIUS || r.abs() > WINDOW_RADIUS {
            return None;
        }
        let cell = (q + WINDOW_RADIUS) as usize * WINDOW_SIDE + (r + WINDOW_RADIUS) as usize;
        let color = if own { 0 } else { PieceType::ALL.len() };
        Some(cell * SLOTS_PER_CELL + color + kind.ordinal())
    }
}

impl StateEncoder for BoardEncoder {
    fn feature_len(&self) -> usize {
        FEATURE_LEN
    }

    fn encode(&self, state: &GameState, perspective: Side) -> Vec<f64> {
        let mut features = vec![0.0; FEATURE_LEN];
        let board = state.board();

        for (coord, piece) in board.tops() {
            if let Some(idx) = Self::slot(coord.q, coord.r, piece.side == perspective, piece.kind) {
                features[idx] = 1.0;
            }
        }

        let scalars = &mut features[BOARD_SLOTS..];
        scalars[0] = state.ply() as f64 / PLY_SCALE;
        scalars[1] = if state.is_queen_placed(perspective) { 1.0 } else { 0.0 };
        scalars[2] = if state.is_queen_placed(perspective.other()) { 1.0 } else { 0.0 };
        scalars[3] = state.reserve(perspective).len() as f64 / PIECES_PER_SIDE as f64;
        scalars[4] = board.len() as f64 / BOARD_SCALE;

        features
    }
}
