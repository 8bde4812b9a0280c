use std::fmt;

use super::{HexCoord, HiveBoard, Piece, PieceType, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ongoing,
    Win(Side),
    Draw,
}

impl Outcome {
    pub fn is_over(self) -> bool {
        self != Outcome::Ongoing
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Outcome::Ongoing => "ONGOING",
            Outcome::Win(Side::White) => "WHITE_WIN",
            Outcome::Win(Side::Black) => "BLACK_WIN",
            Outcome::Draw => "DRAW",
        };
        f.write_str(tag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveKind {
    Place,
    Move,
}

/// A candidate action. `from` is `None` for placements.
#[derive(Debug, Clone, PartialEq)]
pub struct Move {
    pub piece: Piece,
    pub from: Option<HexCoord>,
    pub to: HexCoord,
    pub kind: MoveKind,
    /// Scratch value for selection heuristics; not part of the move's identity.
    pub score: f64,
}

impl Move {
    pub fn place(piece: Piece, to: HexCoord) -> Self {
        Move {
            piece,
            from: None,
            to,
            kind: MoveKind::Place,
            score: 0.0,
        }
    }

    pub fn shift(piece: Piece, from: HexCoord, to: HexCoord) -> Self {
        Move {
            piece,
            from: Some(from),
            to,
            kind: MoveKind::Move,
            score: 0.0,
        }
    }

    pub fn is_placement(&self) -> bool {
        self.kind == MoveKind::Place
    }

    /// Same piece, origin, destination and kind, ignoring `score`.
    pub fn same_action(&self, other: &Move) -> bool {
        self.piece == other.piece
            && self.from == other.from
            && self.to == other.to
            && self.kind == other.kind
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.from {
            Some(from) => write!(
                f,
                "{} {} from {} to {}",
                self.piece.side.name(),
                self.piece.kind.name(),
                from,
                self.to
            ),
            None => write!(
                f,
                "{} {} from reserve to {}",
                self.piece.side.name(),
                self.piece.kind.name(),
                self.to
            ),
        }
    }
}

/// A full position. Cloning yields an independent deep copy.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub(crate) board: HiveBoard,
    pub(crate) reserves: [Vec<Piece>; 2],
    pub(crate) side_to_move: Side,
    pub(crate) queen_placed: [bool; 2],
    pub(crate) ply: u32,
    pub(crate) turns_taken: [u32; 2],
}

impl GameState {
    /// Empty board, full reserves, White to move.
    pub fn initial() -> Self {
        GameState {
            board: HiveBoard::new(),
            reserves: [
                Piece::starting_set(Side::White),
                Piece::starting_set(Side::Black),
            ],
            side_to_move: Side::White,
            queen_placed: [false, false],
            ply: 0,
            turns_taken: [0, 0],
        }
    }

    pub fn board(&self) -> &HiveBoard {
        &self.board
    }

    pub fn reserve(&self, side: Side) -> &[Piece] {
        &self.reserves[side.index()]
    }

    pub fn side_to_move(&self) -> Side {
        self.side_to_move
    }

    pub fn is_queen_placed(&self, side: Side) -> bool {
        self.queen_placed[side.index()]
    }

    /// Plies played so far by both sides.
    pub fn ply(&self) -> u32 {
        self.ply
    }

    pub fn turns_taken(&self, side: Side) -> u32 {
        self.turns_taken[side.index()]
    }

    /// Find the reserve piece a placement refers to: the exact instance if
    /// present, otherwise any piece of the same type and side.
    pub(crate) fn find_reserve_index(&self, piece: &Piece) -> Option<usize> {
        let reserve = &self.reserves[piece.side.index()];
        reserve
            .iter()
            .position(|p| p == piece)
            .or_else(|| reserve.iter().position(|p| p.kind == piece.kind))
    }

    pub(crate) fn take_from_reserve(&mut self, index: usize, side: Side) -> Piece {
        let piece = self.reserves[side.index()].remove(index);
        if piece.kind == PieceType::Queen {
            self.queen_placed[side.index()] = true;
        }
        piece
    }

    /// Hand the turn to the other side.
    pub(crate) fn pass_turn(&mut self) {
        self.turns_taken[self.side_to_move.index()] += 1;
        self.side_to_move = self.side_to_move.other();
        self.ply += 1;
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::initial()
    }
}
