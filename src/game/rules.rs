use std::collections::BTreeSet;

use tracing::error;

use super::{GameState, HexCoord, HiveBoard, Move, MoveKind, Outcome, Piece, PieceType, Side};
use crate::error::GameError;

/// Turns a side may take before its queen must be placed.
const QUEEN_DEADLINE_TURNS: u32 = 3;

/// Spider moves exactly this many slides.
const SPIDER_STEPS: usize = 3;

/// The narrow rules contract the decision engine depends on.
///
/// Positions are cloned with `GameState::clone`; everything else goes
/// through this trait so search and training never see how the movement
/// rules are derived.
pub trait GameRules {
    /// Every legal move for `side`. Order is stable for a given position.
    fn legal_moves(&self, state: &GameState, side: Side) -> Vec<Move>;

    /// Play `mv` and hand the turn to the other side. On error the
    /// position is left untouched.
    fn apply(&self, state: &mut GameState, mv: &Move) -> Result<(), GameError>;

    fn terminal(&self, state: &GameState) -> Outcome;

    /// Whether `side` may only place its queen this turn.
    fn must_place_queen(&self, state: &GameState, side: Side) -> bool;

    /// Number of movement destinations available to `side`'s top pieces,
    /// whether or not its queen is down yet.
    fn mobility(&self, state: &GameState, side: Side) -> usize;
}

/// Standard hive rules: queen, ant, spider, grasshopper and beetle.
#[derive(Debug, Clone, Copy, Default)]
pub struct HiveRules;

impl HiveRules {
    pub fn new() -> Self {
        HiveRules
    }

    /// Empty cells where `side` may drop a new piece.
    fn placement_targets(board: &HiveBoard, side: Side) -> Vec<HexCoord> {
        if board.is_empty() {
            return vec![HexCoord::ORIGIN];
        }

        let frontier: BTreeSet<HexCoord> = board
            .coords()
            .flat_map(|c| c.neighbors())
            .filter(|n| !board.is_occupied(*n))
            .collect();

        if board.len() == 1 {
            return frontier.into_iter().collect();
        }

        frontier
            .into_iter()
            .filter(|cell| {
                let mut touches_own = false;
                for n in cell.neighbors() {
                    match board.top(n) {
                        Some(p) if p.side == side => touches_own = true,
                        Some(_) => return false,
                        None => {}
                    }
                }
                touches_own
            })
            .collect()
    }

    /// Whether a lifted piece that started on `start` can slide `from -> to`.
    ///
    /// Exactly one of the two shared neighbours must be occupied: none means
    /// the piece would leave the hive, two means the gap is too narrow.
    fn can_slide(board: &HiveBoard, start: HexCoord, from: HexCoord, to: HexCoord) -> bool {
        if to == start || board.is_occupied(to) {
            return false;
        }
        let blocked = from
            .common_neighbors(to)
            .into_iter()
            .filter(|c| *c != start && board.is_occupied(*c))
            .count();
        blocked == 1 && board.has_neighbor_excluding(to, start)
    }

    /// Destinations for the top piece at `from`.
    fn destinations(board: &HiveBoard, from: HexCoord, piece: &Piece) -> Vec<HexCoord> {
        if board.stack_height(from) == 1 && !board.is_connected_without(Some(from)) {
            return Vec::new();
        }

        match piece.kind {
            PieceType::Queen => from
                .neighbors()
                .into_iter()
                .filter(|n| Self::can_slide(board, from, from, *n))
                .collect(),
            PieceType::Beetle => Self::beetle_moves(board, from),
            PieceType::Grasshopper => Self::grasshopper_moves(board, from),
            PieceType::Ant => Self::ant_moves(board, from),
            PieceType::Spider => Self::spider_moves(board, from),
        }
    }

    fn beetle_moves(board: &HiveBoard, from: HexCoord) -> Vec<HexCoord> {
        let elevated = board.stack_height(from) > 1;
        from.neighbors()
            .into_iter()
            .filter(|n| {
                // Climbing, or stepping down beside the stack it leaves behind.
                board.is_occupied(*n) || elevated || Self::can_slide(board, from, from, *n)
            })
            .collect()
    }

    fn grasshopper_moves(board: &HiveBoard, from: HexCoord) -> Vec<HexCoord> {
        let mut moves = Vec::new();
        for dir in super::hex::DIRECTIONS {
            let mut current = from.offset(dir);
            if !board.is_occupied(current) {
                continue;
            }
            while board.is_occupied(current) {
                current = current.offset(dir);
            }
            moves.push(current);
        }
        moves
    }

    fn ant_moves(board: &HiveBoard, from: HexCoord) -> Vec<HexCoord> {
        let mut seen = BTreeSet::from([from]);
        let mut queue = std::collections::VecDeque::from([from]);
        let mut moves = Vec::new();

        while let Some(current) = queue.pop_front() {
            for n in current.neighbors() {
                if !seen.contains(&n) && Self::can_slide(board, from, current, n) {
                    seen.insert(n);
                    queue.push_back(n);
                    moves.push(n);
                }
            }
        }
        moves
    }

    fn spider_moves(board: &HiveBoard, from: HexCoord) -> Vec<HexCoord> {
        let mut ends = BTreeSet::new();
        let mut path = vec![from];
        Self::spider_walk(board, from, &mut path, &mut ends);
        ends.into_iter().collect()
    }

    fn spider_walk(
        board: &HiveBoard,
        start: HexCoord,
        path: &mut Vec<HexCoord>,
        ends: &mut BTreeSet<HexCoord>,
    ) {
        let current = *path.last().unwrap_or(&start);
        if path.len() == SPIDER_STEPS + 1 {
            if current != start {
                ends.insert(current);
            }
            return;
        }
        for n in current.neighbors() {
            if !path.contains(&n) && Self::can_slide(board, start, current, n) {
                path.push(n);
                Self::spider_walk(board, start, path, ends);
                path.pop();
            }
        }
    }
}

impl GameRules for HiveRules {
    fn legal_moves(&self, state: &GameState, side: Side) -> Vec<Move> {
        let board = state.board();
        let forced_queen = self.must_place_queen(state, side);
        let mut moves = Vec::new();

        let targets = Self::placement_targets(board, side);
        for piece in state.reserve(side) {
            if forced_queen && piece.kind != PieceType::Queen {
                continue;
            }
            moves.extend(targets.iter().map(|t| Move::place(*piece, *t)));
        }

        if state.is_queen_placed(side) {
            for (coord, top) in board.tops() {
                if top.side != side {
                    continue;
                }
                for dest in Self::destinations(board, coord, top) {
                    moves.push(Move::shift(*top, coord, dest));
                }
            }
        }

        moves
    }

    fn apply(&self, state: &mut GameState, mv: &Move) -> Result<(), GameError> {
        let result = match mv.kind {
            MoveKind::Place => match state.find_reserve_index(&mv.piece) {
                Some(idx) => {
                    let piece = state.take_from_reserve(idx, mv.piece.side);
                    state.board.place(piece, mv.to);
                    Ok(())
                }
                None => Err(GameError::MissingReservePiece { piece: mv.piece }),
            },
            MoveKind::Move => match mv.from {
                Some(from) => state
                    .board
                    .move_top(from, mv.to)
                    .map(|_| ())
                    .ok_or(GameError::EmptyOrigin { cell: from }),
                None => Err(GameError::MissingOrigin),
            },
        };

        match result {
            Ok(()) => {
                state.pass_turn();
                Ok(())
            }
            Err(e) => {
                error!(error = %e, mv = %mv, ply = state.ply(), "move aborted");
                Err(e)
            }
        }
    }

    fn terminal(&self, state: &GameState) -> Outcome {
        let board = state.board();
        let surrounded = |side: Side| {
            board
                .queen_position(side)
                .is_some_and(|c| board.occupied_neighbors(c) == 6)
        };

        match (surrounded(Side::White), surrounded(Side::Black)) {
            (true, true) => Outcome::Draw,
            (true, false) => Outcome::Win(Side::Black),
            (false, true) => Outcome::Win(Side::White),
            (false, false) => Outcome::Ongoing,
        }
    }

    fn must_place_queen(&self, state: &GameState, side: Side) -> bool {
        !state.is_queen_placed(side) && state.turns_taken(side) >= QUEEN_DEADLINE_TURNS
    }

    fn mobility(&self, state: &GameState, side: Side) -> usize {
        let board = state.board();
        board
            .tops()
            .filter(|(_, p)| p.side == side)
            .map(|(c, p)| Self::destinations(board, c, p).len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::fixtures::position;

    #[test]
    fn test_empty_board_only_origin_placements() {
        let rules = HiveRules::new();
        let state = GameState::initial();
        let moves = rules.legal_moves(&state, state.side_to_move());

        assert_eq!(moves.len(), 11);
        assert!(moves.iter().all(|m| m.is_placement() && m.to == HexCoord::ORIGIN));
        // One placement per reserve instance.
        for piece in state.reserve(Side::White) {
            assert_eq!(moves.iter().filter(|m| m.piece == *piece).count(), 1);
        }
    }

    #[test]
    fn test_second_placement_may_touch_opponent() {
        let rules = HiveRules::new();
        let mut state = GameState::initial();
        let first = rules.legal_moves(&state, Side::White)[0].clone();
        rules.apply(&mut state, &first).unwrap();

        assert_eq!(state.side_to_move(), Side::Black);
        let moves = rules.legal_moves(&state, Side::Black);
        assert_eq!(moves.len(), 11 * 6);
        assert!(moves.iter().all(|m| HexCoord::ORIGIN.is_adjacent(m.to)));
    }

    #[test]
    fn test_later_placements_avoid_enemy_contact() {
        let rules = HiveRules::new();
        let state = position(
            &[
                (PieceType::Queen, Side::White, (0, 0)),
                (PieceType::Queen, Side::Black, (1, 0)),
            ],
            Side::White,
        );
        let moves = rules.legal_moves(&state, Side::White);
        assert!(!moves.is_empty());
        for m in moves.iter().filter(|m| m.is_placement()) {
            assert!(!HexCoord::new(1, 0).is_adjacent(m.to), "{} touches black", m);
            assert!(HexCoord::ORIGIN.is_adjacent(m.to));
        }
    }

    #[test]
    fn test_forced_queen_after_three_turns() {
        let rules = HiveRules::new();
        let mut state = position(
            &[
                (PieceType::Ant, Side::White, (0, 0)),
                (PieceType::Ant, Side::Black, (1, 0)),
                (PieceType::Spider, Side::White, (-1, 0)),
                (PieceType::Spider, Side::Black, (2, 0)),
                (PieceType::Beetle, Side::White, (-2, 0)),
                (PieceType::Beetle, Side::Black, (3, 0)),
            ],
            Side::White,
        );
        state.turns_taken = [3, 3];
        assert!(rules.must_place_queen(&state, Side::White));
        let moves = rules.legal_moves(&state, Side::White);
        assert!(!moves.is_empty());
        assert!(moves.iter().all(|m| m.piece.kind == PieceType::Queen));
    }

    #[test]
    fn test_no_movement_before_queen() {
        let rules = HiveRules::new();
        let state = position(
            &[
                (PieceType::Ant, Side::White, (0, 0)),
                (PieceType::Ant, Side::Black, (1, 0)),
            ],
            Side::White,
        );
        let moves = rules.legal_moves(&state, Side::White);
        assert!(moves.iter().all(|m| m.is_placement()));
    }

    #[test]
    fn test_grasshopper_jumps_over_line() {
        let rules = HiveRules::new();
        let state = position(
            &[
                (PieceType::Queen, Side::White, (-1, 0)),
                (PieceType::Grasshopper, Side::White, (0, 0)),
                (PieceType::Queen, Side::Black, (1, 0)),
                (PieceType::Ant, Side::Black, (2, 0)),
            ],
            Side::White,
        );
        let moves = rules.legal_moves(&state, Side::White);
        let hops: Vec<_> = moves
            .iter()
            .filter(|m| m.piece.kind == PieceType::Grasshopper && !m.is_placement())
            .collect();
        // Removing the grasshopper would split the line, so it is pinned.
        assert!(hops.is_empty());

        let state = position(
            &[
                (PieceType::Grasshopper, Side::White, (-1, 0)),
                (PieceType::Queen, Side::White, (0, 0)),
                (PieceType::Queen, Side::Black, (1, 0)),
            ],
            Side::White,
        );
        let moves = rules.legal_moves(&state, Side::White);
        assert!(moves.iter().any(|m| m.piece.kind == PieceType::Grasshopper
            && m.from == Some(HexCoord::new(-1, 0))
            && m.to == HexCoord::new(2, 0)));
    }

    #[test]
    fn test_pinned_piece_cannot_move() {
        let rules = HiveRules::new();
        let state = position(
            &[
                (PieceType::Queen, Side::Black, (-1, 0)),
                (PieceType::Queen, Side::White, (0, 0)),
                (PieceType::Ant, Side::Black, (1, 0)),
            ],
            Side::White,
        );
        let moves = rules.legal_moves(&state, Side::White);
        assert!(moves.iter().all(|m| m.from != Some(HexCoord::ORIGIN)));
    }

    #[test]
    fn test_ant_walks_around_the_hive() {
        let rules = HiveRules::new();
        let state = position(
            &[
                (PieceType::Queen, Side::White, (0, 0)),
                (PieceType::Queen, Side::Black, (1, 0)),
                (PieceType::Ant, Side::White, (-1, 0)),
            ],
            Side::White,
        );
        let ant_moves: Vec<_> = rules
            .legal_moves(&state, Side::White)
            .into_iter()
            .filter(|m| m.piece.kind == PieceType::Ant && !m.is_placement())
            .collect();
        // Two pieces have eight empty cells around them; the ant's own cell is excluded.
        assert_eq!(ant_moves.len(), 7);
        assert!(ant_moves.iter().all(|m| m.to != HexCoord::new(-1, 0)));
    }

    #[test]
    fn test_beetle_can_climb() {
        let rules = HiveRules::new();
        let state = position(
            &[
                (PieceType::Queen, Side::White, (0, 0)),
                (PieceType::Beetle, Side::White, (-1, 0)),
                (PieceType::Queen, Side::Black, (1, 0)),
            ],
            Side::White,
        );
        let moves = rules.legal_moves(&state, Side::White);
        assert!(moves.iter().any(|m| m.piece.kind == PieceType::Beetle
            && m.to == HexCoord::ORIGIN));
    }

    #[test]
    fn test_apply_movement_then_terminal() {
        let rules = HiveRules::new();
        let mut cells = vec![(PieceType::Queen, Side::Black, (0, 0))];
        let ring = HexCoord::ORIGIN.neighbors();
        let fillers = [
            PieceType::Ant,
            PieceType::Spider,
            PieceType::Grasshopper,
            PieceType::Beetle,
            PieceType::Queen,
        ];
        for (kind, c) in fillers.iter().zip(ring.iter()) {
            cells.push((*kind, Side::White, (c.q, c.r)));
        }
        let state = position(&cells, Side::White);
        assert_eq!(rules.terminal(&state), Outcome::Ongoing);

        let mut closed = state.clone();
        closed.board.place(
            Piece::new(PieceType::Ant, Side::White, 2),
            ring[5],
        );
        assert_eq!(rules.terminal(&closed), Outcome::Win(Side::White));
    }

    #[test]
    fn test_both_queens_surrounded_is_draw() {
        let rules = HiveRules::new();
        let mut state = GameState::initial();
        state.board.place(Piece::new(PieceType::Queen, Side::White, 1), HexCoord::new(0, 0));
        state.board.place(Piece::new(PieceType::Queen, Side::Black, 1), HexCoord::new(1, 0));
        let filler = Piece::new(PieceType::Ant, Side::White, 1);
        for c in HexCoord::new(0, 0)
            .neighbors()
            .into_iter()
            .chain(HexCoord::new(1, 0).neighbors())
        {
            if !state.board.is_occupied(c) {
                state.board.place(filler, c);
            }
        }
        assert_eq!(rules.terminal(&state), Outcome::Draw);
    }

    #[test]
    fn test_apply_missing_reserve_piece_is_noop() {
        let rules = HiveRules::new();
        let mut state = GameState::initial();
        state.reserves[0].retain(|p| p.kind != PieceType::Queen);
        let before = state.clone();

        let mv = Move::place(Piece::new(PieceType::Queen, Side::White, 1), HexCoord::ORIGIN);
        let err = rules.apply(&mut state, &mv).unwrap_err();
        assert!(matches!(err, GameError::MissingReservePiece { .. }));
        assert_eq!(state, before);
    }

    #[test]
    fn test_apply_advances_turn_and_marks_queen() {
        let rules = HiveRules::new();
        let mut state = GameState::initial();
        let queen = rules
            .legal_moves(&state, Side::White)
            .into_iter()
            .find(|m| m.piece.kind == PieceType::Queen)
            .unwrap();
        rules.apply(&mut state, &queen).unwrap();
        assert!(state.is_queen_placed(Side::White));
        assert_eq!(state.ply(), 1);
        assert_eq!(state.turns_taken(Side::White), 1);
        assert_eq!(state.side_to_move(), Side::Black);
        assert_eq!(state.reserve(Side::White).len(), 10);
    }
}
