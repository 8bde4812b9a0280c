use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::{HexCoord, Piece, PieceType, Side};

/// Occupied cells and their stacks (bottom piece first).
///
/// Stacks are never empty: a cell whose last piece leaves is removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HiveBoard {
    cells: BTreeMap<HexCoord, Vec<Piece>>,
}

impl HiveBoard {
    /// Create a new empty board
    pub fn new() -> Self {
        HiveBoard {
            cells: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of occupied cells (stacks count once).
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_occupied(&self, coord: HexCoord) -> bool {
        self.cells.contains_key(&coord)
    }

    pub fn stack(&self, coord: HexCoord) -> Option<&[Piece]> {
        self.cells.get(&coord).map(Vec::as_slice)
    }

    pub fn stack_height(&self, coord: HexCoord) -> usize {
        self.cells.get(&coord).map_or(0, Vec::len)
    }

    pub fn top(&self, coord: HexCoord) -> Option<&Piece> {
        self.cells.get(&coord).and_then(|s| s.last())
    }

    /// Occupied cells in coordinate order.
    pub fn coords(&self) -> impl Iterator<Item = HexCoord> + '_ {
        self.cells.keys().copied()
    }

    /// Every occupied cell with its top piece.
    pub fn tops(&self) -> impl Iterator<Item = (HexCoord, &Piece)> + '_ {
        self.cells
            .iter()
            .filter_map(|(c, s)| s.last().map(|p| (*c, p)))
    }

    /// Push a piece onto the stack at `coord`.
    pub fn place(&mut self, piece: Piece, coord: HexCoord) {
        self.cells.entry(coord).or_default().push(piece);
    }

    /// Pop the top piece at `from` and push it onto `to`.
    /// Returns `None` (and changes nothing) if `from` is empty.
    pub fn move_top(&mut self, from: HexCoord, to: HexCoord) -> Option<Piece> {
        let stack = self.cells.get_mut(&from)?;
        let piece = stack.pop()?;
        if stack.is_empty() {
            self.cells.remove(&from);
        }
        self.place(piece, to);
        Some(piece)
    }

    /// Occupied neighbours of `coord`.
    pub fn occupied_neighbors(&self, coord: HexCoord) -> usize {
        coord
            .neighbors()
            .iter()
            .filter(|n| self.is_occupied(**n))
            .count()
    }

    pub fn has_neighbor_excluding(&self, coord: HexCoord, exclude: HexCoord) -> bool {
        coord
            .neighbors()
            .iter()
            .any(|n| *n != exclude && self.is_occupied(*n))
    }

    /// Location of `side`'s queen, wherever it sits in a stack.
    pub fn queen_position(&self, side: Side) -> Option<HexCoord> {
        self.cells.iter().find_map(|(c, stack)| {
            stack
                .iter()
                .any(|p| p.kind == PieceType::Queen && p.side == side)
                .then_some(*c)
        })
    }

    /// Whether the occupied cells form one connected group, optionally
    /// pretending the single piece at `lifted` is gone.
    pub fn is_connected_without(&self, lifted: Option<HexCoord>) -> bool {
        let occupied: BTreeSet<HexCoord> = self
            .cells
            .iter()
            .filter(|(c, stack)| Some(**c) != lifted || stack.len() > 1)
            .map(|(c, _)| *c)
            .collect();
        let Some(&start) = occupied.iter().next() else {
            return true;
        };

        let mut seen = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for n in current.neighbors() {
                if occupied.contains(&n) && seen.insert(n) {
                    queue.push_back(n);
                }
            }
        }
        seen.len() == occupied.len()
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected_without(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn piece(kind: PieceType, side: Side) -> Piece {
        Piece::new(kind, side, 1)
    }

    #[test]
    fn test_place_and_stack() {
        let mut board = HiveBoard::new();
        assert!(board.is_empty());
        board.place(piece(PieceType::Queen, Side::White), HexCoord::ORIGIN);
        board.place(piece(PieceType::Beetle, Side::Black), HexCoord::ORIGIN);
        assert_eq!(board.len(), 1);
        assert_eq!(board.stack_height(HexCoord::ORIGIN), 2);
        assert_eq!(board.top(HexCoord::ORIGIN).unwrap().kind, PieceType::Beetle);
        assert_eq!(board.queen_position(Side::White), Some(HexCoord::ORIGIN));
    }

    #[test]
    fn test_move_top_removes_empty_stack() {
        let mut board = HiveBoard::new();
        board.place(piece(PieceType::Ant, Side::White), HexCoord::ORIGIN);
        let to = HexCoord::new(1, 0);
        assert!(board.move_top(HexCoord::ORIGIN, to).is_some());
        assert!(!board.is_occupied(HexCoord::ORIGIN));
        assert!(board.is_occupied(to));
        assert!(board.move_top(HexCoord::new(5, 5), to).is_none());
    }

    #[test]
    fn test_connectivity_without_lifted_piece() {
        let mut board = HiveBoard::new();
        // A line of three: lifting the middle splits it.
        board.place(piece(PieceType::Ant, Side::White), HexCoord::new(-1, 0));
        board.place(piece(PieceType::Ant, Side::White), HexCoord::ORIGIN);
        board.place(piece(PieceType::Ant, Side::White), HexCoord::new(1, 0));
        assert!(board.is_connected());
        assert!(!board.is_connected_without(Some(HexCoord::ORIGIN)));
        assert!(board.is_connected_without(Some(HexCoord::new(1, 0))));

        // A covered piece stays put when the top one lifts.
        board.place(piece(PieceType::Beetle, Side::Black), HexCoord::ORIGIN);
        assert!(board.is_connected_without(Some(HexCoord::ORIGIN)));
    }

    #[test]
    fn test_occupied_neighbors() {
        let mut board = HiveBoard::new();
        for n in HexCoord::ORIGIN.neighbors().iter().take(4) {
            board.place(piece(PieceType::Ant, Side::Black), *n);
        }
        assert_eq!(board.occupied_neighbors(HexCoord::ORIGIN), 4);
    }
}
