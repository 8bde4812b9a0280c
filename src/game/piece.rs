use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    White,
    Black,
}

impl Side {
    /// Get the other side
    pub fn other(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    /// Index into per-side arrays
    pub fn index(self) -> usize {
        match self {
            Side::White => 0,
            Side::Black => 1,
        }
    }

    /// Get side name for display
    pub fn name(self) -> &'static str {
        match self {
            Side::White => "White",
            Side::Black => "Black",
        }
    }
}

/// Insect types. The declaration order is the encoder's slot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PieceType {
    Queen,
    Ant,
    Spider,
    Grasshopper,
    Beetle,
}

impl PieceType {
    pub const ALL: [PieceType; 5] = [
        PieceType::Queen,
        PieceType::Ant,
        PieceType::Spider,
        PieceType::Grasshopper,
        PieceType::Beetle,
    ];

    /// How many pieces of this type each side starts with.
    pub fn count(self) -> u8 {
        match self {
            PieceType::Queen => 1,
            PieceType::Ant => 3,
            PieceType::Spider => 2,
            PieceType::Grasshopper => 3,
            PieceType::Beetle => 2,
        }
    }

    pub fn ordinal(self) -> usize {
        self as usize
    }

    pub fn symbol(self) -> &'static str {
        match self {
            PieceType::Queen => "Q",
            PieceType::Ant => "A",
            PieceType::Spider => "S",
            PieceType::Grasshopper => "G",
            PieceType::Beetle => "B",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PieceType::Queen => "QUEEN",
            PieceType::Ant => "ANT",
            PieceType::Spider => "SPIDER",
            PieceType::Grasshopper => "GRASSHOPPER",
            PieceType::Beetle => "BEETLE",
        }
    }
}

/// Total pieces in one side's starting reserve.
pub const PIECES_PER_SIDE: usize = 11;

/// One physical piece. `instance` distinguishes pieces of the same type and side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub kind: PieceType,
    pub side: Side,
    pub instance: u8,
}

impl Piece {
    pub fn new(kind: PieceType, side: Side, instance: u8) -> Self {
        Piece {
            kind,
            side,
            instance,
        }
    }

    /// The full starting reserve for `side`, instances numbered from 1.
    pub fn starting_set(side: Side) -> Vec<Piece> {
        PieceType::ALL
            .iter()
            .flat_map(|&kind| (1..=kind.count()).map(move |i| Piece::new(kind, side, i)))
            .collect()
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.side {
            Side::White => "W",
            Side::Black => "B",
        };
        write!(f, "{}{}{}", prefix, self.kind.symbol(), self.instance)
    }
}
