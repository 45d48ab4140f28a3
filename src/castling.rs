use crate::piece::Color;
use crate::piece::Color::{Black, White};
use crate::r#move::Move;
use crate::square::Square;
use std::fmt::{Display, Formatter};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CastleSide {
    KingSide,
    QueenSide,
}

/// One of the four castles. Knows where the king and rook start and end
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Castle {
    pub color: Color,
    pub side: CastleSide,
}

impl Castle {
    pub const ALL: [Castle; 4] = [
        Castle { color: White, side: CastleSide::KingSide },
        Castle { color: White, side: CastleSide::QueenSide },
        Castle { color: Black, side: CastleSide::KingSide },
        Castle { color: Black, side: CastleSide::QueenSide },
    ];

    pub const KING_HOME_FILE: i32 = 4;

    pub fn king_home(&self) -> Square {
        Square::new(Self::KING_HOME_FILE, self.color.back_rank())
    }
    pub fn king_target(&self) -> Square {
        let file = match self.side {
            CastleSide::KingSide => 6,
            CastleSide::QueenSide => 2,
        };
        Square::new(file, self.color.back_rank())
    }
    pub fn rook_home(&self) -> Square {
        let file = match self.side {
            CastleSide::KingSide => 7,
            CastleSide::QueenSide => 0,
        };
        Square::new(file, self.color.back_rank())
    }
    /// The rook lands next to the king, on the side it came from
    pub fn rook_target(&self) -> Square {
        let file = match self.side {
            CastleSide::KingSide => 5,
            CastleSide::QueenSide => 3,
        };
        Square::new(file, self.color.back_rank())
    }

    /// Every square the castle touches, the way a change detector would see it
    pub fn footprint(&self) -> [Square; 4] {
        [
            self.king_home(),
            self.king_target(),
            self.rook_home(),
            self.rook_target(),
        ]
    }

    /// The king move the castle is written as
    pub fn king_move(&self) -> Move {
        Move::new(self.king_home(), self.king_target())
    }

    /// Finds the castle a king move from `origin` to `target` would be,
    /// based on squares alone
    pub fn from_squares(origin: Square, target: Square) -> Option<Castle> {
        Self::ALL
            .into_iter()
            .find(|c| c.king_home() == origin && c.king_target() == target)
    }
}

impl Display for Castle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}",
            self.color,
            match self.side {
                CastleSide::KingSide => "O-O",
                CastleSide::QueenSide => "O-O-O",
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn footprints_match_the_board() {
        let fp: Vec<String> = Castle::ALL[0].footprint().iter().map(|s| s.to_string()).collect();
        assert_eq!(fp, ["e1", "g1", "h1", "f1"]);
        let fp: Vec<String> = Castle::ALL[3].footprint().iter().map(|s| s.to_string()).collect();
        assert_eq!(fp, ["e8", "c8", "a8", "d8"]);
    }

    #[test]
    fn castles_are_recognised_from_king_squares() {
        let c = Castle::from_squares(Square::parse("e8"), Square::parse("g8")).unwrap();
        assert_eq!(c, Castle { color: Black, side: CastleSide::KingSide });
        assert_eq!(c.king_move().to_string(), "e8g8");
        assert!(Castle::from_squares(Square::parse("e1"), Square::parse("f1")).is_none());
    }
}
