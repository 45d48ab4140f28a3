use std::fmt::{Display, Formatter};

/// A board square, stored as its 0..64 index (a1 = 0, h8 = 63).
/// Every constructor clamps, so a `Square` is always on the board.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Square(u8);

impl Square {
    pub const A1: Square = Square(0);

    /// Builds a square from file/rank coordinates, clamping both to 0..=7
    /// ```
    /// use rookarm::square::Square;
    /// assert_eq!(Square::new(4, 3).to_string(), "e4");
    /// assert_eq!(Square::new(-2, 11).to_string(), "a8");
    /// ```
    pub fn new(file: i32, rank: i32) -> Square {
        let file = file.clamp(0, 7) as u8;
        let rank = rank.clamp(0, 7) as u8;
        Square(rank * 8 + file)
    }

    /// Builds a square from its index, None if the index is off the board
    pub fn from_index(index: usize) -> Option<Square> {
        if index < 64 {
            Some(Square(index as u8))
        } else {
            None
        }
    }

    /// Parses a square in algebraic notation.
    /// Anything that isn't exactly two characters maps to a1, and characters
    /// outside of a..h / 1..8 are clamped to the nearest edge of the board
    /// ```
    /// use rookarm::square::Square;
    /// assert_eq!(Square::parse("e4"), Square::new(4, 3));
    /// assert_eq!(Square::parse("k9"), Square::new(7, 7));
    /// assert_eq!(Square::parse("e"), Square::A1);
    /// assert_eq!(Square::parse("e44"), Square::A1);
    /// ```
    pub fn parse(s: &str) -> Square {
        let mut chars = s.chars();
        let (f, r) = match (chars.next(), chars.next(), chars.next()) {
            (Some(f), Some(r), None) => (f, r),
            _ => return Square::A1,
        };
        let file = f as i32 - 'a' as i32;
        // Non digit rank characters are clamped through their code point, the
        // same way the file is
        let rank = match r.to_digit(10) {
            Some(d) => d as i32 - 1,
            None => r as i32 - '1' as i32,
        };
        Square::new(file, rank)
    }

    pub fn file(&self) -> i32 {
        (self.0 % 8) as i32
    }

    pub fn rank(&self) -> i32 {
        (self.0 / 8) as i32
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// Returns the square shifted by the given offset, None if it leaves the board
    pub fn offset(&self, df: i32, dr: i32) -> Option<Square> {
        let (file, rank) = (self.file() + df, self.rank() + dr);
        if (0..8).contains(&file) && (0..8).contains(&rank) {
            Some(Square::new(file, rank))
        } else {
            None
        }
    }

    /// Chebyshev distance, the number of gantry steps between two squares
    pub fn distance(&self, other: Square) -> i32 {
        (self.file() - other.file())
            .abs()
            .max((self.rank() - other.rank()).abs())
    }

    pub fn all() -> impl Iterator<Item = Square> {
        (0..64u8).map(Square)
    }
}

impl Display for Square {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let file = (b'a' + self.file() as u8) as char;
        let rank = (b'1' + self.rank() as u8) as char;
        write!(f, "{}{}", file, rank)
    }
}

impl From<&str> for Square {
    fn from(s: &str) -> Self {
        Square::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::Square;
    use proptest::prelude::*;

    #[test]
    fn round_trips_every_square() {
        for sq in Square::all() {
            assert_eq!(Square::parse(&sq.to_string()), sq);
        }
    }

    #[test]
    fn out_of_range_characters_clamp_to_the_edge() {
        assert_eq!(Square::parse("a0"), Square::new(0, 0));
        assert_eq!(Square::parse("z5"), Square::new(7, 4));
        assert_eq!(Square::parse("A5"), Square::new(0, 4));
        assert_eq!(Square::parse(""), Square::A1);
    }

    #[test]
    fn offset_stops_at_the_edge() {
        let h8 = Square::parse("h8");
        assert_eq!(h8.offset(1, 0), None);
        assert_eq!(h8.offset(-1, -1), Some(Square::parse("g7")));
    }

    proptest! {
        #[test]
        fn parse_never_leaves_the_board(s in "\\PC{0,4}") {
            let sq = Square::parse(&s);
            prop_assert!(sq.index() < 64);
        }

        #[test]
        fn new_clamps_any_coordinates(file in any::<i32>(), rank in any::<i32>()) {
            let sq = Square::new(file, rank);
            prop_assert!((0..8).contains(&sq.file()));
            prop_assert!((0..8).contains(&sq.rank()));
        }
    }
}
