use crate::piece::PieceType;
use crate::square::Square;
use std::fmt::{Display, Formatter};

/// A move in long algebraic form: origin, target and an optional promotion.
/// Everything else about the move depends on the position it is played in,
/// see [`MoveFlags`]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Move {
    origin: Square,
    target: Square,
    promotion: Option<PieceType>,
}

impl Move {
    pub fn new(origin: Square, target: Square) -> Move {
        Move {
            origin,
            target,
            promotion: None,
        }
    }

    pub fn with_promotion(origin: Square, target: Square, promote_to: PieceType) -> Move {
        Move {
            origin,
            target,
            promotion: Some(promote_to),
        }
    }

    pub fn origin(&self) -> Square {
        self.origin
    }
    pub fn target(&self) -> Square {
        self.target
    }
    pub fn promotion(&self) -> Option<PieceType> {
        self.promotion
    }

    /// The same move played backwards, promotion dropped
    pub fn reversed(&self) -> Move {
        Move::new(self.target, self.origin)
    }

    /// Parses a move formatted in long algebraic notation (`e2e4`, `e7e8q`).
    /// Squares follow the clamping rules of [`Square::parse`], but the string
    /// itself must be 4 or 5 ASCII characters with a known promotion letter
    /// ```
    /// use rookarm::r#move::Move;
    /// assert_eq!(Move::parse("e7e8q").unwrap().to_string(), "e7e8q");
    /// assert!(Move::parse("e2").is_none());
    /// assert!(Move::parse("e7e8x").is_none());
    /// ```
    pub fn parse(mv: &str) -> Option<Move> {
        if !mv.is_ascii() || !(4..=5).contains(&mv.len()) {
            return None;
        }
        let origin = Square::parse(&mv[0..2]);
        let target = Square::parse(&mv[2..4]);
        let promotion = match &mv[4..] {
            "" => None,
            "n" => Some(PieceType::Knight),
            "b" => Some(PieceType::Bishop),
            "r" => Some(PieceType::Rook),
            "q" => Some(PieceType::Queen),
            _ => return None,
        };
        Some(Move {
            origin,
            target,
            promotion,
        })
    }
}

impl Display for Move {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.promotion {
            Some(p) => write!(f, "{}{}{}", self.origin, self.target, p),
            None => write!(f, "{}{}", self.origin, self.target),
        }
    }
}

/// Facts about a move derived from the position it is played in
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct MoveFlags {
    pub is_capture: bool,
    pub is_castle: bool,
    pub is_en_passant: bool,
    pub needs_lift: bool,
}

impl Display for MoveFlags {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "capture: {}, castle: {}, en passant: {}, lift: {}",
            self.is_capture, self.is_castle, self.is_en_passant, self.needs_lift
        )
    }
}
