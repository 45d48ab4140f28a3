//! Motion planning
//!
//! Turns a move into the physical steps the gantry takes to play it.

use crate::board::Board;
use crate::error::BoardError;
use crate::piece::Piece;
use crate::r#move::Move;
use crate::square::Square;
use std::fmt::{Display, Formatter};

/// A gantry coordinate. Same grid as the board, but it extends one square
/// past every edge, where captured pieces are parked
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Point {
        Point { x, y }
    }

    /// Chebyshev distance, both axes travel at once
    pub fn distance(&self, other: Point) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// Where a piece standing on `sq` leaves the board when it is captured.
    ///
    /// It exits through the edge it is closest to, one square past the board.
    /// When it is as close to a column edge as to a row edge it takes the
    /// column edge
    /// ```
    /// use rookarm::planner::Point;
    /// use rookarm::square::Square;
    /// assert_eq!(Point::parking(Square::parse("d5")), Point::new(-1, 4));
    /// assert_eq!(Point::parking(Square::parse("c8")), Point::new(2, 8));
    /// ```
    pub fn parking(sq: Square) -> Point {
        // Doubled so the board centre (3.5) stays an integer
        let dx = (2 * sq.file() - 7).abs();
        let dy = (2 * sq.rank() - 7).abs();
        if dx >= dy {
            Point::new(if sq.file() < 4 { -1 } else { 8 }, sq.rank())
        } else {
            Point::new(sq.file(), if sq.rank() < 4 { -1 } else { 8 })
        }
    }
}

impl From<Square> for Point {
    fn from(sq: Square) -> Self {
        Point::new(sq.file(), sq.rank())
    }
}

impl Display for Point {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A single physical step of a plan
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    /// Carry `piece` from one square to another
    Transport {
        piece: Piece,
        from: Square,
        to: Square,
        lift: bool,
    },
    /// Take `piece` off the board, to its parking spot
    Remove { piece: Piece, from: Square },
}

impl Action {
    pub fn piece(&self) -> Piece {
        match self {
            Action::Transport { piece, .. } | Action::Remove { piece, .. } => *piece,
        }
    }

    /// Gantry coordinates of the pick up and drop points, and whether the
    /// piece is lifted in between
    pub fn path(&self) -> (Point, Point, bool) {
        match *self {
            Action::Transport { from, to, lift, .. } => (from.into(), to.into(), lift),
            Action::Remove { from, .. } => (from.into(), Point::parking(from), true),
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Transport {
                piece,
                from,
                to,
                lift,
            } => write!(
                f,
                "transport {} {}-{}{}",
                piece,
                from,
                to,
                if *lift { " (lifted)" } else { "" }
            ),
            Action::Remove { piece, from } => {
                write!(f, "remove {} {} to {}", piece, from, Point::parking(*from))
            }
        }
    }
}

/// Lists the actions playing `mv` takes, given the position before it is
/// played.
///
/// The order matters: a captured piece leaves the board before the mover
/// lands on its square, the rook of a castle follows the king, and a pawn
/// taken en passant is cleared last since it isn't on the target square.
/// Both pieces of a castle are always lifted
pub fn plan(board: &Board, mv: &Move) -> Result<Vec<Action>, BoardError> {
    let moving = board.piece_at(mv.origin()).ok_or(BoardError::IllegalMove {
        mv: *mv,
        square: mv.origin(),
    })?;
    let flags = board.flags(mv);
    let mut actions = Vec::with_capacity(3);

    if let Some(captured) = board.piece_at(mv.target()) {
        actions.push(Action::Remove {
            piece: captured,
            from: mv.target(),
        });
    }

    actions.push(Action::Transport {
        piece: moving,
        from: mv.origin(),
        to: mv.target(),
        lift: flags.needs_lift || flags.is_castle,
    });

    if let Some(castle) = board.castle(mv) {
        if let Some(rook) = board.piece_at(castle.rook_home()) {
            actions.push(Action::Transport {
                piece: rook,
                from: castle.rook_home(),
                to: castle.rook_target(),
                lift: true,
            });
        }
    }

    if flags.is_en_passant {
        let victim = Board::en_passant_victim(mv);
        if let Some(pawn) = board.piece_at(victim) {
            actions.push(Action::Remove {
                piece: pawn,
                from: victim,
            });
        }
    }

    Ok(actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::Color::{Black, White};
    use crate::piece::PieceType::*;

    fn mv(s: &str) -> Move {
        Move::parse(s).unwrap()
    }

    fn sq(s: &str) -> Square {
        Square::parse(s)
    }

    #[test]
    fn pawn_push_is_a_single_transport() {
        let actions = plan(&Board::new(), &mv("e2e4")).unwrap();
        assert_eq!(
            actions,
            [Action::Transport {
                piece: Piece::new(Pawn, White),
                from: sq("e2"),
                to: sq("e4"),
                lift: false
            }]
        );
    }

    #[test]
    fn capture_removes_first() {
        let b = Board::from_placement("8/8/8/3n4/2B5/8/8/8");
        let actions = plan(&b, &mv("c4d5")).unwrap();
        assert_eq!(
            actions,
            [
                Action::Remove {
                    piece: Piece::new(Knight, Black),
                    from: sq("d5")
                },
                Action::Transport {
                    piece: Piece::new(Bishop, White),
                    from: sq("c4"),
                    to: sq("d5"),
                    lift: b.needs_lift(&mv("c4d5"))
                },
            ]
        );
        assert_eq!(actions[0].path().1, Point::new(-1, 4));
    }

    #[test]
    fn castle_moves_the_rook_lifted() {
        let b = Board::from_placement("8/8/8/8/8/8/8/4K2R");
        assert!(!b.needs_lift(&mv("e1g1")));
        let actions = plan(&b, &mv("e1g1")).unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(
            actions[0],
            Action::Transport {
                piece: Piece::new(King, White),
                from: sq("e1"),
                to: sq("g1"),
                lift: true
            }
        );
        assert_eq!(
            actions[1],
            Action::Transport {
                piece: Piece::new(Rook, White),
                from: sq("h1"),
                to: sq("f1"),
                lift: true
            }
        );
    }

    #[test]
    fn castle_onto_a_piece_does_not_panic() {
        let b = Board::from_placement("8/8/8/8/8/8/8/4K1nR");
        assert_eq!(plan(&b, &mv("e1g1")).unwrap().len(), 3);
    }

    #[test]
    fn en_passant_clears_the_passed_pawn_last() {
        let b = Board::from_placement("8/8/8/3pP3/8/8/8/8");
        let actions = plan(&b, &mv("e5d6")).unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(
            actions[1],
            Action::Remove {
                piece: Piece::new(Pawn, Black),
                from: sq("d5")
            }
        );
    }

    #[test]
    fn empty_origin_is_illegal() {
        assert!(plan(&Board::new(), &mv("e4e5")).is_err());
    }

    #[test]
    fn parking_takes_the_nearest_edge() {
        assert_eq!(Point::parking(sq("a1")), Point::new(-1, 0));
        assert_eq!(Point::parking(sq("h4")), Point::new(8, 3));
        assert_eq!(Point::parking(sq("e2")), Point::new(4, -1));
        assert_eq!(Point::parking(sq("e7")), Point::new(4, 8));
        // Ties go to the column edge
        assert_eq!(Point::parking(sq("e5")), Point::new(8, 4));
        assert_eq!(Point::parking(sq("b7")), Point::new(-1, 6));
    }
}
