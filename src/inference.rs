use crate::board::Board;
use crate::castling::Castle;
use crate::error::AmbiguousMove;
use crate::piece::PieceType;
use crate::r#move::Move;
use crate::square::Square;
use tracing::debug;

/// Works out which move was played from the squares the change detector saw
/// change.
///
/// Piece identities come from the tracked position rather than the images:
/// the detector only says where something changed. A castle is recognised by
/// its four square footprint, any other move by the pair of squares it
/// touched, the mover's own piece marking the origin. Pawns reaching the last
/// rank are promoted to a queen.
pub fn infer_move(board: &Board, changed: &[Square]) -> Result<Move, AmbiguousMove> {
    let mut squares = changed.to_vec();
    squares.sort();
    squares.dedup();

    let ambiguous = |reason: String| AmbiguousMove {
        squares: squares.clone(),
        reason,
    };

    if squares.len() == 4 {
        let castle = Castle::ALL.into_iter().find(|c| {
            let mut footprint = c.footprint();
            footprint.sort();
            footprint[..] == squares[..]
        });
        return match castle {
            Some(c) => {
                debug!("changed squares match the {} footprint", c);
                Ok(c.king_move())
            }
            None => Err(ambiguous(String::from("4 squares changed but no castle matches"))),
        };
    }
    if squares.len() != 2 {
        return Err(ambiguous(format!("{} squares changed, expected 2", squares.len())));
    }

    let mover = board.side_to_move();
    let is_mover = |sq: Square| matches!(board.piece_at(sq), Some(p) if p.color == mover);
    let (origin, target) = match (is_mover(squares[0]), is_mover(squares[1])) {
        (true, false) => (squares[0], squares[1]),
        (false, true) => (squares[1], squares[0]),
        (true, true) => return Err(ambiguous(format!("both squares hold {} pieces", mover))),
        (false, false) => return Err(ambiguous(format!("no {} piece on either square", mover))),
    };

    let promotes = matches!(board.piece_at(origin), Some(p) if p.piece_type == PieceType::Pawn)
        && target.rank() == mover.opposite().back_rank();
    Ok(if promotes {
        Move::with_promotion(origin, target, PieceType::Queen)
    } else {
        Move::new(origin, target)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn squares(list: &[&str]) -> Vec<Square> {
        list.iter().map(|s| Square::parse(s)).collect()
    }

    #[test]
    fn plain_move_in_either_order() {
        let b = Board::new();
        assert_eq!(infer_move(&b, &squares(&["e2", "e4"])).unwrap().to_string(), "e2e4");
        assert_eq!(infer_move(&b, &squares(&["e4", "e2"])).unwrap().to_string(), "e2e4");
    }

    #[test]
    fn side_to_move_decides_the_origin() {
        let mut b = Board::new();
        b.apply_str("e2e4").unwrap();
        b.apply_str("d7d5").unwrap();
        // White to move, e4 takes on d5
        assert_eq!(infer_move(&b, &squares(&["d5", "e4"])).unwrap().to_string(), "e4d5");
        b.apply_str("b1c3").unwrap();
        // Black to move, the same squares now read as d5 taking e4
        assert_eq!(infer_move(&b, &squares(&["d5", "e4"])).unwrap().to_string(), "d5e4");
    }

    #[test]
    fn castle_footprints() {
        let b = Board::from_placement("r3k2r/8/8/8/8/8/8/R3K2R");
        let cases = [
            (["e1", "f1", "g1", "h1"], "e1g1"),
            (["a1", "c1", "d1", "e1"], "e1c1"),
            (["h8", "g8", "f8", "e8"], "e8g8"),
            (["d8", "a8", "e8", "c8"], "e8c8"),
        ];
        for (fp, expected) in cases {
            assert_eq!(infer_move(&b, &squares(&fp)).unwrap().to_string(), expected);
        }
    }

    #[test]
    fn duplicates_are_collapsed() {
        let b = Board::new();
        let changed = squares(&["g1", "f3", "g1"]);
        assert_eq!(infer_move(&b, &changed).unwrap().to_string(), "g1f3");
    }

    #[test]
    fn promotion_defaults_to_queen() {
        let b = Board::from_placement("8/1P6/8/8/8/8/8/8");
        assert_eq!(infer_move(&b, &squares(&["b8", "b7"])).unwrap().to_string(), "b7b8q");
    }

    #[test]
    fn unresolvable_sets_are_ambiguous() {
        let b = Board::new();
        assert!(infer_move(&b, &squares(&["e2"])).is_err());
        assert!(infer_move(&b, &squares(&["e2", "e4", "d4"])).is_err());
        assert!(infer_move(&b, &squares(&["e2", "d2"])).is_err());
        assert!(infer_move(&b, &squares(&["e4", "d5"])).is_err());
        assert!(infer_move(&b, &squares(&["a2", "b2", "c2", "d2"])).is_err());
        let err = infer_move(&b, &squares(&["e7", "e5"])).unwrap_err();
        assert_eq!(err.reason, "no white piece on either square");
    }

    proptest! {
        #[test]
        fn footprint_order_does_not_matter(which in 0usize..4, seed in any::<u64>()) {
            let castle = Castle::ALL[which];
            let mut fp = castle.footprint().to_vec();
            let len = fp.len();
            fp.rotate_left((seed % len as u64) as usize);
            if seed & 4 != 0 {
                fp.reverse();
            }
            let b = Board::new();
            prop_assert_eq!(infer_move(&b, &fp).unwrap(), castle.king_move());
        }
    }
}
