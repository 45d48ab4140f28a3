//! End to end scenarios: from changed squares or engine moves to the actions
//! the gantry performs

use rookarm::board::Board;
use rookarm::inference::infer_move;
use rookarm::piece::PieceType;
use rookarm::planner::{plan, Action, Point};
use rookarm::r#move::Move;
use rookarm::square::Square;

fn sq(s: &str) -> Square {
    Square::parse(s)
}

fn mv(s: &str) -> Move {
    Move::parse(s).unwrap()
}

#[test]
fn action_counts_by_move_kind() {
    let b = Board::from_placement("r3k2r/8/8/3pP3/2P5/8/8/R3K2R");
    let cases = [
        ("a1a4", 1), // plain
        ("c4d5", 2), // capture
        ("e1g1", 2), // castle
        ("e5d6", 2), // en passant
    ];
    for (m, count) in cases {
        assert_eq!(plan(&b, &mv(m)).unwrap().len(), count, "{}", m);
    }

    // a piece left on the king's target is cleared first
    let b = Board::from_placement("r3k2r/8/8/8/8/8/8/R3K1nR");
    assert_eq!(plan(&b, &mv("e1g1")).unwrap().len(), 3);
}

#[test]
fn opening_pawn_push() {
    let b = Board::new();
    let flags = b.flags(&mv("e2e4"));
    assert!(!flags.needs_lift && !flags.is_capture);
    let actions = plan(&b, &mv("e2e4")).unwrap();
    assert_eq!(actions.len(), 1);
    assert!(matches!(
        actions[0],
        Action::Transport { lift: false, from, to, .. } if from == sq("e2") && to == sq("e4")
    ));
}

#[test]
fn bishop_lifts_until_the_way_is_clear() {
    let mut b = Board::new();
    let c1e3 = mv("c1e3");
    assert!(b.needs_lift(&c1e3));
    for swept in b.sweep(sq("c1"), sq("e3")).unwrap() {
        b.take(swept);
    }
    assert!(b.is_occupied(sq("c1")));
    assert!(!b.needs_lift(&c1e3));
}

#[test]
fn castle_from_its_footprint() {
    let b = Board::from_placement("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R");
    for changed in [
        ["e1", "f1", "g1", "h1"],
        ["h1", "g1", "f1", "e1"],
        ["g1", "e1", "h1", "f1"],
    ] {
        let changed: Vec<_> = changed.iter().map(|s| sq(s)).collect();
        assert_eq!(infer_move(&b, &changed).unwrap(), mv("e1g1"));
    }

    let actions = plan(&b, &mv("e1g1")).unwrap();
    assert_eq!(actions.len(), 2);
    for (action, (from, to)) in actions.iter().zip([("e1", "g1"), ("h1", "f1")]) {
        match action {
            Action::Transport {
                from: f, to: t, lift, ..
            } => {
                assert_eq!((*f, *t), (sq(from), sq(to)));
                assert!(*lift);
            }
            a => panic!("expected a transport, got {}", a),
        }
    }
}

#[test]
fn capture_parks_the_taken_piece_first() {
    let b = Board::from_placement("8/8/8/3p4/2P5/8/8/8");
    let actions = plan(&b, &mv("c4d5")).unwrap();
    match actions.as_slice() {
        [remove @ Action::Remove { from, .. }, Action::Transport { from: f, to: t, .. }] => {
            assert_eq!(*from, sq("d5"));
            assert_eq!(remove.path().1, Point::new(-1, 4));
            assert_eq!((*f, *t), (sq("c4"), sq("d5")));
        }
        other => panic!("unexpected plan {:?}", other),
    }
}

#[test]
fn human_then_engine_moves_track_the_board() {
    let mut b = Board::new();
    let human = infer_move(&b, &[sq("e4"), sq("e2")]).unwrap();
    b.apply(human).unwrap();
    let reply = mv("d7d5");
    assert_eq!(plan(&b, &reply).unwrap().len(), 1);
    b.apply(reply).unwrap();

    let human = infer_move(&b, &[sq("d5"), sq("e4")]).unwrap();
    assert_eq!(human, mv("e4d5"));
    let flags = b.apply(human).unwrap();
    assert!(flags.is_capture);
    assert_eq!(b.placement(), "rnbqkbnr/ppp1pppp/8/3P4/8/8/PPPP1PPP/RNBQKBNR");
    assert_eq!(b.history().to_string(), "e2e4 d7d5 e4d5");
}

#[test]
fn there_and_back_again() {
    let start = Board::new();
    let mut b = start.clone();
    for m in ["g1f3", "g8f6", "f3g1", "f6g8"] {
        b.apply(mv(m)).unwrap();
    }
    assert_eq!(b.placement(), start.placement());
}

#[test]
fn promotion_is_played_as_a_queen() {
    let mut b = Board::from_placement("8/4P3/8/8/8/8/8/k6K");
    let promotion = infer_move(&b, &[sq("e7"), sq("e8")]).unwrap();
    assert_eq!(promotion.promotion(), Some(PieceType::Queen));
    b.apply(promotion).unwrap();
    assert_eq!(b.piece_at(sq("e8")).unwrap().to_char(), 'Q');
}
