//! Whole turns through the game orchestrator, with scripted engine and
//! detector answers

use rookarm::actuator::Axis;
use rookarm::clock::ManualClock;
use rookarm::config::Config;
use rookarm::detector::ChangeDetector;
use rookarm::error::{DetectorError, OracleError, SequenceError, Severity, TurnError};
use rookarm::game::Game;
use rookarm::history::MoveHistory;
use rookarm::oracle::{Evaluation, Oracle, OracleReply};
use rookarm::planner::Point;
use rookarm::r#move::Move;
use rookarm::sequencer::Sequencer;
use rookarm::sim::{Call, SimulatedGantry};
use rookarm::square::Square;
use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

/// Replays canned answers, and remembers the histories it was asked about
#[derive(Default)]
struct ScriptedOracle {
    answers: VecDeque<Result<&'static str, OracleError>>,
    asked: Vec<MoveHistory>,
}

impl Oracle for ScriptedOracle {
    fn best_move(&mut self, history: &MoveHistory) -> Result<OracleReply, OracleError> {
        self.asked.push(history.clone());
        let answer = self.answers.pop_front().unwrap_or(Err(OracleError::NoMove))?;
        Ok(OracleReply {
            best_move: Move::parse(answer).unwrap(),
            evaluation: Some(Evaluation::Centipawns(20)),
        })
    }
}

#[derive(Default)]
struct ScriptedDetector {
    answers: VecDeque<Result<Vec<&'static str>, DetectorError>>,
    calls: usize,
}

impl ChangeDetector for ScriptedDetector {
    fn changed_squares(&mut self, before: &Path, after: &Path) -> Result<Vec<Square>, DetectorError> {
        assert_eq!(before, Path::new("pic/before.jpg"));
        assert_eq!(after, Path::new("pic/after.jpg"));
        self.calls += 1;
        let answer = self
            .answers
            .pop_front()
            .unwrap_or(Err(DetectorError::Failed(String::from("out of answers"))))?;
        Ok(answer.iter().map(|s| Square::parse(s)).collect())
    }
}

type TestGame<'a> = Game<&'a mut SimulatedGantry, ManualClock, &'a mut ScriptedOracle, &'a mut ScriptedDetector>;

fn game<'a>(
    sim: &'a mut SimulatedGantry,
    oracle: &'a mut ScriptedOracle,
    detector: &'a mut ScriptedDetector,
) -> TestGame<'a> {
    let config = Config::default();
    let mut sequencer = Sequencer::new(sim, ManualClock::new(), config.gantry.clone()).unwrap();
    sequencer.initialize().unwrap();
    Game::new(sequencer, oracle, detector, &config)
}

fn timeout() -> Duration {
    Duration::from_secs(10)
}

#[test]
fn a_full_exchange() {
    let mut sim = SimulatedGantry::new();
    let mut oracle = ScriptedOracle {
        answers: VecDeque::from([Ok("e7e5")]),
        ..Default::default()
    };
    let mut detector = ScriptedDetector {
        answers: VecDeque::from([Ok(vec!["e4", "e2"])]),
        ..Default::default()
    };
    let mut g = game(&mut sim, &mut oracle, &mut detector);
    g.new_game().unwrap();

    assert!(!g.is_robot_turn());
    assert_eq!(g.human_turn().unwrap().to_string(), "e2e4");
    assert!(g.is_robot_turn());

    let turn = g.robot_turn().unwrap();
    assert_eq!(turn.reply.best_move.to_string(), "e7e5");
    assert_eq!(turn.actions.len(), 1);
    assert!(!turn.flags.needs_lift);
    assert_eq!(turn.report.actions, 1);
    assert_eq!(g.board().history().to_string(), "e2e4 e7e5");
    assert_eq!(g.sequencer().state().position, Point::new(4, 7));
    drop(g);

    assert_eq!(oracle.asked.len(), 1);
    assert_eq!(oracle.asked[0].to_string(), "e2e4");
}

#[test]
fn timeouts_are_retried_once() {
    let mut sim = SimulatedGantry::new();
    let mut oracle = ScriptedOracle {
        answers: VecDeque::from([Err(OracleError::Timeout(timeout())), Ok("g8f6")]),
        ..Default::default()
    };
    let mut detector = ScriptedDetector {
        answers: VecDeque::from([Err(DetectorError::Timeout(timeout())), Ok(vec!["d2", "d4"])]),
        ..Default::default()
    };
    let mut g = game(&mut sim, &mut oracle, &mut detector);

    assert_eq!(g.human_turn().unwrap().to_string(), "d2d4");
    assert_eq!(g.robot_turn().unwrap().reply.best_move.to_string(), "g8f6");
    drop(g);
    assert_eq!(detector.calls, 2);
    assert_eq!(oracle.asked.len(), 2);
}

#[test]
fn a_second_timeout_gives_up() {
    let mut sim = SimulatedGantry::new();
    let mut oracle = ScriptedOracle {
        answers: VecDeque::from([
            Err(OracleError::Timeout(timeout())),
            Err(OracleError::Timeout(timeout())),
            Ok("e7e5"),
        ]),
        ..Default::default()
    };
    let mut detector = ScriptedDetector {
        answers: VecDeque::from([Ok(vec!["e2", "e4"])]),
        ..Default::default()
    };
    let mut g = game(&mut sim, &mut oracle, &mut detector);
    g.human_turn().unwrap();

    let err = g.robot_turn().unwrap_err();
    assert!(matches!(err, TurnError::Oracle(OracleError::Timeout(_))));
    assert_eq!(err.severity(), Severity::Recoverable);
    // nothing was played
    assert_eq!(g.board().history().len(), 1);
    assert!(g.robot_turn().is_ok());
}

#[test]
fn other_failures_are_not_retried() {
    let mut sim = SimulatedGantry::new();
    let mut oracle = ScriptedOracle::default();
    let mut detector = ScriptedDetector {
        answers: VecDeque::from([Err(DetectorError::Failed(String::from("no camera")))]),
        ..Default::default()
    };
    let mut g = game(&mut sim, &mut oracle, &mut detector);
    assert!(matches!(g.human_turn(), Err(TurnError::Detector(DetectorError::Failed(_)))));
    drop(g);
    assert_eq!(detector.calls, 1);
}

#[test]
fn unreadable_changes_leave_the_board_alone() {
    let mut sim = SimulatedGantry::new();
    let mut oracle = ScriptedOracle::default();
    let mut detector = ScriptedDetector {
        answers: VecDeque::from([Ok(vec!["e2", "e4", "a1"]), Ok(vec!["e4", "e2"])]),
        ..Default::default()
    };
    let mut g = game(&mut sim, &mut oracle, &mut detector);

    let err = g.human_turn().unwrap_err();
    assert!(matches!(err, TurnError::Inference(_)));
    assert_eq!(err.severity(), Severity::Recoverable);
    assert!(g.board().history().is_empty());

    // the operator's override is played as typed
    let flags = g.human_move(Move::parse("e2e3").unwrap()).unwrap();
    assert!(!flags.is_capture);
    assert_eq!(g.board().history().to_string(), "e2e3");
}

#[test]
fn gantry_failure_after_commit_diverges() {
    let mut sim = SimulatedGantry::new();
    let mut oracle = ScriptedOracle {
        answers: VecDeque::from([Ok("b8c6")]),
        ..Default::default()
    };
    let mut detector = ScriptedDetector {
        answers: VecDeque::from([Ok(vec!["e2", "e4"])]),
        ..Default::default()
    };
    let mut g = game(&mut sim, &mut oracle, &mut detector);
    g.human_turn().unwrap();
    g.sequencer_mut()
        .actuator_mut()
        .fail_on(|call| matches!(call, Call::Target(Axis::Lift, 0)));

    let err = g.robot_turn().unwrap_err();
    assert_eq!(err.severity(), Severity::Critical);
    match &err {
        TurnError::Diverged { mv, source } => {
            assert_eq!(mv.to_string(), "b8c6");
            assert!(matches!(source, SequenceError::Fault { recovered: true, .. }));
        }
        e => panic!("unexpected error {}", e),
    }
    // the move stays committed, the knight is reported as being on c6
    assert_eq!(g.board().history().to_string(), "e2e4 b8c6");
    assert_eq!(g.sequencer().state().position, Point::new(4, 7));
}

#[test]
fn engine_move_from_an_empty_square_is_refused() {
    let mut sim = SimulatedGantry::new();
    let mut oracle = ScriptedOracle {
        answers: VecDeque::from([Ok("e5e4")]),
        ..Default::default()
    };
    let mut detector = ScriptedDetector {
        answers: VecDeque::from([Ok(vec!["e2", "e4"])]),
        ..Default::default()
    };
    let mut g = game(&mut sim, &mut oracle, &mut detector);
    g.human_turn().unwrap();
    let calls = g.sequencer().actuator().calls().len();

    let err = g.robot_turn().unwrap_err();
    assert!(matches!(err, TurnError::Board(_)));
    assert_eq!(err.severity(), Severity::Recoverable);
    assert_eq!(g.board().history().len(), 1);
    assert_eq!(g.sequencer().actuator().calls().len(), calls);
}
