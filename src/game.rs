//! Turn by turn control of a game
//!
//! Ties the board, the oracle, the change detector and the sequencer
//! together, and decides which failures can be retried.

use crate::actuator::Actuator;
use crate::board::Board;
use crate::clock::Clock;
use crate::config::Config;
use crate::detector::ChangeDetector;
use crate::error::{DetectorError, OracleError, TurnError};
use crate::inference::infer_move;
use crate::oracle::{Oracle, OracleReply};
use crate::piece::Color;
use crate::planner::{plan, Action};
use crate::r#move::{Move, MoveFlags};
use crate::sequencer::{SequenceReport, Sequencer};
use std::path::PathBuf;
use tracing::{info, warn};

/// What the robot did on its turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotTurn {
    pub reply: OracleReply,
    pub flags: MoveFlags,
    pub actions: Vec<Action>,
    pub report: SequenceReport,
}

pub struct Game<A: Actuator, C: Clock, O: Oracle, D: ChangeDetector> {
    board: Board,
    sequencer: Sequencer<A, C>,
    oracle: O,
    detector: D,
    before_image: PathBuf,
    after_image: PathBuf,
    robot_color: Color,
}

/// Runs `call`, and runs it again once if it timed out
fn retry_once<T, E: std::fmt::Display>(
    what: &str,
    is_timeout: fn(&E) -> bool,
    mut call: impl FnMut() -> Result<T, E>,
) -> Result<T, E> {
    match call() {
        Err(e) if is_timeout(&e) => {
            warn!("{} timed out ({}), retrying once", what, e);
            call()
        }
        result => result,
    }
}

impl<A: Actuator, C: Clock, O: Oracle, D: ChangeDetector> Game<A, C, O, D> {
    pub fn new(sequencer: Sequencer<A, C>, oracle: O, detector: D, config: &Config) -> Game<A, C, O, D> {
        Game {
            board: Board::new(),
            sequencer,
            oracle,
            detector,
            before_image: PathBuf::from(&config.detector.before_image),
            after_image: PathBuf::from(&config.detector.after_image),
            robot_color: config.game.robot_color,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }
    pub fn sequencer(&self) -> &Sequencer<A, C> {
        &self.sequencer
    }
    pub fn sequencer_mut(&mut self) -> &mut Sequencer<A, C> {
        &mut self.sequencer
    }
    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }
    pub fn robot_color(&self) -> Color {
        self.robot_color
    }

    pub fn is_robot_turn(&self) -> bool {
        self.board.side_to_move() == self.robot_color
    }

    /// Back to the initial position, with an empty history
    pub fn new_game(&mut self) -> Result<(), TurnError> {
        self.board.new_game();
        self.oracle.new_game()?;
        info!("new game, robot plays {}", self.robot_color);
        Ok(())
    }

    /// Works out the move the human played from the changed squares, without
    /// playing it
    pub fn detect_human_move(&mut self) -> Result<Move, TurnError> {
        let (before, after) = (&self.before_image, &self.after_image);
        let detector = &mut self.detector;
        let changed = retry_once(
            "change detector",
            |e: &DetectorError| matches!(e, DetectorError::Timeout(_)),
            || detector.changed_squares(before, after),
        )?;
        let mv = infer_move(&self.board, &changed)?;
        info!("human move looks like {}", mv);
        Ok(mv)
    }

    /// Plays the human's move on the tracked board. Nothing moves physically,
    /// the human already did it
    pub fn human_move(&mut self, mv: Move) -> Result<MoveFlags, TurnError> {
        let flags = self.board.apply(mv)?;
        info!("human played {} [{}]", mv, flags);
        Ok(flags)
    }

    /// Detects and plays the human's move
    pub fn human_turn(&mut self) -> Result<Move, TurnError> {
        let mv = self.detect_human_move()?;
        self.human_move(mv)?;
        Ok(mv)
    }

    /// Asks the oracle for a move and plays it on the board.
    ///
    /// The move is committed to the tracked board before the gantry starts;
    /// if the gantry then fails, the physical board no longer matches and
    /// [`TurnError::Diverged`] is returned
    pub fn robot_turn(&mut self) -> Result<RobotTurn, TurnError> {
        let history = self.board.history().clone();
        let oracle = &mut self.oracle;
        let reply = retry_once(
            "engine",
            |e: &OracleError| matches!(e, OracleError::Timeout(_)),
            || oracle.best_move(&history),
        )?;
        let mv = reply.best_move;

        let actions = plan(&self.board, &mv)?;
        let flags = self.board.apply(mv)?;
        info!("robot plays {} [{}] in {} actions", mv, flags, actions.len());

        let report = self
            .sequencer
            .execute(&actions)
            .map_err(|source| TurnError::Diverged { mv, source })?;
        info!("{} done in {:.1}s", mv, report.duration.as_secs_f32());
        Ok(RobotTurn {
            reply,
            flags,
            actions,
            report,
        })
    }
}
