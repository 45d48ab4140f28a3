//! Error types for the robot
//!
//! Each layer has its own error enum. [`TurnError`] gathers them at the game
//! level and tells the caller how bad things are through [`Severity`].

use crate::actuator::Axis;
use crate::planner::{Action, Point};
use crate::r#move::Move;
use crate::square::Square;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the board model
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BoardError {
    /// Tried to move from an empty square
    #[error("illegal move {mv}: no piece on {square}")]
    IllegalMove { mv: Move, square: Square },
}

/// The changed squares could not be turned into a single move
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("ambiguous move from squares [{}]: {reason}", squares_to_string(.squares))]
pub struct AmbiguousMove {
    pub squares: Vec<Square>,
    pub reason: String,
}

/// A call into the actuator failed
#[derive(Debug, Error)]
#[error("actuator fault on {axis:?} during {operation}")]
pub struct ActuatorFault {
    pub axis: Option<Axis>,
    pub operation: &'static str,
    #[source]
    pub source: std::io::Error,
}

impl ActuatorFault {
    pub fn new(axis: Option<Axis>, operation: &'static str, source: std::io::Error) -> Self {
        ActuatorFault {
            axis,
            operation,
            source,
        }
    }
}

/// Errors raised while the sequencer drives the gantry
#[derive(Debug, Error)]
pub enum SequenceError {
    /// An actuator call failed. Remaining actions were dropped and the gantry
    /// went through an emergency re-home, `recovered` tells if that worked
    #[error("{fault} while running {action:?} (recovered: {recovered})")]
    Fault {
        #[source]
        fault: ActuatorFault,
        action: Option<Action>,
        recovered: bool,
    },

    /// The operator aborted the sequence. `at` is the last point the gantry
    /// reached. A piece in the claw was released where the gantry stopped, and
    /// has to be put back by hand. `recovered` is as for [`SequenceError::Fault`]
    #[error("interrupted during {action:?} at {at} (piece in claw: {piece_in_claw}, recovered: {recovered})")]
    Interrupted {
        action: Option<Action>,
        piece_in_claw: bool,
        at: Point,
        recovered: bool,
    },

    #[error("supply voltage too low: {volts:.2}V (minimum {minimum:.2}V)")]
    LowVoltage { volts: f32, minimum: f32 },
}

impl SequenceError {
    pub fn fault(&self) -> Option<&ActuatorFault> {
        match self {
            SequenceError::Fault { fault, .. } => Some(fault),
            _ => None,
        }
    }

    /// False when the emergency re-home failed too, the gantry then has to be
    /// homed by hand
    pub fn recovered(&self) -> bool {
        match self {
            SequenceError::Fault { recovered, .. } | SequenceError::Interrupted { recovered, .. } => *recovered,
            SequenceError::LowVoltage { .. } => true,
        }
    }
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("engine gave no move within {0:?}")]
    Timeout(Duration),

    #[error("could not start engine `{path}`")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("engine i/o failed")]
    Io(#[from] std::io::Error),

    #[error("engine closed its output")]
    Closed,

    /// The engine has no legal move, the game is over
    #[error("engine has no move to play")]
    NoMove,

    #[error("engine answered with an unreadable move `{0}`")]
    BadMove(String),
}

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("change detector gave no answer within {0:?}")]
    Timeout(Duration),

    #[error("could not start change detector `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("change detector i/o failed")]
    Io(#[from] std::io::Error),

    #[error("unreadable change detector output: {0}")]
    Parse(String),

    #[error("change detector failed: {0}")]
    Failed(String),
}

/// How the game loop should react to a [`TurnError`]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// The board is as it was before the turn, the turn can be retried
    Recoverable,
    /// The physical board may not match the tracked position, an operator has
    /// to reconcile them before play continues
    Critical,
}

#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Board(#[from] BoardError),

    #[error(transparent)]
    Inference(#[from] AmbiguousMove),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Detector(#[from] DetectorError),

    /// `mv` was applied to the tracked position but the gantry failed while
    /// playing it
    #[error("board out of sync after {mv}: {source}")]
    Diverged {
        mv: Move,
        #[source]
        source: SequenceError,
    },
}

impl TurnError {
    /// Every sequencer failure happens after the move was committed, so any
    /// of them is critical, recovered or not
    pub fn severity(&self) -> Severity {
        match self {
            TurnError::Diverged { .. } => Severity::Critical,
            _ => Severity::Recoverable,
        }
    }
}

fn squares_to_string(squares: &[Square]) -> String {
    squares
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
