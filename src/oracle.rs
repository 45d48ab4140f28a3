//! Move oracle
//!
//! Asks a UCI chess engine which move the robot plays. The engine runs as a
//! child process; a reader thread forwards its output line by line so every
//! wait can be bounded.

use crate::config::OracleConfig;
use crate::error::OracleError;
use crate::history::MoveHistory;
use crate::r#move::Move;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use regex::Regex;
use std::fmt::{Display, Error, Formatter};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Engine's opinion of the position, from the side to move
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Evaluation {
    Centipawns(i32),
    /// Mate in that many moves, negative when the side to move gets mated
    Mate(i32),
}

impl Display for Evaluation {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            Evaluation::Centipawns(cp) => write!(f, "{:+.2}", *cp as f32 / 100.0),
            Evaluation::Mate(n) => write!(f, "mate in {}", n),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OracleReply {
    pub best_move: Move,
    /// Last score the engine reported before answering
    pub evaluation: Option<Evaluation>,
}

/// Source of the robot's moves
pub trait Oracle {
    /// Best move in the position reached by playing `history` from the start
    fn best_move(&mut self, history: &MoveHistory) -> Result<OracleReply, OracleError>;

    /// Forgets everything about the previous game
    fn new_game(&mut self) -> Result<(), OracleError> {
        Ok(())
    }
}

impl<O: Oracle + ?Sized> Oracle for &mut O {
    fn best_move(&mut self, history: &MoveHistory) -> Result<OracleReply, OracleError> {
        (**self).best_move(history)
    }
    fn new_game(&mut self) -> Result<(), OracleError> {
        (**self).new_game()
    }
}

/// Lines sent to the engine
pub enum EngineCommand<'a> {
    Uci,
    IsReady,
    NewGame,
    SetOption(&'a EngineOption),
    Position(&'a MoveHistory),
    Go { movetime: Duration },
    Stop,
    Quit,
}

impl Display for EngineCommand<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            EngineCommand::Uci => write!(f, "uci"),
            EngineCommand::IsReady => write!(f, "isready"),
            EngineCommand::NewGame => write!(f, "ucinewgame"),
            EngineCommand::SetOption(option) => write!(f, "setoption {}", option),
            EngineCommand::Position(history) if history.is_empty() => write!(f, "position startpos"),
            EngineCommand::Position(history) => write!(f, "position startpos moves {}", history),
            EngineCommand::Go { movetime } => write!(f, "go movetime {}", movetime.as_millis()),
            EngineCommand::Stop => write!(f, "stop"),
            EngineCommand::Quit => write!(f, "quit"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOption {
    Spin { name: &'static str, value: i64 },
    Check { name: &'static str, value: bool },
}

impl EngineOption {
    /// Options set right after the handshake. Thread count is capped to the
    /// machine, skill to the 0..=20 range engines accept
    pub fn from_config(config: &OracleConfig) -> Vec<EngineOption> {
        vec![
            EngineOption::Spin {
                name: "Threads",
                value: config.threads.clamp(1, num_cpus::get()) as i64,
            },
            EngineOption::Spin {
                name: "Hash",
                value: config.hash_mb as i64,
            },
            EngineOption::Check {
                name: "OwnBook",
                value: config.own_book,
            },
            EngineOption::Spin {
                name: "Skill Level",
                value: config.skill_level.min(20) as i64,
            },
        ]
    }
}

impl Display for EngineOption {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            Self::Spin { name, value } => write!(f, "name {} value {}", name, value),
            Self::Check { name, value } => write!(f, "name {} value {}", name, value),
        }
    }
}

fn best_move_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^bestmove\s+(\S+)").unwrap())
}

fn score_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bscore\s+(cp|mate)\s+(-?\d+)").unwrap())
}

/// Reads the answer out of a `bestmove` line. `None` for any other line
pub fn parse_best_move(line: &str) -> Option<Result<Move, OracleError>> {
    let caps = best_move_regex().captures(line.trim())?;
    let mv = &caps[1];
    Some(match mv {
        "(none)" | "0000" => Err(OracleError::NoMove),
        _ => Move::parse(mv).ok_or_else(|| OracleError::BadMove(mv.to_string())),
    })
}

/// Reads the score of an `info` line, if it has one
pub fn parse_score(line: &str) -> Option<Evaluation> {
    let caps = score_regex().captures(line)?;
    let value = caps[2].parse::<i32>().ok()?;
    Some(match &caps[1] {
        "mate" => Evaluation::Mate(value),
        _ => Evaluation::Centipawns(value),
    })
}

/// A UCI engine running as a child process
pub struct UciEngine {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<String>,
    config: OracleConfig,
}

impl UciEngine {
    /// Starts the engine, goes through the UCI handshake and sets the options
    pub fn spawn(config: &OracleConfig) -> Result<UciEngine, OracleError> {
        let mut child = Command::new(&config.engine_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| OracleError::Spawn {
                path: config.engine_path.clone(),
                source,
            })?;
        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => return Err(OracleError::Closed),
        };

        let (sender, lines) = unbounded();
        thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                match line {
                    Ok(line) => {
                        if sender.send(line).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });

        let mut engine = UciEngine {
            child,
            stdin,
            lines,
            config: config.clone(),
        };
        engine.send(EngineCommand::Uci)?;
        engine.wait_for(|line| line == "uciok")?;
        for option in EngineOption::from_config(config) {
            engine.send(EngineCommand::SetOption(&option))?;
        }
        engine.sync()?;
        info!("engine {} ready, skill level {}", config.engine_path, config.skill_level);
        Ok(engine)
    }

    pub fn send(&mut self, command: EngineCommand) -> Result<(), OracleError> {
        debug!("engine < {}", command);
        writeln!(self.stdin, "{}", command)?;
        self.stdin.flush()?;
        Ok(())
    }

    /// Reads lines until `done` accepts one, which is returned
    fn wait_for(&mut self, mut done: impl FnMut(&str) -> bool) -> Result<String, OracleError> {
        let timeout = self.config.timeout();
        let deadline = Instant::now() + timeout;
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.lines.recv_timeout(left) {
                Ok(line) => {
                    trace!("engine > {}", line);
                    if done(line.trim()) {
                        return Ok(line);
                    }
                }
                Err(RecvTimeoutError::Timeout) => return Err(OracleError::Timeout(timeout)),
                Err(RecvTimeoutError::Disconnected) => return Err(OracleError::Closed),
            }
        }
    }

    /// Waits until the engine caught up with every command sent so far. Output
    /// of an earlier search that timed out is thrown away here
    fn sync(&mut self) -> Result<(), OracleError> {
        self.send(EngineCommand::IsReady)?;
        self.wait_for(|line| line == "readyok").map(|_| ())
    }
}

impl Oracle for UciEngine {
    fn best_move(&mut self, history: &MoveHistory) -> Result<OracleReply, OracleError> {
        self.sync()?;
        self.send(EngineCommand::Position(history))?;
        self.send(EngineCommand::Go {
            movetime: self.config.think_time(),
        })?;

        let mut evaluation = None;
        let answer = self.wait_for(|line| {
            if let Some(score) = parse_score(line) {
                evaluation = Some(score);
            }
            line.starts_with("bestmove")
        });
        let line = match answer {
            Ok(line) => line,
            Err(e) => {
                if let OracleError::Timeout(_) = e {
                    warn!("engine took too long, stopping the search");
                    let _ = self.send(EngineCommand::Stop);
                }
                return Err(e);
            }
        };

        let best_move = parse_best_move(&line).unwrap_or_else(|| Err(OracleError::BadMove(line.clone())))?;
        match evaluation {
            Some(e) => info!("engine plays {} ({})", best_move, e),
            None => info!("engine plays {}", best_move),
        }
        Ok(OracleReply {
            best_move,
            evaluation,
        })
    }

    fn new_game(&mut self) -> Result<(), OracleError> {
        self.send(EngineCommand::NewGame)?;
        self.sync()
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        let _ = self.send(EngineCommand::Quit);
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
