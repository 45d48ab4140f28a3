//! Change detection
//!
//! Finds which squares changed between two pictures of the board. The image
//! work is done by an external program; this module only runs it and reads
//! its answer.

use crate::config::DetectorConfig;
use crate::error::DetectorError;
use crate::square::Square;
use crossbeam_channel::{bounded, RecvTimeoutError};
use regex::Regex;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use std::thread;
use tracing::{debug, info};

pub trait ChangeDetector {
    /// Squares that look different in `after` than in `before`. The list may
    /// hold any number of squares, noise included
    fn changed_squares(&mut self, before: &Path, after: &Path) -> Result<Vec<Square>, DetectorError>;
}

impl<D: ChangeDetector + ?Sized> ChangeDetector for &mut D {
    fn changed_squares(&mut self, before: &Path, after: &Path) -> Result<Vec<Square>, DetectorError> {
        (**self).changed_squares(before, after)
    }
}

fn tuple_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(\s*(-?\d+)\s*,\s*(-?\d+)\s*\)").unwrap())
}

fn algebraic_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b([a-h][1-8])\b").unwrap())
}

/// Reads squares out of a detector's output.
///
/// Either `(file, rank)` tuples of 0-based coordinates, as in
/// `[(4, 1), (4, 3)]`, or algebraic squares such as `e2 e4`. Tuples win if
/// both appear.
///
/// ```
/// use rookarm::detector::parse_changed_squares;
/// use rookarm::square::Square;
///
/// let squares = parse_changed_squares("[(4, 1), (4, 3)]").unwrap();
/// assert_eq!(squares, vec![Square::parse("e2"), Square::parse("e4")]);
/// assert_eq!(parse_changed_squares("e2, e4").unwrap(), squares);
/// ```
pub fn parse_changed_squares(output: &str) -> Result<Vec<Square>, DetectorError> {
    let mut squares = vec![];
    for caps in tuple_regex().captures_iter(output) {
        let file = caps[1].parse::<i32>().ok();
        let rank = caps[2].parse::<i32>().ok();
        match (file, rank) {
            (Some(f @ 0..=7), Some(r @ 0..=7)) => squares.push(Square::new(f, r)),
            _ => return Err(DetectorError::Parse(caps[0].to_string())),
        }
    }
    if squares.is_empty() {
        squares = algebraic_regex()
            .captures_iter(output)
            .map(|caps| Square::parse(&caps[1]))
            .collect();
    }
    Ok(squares)
}

/// Runs an external program as `command args.. before after` and reads the
/// squares it prints
pub struct ProcessDetector {
    config: DetectorConfig,
}

impl ProcessDetector {
    /// `None` if the configuration names no command
    pub fn new(config: &DetectorConfig) -> Option<ProcessDetector> {
        config.command.as_ref()?;
        Some(ProcessDetector {
            config: config.clone(),
        })
    }
}

impl ChangeDetector for ProcessDetector {
    fn changed_squares(&mut self, before: &Path, after: &Path) -> Result<Vec<Square>, DetectorError> {
        let command = self.config.command.clone().unwrap_or_default();
        let timeout = self.config.timeout();
        debug!("running {} on {} and {}", command, before.display(), after.display());

        let mut child = Command::new(&command)
            .args(&self.config.args)
            .arg(before)
            .arg(after)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| DetectorError::Spawn {
                command: command.clone(),
                source,
            })?;
        let (mut stdout, mut stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => (stdout, stderr),
            _ => return Err(DetectorError::Failed(String::from("no output pipes"))),
        };

        // both pipes drain at once, a child stuck writing to either one would
        // never exit
        let (sender, receiver) = bounded(1);
        thread::spawn(move || {
            let errors = thread::spawn(move || {
                let mut err = String::new();
                stderr.read_to_string(&mut err).map(|_| err)
            });
            let mut out = String::new();
            let read = stdout.read_to_string(&mut out).and_then(|_| {
                errors
                    .join()
                    .unwrap_or_else(|_| Err(io::Error::new(io::ErrorKind::Other, "stderr reader panicked")))
            });
            let _ = sender.send(read.map(|err| (out, err)));
        });

        let (out, err) = match receiver.recv_timeout(timeout) {
            Ok(read) => read?,
            Err(RecvTimeoutError::Timeout) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(DetectorError::Timeout(timeout));
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(DetectorError::Io(io::Error::from(io::ErrorKind::BrokenPipe)))
            }
        };
        let status = child.wait()?;
        if !status.success() {
            return Err(DetectorError::Failed(format!("{}: {}", status, err.trim())));
        }

        let squares = parse_changed_squares(&out)?;
        info!(
            "detector saw changes on [{}]",
            squares.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(", ")
        );
        Ok(squares)
    }
}

/// Squares typed in by the operator, for boards without a camera. `read`
/// returns one line of input
pub struct ManualDetector<F: FnMut() -> io::Result<String>> {
    read: F,
}

impl<F: FnMut() -> io::Result<String>> ManualDetector<F> {
    pub fn new(read: F) -> ManualDetector<F> {
        ManualDetector { read }
    }
}

impl<F: FnMut() -> io::Result<String>> ChangeDetector for ManualDetector<F> {
    fn changed_squares(&mut self, _: &Path, _: &Path) -> Result<Vec<Square>, DetectorError> {
        let line = (self.read)()?;
        parse_changed_squares(&line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn squares(names: &[&str]) -> Vec<Square> {
        names.iter().map(|s| Square::parse(s)).collect()
    }

    #[test]
    fn reads_tuples() {
        let out = "Reading images...\nDetecting move\n[(4, 0), (5, 0), (6, 0), (7, 0)]\n";
        assert_eq!(parse_changed_squares(out).unwrap(), squares(&["e1", "f1", "g1", "h1"]));
    }

    #[test]
    fn tuples_off_the_board_are_rejected() {
        assert!(matches!(
            parse_changed_squares("[(4, 1), (8, 3)]"),
            Err(DetectorError::Parse(_))
        ));
    }

    #[test]
    fn reads_algebraic() {
        assert_eq!(parse_changed_squares("d5 c4").unwrap(), squares(&["d5", "c4"]));
        assert_eq!(parse_changed_squares("nothing moved").unwrap(), vec![]);
    }

    #[test]
    fn manual_entry() {
        let mut lines = vec![String::from("e7 e5")].into_iter();
        let mut detector = ManualDetector::new(|| {
            lines
                .next()
                .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))
        });
        let none = Path::new("");
        assert_eq!(
            detector.changed_squares(none, none).unwrap(),
            squares(&["e7", "e5"])
        );
        assert!(matches!(
            detector.changed_squares(none, none),
            Err(DetectorError::Io(_))
        ));
    }

    #[test]
    fn no_command_no_detector() {
        assert!(ProcessDetector::new(&DetectorConfig::default()).is_none());
    }
}
