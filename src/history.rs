use crate::piece::Color;
use crate::r#move::Move;
use std::fmt::{Display, Formatter};

/// Append-only list of the moves played since the start position.
/// This is exactly what the engine is fed (`position startpos moves ...`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveHistory(Vec<Move>);

impl MoveHistory {
    pub fn new() -> MoveHistory {
        MoveHistory(Vec::with_capacity(128))
    }

    pub fn push(&mut self, mv: Move) {
        self.0.push(mv)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&Move> {
        self.0.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Move> {
        self.0.iter()
    }

    /// White moves on even lengths
    pub fn side_to_move(&self) -> Color {
        if self.0.len() % 2 == 0 {
            Color::White
        } else {
            Color::Black
        }
    }
}

impl Display for MoveHistory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let moves: Vec<String> = self.0.iter().map(|m| m.to_string()).collect();
        write!(f, "{}", moves.join(" "))
    }
}
