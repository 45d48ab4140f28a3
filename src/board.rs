use crate::castling::Castle;
use crate::error::BoardError;
use crate::history::MoveHistory;
use crate::piece::PieceType::{King, Pawn};
use crate::piece::{Color, Piece};
use crate::r#move::{Move, MoveFlags};
use crate::square::Square;
use std::fmt::{Display, Formatter};

pub const START_PLACEMENT: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR";

/// The tracked position of the physical board, together with the moves that
/// led to it.
/// No chess legality is checked here: the engine and the human are trusted to
/// play legal moves, the board only has to follow them
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    pieces: [Option<Piece>; 64],
    history: MoveHistory,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Creates a board in the standard starting position
    pub fn new() -> Board {
        Board::from_placement(START_PLACEMENT)
    }

    /// An empty board, mostly useful to set up positions by hand
    pub fn empty() -> Board {
        Board {
            pieces: [None; 64],
            history: MoveHistory::new(),
        }
    }

    /// Creates a board from the piece placement field of a FEN string.
    /// Unknown characters are skipped, and anything past the 8th rank or file
    /// is ignored
    pub fn from_placement(placement: &str) -> Board {
        let mut b = Board::empty();
        let mut rank: i32 = 7;
        let mut file: i32 = 0;
        for c in placement.chars() {
            if c == '/' {
                rank -= 1;
                file = 0;
            } else if let Some(d) = c.to_digit(10) {
                file += d as i32;
            } else if let Some(p) = Piece::from_char(c) {
                if (0..8).contains(&file) && (0..8).contains(&rank) {
                    b.put(p, Square::new(file, rank));
                }
                file += 1;
            }
        }
        b
    }

    /// Resets the board to the starting position and clears the history
    pub fn new_game(&mut self) {
        *self = Board::new();
    }

    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.pieces[sq.index()]
    }

    pub fn is_occupied(&self, sq: Square) -> bool {
        self.pieces[sq.index()].is_some()
    }

    /// Places a piece on a given square, returning what was there before
    pub fn put(&mut self, piece: Piece, sq: Square) -> Option<Piece> {
        self.pieces[sq.index()].replace(piece)
    }

    /// Clears the given square, returning the piece that has been removed if any
    pub fn take(&mut self, sq: Square) -> Option<Piece> {
        self.pieces[sq.index()].take()
    }

    pub fn history(&self) -> &MoveHistory {
        &self.history
    }

    pub fn side_to_move(&self) -> Color {
        self.history.side_to_move()
    }

    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| self.piece_at(sq).map(|p| (sq, p)))
    }

    /*
    MOVE FACTS
     */
    pub fn is_capture(&self, mv: &Move) -> bool {
        self.is_occupied(mv.target())
    }

    /// A king standing on its home square and moving two files along the rank
    pub fn is_castle(&self, mv: &Move) -> bool {
        self.castle(mv).is_some()
    }

    /// The castle a move performs, if any
    pub fn castle(&self, mv: &Move) -> Option<Castle> {
        let castle = Castle::from_squares(mv.origin(), mv.target())?;
        match self.piece_at(mv.origin()) {
            Some(p) if p.piece_type == King => Some(castle),
            _ => None,
        }
    }

    /// A pawn stepping diagonally onto an empty square
    pub fn is_en_passant(&self, mv: &Move) -> bool {
        matches!(self.piece_at(mv.origin()), Some(p) if p.piece_type == Pawn)
            && !self.is_occupied(mv.target())
            && mv.origin().file() != mv.target().file()
    }

    /// Square of the pawn taken en passant: the target's file, the origin's rank
    pub fn en_passant_victim(mv: &Move) -> Square {
        Square::new(mv.target().file(), mv.origin().rank())
    }

    /// Whether the claw has to be lifted over the other pieces to play the move.
    ///
    /// The claw drags a piece along the board when it isn't lifted, so any
    /// piece on the way gets knocked over. Straight moves are blocked by the
    /// squares strictly between origin and target. Diagonal moves also sweep
    /// the two orthogonal neighbours of each diagonal step, since the claw
    /// cuts the corner between them. This holds for the step into the target
    /// too, so a one-square diagonal like f1e2 is blocked by e1 or f2 even
    /// though it has no square in between. Pawns are never lifted, and
    /// anything that isn't a straight line (knight jumps) always is
    pub fn needs_lift(&self, mv: &Move) -> bool {
        if matches!(self.piece_at(mv.origin()), Some(p) if p.piece_type == Pawn) {
            return false;
        }
        self.sweep(mv.origin(), mv.target())
            .map_or(true, |swept| swept.iter().any(|sq| self.is_occupied(*sq)))
    }

    /// Squares the claw passes over going from `origin` to `target` without
    /// lifting, None if there is no straight path
    pub fn sweep(&self, origin: Square, target: Square) -> Option<Vec<Square>> {
        let df = target.file() - origin.file();
        let dr = target.rank() - origin.rank();
        let (sf, sr) = (df.signum(), dr.signum());
        let steps = df.abs().max(dr.abs());

        let mut swept = Vec::new();
        if df == 0 || dr == 0 {
            for t in 1..steps {
                swept.extend(origin.offset(sf * t, sr * t));
            }
        } else if df.abs() == dr.abs() {
            let mut current = origin;
            for t in 1..=steps {
                // Corners cut while stepping from `current` to the next square
                swept.extend(current.offset(sf, 0));
                swept.extend(current.offset(0, sr));
                if t < steps {
                    swept.extend(origin.offset(sf * t, sr * t));
                }
                current = Square::new(origin.file() + sf * t, origin.rank() + sr * t);
            }
        } else {
            return None;
        }
        swept.retain(|sq| *sq != origin && *sq != target);
        swept.sort();
        swept.dedup();
        Some(swept)
    }

    /// Computes every flag of a move against the current position
    pub fn flags(&self, mv: &Move) -> MoveFlags {
        MoveFlags {
            is_capture: self.is_capture(mv),
            is_castle: self.is_castle(mv),
            is_en_passant: self.is_en_passant(mv),
            needs_lift: self.needs_lift(mv),
        }
    }

    /// Plays a move on the board, returning its flags as computed before it
    /// was played.
    /// Whatever stands on the target is overwritten. Castling also moves the
    /// rook, en passant removes the pawn that was passed, and promotions swap
    /// the moved piece's type
    pub fn apply(&mut self, mv: Move) -> Result<MoveFlags, BoardError> {
        let moved = self.piece_at(mv.origin()).ok_or(BoardError::IllegalMove {
            mv,
            square: mv.origin(),
        })?;
        let flags = self.flags(&mv);
        let castle = self.castle(&mv);

        self.take(mv.origin());
        let placed = match mv.promotion() {
            Some(p) => Piece::new(p, moved.color),
            None => moved,
        };
        self.put(placed, mv.target());

        if let Some(c) = castle {
            if let Some(rook) = self.take(c.rook_home()) {
                self.put(rook, c.rook_target());
            }
        }
        if flags.is_en_passant {
            self.take(Self::en_passant_victim(&mv));
        }

        self.history.push(mv);
        Ok(flags)
    }

    /// Parses and plays a move given in long algebraic notation.
    /// Malformed strings fall back to their first two squares, with the usual
    /// clamping
    pub fn apply_str(&mut self, move_str: &str) -> Result<MoveFlags, BoardError> {
        let mv = Move::parse(move_str).unwrap_or_else(|| {
            let origin = Square::parse(move_str.get(0..2).unwrap_or(""));
            let target = Square::parse(move_str.get(2..4).unwrap_or(""));
            Move::new(origin, target)
        });
        self.apply(mv)
    }

    pub fn placement(&self) -> String {
        let mut placement = String::new();
        for rank in (0..8).rev() {
            let mut empty_counter = 0;
            for file in 0..8 {
                match self.piece_at(Square::new(file, rank)) {
                    Some(p) => {
                        if empty_counter != 0 {
                            placement.push_str(&empty_counter.to_string())
                        }
                        empty_counter = 0;
                        placement.push(p.to_char())
                    }
                    None => empty_counter += 1,
                }
            }
            if empty_counter != 0 {
                placement.push_str(&empty_counter.to_string())
            }
            if rank != 0 {
                placement.push('/')
            }
        }
        placement
    }
}

impl Display for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "moves {}", self.history)?;
        for rank in (0..8).rev() {
            let mut line = String::new();
            for file in 0..8 {
                match self.piece_at(Square::new(file, rank)) {
                    None => line.push_str(". "),
                    Some(p) => {
                        line.push(p.to_char());
                        line.push(' ')
                    }
                }
            }
            writeln!(f, "{} {}", rank + 1, line.trim_end())?;
        }
        write!(f, "  a b c d e f g h")
    }
}
