use serde::{Deserialize, Serialize};

use crate::piece::{Piece, PieceType};

/// A board transition. `captured` snapshots the taken piece so a position can
/// be replayed without re-deriving it; for en passant it holds the captured
/// pawn even though that pawn does not sit on `to`. Castling is encoded as
/// the two-square king move; the rook relocation happens during application.
///
/// Coordinates are `(row, col)` with row 0 = rank 8 and col 0 = the a-file.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Move {
    pub from: (usize, usize),
    pub to: (usize, usize),
    pub captured: Option<Piece>,
    pub is_en_passant: bool,
    pub is_castle: bool,
    pub promotion: Option<PieceType>,
}

impl Move {
    pub fn quiet(from: (usize, usize), to: (usize, usize)) -> Move {
        Move {
            from,
            to,
            captured: None,
            is_en_passant: false,
            is_castle: false,
            promotion: None,
        }
    }

    pub fn capture(from: (usize, usize), to: (usize, usize), captured: Piece) -> Move {
        Move {
            captured: Some(captured),
            ..Move::quiet(from, to)
        }
    }

    /// Convert to UCI notation, e.g. "e2e4", "a7a8q"
    pub fn to_uci(&self) -> String {
        let fc = (b'a' + self.from.1 as u8) as char;
        let fr = (b'8' - self.from.0 as u8) as char;
        let tc = (b'a' + self.to.1 as u8) as char;
        let tr = (b'8' - self.to.0 as u8) as char;
        let promo = match self.promotion {
            Some(PieceType::Queen) => "q",
            Some(PieceType::Rook) => "r",
            Some(PieceType::Bishop) => "b",
            Some(PieceType::Knight) => "n",
            _ => "",
        };
        format!("{fc}{fr}{tc}{tr}{promo}")
    }

    /// Parse from UCI notation. Only coordinates and the promotion kind are
    /// recoverable from the text; capture and castling flags are filled in by
    /// matching against the legal move list (`GameState::legal_move_from_uci`).
    pub fn from_uci(s: &str) -> Option<Move> {
        let bytes = s.as_bytes();
        if bytes.len() < 4 {
            return None;
        }
        let fc = bytes[0].checked_sub(b'a')? as usize;
        let fr = b'8'.checked_sub(bytes[1])? as usize;
        let tc = bytes[2].checked_sub(b'a')? as usize;
        let tr = b'8'.checked_sub(bytes[3])? as usize;
        if fc > 7 || fr > 7 || tc > 7 || tr > 7 {
            return None;
        }
        let promotion = if bytes.len() > 4 {
            match bytes[4] {
                b'q' => Some(PieceType::Queen),
                b'r' => Some(PieceType::Rook),
                b'b' => Some(PieceType::Bishop),
                b'n' => Some(PieceType::Knight),
                _ => None,
            }
        } else {
            None
        };
        let mut mv = Move::quiet((fr, fc), (tr, tc));
        mv.promotion = promotion;
        Some(mv)
    }
}
