use serde::{Deserialize, Serialize};

use crate::piece::{Color, Piece, PieceType};

pub(crate) const KNIGHT_OFFSETS: [(i32, i32); 8] = [
    (-2, -1),
    (-2, 1),
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
    (2, -1),
    (2, 1),
];

pub(crate) const DIAGONAL_DIRS: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
pub(crate) const ORTHOGONAL_DIRS: [(i32, i32); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

/// The 8x8 piece grid. Row 0 is rank 8 (black's back rank in the standard
/// setup), row 7 is rank 1. A square is either empty or holds one piece.
///
/// The board is a plain value: game-level facts (whose turn it is, castling
/// rights, clocks) live on `GameState`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Board {
    pub squares: [[Option<Piece>; 8]; 8],
}

impl Board {
    pub fn empty() -> Self {
        Board {
            squares: [[None; 8]; 8],
        }
    }

    pub(crate) fn in_bounds(row: i32, col: i32) -> bool {
        (0..8).contains(&row) && (0..8).contains(&col)
    }

    pub fn find_king(&self, color: Color) -> Option<(usize, usize)> {
        for r in 0..8 {
            for c in 0..8 {
                if let Some(p) = self.squares[r][c] {
                    if p.kind == PieceType::King && p.color == color {
                        return Some((r, c));
                    }
                }
            }
        }
        None
    }

    /// Raw geometric attack test: could any piece of `attacker` capture on
    /// `(row, col)`? Ignores whose turn it is and ignores check.
    pub fn is_square_attacked_by(&self, row: usize, col: usize, attacker: Color) -> bool {
        // Pawn attacks. White pawns advance toward row 0, so a white pawn
        // attacking this square sits one row below it.
        let advance: i32 = if attacker == Color::White { -1 } else { 1 };
        let pawn_row = row as i32 - advance;
        for dc in &[-1i32, 1] {
            let pc = col as i32 + dc;
            if Self::in_bounds(pawn_row, pc) {
                if let Some(p) = self.squares[pawn_row as usize][pc as usize] {
                    if p.color == attacker && p.kind == PieceType::Pawn {
                        return true;
                    }
                }
            }
        }

        for (dr, dc) in &KNIGHT_OFFSETS {
            let r = row as i32 + dr;
            let c = col as i32 + dc;
            if Self::in_bounds(r, c) {
                if let Some(p) = self.squares[r as usize][c as usize] {
                    if p.color == attacker && p.kind == PieceType::Knight {
                        return true;
                    }
                }
            }
        }

        for dr in -1..=1 {
            for dc in -1..=1 {
                if dr == 0 && dc == 0 {
                    continue;
                }
                let r = row as i32 + dr;
                let c = col as i32 + dc;
                if Self::in_bounds(r, c) {
                    if let Some(p) = self.squares[r as usize][c as usize] {
                        if p.color == attacker && p.kind == PieceType::King {
                            return true;
                        }
                    }
                }
            }
        }

        // Sliding attacks: walk each ray until the first piece; only that
        // piece can attack along the ray, whatever its color.
        for (dr, dc) in &DIAGONAL_DIRS {
            let mut r = row as i32 + dr;
            let mut c = col as i32 + dc;
            while Self::in_bounds(r, c) {
                if let Some(p) = self.squares[r as usize][c as usize] {
                    if p.color == attacker
                        && (p.kind == PieceType::Bishop || p.kind == PieceType::Queen)
                    {
                        return true;
                    }
                    break;
                }
                r += dr;
                c += dc;
            }
        }

        for (dr, dc) in &ORTHOGONAL_DIRS {
            let mut r = row as i32 + dr;
            let mut c = col as i32 + dc;
            while Self::in_bounds(r, c) {
                if let Some(p) = self.squares[r as usize][c as usize] {
                    if p.color == attacker
                        && (p.kind == PieceType::Rook || p.kind == PieceType::Queen)
                    {
                        return true;
                    }
                    break;
                }
                r += dr;
                c += dc;
            }
        }

        false
    }

    /// Canonical position key used for repetition counting: 64 characters in
    /// row-major order, `.` for empty, piece letter otherwise. Deliberately
    /// omits side to move, castling rights and en passant availability,
    /// matching the original game's repetition bookkeeping.
    pub fn position_key(&self) -> String {
        let mut key = String::with_capacity(64);
        for row in &self.squares {
            for square in row {
                match square {
                    Some(p) => key.push(p.to_char()),
                    None => key.push('.'),
                }
            }
        }
        key
    }
}
