use std::collections::HashMap;
use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::moves::Move;
use crate::piece::{Color, Piece, PieceType};

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Castling bookkeeping as six independent "has moved" flags. A rook counts
/// as moved once it leaves its home square *or* is captured there; either way
/// that side's castling right is gone for the rest of the game.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct CastlingFlags {
    pub white_king_moved: bool,
    pub white_queenside_rook_moved: bool,
    pub white_kingside_rook_moved: bool,
    pub black_king_moved: bool,
    pub black_queenside_rook_moved: bool,
    pub black_kingside_rook_moved: bool,
}

/// How a finished game ended.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Outcome {
    Checkmate { winner: Color },
    Stalemate,
    FiftyMoveRule,
    InsufficientMaterial,
    ThreefoldRepetition,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Checkmate {
                winner: Color::White,
            } => write!(f, "Checkmate! White wins."),
            Outcome::Checkmate {
                winner: Color::Black,
            } => write!(f, "Checkmate! Black wins."),
            Outcome::Stalemate => write!(f, "Stalemate! It's a draw."),
            Outcome::FiftyMoveRule => write!(f, "Draw by 50-move rule."),
            Outcome::InsufficientMaterial => write!(f, "Draw by insufficient material."),
            Outcome::ThreefoldRepetition => write!(f, "Draw by threefold repetition."),
        }
    }
}

/// The full game position: board, side to move, castling flags, en passant
/// target, clocks, move history and repetition counts.
///
/// Undo is replay-based: the state remembers the FEN it was created from and
/// rebuilds itself by reapplying all but the last history entry. O(history)
/// per undo, which is fine for a human-triggered operation, and it cannot
/// drift out of sync with rights, clocks or repetition counts.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct GameState {
    pub board: Board,
    pub turn: Color,
    pub castling: CastlingFlags,
    pub en_passant_target: Option<(usize, usize)>,
    pub history: Vec<Move>,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
    pub position_counts: HashMap<String, u32>,
    pub initial_fen: String,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_square(s: &str) -> Option<(usize, usize)> {
    let bytes = s.as_bytes();
    if bytes.len() != 2 {
        return None;
    }
    let col = bytes[0].checked_sub(b'a')? as usize;
    let row = b'8'.checked_sub(bytes[1])? as usize;
    if col > 7 || row > 7 {
        return None;
    }
    Some((row, col))
}

fn square_name((row, col): (usize, usize)) -> String {
    let file = (b'a' + col as u8) as char;
    let rank = (b'8' - row as u8) as char;
    format!("{file}{rank}")
}

impl GameState {
    /// Standard starting position.
    pub fn new() -> Self {
        Self::from_fen(START_FEN)
    }

    /// Load a position from a FEN-style description.
    ///
    /// Parsing is deliberately permissive: missing fields take their defaults
    /// (white to move, no rights, no en passant, clock 0, move 1) and
    /// unrecognized placement characters count as a single empty square. The
    /// input string is kept verbatim as the restart point for undo; history
    /// and repetition counts start empty.
    pub fn from_fen(fen: &str) -> Self {
        let mut state = GameState {
            board: Board::empty(),
            turn: Color::White,
            castling: CastlingFlags {
                white_king_moved: true,
                white_queenside_rook_moved: true,
                white_kingside_rook_moved: true,
                black_king_moved: true,
                black_queenside_rook_moved: true,
                black_kingside_rook_moved: true,
            },
            en_passant_target: None,
            history: Vec::new(),
            halfmove_clock: 0,
            fullmove_number: 1,
            position_counts: HashMap::new(),
            initial_fen: fen.to_string(),
        };

        let mut fields = fen.split_whitespace();

        if let Some(placement) = fields.next() {
            for (row, rank) in placement.split('/').take(8).enumerate() {
                let mut col = 0usize;
                for ch in rank.chars() {
                    if col >= 8 {
                        break;
                    }
                    if let Some(run) = ch.to_digit(10) {
                        col += run as usize;
                    } else if let Some(piece) = Piece::from_char(ch) {
                        state.board.squares[row][col] = Some(piece);
                        col += 1;
                    } else {
                        col += 1;
                    }
                }
            }
        }

        if let Some(side) = fields.next() {
            state.turn = if side == "b" { Color::Black } else { Color::White };
        }

        let rights = fields.next().unwrap_or("-");
        state.castling = CastlingFlags {
            white_king_moved: !rights.contains('K') && !rights.contains('Q'),
            white_kingside_rook_moved: !rights.contains('K'),
            white_queenside_rook_moved: !rights.contains('Q'),
            black_king_moved: !rights.contains('k') && !rights.contains('q'),
            black_kingside_rook_moved: !rights.contains('k'),
            black_queenside_rook_moved: !rights.contains('q'),
        };

        state.en_passant_target = fields.next().and_then(parse_square);
        state.halfmove_clock = fields.next().and_then(|f| f.parse().ok()).unwrap_or(0);
        state.fullmove_number = fields.next().and_then(|f| f.parse().ok()).unwrap_or(1);

        state
    }

    /// Export the current position as a FEN string.
    pub fn to_fen(&self) -> String {
        let mut placement = String::new();
        for (r, row) in self.board.squares.iter().enumerate() {
            if r > 0 {
                placement.push('/');
            }
            let mut run = 0u32;
            for square in row {
                match square {
                    Some(piece) => {
                        if run > 0 {
                            placement.push(char::from_digit(run, 10).unwrap_or('8'));
                            run = 0;
                        }
                        placement.push(piece.to_char());
                    }
                    None => run += 1,
                }
            }
            if run > 0 {
                placement.push(char::from_digit(run, 10).unwrap_or('8'));
            }
        }

        let side = match self.turn {
            Color::White => 'w',
            Color::Black => 'b',
        };

        let mut rights = String::new();
        if !self.castling.white_king_moved && !self.castling.white_kingside_rook_moved {
            rights.push('K');
        }
        if !self.castling.white_king_moved && !self.castling.white_queenside_rook_moved {
            rights.push('Q');
        }
        if !self.castling.black_king_moved && !self.castling.black_kingside_rook_moved {
            rights.push('k');
        }
        if !self.castling.black_king_moved && !self.castling.black_queenside_rook_moved {
            rights.push('q');
        }
        if rights.is_empty() {
            rights.push('-');
        }

        let en_passant = self
            .en_passant_target
            .map(square_name)
            .unwrap_or_else(|| "-".to_string());

        format!(
            "{placement} {side} {rights} {en_passant} {} {}",
            self.halfmove_clock, self.fullmove_number
        )
    }

    /// Is `color`'s king attacked? A position with no king of that color
    /// counts as in check so a corrupted setup can never loop or panic.
    pub fn in_check(&self, color: Color) -> bool {
        match self.board.find_king(color) {
            Some((row, col)) => self.board.is_square_attacked_by(row, col, color.opposite()),
            None => true,
        }
    }

    /// Apply `mv` in place. The move must come from the current legal move
    /// list; no re-validation happens here and an illegal move leaves the
    /// state undefined.
    pub fn apply_move(&mut self, mv: &Move) {
        let piece = match self.board.squares[mv.from.0][mv.from.1] {
            Some(p) => p,
            None => return,
        };

        if piece.kind == PieceType::Pawn || mv.captured.is_some() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }

        if mv.is_castle {
            self.board.squares[mv.to.0][mv.to.1] = Some(piece);
            self.board.squares[mv.from.0][mv.from.1] = None;
            let rank = mv.to.0;
            if mv.to.1 == 6 {
                self.board.squares[rank][5] = self.board.squares[rank][7];
                self.board.squares[rank][7] = None;
            } else {
                self.board.squares[rank][3] = self.board.squares[rank][0];
                self.board.squares[rank][0] = None;
            }
        } else {
            if mv.is_en_passant {
                // The captured pawn sits beside the mover, not on `to`.
                self.board.squares[mv.from.0][mv.to.1] = None;
            }
            self.board.squares[mv.to.0][mv.to.1] = Some(piece);
            self.board.squares[mv.from.0][mv.from.1] = None;
            if let Some(kind) = mv.promotion {
                self.board.squares[mv.to.0][mv.to.1] = Some(Piece::new(kind, piece.color));
            }
        }

        if piece.kind == PieceType::King {
            match piece.color {
                Color::White => self.castling.white_king_moved = true,
                Color::Black => self.castling.black_king_moved = true,
            }
        }
        if piece.kind == PieceType::Rook {
            match (piece.color, mv.from) {
                (Color::White, (7, 0)) => self.castling.white_queenside_rook_moved = true,
                (Color::White, (7, 7)) => self.castling.white_kingside_rook_moved = true,
                (Color::Black, (0, 0)) => self.castling.black_queenside_rook_moved = true,
                (Color::Black, (0, 7)) => self.castling.black_kingside_rook_moved = true,
                _ => {}
            }
        }
        // A rook captured on its home square loses the right too, even
        // though the rook itself never moved.
        if let Some(captured) = mv.captured {
            if captured.kind == PieceType::Rook {
                match mv.to {
                    (0, 0) => self.castling.black_queenside_rook_moved = true,
                    (0, 7) => self.castling.black_kingside_rook_moved = true,
                    (7, 0) => self.castling.white_queenside_rook_moved = true,
                    (7, 7) => self.castling.white_kingside_rook_moved = true,
                    _ => {}
                }
            }
        }

        if piece.kind == PieceType::Pawn && mv.from.0.abs_diff(mv.to.0) == 2 {
            self.en_passant_target = Some(((mv.from.0 + mv.to.0) / 2, mv.from.1));
        } else {
            self.en_passant_target = None;
        }

        if self.turn == Color::Black {
            self.fullmove_number += 1;
        }
        self.history.push(mv.clone());
        self.turn = self.turn.opposite();

        *self
            .position_counts
            .entry(self.board.position_key())
            .or_insert(0) += 1;
    }

    /// Take back the last move by rebuilding from the starting description
    /// and replaying everything else. No-op when there is nothing to undo.
    pub fn undo_move(&mut self) {
        if self.history.is_empty() {
            return;
        }
        let mut replay = self.history.clone();
        replay.pop();
        let mut fresh = GameState::from_fen(&self.initial_fen);
        for mv in &replay {
            fresh.apply_move(mv);
        }
        *self = fresh;
    }

    /// Decide whether the game has ended, checking conditions in a fixed
    /// order: mate/stalemate, fifty-move rule, insufficient material,
    /// threefold repetition.
    pub fn check_game_over(&self) -> Option<Outcome> {
        if self.generate_legal().is_empty() {
            let outcome = if self.in_check(self.turn) {
                Outcome::Checkmate {
                    winner: self.turn.opposite(),
                }
            } else {
                Outcome::Stalemate
            };
            debug!("game over: {outcome}");
            return Some(outcome);
        }
        if self.halfmove_clock >= 100 {
            debug!("game over: {}", Outcome::FiftyMoveRule);
            return Some(Outcome::FiftyMoveRule);
        }
        if !self.has_sufficient_material() {
            debug!("game over: {}", Outcome::InsufficientMaterial);
            return Some(Outcome::InsufficientMaterial);
        }
        let occurrences = self
            .position_counts
            .get(&self.board.position_key())
            .copied()
            .unwrap_or(0);
        if occurrences >= 3 {
            debug!("game over: {}", Outcome::ThreefoldRepetition);
            return Some(Outcome::ThreefoldRepetition);
        }
        None
    }

    /// Can either side still force mate? Draws: bare kings, a lone minor
    /// piece, or one bishop each on same-colored squares. Anything else
    /// (including two knights) counts as sufficient.
    fn has_sufficient_material(&self) -> bool {
        let mut white_knights = 0u32;
        let mut white_bishops = 0u32;
        let mut black_knights = 0u32;
        let mut black_bishops = 0u32;
        let mut white_bishop_shade = 0usize;
        let mut black_bishop_shade = 0usize;

        for r in 0..8 {
            for c in 0..8 {
                let Some(piece) = self.board.squares[r][c] else {
                    continue;
                };
                match (piece.kind, piece.color) {
                    (PieceType::Queen | PieceType::Rook | PieceType::Pawn, _) => return true,
                    (PieceType::Knight, Color::White) => white_knights += 1,
                    (PieceType::Knight, Color::Black) => black_knights += 1,
                    (PieceType::Bishop, Color::White) => {
                        white_bishops += 1;
                        white_bishop_shade = (r + c) % 2;
                    }
                    (PieceType::Bishop, Color::Black) => {
                        black_bishops += 1;
                        black_bishop_shade = (r + c) % 2;
                    }
                    _ => {}
                }
            }
        }

        let white_minors = white_knights + white_bishops;
        let black_minors = black_knights + black_bishops;

        if white_minors == 0 && black_minors == 0 {
            return false;
        }
        if white_minors == 1 && black_minors == 0 {
            return false;
        }
        if black_minors == 1 && white_minors == 0 {
            return false;
        }
        if white_knights == 0
            && black_knights == 0
            && white_bishops == 1
            && black_bishops == 1
            && white_bishop_shade == black_bishop_shade
        {
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply_uci(state: &mut GameState, uci: &str) {
        let mv = state
            .legal_move_from_uci(uci)
            .unwrap_or_else(|| panic!("{uci} should be legal"));
        state.apply_move(&mv);
    }

    #[test]
    fn fools_mate_is_checkmate_for_black() {
        let mut state = GameState::new();
        for uci in ["f2f3", "e7e5", "g2g4", "d8h4"] {
            apply_uci(&mut state, uci);
        }
        assert!(state.generate_legal().is_empty());
        assert_eq!(
            state.check_game_over(),
            Some(Outcome::Checkmate {
                winner: Color::Black
            })
        );
    }

    #[test]
    fn fifty_move_rule_after_knight_shuffle() {
        let mut state = GameState::new();
        for _ in 0..25 {
            for uci in ["g1f3", "g8f6", "f3g1", "f6g8"] {
                apply_uci(&mut state, uci);
            }
        }
        assert_eq!(state.halfmove_clock, 100);
        assert_eq!(state.check_game_over(), Some(Outcome::FiftyMoveRule));
    }

    #[test]
    fn threefold_repetition_needs_three_occurrences() {
        let mut state = GameState::new();
        for _ in 0..2 {
            for uci in ["g1f3", "g8f6", "f3g1", "f6g8"] {
                apply_uci(&mut state, uci);
            }
        }
        // The starting placement has only recurred twice so far.
        assert_eq!(state.check_game_over(), None);
        for uci in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            apply_uci(&mut state, uci);
        }
        assert_eq!(state.check_game_over(), Some(Outcome::ThreefoldRepetition));
    }

    #[test]
    fn bare_kings_draw_immediately() {
        let state = GameState::from_fen("8/8/8/4k3/8/4K3/8/8 w - - 0 1");
        assert_eq!(state.check_game_over(), Some(Outcome::InsufficientMaterial));
    }

    #[test]
    fn lone_minor_piece_cannot_mate() {
        let knight = GameState::from_fen("8/8/8/4k3/8/4K3/8/6N1 w - - 0 1");
        assert_eq!(
            knight.check_game_over(),
            Some(Outcome::InsufficientMaterial)
        );
        let bishop = GameState::from_fen("8/8/8/4k3/8/4K3/8/5B2 b - - 0 1");
        assert_eq!(
            bishop.check_game_over(),
            Some(Outcome::InsufficientMaterial)
        );
    }

    #[test]
    fn same_shade_bishops_draw_opposite_shades_do_not() {
        // Bc1 and be1 both stand on dark squares.
        let same = GameState::from_fen("8/8/8/4k3/8/4K3/8/2B1b3 w - - 0 1");
        assert_eq!(same.check_game_over(), Some(Outcome::InsufficientMaterial));

        // Bc1 is dark, bf1 is light: mate can still be forced in theory.
        let opposite = GameState::from_fen("8/8/8/4k3/8/4K3/8/2B2b2 w - - 0 1");
        assert_eq!(opposite.check_game_over(), None);
    }

    #[test]
    fn two_knights_count_as_sufficient() {
        let state = GameState::from_fen("8/8/8/4k3/8/4K3/8/5NN1 w - - 0 1");
        assert_eq!(state.check_game_over(), None);
    }

    #[test]
    fn stalemate_detected() {
        let state = GameState::from_fen("k7/8/1Q6/8/8/8/8/7K b - - 0 1");
        assert!(!state.in_check(Color::Black));
        assert_eq!(state.check_game_over(), Some(Outcome::Stalemate));
    }

    #[test]
    fn undo_equals_replay_of_all_but_last() {
        let mut played = GameState::new();
        for uci in ["e2e4", "e7e5", "g1f3"] {
            apply_uci(&mut played, uci);
        }
        played.undo_move();

        let mut reference = GameState::new();
        for uci in ["e2e4", "e7e5"] {
            apply_uci(&mut reference, uci);
        }
        assert_eq!(played, reference);
    }

    #[test]
    fn undo_restarts_from_the_loaded_fen() {
        let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";
        let mut played = GameState::from_fen(fen);
        apply_uci(&mut played, "e1g1");
        apply_uci(&mut played, "e8c8");
        played.undo_move();

        let mut reference = GameState::from_fen(fen);
        apply_uci(&mut reference, "e1g1");
        assert_eq!(played, reference);
    }

    #[test]
    fn undo_on_fresh_state_is_a_no_op() {
        let mut state = GameState::new();
        state.undo_move();
        assert_eq!(state, GameState::new());
    }

    #[test]
    fn castling_relocates_the_rook() {
        let mut state = GameState::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        apply_uci(&mut state, "e1g1");
        assert_eq!(
            state.board.squares[7][6],
            Some(Piece::new(PieceType::King, Color::White))
        );
        assert_eq!(
            state.board.squares[7][5],
            Some(Piece::new(PieceType::Rook, Color::White))
        );
        assert_eq!(state.board.squares[7][4], None);
        assert_eq!(state.board.squares[7][7], None);
        assert!(state.castling.white_king_moved);
    }

    #[test]
    fn en_passant_removes_the_bypassed_pawn() {
        let mut state = GameState::new();
        for uci in ["e2e4", "a7a6", "e4e5", "d7d5"] {
            apply_uci(&mut state, uci);
        }
        assert_eq!(state.en_passant_target, Some((2, 3)));

        let mv = state.legal_move_from_uci("e5d6").expect("en passant legal");
        assert!(mv.is_en_passant);
        state.apply_move(&mv);
        assert_eq!(
            state.board.squares[2][3],
            Some(Piece::new(PieceType::Pawn, Color::White))
        );
        assert_eq!(state.board.squares[3][3], None);
    }

    #[test]
    fn rook_captured_on_home_square_loses_the_right() {
        let mut state = GameState::from_fen("r3k3/8/8/8/8/8/8/R3K3 w Qq - 0 1");
        apply_uci(&mut state, "a1a8");
        assert!(state.castling.black_queenside_rook_moved);
        assert!(state.castling.white_queenside_rook_moved);
    }

    #[test]
    fn fullmove_number_increments_after_black() {
        let mut state = GameState::new();
        apply_uci(&mut state, "e2e4");
        assert_eq!(state.fullmove_number, 1);
        apply_uci(&mut state, "e7e5");
        assert_eq!(state.fullmove_number, 2);
    }

    #[test]
    fn halfmove_clock_resets_on_pawn_moves_and_captures() {
        let mut state = GameState::new();
        apply_uci(&mut state, "g1f3");
        assert_eq!(state.halfmove_clock, 1);
        apply_uci(&mut state, "b8c6");
        assert_eq!(state.halfmove_clock, 2);
        apply_uci(&mut state, "f3e5");
        assert_eq!(state.halfmove_clock, 3);
        apply_uci(&mut state, "c6e5");
        // Knight takes knight: capture resets the clock.
        assert_eq!(state.halfmove_clock, 0);
        apply_uci(&mut state, "d2d4");
        // Pawn move: reset again even without a capture.
        assert_eq!(state.halfmove_clock, 0);
    }

    #[test]
    fn fen_round_trip_preserves_the_legal_move_set() {
        let kiwipete = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        let loaded = GameState::from_fen(kiwipete);
        let reloaded = GameState::from_fen(&loaded.to_fen());

        let mut a: Vec<String> = loaded.generate_legal().iter().map(|m| m.to_uci()).collect();
        let mut b: Vec<String> = reloaded
            .generate_legal()
            .iter()
            .map(|m| m.to_uci())
            .collect();
        a.sort();
        b.sort();
        assert_eq!(a, b);
        assert_eq!(loaded.board.position_key(), reloaded.board.position_key());
    }

    #[test]
    fn start_fen_round_trips_exactly() {
        assert_eq!(GameState::new().to_fen(), START_FEN);
    }

    #[test]
    fn permissive_parsing_defaults_missing_fields() {
        let bare = GameState::from_fen("8/8/8/8/8/8/8/4K2k");
        assert_eq!(bare.turn, Color::White);
        assert_eq!(bare.halfmove_clock, 0);
        assert_eq!(bare.fullmove_number, 1);
        assert_eq!(bare.en_passant_target, None);
        assert!(bare.castling.white_king_moved);

        let empty = GameState::from_fen("");
        assert_eq!(empty.board.find_king(Color::White), None);

        // Unknown placement characters count as empty squares.
        let junk = GameState::from_fen("xxxxxxxx/8/8/8/8/8/8/8 b");
        assert_eq!(junk.board.position_key(), ".".repeat(64));
        assert_eq!(junk.turn, Color::Black);
    }

    #[test]
    fn missing_king_counts_as_check() {
        let state = GameState::from_fen("8/8/8/8/8/8/8/8 w - - 0 1");
        assert!(state.in_check(Color::White));
        assert!(state.in_check(Color::Black));
    }

    #[test]
    fn fifty_move_clock_from_fen_is_honored() {
        let state = GameState::from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 100 32");
        assert_eq!(state.check_game_over(), Some(Outcome::FiftyMoveRule));
    }
}
