use crate::board::{Board, DIAGONAL_DIRS, KNIGHT_OFFSETS, ORTHOGONAL_DIRS};
use crate::moves::Move;
use crate::piece::{Color, PieceType};
use crate::state::GameState;

/// Promotion choices in generation order. Keeping queen first means the
/// search's first-best tie-break prefers it.
const PROMOTION_KINDS: [PieceType; 4] = [
    PieceType::Queen,
    PieceType::Rook,
    PieceType::Bishop,
    PieceType::Knight,
];

impl GameState {
    /// Every move consistent with piece movement rules for the side to move,
    /// ignoring whether it exposes the mover's own king. Castling safety is
    /// the exception: its transit squares are attack-checked here because
    /// the legality filter cannot see intermediate king positions.
    pub fn generate_pseudo_legal(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        for row in 0..8usize {
            for col in 0..8usize {
                let Some(piece) = self.board.squares[row][col] else {
                    continue;
                };
                if piece.color != self.turn {
                    continue;
                }
                match piece.kind {
                    PieceType::Pawn => self.pawn_moves(row, col, piece.color, &mut moves),
                    PieceType::Knight => self.knight_moves(row, col, piece.color, &mut moves),
                    PieceType::Bishop => {
                        self.sliding_moves(row, col, piece.color, &DIAGONAL_DIRS, &mut moves)
                    }
                    PieceType::Rook => {
                        self.sliding_moves(row, col, piece.color, &ORTHOGONAL_DIRS, &mut moves)
                    }
                    PieceType::Queen => {
                        self.sliding_moves(row, col, piece.color, &DIAGONAL_DIRS, &mut moves);
                        self.sliding_moves(row, col, piece.color, &ORTHOGONAL_DIRS, &mut moves);
                    }
                    PieceType::King => self.king_moves(row, col, piece.color, &mut moves),
                }
            }
        }
        moves
    }

    /// Pseudo-legal moves minus those that leave the mover's own king
    /// attacked. The single source of truth for move legality.
    pub fn generate_legal(&self) -> Vec<Move> {
        self.generate_pseudo_legal()
            .into_iter()
            .filter(|mv| {
                let mut copy = self.clone();
                copy.apply_move(mv);
                !copy.in_check(self.turn)
            })
            .collect()
    }

    /// Look up the legal move matching a UCI string, with all capture and
    /// castling flags filled in. `None` when no such move is legal.
    pub fn legal_move_from_uci(&self, uci: &str) -> Option<Move> {
        let wanted = Move::from_uci(uci)?;
        self.generate_legal()
            .into_iter()
            .find(|m| m.from == wanted.from && m.to == wanted.to && m.promotion == wanted.promotion)
    }

    fn pawn_moves(&self, row: usize, col: usize, color: Color, moves: &mut Vec<Move>) {
        let (dir, start_row, promo_row): (i32, usize, usize) = match color {
            Color::White => (-1, 6, 0),
            Color::Black => (1, 1, 7),
        };
        let forward = row as i32 + dir;

        // Pushes
        if Board::in_bounds(forward, col as i32) && self.board.squares[forward as usize][col].is_none()
        {
            let to = (forward as usize, col);
            if to.0 == promo_row {
                for kind in PROMOTION_KINDS {
                    let mut mv = Move::quiet((row, col), to);
                    mv.promotion = Some(kind);
                    moves.push(mv);
                }
            } else {
                moves.push(Move::quiet((row, col), to));
                if row == start_row {
                    let double = forward + dir;
                    if Board::in_bounds(double, col as i32)
                        && self.board.squares[double as usize][col].is_none()
                    {
                        moves.push(Move::quiet((row, col), (double as usize, col)));
                    }
                }
            }
        }

        // Diagonal captures
        for dc in [-1i32, 1] {
            let nc = col as i32 + dc;
            if !Board::in_bounds(forward, nc) {
                continue;
            }
            let to = (forward as usize, nc as usize);
            let Some(target) = self.board.squares[to.0][to.1] else {
                continue;
            };
            if target.color == color {
                continue;
            }
            if to.0 == promo_row {
                for kind in PROMOTION_KINDS {
                    let mut mv = Move::capture((row, col), to, target);
                    mv.promotion = Some(kind);
                    moves.push(mv);
                }
            } else {
                moves.push(Move::capture((row, col), to, target));
            }
        }

        // En passant: the captured pawn sits beside us on our own row.
        if let Some((er, ec)) = self.en_passant_target {
            if forward == er as i32 && col.abs_diff(ec) == 1 {
                let mut mv = Move::quiet((row, col), (er, ec));
                mv.captured = self.board.squares[row][ec];
                mv.is_en_passant = true;
                moves.push(mv);
            }
        }
    }

    fn knight_moves(&self, row: usize, col: usize, color: Color, moves: &mut Vec<Move>) {
        for (dr, dc) in &KNIGHT_OFFSETS {
            let r = row as i32 + dr;
            let c = col as i32 + dc;
            if !Board::in_bounds(r, c) {
                continue;
            }
            let to = (r as usize, c as usize);
            match self.board.squares[to.0][to.1] {
                None => moves.push(Move::quiet((row, col), to)),
                Some(p) if p.color != color => moves.push(Move::capture((row, col), to, p)),
                Some(_) => {}
            }
        }
    }

    fn sliding_moves(
        &self,
        row: usize,
        col: usize,
        color: Color,
        directions: &[(i32, i32)],
        moves: &mut Vec<Move>,
    ) {
        for (dr, dc) in directions {
            let mut r = row as i32 + dr;
            let mut c = col as i32 + dc;
            while Board::in_bounds(r, c) {
                let to = (r as usize, c as usize);
                match self.board.squares[to.0][to.1] {
                    None => moves.push(Move::quiet((row, col), to)),
                    Some(p) => {
                        if p.color != color {
                            moves.push(Move::capture((row, col), to, p));
                        }
                        break;
                    }
                }
                r += dr;
                c += dc;
            }
        }
    }

    fn king_moves(&self, row: usize, col: usize, color: Color, moves: &mut Vec<Move>) {
        for dr in -1..=1i32 {
            for dc in -1..=1i32 {
                if dr == 0 && dc == 0 {
                    continue;
                }
                let r = row as i32 + dr;
                let c = col as i32 + dc;
                if !Board::in_bounds(r, c) {
                    continue;
                }
                let to = (r as usize, c as usize);
                match self.board.squares[to.0][to.1] {
                    None => moves.push(Move::quiet((row, col), to)),
                    Some(p) if p.color != color => moves.push(Move::capture((row, col), to, p)),
                    Some(_) => {}
                }
            }
        }

        // Castling, only from the home square and never out of check.
        let back_rank = match color {
            Color::White => 7,
            Color::Black => 0,
        };
        if (row, col) != (back_rank, 4) || self.in_check(color) {
            return;
        }
        let (king_moved, kingside_rook_moved, queenside_rook_moved) = match color {
            Color::White => (
                self.castling.white_king_moved,
                self.castling.white_kingside_rook_moved,
                self.castling.white_queenside_rook_moved,
            ),
            Color::Black => (
                self.castling.black_king_moved,
                self.castling.black_kingside_rook_moved,
                self.castling.black_queenside_rook_moved,
            ),
        };
        if king_moved {
            return;
        }
        let enemy = color.opposite();
        let rook_at = |c: usize| {
            self.board.squares[back_rank][c]
                .map(|p| p.kind == PieceType::Rook && p.color == color)
                .unwrap_or(false)
        };

        if !kingside_rook_moved
            && rook_at(7)
            && self.board.squares[back_rank][5].is_none()
            && self.board.squares[back_rank][6].is_none()
            && !self.board.is_square_attacked_by(back_rank, 5, enemy)
            && !self.board.is_square_attacked_by(back_rank, 6, enemy)
        {
            let mut mv = Move::quiet((back_rank, 4), (back_rank, 6));
            mv.is_castle = true;
            moves.push(mv);
        }

        if !queenside_rook_moved
            && rook_at(0)
            && self.board.squares[back_rank][1].is_none()
            && self.board.squares[back_rank][2].is_none()
            && self.board.squares[back_rank][3].is_none()
            && !self.board.is_square_attacked_by(back_rank, 2, enemy)
            && !self.board.is_square_attacked_by(back_rank, 3, enemy)
        {
            let mut mv = Move::quiet((back_rank, 4), (back_rank, 2));
            mv.is_castle = true;
            moves.push(mv);
        }
    }
}

/// Count leaf nodes of the legal move tree to `depth`. The standard movegen
/// correctness yardstick.
pub fn perft(state: &GameState, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }
    let moves = state.generate_legal();
    if depth == 1 {
        return moves.len() as u64;
    }
    moves
        .iter()
        .map(|mv| {
            let mut copy = state.clone();
            copy.apply_move(mv);
            perft(&copy, depth - 1)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn twenty_legal_moves_from_the_start() {
        assert_eq!(GameState::new().generate_legal().len(), 20);
    }

    struct PerftPosition {
        name: &'static str,
        fen: &'static str,
        depths: &'static [(u32, u64)],
    }

    const PERFT_POSITIONS: &[PerftPosition] = &[
        PerftPosition {
            name: "initial position",
            fen: crate::state::START_FEN,
            depths: &[(1, 20), (2, 400), (3, 8902), (4, 197_281)],
        },
        PerftPosition {
            name: "kiwipete",
            fen: "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            depths: &[(1, 48), (2, 2039), (3, 97_862)],
        },
        PerftPosition {
            name: "rook endgame",
            fen: "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            depths: &[(1, 14), (2, 191), (3, 2812)],
        },
        PerftPosition {
            name: "en passant",
            fen: "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3",
            depths: &[(1, 31), (2, 707), (3, 21_637)],
        },
        PerftPosition {
            name: "promotion",
            fen: "n1n5/PPPk4/8/8/8/8/4Kppp/5N1N b - - 0 1",
            depths: &[(1, 24), (2, 496), (3, 9483)],
        },
        PerftPosition {
            name: "castling",
            fen: "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1",
            depths: &[(1, 26), (2, 568), (3, 13_744)],
        },
    ];

    #[test]
    fn perft_matches_reference_counts() {
        for position in PERFT_POSITIONS {
            let state = GameState::from_fen(position.fen);
            for &(depth, expected) in position.depths {
                let nodes = perft(&state, depth);
                assert_eq!(
                    nodes, expected,
                    "perft({depth}) mismatch for {}: expected {expected}, got {nodes}",
                    position.name
                );
            }
        }
    }

    #[test]
    fn promotions_expand_queen_first() {
        let state = GameState::from_fen("8/P7/8/8/8/8/k6K/8 w - - 0 1");
        let promos: Vec<_> = state
            .generate_pseudo_legal()
            .into_iter()
            .filter(|m| m.from == (1, 0) && m.to == (0, 0))
            .collect();
        let kinds: Vec<_> = promos.iter().map(|m| m.promotion).collect();
        assert_eq!(
            kinds,
            vec![
                Some(PieceType::Queen),
                Some(PieceType::Rook),
                Some(PieceType::Bishop),
                Some(PieceType::Knight)
            ]
        );
    }

    #[test]
    fn no_castling_through_an_attacked_square() {
        // The f8 rook covers f1: kingside castling is off, queenside is fine.
        let state = GameState::from_fen("r3kr2/8/8/8/8/8/8/R3K2R w KQq - 0 1");
        let ucis: Vec<String> = state.generate_legal().iter().map(|m| m.to_uci()).collect();
        assert!(!ucis.contains(&"e1g1".to_string()));
        assert!(ucis.contains(&"e1c1".to_string()));
    }

    #[test]
    fn no_castling_while_in_check() {
        let state = GameState::from_fen("4k3/8/8/8/8/8/4r3/R3K2R w KQ - 0 1");
        assert!(state.in_check(Color::White));
        let ucis: Vec<String> = state.generate_legal().iter().map(|m| m.to_uci()).collect();
        assert!(!ucis.contains(&"e1g1".to_string()));
        assert!(!ucis.contains(&"e1c1".to_string()));
    }

    #[test]
    fn pinned_pawn_may_only_capture_its_pinner() {
        // Bishop on e3 pins the d2 pawn against the c1 king.
        let state = GameState::from_fen("4k3/8/8/8/8/4b3/3P4/2K5 w - - 0 1");
        let ucis: Vec<String> = state.generate_legal().iter().map(|m| m.to_uci()).collect();
        assert!(!ucis.contains(&"d2d3".to_string()));
        assert!(!ucis.contains(&"d2d4".to_string()));
        assert!(ucis.contains(&"d2e3".to_string()));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        /// Play a random game forward; at every position the legality filter
        /// must keep exactly the pseudo-legal moves that leave the mover's
        /// own king safe.
        #[test]
        fn legality_filter_agrees_with_king_safety(seed in any::<u64>()) {
            use rand::prelude::*;

            let mut state = GameState::new();
            let mut rng = StdRng::seed_from_u64(seed);

            for _ in 0..20 {
                let legal = state.generate_legal();
                let pseudo = state.generate_pseudo_legal();

                for mv in &pseudo {
                    let mut copy = state.clone();
                    copy.apply_move(mv);
                    let exposes_king = copy.in_check(state.turn);
                    let kept = legal.contains(mv);
                    prop_assert_eq!(
                        kept,
                        !exposes_king,
                        "filter disagreed on {}",
                        mv.to_uci()
                    );
                }

                if legal.is_empty() {
                    break;
                }
                let mv = legal[rng.gen_range(0..legal.len())].clone();
                state.apply_move(&mv);
            }
        }
    }
}
