// =============================================================================
// Adversarial search
//
// Fixed-depth minimax with alpha-beta pruning over a material-only
// evaluation. White maximizes, black minimizes. There is deliberately no
// move ordering, transposition table, iterative deepening or quiescence
// search: the engine plays whatever a full-width material search finds, and
// ties are broken by move-generation order so the choice is deterministic
// for a given position and depth.
// =============================================================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use log::debug;
use parking_lot::Mutex;

use crate::moves::Move;
use crate::piece::{Color, PieceType};
use crate::state::GameState;

/// Score of a delivered mate. Large enough to dominate any material total.
pub const MATE_SCORE: i32 = 1_000_000;

fn piece_value(kind: PieceType) -> i32 {
    match kind {
        PieceType::Pawn => 100,
        PieceType::Knight => 320,
        PieceType::Bishop => 330,
        PieceType::Rook => 500,
        PieceType::Queen => 900,
        PieceType::King => 20_000,
    }
}

/// Signed material sum, positive when white is ahead.
pub fn evaluate_material(state: &GameState) -> i32 {
    let mut score = 0;
    for row in &state.board.squares {
        for square in row {
            if let Some(piece) = square {
                let value = piece_value(piece.kind);
                score += match piece.color {
                    Color::White => value,
                    Color::Black => -value,
                };
            }
        }
    }
    score
}

fn minimax(state: &GameState, depth: u32, mut alpha: i32, mut beta: i32, maximizing: bool) -> i32 {
    if depth == 0 {
        return evaluate_material(state);
    }

    let moves = state.generate_legal();
    if moves.is_empty() {
        // Mate counts for whoever delivered it; stalemate is dead even.
        return if state.in_check(state.turn) {
            if maximizing {
                -MATE_SCORE
            } else {
                MATE_SCORE
            }
        } else {
            0
        };
    }

    if maximizing {
        let mut value = -i32::MAX;
        for mv in &moves {
            let mut copy = state.clone();
            copy.apply_move(mv);
            value = value.max(minimax(&copy, depth - 1, alpha, beta, false));
            alpha = alpha.max(value);
            if alpha >= beta {
                break;
            }
        }
        value
    } else {
        let mut value = i32::MAX;
        for mv in &moves {
            let mut copy = state.clone();
            copy.apply_move(mv);
            value = value.min(minimax(&copy, depth - 1, alpha, beta, true));
            beta = beta.min(value);
            if alpha >= beta {
                break;
            }
        }
        value
    }
}

/// Pick the best move for the side to move, searching `depth` plies ahead.
/// Returns `None` when there is no legal move at all (mate or stalemate);
/// among equally scored moves the first in generation order wins.
pub fn compute_best_move(state: &GameState, depth: u32) -> Option<Move> {
    let moves = state.generate_legal();
    let maximizing = state.turn == Color::White;

    let mut best: Option<Move> = None;
    let mut best_value = if maximizing { -i32::MAX } else { i32::MAX };

    for mv in moves {
        let mut copy = state.clone();
        copy.apply_move(&mv);
        let value = minimax(
            &copy,
            depth.saturating_sub(1),
            -i32::MAX,
            i32::MAX,
            !maximizing,
        );
        let improved = if maximizing {
            value > best_value
        } else {
            value < best_value
        };
        if improved || best.is_none() {
            best_value = value;
            best = Some(mv);
        }
    }

    best
}

/// Outcome of a background search. `best` is `None` when the position had no
/// legal moves, which stays distinguishable from "still searching".
#[derive(Clone, PartialEq, Debug)]
pub struct SearchResult {
    pub best: Option<Move>,
    pub depth: u32,
}

/// Hand-off point between an interactive loop and a search worker.
///
/// At most one search runs at a time. `dispatch` snapshots the state and
/// spawns a worker thread; the worker publishes into a single mutex-guarded
/// slot which the interactive loop drains with `poll`. There is no
/// cancellation: a dispatched search always runs to completion, so callers
/// that care about latency should bound the depth instead.
#[derive(Clone, Default)]
pub struct SearchHandle {
    searching: Arc<AtomicBool>,
    slot: Arc<Mutex<Option<SearchResult>>>,
}

impl SearchHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_searching(&self) -> bool {
        self.searching.load(Ordering::Acquire)
    }

    /// Start a background search on a copy of `state`. Returns `false`
    /// without doing anything if a search is already in flight.
    pub fn dispatch(&self, state: &GameState, depth: u32) -> bool {
        if self.searching.swap(true, Ordering::AcqRel) {
            return false;
        }
        let state = state.clone();
        let searching = Arc::clone(&self.searching);
        let slot = Arc::clone(&self.slot);
        thread::spawn(move || {
            debug!("search dispatched at depth {depth}");
            let best = compute_best_move(&state, depth);
            match &best {
                Some(mv) => debug!("search finished: {}", mv.to_uci()),
                None => debug!("search finished: no legal moves"),
            }
            *slot.lock() = Some(SearchResult { best, depth });
            searching.store(false, Ordering::Release);
        });
        true
    }

    /// Take the finished result out of the slot, leaving it empty. `None`
    /// while no search has completed since the last poll.
    pub fn poll(&self) -> Option<SearchResult> {
        self.slot.lock().take()
    }
}
