use rand::prelude::*;

use woodpusher::engine::compute_best_move;
use woodpusher::piece::Color;
use woodpusher::state::GameState;

const SEARCH_DEPTH: u32 = 2;
const MAX_PLIES: usize = 200;

/// Engine (white) against a uniformly random mover (black).
fn main() {
    let mut rng = rand::thread_rng();
    let mut state = GameState::new();
    let mut outcome = None;

    for _ in 0..MAX_PLIES {
        if let Some(over) = state.check_game_over() {
            outcome = Some(over);
            break;
        }
        let mv = if state.turn == Color::White {
            match compute_best_move(&state, SEARCH_DEPTH) {
                Some(mv) => mv,
                None => break,
            }
        } else {
            let legal = state.generate_legal();
            legal[rng.gen_range(0..legal.len())].clone()
        };
        print!("{} ", mv.to_uci());
        state.apply_move(&mv);
    }
    println!();

    match outcome {
        Some(over) => eprintln!("Game over after {} plies: {over}", state.history.len()),
        None => eprintln!("No result after {} plies", state.history.len()),
    }
    eprintln!("Final position: {}", state.to_fen());
    println!(
        "{}",
        serde_json::to_string(&state.history).expect("history serializes")
    );
}
