use std::time::Instant;

use woodpusher::movegen::perft;
use woodpusher::state::{GameState, START_FEN};

/// Usage: perft [depth] [fen]
fn main() {
    let mut args = std::env::args().skip(1);
    let depth: u32 = args
        .next()
        .and_then(|a| a.parse().ok())
        .unwrap_or(4);
    let fen = args.next().unwrap_or_else(|| START_FEN.to_string());

    let state = GameState::from_fen(&fen);
    println!("perft on '{fen}'");
    for d in 1..=depth {
        let start = Instant::now();
        let nodes = perft(&state, d);
        let elapsed = start.elapsed();
        println!(
            "depth {d}: {nodes} nodes in {} ms ({:.2} Mnps)",
            elapsed.as_millis(),
            nodes as f64 / elapsed.as_micros().max(1) as f64
        );
    }
}
