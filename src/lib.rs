//! A small chess rules engine with a fixed-depth alpha-beta opponent.
//!
//! The crate owns the game model only: board and piece values, legal move
//! generation, move application and replay-based undo, terminal-state
//! detection, and a material-only minimax search that can run on a worker
//! thread behind [`engine::SearchHandle`]. Rendering, input handling and
//! asset loading are the embedding application's business.

pub mod board;
pub mod engine;
pub mod movegen;
pub mod moves;
pub mod piece;
pub mod state;
