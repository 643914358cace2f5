//! Citadel engine core
//!
//! Rules engine, move generation, evaluation (hand-crafted and NNUE) and the
//! alpha-beta search for the Citadel board game. Protocol handling, file
//! formats beyond the NNUE model, and game-record tooling live in the
//! front-end crate.

pub mod citadel;
pub mod evaluation;
pub mod movegen;
pub mod notation;
pub mod perft;
pub mod search;

pub use citadel::{
    Bitboard, Cell, Color, Move, MoveKind, MoveVec, NullUndo, ParseError, Piece, PieceType,
    Position, Square, Undo, Wall, WinReason,
};
pub use evaluation::{evaluate_position, EvalMode};
pub use evaluation::nnue::{Nnue, NnueError};
pub use movegen::{generate_moves, generate_noisy_moves, MoveList};
pub use perft::{perft, perft_divide};
pub use search::{SearchInfo, SearchLimits, SearchOptions, SearchResult, Searcher, INF, MATE};
