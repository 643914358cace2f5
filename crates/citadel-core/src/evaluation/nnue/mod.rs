//! NNUE-style evaluation
//!
//! A small quantized network over sparse binary features: 16 channels per
//! square (pieces and walls of both colors) plus three global bits
//! (white-to-move and the two Bastion rights). The hidden-layer-1 vector is
//! carried incrementally through the search by per-ply accumulator copies
//! plus the make/undo square deltas.

pub mod accumulator;
pub mod error;
pub mod network;

pub use accumulator::Accumulator;
pub use error::NnueError;
pub use network::{Nnue, ACT_MAX, HIDDEN1, HIDDEN2, INPUT_DIM, VERSION};
