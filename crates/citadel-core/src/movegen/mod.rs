//! Legal move generation
//!
//! - [`MoveList`]: reusable generation buffer
//! - [`generate_moves`]: every legal action for the side to move
//! - [`generate_noisy_moves`]: the quiescence subset

mod generator;
mod movelist;

pub use generator::{generate_moves, generate_noisy_moves};
pub use movelist::{MoveList, MAX_MOVES};
