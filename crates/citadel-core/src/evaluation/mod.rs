//! Position evaluation
//!
//! Two backends behind one interface: the hand-crafted evaluator and the
//! quantized NNUE. Both answer "given a position (and, for NNUE, an
//! accumulator), produce an integer side-to-move score"; the search picks
//! one per node via [`EvalMode`].

pub mod hce;
pub mod nnue;

use crate::citadel::{Color, Position};

pub use nnue::{Accumulator, Nnue, NnueError};

/// Evaluation backend selection for one search
#[derive(Clone, Copy)]
pub enum EvalMode<'a> {
    /// Hand-crafted evaluation
    Hce,
    /// Quantized network evaluation
    Nnue(&'a Nnue),
}

impl<'a> EvalMode<'a> {
    /// The network, when the NNUE backend is selected
    #[inline]
    pub fn nnue(&self) -> Option<&'a Nnue> {
        match *self {
            EvalMode::Hce => None,
            EvalMode::Nnue(net) => Some(net),
        }
    }
}

impl Default for EvalMode<'_> {
    fn default() -> Self {
        EvalMode::Hce
    }
}

/// Evaluate a position without searching (side-to-move score).
///
/// For NNUE a fresh accumulator is built; inside the search the per-ply
/// accumulators are used instead.
pub fn evaluate_position(pos: &Position, mode: EvalMode<'_>) -> i32 {
    match mode {
        EvalMode::Hce => hce::evaluate_stm(pos),
        EvalMode::Nnue(net) => {
            let acc = net.init_accumulator(pos);
            net.evaluate_stm(pos.turn() == Color::White, &acc)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backends_share_the_interface() {
        let pos = Position::initial();
        let hce = evaluate_position(&pos, EvalMode::Hce);
        let net = Nnue::zeroed();
        let nn = evaluate_position(&pos, EvalMode::Nnue(&net));
        // A zero net is exactly neutral; the HCE sees only tempo.
        assert_eq!(nn, 0);
        assert!(hce.abs() <= 20);
        assert!(EvalMode::Hce.nnue().is_none());
        assert!(EvalMode::Nnue(&net).nnue().is_some());
    }
}
