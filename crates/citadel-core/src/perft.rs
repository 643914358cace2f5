//! Perft: legal-move tree walking for generator/make/undo validation

use std::time::Instant;

use crate::citadel::{Move, Position};
use crate::movegen::{generate_moves, MoveList};

/// Count leaf nodes of the legal move tree to `depth`
pub fn perft(pos: &mut Position, depth: i32) -> u64 {
    if depth <= 0 {
        return 1;
    }

    let mut moves = MoveList::new();
    generate_moves(pos, &mut moves);
    if moves.is_empty() {
        return 0;
    }
    if depth == 1 {
        return moves.len() as u64;
    }

    let mut nodes = 0;
    for i in 0..moves.len() {
        let u = pos.make_move(moves.at(i));
        nodes += perft(pos, depth - 1);
        pos.undo_move(&u);
    }
    nodes
}

/// Per-root-move subtree counts
pub fn perft_divide(pos: &mut Position, depth: i32) -> Vec<(Move, u64)> {
    let mut out = Vec::new();
    if depth <= 0 {
        return out;
    }

    let mut moves = MoveList::new();
    generate_moves(pos, &mut moves);
    out.reserve(moves.len());

    for i in 0..moves.len() {
        let m = moves.at(i);
        let u = pos.make_move(m);
        let n = perft(pos, depth - 1);
        pos.undo_move(&u);
        out.push((m, n));
    }
    out
}

/// Perft with timing
pub struct PerftStats {
    pub nodes: u64,
    pub seconds: f64,
    pub nps: f64,
}

/// Run perft and report nodes/second
pub fn perft_timed(pos: &mut Position, depth: i32) -> PerftStats {
    let start = Instant::now();
    let nodes = perft(pos, depth);
    let seconds = start.elapsed().as_secs_f64();
    PerftStats { nodes, seconds, nps: if seconds > 0.0 { nodes as f64 / seconds } else { 0.0 } }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perft_initial_depth1() {
        let mut pos = Position::initial();
        assert_eq!(perft(&mut pos, 1), 57);
        // The walk must leave the position untouched.
        assert_eq!(pos, Position::initial());
    }

    #[test]
    fn test_perft_divide_sums_to_perft() {
        let mut pos = Position::initial();
        let total = perft(&mut pos, 2);
        let divide = perft_divide(&mut pos, 2);
        assert_eq!(divide.len(), 57);
        let sum: u64 = divide.iter().map(|(_, n)| n).sum();
        assert_eq!(sum, total);
        assert_eq!(pos, Position::initial());
    }

    #[test]
    fn test_perft_zero_and_finished() {
        let mut pos = Position::initial();
        assert_eq!(perft(&mut pos, 0), 1);

        let mut won = Position::from_fen("9/9/9/9/C3s4/9/9/9/S8 w - - 0 1").unwrap();
        let mut moves = crate::movegen::MoveList::new();
        generate_moves(&mut won, &mut moves);
        let cap = *moves
            .iter()
            .find(|m| m.to() == crate::citadel::Square::new(4, 4))
            .unwrap();
        won.make_move(cap);
        assert_eq!(perft(&mut won, 3), 0);
    }
}
