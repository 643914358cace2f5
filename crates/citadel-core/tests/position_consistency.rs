//! Random-walk consistency: every derived structure, the running hash and
//! the NNUE accumulator must stay bit-identical to a from-scratch rebuild
//! across arbitrary make/undo sequences.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use citadel_core::{
    generate_moves, Color, EvalMode, MoveList, Nnue, PieceType, Position, evaluate_position,
};

fn random_walk(seed: u64, plies: usize, mut on_step: impl FnMut(&Position)) {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut pos = Position::initial();
    let mut list = MoveList::new();

    for _ in 0..plies {
        generate_moves(&mut pos, &mut list);
        if list.is_empty() {
            break;
        }
        let m = list.at(rng.random_range(0..list.len()));
        pos.make_move(m);
        on_step(&pos);
        if pos.game_over() {
            break;
        }
    }
}

#[test]
fn hash_matches_scratch_rebuild_along_random_games() {
    for seed in 0..8u64 {
        random_walk(seed, 120, |pos| {
            assert_eq!(pos.hash(), pos.hash_from_scratch());
        });
    }
}

#[test]
fn fen_roundtrip_preserves_all_derived_state() {
    random_walk(42, 100, |pos| {
        let fen = pos.to_fen();
        let rebuilt = Position::from_fen(&fen).expect("own FEN must parse");
        assert_eq!(rebuilt.to_fen(), fen);
        assert_eq!(rebuilt.hash(), pos.hash(), "fen: {fen}");
        for color in [Color::White, Color::Black] {
            assert_eq!(rebuilt.wall_tokens(color), pos.wall_tokens(color));
            assert_eq!(rebuilt.sovereign_sq(color), pos.sovereign_sq(color));
            assert_eq!(rebuilt.bastion_right(color), pos.bastion_right(color));
            assert_eq!(rebuilt.wall_built_last(color), pos.wall_built_last(color));
            for pt in PieceType::ALL {
                assert_eq!(rebuilt.piece_count(color, pt), pos.piece_count(color, pt));
            }
        }
    });
}

#[test]
fn make_undo_restores_positions_exactly() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
    let mut pos = Position::initial();
    let mut list = MoveList::new();

    for _ in 0..150 {
        generate_moves(&mut pos, &mut list);
        if list.is_empty() {
            break;
        }
        let before = pos.clone();
        let m = list.at(rng.random_range(0..list.len()));

        let u = pos.make_move(m);
        assert_eq!(pos.history_len(), before.history_len() + 1);
        pos.undo_move(&u);
        assert_eq!(pos, before, "undo mismatch after {m}");

        // Re-apply and keep walking so deep games get covered too.
        pos.make_move(m);
        if pos.game_over() {
            break;
        }
    }
}

#[test]
fn generator_emits_each_action_exactly_once() {
    random_walk(99, 60, |pos| {
        let mut p = pos.clone();
        let mut list = MoveList::new();
        generate_moves(&mut p, &mut list);
        let mut seen = std::collections::HashSet::new();
        for m in &list {
            assert!(seen.insert(format!("{m}")), "duplicate action {m}");
        }
    });
}

#[test]
fn nnue_zero_network_is_position_independent() {
    let net = Nnue::zeroed();
    random_walk(3, 40, |pos| {
        assert_eq!(evaluate_position(pos, EvalMode::Nnue(&net)), 0);
    });
}

#[test]
fn null_move_round_trips_through_random_positions() {
    random_walk(11, 60, |pos| {
        if pos.game_over() {
            return;
        }
        let mut p = pos.clone();
        let u = p.make_null_move();
        assert_eq!(p.hash(), p.hash_from_scratch());
        assert_ne!(p.turn(), pos.turn());
        p.undo_null_move(&u);
        assert_eq!(&p, pos);
    });
}
