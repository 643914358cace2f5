//! Transposition-table hashing
//!
//! The search keys the TT with its own Zobrist family, independent of the
//! position's running hash, so TT indexing and repetition detection never
//! share collision risk. Child keys are derived incrementally from the
//! make/undo square deltas instead of rehashing the whole board.

use crate::citadel::zobrist::TT_KEYS;
use crate::citadel::{Color, Position, Square, Undo};

/// Full TT hash of a position
pub(crate) fn hash_position(pos: &Position) -> u64 {
    let mut h = 0u64;
    for sq in Square::all() {
        h ^= TT_KEYS.cell_key(sq, pos.cell_at(sq));
    }
    if pos.turn() == Color::Black {
        h ^= TT_KEYS.turn;
    }
    for color in [Color::White, Color::Black] {
        if pos.bastion_right(color) {
            h ^= TT_KEYS.bastion_key(color);
        }
        if pos.wall_built_last(color) {
            h ^= TT_KEYS.wall_built_key(color);
        }
    }
    h
}

/// TT hash after a move, from the parent hash and the move's delta.
/// `pos` must be the position AFTER the move that produced `undo`.
pub(crate) fn hash_after_make(mut h: u64, pos: &Position, undo: &Undo) -> u64 {
    for &(sq, old_cell) in undo.changed() {
        h ^= TT_KEYS.cell_key(sq, old_cell);
        h ^= TT_KEYS.cell_key(sq, pos.cell_at(sq));
    }

    if undo.prev_turn() != pos.turn() {
        h ^= TT_KEYS.turn;
    }
    for color in [Color::White, Color::Black] {
        if undo.prev_bastion_right(color) != pos.bastion_right(color) {
            h ^= TT_KEYS.bastion_key(color);
        }
        if undo.prev_wall_built_last(color) != pos.wall_built_last(color) {
            h ^= TT_KEYS.wall_built_key(color);
        }
    }

    h
}

/// TT hash after a null move
#[inline]
pub(crate) fn hash_after_null(h: u64) -> u64 {
    h ^ TT_KEYS.turn
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movegen::{generate_moves, MoveList};

    #[test]
    fn test_incremental_matches_full_rehash() {
        let mut pos = Position::initial();
        let mut key = hash_position(&pos);
        let mut list = MoveList::new();

        for pick in [0usize, 2, 9, 1, 4, 0, 6] {
            generate_moves(&mut pos, &mut list);
            if list.is_empty() {
                break;
            }
            let m = list.at(pick % list.len());
            let u = pos.make_move(m);
            key = hash_after_make(key, &pos, &u);
            assert_eq!(key, hash_position(&pos), "after {m}");
        }
    }

    #[test]
    fn test_null_hash() {
        let mut pos = Position::initial();
        let key = hash_position(&pos);
        pos.make_null_move();
        assert_eq!(hash_after_null(key), hash_position(&pos));
    }

    #[test]
    fn test_tt_family_differs_from_position_hash() {
        let pos = Position::initial();
        assert_ne!(hash_position(&pos), pos.hash());
    }
}
