//! Incrementally updated feature accumulator
//!
//! The accumulator holds the first-layer pre-activations for the current
//! position. Make/undo hands us the exact set of rewritten squares, so the
//! update subtracts the old feature columns and adds the new ones; global
//! bits (side to move, Bastion rights) toggle the same way.

use crate::citadel::{Color, NullUndo, Position, Undo};

use super::network::{
    feature_index, Nnue, FEAT_BASTION_BLACK, FEAT_BASTION_WHITE, FEAT_STM_WHITE, HIDDEN1,
};

/// First-layer pre-activations (int32 to absorb int16-weight sums)
#[derive(Clone, Copy)]
pub struct Accumulator {
    pub v: [i32; HIDDEN1],
}

impl Default for Accumulator {
    fn default() -> Self {
        Accumulator { v: [0; HIDDEN1] }
    }
}

impl Nnue {
    #[inline]
    fn add_feature(&self, acc: &mut Accumulator, feature: usize) {
        let col = &self.ft_w[feature * HIDDEN1..(feature + 1) * HIDDEN1];
        for (j, &w) in col.iter().enumerate() {
            acc.v[j] += w as i32;
        }
    }

    #[inline]
    fn sub_feature(&self, acc: &mut Accumulator, feature: usize) {
        let col = &self.ft_w[feature * HIDDEN1..(feature + 1) * HIDDEN1];
        for (j, &w) in col.iter().enumerate() {
            acc.v[j] -= w as i32;
        }
    }

    #[inline]
    fn toggle_feature(&self, acc: &mut Accumulator, feature: usize, on: bool) {
        if on {
            self.add_feature(acc, feature);
        } else {
            self.sub_feature(acc, feature);
        }
    }

    /// Build an accumulator from scratch for `pos`
    pub fn init_accumulator(&self, pos: &Position) -> Accumulator {
        let mut acc = Accumulator::default();
        acc.v.copy_from_slice(&self.ft_b);

        for sq in crate::citadel::Square::all() {
            if let Some(f) = feature_index(sq, pos.cell_at(sq)) {
                self.add_feature(&mut acc, f);
            }
        }

        if pos.turn() == Color::White {
            self.add_feature(&mut acc, FEAT_STM_WHITE);
        }
        if pos.bastion_right(Color::White) {
            self.add_feature(&mut acc, FEAT_BASTION_WHITE);
        }
        if pos.bastion_right(Color::Black) {
            self.add_feature(&mut acc, FEAT_BASTION_BLACK);
        }

        acc
    }

    /// Apply the delta of a move. `pos` must be the position AFTER
    /// `make_move` produced `undo`.
    pub fn apply_delta_after_move(&self, acc: &mut Accumulator, pos: &Position, undo: &Undo) {
        for &(sq, old_cell) in undo.changed() {
            if let Some(f) = feature_index(sq, old_cell) {
                self.sub_feature(acc, f);
            }
            if let Some(f) = feature_index(sq, pos.cell_at(sq)) {
                self.add_feature(acc, f);
            }
        }

        let prev_stm_white = undo.prev_turn() == Color::White;
        let stm_white = pos.turn() == Color::White;
        if prev_stm_white != stm_white {
            self.toggle_feature(acc, FEAT_STM_WHITE, stm_white);
        }

        for (color, feature) in
            [(Color::White, FEAT_BASTION_WHITE), (Color::Black, FEAT_BASTION_BLACK)]
        {
            let prev = undo.prev_bastion_right(color);
            let now = pos.bastion_right(color);
            if prev != now {
                self.toggle_feature(acc, feature, now);
            }
        }
    }

    /// Apply the delta of a null move. `pos` must be the position AFTER
    /// `make_null_move` produced `undo`.
    pub fn apply_delta_after_null_move(
        &self,
        acc: &mut Accumulator,
        pos: &Position,
        undo: &NullUndo,
    ) {
        let prev_stm_white = undo.prev_turn() == Color::White;
        let stm_white = pos.turn() == Color::White;
        if prev_stm_white != stm_white {
            self.toggle_feature(acc, FEAT_STM_WHITE, stm_white);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citadel::{Move, Position, Square};
    use crate::movegen::{generate_moves, MoveList};

    /// Deterministic non-trivial weights so delta errors cannot cancel out.
    fn patterned_net() -> Nnue {
        let mut net = Nnue::zeroed();
        for (i, w) in net.ft_w.iter_mut().enumerate() {
            *w = ((i * 31 + 7) % 23) as i16 - 11;
        }
        for (j, b) in net.ft_b.iter_mut().enumerate() {
            *b = j as i32 - 128;
        }
        net
    }

    fn assert_acc_eq(a: &Accumulator, b: &Accumulator) {
        for j in 0..HIDDEN1 {
            assert_eq!(a.v[j], b.v[j], "accumulator mismatch at unit {j}");
        }
    }

    #[test]
    fn test_init_includes_bias_and_globals() {
        let net = patterned_net();
        let pos = Position::empty();
        let acc = net.init_accumulator(&pos);
        // Empty board, White to move, both bastion rights on.
        let mut expect = Accumulator::default();
        expect.v.copy_from_slice(&net.ft_b);
        net.add_feature(&mut expect, FEAT_STM_WHITE);
        net.add_feature(&mut expect, FEAT_BASTION_WHITE);
        net.add_feature(&mut expect, FEAT_BASTION_BLACK);
        assert_acc_eq(&acc, &expect);
    }

    #[test]
    fn test_delta_matches_rebuild_over_a_game() {
        let net = patterned_net();
        let mut pos = Position::initial();
        let mut acc = net.init_accumulator(&pos);

        // Walk a fixed line; after every move the incrementally updated
        // accumulator must equal a from-scratch rebuild.
        let mut list = MoveList::new();
        for pick in [0usize, 3, 1, 7, 2, 5, 0, 4] {
            generate_moves(&mut pos, &mut list);
            if list.is_empty() {
                break;
            }
            let m = list.at(pick % list.len());
            let u = pos.make_move(m);
            net.apply_delta_after_move(&mut acc, &pos, &u);
            assert_acc_eq(&acc, &net.init_accumulator(&pos));
        }
    }

    #[test]
    fn test_delta_covers_bastion_and_regicide() {
        let net = patterned_net();

        // Bastion: swap + two walls + bastion-right loss in one action.
        let mut pos = Position::from_fen("9/9/9/9/3IS4/9/9/9/s8 w B - 0 1").unwrap();
        let mut acc = net.init_accumulator(&pos);
        let u = pos.make_move(Move::bastion(
            Square::new(4, 4),
            Square::new(4, 3),
            Square::new(3, 3),
            Square::new(5, 3),
        ));
        net.apply_delta_after_move(&mut acc, &pos, &u);
        assert_acc_eq(&acc, &net.init_accumulator(&pos));

        // Regicide: no turn flip, sovereign removed.
        let mut pos = Position::from_fen("9/9/9/9/C3s4/9/9/9/S8 w - - 0 1").unwrap();
        let mut acc = net.init_accumulator(&pos);
        let u = pos.make_move(Move::catapult(Square::new(4, 0), Square::new(4, 4), None));
        assert!(pos.game_over());
        net.apply_delta_after_move(&mut acc, &pos, &u);
        assert_acc_eq(&acc, &net.init_accumulator(&pos));
    }

    #[test]
    fn test_null_move_toggles_only_stm() {
        let net = patterned_net();
        let mut pos = Position::initial();
        let mut acc = net.init_accumulator(&pos);

        let u = pos.make_null_move();
        net.apply_delta_after_null_move(&mut acc, &pos, &u);
        assert_acc_eq(&acc, &net.init_accumulator(&pos));

        pos.undo_null_move(&u);
        let back = net.init_accumulator(&pos);
        net.apply_delta_after_null_move(&mut acc, &pos, &NullUndo { prev_turn: Color::Black, prev_fullmove: 1 });
        assert_acc_eq(&acc, &back);
    }
}
