//! Make / undo / null-move
//!
//! `make_move` records a minimal delta (global scalars wholesale plus up to
//! six rewritten squares) and `undo_move` replays it backwards. The pre-move
//! hash pushed onto the history is the authoritative post-undo hash, so hash
//! and history are bit-identical to the pre-move state after an undo.

use smallvec::SmallVec;

use crate::citadel::types::{Cell, Color, PieceType, Square, Wall, WinReason};
use crate::citadel::zobrist::POSITION_KEYS;
use crate::citadel::{Move, MoveKind};

use super::Position;

/// Delta record for one applied action
#[derive(Clone, Debug)]
pub struct Undo {
    pub(crate) prev_turn: Color,
    pub(crate) prev_bastion_right: [bool; 2],
    pub(crate) prev_wall_built_last: [bool; 2],
    pub(crate) prev_sovereign_sq: [Option<Square>; 2],
    pub(crate) prev_wall_tokens: [i32; 2],
    pub(crate) prev_halfmove: u32,
    pub(crate) prev_fullmove: u32,
    pub(crate) prev_winner: Option<(Color, WinReason)>,
    /// Rewritten squares with their previous contents (at most 6 per action)
    pub(crate) changed: SmallVec<[(Square, Cell); 6]>,
}

impl Undo {
    /// Rewritten squares and their pre-move contents
    #[inline]
    pub fn changed(&self) -> &[(Square, Cell)] {
        &self.changed
    }

    /// Side that was to move before the action
    #[inline]
    pub fn prev_turn(&self) -> Color {
        self.prev_turn
    }

    /// Bastion right of `color` before the action
    #[inline]
    pub fn prev_bastion_right(&self, color: Color) -> bool {
        self.prev_bastion_right[color.index()]
    }

    /// Wall-built-last flag of `color` before the action
    #[inline]
    pub fn prev_wall_built_last(&self, color: Color) -> bool {
        self.prev_wall_built_last[color.index()]
    }
}

/// Delta record for a null move
#[derive(Clone, Copy, Debug)]
pub struct NullUndo {
    pub(crate) prev_turn: Color,
    pub(crate) prev_fullmove: u32,
}

impl NullUndo {
    /// Side that was to move before the null move
    #[inline]
    pub fn prev_turn(&self) -> Color {
        self.prev_turn
    }
}

impl Position {
    /// Apply an action from the generator's list.
    ///
    /// Legality is assumed: applying an action the generator did not emit is
    /// a caller bug and leaves the position undefined.
    pub fn make_move(&mut self, m: Move) -> Undo {
        self.history.push(self.hash);

        let mut u = Undo {
            prev_turn: self.turn,
            prev_bastion_right: self.bastion_right,
            prev_wall_built_last: self.wall_built_last,
            prev_sovereign_sq: self.sovereign_sq,
            prev_wall_tokens: self.wall_tokens,
            prev_halfmove: self.halfmove,
            prev_fullmove: self.fullmove,
            prev_winner: self.winner,
            changed: SmallVec::new(),
        };

        if self.game_over() {
            return u;
        }

        let us = self.turn;
        let them = us.opponent();

        match m.kind() {
            MoveKind::Normal => {
                let src = self.cell_at(m.from());
                let dst = self.cell_at(m.to());
                let is_cap = dst.is_piece_of(them);
                if is_cap && dst.piece().map(|p| p.piece_type) == Some(PieceType::Sovereign) {
                    self.capture_sovereign(&mut u, m.from(), m.to(), src);
                    return u;
                }

                self.save_square(&mut u, m.from());
                self.save_square(&mut u, m.to());
                self.set_square_raw(m.to(), src);
                self.set_square_raw(m.from(), Cell::Empty);

                if src.piece().map(|p| p.piece_type) == Some(PieceType::Sovereign) {
                    self.sovereign_sq[us.index()] = Some(m.to());
                    self.revoke_bastion_right(us);
                }

                self.halfmove = if is_cap { 0 } else { self.halfmove + 1 };
                self.set_wall_built_last(us, false);
                self.finalize_turn();
            }

            MoveKind::MasonConstruct => {
                // Wall HP depends on where the builder stands.
                let hp = if m.from().is_keep() { 2 } else { 1 };
                self.save_square(&mut u, m.to());
                self.set_square_raw(m.to(), Cell::Wall(Wall::new(us, hp)));
                self.wall_tokens[us.index()] += hp as i32;

                self.halfmove = 0;
                self.set_wall_built_last(us, true);
                self.finalize_turn();
            }

            MoveKind::MasonCommand => {
                let src = self.cell_at(m.from());
                let dst = self.cell_at(m.to());
                let is_cap = dst.is_piece_of(them);
                if is_cap && dst.piece().map(|p| p.piece_type) == Some(PieceType::Sovereign) {
                    // Capturing the Sovereign ends the action (no build).
                    self.capture_sovereign(&mut u, m.from(), m.to(), src);
                    return u;
                }

                self.save_square(&mut u, m.from());
                self.save_square(&mut u, m.to());
                self.set_square_raw(m.to(), src);
                self.set_square_raw(m.from(), Cell::Empty);

                let mut did_wall = false;
                if let Some(wall_sq) = m.aux1() {
                    let hp = if m.to().is_keep() { 2 } else { 1 };
                    self.save_square(&mut u, wall_sq);
                    self.set_square_raw(wall_sq, Cell::Wall(Wall::new(us, hp)));
                    self.wall_tokens[us.index()] += hp as i32;
                    did_wall = true;
                }

                self.halfmove = if is_cap || did_wall { 0 } else { self.halfmove + 1 };
                self.set_wall_built_last(us, did_wall);
                self.finalize_turn();
            }

            MoveKind::CatapultRangedDemolish => {
                self.save_square(&mut u, m.to());
                self.hit_wall(m.to());
                self.halfmove = 0;
                self.set_wall_built_last(us, false);
                self.finalize_turn();
            }

            MoveKind::CatapultMove => {
                let src = self.cell_at(m.from());
                let dst = self.cell_at(m.to());
                let is_cap = dst.is_piece_of(them);
                if is_cap && dst.piece().map(|p| p.piece_type) == Some(PieceType::Sovereign) {
                    self.capture_sovereign(&mut u, m.from(), m.to(), src);
                    return u;
                }

                self.save_square(&mut u, m.from());
                self.save_square(&mut u, m.to());
                self.set_square_raw(m.to(), src);
                self.set_square_raw(m.from(), Cell::Empty);

                let mut did_demolish = false;
                if let Some(wall_sq) = m.aux1() {
                    self.save_square(&mut u, wall_sq);
                    self.hit_wall(wall_sq);
                    did_demolish = true;
                }

                self.halfmove = if is_cap || did_demolish { 0 } else { self.halfmove + 1 };
                self.set_wall_built_last(us, false);
                self.finalize_turn();
            }

            MoveKind::Bastion => {
                // Swap Sovereign and Minister, then place two HP1 walls.
                let sov = self.cell_at(m.from());
                let minister = self.cell_at(m.to());

                self.save_square(&mut u, m.from());
                self.save_square(&mut u, m.to());
                self.set_square_raw(m.to(), sov);
                self.set_square_raw(m.from(), minister);

                self.sovereign_sq[us.index()] = Some(m.to());
                self.revoke_bastion_right(us);

                for wall_sq in [m.aux1(), m.aux2()].into_iter().flatten() {
                    self.save_square(&mut u, wall_sq);
                    self.set_square_raw(wall_sq, Cell::Wall(Wall::new(us, 1)));
                    self.wall_tokens[us.index()] += 1;
                }

                self.halfmove = 0;
                self.set_wall_built_last(us, true);
                self.finalize_turn();
            }
        }

        u
    }

    /// Revert the most recent `make_move`
    pub fn undo_move(&mut self, u: &Undo) {
        for &(sq, prev) in u.changed.iter() {
            self.set_square_raw(sq, prev);
        }

        self.turn = u.prev_turn;
        self.bastion_right = u.prev_bastion_right;
        self.wall_built_last = u.prev_wall_built_last;
        self.sovereign_sq = u.prev_sovereign_sq;
        self.wall_tokens = u.prev_wall_tokens;
        self.halfmove = u.prev_halfmove;
        self.fullmove = u.prev_fullmove;
        self.winner = u.prev_winner;

        // The pre-move hash pushed by make_move is authoritative.
        if let Some(h) = self.history.pop() {
            self.hash = h;
        }
    }

    /// Pass the move (search-only). Must not be called on finished games.
    pub fn make_null_move(&mut self) -> NullUndo {
        let u = NullUndo { prev_turn: self.turn, prev_fullmove: self.fullmove };
        if self.game_over() {
            return u;
        }

        let prev = self.turn;
        self.hash ^= POSITION_KEYS.turn;
        self.turn = prev.opponent();
        if prev == Color::Black {
            self.fullmove += 1;
        }
        u
    }

    /// Revert a null move
    pub fn undo_null_move(&mut self, u: &NullUndo) {
        if u.prev_turn != self.turn {
            self.hash ^= POSITION_KEYS.turn;
        }
        self.turn = u.prev_turn;
        self.fullmove = u.prev_fullmove;
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Record a square's pre-move contents exactly once
    fn save_square(&self, u: &mut Undo, sq: Square) {
        if u.changed.iter().any(|&(s, _)| s == sq) {
            return;
        }
        u.changed.push((sq, self.cell_at(sq)));
    }

    /// Reduce a wall by one HP (2 -> 1, 1 -> gone)
    fn hit_wall(&mut self, wall_sq: Square) {
        let Some(w) = self.cell_at(wall_sq).wall() else {
            return;
        };
        if w.hp == 2 {
            self.set_square_raw(wall_sq, Cell::Wall(Wall::new(w.color, 1)));
        } else {
            self.set_square_raw(wall_sq, Cell::Empty);
        }
        self.wall_tokens[w.color.index()] -= 1;
    }

    /// Flip the wall-built-last flag with its hash key
    fn set_wall_built_last(&mut self, color: Color, value: bool) {
        if self.wall_built_last[color.index()] == value {
            return;
        }
        self.hash ^= POSITION_KEYS.wall_built_key(color);
        self.wall_built_last[color.index()] = value;
    }

    /// Drop the Bastion right with its hash key (first Sovereign move or
    /// Bastion use)
    fn revoke_bastion_right(&mut self, color: Color) {
        if self.bastion_right[color.index()] {
            self.hash ^= POSITION_KEYS.bastion_key(color);
            self.bastion_right[color.index()] = false;
        }
    }

    /// Regicide: move the capturing piece, record the win, do not flip turn
    fn capture_sovereign(&mut self, u: &mut Undo, from: Square, to: Square, src: Cell) {
        let us = self.turn;
        let them = us.opponent();

        self.save_square(u, to);
        self.save_square(u, from);
        self.set_square_raw(to, src);
        self.set_square_raw(from, Cell::Empty);

        if src.piece().map(|p| p.piece_type) == Some(PieceType::Sovereign) {
            self.sovereign_sq[us.index()] = Some(to);
            self.revoke_bastion_right(us);
        }

        self.sovereign_sq[them.index()] = None;
        self.winner = Some((us, WinReason::Regicide));
        self.halfmove = 0;
        self.set_wall_built_last(us, false);
    }

    /// Turn-end sequence: check Entombment of the opponent, then flip the
    /// side to move. On a win the turn is not flipped.
    fn finalize_turn(&mut self) {
        if self.winner.is_some() {
            return;
        }

        let enemy = self.turn.opponent();
        if self.is_entombed(enemy) {
            self.winner = Some((self.turn, WinReason::Entombment));
            self.halfmove = 0;
            return;
        }

        self.hash ^= POSITION_KEYS.turn;
        let prev = self.turn;
        self.turn = enemy;
        if prev == Color::Black {
            self.fullmove += 1;
        }
    }
}
