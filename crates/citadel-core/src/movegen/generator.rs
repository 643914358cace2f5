//! Legal action generation
//!
//! Enumerates every legal action for the side to move: piece moves and
//! captures, Mason Construct and Command, Catapult ranged demolish and
//! move-with-demolish, and Bastion. `generate_noisy_moves` produces the
//! quiescence subset (captures, demolitions, and a few tactically loud quiet
//! actions).
//!
//! Enumeration order is fixed (masons, pegasi, lancers, catapults, ministers,
//! sovereign, each in bitboard order) so identical positions always yield
//! identical lists.

use crate::citadel::attacks::{tables, DIAG_DIRS, DIRS4, ORTHO_DIRS};
use crate::citadel::bitboard::Bitboard;
use crate::citadel::{Cell, Color, Move, PieceType, Position, Square};

use super::MoveList;

/// Generate every legal action for the side to move.
///
/// Takes `&mut Position` because Mason Command probes its destination by
/// temporarily applying the one-step move; the probe is fully reverted before
/// returning and the position (including its hash) is untouched observably.
pub fn generate_moves(pos: &mut Position, out: &mut MoveList) {
    out.clear();
    if pos.game_over() {
        return;
    }

    let us = pos.turn();
    let them = us.opponent();
    let enemy_attacks = pos.compute_attacks(them);

    for s in pos.piece_bb(us, PieceType::Mason) {
        gen_piece_moves(pos, out, s, PieceType::Mason, us);
        gen_mason_extras(pos, out, s, us, enemy_attacks);
    }
    for s in pos.piece_bb(us, PieceType::Pegasus) {
        gen_piece_moves(pos, out, s, PieceType::Pegasus, us);
    }
    for s in pos.piece_bb(us, PieceType::Lancer) {
        gen_piece_moves(pos, out, s, PieceType::Lancer, us);
    }
    for s in pos.piece_bb(us, PieceType::Catapult) {
        gen_catapult_extras(pos, out, s, us);
    }
    for s in pos.piece_bb(us, PieceType::Minister) {
        gen_piece_moves(pos, out, s, PieceType::Minister, us);
    }
    for s in pos.piece_bb(us, PieceType::Sovereign) {
        gen_piece_moves(pos, out, s, PieceType::Sovereign, us);
        gen_bastion(pos, out, s, us);
    }
}

/// Normal moves/captures for one piece (Catapults are handled by
/// `gen_catapult_extras`, which also covers their plain rook moves)
fn gen_piece_moves(pos: &Position, out: &mut MoveList, from: Square, pt: PieceType, us: Color) {
    let t = tables();
    let them = us.opponent();

    match pt {
        PieceType::Mason => {
            let f = us.forward();
            let max = pos.mason_move_range(from, us);
            let (r, c) = (from.row(), from.col());

            // Orthogonal (forward + sideways), empty squares only.
            for (dr, dc) in [(f, 0), (0, -1), (0, 1)] {
                for step in 1..=max {
                    let Some(to) = Square::from_coords(r + dr * step, c + dc * step) else {
                        break;
                    };
                    if !pos.cell_at(to).is_empty() {
                        break;
                    }
                    out.push(Move::normal(from, to));
                }
            }

            // Diagonal captures (always one step, enemy pieces only).
            for dc in [-1, 1] {
                let Some(to) = Square::from_coords(r + f, c + dc) else {
                    continue;
                };
                if pos.cell_at(to).is_piece_of(them) {
                    out.push(Move::normal(from, to));
                }
            }
        }

        PieceType::Pegasus => {
            for &to in t.knight_targets(from) {
                let cell = pos.cell_at(to);
                if cell.is_wall() || cell.is_piece_of(us) {
                    continue;
                }
                out.push(Move::normal(from, to));
            }
        }

        PieceType::Lancer => {
            for dir in DIAG_DIRS {
                for &to in t.ray(from, dir) {
                    let cell = pos.cell_at(to);
                    if cell.is_wall() {
                        break;
                    }
                    if let Some(p) = cell.piece() {
                        if p.color == us && p.piece_type == PieceType::Mason {
                            continue; // tunnel through friendly masons
                        }
                        if p.color == them {
                            out.push(Move::normal(from, to));
                        }
                        break;
                    }
                    out.push(Move::normal(from, to));
                }
            }
        }

        PieceType::Minister | PieceType::Sovereign => {
            let max = if pt == PieceType::Minister {
                pos.minister_move_range(from, us)
            } else {
                pos.sovereign_move_range(from, us)
            };
            if max <= 0 {
                return;
            }
            for dir in 0..8 {
                for &to in t.ray(from, dir).iter().take(max as usize) {
                    let cell = pos.cell_at(to);
                    if cell.is_wall() {
                        break;
                    }
                    if let Some(p) = cell.piece() {
                        if p.color == them {
                            out.push(Move::normal(from, to));
                        }
                        break;
                    }
                    out.push(Move::normal(from, to));
                }
            }
        }

        PieceType::Catapult => {}
    }
}

/// Mason Construct and Command variants
fn gen_mason_extras(
    pos: &mut Position,
    out: &mut MoveList,
    mason_sq: Square,
    us: Color,
    enemy_attacks: Bitboard,
) {
    let t = tables();
    let them = us.opponent();
    let (r, c) = (mason_sq.row(), mason_sq.col());
    let can_build = !pos.wall_built_last(us);

    // Construct: forbidden while the mason is under attack.
    if can_build && !enemy_attacks.test(mason_sq) {
        for (dr, dc) in DIRS4 {
            let Some(to) = Square::from_coords(r + dr, c + dc) else {
                continue;
            };
            if pos.cell_at(to).is_empty() {
                out.push(Move::construct(mason_sq, to));
            }
        }
    }

    // Command requires a friendly Minister in the 8-neighborhood.
    let minister_adjacent = t.king_targets(mason_sq).iter().any(|&adj| {
        matches!(pos.cell_at(adj).piece(),
                 Some(p) if p.color == us && p.piece_type == PieceType::Minister)
    });
    if !minister_adjacent {
        return;
    }

    let f = us.forward();

    let consider_dest = |pos: &mut Position, out: &mut MoveList, dest: Square| {
        let dst = pos.cell_at(dest);

        // Capturing the Sovereign ends the action immediately (no build).
        if matches!(dst.piece(), Some(p) if p.color == them && p.piece_type == PieceType::Sovereign)
        {
            out.push(Move::command(mason_sq, dest, None));
            return;
        }

        // Probe: apply the one-step move so the build squares and the
        // threat test see the mason at its destination.
        let src = pos.cell_at(mason_sq);
        pos.set_square_raw(dest, src);
        pos.set_square_raw(mason_sq, Cell::Empty);

        // Skipping the build is always allowed.
        out.push(Move::command(mason_sq, dest, None));

        if can_build && !pos.is_square_attacked_by(them, dest) {
            let (nr, nc) = (dest.row(), dest.col());
            for (dr, dc) in DIRS4 {
                if let Some(wall_sq) = Square::from_coords(nr + dr, nc + dc) {
                    if pos.cell_at(wall_sq).is_empty() {
                        out.push(Move::command(mason_sq, dest, Some(wall_sq)));
                    }
                }
            }
        }

        pos.set_square_raw(mason_sq, src);
        pos.set_square_raw(dest, dst);
    };

    // Orthogonal step to an empty square.
    for (dr, dc) in [(f, 0), (0, -1), (0, 1)] {
        let Some(to) = Square::from_coords(r + dr, c + dc) else {
            continue;
        };
        if pos.cell_at(to).is_empty() {
            consider_dest(pos, out, to);
        }
    }

    // Diagonal capture step.
    for dc in [-1, 1] {
        let Some(to) = Square::from_coords(r + f, c + dc) else {
            continue;
        };
        if pos.cell_at(to).is_piece_of(them) {
            consider_dest(pos, out, to);
        }
    }
}

/// Catapult ranged demolish plus rook moves with optional adjacent demolish
fn gen_catapult_extras(pos: &Position, out: &mut MoveList, cat_sq: Square, us: Color) {
    let t = tables();
    let them = us.opponent();

    // Ranged demolish: first wall along each orthogonal ray; pieces preempt.
    for dir in ORTHO_DIRS {
        for &to in t.ray(cat_sq, dir) {
            let cell = pos.cell_at(to);
            if cell.piece().is_some() {
                break;
            }
            if cell.is_wall() {
                out.push(Move::ranged_demolish(cat_sq, to));
                break;
            }
        }
    }

    // Rook moves and captures, each with optional adjacent wall demolish.
    for dir in ORTHO_DIRS {
        for &to in t.ray(cat_sq, dir) {
            let dst = pos.cell_at(to);
            if dst.is_wall() {
                break;
            }

            if let Some(p) = dst.piece() {
                if p.color == them {
                    if p.piece_type == PieceType::Sovereign {
                        // Regicide emits a single variant.
                        out.push(Move::catapult(cat_sq, to, None));
                    } else {
                        out.push(Move::catapult(cat_sq, to, None));
                        for &adj in t.king_targets(to) {
                            if pos.cell_at(adj).is_wall() {
                                out.push(Move::catapult(cat_sq, to, Some(adj)));
                            }
                        }
                    }
                }
                break;
            }

            // Empty-square move, optionally coupled with a demolish.
            out.push(Move::catapult(cat_sq, to, None));
            for &adj in t.king_targets(to) {
                if pos.cell_at(adj).is_wall() {
                    out.push(Move::catapult(cat_sq, to, Some(adj)));
                }
            }
        }
    }
}

/// Bastion variants: every unordered pair of eligible wall squares, for every
/// adjacent friendly Minister
fn gen_bastion(pos: &Position, out: &mut MoveList, sov_sq: Square, us: Color) {
    if pos.wall_built_last(us) || !pos.bastion_right(us) || pos.wall_tokens(us) > 15 {
        return;
    }

    let t = tables();
    for &minister_sq in t.king_targets(sov_sq) {
        let is_minister = matches!(pos.cell_at(minister_sq).piece(),
                                   Some(p) if p.color == us && p.piece_type == PieceType::Minister);
        if !is_minister {
            continue;
        }

        // After the swap the Sovereign sits on minister_sq; the vacated
        // Sovereign square holds the Minister and is not buildable.
        let mut empties: [Square; 8] = [Square(0); 8];
        let mut count = 0usize;
        for &adj in t.king_targets(minister_sq) {
            if adj == sov_sq {
                continue;
            }
            if pos.cell_at(adj).is_empty() {
                empties[count] = adj;
                count += 1;
            }
        }
        if count < 2 {
            continue;
        }

        for a in 0..count {
            for b in (a + 1)..count {
                out.push(Move::bastion(sov_sq, minister_sq, empties[a], empties[b]));
            }
        }
    }
}

/// Generate the noisy subset for quiescence: captures, ranged demolitions,
/// Mason constructs adjacent to the enemy Sovereign, Sovereign moves touching
/// the Keep, and Catapult moves coupled with a demolition.
pub fn generate_noisy_moves(pos: &Position, out: &mut MoveList) {
    out.clear();
    if pos.game_over() {
        return;
    }

    let t = tables();
    let us = pos.turn();
    let them = us.opponent();
    let dom = pos.has_dominance(us);

    // 8-neighborhood of the enemy Sovereign, for the construct filter.
    let mut adj_enemy_sov = Bitboard::EMPTY;
    let enemy_sov = pos.sovereign_sq(them);
    if let Some(k) = enemy_sov {
        for &adj in t.king_targets(k) {
            adj_enemy_sov.set(adj);
        }
    }
    // Computed lazily: only constructs need the full enemy attack set.
    let mut enemy_attacks: Option<Bitboard> = None;

    for from in Square::all() {
        let Some(piece) = pos.cell_at(from).piece() else {
            continue;
        };
        if piece.color != us {
            continue;
        }

        let (r, c) = (from.row(), from.col());

        match piece.piece_type {
            PieceType::Mason => {
                let f = us.forward();
                for dc in [-1, 1] {
                    let Some(to) = Square::from_coords(r + f, c + dc) else {
                        continue;
                    };
                    if pos.cell_at(to).is_piece_of(them) {
                        out.push(Move::normal(from, to));
                    }
                }

                // Construct only when it tightens the net around the enemy
                // Sovereign.
                if enemy_sov.is_some() && !pos.wall_built_last(us) {
                    for (dr, dc) in DIRS4 {
                        let Some(to) = Square::from_coords(r + dr, c + dc) else {
                            continue;
                        };
                        if !adj_enemy_sov.test(to) || !pos.cell_at(to).is_empty() {
                            continue;
                        }
                        let attacks =
                            *enemy_attacks.get_or_insert_with(|| pos.compute_attacks(them));
                        if !attacks.test(from) {
                            out.push(Move::construct(from, to));
                        }
                    }
                }
            }

            PieceType::Pegasus => {
                for &to in t.knight_targets(from) {
                    if pos.cell_at(to).is_piece_of(them) {
                        out.push(Move::normal(from, to));
                    }
                }
            }

            PieceType::Lancer => {
                for dir in DIAG_DIRS {
                    for &to in t.ray(from, dir) {
                        let cell = pos.cell_at(to);
                        if cell.is_wall() {
                            break;
                        }
                        if let Some(p) = cell.piece() {
                            if p.color == us && p.piece_type == PieceType::Mason {
                                continue;
                            }
                            if p.color == them {
                                out.push(Move::normal(from, to));
                            }
                            break;
                        }
                    }
                }
            }

            PieceType::Minister => {
                let max = 2 + (dom && from.is_keep()) as usize;
                for dir in 0..8 {
                    for &to in t.ray(from, dir).iter().take(max) {
                        let cell = pos.cell_at(to);
                        if cell.is_wall() {
                            break;
                        }
                        if let Some(p) = cell.piece() {
                            if p.color == them {
                                out.push(Move::normal(from, to));
                            }
                            break;
                        }
                    }
                }
            }

            PieceType::Sovereign => {
                if pos.wall_tokens(us) > 15 {
                    continue;
                }
                let max = 1 + (dom && from.is_keep()) as usize;
                for dir in 0..8 {
                    for &to in t.ray(from, dir).iter().take(max) {
                        let cell = pos.cell_at(to);
                        if cell.is_wall() {
                            break;
                        }
                        if let Some(p) = cell.piece() {
                            if p.color == them {
                                out.push(Move::normal(from, to));
                            }
                            break;
                        }
                        // Quiet sovereign steps count as noisy only when
                        // they interact with Keep geometry.
                        if from.is_keep() || to.is_keep() {
                            out.push(Move::normal(from, to));
                        }
                    }
                }
            }

            PieceType::Catapult => {
                for dir in ORTHO_DIRS {
                    for &to in t.ray(from, dir) {
                        let cell = pos.cell_at(to);
                        if cell.piece().is_some() {
                            break;
                        }
                        if cell.is_wall() {
                            out.push(Move::ranged_demolish(from, to));
                            break;
                        }
                    }
                }

                for dir in ORTHO_DIRS {
                    for &to in t.ray(from, dir) {
                        let dst = pos.cell_at(to);
                        if dst.is_wall() {
                            break;
                        }

                        if let Some(p) = dst.piece() {
                            if p.color == them {
                                out.push(Move::catapult(from, to, None));
                                if p.piece_type != PieceType::Sovereign {
                                    for &adj in t.king_targets(to) {
                                        if pos.cell_at(adj).is_wall() {
                                            out.push(Move::catapult(from, to, Some(adj)));
                                        }
                                    }
                                }
                            }
                            break;
                        }

                        // A plain slide is quiet; only the demolish variants
                        // are noisy.
                        for &adj in t.king_targets(to) {
                            if pos.cell_at(adj).is_wall() {
                                out.push(Move::catapult(from, to, Some(adj)));
                            }
                        }
                    }
                }
            }
        }
    }
}
