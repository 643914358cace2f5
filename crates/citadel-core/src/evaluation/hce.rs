//! Hand-crafted evaluation
//!
//! Centipawn-like score built from material, Keep-gravity piece-square
//! tables, Sovereign safety, entombment pressure, wall heuristics and a set
//! of Catapult endgame terms. White-positive internally, flipped to the side
//! to move at the interface.

use lazy_static::lazy_static;

use crate::citadel::attacks::{tables, DIRS8};
use crate::citadel::board_constants::in_keep;
use crate::citadel::{Cell, Color, PieceType, Position, Square};

/// Material values in encoding order (Sovereign is priceless; 0 here)
pub const PIECE_VALUE: [i32; PieceType::COUNT] = [100, 550, 350, 400, 450, 0];

const DOMINANCE_BONUS: i32 = 25;
const WALL_BASE_VALUE_PER_HP: i32 = 2;
const WALL_ADJ_SOV_BONUS: i32 = 15;
const WALL_CHOKE_BONUS: i32 = 6;
const MASON_MINISTER_SYNERGY: i32 = 20;
const ENTOMB_PRESSURE_WEIGHT: i32 = 18;
const SIEGE_ATTRITION_PENALTY: i32 = 200;

// Wall-locked endgames
const WALLS_MANY_START: i32 = 12;
const WALLS_MANY_FULL: i32 = 25;
const NO_CAT_DRAWISH_SCALE_MAX: i32 = 256;
const CATAPULT_EDGE_BONUS_MAX: i32 = 150;
const CATAPULT_MONOPOLY_BONUS: i32 = 200;

// Opening shape: keep the Sovereign home, don't spam walls.
const MAX_NON_SOV_PIECES: i32 = 34;
const BASTION_RIGHT_OPENING_BONUS: i32 = 80;
const KING_WANDER_PEN: i32 = 45;
const KING_KEEP_EARLY_PEN: i32 = 140;
const KING_ATTACKED_PEN: i32 = 700;
const KING_RING_ATTACK_PEN: i32 = 55;
const WALL_TOKEN_OPENING_PEN_PER_HP: i32 = 3;
const MOBILITY_ATK_WEIGHT: i32 = 2;
const TEMPO_BONUS: i32 = 20;

fn pst_centrality(r: i32, c: i32) -> i32 {
    // Chebyshev distance from the center square: 0..4.
    let cheb = (r - 4).abs().max((c - 4).abs());
    4 - cheb
}

fn build_pst() -> [[i32; 81]; PieceType::COUNT] {
    let mut pst = [[0; 81]; PieceType::COUNT];
    for sq in Square::all() {
        let (r, c) = (sq.row(), sq.col());
        let cent = pst_centrality(r, c);
        let keep = in_keep(r, c) as i32;

        pst[PieceType::Mason.index()][sq.index()] = cent * 4 + keep * 6;
        pst[PieceType::Catapult.index()][sq.index()] = cent * 3 + keep * 4;
        pst[PieceType::Lancer.index()][sq.index()] = cent * 4 + keep * 6;
        pst[PieceType::Pegasus.index()][sq.index()] = cent * 4 + keep * 6;
        pst[PieceType::Minister.index()][sq.index()] = cent * 5 + keep * 8;
        // The Sovereign table is much steeper: it alone should pull the king
        // toward the Keep once the phase allows it.
        pst[PieceType::Sovereign.index()][sq.index()] = cent * 20 + keep * 40;
    }
    pst
}

lazy_static! {
    static ref PST: [[i32; 81]; PieceType::COUNT] = build_pst();
}

/// The 5x5 ring of entry chokepoints immediately around the Keep
fn is_keep_boundary_ring(r: i32, c: i32) -> bool {
    if !(2..=6).contains(&r) || !(2..=6).contains(&c) {
        return false;
    }
    if in_keep(r, c) {
        return false;
    }
    r == 2 || r == 6 || c == 2 || c == 6
}

#[inline]
fn clamp256(x: i32) -> i32 {
    x.clamp(0, 256)
}

/// Safety denominator for the proximity pressure term: friendly pieces
/// adjacent to the Sovereign count double, friendly walls once (capped at 3,
/// walls past that are entombment risk rather than shelter).
fn sovereign_safety(pos: &Position, color: Color) -> i32 {
    let Some(ks) = pos.sovereign_sq(color) else {
        return 100;
    };
    let mut safety = 1;
    let mut wall_count = 0;
    for &adj in tables().king_targets(ks) {
        match pos.cell_at(adj) {
            Cell::Piece(p) if p.color == color => safety += 2,
            Cell::Wall(w) if w.color == color && wall_count < 3 => {
                safety += 1;
                wall_count += 1;
            }
            _ => {}
        }
    }
    safety
}

/// Static evaluation from White's perspective
pub fn evaluate_white(pos: &Position) -> i32 {
    let t = tables();
    let mut score = [0i32; 2]; // [White, Black]

    // Phase: 0 = opening, 256 = endgame, from missing non-Sovereign pieces.
    let mut non_sov_pieces = 0;
    for sq in Square::all() {
        if let Some(p) = pos.cell_at(sq).piece() {
            if p.piece_type != PieceType::Sovereign {
                non_sov_pieces += 1;
            }
        }
    }
    let missing = (MAX_NON_SOV_PIECES - non_sov_pieces).max(0);
    let phase = (missing * 256 + MAX_NON_SOV_PIECES / 2) / MAX_NON_SOV_PIECES;
    let opening = 256 - phase;

    let walls_w = pos.wall_tokens(Color::White);
    let walls_b = pos.wall_tokens(Color::Black);
    let total_walls = walls_w + walls_b;

    let wall_many =
        clamp256(((total_walls - WALLS_MANY_START) * 256) / (WALLS_MANY_FULL - WALLS_MANY_START));
    let wall_endgame = (wall_many * phase) / 256;

    let safety = [sovereign_safety(pos, Color::White), sovereign_safety(pos, Color::Black)];
    let mut pressure_on = [0i32; 2];

    // Piece values drift in locked wall endgames: masons (more walls),
    // pegasi (jump walls) and catapults (break walls) all gain.
    let dyn_piece_value = |pt: PieceType| -> i32 {
        let base = PIECE_VALUE[pt.index()];
        let target = match pt {
            PieceType::Mason => 225,
            PieceType::Pegasus => 500,
            PieceType::Catapult => 600,
            _ => base,
        };
        base + ((target - base) * wall_endgame) / 256
    };

    for sq in Square::all() {
        let cell = pos.cell_at(sq);
        let Some(owner) = cell.color() else {
            continue;
        };
        let side = owner.index();

        match cell {
            Cell::Piece(p) => {
                let pt = p.piece_type;

                score[side] += dyn_piece_value(pt);
                if pt == PieceType::Sovereign {
                    score[side] += (PST[pt.index()][sq.index()] * phase) / 256;
                } else {
                    score[side] += PST[pt.index()][sq.index()];
                }

                // Proximity pressure on the enemy Sovereign.
                if let Some(target_sov) = pos.sovereign_sq(owner.opponent()) {
                    let dist = (sq.row() - target_sov.row())
                        .abs()
                        .max((sq.col() - target_sov.col()).abs());
                    if dist <= 4 {
                        let weight = match pt {
                            PieceType::Mason | PieceType::Pegasus => 10,
                            PieceType::Catapult | PieceType::Lancer => 6,
                            PieceType::Minister => 3,
                            PieceType::Sovereign => 0,
                        };
                        pressure_on[owner.opponent().index()] += weight * (5 - dist);
                    }
                }

                // Mason-Minister synergy: a mason that can be Commanded is
                // worth keeping close.
                if pt == PieceType::Mason {
                    let near_minister = t.king_targets(sq).iter().any(|&adj| {
                        matches!(pos.cell_at(adj).piece(),
                                 Some(q) if q.color == owner
                                     && q.piece_type == PieceType::Minister)
                    });
                    if near_minister {
                        score[side] += MASON_MINISTER_SYNERGY;
                    }
                }
            }
            Cell::Wall(w) => {
                score[side] += WALL_BASE_VALUE_PER_HP * w.hp as i32;
                if is_keep_boundary_ring(sq.row(), sq.col()) {
                    score[side] += (WALL_CHOKE_BONUS * phase) / 256;
                }
            }
            Cell::Empty => unreachable!(),
        }
    }

    // Pressure scaled down by the defender's safety denominator.
    score[0] += (pressure_on[1] * 4) / safety[1];
    score[1] += (pressure_on[0] * 4) / safety[0];

    for color in [Color::White, Color::Black] {
        let side = color.index();

        if pos.has_dominance(color) {
            score[side] += (DOMINANCE_BONUS * phase) / 256;
        }
        if pos.bastion_right(color) {
            score[side] += (BASTION_RIGHT_OPENING_BONUS * opening) / 256;
        }

        // Friendly walls sheltering the Sovereign.
        if let Some(ks) = pos.sovereign_sq(color) {
            for &adj in t.king_targets(ks) {
                if matches!(pos.cell_at(adj).wall(), Some(w) if w.color == color) {
                    score[side] += WALL_ADJ_SOV_BONUS;
                }
            }
        }

        if pos.wall_tokens(color) > 15 {
            score[side] -= SIEGE_ATTRITION_PENALTY;
        }
        score[side] -= (pos.wall_tokens(color) * WALL_TOKEN_OPENING_PEN_PER_HP * opening) / 256;
    }

    // Mobility proxy plus Sovereign safety penalties.
    let attacks = [pos.compute_attacks(Color::White), pos.compute_attacks(Color::Black)];
    let mob_w = attacks[0].count_ones() as i32;
    let mob_b = attacks[1].count_ones() as i32;
    score[0] += MOBILITY_ATK_WEIGHT * mob_w;
    score[1] += MOBILITY_ATK_WEIGHT * mob_b;

    for color in [Color::White, Color::Black] {
        let side = color.index();
        let enemy_attacks = attacks[color.opponent().index()];
        let Some(ks) = pos.sovereign_sq(color) else {
            continue;
        };

        let home = if color == Color::White { Square::new(8, 4) } else { Square::new(0, 4) };
        let cheb = (ks.row() - home.row()).abs().max((ks.col() - home.col()).abs());
        let mut pen = (KING_WANDER_PEN * cheb * opening) / 256;
        if ks.is_keep() {
            pen += (KING_KEEP_EARLY_PEN * opening) / 256;
        }
        if enemy_attacks.test(ks) {
            pen += KING_ATTACKED_PEN;
        }
        let mut ring_attacked = 0;
        for (dr, dc) in DIRS8 {
            if let Some(adj) = Square::from_coords(ks.row() + dr, ks.col() + dc) {
                if enemy_attacks.test(adj) {
                    ring_attacked += 1;
                }
            }
        }
        pen += KING_RING_ATTACK_PEN * ring_attacked;
        score[side] -= pen;
    }

    // Entombment pressure: blocked neighbors around the enemy Sovereign.
    score[0] += ENTOMB_PRESSURE_WEIGHT * pos.entomb_blocked_neighbors(Color::Black);
    score[1] += ENTOMB_PRESSURE_WEIGHT * pos.entomb_blocked_neighbors(Color::White);

    // Tempo, added before the drawish scaling so locked positions damp it
    // instead of oscillating.
    score[pos.turn().index()] += TEMPO_BONUS;

    let mut diff = score[0] - score[1];

    // Catapult / wall endgame shaping.
    let cat_w = pos.piece_count(Color::White, PieceType::Catapult) as i32;
    let cat_b = pos.piece_count(Color::Black, PieceType::Catapult) as i32;

    if cat_w == 0 && cat_b == 0 {
        // No catapults: walls are permanent, the game tends to lock up.
        let mob_total = mob_w + mob_b;
        let mut drawish = clamp256(((60 - mob_total) * 256) / 40);

        let masons = (pos.piece_count(Color::White, PieceType::Mason)
            + pos.piece_count(Color::Black, PieceType::Mason)) as i32;
        if masons > 0 {
            // Masons keep building; without catapults that means a fortress.
            let mason_factor = if total_walls >= 4 { 245 } else { 200 };
            drawish = drawish.max(mason_factor);
        } else {
            drawish = drawish.max((total_walls * 20).min(256));
        }

        let scale = 256 - (drawish * NO_CAT_DRAWISH_SCALE_MAX) / 256;
        diff = (diff * scale) / 256;
    } else {
        // A catapult monopoly converts; a mere edge helps late.
        if cat_w > 0 && cat_b == 0 {
            diff += CATAPULT_MONOPOLY_BONUS;
        } else if cat_b > 0 && cat_w == 0 {
            diff -= CATAPULT_MONOPOLY_BONUS;
        }
        if cat_w != cat_b {
            let edge = if cat_w > cat_b { 1 } else { -1 };
            diff += edge * (CATAPULT_EDGE_BONUS_MAX * wall_endgame) / 256;
        }
    }

    diff
}

/// Static evaluation from the side to move's perspective
#[inline]
pub fn evaluate_stm(pos: &Position) -> i32 {
    let diff = evaluate_white(pos);
    if pos.turn() == Color::White {
        diff
    } else {
        -diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_position_is_balanced() {
        let pos = Position::initial();
        let diff = evaluate_white(&pos);
        // Symmetric material; only tempo separates the sides.
        assert!(diff.abs() <= TEMPO_BONUS, "initial eval {diff}");
        assert_eq!(evaluate_stm(&pos), diff);
    }

    #[test]
    fn test_stm_flip() {
        let w = Position::from_fen("4s4/9/9/9/2C6/9/9/9/4S4 w - - 0 1").unwrap();
        let b = Position::from_fen("4s4/9/9/9/2C6/9/9/9/4S4 b - - 0 1").unwrap();
        // White is up a catapult either way; the sign follows the mover.
        assert!(evaluate_stm(&w) > 0);
        assert!(evaluate_stm(&b) < 0);
    }

    #[test]
    fn test_material_advantage_shows() {
        let pos = Position::from_fen("4s4/9/9/9/2C6/9/9/9/4S4 w - - 0 1").unwrap();
        // Catapult monopoly: material plus the monopoly bonus.
        assert!(evaluate_white(&pos) > PIECE_VALUE[PieceType::Catapult.index()]);
    }

    #[test]
    fn test_siege_attrition_penalty_applies() {
        let no_siege =
            Position::from_fen("4s4/9/9/9/4S4/9/9/RRR6/RRRR5 w - - 0 1").unwrap();
        let siege = Position::from_fen("4s4/9/9/9/4S4/9/9/RRRR5/RRRR5 w - - 0 1").unwrap();
        assert_eq!(no_siege.wall_tokens(Color::White), 14);
        assert_eq!(siege.wall_tokens(Color::White), 16);
        // One more wall costs far more than it earns once over the limit.
        assert!(evaluate_white(&siege) < evaluate_white(&no_siege));
    }

    #[test]
    fn test_entombment_pressure_rewards_walling_in() {
        let open = Position::from_fen("s8/9/9/9/4S4/9/9/9/C8 w - - 0 1").unwrap();
        let boxed = Position::from_fen("s8/WW7/9/9/4S4/9/9/9/C8 w - - 0 1").unwrap();
        assert!(evaluate_white(&boxed) > evaluate_white(&open));
    }

    #[test]
    fn test_attacked_sovereign_is_penalized() {
        // Black catapult stares down the white sovereign.
        let safe = Position::from_fen("4s4/c8/9/9/9/9/9/9/4S4 w - - 0 1").unwrap();
        let attacked = Position::from_fen("4s4/4c4/9/9/9/9/9/9/4S4 w - - 0 1").unwrap();
        assert!(evaluate_white(&attacked) < evaluate_white(&safe) - KING_ATTACKED_PEN / 2);
    }

    #[test]
    fn test_no_catapult_fortress_is_damped() {
        // Masons plus walls and no catapults: scores shrink toward zero.
        let locked =
            Position::from_fen("4s4/4m4/2ww5/9/9/2WW5/4M4/9/4S4 w - - 0 1").unwrap();
        let diff = evaluate_white(&locked);
        assert!(diff.abs() < 100, "locked eval should be damped, got {diff}");
    }
}
