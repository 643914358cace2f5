//! Position state
//!
//! Raw square contents plus incrementally maintained derived structures:
//! per-piece bitboards, wall bitboards, Sovereign squares, wall-HP totals and
//! the running Zobrist hash. Every board write funnels through
//! [`Position::set_square_raw`], which flips bitboard bits and XORs Zobrist
//! keys in one place, so `hash == hash_from_scratch()` holds after every
//! mutation.

mod fen;
mod moves;

pub use moves::{NullUndo, Undo};

use std::fmt::Write as _;

use crate::citadel::attacks::{tables, DIAG_DIRS, DIRS8, ORTHO_DIRS};
use crate::citadel::bitboard::Bitboard;
use crate::citadel::types::{Cell, Color, Piece, PieceType, Square, WinReason};
use crate::citadel::zobrist::POSITION_KEYS;

/// A Citadel game position
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Position {
    /// Raw square contents
    board: [Cell; 81],

    /// Per-piece bitboards [color][piece_type]
    piece_bb: [[Bitboard; PieceType::COUNT]; 2],
    /// Aggregate piece bitboards per color
    pieces_bb: [Bitboard; 2],
    /// Wall bitboards per color (all HP)
    walls_bb: [Bitboard; 2],
    /// Reinforced-wall (HP 2) bitboards per color
    reinforced_bb: [Bitboard; 2],

    /// Side to move
    turn: Color,
    /// Bastion still available, per color
    bastion_right: [bool; 2],
    /// Built a wall on the immediately prior turn, per color
    wall_built_last: [bool; 2],
    /// Sovereign square, per color (None once captured)
    sovereign_sq: [Option<Square>; 2],
    /// Sum of wall HP on the board, per color
    wall_tokens: [i32; 2],

    /// Halfmove clock (reset on captures and wall events)
    halfmove: u32,
    /// Fullmove number (starts at 1, incremented after Black moves)
    fullmove: u32,
    /// Winner and reason, once the game is decided
    winner: Option<(Color, WinReason)>,

    /// Running Zobrist hash (position key family)
    hash: u64,
    /// Pre-move hashes, appended by `make_move`, for repetition detection
    history: Vec<u64>,
}

impl Position {
    /// Completely empty board, White to move
    pub fn empty() -> Self {
        let mut pos = Position {
            board: [Cell::Empty; 81],
            piece_bb: [[Bitboard::EMPTY; PieceType::COUNT]; 2],
            pieces_bb: [Bitboard::EMPTY; 2],
            walls_bb: [Bitboard::EMPTY; 2],
            reinforced_bb: [Bitboard::EMPTY; 2],
            turn: Color::White,
            bastion_right: [true, true],
            wall_built_last: [false, false],
            sovereign_sq: [None, None],
            wall_tokens: [0, 0],
            halfmove: 0,
            fullmove: 1,
            winner: None,
            hash: 0,
            history: Vec::new(),
        };
        pos.rebuild_derived();
        pos
    }

    /// The initial game setup
    ///
    /// Back rank (row 8 for White, row 0 for Black):
    /// Catapult, Lancer, Pegasus, Minister, Sovereign, Minister, Pegasus,
    /// Lancer, Catapult — with a full rank of Masons in front.
    pub fn initial() -> Self {
        const BACK: [PieceType; 9] = [
            PieceType::Catapult,
            PieceType::Lancer,
            PieceType::Pegasus,
            PieceType::Minister,
            PieceType::Sovereign,
            PieceType::Minister,
            PieceType::Pegasus,
            PieceType::Lancer,
            PieceType::Catapult,
        ];

        let mut pos = Self::empty();
        for c in 0..9u8 {
            pos.board[Square::new(8, c).index()] =
                Cell::Piece(Piece::new(BACK[c as usize], Color::White));
            pos.board[Square::new(7, c).index()] =
                Cell::Piece(Piece::new(PieceType::Mason, Color::White));
            pos.board[Square::new(0, c).index()] =
                Cell::Piece(Piece::new(BACK[c as usize], Color::Black));
            pos.board[Square::new(1, c).index()] =
                Cell::Piece(Piece::new(PieceType::Mason, Color::Black));
        }
        pos.rebuild_derived();
        pos
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Side to move
    #[inline]
    pub fn turn(&self) -> Color {
        self.turn
    }

    /// Whether `color` may still play Bastion
    #[inline]
    pub fn bastion_right(&self, color: Color) -> bool {
        self.bastion_right[color.index()]
    }

    /// Whether `color` built a wall on their previous turn (and is therefore
    /// blocked from building this turn)
    #[inline]
    pub fn wall_built_last(&self, color: Color) -> bool {
        self.wall_built_last[color.index()]
    }

    /// Sum of wall HP for `color`
    #[inline]
    pub fn wall_tokens(&self, color: Color) -> i32 {
        self.wall_tokens[color.index()]
    }

    /// Sovereign square for `color` (None once captured)
    #[inline]
    pub fn sovereign_sq(&self, color: Color) -> Option<Square> {
        self.sovereign_sq[color.index()]
    }

    /// Running Zobrist hash
    #[inline]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Halfmove clock
    #[inline]
    pub fn halfmove(&self) -> u32 {
        self.halfmove
    }

    /// Fullmove number
    #[inline]
    pub fn fullmove(&self) -> u32 {
        self.fullmove
    }

    /// Number of recorded pre-move hashes
    #[inline]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Has the game been decided?
    #[inline]
    pub fn game_over(&self) -> bool {
        self.winner.is_some()
    }

    /// The winner, if decided
    #[inline]
    pub fn winner(&self) -> Option<Color> {
        self.winner.map(|(c, _)| c)
    }

    /// How the game was won, if decided
    #[inline]
    pub fn win_reason(&self) -> Option<WinReason> {
        self.winner.map(|(_, r)| r)
    }

    /// Raw contents of a square
    #[inline]
    pub fn cell_at(&self, sq: Square) -> Cell {
        self.board[sq.index()]
    }

    /// Number of `piece_type` pieces of `color` on the board
    #[inline]
    pub fn piece_count(&self, color: Color, piece_type: PieceType) -> u32 {
        self.piece_bb[color.index()][piece_type.index()].count_ones()
    }

    /// Bitboard of `piece_type` pieces of `color`
    #[inline]
    pub(crate) fn piece_bb(&self, color: Color, piece_type: PieceType) -> Bitboard {
        self.piece_bb[color.index()][piece_type.index()]
    }

    /// Threefold repetition of the current position (claimable draw)
    pub fn is_repetition(&self) -> bool {
        let mut count = 0;
        for &h in &self.history {
            if h == self.hash {
                count += 1;
                if count >= 2 {
                    return true;
                }
            }
        }
        false
    }

    // ------------------------------------------------------------------
    // Rules predicates
    // ------------------------------------------------------------------

    /// Dominance: `color`'s Sovereign stands on a Keep square
    #[inline]
    pub fn has_dominance(&self, color: Color) -> bool {
        matches!(self.sovereign_sq(color), Some(s) if s.is_keep())
    }

    /// Mason move range: 2 on a Keep square with Dominance, else 1
    #[inline]
    pub(crate) fn mason_move_range(&self, mason_sq: Square, color: Color) -> i32 {
        if self.has_dominance(color) && mason_sq.is_keep() {
            2
        } else {
            1
        }
    }

    /// Minister move range: 2, +1 on a Keep square with Dominance
    #[inline]
    pub(crate) fn minister_move_range(&self, minister_sq: Square, color: Color) -> i32 {
        2 + (self.has_dominance(color) && minister_sq.is_keep()) as i32
    }

    /// Sovereign move range: 1, +1 on a Keep square with Dominance,
    /// 0 under Siege Attrition (wall tokens > 15)
    #[inline]
    pub(crate) fn sovereign_move_range(&self, sovereign_sq: Square, color: Color) -> i32 {
        if self.wall_tokens(color) > 15 {
            return 0;
        }
        1 + (self.has_dominance(color) && sovereign_sq.is_keep()) as i32
    }

    /// Entombment: every in-bounds 8-neighbor of `victim`'s Sovereign is a
    /// wall of either color. Board edges count as blocked.
    pub fn is_entombed(&self, victim: Color) -> bool {
        let Some(k) = self.sovereign_sq(victim) else {
            return false;
        };
        tables().king_targets(k).iter().all(|&adj| self.cell_at(adj).is_wall())
    }

    /// Is `square` attacked by any piece of `attacker`?
    ///
    /// Mirrors the movement rules exactly: Masons attack forward diagonals,
    /// Lancers tunnel through friendly Masons, walls block every ray, and
    /// nothing attacks a wall square.
    pub fn is_square_attacked_by(&self, attacker: Color, square: Square) -> bool {
        if self.cell_at(square).is_wall() {
            return false;
        }

        let t = tables();
        let (r, c) = (square.row(), square.col());

        // Mason attacks (forward diagonals).
        {
            // Row a mason would attack into `square` from.
            let mr = r - attacker.forward();
            for dc in [-1, 1] {
                if let Some(from) = Square::from_coords(mr, c + dc) {
                    if let Some(p) = self.cell_at(from).piece() {
                        if p.color == attacker && p.piece_type == PieceType::Mason {
                            return true;
                        }
                    }
                }
            }
        }

        // Pegasus attacks (knight leaps).
        for &from in t.knight_targets(square) {
            if let Some(p) = self.cell_at(from).piece() {
                if p.color == attacker && p.piece_type == PieceType::Pegasus {
                    return true;
                }
            }
        }

        // Catapult attacks (rook rays), walls block.
        for dir in ORTHO_DIRS {
            for &from in t.ray(square, dir) {
                let cell = self.cell_at(from);
                if cell.is_wall() {
                    break;
                }
                if let Some(p) = cell.piece() {
                    if p.color == attacker && p.piece_type == PieceType::Catapult {
                        return true;
                    }
                    break;
                }
            }
        }

        // Lancer attacks (bishop rays), tunneling through friendly Masons.
        for dir in DIAG_DIRS {
            for &from in t.ray(square, dir) {
                let cell = self.cell_at(from);
                if cell.is_wall() {
                    break;
                }
                if let Some(p) = cell.piece() {
                    if p.color == attacker {
                        if p.piece_type == PieceType::Lancer {
                            return true;
                        }
                        if p.piece_type == PieceType::Mason {
                            continue;
                        }
                    }
                    break;
                }
            }
        }

        // Minister (range <= 3 with Dominance) and Sovereign (range <= 2).
        for dir in 0..8 {
            for (step, &from) in t.ray(square, dir).iter().take(3).enumerate() {
                let cell = self.cell_at(from);
                if cell.is_wall() {
                    break;
                }
                if let Some(p) = cell.piece() {
                    if p.color == attacker {
                        let dist = step as i32 + 1;
                        match p.piece_type {
                            PieceType::Minister => {
                                if dist <= self.minister_move_range(from, attacker) {
                                    return true;
                                }
                            }
                            PieceType::Sovereign => {
                                if dist <= self.sovereign_move_range(from, attacker) {
                                    return true;
                                }
                            }
                            _ => {}
                        }
                    }
                    break;
                }
            }
        }

        false
    }

    /// The full attack set of `attacker` as a bitboard
    pub fn compute_attacks(&self, attacker: Color) -> Bitboard {
        let mut attacked = Bitboard::EMPTY;
        let us = attacker;
        let dom = self.has_dominance(us);
        let t = tables();

        // Mason attacks (forward diagonals), never onto walls.
        let f = us.forward();
        for s in self.piece_bb(us, PieceType::Mason) {
            let (r, c) = (s.row(), s.col());
            for dc in [-1, 1] {
                if let Some(to) = Square::from_coords(r + f, c + dc) {
                    if !self.cell_at(to).is_wall() {
                        attacked.set(to);
                    }
                }
            }
        }

        // Pegasus attacks (knight leaps), never onto walls.
        for s in self.piece_bb(us, PieceType::Pegasus) {
            for &to in t.knight_targets(s) {
                if !self.cell_at(to).is_wall() {
                    attacked.set(to);
                }
            }
        }

        // Catapult attacks (rook rays), walls block.
        for s in self.piece_bb(us, PieceType::Catapult) {
            for dir in ORTHO_DIRS {
                for &to in t.ray(s, dir) {
                    let cell = self.cell_at(to);
                    if cell.is_wall() {
                        break;
                    }
                    attacked.set(to);
                    if cell.piece().is_some() {
                        break;
                    }
                }
            }
        }

        // Lancer attacks (bishop rays), tunneling through friendly Masons.
        for s in self.piece_bb(us, PieceType::Lancer) {
            for dir in DIAG_DIRS {
                for &to in t.ray(s, dir) {
                    let cell = self.cell_at(to);
                    if cell.is_wall() {
                        break;
                    }
                    attacked.set(to);
                    if let Some(p) = cell.piece() {
                        if p.color == us && p.piece_type == PieceType::Mason {
                            continue;
                        }
                        break;
                    }
                }
            }
        }

        // Minister attacks (up to 2, or 3 with Dominance on Keep).
        for s in self.piece_bb(us, PieceType::Minister) {
            let max = 2 + (dom && s.is_keep()) as usize;
            for dir in 0..8 {
                for &to in t.ray(s, dir).iter().take(max) {
                    let cell = self.cell_at(to);
                    if cell.is_wall() {
                        break;
                    }
                    attacked.set(to);
                    if cell.piece().is_some() {
                        break;
                    }
                }
            }
        }

        // Sovereign attacks (up to 1, or 2 with Dominance on Keep);
        // none at all under Siege Attrition.
        if self.wall_tokens(us) <= 15 {
            for s in self.piece_bb(us, PieceType::Sovereign) {
                let max = 1 + (dom && s.is_keep()) as usize;
                for dir in 0..8 {
                    for &to in t.ray(s, dir).iter().take(max) {
                        let cell = self.cell_at(to);
                        if cell.is_wall() {
                            break;
                        }
                        attacked.set(to);
                        if cell.piece().is_some() {
                            break;
                        }
                    }
                }
            }
        }

        attacked
    }

    // ------------------------------------------------------------------
    // Mutation primitives
    // ------------------------------------------------------------------

    /// Rewrite one square, keeping bitboards and the running hash in sync.
    ///
    /// Does NOT update `sovereign_sq`/`wall_tokens` — those are maintained by
    /// the make/undo paths which know the action semantics.
    pub(crate) fn set_square_raw(&mut self, sq: Square, value: Cell) {
        let old = self.board[sq.index()];
        if old == value {
            return;
        }

        match old {
            Cell::Empty => {}
            Cell::Piece(p) => {
                self.piece_bb[p.color.index()][p.piece_type.index()].clear(sq);
                self.pieces_bb[p.color.index()].clear(sq);
                self.hash ^= POSITION_KEYS.cell_key(sq, old);
            }
            Cell::Wall(w) => {
                self.walls_bb[w.color.index()].clear(sq);
                if w.hp == 2 {
                    self.reinforced_bb[w.color.index()].clear(sq);
                }
                self.hash ^= POSITION_KEYS.cell_key(sq, old);
            }
        }

        self.board[sq.index()] = value;

        match value {
            Cell::Empty => {}
            Cell::Piece(p) => {
                self.piece_bb[p.color.index()][p.piece_type.index()].set(sq);
                self.pieces_bb[p.color.index()].set(sq);
                self.hash ^= POSITION_KEYS.cell_key(sq, value);
            }
            Cell::Wall(w) => {
                self.walls_bb[w.color.index()].set(sq);
                if w.hp == 2 {
                    self.reinforced_bb[w.color.index()].set(sq);
                }
                self.hash ^= POSITION_KEYS.cell_key(sq, value);
            }
        }
    }

    /// Rebuild every derived structure from the raw board
    pub(crate) fn rebuild_derived(&mut self) {
        self.piece_bb = [[Bitboard::EMPTY; PieceType::COUNT]; 2];
        self.pieces_bb = [Bitboard::EMPTY; 2];
        self.walls_bb = [Bitboard::EMPTY; 2];
        self.reinforced_bb = [Bitboard::EMPTY; 2];
        self.wall_tokens = [0, 0];
        self.sovereign_sq = [None, None];

        self.hash = 0;
        if self.turn == Color::Black {
            self.hash ^= POSITION_KEYS.turn;
        }
        for color in [Color::White, Color::Black] {
            if self.bastion_right[color.index()] {
                self.hash ^= POSITION_KEYS.bastion_key(color);
            }
            if self.wall_built_last[color.index()] {
                self.hash ^= POSITION_KEYS.wall_built_key(color);
            }
        }

        for sq in Square::all() {
            match self.board[sq.index()] {
                Cell::Empty => {}
                cell @ Cell::Piece(p) => {
                    self.piece_bb[p.color.index()][p.piece_type.index()].set(sq);
                    self.pieces_bb[p.color.index()].set(sq);
                    if p.piece_type == PieceType::Sovereign {
                        self.sovereign_sq[p.color.index()] = Some(sq);
                    }
                    self.hash ^= POSITION_KEYS.cell_key(sq, cell);
                }
                cell @ Cell::Wall(w) => {
                    self.walls_bb[w.color.index()].set(sq);
                    self.wall_tokens[w.color.index()] += w.hp as i32;
                    if w.hp == 2 {
                        self.reinforced_bb[w.color.index()].set(sq);
                    }
                    self.hash ^= POSITION_KEYS.cell_key(sq, cell);
                }
            }
        }
    }

    /// Recompute the hash from scratch (testing / validation)
    pub fn hash_from_scratch(&self) -> u64 {
        let mut h = 0u64;
        if self.turn == Color::Black {
            h ^= POSITION_KEYS.turn;
        }
        for color in [Color::White, Color::Black] {
            if self.bastion_right[color.index()] {
                h ^= POSITION_KEYS.bastion_key(color);
            }
            if self.wall_built_last[color.index()] {
                h ^= POSITION_KEYS.wall_built_key(color);
            }
        }
        for sq in Square::all() {
            h ^= POSITION_KEYS.cell_key(sq, self.board[sq.index()]);
        }
        h
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// ASCII board diagram with state summary (debugging aid)
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Turn: {}  Bastion rights: {}{}  Walls: W={} B={}",
            self.turn.name(),
            if self.bastion_right(Color::White) { "W" } else { "-" },
            if self.bastion_right(Color::Black) { "b" } else { "-" },
            self.wall_tokens(Color::White),
            self.wall_tokens(Color::Black),
        );
        if let Some((winner, reason)) = self.winner {
            let _ = writeln!(
                out,
                "Winner: {} ({})",
                winner.name(),
                match reason {
                    WinReason::Regicide => "Regicide",
                    WinReason::Entombment => "Entombment",
                }
            );
        }

        out.push_str("   A B C D E F G H I\n");
        for r in 0..9u8 {
            let _ = write!(out, "{}  ", 9 - r);
            for c in 0..9u8 {
                let ch = match self.cell_at(Square::new(r, c)) {
                    Cell::Empty => '.',
                    Cell::Piece(p) => {
                        let up = match p.piece_type {
                            PieceType::Mason => 'M',
                            PieceType::Catapult => 'C',
                            PieceType::Lancer => 'L',
                            PieceType::Pegasus => 'P',
                            PieceType::Minister => 'I',
                            PieceType::Sovereign => 'S',
                        };
                        if p.color == Color::Black {
                            up.to_ascii_lowercase()
                        } else {
                            up
                        }
                    }
                    Cell::Wall(w) => {
                        let up = if w.hp == 2 { 'R' } else { 'W' };
                        if w.color == Color::Black {
                            up.to_ascii_lowercase()
                        } else {
                            up
                        }
                    }
                };
                out.push(ch);
                if c != 8 {
                    out.push(' ');
                }
            }
            out.push('\n');
        }
        out
    }

    /// Count blocked (wall or off-board) 8-neighbors around `color`'s
    /// Sovereign; 8 means entombed. Used by the evaluator.
    pub(crate) fn entomb_blocked_neighbors(&self, color: Color) -> i32 {
        let Some(k) = self.sovereign_sq(color) else {
            return 0;
        };
        let (r0, c0) = (k.row(), k.col());
        let mut blocked = 0;
        for (dr, dc) in DIRS8 {
            match Square::from_coords(r0 + dr, c0 + dc) {
                None => blocked += 1,
                Some(adj) => {
                    if self.cell_at(adj).is_wall() {
                        blocked += 1;
                    }
                }
            }
        }
        blocked
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::initial()
    }
}
