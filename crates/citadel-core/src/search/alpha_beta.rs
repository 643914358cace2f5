//! Iterative deepening PVS search

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::citadel::{Color, Move, MoveVec, PieceType, Position};
use crate::evaluation::nnue::{Accumulator, Nnue};
use crate::evaluation::{hce, EvalMode};
use crate::movegen::{generate_moves, generate_noisy_moves, MoveList};

use super::history::OrderingHistory;
use super::ordering::{is_quiet_move, move_heuristic, order_score};
use super::tt::{score_from_tt, score_to_tt, Bound, TranspositionTable};
use super::zobrist::{hash_after_make, hash_after_null, hash_position};
use super::{
    mate_score, SearchInfo, SearchLimits, SearchOptions, SearchResult, INF, MATE, MAX_PLY,
    NODE_CHECK_MASK, QS_MAX_DEPTH,
};

/// Per-search bookkeeping: limits, counters and the abort latch
struct Ctx<'a> {
    nnue: Option<&'a Nnue>,
    use_tt: bool,
    stop: Option<&'a AtomicBool>,
    node_limit: u64,
    start: Instant,
    deadline: Option<Instant>,
    nodes: u64,
    seldepth: i32,
    aborted: bool,
}

impl Ctx<'_> {
    fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Poll limits every ~2k nodes; aborting also raises the external stop
    /// flag so a driver waiting on it wakes up.
    fn should_stop(&mut self) -> bool {
        if self.aborted {
            return true;
        }
        if self.nodes & NODE_CHECK_MASK != 0 {
            return false;
        }
        if let Some(stop) = self.stop {
            if stop.load(Ordering::Relaxed) {
                self.aborted = true;
                return true;
            }
        }
        if self.node_limit != 0 && self.nodes >= self.node_limit {
            self.aborted = true;
            if let Some(stop) = self.stop {
                stop.store(true, Ordering::Relaxed);
            }
            return true;
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                self.aborted = true;
                if let Some(stop) = self.stop {
                    stop.store(true, Ordering::Relaxed);
                }
                return true;
            }
        }
        false
    }
}

struct RootOut {
    score: i32,
    best: Move,
}

/// Reusable search state: transposition table, ordering heuristics and the
/// per-ply scratch buffers (move lists, score arrays, NNUE accumulators).
///
/// One searcher serves one thread; the buffers that would otherwise live in
/// thread-local storage are owned here instead.
pub struct Searcher {
    tt: TranspositionTable,
    history: OrderingHistory,
    ply_moves: Vec<MoveList>,
    ply_scores: Vec<Vec<i32>>,
    ply_acc: Vec<Accumulator>,
}

impl Searcher {
    /// Default transposition table size
    pub const DEFAULT_TT_MB: usize = 16;

    pub fn new() -> Self {
        Self::with_tt_size_mb(Self::DEFAULT_TT_MB)
    }

    /// Create with a specific TT size
    pub fn with_tt_size_mb(mb: usize) -> Self {
        Searcher {
            tt: TranspositionTable::new(mb),
            history: OrderingHistory::new(),
            ply_moves: (0..MAX_PLY).map(|_| MoveList::new()).collect(),
            ply_scores: (0..MAX_PLY).map(|_| Vec::new()).collect(),
            ply_acc: vec![Accumulator::default(); MAX_PLY],
        }
    }

    /// Resize the transposition table (drops all entries). Requires that no
    /// search is in flight, which ownership already guarantees.
    pub fn set_tt_size_mb(&mut self, mb: usize) {
        self.tt.resize(mb);
    }

    /// Drop all transposition table entries
    pub fn clear_tt(&mut self) {
        self.tt.clear();
    }

    /// Configured TT size
    pub fn tt_size_mb(&self) -> usize {
        self.tt.size_mb()
    }

    /// Search `pos` under `opts` and return the best move from the deepest
    /// completed iteration. Never fails: on an immediate stop it falls back
    /// to the TT root entry or the first generated move.
    pub fn search(&mut self, pos: &mut Position, mut opts: SearchOptions<'_>) -> SearchResult {
        let start = Instant::now();
        let limits: SearchLimits = opts.limits;

        let mut ctx = Ctx {
            nnue: opts.eval.nnue(),
            use_tt: opts.use_tt,
            stop: opts.stop,
            node_limit: limits.nodes,
            start,
            deadline: (limits.movetime_ms != 0)
                .then(|| start + std::time::Duration::from_millis(limits.movetime_ms)),
            nodes: 0,
            seldepth: 0,
            aborted: false,
        };

        self.history.clear();

        let max_depth = limits.depth.clamp(1, MAX_PLY as i32 - 1);

        let mut root_moves = MoveList::new();
        generate_moves(pos, &mut root_moves);
        if root_moves.is_empty() {
            return SearchResult {
                best: Move::NONE,
                score: 0,
                nodes: 0,
                seconds: start.elapsed().as_secs_f64(),
            };
        }

        if let Some(net) = ctx.nnue {
            self.ply_acc[0] = net.init_accumulator(pos);
        }

        let root_key = hash_position(pos);

        let mut best_move = root_moves.at(0);
        let mut best_score = -INF;
        let mut prev_score = 0;
        let mut last_completed_depth = 0;

        for cur_depth in 1..=max_depth {
            if ctx.should_stop() {
                break;
            }
            ctx.seldepth = 0;

            // Aspiration window around the previous score, doubled on fail
            // with the failing side opened fully.
            let mut window = if cur_depth <= 2 { 140 } else { 90 };
            let mut alpha = -INF;
            let mut beta = INF;
            if cur_depth > 1 {
                alpha = prev_score - window;
                beta = prev_score + window;
            }

            let iter = loop {
                let iter = self.search_root(pos, &mut ctx, &mut root_moves, root_key, cur_depth, alpha, beta);
                if ctx.aborted || cur_depth == 1 {
                    break iter;
                }
                if iter.score <= alpha {
                    alpha = -INF;
                    window *= 2;
                    beta = iter.score + window;
                    continue;
                }
                if iter.score >= beta {
                    beta = INF;
                    window *= 2;
                    alpha = iter.score - window;
                    continue;
                }
                break iter;
            };

            if ctx.aborted {
                break;
            }

            best_move = iter.best;
            best_score = iter.score;
            prev_score = best_score;
            last_completed_depth = cur_depth;

            if let Some(cb) = opts.on_info.as_mut() {
                let pv = if ctx.use_tt {
                    self.extract_pv(pos, root_key, (cur_depth + 16).min(MAX_PLY as i32 - 1) as usize)
                } else {
                    MoveVec::new()
                };
                let info = SearchInfo {
                    depth: cur_depth,
                    seldepth: ctx.seldepth,
                    score: best_score,
                    nodes: ctx.nodes,
                    time_ms: ctx.elapsed_ms(),
                    best: best_move,
                    pv,
                };
                cb(&info);
            }
        }

        // Never finished a single depth (very short limits): fall back to the
        // TT root entry, else the first generated move with a static eval.
        if last_completed_depth == 0 {
            let mut fell_back = false;
            if ctx.use_tt {
                if let Some(e) = self.tt.probe(root_key) {
                    if !e.best.is_none() && root_moves.contains(e.best) {
                        best_move = e.best;
                    }
                    best_score = score_from_tt(e.score, 0);
                    fell_back = true;
                }
            }
            if !fell_back {
                best_move = root_moves.at(0);
                best_score = self.eval_stm(pos, ctx.nnue, 0);
            }
            log::debug!(
                "search stopped before completing depth 1; falling back to {}",
                best_move
            );
        }

        SearchResult {
            best: best_move,
            score: best_score,
            nodes: ctx.nodes,
            seconds: start.elapsed().as_secs_f64(),
        }
    }

    /// Static evaluation from the side to move's perspective
    fn eval_stm(&self, pos: &Position, nnue: Option<&Nnue>, ply: usize) -> i32 {
        match nnue {
            Some(net) if ply < MAX_PLY => {
                net.evaluate_stm(pos.turn() == Color::White, &self.ply_acc[ply])
            }
            _ => hce::evaluate_stm(pos),
        }
    }

    fn non_sovereign_piece_count(pos: &Position, color: Color) -> i32 {
        let mut n = 0;
        for pt in [
            PieceType::Mason,
            PieceType::Catapult,
            PieceType::Lancer,
            PieceType::Pegasus,
            PieceType::Minister,
        ] {
            n += pos.piece_count(color, pt) as i32;
        }
        n
    }

    #[allow(clippy::too_many_arguments)]
    fn search_root(
        &mut self,
        pos: &mut Position,
        ctx: &mut Ctx<'_>,
        moves: &mut MoveList,
        root_key: u64,
        depth: i32,
        mut alpha: i32,
        beta: i32,
    ) -> RootOut {
        let mut out = RootOut { score: -INF, best: Move::NONE };
        if moves.is_empty() {
            return out;
        }

        let tt_best = if ctx.use_tt {
            self.tt.probe(root_key).map_or(Move::NONE, |e| e.best)
        } else {
            Move::NONE
        };

        let mut scores: Vec<i32> = Vec::with_capacity(moves.len());
        for &m in moves.iter() {
            scores.push(order_score(pos, m, tt_best, &self.history, 0));
        }

        let alpha0 = alpha;
        let mut best_score = -INF;
        let mut best_move = moves.at(0);

        for i in 0..moves.len() {
            // Selection ordering: best remaining first.
            let mut best_idx = i;
            for j in (i + 1)..moves.len() {
                if scores[j] > scores[best_idx] {
                    best_idx = j;
                }
            }
            if best_idx != i {
                moves.swap(i, best_idx);
                scores.swap(i, best_idx);
            }

            let m = moves.at(i);
            if ctx.nnue.is_some() {
                self.ply_acc[1] = self.ply_acc[0];
            }
            let u = pos.make_move(m);
            if let Some(net) = ctx.nnue {
                net.apply_delta_after_move(&mut self.ply_acc[1], pos, &u);
            }
            let child_key = hash_after_make(root_key, pos, &u);

            let score = if pos.game_over() {
                mate_score(1)
            } else if i == 0 {
                -self.negamax(pos, ctx, depth - 1, -beta, -alpha, 1, child_key, true)
            } else {
                let mut s = -self.negamax(pos, ctx, depth - 1, -(alpha + 1), -alpha, 1, child_key, false);
                if !ctx.aborted && s > alpha && s < beta {
                    s = -self.negamax(pos, ctx, depth - 1, -beta, -alpha, 1, child_key, true);
                }
                s
            };

            pos.undo_move(&u);
            if ctx.aborted {
                break;
            }

            if score > best_score {
                best_score = score;
                best_move = m;
            }
            if score > alpha {
                alpha = score;
            }
            if alpha >= beta {
                // Aspiration fail-high at the root.
                if is_quiet_move(pos, m) {
                    self.history.record_quiet_cutoff(m, 0, depth);
                }
                break;
            }
        }

        // Keep the root entry fresh for ordering and PV reconstruction.
        if ctx.use_tt {
            let bound = if best_score <= alpha0 {
                Bound::Upper
            } else if best_score >= beta {
                Bound::Lower
            } else {
                Bound::Exact
            };
            self.tt.store_forced(root_key, depth, bound, score_to_tt(best_score, 0), best_move);
        }

        out.score = best_score;
        out.best = best_move;
        out
    }

    #[allow(clippy::too_many_arguments)]
    fn negamax(
        &mut self,
        pos: &mut Position,
        ctx: &mut Ctx<'_>,
        depth: i32,
        mut alpha: i32,
        mut beta: i32,
        ply: usize,
        key: u64,
        pv_node: bool,
    ) -> i32 {
        // Threefold repetition is a *claimable* draw: the side to move can
        // always secure 0, but may decline and play on.
        let can_claim_draw = ply > 0 && pos.is_repetition();
        if depth <= 0 {
            let q = self.quiescence(pos, ctx, alpha, beta, ply, key, QS_MAX_DEPTH);
            return if can_claim_draw { q.max(0) } else { q };
        }

        ctx.nodes += 1;
        if ply as i32 > ctx.seldepth {
            ctx.seldepth = ply as i32;
        }
        if ctx.should_stop() {
            return 0;
        }

        if pos.game_over() {
            // The winner is the side to move: a win never flips the turn.
            return mate_score(ply as i32);
        }
        if ply >= MAX_PLY {
            return self.eval_stm(pos, ctx.nnue, ply);
        }

        let alpha_orig = alpha;

        let mut best = -INF;
        if can_claim_draw {
            best = 0;
            if best > alpha {
                alpha = best;
            }
            if alpha >= beta {
                return best;
            }
        }

        // Mate-distance pruning.
        alpha = alpha.max(-MATE + ply as i32);
        beta = beta.min(MATE - ply as i32 - 1);
        if alpha >= beta {
            return alpha;
        }

        // Transposition table probe.
        let mut tt_best = Move::NONE;
        if ctx.use_tt {
            if let Some(e) = self.tt.probe(key) {
                tt_best = e.best;
                if e.depth >= depth {
                    let mut tt_score = score_from_tt(e.score, ply as i32);
                    if can_claim_draw && tt_score < 0 {
                        tt_score = 0;
                    }
                    match e.bound {
                        Bound::Exact => {
                            // With a draw claim available an Exact 0 can be
                            // history-dependent; don't short-circuit a
                            // potentially winning continuation.
                            if !can_claim_draw || tt_score != 0 {
                                return tt_score;
                            }
                        }
                        Bound::Lower => {
                            if tt_score >= beta {
                                return tt_score;
                            }
                        }
                        Bound::Upper => {
                            if tt_score <= alpha {
                                return tt_score;
                            }
                        }
                    }
                }
            }
        }

        let mut cached_eval: Option<i32> = None;

        // Freshly trained nets drift; prune less aggressively on NNUE.
        let conservative = ctx.nnue.is_some();

        // Razoring at shallow depth: far below alpha goes straight to
        // quiescence.
        if !pv_node && depth <= 2 && !conservative {
            let ev =
                *cached_eval.get_or_insert_with(|| self.eval_stm(pos, ctx.nnue, ply));
            let razor_margin = 220 + (depth - 1) * 180;
            if ev + razor_margin <= alpha {
                return self.quiescence(pos, ctx, alpha, beta, ply, key, QS_MAX_DEPTH);
            }
        }

        // Reverse futility at shallow depth.
        if !pv_node && depth <= 2 && !conservative {
            let ev =
                *cached_eval.get_or_insert_with(|| self.eval_stm(pos, ctx.nnue, ply));
            let margin = 160 + depth * 120;
            if ev - margin >= beta {
                return ev;
            }
        }

        // Null-move pruning, skipped in low material to dodge zugzwang.
        let nmp_min_depth = if conservative { 4 } else { 3 };
        let nmp_min_pieces = if conservative { 4 } else { 3 };
        if !pv_node
            && depth >= nmp_min_depth
            && ply > 0
            && Self::non_sovereign_piece_count(pos, pos.turn()) >= nmp_min_pieces
        {
            let r = if conservative {
                1 + (depth >= 7) as i32
            } else {
                2 + (depth >= 6) as i32
            };
            if ctx.nnue.is_some() && ply + 1 < MAX_PLY {
                self.ply_acc[ply + 1] = self.ply_acc[ply];
            }
            let nu = pos.make_null_move();
            if let Some(net) = ctx.nnue {
                if ply + 1 < MAX_PLY {
                    net.apply_delta_after_null_move(&mut self.ply_acc[ply + 1], pos, &nu);
                }
            }
            let null_key = hash_after_null(key);
            let score =
                -self.negamax(pos, ctx, depth - 1 - r, -beta, -(beta - 1), ply + 1, null_key, false);
            pos.undo_null_move(&nu);
            if ctx.aborted {
                return 0;
            }
            if score >= beta {
                return beta;
            }
        }

        let mut moves = std::mem::take(&mut self.ply_moves[ply]);
        let mut scores = std::mem::take(&mut self.ply_scores[ply]);
        generate_moves(pos, &mut moves);

        let result = if moves.is_empty() {
            *cached_eval.get_or_insert_with(|| self.eval_stm(pos, ctx.nnue, ply))
        } else {
            scores.clear();
            for &m in &moves {
                scores.push(order_score(pos, m, tt_best, &self.history, ply));
            }

            let mut best_move = moves.at(0);
            let mut aborted_mid = false;

            for i in 0..moves.len() {
                let mut best_idx = i;
                for j in (i + 1)..moves.len() {
                    if scores[j] > scores[best_idx] {
                        best_idx = j;
                    }
                }
                if best_idx != i {
                    moves.swap(i, best_idx);
                    scores.swap(i, best_idx);
                }

                let m = moves.at(i);
                let quiet = is_quiet_move(pos, m);

                // Futility: at depth 1 skip late quiet moves that cannot
                // raise alpha.
                if !pv_node && depth == 1 && quiet {
                    let ev = *cached_eval
                        .get_or_insert_with(|| self.eval_stm(pos, ctx.nnue, ply));
                    let margin = if conservative { 340 } else { 220 };
                    if ev + margin <= alpha {
                        continue;
                    }
                }

                // Late-move pruning at depth 2: after enough quiet tries,
                // skip the rest unless the eval is close. Speeds up locked
                // wall endgames considerably.
                if !pv_node && depth == 2 && quiet {
                    let move_count = if conservative { 32 } else { 20 };
                    let margin = if conservative { 200 } else { 140 };
                    if i >= move_count {
                        let ev = *cached_eval
                            .get_or_insert_with(|| self.eval_stm(pos, ctx.nnue, ply));
                        if ev + margin <= alpha {
                            continue;
                        }
                    }
                }

                if ctx.nnue.is_some() && ply + 1 < MAX_PLY {
                    self.ply_acc[ply + 1] = self.ply_acc[ply];
                }
                let u = pos.make_move(m);
                if let Some(net) = ctx.nnue {
                    if ply + 1 < MAX_PLY {
                        net.apply_delta_after_move(&mut self.ply_acc[ply + 1], pos, &u);
                    }
                }
                let child_key = hash_after_make(key, pos, &u);

                let mut score;
                if pos.game_over() {
                    score = mate_score(ply as i32 + 1);
                } else {
                    let new_depth = depth - 1;

                    if pv_node && i == 0 {
                        score = -self
                            .negamax(pos, ctx, new_depth, -beta, -alpha, ply + 1, child_key, true);
                    } else {
                        // PVS null window, with LMR for late quiet moves.
                        let do_lmr = !pv_node && quiet && depth >= 3 && i >= 4;
                        let mut search_depth = new_depth;
                        if do_lmr {
                            let r = 1 + (i >= 8) as i32 + (depth >= 6) as i32;
                            search_depth = (new_depth - r).max(1);
                        }

                        score = -self.negamax(
                            pos,
                            ctx,
                            search_depth,
                            -(alpha + 1),
                            -alpha,
                            ply + 1,
                            child_key,
                            false,
                        );
                        if !ctx.aborted && score > alpha {
                            if do_lmr && search_depth != new_depth {
                                score = -self.negamax(
                                    pos,
                                    ctx,
                                    new_depth,
                                    -(alpha + 1),
                                    -alpha,
                                    ply + 1,
                                    child_key,
                                    false,
                                );
                            }
                            if score > alpha && score < beta {
                                score = -self.negamax(
                                    pos, ctx, new_depth, -beta, -alpha, ply + 1, child_key, true,
                                );
                            }
                        }
                    }
                }

                pos.undo_move(&u);
                if ctx.aborted {
                    aborted_mid = true;
                    break;
                }

                if score > best {
                    best = score;
                    best_move = m;
                }
                if best > alpha {
                    alpha = best;
                }
                if alpha >= beta {
                    if quiet {
                        self.history.record_quiet_cutoff(m, ply, depth);
                    }
                    break;
                }
            }

            if aborted_mid {
                0
            } else {
                if ctx.use_tt {
                    let bound = if best <= alpha_orig {
                        Bound::Upper
                    } else if best >= beta {
                        Bound::Lower
                    } else {
                        Bound::Exact
                    };
                    self.tt.store(key, depth, bound, score_to_tt(best, ply as i32), best_move);
                }
                best
            }
        };

        self.ply_moves[ply] = moves;
        self.ply_scores[ply] = scores;
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn quiescence(
        &mut self,
        pos: &mut Position,
        ctx: &mut Ctx<'_>,
        mut alpha: i32,
        beta: i32,
        ply: usize,
        key: u64,
        qdepth: i32,
    ) -> i32 {
        ctx.nodes += 1;
        if ply as i32 > ctx.seldepth {
            ctx.seldepth = ply as i32;
        }
        if ctx.should_stop() {
            return 0;
        }

        if pos.game_over() {
            // The side to move is the winner: wins never flip the turn.
            return mate_score(ply as i32);
        }
        if ply >= MAX_PLY {
            return self.eval_stm(pos, ctx.nnue, ply);
        }

        // A claimable draw floors the score at zero.
        if ply > 0 && pos.is_repetition() {
            if alpha < 0 {
                alpha = 0;
            }
            if alpha >= beta {
                return alpha;
            }
        }

        let stand = self.eval_stm(pos, ctx.nnue, ply);
        if stand >= beta {
            return beta;
        }
        if stand > alpha {
            alpha = stand;
        }
        if qdepth <= 0 {
            return alpha;
        }

        let mut moves = std::mem::take(&mut self.ply_moves[ply]);
        let mut scores = std::mem::take(&mut self.ply_scores[ply]);
        generate_noisy_moves(pos, &mut moves);

        let result = if moves.is_empty() {
            alpha
        } else {
            scores.clear();
            for &m in &moves {
                scores.push(move_heuristic(pos, m));
            }

            let mut result = alpha;
            for i in 0..moves.len() {
                let mut best_idx = i;
                for j in (i + 1)..moves.len() {
                    if scores[j] > scores[best_idx] {
                        best_idx = j;
                    }
                }
                if best_idx != i {
                    moves.swap(i, best_idx);
                    scores.swap(i, best_idx);
                }

                let m = moves.at(i);
                if ctx.nnue.is_some() && ply + 1 < MAX_PLY {
                    self.ply_acc[ply + 1] = self.ply_acc[ply];
                }
                let u = pos.make_move(m);
                if let Some(net) = ctx.nnue {
                    if ply + 1 < MAX_PLY {
                        net.apply_delta_after_move(&mut self.ply_acc[ply + 1], pos, &u);
                    }
                }
                let child_key = hash_after_make(key, pos, &u);

                let score = if pos.game_over() {
                    mate_score(ply as i32 + 1)
                } else {
                    -self.quiescence(pos, ctx, -beta, -result, ply + 1, child_key, qdepth - 1)
                };

                pos.undo_move(&u);
                if ctx.aborted {
                    result = 0;
                    break;
                }

                if score >= beta {
                    result = beta;
                    break;
                }
                if score > result {
                    result = score;
                }
            }
            result
        };

        self.ply_moves[ply] = moves;
        self.ply_scores[ply] = scores;
        result
    }

    /// Walk the PV by following TT best moves, guarded against cycles
    fn extract_pv(&mut self, root: &Position, mut key: u64, max_len: usize) -> MoveVec {
        let mut pv = MoveVec::new();
        if max_len == 0 {
            return pv;
        }

        let mut pos = root.clone();
        let mut seen: Vec<u64> = Vec::with_capacity(max_len);
        let mut moves = MoveList::new();

        for _ in 0..max_len {
            if pos.game_over() {
                break;
            }
            if seen.contains(&key) {
                break;
            }
            seen.push(key);

            let Some(e) = self.tt.probe(key) else {
                break;
            };
            if e.best.is_none() {
                break;
            }

            generate_moves(&mut pos, &mut moves);
            if !moves.contains(e.best) {
                break;
            }

            pv.push(e.best);
            let u = pos.make_move(e.best);
            key = hash_after_make(key, &pos, &u);
        }

        pv
    }
}

impl Default for Searcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citadel::Square;

    #[test]
    fn test_returns_a_root_legal_move() {
        let mut pos = Position::initial();
        let mut searcher = Searcher::with_tt_size_mb(1);
        let res = searcher.search(&mut pos, SearchOptions::depth(2));

        let mut list = MoveList::new();
        generate_moves(&mut pos, &mut list);
        assert!(list.contains(res.best));
        assert!(res.nodes > 0);
        // The search restores the position.
        assert_eq!(pos, Position::initial());
    }

    #[test]
    fn test_finds_mate_in_one() {
        // Open file: the catapult takes the sovereign outright.
        let mut pos = Position::from_fen("s8/9/9/9/9/9/9/9/C3S4 w - - 0 1").unwrap();
        let mut searcher = Searcher::with_tt_size_mb(1);
        let res = searcher.search(&mut pos, SearchOptions::depth(3));

        assert_eq!(res.best, Move::catapult(Square::new(8, 0), Square::new(0, 0), None));
        assert!(res.score >= MATE - 100, "expected mate-class score, got {}", res.score);
    }

    #[test]
    fn test_mate_class_score_with_depth() {
        // Catapult vs sovereign-and-mason: conversion is in hand; the score
        // must at least be decisively positive and the move legal.
        let mut pos = Position::from_fen("4C4/9/9/9/4S4/9/9/4m4/4s4 w - - 0 1").unwrap();
        let mut searcher = Searcher::with_tt_size_mb(4);
        let res = searcher.search(&mut pos, SearchOptions::depth(4));
        assert!(res.score > 0);

        let mut list = MoveList::new();
        generate_moves(&mut pos, &mut list);
        assert!(list.contains(res.best));
    }

    #[test]
    fn test_deterministic_without_tt() {
        let fen = "4s4/2m6/9/9/2C3l2/9/9/6M2/4S4 w - - 0 1";
        let mut run = || {
            let mut pos = Position::from_fen(fen).unwrap();
            let mut searcher = Searcher::with_tt_size_mb(1);
            let mut opts = SearchOptions::depth(4);
            opts.use_tt = false;
            searcher.search(&mut pos, opts)
        };
        let a = run();
        let b = run();
        assert_eq!(a.score, b.score);
        assert_eq!(a.best, b.best);
        assert_eq!(a.nodes, b.nodes);
    }

    #[test]
    fn test_node_limit_aborts_but_returns_a_move() {
        let mut pos = Position::initial();
        let mut searcher = Searcher::with_tt_size_mb(1);
        let mut opts = SearchOptions::depth(50);
        opts.limits.nodes = 3000;
        let res = searcher.search(&mut pos, opts);

        assert!(res.nodes < 20_000);
        let mut list = MoveList::new();
        generate_moves(&mut pos, &mut list);
        assert!(list.contains(res.best));
    }

    #[test]
    fn test_stop_flag_is_honored() {
        let stop = AtomicBool::new(true);
        let mut pos = Position::initial();
        let mut searcher = Searcher::with_tt_size_mb(1);
        let mut opts = SearchOptions::depth(50);
        opts.stop = Some(&stop);
        let res = searcher.search(&mut pos, opts);
        // Stopped before depth 1 completed: the fallback still yields a move.
        let mut list = MoveList::new();
        generate_moves(&mut pos, &mut list);
        assert!(list.contains(res.best));
    }

    #[test]
    fn test_repetition_claim_floor() {
        // Two lone sovereigns shuffle through a 4-ply cycle twice; at the
        // repetition node the side to move can always claim at least 0.
        let mut pos = Position::from_fen("9/4s4/9/9/9/9/9/4S4/9 w - - 0 1").unwrap();
        let cycle = [
            Move::normal(Square::new(7, 4), Square::new(7, 3)),
            Move::normal(Square::new(1, 4), Square::new(1, 3)),
            Move::normal(Square::new(7, 3), Square::new(7, 4)),
            Move::normal(Square::new(1, 3), Square::new(1, 4)),
        ];
        for _ in 0..2 {
            for m in cycle {
                pos.make_move(m);
            }
        }
        assert!(pos.is_repetition());

        let mut searcher = Searcher::with_tt_size_mb(1);
        let res = searcher.search(&mut pos, SearchOptions::depth(4));
        assert!(res.score >= 0, "claim-draw floor violated: {}", res.score);
    }

    #[test]
    fn test_searches_with_nnue_backend() {
        let net = Nnue::zeroed();
        let mut pos = Position::initial();
        let mut searcher = Searcher::with_tt_size_mb(1);
        let mut opts = SearchOptions::depth(3);
        opts.eval = EvalMode::Nnue(&net);
        let res = searcher.search(&mut pos, opts);

        let mut list = MoveList::new();
        generate_moves(&mut pos, &mut list);
        assert!(list.contains(res.best));
        assert_eq!(pos, Position::initial());
    }

    #[test]
    fn test_info_callback_reports_each_depth() {
        let mut depths = Vec::new();
        let mut on_info = |info: &SearchInfo| depths.push(info.depth);

        let mut pos = Position::initial();
        let mut searcher = Searcher::with_tt_size_mb(1);
        let mut opts = SearchOptions::depth(3);
        opts.on_info = Some(&mut on_info);
        searcher.search(&mut pos, opts);

        assert_eq!(depths, vec![1, 2, 3]);
    }

    #[test]
    fn test_no_legal_moves_returns_none() {
        let mut pos = Position::from_fen("9/9/9/9/C3s4/9/9/9/S8 w - - 0 1").unwrap();
        let mut list = MoveList::new();
        generate_moves(&mut pos, &mut list);
        let cap = *list.iter().find(|m| m.to() == Square::new(4, 4)).unwrap();
        pos.make_move(cap);
        assert!(pos.game_over());

        let mut searcher = Searcher::with_tt_size_mb(1);
        let res = searcher.search(&mut pos, SearchOptions::depth(3));
        assert!(res.best.is_none());
        assert_eq!(res.score, 0);
    }
}
