//! Search limits, options and results

use std::sync::atomic::AtomicBool;

use crate::citadel::{Move, MoveVec};
use crate::evaluation::EvalMode;

/// Hard limits for one search call. Zero means unlimited.
#[derive(Clone, Copy, Debug)]
pub struct SearchLimits {
    /// Maximum depth in plies (>= 1)
    pub depth: i32,
    /// Node cap (0 = unlimited)
    pub nodes: u64,
    /// Wall-clock cap in milliseconds (0 = unlimited)
    pub movetime_ms: u64,
}

impl Default for SearchLimits {
    fn default() -> Self {
        SearchLimits { depth: 4, nodes: 0, movetime_ms: 0 }
    }
}

impl SearchLimits {
    /// Depth-only limits
    pub fn depth(depth: i32) -> Self {
        SearchLimits { depth, ..Default::default() }
    }
}

/// Per-depth progress snapshot
#[derive(Clone, Debug, Default)]
pub struct SearchInfo {
    /// Completed depth
    pub depth: i32,
    /// Maximum ply reached (quiescence included)
    pub seldepth: i32,
    /// Score from the side to move's perspective
    pub score: i32,
    /// Nodes searched so far
    pub nodes: u64,
    /// Elapsed milliseconds
    pub time_ms: u64,
    /// Best move so far
    pub best: Move,
    /// Principal variation reconstructed from the TT
    pub pv: MoveVec,
}

/// Callback invoked after each completed depth
pub type InfoCallback<'a> = &'a mut dyn FnMut(&SearchInfo);

/// Options for one search call
pub struct SearchOptions<'a> {
    /// Hard limits
    pub limits: SearchLimits,
    /// Evaluation backend
    pub eval: EvalMode<'a>,
    /// Use the transposition table. Disable when several searchers probe the
    /// same position concurrently; the table is single-writer.
    pub use_tt: bool,
    /// External cooperative stop flag, polled every ~2k nodes
    pub stop: Option<&'a AtomicBool>,
    /// Progress callback
    pub on_info: Option<InfoCallback<'a>>,
}

impl Default for SearchOptions<'_> {
    fn default() -> Self {
        SearchOptions {
            limits: SearchLimits::default(),
            eval: EvalMode::Hce,
            use_tt: true,
            stop: None,
            on_info: None,
        }
    }
}

impl<'a> SearchOptions<'a> {
    /// Depth-limited search with defaults otherwise
    pub fn depth(depth: i32) -> Self {
        SearchOptions { limits: SearchLimits::depth(depth), ..Default::default() }
    }
}

/// Final search outcome
#[derive(Clone, Debug, Default)]
pub struct SearchResult {
    /// Best move from the deepest completed iteration
    pub best: Move,
    /// Its score from the side to move's perspective
    pub score: i32,
    /// Total nodes searched
    pub nodes: u64,
    /// Wall-clock seconds
    pub seconds: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let limits = SearchLimits::default();
        assert_eq!(limits.depth, 4);
        assert_eq!(limits.nodes, 0);
        assert_eq!(limits.movetime_ms, 0);

        let opts = SearchOptions::depth(7);
        assert_eq!(opts.limits.depth, 7);
        assert!(opts.use_tt);
        assert!(opts.stop.is_none());
    }
}
