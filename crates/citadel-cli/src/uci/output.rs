//! Protocol output formatting

use std::fmt::Write as _;

use citadel_core::notation::move_to_token;
use citadel_core::{Move, SearchInfo, MATE};

/// Scores this close to +/-MATE are reported as `mate N`
const MATE_REPORT_MARGIN: i32 = 10_000;

/// `bestmove` token; `0000` when there is no legal move
pub fn bestmove_token(m: Move) -> String {
    if m.is_none() {
        "0000".to_string()
    } else {
        move_to_token(m)
    }
}

/// One `info` line for a completed depth
pub fn info_line(info: &SearchInfo) -> String {
    let mut out = format!("info depth {}", info.depth);
    if info.seldepth > 0 {
        let _ = write!(out, " seldepth {}", info.seldepth);
    }

    let score = info.score;
    if score > MATE - MATE_REPORT_MARGIN || score < -MATE + MATE_REPORT_MARGIN {
        let mate_plies = if score > 0 { MATE - score } else { MATE + score };
        let mate_moves = (mate_plies + 1) / 2;
        let signed = if score > 0 { mate_moves } else { -mate_moves };
        let _ = write!(out, " score mate {signed}");
    } else {
        let _ = write!(out, " score cp {score}");
    }

    let nps = if info.time_ms > 0 { info.nodes * 1000 / info.time_ms } else { 0 };
    let _ = write!(out, " nodes {} nps {nps} time {}", info.nodes, info.time_ms);

    if !info.pv.is_empty() {
        out.push_str(" pv");
        for &m in &info.pv {
            let _ = write!(out, " {}", move_to_token(m));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use citadel_core::{MoveVec, Square};

    #[test]
    fn test_bestmove_token() {
        assert_eq!(bestmove_token(Move::NONE), "0000");
        let m = Move::normal(Square::new(7, 4), Square::new(6, 4));
        assert_eq!(bestmove_token(m), "e2e3");
    }

    #[test]
    fn test_info_line_cp() {
        let info = SearchInfo {
            depth: 5,
            seldepth: 9,
            score: 34,
            nodes: 2000,
            time_ms: 100,
            best: Move::normal(Square::new(7, 4), Square::new(6, 4)),
            pv: MoveVec::from_slice(&[Move::normal(Square::new(7, 4), Square::new(6, 4))]),
        };
        let line = info_line(&info);
        assert_eq!(line, "info depth 5 seldepth 9 score cp 34 nodes 2000 nps 20000 time 100 pv e2e3");
    }

    #[test]
    fn test_info_line_mate() {
        let info = SearchInfo { depth: 3, score: MATE - 3, ..Default::default() };
        // Mate in 3 plies = 2 moves for the winner.
        assert!(info_line(&info).contains("score mate 2"));

        let info = SearchInfo { depth: 3, score: -(MATE - 4), ..Default::default() };
        assert!(info_line(&info).contains("score mate -2"));
    }

    #[test]
    fn test_info_line_zero_time() {
        let info = SearchInfo { depth: 1, score: 0, nodes: 500, time_ms: 0, ..Default::default() };
        assert!(info_line(&info).contains("nps 0"));
    }
}
