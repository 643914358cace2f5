//! End-to-end search behavior over the public API

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use citadel_core::notation::{move_to_token, parse_move};
use citadel_core::{
    generate_moves, MoveList, Position, SearchLimits, SearchOptions, Searcher, MATE,
};

#[test]
fn plays_a_scripted_opening_and_searches() {
    let mut pos = Position::initial();
    for tok in ["e2e3", "e8e7", "con e3@e4", "con e7@e6"] {
        let m = parse_move(&mut pos, tok).expect(tok);
        pos.make_move(m);
    }
    assert_eq!(pos.history_len(), 4);
    assert_eq!(pos.wall_tokens(citadel_core::Color::White), 1);
    assert_eq!(pos.wall_tokens(citadel_core::Color::Black), 1);

    let mut searcher = Searcher::with_tt_size_mb(4);
    let res = searcher.search(&mut pos, SearchOptions::depth(3));
    let mut list = MoveList::new();
    generate_moves(&mut pos, &mut list);
    assert!(list.contains(res.best));
}

#[test]
fn finds_regicide_and_reports_mate_score() {
    let mut pos = Position::from_fen("s8/9/9/9/9/9/9/9/C3S4 w - - 0 1").unwrap();
    let mut searcher = Searcher::with_tt_size_mb(1);
    let res = searcher.search(&mut pos, SearchOptions::depth(4));
    assert!(res.score >= MATE - 100);
    assert_eq!(move_to_token(res.best), "cata1a9");
}

#[test]
fn movetime_limit_stops_promptly() {
    let mut pos = Position::initial();
    let mut searcher = Searcher::with_tt_size_mb(4);
    let mut opts = SearchOptions::depth(64);
    opts.limits = SearchLimits { depth: 64, nodes: 0, movetime_ms: 150 };

    let start = Instant::now();
    let res = searcher.search(&mut pos, opts);
    // Generous margin: the poll interval is ~2k nodes.
    assert!(start.elapsed() < Duration::from_secs(5));
    let mut list = MoveList::new();
    generate_moves(&mut pos, &mut list);
    assert!(list.contains(res.best));
}

#[test]
fn external_stop_from_another_thread() {
    let stop = Arc::new(AtomicBool::new(false));
    let stopper = {
        let stop = Arc::clone(&stop);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            stop.store(true, Ordering::Release);
        })
    };

    let mut pos = Position::initial();
    let mut searcher = Searcher::with_tt_size_mb(4);
    let mut opts = SearchOptions::depth(64);
    opts.stop = Some(&*stop);
    let start = Instant::now();
    let res = searcher.search(&mut pos, opts);
    stopper.join().unwrap();

    assert!(start.elapsed() < Duration::from_secs(10));
    let mut list = MoveList::new();
    generate_moves(&mut pos, &mut list);
    assert!(list.contains(res.best));
}

#[test]
fn tt_reuse_across_searches_is_safe() {
    let mut pos = Position::initial();
    let mut searcher = Searcher::with_tt_size_mb(4);

    let first = searcher.search(&mut pos, SearchOptions::depth(3));

    // Warm TT: the search may take shortcuts but must stay legal.
    let second = searcher.search(&mut pos, SearchOptions::depth(3));
    let mut list = MoveList::new();
    generate_moves(&mut pos, &mut list);
    assert!(list.contains(second.best));

    // Cold again: clearing the table restores the deterministic cold result.
    searcher.clear_tt();
    let third = searcher.search(&mut pos, SearchOptions::depth(3));
    assert_eq!(first.best, third.best);
    assert_eq!(first.score, third.score);
    assert_eq!(first.nodes, third.nodes);
}

#[test]
fn siege_attrition_position_still_searches() {
    let mut pos = Position::from_fen("9/9/9/9/3IS4/9/9/RRRR5/RRRR4s w Bb - 0 1").unwrap();
    assert_eq!(pos.wall_tokens(citadel_core::Color::White), 16);

    let mut searcher = Searcher::with_tt_size_mb(1);
    let res = searcher.search(&mut pos, SearchOptions::depth(3));
    let mut list = MoveList::new();
    generate_moves(&mut pos, &mut list);
    assert!(list.contains(res.best));
    // The frozen sovereign cannot be the moving piece.
    assert_ne!(res.best.from(), citadel_core::Square::new(4, 4));
}
