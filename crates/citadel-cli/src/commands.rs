//! Utility subcommands: perft, bestmove, eval
//!
//! Scripting and debugging entry points over the same core the protocol loop
//! drives. All of them accept `--fen` and default to the initial position.

use anyhow::{Context, Result};

use citadel_core::notation::{move_to_string, move_to_token};
use citadel_core::perft::perft_timed;
use citadel_core::{
    evaluate_position, perft_divide, EvalMode, Nnue, Position, SearchLimits, SearchOptions,
    Searcher,
};

use crate::uci::info_line;

fn load_position(fen: Option<&str>) -> Result<Position> {
    match fen {
        Some(fen) => Position::from_fen(fen).context("bad --fen"),
        None => Ok(Position::initial()),
    }
}

fn load_eval(nnue_file: Option<&str>) -> Result<Option<Nnue>> {
    match nnue_file {
        Some(path) => {
            let net = Nnue::load(path).with_context(|| format!("loading NNUE model {path}"))?;
            Ok(Some(net))
        }
        None => Ok(None),
    }
}

/// `perft --depth N [--fen ...] [--divide]`
pub fn run_perft(depth: i32, fen: Option<&str>, divide: bool) -> Result<()> {
    let mut pos = load_position(fen)?;

    if divide {
        let mut total = 0u64;
        for (m, n) in perft_divide(&mut pos, depth) {
            println!("{:<16} {n}", move_to_string(m));
            total += n;
        }
        println!("total {total}");
        return Ok(());
    }

    let stats = perft_timed(&mut pos, depth);
    println!(
        "perft({depth}) = {} in {:.3}s ({:.0} nps)",
        stats.nodes, stats.seconds, stats.nps
    );
    Ok(())
}

/// `bestmove --depth N [--fen ...] [--nnue-file ...]`
pub fn run_bestmove(depth: i32, fen: Option<&str>, nnue_file: Option<&str>) -> Result<()> {
    let mut pos = load_position(fen)?;
    let nnue = load_eval(nnue_file)?;

    let mut searcher = Searcher::new();
    let mut on_info = |info: &citadel_core::SearchInfo| println!("{}", info_line(info));
    let opts = SearchOptions {
        limits: SearchLimits::depth(depth),
        eval: match &nnue {
            Some(net) => EvalMode::Nnue(net),
            None => EvalMode::Hce,
        },
        use_tt: true,
        stop: None,
        on_info: Some(&mut on_info),
    };

    let res = searcher.search(&mut pos, opts);
    println!(
        "bestmove {} score {} nodes {} time {:.3}s",
        move_to_token(res.best),
        res.score,
        res.nodes,
        res.seconds
    );
    Ok(())
}

/// `eval [--fen ...] [--nnue-file ...]`
pub fn run_eval(fen: Option<&str>, nnue_file: Option<&str>) -> Result<()> {
    let pos = load_position(fen)?;
    let nnue = load_eval(nnue_file)?;

    print!("{}", pos.pretty());
    let hce = evaluate_position(&pos, EvalMode::Hce);
    println!("HCE  cp {hce}");
    if let Some(net) = &nnue {
        let nn = evaluate_position(&pos, EvalMode::Nnue(net));
        println!("NNUE cp {nn}");
    }
    Ok(())
}
