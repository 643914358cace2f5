//! Protocol loop
//!
//! Reads commands from stdin on the main thread; `go` hands the search to a
//! dedicated worker. Coordination is one atomic stop flag that the search
//! polls: `stop`/`quit`/a new command that mutates state set the flag and
//! join the worker before touching the position, the table or the options.

mod output;
mod parser;

pub use output::{bestmove_token, info_line};
pub use parser::{parse_command, GoParams, UciCommand};

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::Result;
use parking_lot::Mutex;

use citadel_core::notation::parse_move;
use citadel_core::{
    evaluate_position, Color, EvalMode, Nnue, Position, SearchLimits, SearchOptions, Searcher,
};

/// Evaluation backend selected via `setoption name Eval`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Backend {
    Hce,
    Nnue,
}

/// Minimum time budget carved out of the clocks
const MIN_BUDGET_MS: u64 = 10;
/// Safety lag kept on the clock
const CLOCK_RESERVE_MS: u64 = 50;
/// Default depth when `go` gives no limits at all
const DEFAULT_GO_DEPTH: i32 = 6;

fn send(print_lock: &Mutex<()>, line: &str) {
    let _guard = print_lock.lock();
    let mut out = io::stdout();
    let _ = writeln!(out, "{line}");
    let _ = out.flush();
}

struct Session {
    pos: Position,
    searcher: Arc<Mutex<Searcher>>,
    nnue: Option<Arc<Nnue>>,
    nnue_file: String,
    backend: Backend,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    print_lock: Arc<Mutex<()>>,
}

impl Session {
    fn new() -> Self {
        Session {
            pos: Position::initial(),
            searcher: Arc::new(Mutex::new(Searcher::new())),
            nnue: None,
            nnue_file: String::new(),
            backend: Backend::Hce,
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
            print_lock: Arc::new(Mutex::new(())),
        }
    }

    fn send(&self, line: &str) {
        send(&self.print_lock, line);
    }

    /// Stop any running search and join the worker. Idempotent.
    fn stop_search(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        self.stop.store(false, Ordering::Release);
    }

    fn handle_uci(&self) {
        let tt_mb = self.searcher.lock().tt_size_mb();
        self.send(&format!("id name Citadel {}", env!("CARGO_PKG_VERSION")));
        self.send("id author the Citadel developers");
        self.send(&format!("option name Hash type spin default {tt_mb} min 1 max 1024"));
        self.send("option name Threads type spin default 1 min 1 max 1");
        self.send("option name Eval type combo default HCE var HCE var NNUE");
        self.send("option name NnueFile type string default <empty>");
        self.send("uciok");
    }

    fn handle_setoption(&mut self, name: &str, value: Option<&str>) {
        match name.to_ascii_lowercase().as_str() {
            "hash" => {
                if let Some(mb) = value.and_then(|v| v.parse::<usize>().ok()) {
                    if mb > 0 {
                        self.stop_search();
                        self.searcher.lock().set_tt_size_mb(mb);
                    }
                }
            }
            "threads" => {
                if value.and_then(|v| v.parse::<u32>().ok()).is_some_and(|n| n > 1) {
                    self.send("info string single-threaded engine; Threads stays at 1");
                }
            }
            "eval" => {
                self.stop_search();
                match value.map(|v| v.to_ascii_lowercase()).as_deref() {
                    Some("nnue") => {
                        self.backend = Backend::Nnue;
                        if self.nnue.is_none() {
                            self.send(
                                "info string nnue not loaded (setoption name NnueFile value <path>)",
                            );
                        }
                    }
                    _ => self.backend = Backend::Hce,
                }
            }
            "nnuefile" => {
                self.stop_search();
                let path = value.unwrap_or("").trim();
                if path.is_empty() || path.eq_ignore_ascii_case("<empty>") {
                    self.nnue = None;
                    self.nnue_file.clear();
                    self.send("info string nnue cleared");
                } else {
                    match Nnue::load(path) {
                        Ok(net) => {
                            self.nnue = Some(Arc::new(net));
                            self.nnue_file = path.to_string();
                            self.send(&format!("info string nnue loaded: {path}"));
                        }
                        Err(e) => {
                            log::warn!("nnue load failed: {e}");
                            self.send(&format!("info string nnue load failed: {e}"));
                        }
                    }
                }
            }
            other => log::debug!("ignoring unknown option {other:?}"),
        }
    }

    fn handle_position(&mut self, startpos: bool, fen: Option<&str>, moves: &[String]) {
        self.stop_search();

        let mut pos = if startpos {
            Position::initial()
        } else {
            let Some(fen) = fen else {
                self.send("info string position error: missing FEN");
                return;
            };
            match Position::from_fen(fen) {
                Ok(pos) => pos,
                Err(e) => {
                    self.send(&format!("info string position error: {e}"));
                    return;
                }
            }
        };

        for tok in moves {
            match parse_move(&mut pos, tok) {
                Ok(m) => {
                    pos.make_move(m);
                }
                Err(_) => {
                    self.send(&format!("info string illegal move {tok}"));
                    break;
                }
            }
        }

        self.pos = pos;
    }

    fn handle_go(&mut self, params: &GoParams) {
        self.stop_search();

        let limits = go_limits(params, self.pos.turn());

        let pos = self.pos.clone();
        let searcher = Arc::clone(&self.searcher);
        let stop = Arc::clone(&self.stop);
        let print_lock = Arc::clone(&self.print_lock);
        let nnue = self.nnue.clone();
        let backend = self.backend;

        self.worker = Some(std::thread::spawn(move || {
            let mut pos = pos;
            let mut searcher = searcher.lock();

            let eval = match (backend, nnue.as_deref()) {
                (Backend::Nnue, Some(net)) => EvalMode::Nnue(net),
                _ => EvalMode::Hce,
            };
            let mut on_info = |info: &citadel_core::SearchInfo| {
                send(&print_lock, &info_line(info));
            };
            let opts = SearchOptions {
                limits,
                eval,
                use_tt: true,
                stop: Some(&*stop),
                on_info: Some(&mut on_info),
            };

            let res = searcher.search(&mut pos, opts);
            send(&print_lock, &format!("bestmove {}", bestmove_token(res.best)));
        }));
    }

    fn handle_eval(&self, backend_arg: Option<&str>) {
        let backend = match backend_arg {
            Some("hce") => Backend::Hce,
            Some("nnue") => Backend::Nnue,
            _ => self.backend,
        };
        match (backend, self.nnue.as_deref()) {
            (Backend::Nnue, Some(net)) => {
                let score = evaluate_position(&self.pos, EvalMode::Nnue(net));
                self.send(&format!("info string eval NNUE cp {score}"));
            }
            (Backend::Nnue, None) => {
                self.send("info string eval: nnue not loaded (setoption name NnueFile value <path>)");
            }
            _ => {
                let score = evaluate_position(&self.pos, EvalMode::Hce);
                self.send(&format!("info string eval HCE cp {score}"));
            }
        }
    }
}

/// Translate `go` parameters into hard limits. Clock-based budgets use the
/// simple formula `remaining/30 + increment/2`, clamped to
/// `[10ms, remaining - 50ms]`.
fn go_limits(params: &GoParams, turn: Color) -> SearchLimits {
    let mut limits = SearchLimits {
        depth: params.depth.unwrap_or(DEFAULT_GO_DEPTH),
        nodes: params.nodes.unwrap_or(0),
        movetime_ms: 0,
    };

    if params.infinite {
        limits.depth = 255;
        return limits;
    }

    if let Some(movetime) = params.movetime {
        limits.movetime_ms = movetime;
        if params.depth.is_none() {
            limits.depth = 255;
        }
        return limits;
    }

    let (remaining, inc) = match turn {
        Color::White => (params.wtime, params.winc),
        Color::Black => (params.btime, params.binc),
    };
    if let Some(remaining) = remaining {
        let mut budget = remaining / 30 + inc.unwrap_or(0) / 2;
        budget = budget.max(MIN_BUDGET_MS);
        if remaining > CLOCK_RESERVE_MS {
            budget = budget.min(remaining - CLOCK_RESERVE_MS);
        }
        limits.movetime_ms = budget;
        if params.depth.is_none() {
            limits.depth = 255;
        }
    }

    limits
}

/// Run the protocol loop until `quit` or EOF
pub fn run() -> Result<()> {
    let mut session = Session::new();
    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let cmd = match parse_command(trimmed) {
            Ok(cmd) => cmd,
            Err(e) => {
                log::debug!("unparsed input {trimmed:?}: {e}");
                continue;
            }
        };

        match cmd {
            UciCommand::Uci => session.handle_uci(),
            UciCommand::IsReady => session.send("readyok"),
            UciCommand::NewGame => {
                session.stop_search();
                session.searcher.lock().clear_tt();
                session.pos = Position::initial();
            }
            UciCommand::SetOption { name, value } => {
                session.handle_setoption(&name, value.as_deref())
            }
            UciCommand::Position { startpos, fen, moves } => {
                session.handle_position(startpos, fen.as_deref(), &moves)
            }
            UciCommand::Go(params) => session.handle_go(&params),
            UciCommand::Eval { backend } => session.handle_eval(backend.as_deref()),
            UciCommand::Display => {
                session.send(&format!("info string {}", session.pos.to_fen()));
                print!("{}", session.pos.pretty());
                let _ = io::stdout().flush();
            }
            UciCommand::Stop => session.stop_search(),
            UciCommand::Quit => {
                session.stop_search();
                break;
            }
        }
    }

    session.stop_search();
    Ok(())
}
