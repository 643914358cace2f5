//! Citadel protocol front-end
//!
//! Without a subcommand the binary speaks the UCI-like protocol on stdin and
//! stdout. Subcommands expose perft, one-shot search and static evaluation
//! for scripting.

mod commands;
mod uci;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Speak the UCI-like protocol (default)
    Uci,
    /// Count legal move tree leaves
    Perft {
        /// Search depth in plies
        #[arg(long, default_value_t = 3)]
        depth: i32,
        /// Position string (defaults to the initial setup)
        #[arg(long)]
        fen: Option<String>,
        /// Print per-root-move subtree counts
        #[arg(long)]
        divide: bool,
    },
    /// Search a position once and print the best move
    Bestmove {
        /// Search depth in plies
        #[arg(long, default_value_t = 6)]
        depth: i32,
        /// Position string (defaults to the initial setup)
        #[arg(long)]
        fen: Option<String>,
        /// NNUE model file (HCE when absent)
        #[arg(long)]
        nnue_file: Option<String>,
    },
    /// Print the static evaluation of a position
    Eval {
        /// Position string (defaults to the initial setup)
        #[arg(long)]
        fen: Option<String>,
        /// NNUE model file to evaluate alongside HCE
        #[arg(long)]
        nnue_file: Option<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "warn" };
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, default_level),
    );

    match args.command {
        None | Some(Command::Uci) => uci::run(),
        Some(Command::Perft { depth, fen, divide }) => {
            commands::run_perft(depth, fen.as_deref(), divide)
        }
        Some(Command::Bestmove { depth, fen, nnue_file }) => {
            commands::run_bestmove(depth, fen.as_deref(), nnue_file.as_deref())
        }
        Some(Command::Eval { fen, nnue_file }) => {
            commands::run_eval(fen.as_deref(), nnue_file.as_deref())
        }
    }
}
