//! End-to-end protocol sessions against the real binary

use assert_cmd::Command;

fn run_session(input: &str) -> String {
    let output = Command::cargo_bin("citadel-cli")
        .expect("binary builds")
        .write_stdin(input)
        .output()
        .expect("session runs");
    assert!(output.status.success());
    String::from_utf8(output.stdout).expect("utf8 output")
}

#[test]
fn handshake_and_bestmove() {
    let out = run_session("uci\nisready\nposition startpos\ngo depth 2\nquit\n");
    assert!(out.contains("id name Citadel"));
    assert!(out.contains("option name Hash"));
    assert!(out.contains("uciok"));
    assert!(out.contains("readyok"));
    assert!(out.contains("info depth 1"));
    assert!(out.contains("bestmove "));
    assert!(!out.contains("bestmove 0000"));
}

#[test]
fn position_with_moves_and_eval() {
    let out = run_session("position startpos moves e2e3 e8e7\neval\nd\nquit\n");
    assert!(out.contains("info string eval HCE cp "));
    // The FEN after two mason pushes still round-trips through `d`.
    assert!(out.contains("info string "));
    assert!(out.contains("Turn: White"));
}

#[test]
fn illegal_moves_are_reported() {
    let out = run_session("position startpos moves e2e5\nquit\n");
    assert!(out.contains("info string illegal move e2e5"));
}

#[test]
fn finished_game_returns_null_bestmove() {
    // Black already lost the sovereign; there is nothing to search.
    let out = run_session(
        "position fen 9/9/9/9/C3s4/9/9/9/S8 w - - 0 1 moves cata5e5\ngo depth 2\nquit\n",
    );
    assert!(out.contains("bestmove 0000"));
}

#[test]
fn setoption_hash_and_eval_roundtrip() {
    let out = run_session(
        "setoption name Hash value 8\nsetoption name Eval value NNUE\neval hce\nquit\n",
    );
    // NNUE selected without a model file: a warning, then HCE eval on demand.
    assert!(out.contains("info string nnue not loaded"));
    assert!(out.contains("info string eval HCE cp "));
}
