//! Protocol command parser

use anyhow::{anyhow, Result};

/// `go` parameters (milliseconds where applicable)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GoParams {
    pub depth: Option<i32>,
    pub movetime: Option<u64>,
    pub nodes: Option<u64>,
    pub infinite: bool,
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub winc: Option<u64>,
    pub binc: Option<u64>,
}

/// Parsed protocol command
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UciCommand {
    Uci,
    IsReady,
    NewGame,
    SetOption { name: String, value: Option<String> },
    Position { startpos: bool, fen: Option<String>, moves: Vec<String> },
    Go(GoParams),
    Eval { backend: Option<String> },
    Display,
    Stop,
    Quit,
}

/// Parse one input line
pub fn parse_command(line: &str) -> Result<UciCommand> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some(&head) = parts.first() else {
        return Err(anyhow!("empty command"));
    };

    match head.to_ascii_lowercase().as_str() {
        "uci" => Ok(UciCommand::Uci),
        "isready" => Ok(UciCommand::IsReady),
        "ucinewgame" => Ok(UciCommand::NewGame),
        "stop" => Ok(UciCommand::Stop),
        "quit" => Ok(UciCommand::Quit),
        "d" => Ok(UciCommand::Display),
        "setoption" => parse_setoption(&parts[1..]),
        "position" => parse_position(&parts[1..]),
        "go" => parse_go(&parts[1..]),
        "eval" => Ok(UciCommand::Eval { backend: parts.get(1).map(|s| s.to_ascii_lowercase()) }),
        other => Err(anyhow!("unknown command: {other}")),
    }
}

fn parse_setoption(parts: &[&str]) -> Result<UciCommand> {
    // Expected: name <name...> [value <value...>]
    if parts.first().map(|s| s.to_ascii_lowercase()) != Some("name".to_string()) {
        return Err(anyhow!("setoption requires 'name'"));
    }
    let rest = &parts[1..];
    let value_pos = rest.iter().position(|&p| p.eq_ignore_ascii_case("value"));

    let name = match value_pos {
        Some(pos) => rest[..pos].join(" "),
        None => rest.join(" "),
    };
    if name.is_empty() {
        return Err(anyhow!("setoption requires an option name"));
    }

    let value = value_pos.and_then(|pos| {
        let v = rest[pos + 1..].join(" ");
        if v.is_empty() {
            None
        } else {
            Some(v)
        }
    });

    Ok(UciCommand::SetOption { name, value })
}

fn parse_position(parts: &[&str]) -> Result<UciCommand> {
    let Some(&mode) = parts.first() else {
        return Err(anyhow!("position requires 'startpos' or 'fen'"));
    };

    let (startpos, fen, moves_start) = match mode.to_ascii_lowercase().as_str() {
        "startpos" => (true, None, 1),
        "fen" => {
            let moves_pos = parts.iter().position(|&p| p.eq_ignore_ascii_case("moves"));
            let fen_end = moves_pos.unwrap_or(parts.len());
            if fen_end <= 1 {
                return Err(anyhow!("position fen requires a FEN string"));
            }
            (false, Some(parts[1..fen_end].join(" ")), fen_end)
        }
        other => return Err(anyhow!("position must start with 'startpos' or 'fen', got {other}")),
    };

    let moves = if parts.get(moves_start).is_some_and(|p| p.eq_ignore_ascii_case("moves")) {
        parts[moves_start + 1..].iter().map(|s| s.to_string()).collect()
    } else {
        Vec::new()
    };

    Ok(UciCommand::Position { startpos, fen, moves })
}

fn parse_go(parts: &[&str]) -> Result<UciCommand> {
    let mut params = GoParams::default();
    let mut i = 0;

    fn value<T: std::str::FromStr>(parts: &[&str], i: &mut usize, key: &str) -> Result<T> {
        *i += 1;
        let raw = parts
            .get(*i)
            .ok_or_else(|| anyhow!("go {key} requires a value"))?;
        raw.parse().map_err(|_| anyhow!("invalid {key} value: {raw}"))
    }

    while i < parts.len() {
        match parts[i].to_ascii_lowercase().as_str() {
            "infinite" => params.infinite = true,
            "depth" => params.depth = Some(value(parts, &mut i, "depth")?),
            "movetime" => params.movetime = Some(value(parts, &mut i, "movetime")?),
            "nodes" => params.nodes = Some(value(parts, &mut i, "nodes")?),
            "wtime" => params.wtime = Some(value(parts, &mut i, "wtime")?),
            "btime" => params.btime = Some(value(parts, &mut i, "btime")?),
            "winc" => params.winc = Some(value(parts, &mut i, "winc")?),
            "binc" => params.binc = Some(value(parts, &mut i, "binc")?),
            // ponder, movestogo, mate ...: accepted and ignored
            _ => {}
        }
        i += 1;
    }

    Ok(UciCommand::Go(params))
}
