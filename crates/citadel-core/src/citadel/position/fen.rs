//! FEN-like position strings
//!
//! Nine rank rows separated by `/`, top row first. Upper case is White,
//! lower case is Black. Piece letters M,C,L,P,I,S; walls W (HP 1) and
//! R (reinforced, HP 2); digits compress runs of empty squares. The board is
//! followed by: side to move (`w`/`b`), Bastion rights (`B`/`b`/`-`),
//! wall-built-last flags (`w`/`b`/`-`), halfmove clock and fullmove number.
//! Shorter forms (missing wall flags or clocks) are accepted with defaults.

use std::fmt::Write as _;

use crate::citadel::error::ParseError;
use crate::citadel::types::{Cell, Color, Piece, PieceType, Square, Wall};

use super::Position;

fn cell_to_char(cell: Cell) -> Option<char> {
    let (up, color) = match cell {
        Cell::Empty => return None,
        Cell::Piece(p) => {
            let ch = match p.piece_type {
                PieceType::Mason => 'M',
                PieceType::Catapult => 'C',
                PieceType::Lancer => 'L',
                PieceType::Pegasus => 'P',
                PieceType::Minister => 'I',
                PieceType::Sovereign => 'S',
            };
            (ch, p.color)
        }
        Cell::Wall(w) => (if w.hp == 2 { 'R' } else { 'W' }, w.color),
    };
    Some(if color == Color::Black { up.to_ascii_lowercase() } else { up })
}

fn cell_from_char(raw: char) -> Result<Cell, ParseError> {
    let color = if raw.is_ascii_uppercase() { Color::White } else { Color::Black };
    let cell = match raw.to_ascii_uppercase() {
        'M' => Cell::Piece(Piece::new(PieceType::Mason, color)),
        'C' => Cell::Piece(Piece::new(PieceType::Catapult, color)),
        'L' => Cell::Piece(Piece::new(PieceType::Lancer, color)),
        'P' => Cell::Piece(Piece::new(PieceType::Pegasus, color)),
        'I' => Cell::Piece(Piece::new(PieceType::Minister, color)),
        'S' => Cell::Piece(Piece::new(PieceType::Sovereign, color)),
        'W' => Cell::Wall(Wall::new(color, 1)),
        'R' => Cell::Wall(Wall::new(color, 2)),
        _ => return Err(ParseError::Fen(format!("unknown piece '{raw}'"))),
    };
    Ok(cell)
}

impl Position {
    /// Emit the position string
    pub fn to_fen(&self) -> String {
        let mut out = String::new();

        for r in 0..9u8 {
            let mut empty = 0;
            for c in 0..9u8 {
                match cell_to_char(self.cell_at(Square::new(r, c))) {
                    None => empty += 1,
                    Some(ch) => {
                        if empty > 0 {
                            let _ = write!(out, "{empty}");
                            empty = 0;
                        }
                        out.push(ch);
                    }
                }
            }
            if empty > 0 {
                let _ = write!(out, "{empty}");
            }
            if r != 8 {
                out.push('/');
            }
        }

        out.push(' ');
        out.push(if self.turn() == Color::White { 'w' } else { 'b' });
        out.push(' ');

        let mut rights = String::new();
        if self.bastion_right(Color::White) {
            rights.push('B');
        }
        if self.bastion_right(Color::Black) {
            rights.push('b');
        }
        if rights.is_empty() {
            rights.push('-');
        }
        out.push_str(&rights);
        out.push(' ');

        let mut wall_seq = String::new();
        if self.wall_built_last(Color::White) {
            wall_seq.push('w');
        }
        if self.wall_built_last(Color::Black) {
            wall_seq.push('b');
        }
        if wall_seq.is_empty() {
            wall_seq.push('-');
        }
        let _ = write!(out, "{wall_seq} {} {}", self.halfmove(), self.fullmove());

        out
    }

    /// Parse a position string
    pub fn from_fen(fen: &str) -> Result<Position, ParseError> {
        let mut fields = fen.split_whitespace();

        let board_str = fields
            .next()
            .ok_or_else(|| ParseError::Fen("expected <board> <turn> ...".to_string()))?;
        let turn_str = fields
            .next()
            .ok_or_else(|| ParseError::Fen("expected <board> <turn> ...".to_string()))?;

        // Optional trailing fields; shorter forms infer defaults.
        let mut rights_str = "Bb".to_string();
        let mut wall_str = "-".to_string();
        let mut halfmove = 0u32;
        let mut fullmove = 1u32;

        let is_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

        if let Some(tok) = fields.next() {
            rights_str = tok.to_string();
            if let Some(tok) = fields.next() {
                if is_digits(tok) {
                    halfmove = tok
                        .parse()
                        .map_err(|_| ParseError::Fen(format!("bad halfmove clock '{tok}'")))?;
                } else {
                    wall_str = tok.to_string();
                    if let Some(hm) = fields.next() {
                        halfmove = hm
                            .parse()
                            .map_err(|_| ParseError::Fen(format!("bad halfmove clock '{hm}'")))?;
                    }
                }
                if let Some(fm) = fields.next() {
                    fullmove = fm
                        .parse()
                        .map_err(|_| ParseError::Fen(format!("bad fullmove number '{fm}'")))?;
                }
            }
        }

        let mut pos = Position::empty();

        pos.turn = match turn_str.chars().next().map(|ch| ch.to_ascii_lowercase()) {
            Some('w') => Color::White,
            Some('b') => Color::Black,
            _ => return Err(ParseError::Fen("turn must be 'w' or 'b'".to_string())),
        };

        pos.bastion_right = [false, false];
        if rights_str != "-" {
            for ch in rights_str.chars() {
                match ch {
                    'B' => pos.bastion_right[Color::White.index()] = true,
                    'b' => pos.bastion_right[Color::Black.index()] = true,
                    _ => return Err(ParseError::Fen(format!("bad bastion rights '{rights_str}'"))),
                }
            }
        }

        pos.wall_built_last = [false, false];
        if wall_str != "-" {
            for ch in wall_str.chars() {
                match ch.to_ascii_lowercase() {
                    'w' => pos.wall_built_last[Color::White.index()] = true,
                    'b' => pos.wall_built_last[Color::Black.index()] = true,
                    _ => return Err(ParseError::Fen(format!("bad wall flags '{wall_str}'"))),
                }
            }
        }

        pos.halfmove = halfmove;
        pos.fullmove = fullmove;

        let mut r = 0usize;
        let mut c = 0usize;
        for raw in board_str.chars() {
            if raw == '/' {
                if c != 9 {
                    return Err(ParseError::Fen("rank does not have 9 files".to_string()));
                }
                r += 1;
                c = 0;
                continue;
            }
            if r >= 9 {
                return Err(ParseError::Fen("too many ranks".to_string()));
            }

            if let Some(d) = raw.to_digit(10) {
                if d == 0 {
                    return Err(ParseError::Fen("zero-length empty run".to_string()));
                }
                c += d as usize;
                if c > 9 {
                    return Err(ParseError::Fen("file overflow".to_string()));
                }
                continue;
            }

            if c >= 9 {
                return Err(ParseError::Fen("too many files in rank".to_string()));
            }
            pos.board[Square::new(r as u8, c as u8).index()] = cell_from_char(raw)?;
            c += 1;
        }

        if r != 8 || c != 9 {
            return Err(ParseError::Fen("board must be 9 ranks of 9 files".to_string()));
        }

        pos.rebuild_derived();
        Ok(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_roundtrip() {
        let pos = Position::initial();
        let fen = pos.to_fen();
        assert_eq!(fen, "clpisiplc/mmmmmmmmm/9/9/9/9/9/MMMMMMMMM/CLPISIPLC w Bb - 0 1");
        let parsed = Position::from_fen(&fen).unwrap();
        assert_eq!(parsed, pos);
        assert_eq!(parsed.hash(), pos.hash());
    }

    #[test]
    fn test_walls_and_flags_roundtrip() {
        let fen = "9/9/4R4/2w6/4S4/9/9/9/4s4 b B wb 3 17";
        let pos = Position::from_fen(fen).unwrap();
        assert_eq!(pos.turn(), Color::Black);
        assert!(pos.bastion_right(Color::White));
        assert!(!pos.bastion_right(Color::Black));
        assert!(pos.wall_built_last(Color::White));
        assert!(pos.wall_built_last(Color::Black));
        assert_eq!(pos.halfmove(), 3);
        assert_eq!(pos.fullmove(), 17);
        assert_eq!(pos.wall_tokens(Color::White), 2);
        assert_eq!(pos.wall_tokens(Color::Black), 1);
        assert_eq!(pos.to_fen(), fen);
        assert_eq!(pos.hash(), pos.hash_from_scratch());
    }

    #[test]
    fn test_short_forms_infer_defaults() {
        // Board + turn only: full rights, no wall flags, clocks 0/1.
        let pos = Position::from_fen("9/9/9/9/4S4/9/9/9/4s4 w").unwrap();
        assert!(pos.bastion_right(Color::White) && pos.bastion_right(Color::Black));
        assert!(!pos.wall_built_last(Color::White));
        assert_eq!(pos.halfmove(), 0);
        assert_eq!(pos.fullmove(), 1);

        // Rights followed directly by clocks (wall flags omitted).
        let pos = Position::from_fen("9/9/9/9/4S4/9/9/9/4s4 w - 5 9").unwrap();
        assert_eq!(pos.halfmove(), 5);
        assert_eq!(pos.fullmove(), 9);
        assert!(!pos.bastion_right(Color::White));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Position::from_fen("").is_err());
        assert!(Position::from_fen("9/9/9/9/9/9/9/9/9").is_err()); // missing turn
        assert!(Position::from_fen("9/9/9/9/9/9/9/9/9 x").is_err()); // bad turn
        assert!(Position::from_fen("8/9/9/9/9/9/9/9/9 w").is_err()); // short rank
        assert!(Position::from_fen("9/9/9/9/9/9/9/9/9/9 w").is_err()); // extra rank
        assert!(Position::from_fen("Q8/9/9/9/9/9/9/9/9 w").is_err()); // unknown piece
        assert!(Position::from_fen("X/9/9/9/9/9/9/9/9 w").is_err());
    }

    #[test]
    fn test_sovereignless_side_parses() {
        // A position after Regicide can still be expressed and inspected.
        let pos = Position::from_fen("9/9/9/9/4S4/9/9/9/9 w - - 0 1").unwrap();
        assert_eq!(pos.sovereign_sq(Color::Black), None);
        assert_eq!(pos.sovereign_sq(Color::White), Some(Square::new(4, 4)));
    }
}
