//! Parse errors for the textual interfaces
//!
//! The rules engine itself is infallible; only the textual inputs (position
//! strings, coordinates, action tokens) can be rejected.

use std::error::Error;
use std::fmt;

/// Malformed textual input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Malformed position string
    Fen(String),
    /// Malformed square coordinate (expected e.g. "E5")
    Coord(String),
    /// Action token not parseable or not legal in the given position
    Move(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Fen(reason) => write!(f, "invalid FEN: {reason}"),
            ParseError::Coord(token) => write!(f, "invalid coordinate: {token:?}"),
            ParseError::Move(token) => write!(f, "invalid move token: {token:?}"),
        }
    }
}

impl Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let e = ParseError::Fen("rank does not have 9 files".to_string());
        assert!(e.to_string().contains("invalid FEN"));
        assert!(ParseError::Coord("Z9".to_string()).to_string().contains("Z9"));
    }
}
