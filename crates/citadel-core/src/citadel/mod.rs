//! Citadel rules: board primitives, position state and the action model

pub mod attacks;
pub mod bitboard;
pub mod board_constants;
pub mod error;
pub mod moves;
pub mod position;
pub mod types;
pub mod zobrist;

pub use attacks::{AttackTables, DIRS4, DIRS8};
pub use bitboard::Bitboard;
pub use error::ParseError;
pub use moves::{Move, MoveKind, MoveVec};
pub use position::{NullUndo, Position, Undo};
pub use types::{Cell, Color, Piece, PieceType, Square, Wall, WinReason};
