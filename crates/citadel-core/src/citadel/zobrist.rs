//! Zobrist hashing keys
//!
//! One key per occupied square content (16 channels x 81 squares), plus side
//! to move, Bastion rights and the wall-built-last flags. Two independent key
//! families exist: [`POSITION_KEYS`] drives the running hash and repetition
//! detection inside [`crate::citadel::position::Position`]; [`TT_KEYS`] is
//! used only by the search's transposition table, so repetition hashing and
//! TT indexing never share collision risk.

use lazy_static::lazy_static;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use super::board_constants::BOARD_SQUARES;
use super::types::{Cell, Color, Square};

/// Number of distinct square contents (see [`Cell::channel`])
pub const CHANNELS: usize = 16;

/// One Zobrist key family
pub struct ZobristKeys {
    /// Keys per square and content channel
    pub square: [[u64; CHANNELS]; BOARD_SQUARES],
    /// XORed in when Black is to move
    pub turn: u64,
    /// Bastion right per color
    pub bastion: [u64; 2],
    /// Wall-built-last flag per color
    pub wall_built: [u64; 2],
}

impl ZobristKeys {
    /// Generate a family from a fixed seed (deterministic builds)
    fn new(seed: u64) -> Self {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

        let mut keys = ZobristKeys {
            square: [[0; CHANNELS]; BOARD_SQUARES],
            turn: 0,
            bastion: [0; 2],
            wall_built: [0; 2],
        };

        for sq in 0..BOARD_SQUARES {
            for ch in 0..CHANNELS {
                keys.square[sq][ch] = rng.random();
            }
        }
        keys.turn = rng.random();
        keys.bastion = [rng.random(), rng.random()];
        keys.wall_built = [rng.random(), rng.random()];

        keys
    }

    /// Key for a non-empty cell on a square
    #[inline]
    pub fn cell_key(&self, sq: Square, cell: Cell) -> u64 {
        match cell.channel() {
            Some(ch) => self.square[sq.index()][ch],
            None => 0,
        }
    }

    /// Key for the Bastion right of `color`
    #[inline]
    pub fn bastion_key(&self, color: Color) -> u64 {
        self.bastion[color.index()]
    }

    /// Key for the wall-built-last flag of `color`
    #[inline]
    pub fn wall_built_key(&self, color: Color) -> u64 {
        self.wall_built[color.index()]
    }
}

lazy_static! {
    /// Key family for the running position hash / repetition detection
    pub static ref POSITION_KEYS: ZobristKeys = ZobristKeys::new(0xC17A_DE10_A5F0_0D42);
    /// Key family for transposition-table hashing (search only)
    pub static ref TT_KEYS: ZobristKeys = ZobristKeys::new(0x0BE1_15C0_0C1A_DEC1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citadel::types::{Piece, PieceType, Wall};

    #[test]
    fn test_families_are_independent() {
        let sq = Square::new(4, 4);
        let cell = Cell::Piece(Piece::new(PieceType::Sovereign, Color::White));
        assert_ne!(POSITION_KEYS.cell_key(sq, cell), TT_KEYS.cell_key(sq, cell));
        assert_ne!(POSITION_KEYS.turn, TT_KEYS.turn);
    }

    #[test]
    fn test_keys_are_deterministic_and_nonzero() {
        // Rebuilding from the same seed must reproduce the family bit-exactly.
        let a = ZobristKeys::new(42);
        let b = ZobristKeys::new(42);
        assert_eq!(a.square[17][3], b.square[17][3]);
        assert_eq!(a.turn, b.turn);

        assert_ne!(POSITION_KEYS.turn, 0);
        assert_ne!(POSITION_KEYS.bastion_key(Color::White), POSITION_KEYS.bastion_key(Color::Black));
    }

    #[test]
    fn test_cell_key_empty_is_zero() {
        assert_eq!(POSITION_KEYS.cell_key(Square::new(0, 0), Cell::Empty), 0);
        let wall = Cell::Wall(Wall::new(Color::Black, 2));
        assert_ne!(POSITION_KEYS.cell_key(Square::new(0, 0), wall), 0);
    }
}
