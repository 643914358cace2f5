//! Attack tables and movement geometry
//!
//! Pre-computed per-square target lists: Pegasus (knight) leaps, Sovereign
//! (king) neighborhoods and sliding rays in all eight directions. All geometry
//! queries at move-generation time reduce to array lookups.

use lazy_static::lazy_static;

use super::bitboard::Bitboard;
use super::board_constants::{in_bounds, BOARD_SQUARES};
use super::types::Square;

/// Direction offsets (row, col). Index order is shared with the ray tables:
/// 0:N 1:S 2:W 3:E 4:NW 5:NE 6:SW 7:SE — orthogonals first, diagonals last.
pub const DIRS8: [(i32, i32); 8] =
    [(-1, 0), (1, 0), (0, -1), (0, 1), (-1, -1), (-1, 1), (1, -1), (1, 1)];

/// Orthogonal directions (Catapult rays, Mason construct targets)
pub const DIRS4: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Pegasus leap offsets
pub const KNIGHT_OFFSETS: [(i32, i32); 8] =
    [(-2, -1), (-2, 1), (-1, -2), (-1, 2), (1, -2), (1, 2), (2, -1), (2, 1)];

/// Index range of the orthogonal rays in [`DIRS8`]
pub const ORTHO_DIRS: std::ops::Range<usize> = 0..4;

/// Index range of the diagonal rays in [`DIRS8`]
pub const DIAG_DIRS: std::ops::Range<usize> = 4..8;

/// Pre-computed movement geometry
pub struct AttackTables {
    keep: Bitboard,
    knight_count: [u8; BOARD_SQUARES],
    knight_targets: [[Square; 8]; BOARD_SQUARES],
    king_count: [u8; BOARD_SQUARES],
    king_targets: [[Square; 8]; BOARD_SQUARES],
    ray_len: [[u8; 8]; BOARD_SQUARES],
    rays: [[[Square; 8]; 8]; BOARD_SQUARES],
}

impl AttackTables {
    fn build() -> Self {
        let mut t = AttackTables {
            keep: Bitboard::EMPTY,
            knight_count: [0; BOARD_SQUARES],
            knight_targets: [[Square(0); 8]; BOARD_SQUARES],
            king_count: [0; BOARD_SQUARES],
            king_targets: [[Square(0); 8]; BOARD_SQUARES],
            ray_len: [[0; 8]; BOARD_SQUARES],
            rays: [[[Square(0); 8]; 8]; BOARD_SQUARES],
        };

        for sq in Square::all() {
            let (r, c) = (sq.row(), sq.col());
            let s = sq.index();

            if sq.is_keep() {
                t.keep.set(sq);
            }

            for (dr, dc) in KNIGHT_OFFSETS {
                if let Some(target) = Square::from_coords(r + dr, c + dc) {
                    t.knight_targets[s][t.knight_count[s] as usize] = target;
                    t.knight_count[s] += 1;
                }
            }

            for (dr, dc) in DIRS8 {
                if let Some(target) = Square::from_coords(r + dr, c + dc) {
                    t.king_targets[s][t.king_count[s] as usize] = target;
                    t.king_count[s] += 1;
                }
            }

            for (dir, (dr, dc)) in DIRS8.iter().enumerate() {
                let (mut rr, mut cc) = (r + dr, c + dc);
                while in_bounds(rr, cc) {
                    let len = t.ray_len[s][dir] as usize;
                    t.rays[s][dir][len] = Square::new(rr as u8, cc as u8);
                    t.ray_len[s][dir] += 1;
                    rr += dr;
                    cc += dc;
                }
            }
        }

        t
    }

    /// Keep bitmap
    #[inline]
    pub fn keep(&self) -> Bitboard {
        self.keep
    }

    /// Pegasus leap targets from `sq`
    #[inline]
    pub fn knight_targets(&self, sq: Square) -> &[Square] {
        let s = sq.index();
        &self.knight_targets[s][..self.knight_count[s] as usize]
    }

    /// In-bounds 8-neighborhood of `sq`
    #[inline]
    pub fn king_targets(&self, sq: Square) -> &[Square] {
        let s = sq.index();
        &self.king_targets[s][..self.king_count[s] as usize]
    }

    /// Squares along direction `dir` (index into [`DIRS8`]) from `sq`,
    /// ordered outward until the board edge
    #[inline]
    pub fn ray(&self, sq: Square, dir: usize) -> &[Square] {
        let s = sq.index();
        &self.rays[s][dir][..self.ray_len[s][dir] as usize]
    }
}

lazy_static! {
    static ref TABLES: AttackTables = AttackTables::build();
}

/// Shared movement geometry tables
#[inline]
pub fn tables() -> &'static AttackTables {
    &TABLES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_knight_targets_center_and_corner() {
        let t = tables();
        assert_eq!(t.knight_targets(Square::new(4, 4)).len(), 8);
        assert_eq!(t.knight_targets(Square::new(0, 0)).len(), 2);
        assert_eq!(t.knight_targets(Square::new(8, 8)).len(), 2);

        let from_corner = t.knight_targets(Square::new(0, 0));
        assert!(from_corner.contains(&Square::new(1, 2)));
        assert!(from_corner.contains(&Square::new(2, 1)));
    }

    #[test]
    fn test_king_targets() {
        let t = tables();
        assert_eq!(t.king_targets(Square::new(4, 4)).len(), 8);
        assert_eq!(t.king_targets(Square::new(0, 0)).len(), 3);
        assert_eq!(t.king_targets(Square::new(0, 4)).len(), 5);
    }

    #[test]
    fn test_rays() {
        let t = tables();
        // North ray from the bottom-left corner runs the full file.
        let ray = t.ray(Square::new(8, 0), 0);
        assert_eq!(ray.len(), 8);
        assert_eq!(ray[0], Square::new(7, 0));
        assert_eq!(ray[7], Square::new(0, 0));

        // Diagonal from the center reaches the corner.
        let diag = t.ray(Square::new(4, 4), 7);
        assert_eq!(diag.len(), 4);
        assert_eq!(diag[3], Square::new(8, 8));

        // No ray leaves the board from an edge in that direction.
        assert!(t.ray(Square::new(0, 4), 0).is_empty());
    }

    #[test]
    fn test_keep_bitmap() {
        let t = tables();
        assert_eq!(t.keep().count_ones(), 9);
        assert!(t.keep().test(Square::new(4, 4)));
        assert!(!t.keep().test(Square::new(2, 4)));
    }
}
