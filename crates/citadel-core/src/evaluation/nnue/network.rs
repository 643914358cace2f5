//! Quantized network and model loading
//!
//! Architecture: 1299 binary inputs -> 256 (int16 weights, int32 bias,
//! clipped ReLU) -> 32 (int8 x uint8, shift, clipped ReLU) -> 1 (int8 x
//! uint8, shift). The first layer is never computed directly during search;
//! the [`super::Accumulator`] carries it incrementally.
//!
//! Model file (`CNUE`, little-endian):
//! magic, u32 version, u32 inputDim, u32 hidden1, u32 hidden2, u32 actMax,
//! u32 shift2, u32 shift3, then i16 feature weights (feature-major), i32
//! feature biases, i8 layer-2 weights, i32 layer-2 biases, i8 output
//! weights, one i32 output bias.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::citadel::board_constants::BOARD_SQUARES;
use crate::citadel::{Cell, Square};

use super::accumulator::Accumulator;
use super::error::NnueError;

/// Supported model file version
pub const VERSION: u32 = 1;

/// Input channels per square (6 piece kinds x 2 colors + 2 wall HP x 2 colors)
pub const BOARD_CHANNELS: usize = 16;

/// Global input bits: white-to-move, white Bastion right, black Bastion right
pub const GLOBAL_FEATURES: usize = 3;

/// Total input features
pub const INPUT_DIM: usize = BOARD_CHANNELS * BOARD_SQUARES + GLOBAL_FEATURES;

/// Accumulator width
pub const HIDDEN1: usize = 256;

/// Second hidden layer width
pub const HIDDEN2: usize = 32;

/// Clipped ReLU ceiling
pub const ACT_MAX: i32 = 127;

/// Global feature indices
pub const FEAT_STM_WHITE: usize = BOARD_CHANNELS * BOARD_SQUARES;
pub const FEAT_BASTION_WHITE: usize = BOARD_CHANNELS * BOARD_SQUARES + 1;
pub const FEAT_BASTION_BLACK: usize = BOARD_CHANNELS * BOARD_SQUARES + 2;

/// Quantized Citadel evaluator
pub struct Nnue {
    /// Feature-transform weights, feature-major:
    /// `ft_w[feature * HIDDEN1 + j]` feeds hidden unit `j`
    pub(crate) ft_w: Vec<i16>,
    /// Feature-transform biases
    pub(crate) ft_b: Vec<i32>,
    /// Layer-2 weights, row-major `[HIDDEN2][HIDDEN1]`
    pub(crate) l2_w: Vec<i8>,
    /// Layer-2 biases
    pub(crate) l2_b: Vec<i32>,
    /// Output weights
    pub(crate) out_w: Vec<i8>,
    /// Output bias
    pub(crate) out_b: i32,
    /// Right shift after layer 2
    pub(crate) shift2: u32,
    /// Right shift after the output layer
    pub(crate) shift3: u32,
}

/// Feature index for a square's contents, None for empty squares
#[inline]
pub(crate) fn feature_index(sq: Square, cell: Cell) -> Option<usize> {
    cell.channel().map(|ch| sq.index() * BOARD_CHANNELS + ch)
}

/// Arithmetic right shift flooring toward negative infinity.
///
/// Rust's `>>` on signed integers already floors; this wrapper pins the
/// behavior the model format relies on.
#[inline]
pub(crate) fn arshift(x: i32, s: u32) -> i32 {
    x >> s
}

fn read_exact(r: &mut impl Read, buf: &mut [u8], section: &'static str) -> Result<(), NnueError> {
    r.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            NnueError::UnexpectedEof(section)
        } else {
            NnueError::Io(e.to_string())
        }
    })
}

fn read_u32(r: &mut impl Read, section: &'static str) -> Result<u32, NnueError> {
    let mut buf = [0u8; 4];
    read_exact(r, &mut buf, section)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_i32(r: &mut impl Read, section: &'static str) -> Result<i32, NnueError> {
    let mut buf = [0u8; 4];
    read_exact(r, &mut buf, section)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_i16(r: &mut impl Read, section: &'static str) -> Result<i16, NnueError> {
    let mut buf = [0u8; 2];
    read_exact(r, &mut buf, section)?;
    Ok(i16::from_le_bytes(buf))
}

fn read_i8(r: &mut impl Read, section: &'static str) -> Result<i8, NnueError> {
    let mut buf = [0u8; 1];
    read_exact(r, &mut buf, section)?;
    Ok(buf[0] as i8)
}

impl Nnue {
    /// Zero-weight network (testing and tooling)
    pub fn zeroed() -> Self {
        Nnue {
            ft_w: vec![0; INPUT_DIM * HIDDEN1],
            ft_b: vec![0; HIDDEN1],
            l2_w: vec![0; HIDDEN2 * HIDDEN1],
            l2_b: vec![0; HIDDEN2],
            out_w: vec![0; HIDDEN2],
            out_b: 0,
            shift2: 12,
            shift3: 8,
        }
    }

    /// Load a quantized model from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, NnueError> {
        let file = File::open(path.as_ref())?;
        let mut r = BufReader::new(file);
        Self::read_from(&mut r)
    }

    /// Load a quantized model from any reader
    pub fn read_from(r: &mut impl Read) -> Result<Self, NnueError> {
        let mut magic = [0u8; 4];
        read_exact(r, &mut magic, "header")?;
        if &magic != b"CNUE" {
            return Err(NnueError::BadMagic(magic));
        }

        let version = read_u32(r, "header")?;
        let input_dim = read_u32(r, "header")?;
        let h1 = read_u32(r, "header")?;
        let h2 = read_u32(r, "header")?;
        let act_max = read_u32(r, "header")?;
        let shift2 = read_u32(r, "header")?;
        let shift3 = read_u32(r, "header")?;

        if version != VERSION {
            return Err(NnueError::UnsupportedVersion(version));
        }
        let check = |field: &'static str, expected: usize, actual: u32| {
            if actual as usize != expected {
                Err(NnueError::ShapeMismatch { field, expected: expected as u32, actual })
            } else {
                Ok(())
            }
        };
        check("inputDim", INPUT_DIM, input_dim)?;
        check("hidden1", HIDDEN1, h1)?;
        check("hidden2", HIDDEN2, h2)?;
        check("actMax", ACT_MAX as usize, act_max)?;
        if shift2 > 31 {
            return Err(NnueError::BadShift(shift2));
        }
        if shift3 > 31 {
            return Err(NnueError::BadShift(shift3));
        }

        let mut net = Nnue {
            ft_w: Vec::with_capacity(INPUT_DIM * HIDDEN1),
            ft_b: Vec::with_capacity(HIDDEN1),
            l2_w: Vec::with_capacity(HIDDEN2 * HIDDEN1),
            l2_b: Vec::with_capacity(HIDDEN2),
            out_w: Vec::with_capacity(HIDDEN2),
            out_b: 0,
            shift2,
            shift3,
        };

        for _ in 0..INPUT_DIM * HIDDEN1 {
            net.ft_w.push(read_i16(r, "feature weights")?);
        }
        for _ in 0..HIDDEN1 {
            net.ft_b.push(read_i32(r, "feature biases")?);
        }
        for _ in 0..HIDDEN2 * HIDDEN1 {
            net.l2_w.push(read_i8(r, "layer-2 weights")?);
        }
        for _ in 0..HIDDEN2 {
            net.l2_b.push(read_i32(r, "layer-2 biases")?);
        }
        for _ in 0..HIDDEN2 {
            net.out_w.push(read_i8(r, "output weights")?);
        }
        net.out_b = read_i32(r, "output bias")?;

        Ok(net)
    }

    /// Forward pass from an accumulator, White's perspective
    pub(crate) fn evaluate_white(&self, acc: &Accumulator) -> i32 {
        // Hidden-1 activations: clipped ReLU to unsigned 8-bit.
        let mut h1 = [0u8; HIDDEN1];
        for (j, out) in h1.iter_mut().enumerate() {
            *out = acc.v[j].clamp(0, ACT_MAX) as u8;
        }

        // Hidden-2: int8 weights x uint8 activations, shift, clipped ReLU.
        let mut h2 = [0u8; HIDDEN2];
        for (k, out) in h2.iter_mut().enumerate() {
            let mut sum = self.l2_b[k];
            let row = &self.l2_w[k * HIDDEN1..(k + 1) * HIDDEN1];
            for (j, &w) in row.iter().enumerate() {
                sum += w as i32 * h1[j] as i32;
            }
            *out = arshift(sum, self.shift2).clamp(0, ACT_MAX) as u8;
        }

        let mut out = self.out_b;
        for (k, &w) in self.out_w.iter().enumerate() {
            out += w as i32 * h2[k] as i32;
        }
        arshift(out, self.shift3)
    }

    /// Evaluate from the side to move's perspective
    #[inline]
    pub fn evaluate_stm(&self, white_to_move: bool, acc: &Accumulator) -> i32 {
        let score_white = self.evaluate_white(acc);
        if white_to_move {
            score_white
        } else {
            -score_white
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citadel::{Color, Piece, PieceType, Wall};

    #[test]
    fn test_arshift_floors_toward_negative_infinity() {
        assert_eq!(arshift(8, 2), 2);
        assert_eq!(arshift(-8, 2), -2);
        assert_eq!(arshift(-5, 1), -3); // floor(-2.5) = -3
        assert_eq!(arshift(-1, 4), -1);
        assert_eq!(arshift(7, 0), 7);
    }

    #[test]
    fn test_feature_index_layout() {
        let sq = Square::new(0, 0);
        assert_eq!(feature_index(sq, Cell::Empty), None);
        assert_eq!(
            feature_index(sq, Cell::Piece(Piece::new(PieceType::Mason, Color::White))),
            Some(0)
        );
        assert_eq!(
            feature_index(sq, Cell::Wall(Wall::new(Color::Black, 2))),
            Some(15)
        );
        let last = Square::new(8, 8);
        assert_eq!(
            feature_index(last, Cell::Wall(Wall::new(Color::Black, 2))),
            Some(BOARD_CHANNELS * 81 - 1)
        );
        assert!(FEAT_BASTION_BLACK == INPUT_DIM - 1);
    }

    #[test]
    fn test_zeroed_network_evaluates_to_zero() {
        let net = Nnue::zeroed();
        let acc = Accumulator::default();
        assert_eq!(net.evaluate_white(&acc), 0);
        assert_eq!(net.evaluate_stm(false, &acc), 0);
    }

    #[test]
    fn test_forward_pass_arithmetic() {
        let mut net = Nnue::zeroed();
        net.shift2 = 0;
        net.shift3 = 0;

        // One hidden-2 unit summing every h1 activation, output passing it
        // straight through.
        for j in 0..HIDDEN1 {
            net.l2_w[j] = 1;
        }
        net.out_w[0] = 2;
        net.out_b = 5;

        let mut acc = Accumulator::default();
        acc.v[0] = 50;
        acc.v[1] = 300; // clips to 127
        acc.v[2] = -20; // clips to 0

        // h2[0] = 50 + 127 = 177 -> clips to 127; out = 5 + 2*127.
        assert_eq!(net.evaluate_white(&acc), 5 + 2 * 127);
        assert_eq!(net.evaluate_stm(false, &acc), -(5 + 2 * 127));
    }
}
