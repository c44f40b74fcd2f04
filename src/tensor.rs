//! Tensor encoding (C2): one-hot expansion of a {0..4}-valued read matrix into four horizontally
//! stacked indicator blocks, and the inverse decode used to pull a nucleotide matrix back out of
//! a real-valued haplotype tensor.

use ndarray::{s, Array2, ArrayView2};

/// One-hot encode `m` (shape `(n, l)`, entries in `0..=4`) into `T` (shape `(n, 4*l)`):
/// `T = [𝟙{m=1} | 𝟙{m=2} | 𝟙{m=3} | 𝟙{m=4}]`.
pub fn encode(m: ArrayView2<i32>) -> Array2<f64> {
    let (n, l) = m.dim();
    let mut t = Array2::<f64>::zeros((n, 4 * l));
    for symbol in 1..=4usize {
        let block_start = (symbol - 1) * l;
        let mut block = t.slice_mut(s![.., block_start..block_start + l]);
        for i in 0..n {
            for j in 0..l {
                if m[[i, j]] == symbol as i32 {
                    block[[i, j]] = 1.0;
                }
            }
        }
    }
    t
}

/// Projection mask `P` (shape `(n, l)`): 1 where `m` is non-gap, 0 where it is a gap.
pub fn projection(m: ArrayView2<i32>) -> Array2<f64> {
    m.mapv(|v| if v != 0 { 1.0 } else { 0.0 })
}

/// Tile a projection mask four times horizontally to match the tensor encoding's width.
pub fn tile_projection(p: &Array2<f64>) -> Array2<f64> {
    let (n, l) = p.dim();
    let mut out = Array2::<f64>::zeros((n, 4 * l));
    for block in 0..4 {
        out.slice_mut(s![.., block * l..(block + 1) * l]).assign(p);
    }
    out
}

/// Decode a real-valued haplotype tensor `vt` (shape `(r, 4*l)`) back into a nucleotide matrix
/// `v` (shape `(r, l)`, entries in `1..=4`).
///
/// The 4*l axis is interpreted in **group-major** order: group `g` (`g` in `0..4`) holds columns
/// `g*l .. g*l + l`, i.e. one full one-hot block per nucleotide, not interleaved per position.
/// Decoding therefore reshapes conceptually as `(r, l, 4)` in "column-major within the 4 groups"
/// and takes the per-position argmax over the 4 channels.
pub fn decode(vt: &Array2<f64>, l: usize) -> Array2<i32> {
    let r = vt.nrows();
    let mut v = Array2::<i32>::zeros((r, l));
    for i in 0..r {
        for j in 0..l {
            let mut best_symbol = 1usize;
            let mut best_value = vt[[i, j]];
            for symbol in 2..=4usize {
                let value = vt[[i, (symbol - 1) * l + j]];
                if value > best_value {
                    best_value = value;
                    best_symbol = symbol;
                }
            }
            v[[i, j]] = best_symbol as i32;
        }
    }
    v
}
