//! Host-side inputs and reference results.
//!
//! References use `ndarray` so the host baseline is a reasonable vectorized
//! implementation rather than a hand-written loop.

use ndarray::{Array, Array1, Array2, Dimension};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{BenchError, Result};
use crate::matmul::MatmulShape;

/// Seeded generator when `seed` is given, otherwise seeded from entropy.
pub fn rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Uniform samples in `[0, 1)`.
pub fn random_vector<R: Rng>(rng: &mut R, len: usize) -> Array1<f32> {
    Array1::from_shape_fn(len, |_| rng.gen::<f32>())
}

/// Uniform samples in `[0, 1)`.
pub fn random_matrix<R: Rng>(rng: &mut R, rows: usize, cols: usize) -> Array2<f32> {
    Array2::from_shape_fn((rows, cols), |_| rng.gen::<f32>())
}

/// Moves the elements out in logical order, reusing the allocation when the
/// array is already contiguous row-major.
pub fn into_flat<D: Dimension>(array: Array<f32, D>) -> Vec<f32> {
    if array.is_standard_layout() {
        let len = array.len();
        let (mut data, offset) = array.into_raw_vec_and_offset();
        data.drain(..offset.unwrap_or(0));
        data.truncate(len);
        return data;
    }
    array.iter().copied().collect()
}

/// Borrows the elements as one row-major slice, for copying to the device.
pub fn as_contiguous<D: Dimension>(array: &Array<f32, D>) -> Result<&[f32]> {
    array.as_slice().ok_or_else(|| {
        BenchError::ConfigInvalid(format!(
            "host array of shape {:?} is not contiguous row-major",
            array.shape()
        ))
    })
}

/// Sum of any number of equal-length vectors, left to right.
pub fn vector_sum(terms: &[&Array1<f32>]) -> Result<Array1<f32>> {
    let (first, rest) = terms
        .split_first()
        .ok_or_else(|| BenchError::ConfigInvalid("nothing to add".into()))?;
    let mut total = (*first).clone();
    for term in rest {
        if term.len() != total.len() {
            return Err(BenchError::ConfigInvalid(format!(
                "cannot add vectors of length {} and {}",
                total.len(),
                term.len()
            )));
        }
        total += *term;
    }
    Ok(total)
}

/// `L @ R` after checking both operands against `shape`.
pub fn matmul(left: &Array2<f32>, right: &Array2<f32>, shape: &MatmulShape) -> Result<Array2<f32>> {
    if left.dim() != (shape.m, shape.n) || right.dim() != (shape.n, shape.o) {
        return Err(BenchError::ConfigInvalid(format!(
            "operands {:?} @ {:?} do not match {shape}",
            left.dim(),
            right.dim()
        )));
    }
    Ok(left.dot(right))
}

/// Midpoint-rectangle estimate of π from `∫₀¹ 4/(1+x²) dx`, accumulated in
/// `f64`.
pub fn pi_midpoint(rectangles: usize) -> f64 {
    let step = 1.0 / rectangles as f64;
    let sum: f64 = (0..rectangles)
        .map(|k| {
            let x = (k as f64 + 0.5) * step;
            4.0 / (1.0 + x * x)
        })
        .sum();
    sum * step
}
